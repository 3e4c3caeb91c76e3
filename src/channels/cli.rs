//! CLI transport — simulates a group chat over stdin/stdout for local testing.
//!
//! Input lines:
//! - `<chat> <sender> <text...>` — a text message
//! - `/join <chat> <number>[,<number>...]` — members joined
//! - `/leave <chat> <number>[,<number>...]` — members left

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::channels::{EventStream, OutgoingContent, Transport};
use crate::error::ChannelError;
use crate::identity::{ChatId, Identity};
use crate::moderation::{InboundEvent, MembershipChange, MembershipKind, TextMessage};

/// Reads simulated events from stdin and prints replies to stdout.
pub struct CliTransport;

impl CliTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for CliTransport {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match parse_line(line) {
                            Ok(event) => {
                                if tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => eprintln!("⚠️  {}", e),
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn send(&self, chat: &ChatId, content: OutgoingContent) -> Result<(), ChannelError> {
        write_reply(&mut tokio::io::stdout(), chat, &content)
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: self.name().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Parse one input line into an event.
pub fn parse_line(line: &str) -> Result<InboundEvent, ChannelError> {
    let mut parts = line.splitn(3, char::is_whitespace);
    let head = parts.next().unwrap_or_default();

    let kind = match head {
        "/join" => Some(MembershipKind::Joined),
        "/leave" => Some(MembershipKind::Left),
        _ => None,
    };

    if let Some(kind) = kind {
        let chat = parts
            .next()
            .ok_or_else(|| invalid(line, "missing chat"))?;
        let subjects = parts
            .next()
            .unwrap_or_default()
            .split(',')
            .filter_map(Identity::normalize)
            .collect::<Vec<_>>();
        if subjects.is_empty() {
            return Err(invalid(line, "no participant numbers"));
        }
        return Ok(InboundEvent::Membership(MembershipChange {
            chat: ChatId::new(chat),
            subjects,
            kind,
        }));
    }

    let sender = parts.next().ok_or_else(|| invalid(line, "missing sender"))?;
    let sender = Identity::normalize(sender).ok_or_else(|| invalid(line, "sender is not a number"))?;
    let body = parts.next().unwrap_or_default().trim();

    Ok(InboundEvent::Text(TextMessage {
        chat: ChatId::new(head),
        sender,
        body: body.to_string(),
        timestamp: Utc::now(),
    }))
}

async fn write_reply<W: AsyncWrite + Unpin>(
    out: &mut W,
    chat: &ChatId,
    content: &OutgoingContent,
) -> std::io::Result<()> {
    out.write_all(format!("[{}] {}\n", chat, content.text).as_bytes())
        .await?;
    out.flush().await
}

fn invalid(line: &str, reason: &str) -> ChannelError {
    ChannelError::InvalidEvent(format!("{reason}: '{line}'"))
}
