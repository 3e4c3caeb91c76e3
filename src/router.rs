//! Event router — the boundary between transport and engine.
//!
//! Events are handled one at a time, in arrival order, by the single task
//! that owns [`ModerationState`]. For each event the router:
//! 1. drops events outside group chats
//! 2. runs the engine (panics are caught and the state restored)
//! 3. persists every `Persist*` action, restoring state on failure
//! 4. queues the replies for asynchronous delivery
//!
//! A failing event never stops the router.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::{debug, error, info};

use crate::channels::{DeliveryQueue, EventStream};
use crate::error::{RouterError, StoreError};
use crate::moderation::{self, Action, InboundEvent, ModerationState, Reply};
use crate::store::StateStore;

/// Evaluates one event against the state.
type Engine = fn(&mut ModerationState, &InboundEvent, DateTime<Utc>) -> Vec<Action>;

/// Owns moderation state and drives events through the engine.
pub struct EventRouter {
    state: ModerationState,
    store: Arc<dyn StateStore>,
    delivery: DeliveryQueue,
    engine: Engine,
}

impl EventRouter {
    pub fn new(state: ModerationState, store: Arc<dyn StateStore>, delivery: DeliveryQueue) -> Self {
        Self {
            state,
            store,
            delivery,
            engine: moderation::handle,
        }
    }

    #[cfg(test)]
    fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn state(&self) -> &ModerationState {
        &self.state
    }

    /// Consume events until the stream ends.
    pub async fn run(mut self, mut events: EventStream) {
        info!("Event router started");
        while let Some(event) = events.next().await {
            if let Err(e) = self.dispatch(event).await {
                error!(error = %e, "Event handling failed");
            }
        }
        info!("Event stream ended");
    }

    /// Handle one event at the current time.
    pub async fn dispatch(&mut self, event: InboundEvent) -> Result<usize, RouterError> {
        self.dispatch_at(event, Utc::now()).await
    }

    /// Handle one event as if it arrived at `now`. Returns the number of
    /// replies queued.
    pub async fn dispatch_at(
        &mut self,
        event: InboundEvent,
        now: DateTime<Utc>,
    ) -> Result<usize, RouterError> {
        let chat = event.chat().clone();
        if !chat.is_group() {
            debug!(chat = %chat, event = event.label(), "Ignoring event outside a group");
            return Ok(0);
        }

        let checkpoint = self.state.checkpoint();

        let (engine, state) = (self.engine, &mut self.state);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine(state, &event, now)));
        let actions = match outcome {
            Ok(actions) => actions,
            Err(payload) => {
                self.state.restore(checkpoint);
                return Err(RouterError::Panicked {
                    chat: chat.to_string(),
                    message: panic_message(payload.as_ref()),
                });
            }
        };

        let replies = match self.commit(actions).await {
            Ok(replies) => replies,
            Err(source) => {
                self.state.restore(checkpoint);
                return Err(RouterError::Persist {
                    chat: chat.to_string(),
                    source,
                });
            }
        };

        let count = replies.len();
        for reply in replies {
            self.delivery.enqueue(reply)?;
        }

        debug!(chat = %chat, event = event.label(), replies = count, "Event handled");
        Ok(count)
    }

    /// Persist everything the actions ask for and hand back the replies.
    /// Nothing is returned unless every write succeeded.
    async fn commit(&self, actions: Vec<Action>) -> Result<Vec<Reply>, StoreError> {
        let mut replies = Vec::new();
        for action in actions {
            match action {
                Action::PersistWarnings => self.store.save_warnings(&self.state.ledger).await?,
                Action::PersistConfig => self.store.save_config(&self.state.config).await?,
                Action::Reply(reply) => replies.push(reply),
            }
        }
        Ok(replies)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
