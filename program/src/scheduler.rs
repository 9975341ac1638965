// Prize Draw Engine - Background timers
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::engine::DrawEngine;
use crate::queue::TurnTicket;

/// Slack added to the reveal window before the release timer fires
pub const RELEASE_GRACE_MS: u64 = 50;

/// Release the turn carrying `ticket` after `delay`. Without a tokio runtime
/// nothing is spawned; the lapsed lock is then released by the next request
/// or sweep.
pub(crate) fn schedule_release(engine: &DrawEngine, ticket: TurnTicket, delay: Duration) {
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            debug!(turn = ticket.turn, "no runtime for release timer");
            return;
        }
    };

    let engine = engine.downgrade();
    handle.spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(engine) = engine.upgrade() {
            engine.release_turn(ticket);
        }
    });
}

/// Periodic round-expiry sweep. Stops when dropped or when the engine is gone.
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Start sweeping every `every`. Must be called inside a tokio runtime.
    pub fn spawn(engine: &DrawEngine, every: Duration) -> Self {
        let engine = engine.downgrade();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let engine = match engine.upgrade() {
                    Some(engine) => engine,
                    None => break,
                };
                if panic::catch_unwind(AssertUnwindSafe(|| engine.sweep())).is_err() {
                    error!("expiry sweep panicked; continuing");
                }
            }
        });

        Self { handle }
    }

}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
