// Prize Draw Engine - Round lifecycle
use crate::clock::UnixMillis;
use crate::error::DrawError;
use crate::state::{Artifact, DrawState, Round};

impl DrawState {
    /// The active, unexpired round
    pub fn active_round(&self, now: UnixMillis) -> Option<Round> {
        self.round
            .filter(|round| round.active && !round.has_expired(now))
    }

    /// Reset everything if the active round has run out of time.
    /// Returns the artifacts removed from the pool, or None if nothing expired.
    pub fn expire_if_due(&mut self, now: UnixMillis) -> Option<Vec<Artifact>> {
        let round = self.round?;
        if !round.active || !round.has_expired(now) {
            return None;
        }
        tracing::info!(round = round.id, expires_at = round.expires_at, "round expired");
        Some(self.clear_all())
    }

    /// Open a new round. Requires at least one populated slot.
    pub fn open_round(&mut self, now: UnixMillis, duration_ms: i64) -> Result<Round, DrawError> {
        if self.artifact_count() == 0 {
            return Err(DrawError::NoArtifacts);
        }

        if let Some(previous) = self.round.as_mut() {
            previous.active = false;
        }

        let round = Round::new(self.next_round_id, now, duration_ms);
        self.next_round_id += 1;
        self.round = Some(round);
        self.reset_turns();

        Ok(round)
    }

    /// Stop the round and empty the pool. Returns the removed artifacts so
    /// their storage can be released.
    pub fn clear_all(&mut self) -> Vec<Artifact> {
        if let Some(round) = self.round.as_mut() {
            round.active = false;
        }

        let removed = self
            .slots
            .iter_mut()
            .filter_map(|slot| slot.artifact.take())
            .collect();
        self.reset_turns();

        removed
    }

    /// Clear claims, queue, lock, cached results and tokens, and invalidate
    /// every pending release timer.
    pub fn reset_turns(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.reset_claim();
        }
        self.queue.clear();
        self.lock.clear();
        self.results.clear();
        self.tokens.purge_all();
        self.generation += 1;
    }
}
