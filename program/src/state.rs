// Prize Draw Engine - State
use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::clock::UnixMillis;
use crate::queue::{DrawResult, TurnLock, TurnQueue};
use crate::tokens::{AccessToken, AccessTokenRegistry};

/// Number of prize slots in the pool
pub const SLOT_COUNT: usize = 5;

/// A prize artifact placed into a slot by the operator
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Opaque reference understood by the artifact store (e.g. a stored file name)
    pub reference: String,
    /// Name shown to participants
    pub display_name: Option<String>,
    /// Upload time
    pub uploaded_at: UnixMillis,
}

/// One prize slot
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    /// Prize held by the slot (None = empty slot)
    pub artifact: Option<Artifact>,
    /// Whether the prize was won this round
    pub claimed: bool,
    /// When the prize was won
    pub claimed_at: Option<UnixMillis>,
}

impl Slot {
    pub fn has_prize(&self) -> bool {
        self.artifact.is_some()
    }

    /// Holds a prize nobody has won yet
    pub fn is_available(&self) -> bool {
        self.has_prize() && !self.claimed
    }

    pub fn display_name(&self) -> Option<&str> {
        self.artifact
            .as_ref()
            .and_then(|artifact| artifact.display_name.as_deref())
    }

    /// Display name, or `slot_<n>` (1-based) when the operator gave none
    pub fn label(&self, index: usize) -> String {
        match self.display_name() {
            Some(name) => name.to_string(),
            None => format!("slot_{}", index + 1),
        }
    }

    pub fn reset_claim(&mut self) {
        self.claimed = false;
        self.claimed_at = None;
    }
}

/// A draw round
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Round {
    /// Sequence number, increasing with every publish
    pub id: u64,
    pub published_at: UnixMillis,
    pub expires_at: UnixMillis,
    pub active: bool,
}

impl Round {
    /// Open a new round lasting `duration_ms`
    pub fn new(id: u64, published_at: UnixMillis, duration_ms: i64) -> Self {
        Self {
            id,
            published_at,
            expires_at: published_at.saturating_add(duration_ms),
            active: true,
        }
    }

    /// Check if the round has run out of time
    pub fn has_expired(&self, now: UnixMillis) -> bool {
        now >= self.expires_at
    }
}

/// Everything written to disk between restarts
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub next_round_id: u64,
    pub round: Option<Round>,
    pub slots: Vec<Slot>,
    pub tokens: Vec<AccessToken>,
}

/// All coordination state, guarded as one unit by the engine mutex
#[derive(Debug)]
pub struct DrawState {
    pub slots: Vec<Slot>,
    /// Latest round, active or not
    pub round: Option<Round>,
    pub next_round_id: u64,
    pub queue: TurnQueue,
    pub lock: TurnLock,
    /// Draw result of the current lock holder, keyed by identity
    pub results: HashMap<String, DrawResult>,
    pub tokens: AccessTokenRegistry,
    /// Bumped on every reset; stale release timers compare against it
    pub generation: u64,
    /// Bumped on every won turn
    pub next_turn: u64,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            slots: vec![Slot::default(); SLOT_COUNT],
            round: None,
            next_round_id: 1,
            queue: TurnQueue::default(),
            lock: TurnLock::default(),
            results: HashMap::new(),
            tokens: AccessTokenRegistry::default(),
            generation: 0,
            next_turn: 1,
        }
    }
}

impl DrawState {
    /// Rebuild state from disk. Queue, lock and cached results start empty.
    pub fn restore(persisted: PersistedState) -> Self {
        let mut slots = persisted.slots;
        slots.resize(SLOT_COUNT, Slot::default());

        Self {
            slots,
            round: persisted.round,
            next_round_id: persisted.next_round_id.max(1),
            tokens: AccessTokenRegistry::from_records(persisted.tokens),
            ..Self::default()
        }
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            next_round_id: self.next_round_id,
            round: self.round,
            slots: self.slots.clone(),
            tokens: self.tokens.records(),
        }
    }

    /// Indices of slots holding an unclaimed prize, ascending
    pub fn available_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_available())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn artifact_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.has_prize()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: Option<&str>) -> Artifact {
        Artifact {
            reference: "1_abc_clip.mp4".to_string(),
            display_name: name.map(str::to_string),
            uploaded_at: 10,
        }
    }

    #[test]
    fn test_slot_availability() {
        let mut slot = Slot::default();
        assert!(!slot.is_available());

        slot.artifact = Some(artifact(Some("clip.mp4")));
        assert!(slot.is_available());

        slot.claimed = true;
        assert!(!slot.is_available());
        assert!(slot.has_prize());
    }

    #[test]
    fn test_slot_label_falls_back_to_one_based_index() {
        let mut slot = Slot::default();
        slot.artifact = Some(artifact(None));
        assert_eq!(slot.label(2), "slot_3");

        slot.artifact = Some(artifact(Some("clip.mp4")));
        assert_eq!(slot.label(2), "clip.mp4");
    }

    #[test]
    fn test_round_expiry_is_inclusive() {
        let round = Round::new(1, 1_000, 500);
        assert_eq!(round.expires_at, 1_500);
        assert!(!round.has_expired(1_499));
        assert!(round.has_expired(1_500));
    }

    #[test]
    fn test_restore_pads_slots_and_keeps_tokens() {
        let mut state = DrawState::default();
        state.slots[1].artifact = Some(artifact(Some("a")));
        state.tokens.mint(1, "sess-a", 42);
        state.next_round_id = 7;

        let mut persisted = state.persisted();
        persisted.slots.truncate(2);
        let restored = DrawState::restore(persisted);

        assert_eq!(restored.slots.len(), SLOT_COUNT);
        assert!(restored.slots[1].has_prize());
        assert_eq!(restored.tokens.len(), 1);
        assert_eq!(restored.next_round_id, 7);
        assert!(restored.queue.is_empty());
    }
}
