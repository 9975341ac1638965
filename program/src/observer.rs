// Prize Draw Engine - State broadcast to observers
use serde::Serialize;
use tokio::sync::broadcast;

use crate::clock::UnixMillis;
use crate::state::DrawState;

/// Public view of the active round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub published_at: UnixMillis,
    pub expires_at: UnixMillis,
}

/// Public view of one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub slot_index: usize,
    pub name: Option<String>,
    pub has_prize: bool,
    pub claimed: bool,
}

/// Operator view of one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDetail {
    pub slot_index: usize,
    pub name: Option<String>,
    pub has_prize: bool,
    pub uploaded_at: Option<UnixMillis>,
    pub claimed: bool,
    pub claimed_at: Option<UnixMillis>,
}

/// What observers receive after every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub round: Option<RoundView>,
    pub slots: Vec<SlotView>,
    pub queue_length: usize,
    pub locked: bool,
    pub lock_ms_remaining: i64,
}

impl StateSnapshot {
    pub fn capture(state: &DrawState, now: UnixMillis) -> Self {
        let round = state
            .round
            .filter(|round| round.active && !round.has_expired(now))
            .map(|round| RoundView {
                published_at: round.published_at,
                expires_at: round.expires_at,
            });

        let slots = state
            .slots
            .iter()
            .enumerate()
            .map(|(slot_index, slot)| SlotView {
                slot_index,
                name: slot.display_name().map(str::to_string),
                has_prize: slot.has_prize(),
                claimed: slot.claimed,
            })
            .collect();

        Self {
            round,
            slots,
            queue_length: state.queue.len(),
            locked: state.lock.is_locked(now),
            lock_ms_remaining: state.lock.ms_remaining(now),
        }
    }
}

impl SlotDetail {
    pub fn list(state: &DrawState) -> Vec<SlotDetail> {
        state
            .slots
            .iter()
            .enumerate()
            .map(|(slot_index, slot)| SlotDetail {
                slot_index,
                name: slot.display_name().map(str::to_string),
                has_prize: slot.has_prize(),
                uploaded_at: slot.artifact.as_ref().map(|a| a.uploaded_at),
                claimed: slot.claimed,
                claimed_at: slot.claimed_at,
            })
            .collect()
    }
}

/// Receiver of state snapshots. Called with the engine mutex held, so it must not block.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, snapshot: &StateSnapshot);
}

/// Drops every snapshot
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn broadcast(&self, _snapshot: &StateSnapshot) {}
}

/// Fans snapshots out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<StateSnapshot>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateSnapshot> {
        self.tx.subscribe()
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn broadcast(&self, snapshot: &StateSnapshot) {
        // No subscribers is not an error
        let _ = self.tx.send(snapshot.clone());
    }
}
