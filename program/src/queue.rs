// Prize Draw Engine - Turn queue and turn lock
use std::collections::VecDeque;

use crate::clock::UnixMillis;

/// Identifies one won turn. A release timer only acts if the lock still
/// carries the same ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTicket {
    /// Reset generation the turn was won in
    pub generation: u64,
    /// Turn sequence number
    pub turn: u64,
}

/// Result of a won draw, cached for the holder while the lock is held
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawResult {
    pub slot_index: usize,
    pub token: String,
    pub display_name: String,
}

/// FIFO of participant identities waiting to draw
#[derive(Debug, Default, Clone)]
pub struct TurnQueue {
    entries: VecDeque<String>,
}

impl TurnQueue {
    /// Append `identity` unless already queued. Returns true if it was added.
    pub fn enqueue(&mut self, identity: &str) -> bool {
        if self.contains(identity) {
            return false;
        }
        self.entries.push_back(identity.to_string());
        true
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.iter().any(|entry| entry == identity)
    }

    /// 1-indexed distance from the front
    pub fn position(&self, identity: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry == identity)
            .map(|index| index + 1)
    }

    pub fn head(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn is_head(&self, identity: &str) -> bool {
        self.head() == Some(identity)
    }

    /// Remove the head, but only if it is `identity`
    pub fn pop_head_if(&mut self, identity: &str) -> bool {
        if self.is_head(identity) {
            self.entries.pop_front();
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LockHolder {
    identity: String,
    until: UnixMillis,
    ticket: TurnTicket,
}

/// Single-holder, time-limited turn lock
#[derive(Debug, Default, Clone)]
pub struct TurnLock {
    holder: Option<LockHolder>,
}

impl TurnLock {
    /// Hand the lock to `identity` for `ttl_ms` (at least 1ms)
    pub fn acquire(&mut self, identity: &str, now: UnixMillis, ttl_ms: i64, ticket: TurnTicket) {
        self.holder = Some(LockHolder {
            identity: identity.to_string(),
            until: now.saturating_add(ttl_ms.max(1)),
            ticket,
        });
    }

    /// Held and not yet expired
    pub fn is_locked(&self, now: UnixMillis) -> bool {
        self.holder.as_ref().is_some_and(|holder| now < holder.until)
    }

    /// Identity of the live holder, if any
    pub fn holder(&self, now: UnixMillis) -> Option<&str> {
        self.holder
            .as_ref()
            .filter(|holder| now < holder.until)
            .map(|holder| holder.identity.as_str())
    }

    pub fn is_held_by_other(&self, identity: &str, now: UnixMillis) -> bool {
        self.holder(now).is_some_and(|holder| holder != identity)
    }

    pub fn ms_remaining(&self, now: UnixMillis) -> i64 {
        self.holder
            .as_ref()
            .map(|holder| holder.until.saturating_sub(now).max(0))
            .unwrap_or(0)
    }

    /// Identity and ticket of a holder whose window has run out
    pub fn expired_holder(&self, now: UnixMillis) -> Option<(String, TurnTicket)> {
        self.holder
            .as_ref()
            .filter(|holder| now >= holder.until)
            .map(|holder| (holder.identity.clone(), holder.ticket))
    }

    /// Identity recorded with `ticket`, if the lock still carries it
    pub fn identity_for(&self, ticket: TurnTicket) -> Option<&str> {
        self.holder
            .as_ref()
            .filter(|holder| holder.ticket == ticket)
            .map(|holder| holder.identity.as_str())
    }

    pub fn clear(&mut self) {
        self.holder = None;
    }
}
