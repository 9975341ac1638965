// Prize Draw Engine - Allocation protocol
//
// One mutex guards every piece of coordination state. Each public operation
// runs as a single critical section; file deletions and timer scheduling
// happen after the mutex is released.
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactStore, NullArtifactStore};
use crate::clock::{Clock, SystemClock, UnixMillis};
use crate::config::Config;
use crate::error::DrawError;
use crate::observer::{Broadcaster, NoopBroadcaster, SlotDetail, StateSnapshot};
use crate::queue::{DrawResult, TurnTicket};
use crate::randomness::{pick_available, OsRandom, RandomSource};
use crate::scheduler::{self, RELEASE_GRACE_MS};
use crate::state::{Artifact, DrawState, Round, SLOT_COUNT};
use crate::storage::StateFile;
use crate::tokens::AccessToken;

/// Answer to a draw request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No round is open
    NoActiveRound,
    /// Someone else is drawing or ahead in line; ask again later
    Queued {
        /// 1-indexed place in the queue
        position: usize,
        lock_ms_remaining: i64,
    },
    /// Every prize of this round is gone; the caller left the queue
    NoPrizesLeft,
    /// The caller won a slot
    Won {
        slot_index: usize,
        token: String,
        display_name: String,
        /// Replay of a result already handed out during this turn
        repeat: bool,
        lock_ms_remaining: i64,
    },
}

/// What a token holder may fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    pub slot_index: usize,
    /// Artifact store reference
    pub reference: String,
    /// Suggested file name for downloads
    pub download_name: String,
}

struct Core {
    state: DrawState,
    random: Box<dyn RandomSource>,
}

pub(crate) struct EngineInner {
    config: Config,
    core: Mutex<Core>,
    clock: Arc<dyn Clock>,
    broadcaster: Arc<dyn Broadcaster>,
    artifacts: Arc<dyn ArtifactStore>,
    state_file: Option<StateFile>,
}

/// Work collected under the mutex
#[derive(Default)]
struct Effects {
    /// Broadcast a snapshot
    changed: bool,
    /// Write the state file
    persist: bool,
    /// Artifacts whose storage should be released
    released: Vec<Artifact>,
    /// Turn to release once the reveal window closes
    release_timer: Option<TurnTicket>,
}

impl Effects {
    fn mutated(&mut self) {
        self.changed = true;
        self.persist = true;
    }
}

/// Handle to a draw engine. Clones share the same state.
#[derive(Clone)]
pub struct DrawEngine {
    inner: Arc<EngineInner>,
}

/// Non-owning engine handle held by background tasks
#[derive(Clone)]
pub(crate) struct WeakEngine(Weak<EngineInner>);

impl WeakEngine {
    pub(crate) fn upgrade(&self) -> Option<DrawEngine> {
        self.0.upgrade().map(|inner| DrawEngine { inner })
    }
}

/// Assembles a [`DrawEngine`] from its collaborators
pub struct EngineBuilder {
    config: Config,
    clock: Arc<dyn Clock>,
    random: Box<dyn RandomSource>,
    broadcaster: Arc<dyn Broadcaster>,
    artifacts: Arc<dyn ArtifactStore>,
    state_file: Option<StateFile>,
}

impl EngineBuilder {
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Box::new(random);
        self
    }

    pub fn broadcaster(mut self, broadcaster: impl Broadcaster + 'static) -> Self {
        self.broadcaster = Arc::new(broadcaster);
        self
    }

    pub fn artifact_store(mut self, artifacts: impl ArtifactStore + 'static) -> Self {
        self.artifacts = Arc::new(artifacts);
        self
    }

    /// Persist state to this file and restore from it on build
    pub fn state_file(mut self, state_file: StateFile) -> Self {
        self.state_file = Some(state_file);
        self
    }

    pub fn build(self) -> Result<DrawEngine, DrawError> {
        let state = match &self.state_file {
            Some(file) => match file.load()? {
                Some(persisted) => {
                    info!(path = %file.path().display(), "restored draw state");
                    DrawState::restore(persisted)
                }
                None => DrawState::default(),
            },
            None => DrawState::default(),
        };

        Ok(DrawEngine {
            inner: Arc::new(EngineInner {
                config: self.config,
                core: Mutex::new(Core {
                    state,
                    random: self.random,
                }),
                clock: self.clock,
                broadcaster: self.broadcaster,
                artifacts: self.artifacts,
                state_file: self.state_file,
            }),
        })
    }
}

impl DrawEngine {
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder {
            config,
            clock: Arc::new(SystemClock),
            random: Box::new(OsRandom::new()),
            broadcaster: Arc::new(NoopBroadcaster),
            artifacts: Arc::new(NullArtifactStore),
            state_file: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.inner))
    }

    /// Ask for a turn and, if it is the caller's, draw a prize
    pub fn request_turn(&self, identity: &str) -> TurnOutcome {
        let reveal_window_ms = self.inner.config.reveal_window_ms;

        self.with_state(|core, now, effects| {
            let state = &mut core.state;

            let round = match state.active_round(now) {
                Some(round) => round,
                None => return TurnOutcome::NoActiveRound,
            };

            if state.queue.enqueue(identity) {
                effects.changed = true;
                debug!(identity, position = state.queue.len(), "joined the queue");
            }

            if state.lock.is_held_by_other(identity, now) || !state.queue.is_head(identity) {
                return TurnOutcome::Queued {
                    position: state.queue.position(identity).unwrap_or(state.queue.len()),
                    lock_ms_remaining: state.lock.ms_remaining(now),
                };
            }

            // Same turn, same answer
            if let Some(result) = state.results.get(identity) {
                return TurnOutcome::Won {
                    slot_index: result.slot_index,
                    token: result.token.clone(),
                    display_name: result.display_name.clone(),
                    repeat: true,
                    lock_ms_remaining: state.lock.ms_remaining(now),
                };
            }

            let available = state.available_slots();
            let slot_index = match pick_available(&available, core.random.as_mut()) {
                Some(slot_index) => slot_index,
                None => {
                    state.queue.pop_head_if(identity);
                    effects.changed = true;
                    info!(identity, round = round.id, "no prizes left");
                    return TurnOutcome::NoPrizesLeft;
                }
            };

            let ticket = TurnTicket {
                generation: state.generation,
                turn: state.next_turn,
            };
            state.next_turn += 1;
            state.lock.acquire(identity, now, reveal_window_ms, ticket);

            let slot = &mut state.slots[slot_index];
            slot.claimed = true;
            slot.claimed_at = Some(now);
            let display_name = slot.label(slot_index);

            let token = state.tokens.mint(slot_index, identity, now).token;
            state.results.insert(
                identity.to_string(),
                DrawResult {
                    slot_index,
                    token: token.clone(),
                    display_name: display_name.clone(),
                },
            );

            effects.mutated();
            effects.release_timer = Some(ticket);
            info!(identity, round = round.id, slot = slot_index, "prize claimed");

            TurnOutcome::Won {
                slot_index,
                token,
                display_name,
                repeat: false,
                lock_ms_remaining: state.lock.ms_remaining(now),
            }
        })
    }

    /// Open a new round over the current pool
    pub fn publish(&self) -> Result<Round, DrawError> {
        let duration_ms = self.inner.config.round_duration_ms;

        self.with_state(|core, now, effects| {
            let round = core.state.open_round(now, duration_ms)?;
            effects.mutated();
            info!(
                round = round.id,
                published_at = round.published_at,
                expires_at = round.expires_at,
                "round published"
            );
            Ok(round)
        })
    }

    /// Stop any round and empty the pool
    pub fn clear(&self) {
        self.with_state(|core, _now, effects| {
            let removed = core.state.clear_all();
            info!(artifacts = removed.len(), "pool cleared");
            effects.released.extend(removed);
            effects.mutated();
        })
    }

    /// The active round, after expiring it if its time is up
    pub fn current_round(&self) -> Option<Round> {
        self.with_state(|core, now, _effects| core.state.active_round(now))
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.with_state(|core, now, _effects| StateSnapshot::capture(&core.state, now))
    }

    pub fn admin_slots(&self) -> Vec<SlotDetail> {
        self.with_state(|core, _now, _effects| SlotDetail::list(&core.state))
    }

    pub fn has_artifact(&self, slot_index: usize) -> bool {
        self.with_state(|core, _now, _effects| {
            core.state
                .slots
                .get(slot_index)
                .is_some_and(|slot| slot.has_prize())
        })
    }

    /// Put a prize into a slot, replacing (and releasing) what was there.
    /// The slot's claim is cleared.
    pub fn set_artifact(
        &self,
        slot_index: usize,
        reference: impl Into<String>,
        display_name: Option<String>,
    ) -> Result<(), DrawError> {
        check_slot(slot_index)?;
        let reference = reference.into();

        self.with_state(|core, now, effects| {
            let slot = &mut core.state.slots[slot_index];
            let previous = slot.artifact.replace(Artifact {
                reference,
                display_name,
                uploaded_at: now,
            });
            slot.reset_claim();

            effects.released.extend(previous);
            effects.mutated();
            info!(slot = slot_index, "artifact stored");
            Ok(())
        })
    }

    /// Empty a slot. Returns false if it was already empty.
    pub fn remove_artifact(&self, slot_index: usize) -> Result<bool, DrawError> {
        check_slot(slot_index)?;

        self.with_state(|core, _now, effects| {
            let slot = &mut core.state.slots[slot_index];
            let removed = slot.artifact.take();
            slot.reset_claim();

            let existed = removed.is_some();
            if existed {
                effects.released.extend(removed);
                effects.mutated();
                info!(slot = slot_index, "artifact removed");
            }
            Ok(existed)
        })
    }

    pub fn resolve(&self, token: &str) -> Result<AccessToken, DrawError> {
        self.with_state(|core, _now, _effects| core.state.tokens.resolve(token).cloned())
    }

    /// Resolve a token for `identity` and locate the prize it unlocks
    pub fn retrieve(&self, token: &str, identity: &str) -> Result<Retrieval, DrawError> {
        self.with_state(|core, _now, _effects| {
            let record = core.state.tokens.resolve(token)?;
            if !record.is_owned_by(identity) {
                return Err(DrawError::Forbidden);
            }

            let slot = core
                .state
                .slots
                .get(record.slot_index)
                .ok_or(DrawError::Gone)?;
            let artifact = slot.artifact.as_ref().ok_or(DrawError::Gone)?;

            Ok(Retrieval {
                slot_index: record.slot_index,
                reference: artifact.reference.clone(),
                download_name: slot.label(record.slot_index),
            })
        })
    }

    /// Background housekeeping: expire the round, release a lapsed turn.
    pub fn sweep(&self) {
        self.with_state(|core, now, _effects| {
            let state = &core.state;
            if let Some(holder) = state.lock.holder(now) {
                if !state.queue.is_head(holder) {
                    warn!(holder, "turn holder is not at the head of the queue");
                }
                if !state.results.contains_key(holder) {
                    warn!(holder, "turn holder has no cached draw result");
                }
            }
            if state.active_round(now).is_none() && !state.queue.is_empty() {
                warn!(queued = state.queue.len(), "queue is not empty without an active round");
            }
        })
    }

    /// Fired by the release timer at the end of a reveal window
    pub(crate) fn release_turn(&self, ticket: TurnTicket) {
        self.with_state(|core, _now, effects| {
            if ticket.generation != core.state.generation {
                debug!(turn = ticket.turn, "release timer outlived a reset");
                return;
            }
            if finish_turn(&mut core.state, ticket) {
                effects.changed = true;
            }
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut Core, UnixMillis, &mut Effects) -> R) -> R {
        let now = self.inner.clock.now_ms();
        let mut effects = Effects::default();

        let result = {
            let mut guard = self.inner.core.lock();
            let core = &mut *guard;

            if let Some(removed) = core.state.expire_if_due(now) {
                effects.released.extend(removed);
                effects.mutated();
            }
            if let Some((_, ticket)) = core.state.lock.expired_holder(now) {
                if finish_turn(&mut core.state, ticket) {
                    effects.changed = true;
                }
            }

            let result = f(core, now, &mut effects);

            if effects.persist {
                self.save(&core.state);
            }
            if effects.changed {
                self.inner
                    .broadcaster
                    .broadcast(&StateSnapshot::capture(&core.state, now));
            }
            result
        };

        self.apply(effects);
        result
    }

    fn save(&self, state: &DrawState) {
        if let Some(file) = &self.inner.state_file {
            if let Err(err) = file.save(&state.persisted()) {
                warn!(error = %err, path = %file.path().display(), "failed to write state file");
            }
        }
    }

    fn apply(&self, effects: Effects) {
        for artifact in effects.released {
            if let Err(err) = self.inner.artifacts.release(&artifact.reference) {
                warn!(error = %err, reference = %artifact.reference, "failed to release artifact");
            }
        }

        if let Some(ticket) = effects.release_timer {
            let delay = Duration::from_millis(
                (self.inner.config.reveal_window_ms.max(0) as u64).saturating_add(RELEASE_GRACE_MS),
            );
            scheduler::schedule_release(self, ticket, delay);
        }
    }
}

/// End the turn carrying `ticket`: drop the lock, take the holder off the
/// head of the queue, forget its cached result.
fn finish_turn(state: &mut DrawState, ticket: TurnTicket) -> bool {
    let identity = match state.lock.identity_for(ticket) {
        Some(identity) => identity.to_string(),
        None => return false,
    };

    state.lock.clear();
    if !state.queue.pop_head_if(&identity) {
        warn!(identity = %identity, "released turn holder was not at the head of the queue");
    }
    state.results.remove(&identity);
    debug!(identity = %identity, turn = ticket.turn, "turn released");
    true
}

fn check_slot(slot_index: usize) -> Result<(), DrawError> {
    if slot_index < SLOT_COUNT {
        Ok(())
    } else {
        Err(DrawError::InvalidSlot(slot_index))
    }
}
