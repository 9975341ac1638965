// Prize Draw Engine - Instruction Processor
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::{DrawEngine, Retrieval, TurnOutcome};
use crate::error::DrawError;
use crate::instruction::{Caller, DrawInstruction};
use crate::observer::{SlotDetail, StateSnapshot};
use crate::state::Round;

/// Result of a processed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Turn(TurnOutcome),
    State(StateSnapshot),
    Retrieved(Retrieval),
    Published(Round),
    Cleared,
    ArtifactStored { slot_index: usize },
    ArtifactRemoved { slot_index: usize, existed: bool },
    Slots(Vec<SlotDetail>),
}

/// Instruction handler
pub struct Processor;

impl Processor {
    /// Exchange operator credentials for an operator caller
    pub fn login(config: &Config, identity: &str, user: &str, pass: &str) -> Result<Caller, DrawError> {
        if config.authenticate(user, pass) {
            info!(identity, "operator logged in");
            Ok(Caller::operator(identity))
        } else {
            warn!(identity, "operator login rejected");
            Err(DrawError::NotOperator)
        }
    }

    /// Process a draw instruction on behalf of `caller`
    pub fn process(
        engine: &DrawEngine,
        caller: &Caller,
        instruction: DrawInstruction,
    ) -> Result<Response, DrawError> {
        if instruction.requires_operator() && !caller.is_operator {
            warn!(identity = %caller.identity, "Instruction: {} rejected, operator only", instruction);
            return Err(DrawError::NotOperator);
        }

        match instruction {
            DrawInstruction::RequestTurn => {
                debug!(identity = %caller.identity, "Instruction: Request Turn");
                Ok(Response::Turn(engine.request_turn(&caller.identity)))
            }
            DrawInstruction::State => Ok(Response::State(engine.snapshot())),
            DrawInstruction::Retrieve { token } => {
                debug!(identity = %caller.identity, "Instruction: Retrieve");
                engine
                    .retrieve(&token, &caller.identity)
                    .map(Response::Retrieved)
            }
            DrawInstruction::Publish => {
                info!("Instruction: Publish");
                engine.publish().map(Response::Published)
            }
            DrawInstruction::Clear => {
                info!("Instruction: Clear");
                engine.clear();
                Ok(Response::Cleared)
            }
            DrawInstruction::UploadArtifact {
                slot_index,
                reference,
                display_name,
            } => {
                info!(slot = slot_index, "Instruction: Upload Artifact");
                engine.set_artifact(slot_index, reference, display_name)?;
                Ok(Response::ArtifactStored { slot_index })
            }
            DrawInstruction::RemoveArtifact { slot_index } => {
                info!(slot = slot_index, "Instruction: Remove Artifact");
                let existed = engine.remove_artifact(slot_index)?;
                Ok(Response::ArtifactRemoved {
                    slot_index,
                    existed,
                })
            }
            DrawInstruction::ListSlots => Ok(Response::Slots(engine.admin_slots())),
        }
    }
}
