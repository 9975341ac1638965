// Prize Draw Engine - Instructions
use std::fmt;

use crate::error::DrawError;

/// Requests accepted by the [`Processor`](crate::processor::Processor)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawInstruction {
    /// Join the queue and draw when it is the caller's turn
    RequestTurn,

    /// Public state snapshot
    State,

    /// Retrieve the prize behind a token owned by the caller
    Retrieve {
        token: String,
    },

    /// Open a new round (operator only)
    Publish,

    /// Stop the round and delete every artifact (operator only)
    Clear,

    /// Place an already stored artifact into a slot (operator only)
    UploadArtifact {
        slot_index: usize,
        /// Artifact store reference
        reference: String,
        /// Name shown to participants
        display_name: Option<String>,
    },

    /// Empty a slot (operator only)
    RemoveArtifact {
        slot_index: usize,
    },

    /// Per-slot detail (operator only)
    ListSlots,
}

impl DrawInstruction {
    /// Unpacks one whitespace-separated command line, e.g. `turn`,
    /// `retrieve <token>` or `upload <slot> <reference> [display name]`
    pub fn unpack(input: &str) -> Result<Self, DrawError> {
        let invalid = || DrawError::InvalidInstruction(input.trim().to_string());
        let mut words = input.split_whitespace();
        let tag = words.next().ok_or_else(invalid)?;
        let slot = |word: Option<&str>| word.and_then(|w| w.parse::<usize>().ok()).ok_or_else(invalid);

        let instruction = match tag {
            "turn" => Self::RequestTurn,
            "state" => Self::State,
            "retrieve" => Self::Retrieve {
                token: words.next().ok_or_else(invalid)?.to_string(),
            },
            "publish" => Self::Publish,
            "clear" => Self::Clear,
            "upload" => {
                let slot_index = slot(words.next())?;
                let reference = words.next().ok_or_else(invalid)?.to_string();
                let display_name = words.collect::<Vec<_>>().join(" ");
                return Ok(Self::UploadArtifact {
                    slot_index,
                    reference,
                    display_name: (!display_name.is_empty()).then_some(display_name),
                });
            }
            "remove" => Self::RemoveArtifact {
                slot_index: slot(words.next())?,
            },
            "slots" => Self::ListSlots,
            _ => return Err(invalid()),
        };

        if words.next().is_some() {
            return Err(invalid());
        }
        Ok(instruction)
    }

    pub fn requires_operator(&self) -> bool {
        matches!(
            self,
            DrawInstruction::Publish
                | DrawInstruction::Clear
                | DrawInstruction::UploadArtifact { .. }
                | DrawInstruction::RemoveArtifact { .. }
                | DrawInstruction::ListSlots
        )
    }
}

impl fmt::Display for DrawInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrawInstruction::RequestTurn => "Request Turn",
            DrawInstruction::State => "State",
            DrawInstruction::Retrieve { .. } => "Retrieve",
            DrawInstruction::Publish => "Publish",
            DrawInstruction::Clear => "Clear",
            DrawInstruction::UploadArtifact { .. } => "Upload Artifact",
            DrawInstruction::RemoveArtifact { .. } => "Remove Artifact",
            DrawInstruction::ListSlots => "List Slots",
        };
        f.write_str(name)
    }
}

/// Who is asking: the session identity and whether it logged in as operator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub identity: String,
    pub is_operator: bool,
}

impl Caller {
    pub fn participant(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            is_operator: false,
        }
    }

    pub fn operator(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            is_operator: true,
        }
    }
}
