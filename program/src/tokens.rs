// Prize Draw Engine - Access token registry
use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};
use rand::Rng;

use crate::clock::UnixMillis;
use crate::error::DrawError;

/// Length of a minted token
pub const TOKEN_LEN: usize = 24;

/// URL-safe alphabet, 64 symbols (6 bits per character)
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Retrieval right for one won slot
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Slot the token unlocks
    pub slot_index: usize,
    /// Identity that won the slot; the only one allowed to retrieve it
    pub owner: String,
    pub created_at: UnixMillis,
}

impl AccessToken {
    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner == identity
    }
}

/// Token -> (slot, owner) map
#[derive(Debug, Default, Clone)]
pub struct AccessTokenRegistry {
    tokens: HashMap<String, AccessToken>,
}

impl AccessTokenRegistry {
    pub fn from_records(records: Vec<AccessToken>) -> Self {
        Self {
            tokens: records
                .into_iter()
                .map(|record| (record.token.clone(), record))
                .collect(),
        }
    }

    /// Records ordered by creation time, for persistence
    pub fn records(&self) -> Vec<AccessToken> {
        let mut records: Vec<AccessToken> = self.tokens.values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.token.cmp(&b.token))
        });
        records
    }

    /// Mint a fresh token bound to `slot_index` and `owner`
    pub fn mint(&mut self, slot_index: usize, owner: &str, now: UnixMillis) -> AccessToken {
        let mut token = generate_token();
        while self.tokens.contains_key(&token) {
            token = generate_token();
        }

        let record = AccessToken {
            token: token.clone(),
            slot_index,
            owner: owner.to_string(),
            created_at: now,
        };
        self.tokens.insert(token, record.clone());
        record
    }

    pub fn resolve(&self, token: &str) -> Result<&AccessToken, DrawError> {
        self.tokens.get(token).ok_or(DrawError::TokenNotFound)
    }

    pub fn purge_all(&mut self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
