// Prize Draw Engine - Utility Functions
use rand::Rng;

use crate::clock::UnixMillis;

const NAME_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Replace every run of characters outside `[A-Za-z0-9_.\-()+ ]` with a single `_`
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '(' | ')' | '+' | ' ') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// Collision-resistant stored name: `<millis>_<8 random chars>_<sanitized original>`
pub fn stored_file_name(now: UnixMillis, original_name: &str) -> String {
    let mut rng = rand::rng();
    let nonce: String = (0..8)
        .map(|_| NAME_ALPHABET[rng.random_range(0..NAME_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", now, nonce, sanitize_file_name(original_name))
}
