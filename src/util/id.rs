//! Issue id generation and lookup-input validation.
//!
//! Ids have the form `<prefix>-<hash>` where hash is exactly 8 base36
//! lowercase chars derived from a SHA-256 of the issue's initial
//! content. Collisions are resolved with a bounded nonce loop.

use crate::error::{Result, TissueError};
use sha2::{Digest, Sha256};

/// Number of base36 chars in the hash portion of an issue id.
pub const HASH_LEN: usize = 8;

/// Maximum nonces tried before giving up on a unique id.
const MAX_NONCES: u32 = 10;

/// Maximum length of a normalized project prefix.
const MAX_PREFIX_LEN: usize = 32;

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Normalize an arbitrary string into a project prefix.
///
/// Lowercases ASCII letters, keeps letters and digits, collapses any
/// run of other characters to a single `-`, strips leading/trailing
/// dashes, and truncates to 32 chars.
///
/// # Errors
///
/// Returns `InvalidPrefix` if nothing remains.
pub fn normalize_prefix(input: &str) -> Result<String> {
    let mut out = String::new();
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    out.truncate(MAX_PREFIX_LEN);
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        return Err(TissueError::InvalidPrefix {
            input: input.to_string(),
        });
    }
    Ok(out)
}

/// Mint a new issue id, retrying with increasing nonces on collision.
///
/// The hash seed is `title | body | created_at | nonce`, pipe-joined
/// with timestamps and nonces in decimal. The leading 5 digest bytes
/// form a 40-bit integer written as 8 zero-padded base36 chars.
///
/// # Errors
///
/// Returns `IssueIdCollision` after 10 nonces, or any error from the
/// existence checker.
pub fn mint_issue_id<F>(
    prefix: &str,
    title: &str,
    body: &str,
    created_at: i64,
    mut exists: F,
) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    for nonce in 0..MAX_NONCES {
        let id = candidate_id(prefix, title, body, created_at, nonce);
        if !exists(&id)? {
            return Ok(id);
        }
    }
    Err(TissueError::IssueIdCollision {
        attempts: MAX_NONCES,
    })
}

/// Compute the candidate id for a given nonce.
#[must_use]
pub fn candidate_id(prefix: &str, title: &str, body: &str, created_at: i64, nonce: u32) -> String {
    let seed = format!("{title}|{body}|{created_at}|{nonce}");
    let digest = Sha256::digest(seed.as_bytes());

    // Leading 5 bytes as a 40-bit unsigned integer.
    let mut value: u64 = 0;
    for &byte in digest.iter().take(5) {
        value = (value << 8) | u64::from(byte);
    }

    format!("{prefix}-{}", base36_fixed(value))
}

/// Encode a value as exactly `HASH_LEN` base36 lowercase chars,
/// zero-padded on the left.
fn base36_fixed(mut value: u64) -> String {
    let mut buf = [b'0'; HASH_LEN];
    let mut pos = HASH_LEN;
    while value > 0 && pos > 0 {
        pos -= 1;
        buf[pos] = BASE36_ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    // 36^8 > 2^40, so the loop always terminates before pos hits 0.
    String::from_utf8_lossy(&buf).into_owned()
}

/// Guard for user-supplied lookup input.
///
/// # Errors
///
/// Returns `InvalidIdPrefix` if the input contains anything outside
/// `[A-Za-z0-9.-]`.
pub fn validate_lookup_input(input: &str) -> Result<()> {
    if input.is_empty()
        || !input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(TissueError::InvalidIdPrefix {
            input: input.to_string(),
        });
    }
    Ok(())
}

/// The hash portion of an id: the substring after the last `-`.
#[must_use]
pub fn hash_portion(id: &str) -> &str {
    id.rsplit('-').next().unwrap_or(id)
}
