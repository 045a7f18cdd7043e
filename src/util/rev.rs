//! Revision tokens.
//!
//! A revision token is a 26-char Crockford-base32 string holding a
//! 48-bit millisecond timestamp in the high bits and 80 bits of
//! monotonically increasing randomness below it. Tokens compare
//! byte-lexicographically: timestamp-first across processes, strictly
//! increasing within one process even inside a single millisecond.
//!
//! Comments use tokens as their id; issues and deps carry one for
//! last-writer-wins conflict resolution.

use ulid::Generator;

/// Length of an encoded revision token.
pub const REV_LEN: usize = 26;

/// Process-local token source. One lives behind each open store handle.
pub struct RevGenerator {
    inner: Generator,
}

impl std::fmt::Debug for RevGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevGenerator").finish_non_exhaustive()
    }
}

impl RevGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Generator::new(),
        }
    }

    /// Produce the next token.
    ///
    /// Two calls in the same millisecond increment the low 80 bits, so
    /// tokens from one process always strictly increase. On the
    /// (astronomically unlikely) random-part overflow, waits out the
    /// millisecond and retries.
    pub fn next(&mut self) -> String {
        loop {
            match self.inner.generate() {
                Ok(ulid) => return ulid.to_string(),
                Err(_) => std::thread::sleep(std::time::Duration::from_millis(1)),
            }
        }
    }
}

impl Default for RevGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let mut revs = RevGenerator::new();
        let token = revs.next();
        assert_eq!(token.len(), REV_LEN);
        // Crockford base32 alphabet, no I, L, O, U.
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || (c.is_ascii_uppercase() && !"ILOU".contains(c))));
    }

    #[test]
    fn test_tokens_strictly_increase() {
        let mut revs = RevGenerator::new();
        let mut prev = revs.next();
        for _ in 0..1000 {
            let next = revs.next();
            assert!(next > prev, "{next} should sort after {prev}");
            prev = next;
        }
    }

    #[test]
    fn test_tokens_sort_by_time_across_generators() {
        let mut a = RevGenerator::new();
        let early = a.next();
        std::thread::sleep(std::time::Duration::from_millis(3));
        let mut b = RevGenerator::new();
        let late = b.next();
        assert!(late > early);
    }
}
