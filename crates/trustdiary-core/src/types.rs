//! Shared scalar types.

/// Identifier of an entry within one author's log.
///
/// Ids start at 1 and increase by one per append.
pub type EntryId = u64;

/// Current wall-clock time in Unix milliseconds.
///
/// A clock set before the epoch reads as 0.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
