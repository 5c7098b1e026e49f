//! Identifier and timestamp helpers.

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generate a time-ordered identifier with the given prefix (`thr_0190...`).
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::now_v7().simple())
}

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = generate_id("msg");
        let b = generate_id("msg");
        assert!(a.starts_with("msg_"));
        assert_ne!(a, b);
        assert_eq!(a.len(), "msg_".len() + 32);
    }
}
