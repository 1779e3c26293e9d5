use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

/// Generates a store-scoped log id: a random 128-bit value, hex-encoded.
/// Supersedes the `{ms}-{hash}` scheme below, which collides under high
/// ingest rates; kept only as the deterministic fallback tests pin on.
pub fn generate_log_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The source collector's original id scheme: `{timestamp_ms}-{6-hex-hash}`.
/// Not globally unique, only store-scoped. Used by fixtures that need a
/// deterministic id to assert against.
pub fn deterministic_log_id(timestamp_s: f64, message: &str) -> String {
    let ts_ms = (timestamp_s * 1000.0) as i64;
    let mut hasher = DefaultHasher::new();
    message.hash(&mut hasher);
    let digest = hasher.finish();
    format!("{ts_ms}-{:06x}", digest & 0xFFFFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_32_hex_chars() {
        let id = generate_log_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn deterministic_id_is_stable() {
        let a = deterministic_log_id(1700000000.5, "hello");
        let b = deterministic_log_id(1700000000.5, "hello");
        assert_eq!(a, b);
        assert!(a.starts_with("1700000000500-"));
    }
}
