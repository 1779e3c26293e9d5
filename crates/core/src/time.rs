use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock "now" in floating-point seconds since the Unix epoch, the unit
/// every index score and timestamp in this store is kept in.
pub fn now_s() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

pub fn ns_to_s(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_s_is_plausible() {
        let now = now_s();
        assert!(now > 1_700_000_000.0);
    }

    #[test]
    fn ns_to_s_converts() {
        assert_eq!(ns_to_s(1_000_000_000), 1.0);
        assert_eq!(ns_to_s(1_500_000_000), 1.5);
    }
}
