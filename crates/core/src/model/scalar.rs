use serde::{Deserialize, Serialize};

/// A decoded OTLP attribute value. OTLP's `AnyValue` oneof collapses to one of
/// these four variants; the normalizer never stores the wrapper object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Int(i64),
    Bool(bool),
    Double(f64),
}

impl Scalar {
    /// Render as the string form used for label maps and attribute-alias lookups.
    pub fn to_display_string(&self) -> String {
        match self {
            Scalar::String(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Double(d) => d.to_string(),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_variant() {
        assert_eq!(Scalar::String("redis".into()).to_display_string(), "redis");
        assert_eq!(Scalar::Int(42).to_display_string(), "42");
        assert_eq!(Scalar::Bool(true).to_display_string(), "true");
        assert_eq!(Scalar::Double(1.5).to_display_string(), "1.5");
    }
}
