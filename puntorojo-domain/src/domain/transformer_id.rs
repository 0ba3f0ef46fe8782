use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a distribution transformer (`ID_Trafo`), the join key
/// between infrastructure and commercial tables.
///
/// Stored trimmed so that `" 7"` and `"7"` refer to the same asset. Whole
/// numbers are kept in integer form, so `7.0` from a float column joins `7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformerId(String);

// Largest magnitude an f64 holds without losing integer precision.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl TransformerId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER => {
                Self(format!("{}", n as i64))
            }
            _ => Self(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TransformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransformerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u32> for TransformerId {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}
