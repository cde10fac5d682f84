//! Engine configuration.
//!
//! Defaults are usable as-is; `from_env()` lets a deployment override them:
//!
//! | variable                     | field                | default |
//! |------------------------------|----------------------|---------|
//! | `VERDANT_MAX_CASCADE_DEPTH`  | `max_cascade_depth`  | 8       |
//! | `VERDANT_VERIFY_CONSISTENCY` | `verify_consistency` | false   |

use tracing::warn;

use crate::error::{EngineError, EngineResult};

pub const MAX_CASCADE_DEPTH_VAR: &str = "VERDANT_MAX_CASCADE_DEPTH";
pub const VERIFY_CONSISTENCY_VAR: &str = "VERDANT_VERIFY_CONSISTENCY";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deepest rule-issued write allowed; client writes are depth 0.
    pub max_cascade_depth: u32,
    /// Run the full invariant scan before every commit.
    pub verify_consistency: bool,
}

impl EngineConfig {
    pub const DEFAULT_MAX_CASCADE_DEPTH: u32 = 8;

    pub fn with_max_cascade_depth(mut self, depth: u32) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    pub fn with_consistency_checks(mut self, enabled: bool) -> Self {
        self.verify_consistency = enabled;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_cascade_depth == 0 {
            return Err(EngineError::Config(
                "max_cascade_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from process environment, falling back to defaults on absent or
    /// malformed values.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_CASCADE_DEPTH_VAR) {
            match raw.trim().parse::<u32>() {
                Ok(depth) if depth > 0 => config.max_cascade_depth = depth,
                _ => warn!(
                    variable = MAX_CASCADE_DEPTH_VAR,
                    value = %raw,
                    "invalid cascade depth; using default"
                ),
            }
        }

        if let Some(raw) = lookup(VERIFY_CONSISTENCY_VAR) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.verify_consistency = true,
                "0" | "false" | "no" | "off" => config.verify_consistency = false,
                _ => warn!(
                    variable = VERIFY_CONSISTENCY_VAR,
                    value = %raw,
                    "invalid boolean; using default"
                ),
            }
        }

        config
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: Self::DEFAULT_MAX_CASCADE_DEPTH,
            verify_consistency: false,
        }
    }
}
