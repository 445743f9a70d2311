//! Capture configuration: serialization budget and recording options.

use crate::error::{CaptureError, CoreResult};
use serde::{Deserialize, Serialize};

/// Serialization budget for binary and image payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureLimits {
    /// Cumulative serialized text (bytes) after which every payload becomes a placeholder
    pub max_serialize_size: u64,
    /// Largest single payload, in elements (typed arrays), bytes (buffers) or pixels (images)
    pub max_array_size: u64,
}

impl CaptureLimits {
    /// Default global cap: 256 MiB
    pub const DEFAULT_MAX_SERIALIZE_SIZE: u64 = 256 * 1024 * 1024;
    /// Default per-value cap: 16 Mi
    pub const DEFAULT_MAX_ARRAY_SIZE: u64 = 16 * 1024 * 1024;

    /// Set the global cap
    #[must_use]
    pub fn with_max_serialize_size(mut self, bytes: u64) -> Self {
        self.max_serialize_size = bytes;
        self
    }

    /// Set the per-value cap
    #[must_use]
    pub fn with_max_array_size(mut self, len: u64) -> Self {
        self.max_array_size = len;
        self
    }

    /// Whether a payload of `len` must be replaced by a placeholder given the running total
    #[must_use]
    pub const fn exceeds(&self, serialized_so_far: u64, len: u64) -> bool {
        serialized_so_far > self.max_serialize_size || len > self.max_array_size
    }
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            max_serialize_size: Self::DEFAULT_MAX_SERIALIZE_SIZE,
            max_array_size: Self::DEFAULT_MAX_ARRAY_SIZE,
        }
    }
}

/// Per-context capture options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Serialization budget
    pub limits: CaptureLimits,
    /// Route uniform setters through a generated `setUniform` helper
    pub helper: bool,
    /// Start capturing as soon as a context is registered
    pub auto_capture: bool,
}

impl CaptureOptions {
    /// Set the budget
    #[must_use]
    pub fn with_limits(mut self, limits: CaptureLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Enable or disable the `setUniform` helper
    #[must_use]
    pub fn with_helper(mut self, helper: bool) -> Self {
        self.helper = helper;
        self
    }

    /// Enable or disable auto-capture on registration
    #[must_use]
    pub fn with_auto_capture(mut self, auto_capture: bool) -> Self {
        self.auto_capture = auto_capture;
        self
    }

    /// Parse options from JSON, filling missing fields with defaults
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the limits are zero
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject budgets that would placeholder every payload
    ///
    /// # Errors
    ///
    /// Returns error if either limit is zero
    pub fn validate(&self) -> CoreResult<()> {
        if self.limits.max_serialize_size == 0 {
            return Err(CaptureError::InvalidConfig {
                field: "limits.max_serialize_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.limits.max_array_size == 0 {
            return Err(CaptureError::InvalidConfig {
                field: "limits.max_array_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            limits: CaptureLimits::default(),
            helper: false,
            auto_capture: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = CaptureLimits::default();
        assert_eq!(limits.max_serialize_size, 256 * 1024 * 1024);
        assert_eq!(limits.max_array_size, 16 * 1024 * 1024);
    }

    #[test]
    fn test_limits_exceeds() {
        let limits = CaptureLimits::default()
            .with_max_serialize_size(100)
            .with_max_array_size(10);
        assert!(!limits.exceeds(100, 10));
        assert!(limits.exceeds(101, 1));
        assert!(limits.exceeds(0, 11));
    }

    #[test]
    fn test_options_default() {
        let options = CaptureOptions::default();
        assert!(options.auto_capture);
        assert!(!options.helper);
    }

    #[test]
    fn test_options_from_json_partial() {
        let options = CaptureOptions::from_json(r#"{"helper": true}"#).unwrap();
        assert!(options.helper);
        assert_eq!(options.limits, CaptureLimits::default());

        let options =
            CaptureOptions::from_json(r#"{"limits": {"max_array_size": 1024}}"#).unwrap();
        assert_eq!(options.limits.max_array_size, 1024);
        assert_eq!(
            options.limits.max_serialize_size,
            CaptureLimits::DEFAULT_MAX_SERIALIZE_SIZE
        );
    }

    #[test]
    fn test_options_reject_zero_limit() {
        let err = CaptureOptions::from_json(r#"{"limits": {"max_serialize_size": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfig { .. }));
    }
}
