//! Core error types for glcap.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CaptureError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// A recorded call referenced a host object that no creation call tagged
    UntrackedResource {
        /// Function being recorded
        function: String,
        /// Raw host handle
        handle: u64,
    },

    /// The real host call failed
    Host {
        /// Function that failed
        function: String,
        /// Host-provided message
        message: String,
    },

    /// No captured context with this id
    UnknownContext {
        /// Context id as displayed
        id: String,
    },

    /// A value could not be encoded
    Encoding {
        /// Reason
        reason: String,
    },

    /// The artifact could not be compressed or transport-encoded
    Compression {
        /// Reason
        reason: String,
    },

    /// Configuration rejected
    InvalidConfig {
        /// Offending field
        field: String,
        /// Reason
        reason: String,
    },
}

impl CaptureError {
    /// Whether this error originated in the observed host rather than in capture
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host { .. })
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UntrackedResource { function, handle } => write!(
                f,
                "Untracked resource in {}: handle {:#x} was never created while capturing",
                function, handle
            ),
            Self::Host { function, message } => write!(f, "Host call {} failed: {}", function, message),
            Self::UnknownContext { id } => write!(f, "Unknown context: {}", id),
            Self::Encoding { reason } => write!(f, "Encoding error: {}", reason),
            Self::Compression { reason } => write!(f, "Compression error: {}", reason),
            Self::InvalidConfig { field, reason } => {
                write!(f, "Invalid config for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CaptureError::UnknownContext {
            id: "ctx_3".to_string(),
        };
        assert_eq!(format!("{}", err), "Unknown context: ctx_3");
    }

    #[test]
    fn test_untracked_resource_display() {
        let err = CaptureError::UntrackedResource {
            function: "bindBuffer".to_string(),
            handle: 0x2a,
        };
        let s = err.to_string();
        assert!(s.contains("bindBuffer"));
        assert!(s.contains("0x2a"));
    }

    #[test]
    fn test_is_host() {
        let err = CaptureError::Host {
            function: "drawArrays".to_string(),
            message: "context lost".to_string(),
        };
        assert!(err.is_host());
        assert!(!CaptureError::Encoding {
            reason: "x".to_string()
        }
        .is_host());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: CaptureError = json_err.into();
        assert!(matches!(err, CaptureError::Encoding { .. }));
    }
}
