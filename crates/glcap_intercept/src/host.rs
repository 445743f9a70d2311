//! Capability interface to the observed host.
//!
//! The host is anything that can enumerate its members and answer
//! `get`/`set`/`call` by name. A live browser binding, the simulated context
//! in `glcap_sim`, and the recording proxy all speak this surface.

use glcap_core::{CaptureError, HostHandle, HostValue, ImageSource, Timestamp};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Error reported by the host side of a call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The real function threw
    #[error("{function} threw: {message}")]
    Threw {
        /// Function that threw
        function: String,
        /// Host-provided message
        message: String,
    },

    /// No member with that name
    #[error("unknown member: {name}")]
    UnknownMember {
        /// Member name
        name: String,
    },

    /// The page could not rasterize an image source
    #[error("rasterize failed: {reason}")]
    Rasterize {
        /// Reason
        reason: String,
    },

    /// A recording proxy rejected the call after forwarding it
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl HostError {
    /// Shorthand for [`HostError::Threw`]
    #[must_use]
    pub fn threw(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Threw {
            function: function.into(),
            message: message.into(),
        }
    }
}

impl From<HostError> for CaptureError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Threw { function, message } => CaptureError::Host { function, message },
            HostError::UnknownMember { name } => CaptureError::Host {
                function: name,
                message: "unknown member".to_string(),
            },
            HostError::Rasterize { reason } => CaptureError::Encoding { reason },
            HostError::Capture(inner) => inner,
        }
    }
}

/// What a member holds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MemberKind {
    /// Numeric constant; feeds the enum-name table
    Number(f64),
    /// Callable
    Function,
    /// Plain property, passed through on get/set
    Property,
}

/// One enumerable member of a host object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member name
    pub name: String,
    /// Member kind
    pub kind: MemberKind,
}

impl Member {
    /// Numeric constant member
    #[must_use]
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Number(value),
        }
    }

    /// Function member
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Function,
        }
    }

    /// Property member
    #[must_use]
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
        }
    }
}

/// An object owned by the host, reachable by member name
pub trait HostObject {
    /// Enumerable members
    fn members(&self) -> Vec<Member>;

    /// Read a property
    ///
    /// # Errors
    ///
    /// Returns error if the member does not exist
    fn get(&self, name: &str) -> Result<HostValue, HostError>;

    /// Write a property
    ///
    /// # Errors
    ///
    /// Returns error if the member does not exist or rejects the value
    fn set(&mut self, name: &str, value: HostValue) -> Result<(), HostError>;

    /// Invoke a function member
    ///
    /// # Errors
    ///
    /// Returns whatever the host function throws
    fn call(&mut self, name: &str, args: &[HostValue]) -> Result<HostValue, HostError>;
}

/// Kind string passed to `getContext`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    /// `webgl`
    Webgl,
    /// `experimental-webgl`
    ExperimentalWebgl,
    /// `webgl2`
    Webgl2,
    /// Anything else (`2d`, `bitmaprenderer`, ...)
    Other(String),
}

impl ContextKind {
    /// Parse a `getContext` kind string
    #[must_use]
    pub fn parse(kind: &str) -> Self {
        match kind {
            "webgl" => Self::Webgl,
            "experimental-webgl" => Self::ExperimentalWebgl,
            "webgl2" => Self::Webgl2,
            other => Self::Other(other.to_string()),
        }
    }

    /// Kind string
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Webgl => "webgl",
            Self::ExperimentalWebgl => "experimental-webgl",
            Self::Webgl2 => "webgl2",
            Self::Other(s) => s,
        }
    }

    /// Whether contexts of this kind are captured
    #[must_use]
    pub const fn is_capturable(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A graphics context created by the host
pub trait GlContext: HostObject {
    /// Host identity of the context object
    fn handle(&self) -> HostHandle;

    /// Kind the context was created with
    fn context_kind(&self) -> ContextKind;

    /// Canvas `(width, height)` in pixels
    fn canvas_size(&self) -> (u32, u32);

    /// Attributes from `getContextAttributes()`, in host order
    fn context_attributes(&self) -> IndexMap<String, HostValue>;

    /// Whether the context belongs to an `OffscreenCanvas`
    fn is_offscreen(&self) -> bool {
        false
    }

    /// Look up an extension by its exact name; `None` if unsupported
    ///
    /// # Errors
    ///
    /// Returns error if the host throws
    fn get_extension(&mut self, name: &str) -> Result<Option<Box<dyn HostObject>>, HostError>;
}

/// Services the host page provides around the context
pub trait HostPage {
    /// Rasterize an image source to a still `data:` URL
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be drawn
    fn rasterize(&self, image: &ImageSource) -> Result<String, HostError>;

    /// Monotonic page time
    fn now(&self) -> Timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_kind_parse() {
        assert_eq!(ContextKind::parse("webgl2"), ContextKind::Webgl2);
        assert_eq!(
            ContextKind::parse("experimental-webgl"),
            ContextKind::ExperimentalWebgl
        );
        assert_eq!(ContextKind::parse("2d"), ContextKind::Other("2d".to_string()));
        assert_eq!(ContextKind::parse("webgl").as_str(), "webgl");
    }

    #[test]
    fn test_capturable_kinds() {
        assert!(ContextKind::Webgl.is_capturable());
        assert!(ContextKind::Webgl2.is_capturable());
        assert!(ContextKind::ExperimentalWebgl.is_capturable());
        assert!(!ContextKind::parse("2d").is_capturable());
    }

    #[test]
    fn test_host_error_into_capture_error() {
        let err: CaptureError = HostError::threw("drawArrays", "context lost").into();
        assert_eq!(
            err,
            CaptureError::Host {
                function: "drawArrays".to_string(),
                message: "context lost".to_string(),
            }
        );

        let err: CaptureError = HostError::Rasterize {
            reason: "tainted".to_string(),
        }
        .into();
        assert!(matches!(err, CaptureError::Encoding { .. }));
    }

    #[test]
    fn test_capture_error_passes_through() {
        let inner = CaptureError::UntrackedResource {
            function: "bindBuffer".to_string(),
            handle: 7,
        };
        let wrapped = HostError::from(inner.clone());
        assert_eq!(wrapped.to_string(), inner.to_string());
        assert_eq!(CaptureError::from(wrapped), inner);
    }
}
