//! Capture log entries.

use glcap_core::ResourceId;
use serde::{Deserialize, Serialize};

/// Marker prefix of debug annotations in the replay
pub const DEBUG_MARKER: &str = "// ** HAN_DEBUG_INFO ** ";

/// Resolves entries whose text depends on state learned after they were appended
pub trait DeferredResolver {
    /// Attribute bindings `(name, location)` learned for `program`, in discovery order
    fn attrib_bindings(&self, program: &ResourceId) -> Vec<(String, u32)>;
}

/// Resolver that knows no deferred state
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeferred;

impl DeferredResolver for NoDeferred {
    fn attrib_bindings(&self, _program: &ResourceId) -> Vec<(String, u32)> {
        Vec::new()
    }
}

/// One replayable log unit, in call order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureEntry {
    /// A replayable statement (`gl.bindBuffer(gl.ARRAY_BUFFER, buffer[0]);`)
    Call(String),
    /// A call recorded for reference only
    Comment(String),
    /// A debug annotation injected by the driver
    Debug(String),
    /// Frame boundary: one display refresh elapses here on replay
    Yield,
    /// Attribute-location bindings for a program, resolved at generation time
    AttribBindings {
        /// Program about to be linked
        program: ResourceId,
    },
}

impl CaptureEntry {
    /// Comment entry for a call text (`gl.getError()`)
    #[must_use]
    pub fn comment_call(call: &str) -> Self {
        Self::Comment(format!("// {};", call))
    }

    /// Whether this entry is a frame boundary
    #[must_use]
    pub const fn is_yield(&self) -> bool {
        matches!(self, Self::Yield)
    }

    /// Replay lines for this entry. Yield markers produce no lines.
    #[must_use]
    pub fn render(&self, resolver: &dyn DeferredResolver) -> Vec<String> {
        match self {
            Self::Call(text) | Self::Comment(text) => vec![text.clone()],
            Self::Debug(text) => vec![format!("{}{}", DEBUG_MARKER, text)],
            Self::Yield => Vec::new(),
            Self::AttribBindings { program } => resolver
                .attrib_bindings(program)
                .into_iter()
                .map(|(name, location)| {
                    format!(
                        "gl.bindAttribLocation({}, {}, {});",
                        program.replay_name(),
                        location,
                        serde_json::Value::String(name)
                    )
                })
                .collect(),
        }
    }

    /// Bytes fed to the log digest
    #[must_use]
    pub fn digest_bytes(&self) -> Vec<u8> {
        match self {
            Self::Call(text) => [b"c:".as_slice(), text.as_bytes()].concat(),
            Self::Comment(text) => [b"#:".as_slice(), text.as_bytes()].concat(),
            Self::Debug(text) => [b"d:".as_slice(), text.as_bytes()].concat(),
            Self::Yield => b"y".to_vec(),
            Self::AttribBindings { program } => format!("b:{}", program).into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glcap_core::TypeTag;

    struct Fixed(Vec<(String, u32)>);

    impl DeferredResolver for Fixed {
        fn attrib_bindings(&self, _program: &ResourceId) -> Vec<(String, u32)> {
            self.0.clone()
        }
    }

    #[test]
    fn test_render_call_and_comment() {
        let call = CaptureEntry::Call("gl.clear(gl.COLOR_BUFFER_BIT);".to_string());
        assert_eq!(call.render(&NoDeferred), vec!["gl.clear(gl.COLOR_BUFFER_BIT);"]);
        let comment = CaptureEntry::comment_call("gl.getError()");
        assert_eq!(comment.render(&NoDeferred), vec!["// gl.getError();"]);
    }

    #[test]
    fn test_render_debug() {
        let entry = CaptureEntry::Debug("frame 3".to_string());
        assert_eq!(
            entry.render(&NoDeferred),
            vec!["// ** HAN_DEBUG_INFO ** frame 3"]
        );
    }

    #[test]
    fn test_render_yield_is_empty() {
        assert!(CaptureEntry::Yield.render(&NoDeferred).is_empty());
        assert!(CaptureEntry::Yield.is_yield());
    }

    #[test]
    fn test_render_attrib_bindings() {
        let program = ResourceId::new(TypeTag::new("program"), 0);
        let entry = CaptureEntry::AttribBindings { program };
        let resolver = Fixed(vec![("position".to_string(), 0), ("normal".to_string(), 1)]);
        assert_eq!(
            entry.render(&resolver),
            vec![
                "gl.bindAttribLocation(program[0], 0, \"position\");",
                "gl.bindAttribLocation(program[0], 1, \"normal\");",
            ]
        );
    }

    #[test]
    fn test_digest_bytes_distinguish_kinds() {
        let call = CaptureEntry::Call("x".to_string());
        let comment = CaptureEntry::Comment("x".to_string());
        assert_ne!(call.digest_bytes(), comment.digest_bytes());
    }
}
