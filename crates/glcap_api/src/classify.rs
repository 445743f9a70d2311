//! Which handler a context member is routed to.

use serde::{Deserialize, Serialize};

/// Handler class for an intercepted function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallClass {
    /// Recorded as-is by the default wrapper
    Record,
    /// Creates a resource; the result is tagged and assigned into its collection
    Create,
    /// `shaderSource`: source text is deduplicated into the shader table
    ShaderSource,
    /// `useProgram`: also tracks the current program
    UseProgram,
    /// `getUniformLocation`: cached per (program, name)
    GetUniformLocation,
    /// `getAttribLocation`: cached and remembered for link-time binding
    GetAttribLocation,
    /// `bindAttribLocation`: executed but not recorded
    BindAttribLocation,
    /// `linkProgram`: preceded by every learned attribute binding
    LinkProgram,
    /// `fenceSync`: creates a sync object
    FenceSync,
    /// Uniform value setter; the location is re-resolved by name at replay
    Uniform,
    /// Status query or getter; recorded as a comment only
    Read,
    /// Executed, recorded as a comment only (readback)
    Skip,
    /// `getExtension`: wraps and caches the extension object
    GetExtension,
}

impl CallClass {
    /// Whether the call is recorded as a comment instead of a replayable statement
    #[must_use]
    pub const fn is_comment_only(self) -> bool {
        matches!(self, Self::Read | Self::Skip)
    }
}

/// Status queries and getters. They run for real but replay only as comments.
pub const READ_FUNCTIONS: &[&str] = &[
    "checkFramebufferStatus",
    "getActiveAttrib",
    "getActiveUniform",
    "getActiveUniformBlockName",
    "getActiveUniformBlockParameter",
    "getActiveUniforms",
    "getAttachedShaders",
    "getBufferParameter",
    "getContextAttributes",
    "getError",
    "getFragDataLocation",
    "getFramebufferAttachmentParameter",
    "getIndexedParameter",
    "getInternalformatParameter",
    "getParameter",
    "getProgramInfoLog",
    "getProgramParameter",
    "getQuery",
    "getQueryParameter",
    "getRenderbufferParameter",
    "getSamplerParameter",
    "getShaderInfoLog",
    "getShaderParameter",
    "getShaderPrecisionFormat",
    "getShaderSource",
    "getSupportedExtensions",
    "getSyncParameter",
    "getTexParameter",
    "getTransformFeedbackVarying",
    "getUniform",
    "getUniformBlockIndex",
    "getUniformIndices",
    "getVertexAttrib",
    "getVertexAttribOffset",
    "isBuffer",
    "isContextLost",
    "isEnabled",
    "isFramebuffer",
    "isProgram",
    "isQuery",
    "isRenderbuffer",
    "isSampler",
    "isShader",
    "isSync",
    "isTexture",
    "isTransformFeedback",
    "isVertexArray",
];

/// Readbacks whose output is never needed by the replay
pub const SKIP_FUNCTIONS: &[&str] = &["readPixels"];

/// Whether `name` is a uniform value setter (`uniform4fv`, `uniformMatrix3x2fv`, ...)
#[must_use]
pub fn is_uniform_setter(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("uniform") else {
        return false;
    };
    rest.starts_with("Matrix") || rest.chars().next().is_some_and(|c| ('1'..='4').contains(&c))
}

/// Classify a context or extension function by name
#[must_use]
pub fn classify(name: &str) -> CallClass {
    match name {
        "shaderSource" => CallClass::ShaderSource,
        "useProgram" => CallClass::UseProgram,
        "getUniformLocation" => CallClass::GetUniformLocation,
        "getAttribLocation" => CallClass::GetAttribLocation,
        "bindAttribLocation" => CallClass::BindAttribLocation,
        "linkProgram" => CallClass::LinkProgram,
        "fenceSync" => CallClass::FenceSync,
        "getExtension" => CallClass::GetExtension,
        _ if name.starts_with("create") && name.len() > "create".len() => CallClass::Create,
        _ if is_uniform_setter(name) => CallClass::Uniform,
        _ if SKIP_FUNCTIONS.contains(&name) => CallClass::Skip,
        _ if READ_FUNCTIONS.contains(&name) => CallClass::Read,
        _ => CallClass::Record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_create_family() {
        assert_eq!(classify("createBuffer"), CallClass::Create);
        assert_eq!(classify("createVertexArrayOES"), CallClass::Create);
        assert_eq!(classify("create"), CallClass::Record);
    }

    #[test]
    fn test_classify_uniforms() {
        assert_eq!(classify("uniform1f"), CallClass::Uniform);
        assert_eq!(classify("uniform4fv"), CallClass::Uniform);
        assert_eq!(classify("uniformMatrix3x2fv"), CallClass::Uniform);
        assert_eq!(classify("uniformBlockBinding"), CallClass::Record);
    }

    #[test]
    fn test_classify_reads_and_skips() {
        assert_eq!(classify("getError"), CallClass::Read);
        assert_eq!(classify("getParameter"), CallClass::Read);
        assert_eq!(classify("isTexture"), CallClass::Read);
        assert_eq!(classify("readPixels"), CallClass::Skip);
        assert!(classify("getShaderInfoLog").is_comment_only());
        assert!(!classify("drawArrays").is_comment_only());
    }

    #[test]
    fn test_classify_specialized() {
        assert_eq!(classify("linkProgram"), CallClass::LinkProgram);
        assert_eq!(classify("bindAttribLocation"), CallClass::BindAttribLocation);
        assert_eq!(classify("fenceSync"), CallClass::FenceSync);
        assert_eq!(classify("getExtension"), CallClass::GetExtension);
        assert_eq!(classify("bufferData"), CallClass::Record);
    }
}
