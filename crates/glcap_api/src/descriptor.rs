//! Per-function argument roles, keyed by `(name, argument count)`.
//!
//! The context API overloads many functions by arity (`texImage2D` has 6, 9
//! and 10 argument forms with different meanings at the same position), so a
//! descriptor is only ever looked up by the exact pair.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// Flags accepted by `clear` and `blitFramebuffer` masks
pub const BUFFER_BITS: &[&str] = &["COLOR_BUFFER_BIT", "DEPTH_BUFFER_BIT", "STENCIL_BUFFER_BIT"];

/// Flags accepted by `clientWaitSync`
pub const SYNC_BITS: &[&str] = &["SYNC_FLUSH_COMMANDS_BIT"];

/// How one positional argument is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRole {
    /// Render via the enum-name table, decimal fallback
    Enum,
    /// Plain number
    Number,
    /// List of enum values
    EnumArray,
    /// OR of the listed flags, raw number if no exact decomposition exists
    Bitfield(&'static [&'static str]),
    /// Output buffer written by the host; replay allocates zeros of the same length
    ReadOnly,
}

/// Trailing offset/length pair that narrows a source view before encoding.
///
/// Offset and length count elements of the source view (bytes for untyped
/// buffers). A length of zero, or no length argument, means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRule {
    /// Index of the source view
    pub source_index: usize,
    /// Index of the element offset
    pub offset_index: usize,
    /// Index of the element count, if the overload has one
    pub length_index: Option<usize>,
}

impl SliceRule {
    /// Number of trailing arguments the rule consumes
    #[must_use]
    pub const fn trailing(&self) -> usize {
        if self.length_index.is_some() {
            2
        } else {
            1
        }
    }
}

/// Metadata for one `(name, argc)` overload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallDescriptor {
    roles: BTreeMap<usize, ArgRole>,
    slice: Option<SliceRule>,
}

impl CallDescriptor {
    /// Empty descriptor: every argument uses the generic encoding
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Role of the argument at `index`
    #[must_use]
    pub fn role(&self, index: usize) -> Option<ArgRole> {
        self.roles.get(&index).copied()
    }

    /// Slice rule, if the overload narrows a source view
    #[must_use]
    pub const fn slice(&self) -> Option<SliceRule> {
        self.slice
    }

    /// Declared roles in argument order
    pub fn roles(&self) -> impl Iterator<Item = (usize, ArgRole)> + '_ {
        self.roles.iter().map(|(i, r)| (*i, *r))
    }

    #[must_use]
    fn enums(mut self, indices: &[usize]) -> Self {
        for i in indices {
            self.roles.insert(*i, ArgRole::Enum);
        }
        self
    }

    /// Numbers never override a stronger role on the same index.
    #[must_use]
    fn numbers(mut self, indices: &[usize]) -> Self {
        for i in indices {
            self.roles.entry(*i).or_insert(ArgRole::Number);
        }
        self
    }

    #[must_use]
    fn enum_array(mut self, index: usize) -> Self {
        self.roles.insert(index, ArgRole::EnumArray);
        self
    }

    #[must_use]
    fn bitfield(mut self, index: usize, flags: &'static [&'static str]) -> Self {
        self.roles.insert(index, ArgRole::Bitfield(flags));
        self
    }

    #[must_use]
    fn read(mut self, index: usize) -> Self {
        self.roles.insert(index, ArgRole::ReadOnly);
        self
    }

    #[must_use]
    fn sliced(mut self, source_index: usize, offset_index: usize, length_index: Option<usize>) -> Self {
        self.slice = Some(SliceRule {
            source_index,
            offset_index,
            length_index,
        });
        self.numbers(&[offset_index]).numbers(&length_index.into_iter().collect::<Vec<_>>())
    }
}

/// Registry of every described overload
#[derive(Debug, Default)]
pub struct DescriptorTable {
    entries: HashMap<&'static str, HashMap<usize, CallDescriptor>>,
}

impl DescriptorTable {
    /// Look up the descriptor for an exact overload
    #[must_use]
    pub fn get(&self, name: &str, argc: usize) -> Option<&CallDescriptor> {
        self.entries.get(name).and_then(|overloads| overloads.get(&argc))
    }

    /// Whether any overload of `name` is described
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of described overloads
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn add(&mut self, name: &'static str, argc: usize, descriptor: CallDescriptor) {
        self.entries.entry(name).or_default().insert(argc, descriptor);
    }
}

/// Descriptor for an exact `(name, argc)` overload, if one is declared
#[must_use]
pub fn descriptor(name: &str, argc: usize) -> Option<&'static CallDescriptor> {
    DESCRIPTORS.get(name, argc)
}

/// The static descriptor table
pub static DESCRIPTORS: Lazy<DescriptorTable> = Lazy::new(build);

fn d() -> CallDescriptor {
    CallDescriptor::new()
}

fn build() -> DescriptorTable {
    let mut t = DescriptorTable::default();

    // Generic setters and getters
    t.add("enable", 1, d().enums(&[0]));
    t.add("disable", 1, d().enums(&[0]));
    t.add("getParameter", 1, d().enums(&[0]));
    t.add("isEnabled", 1, d().enums(&[0]));
    t.add("hint", 2, d().enums(&[0, 1]));

    // Rendering
    t.add("drawArrays", 3, d().enums(&[0]).numbers(&[1, 2]));
    t.add("drawElements", 4, d().enums(&[0, 2]).numbers(&[1, 3]));
    t.add("drawArraysInstanced", 4, d().enums(&[0]).numbers(&[1, 2, 3]));
    t.add("drawElementsInstanced", 5, d().enums(&[0, 2]).numbers(&[1, 3, 4]));
    t.add("drawRangeElements", 6, d().enums(&[0, 4]).numbers(&[1, 2, 3, 5]));

    // Shaders
    t.add("createShader", 1, d().enums(&[0]));
    t.add("getActiveAttrib", 2, d().numbers(&[1]));
    t.add("getActiveUniform", 2, d().numbers(&[1]));
    t.add("getShaderParameter", 2, d().enums(&[1]));
    t.add("getProgramParameter", 2, d().enums(&[1]));
    t.add("getShaderPrecisionFormat", 2, d().enums(&[0, 1]));
    t.add("bindAttribLocation", 3, d().numbers(&[1]));

    // Vertex attributes
    t.add("getVertexAttrib", 2, d().enums(&[1]).numbers(&[0]));
    t.add("vertexAttribPointer", 6, d().enums(&[2]).numbers(&[0, 1, 4, 5]));
    t.add("vertexAttribIPointer", 5, d().enums(&[2]).numbers(&[0, 1, 3, 4]));
    t.add("vertexAttribDivisor", 2, d().numbers(&[0, 1]));
    t.add("disableVertexAttribArray", 1, d().numbers(&[0]));
    t.add("enableVertexAttribArray", 1, d().numbers(&[0]));

    // Textures
    t.add("bindTexture", 2, d().enums(&[0]));
    t.add("activeTexture", 1, d().enums(&[0]));
    t.add("getTexParameter", 2, d().enums(&[0, 1]));
    t.add("texParameterf", 3, d().enums(&[0, 1]).numbers(&[2]));
    t.add("texParameteri", 3, d().enums(&[0, 1]).numbers(&[2]));
    t.add("texImage2D", 6, d().enums(&[0, 2, 3, 4]).numbers(&[1]));
    t.add("texImage2D", 9, d().enums(&[0, 2, 6, 7]).numbers(&[1, 3, 4, 5]));
    t.add(
        "texImage2D",
        10,
        d().enums(&[0, 2, 6, 7]).numbers(&[1, 3, 4, 5]).sliced(8, 9, None),
    );
    t.add("texImage3D", 10, d().enums(&[0, 2, 7, 8]).numbers(&[1, 3, 4, 5]));
    t.add(
        "texImage3D",
        11,
        d().enums(&[0, 2, 7, 8]).numbers(&[1, 3, 4, 5]).sliced(9, 10, None),
    );
    t.add("texSubImage2D", 7, d().enums(&[0, 4, 5]).numbers(&[1, 2, 3]));
    t.add("texSubImage2D", 9, d().enums(&[0, 6, 7]).numbers(&[1, 2, 3, 4, 5]));
    t.add(
        "texSubImage2D",
        10,
        d().enums(&[0, 6, 7]).numbers(&[1, 2, 3, 4, 5]).sliced(8, 9, None),
    );
    t.add("texSubImage3D", 11, d().enums(&[0, 8, 9]).numbers(&[1, 2, 3, 4, 5, 6, 7]));
    t.add(
        "texSubImage3D",
        12,
        d().enums(&[0, 8, 9]).numbers(&[1, 2, 3, 4, 5, 6, 7]).sliced(10, 11, None),
    );
    t.add("texStorage2D", 5, d().enums(&[0, 2]).numbers(&[1, 3, 4]));
    t.add("texStorage3D", 6, d().enums(&[0, 2]).numbers(&[1, 3, 4, 5]));
    t.add("copyTexImage2D", 8, d().enums(&[0, 2]).numbers(&[1, 3, 4, 5, 6, 7]));
    t.add("copyTexSubImage2D", 8, d().enums(&[0]).numbers(&[1, 2, 3, 4, 5, 6, 7]));
    t.add("copyTexSubImage3D", 9, d().enums(&[0]).numbers(&[1, 2, 3, 4, 5, 6, 7, 8]));
    t.add("generateMipmap", 1, d().enums(&[0]));
    t.add("compressedTexImage2D", 7, d().enums(&[0, 2]).numbers(&[1, 3, 4, 5]));
    t.add(
        "compressedTexImage2D",
        8,
        d().enums(&[0, 2]).numbers(&[1, 3, 4, 5]).sliced(6, 7, None),
    );
    t.add(
        "compressedTexImage2D",
        9,
        d().enums(&[0, 2]).numbers(&[1, 3, 4, 5]).sliced(6, 7, Some(8)),
    );
    t.add("compressedTexSubImage2D", 8, d().enums(&[0, 6]).numbers(&[1, 2, 3, 4, 5]));
    t.add(
        "compressedTexSubImage2D",
        9,
        d().enums(&[0, 6]).numbers(&[1, 2, 3, 4, 5]).sliced(7, 8, None),
    );
    t.add(
        "compressedTexSubImage2D",
        10,
        d().enums(&[0, 6]).numbers(&[1, 2, 3, 4, 5]).sliced(7, 8, Some(9)),
    );
    t.add("compressedTexImage3D", 8, d().enums(&[0, 2]).numbers(&[1, 3, 4, 5, 6]));
    t.add(
        "compressedTexImage3D",
        9,
        d().enums(&[0, 2]).numbers(&[1, 3, 4, 5, 6]).sliced(7, 8, None),
    );
    t.add(
        "compressedTexImage3D",
        10,
        d().enums(&[0, 2]).numbers(&[1, 3, 4, 5, 6]).sliced(7, 8, Some(9)),
    );
    t.add(
        "compressedTexSubImage3D",
        10,
        d().enums(&[0, 8]).numbers(&[1, 2, 3, 4, 5, 6, 7]),
    );
    t.add(
        "compressedTexSubImage3D",
        11,
        d().enums(&[0, 8]).numbers(&[1, 2, 3, 4, 5, 6, 7]).sliced(9, 10, None),
    );
    t.add(
        "compressedTexSubImage3D",
        12,
        d().enums(&[0, 8]).numbers(&[1, 2, 3, 4, 5, 6, 7]).sliced(9, 10, Some(11)),
    );

    // Buffer objects
    t.add("bindBuffer", 2, d().enums(&[0]));
    t.add("bufferData", 3, d().enums(&[0, 2]));
    t.add("bufferData", 4, d().enums(&[0, 2]).sliced(1, 3, None));
    t.add("bufferData", 5, d().enums(&[0, 2]).sliced(1, 3, Some(4)));
    t.add("bufferSubData", 3, d().enums(&[0]).numbers(&[1]));
    t.add("bufferSubData", 4, d().enums(&[0]).numbers(&[1]).sliced(2, 3, None));
    t.add("bufferSubData", 5, d().enums(&[0]).numbers(&[1]).sliced(2, 3, Some(4)));
    t.add("copyBufferSubData", 5, d().enums(&[0, 1]).numbers(&[2, 3, 4]));
    t.add("getBufferParameter", 2, d().enums(&[0, 1]));
    t.add("getBufferSubData", 3, d().enums(&[0]).numbers(&[1]).read(2));
    t.add("getBufferSubData", 4, d().enums(&[0]).numbers(&[1, 3]).read(2));
    t.add("getBufferSubData", 5, d().enums(&[0]).numbers(&[1, 3, 4]).read(2));

    // Renderbuffers and framebuffers
    t.add("pixelStorei", 2, d().enums(&[0]).numbers(&[1]));
    t.add("readPixels", 7, d().enums(&[4, 5]).numbers(&[0, 1, 2, 3]).read(6));
    t.add("readPixels", 8, d().enums(&[4, 5]).numbers(&[0, 1, 2, 3, 7]).read(6));
    t.add("bindRenderbuffer", 2, d().enums(&[0]));
    t.add("bindFramebuffer", 2, d().enums(&[0]));
    t.add(
        "blitFramebuffer",
        10,
        d().numbers(&[0, 1, 2, 3, 4, 5, 6, 7]).bitfield(8, BUFFER_BITS).enums(&[9]),
    );
    t.add("checkFramebufferStatus", 1, d().enums(&[0]));
    t.add("framebufferRenderbuffer", 4, d().enums(&[0, 1, 2]));
    t.add("framebufferTexture2D", 5, d().enums(&[0, 1, 2]).numbers(&[4]));
    t.add("framebufferTextureLayer", 5, d().enums(&[0, 1]).numbers(&[3, 4]));
    t.add("getFramebufferAttachmentParameter", 3, d().enums(&[0, 1, 2]));
    t.add("getInternalformatParameter", 3, d().enums(&[0, 1, 2]));
    t.add("getRenderbufferParameter", 2, d().enums(&[0, 1]));
    t.add("invalidateFramebuffer", 2, d().enums(&[0]).enum_array(1));
    t.add(
        "invalidateSubFramebuffer",
        6,
        d().enums(&[0]).enum_array(1).numbers(&[2, 3, 4, 5]),
    );
    t.add("readBuffer", 1, d().enums(&[0]));
    t.add("renderbufferStorage", 4, d().enums(&[0, 1]).numbers(&[2, 3]));
    t.add("renderbufferStorageMultisample", 5, d().enums(&[0, 2]).numbers(&[1, 3, 4]));

    // Clear, blend, depth and stencil
    t.add("lineWidth", 1, d().numbers(&[0]));
    t.add("polygonOffset", 2, d().numbers(&[0, 1]));
    t.add("scissor", 4, d().numbers(&[0, 1, 2, 3]));
    t.add("viewport", 4, d().numbers(&[0, 1, 2, 3]));
    t.add("clear", 1, d().bitfield(0, BUFFER_BITS));
    t.add("clearColor", 4, d().numbers(&[0, 1, 2, 3]));
    t.add("clearDepth", 1, d().numbers(&[0]));
    t.add("clearStencil", 1, d().numbers(&[0]));
    t.add("depthFunc", 1, d().enums(&[0]));
    t.add("depthRange", 2, d().numbers(&[0, 1]));
    t.add("blendColor", 4, d().numbers(&[0, 1, 2, 3]));
    t.add("blendFunc", 2, d().enums(&[0, 1]));
    t.add("blendFuncSeparate", 4, d().enums(&[0, 1, 2, 3]));
    t.add("blendEquation", 1, d().enums(&[0]));
    t.add("blendEquationSeparate", 2, d().enums(&[0, 1]));
    t.add("stencilFunc", 3, d().enums(&[0]).numbers(&[1, 2]));
    t.add("stencilFuncSeparate", 4, d().enums(&[0, 1]).numbers(&[2, 3]));
    t.add("stencilMask", 1, d().numbers(&[0]));
    t.add("stencilMaskSeparate", 2, d().enums(&[0]).numbers(&[1]));
    t.add("stencilOp", 3, d().enums(&[0, 1, 2]));
    t.add("stencilOpSeparate", 4, d().enums(&[0, 1, 2, 3]));

    // Culling
    t.add("cullFace", 1, d().enums(&[0]));
    t.add("frontFace", 1, d().enums(&[0]));

    // Extensions
    t.add("drawArraysInstancedANGLE", 4, d().enums(&[0]).numbers(&[1, 2, 3]));
    t.add("drawElementsInstancedANGLE", 5, d().enums(&[0, 2]).numbers(&[1, 3, 4]));
    t.add("vertexAttribDivisorANGLE", 2, d().numbers(&[0, 1]));
    t.add("blendEquationEXT", 1, d().enums(&[0]));

    // Multiple render targets
    t.add("drawBuffersWEBGL", 1, d().enum_array(0));
    t.add("drawBuffers", 1, d().enum_array(0));
    for name in ["clearBufferfv", "clearBufferiv", "clearBufferuiv"] {
        t.add(name, 3, d().enums(&[0]).numbers(&[1]));
        t.add(name, 4, d().enums(&[0]).numbers(&[1, 2]));
    }
    t.add("clearBufferfi", 4, d().enums(&[0]).numbers(&[1, 2, 3]));

    // Uniform value setters
    for (name, argc) in [
        ("uniform1f", 2),
        ("uniform2f", 3),
        ("uniform3f", 4),
        ("uniform4f", 5),
        ("uniform1i", 2),
        ("uniform2i", 3),
        ("uniform3i", 4),
        ("uniform4i", 5),
        ("uniform1ui", 2),
        ("uniform2ui", 3),
        ("uniform3ui", 4),
        ("uniform4ui", 5),
    ] {
        t.add(name, argc, d().numbers(&(1..argc).collect::<Vec<_>>()));
    }
    for name in [
        "uniform1fv", "uniform2fv", "uniform3fv", "uniform4fv", "uniform1iv", "uniform2iv",
        "uniform3iv", "uniform4iv", "uniform1uiv", "uniform2uiv", "uniform3uiv", "uniform4uiv",
    ] {
        t.add(name, 2, d());
        t.add(name, 3, d().sliced(1, 2, None));
        t.add(name, 4, d().sliced(1, 2, Some(3)));
    }
    for name in [
        "uniformMatrix2fv",
        "uniformMatrix3fv",
        "uniformMatrix4fv",
        "uniformMatrix2x3fv",
        "uniformMatrix2x4fv",
        "uniformMatrix3x2fv",
        "uniformMatrix3x4fv",
        "uniformMatrix4x2fv",
        "uniformMatrix4x3fv",
    ] {
        t.add(name, 3, d());
        t.add(name, 4, d().sliced(2, 3, None));
        t.add(name, 5, d().sliced(2, 3, Some(4)));
    }

    // Attribute value setters
    t.add("vertexAttrib1f", 2, d().numbers(&[0, 1]));
    t.add("vertexAttrib2f", 3, d().numbers(&[0, 1, 2]));
    t.add("vertexAttrib3f", 4, d().numbers(&[0, 1, 2, 3]));
    t.add("vertexAttrib4f", 5, d().numbers(&[0, 1, 2, 3, 4]));
    for name in [
        "vertexAttrib1fv",
        "vertexAttrib2fv",
        "vertexAttrib3fv",
        "vertexAttrib4fv",
        "vertexAttribI4iv",
        "vertexAttribI4uiv",
    ] {
        t.add(name, 2, d().numbers(&[0]));
    }
    t.add("vertexAttribI4i", 5, d().numbers(&[0, 1, 2, 3, 4]));
    t.add("vertexAttribI4ui", 5, d().numbers(&[0, 1, 2, 3, 4]));

    // Query objects
    t.add("beginQuery", 2, d().enums(&[0]));
    t.add("endQuery", 1, d().enums(&[0]));
    t.add("getQuery", 2, d().enums(&[0, 1]));
    t.add("getQueryParameter", 2, d().enums(&[1]));

    // Sampler objects
    t.add("samplerParameteri", 3, d().enums(&[1]));
    t.add("samplerParameterf", 3, d().enums(&[1]));
    t.add("getSamplerParameter", 2, d().enums(&[1]));

    // Sync objects
    t.add("clientWaitSync", 3, d().bitfield(1, SYNC_BITS).numbers(&[2]));
    t.add("waitSync", 3, d().bitfield(1, SYNC_BITS).numbers(&[2]));
    t.add("fenceSync", 2, d().enums(&[0]));
    t.add("getSyncParameter", 2, d().enums(&[1]));

    // Transform feedback
    t.add("bindTransformFeedback", 2, d().enums(&[0]));
    t.add("beginTransformFeedback", 1, d().enums(&[0]));

    // Uniform buffer objects and transform feedback buffers
    t.add("bindBufferBase", 3, d().enums(&[0]).numbers(&[1]));
    t.add("bindBufferRange", 5, d().enums(&[0]).numbers(&[1, 3, 4]));
    t.add("getIndexedParameter", 2, d().enums(&[0]).numbers(&[1]));
    t.add("getActiveUniforms", 3, d().enums(&[2]));
    t.add("getActiveUniformBlockParameter", 3, d().enums(&[2]).numbers(&[1]));
    t.add("getActiveUniformBlockName", 2, d().numbers(&[1]));
    t.add("transformFeedbackVaryings", 3, d().enums(&[2]));
    t.add("uniformBlockBinding", 3, d().numbers(&[1, 2]));

    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_arity_exact() {
        let six = descriptor("texImage2D", 6).unwrap();
        let nine = descriptor("texImage2D", 9).unwrap();
        assert_eq!(six.role(3), Some(ArgRole::Enum));
        assert_eq!(nine.role(3), Some(ArgRole::Number));
        assert!(descriptor("texImage2D", 7).is_none());
    }

    #[test]
    fn test_unknown_function() {
        assert!(descriptor("notAFunction", 1).is_none());
    }

    #[test]
    fn test_clear_is_bitfield() {
        let clear = descriptor("clear", 1).unwrap();
        assert_eq!(clear.role(0), Some(ArgRole::Bitfield(BUFFER_BITS)));
    }

    #[test]
    fn test_blit_framebuffer_roles() {
        let blit = descriptor("blitFramebuffer", 10).unwrap();
        assert_eq!(blit.role(0), Some(ArgRole::Number));
        assert_eq!(blit.role(8), Some(ArgRole::Bitfield(BUFFER_BITS)));
        assert_eq!(blit.role(9), Some(ArgRole::Enum));
    }

    #[test]
    fn test_read_pixels_output_is_read_only() {
        let read = descriptor("readPixels", 7).unwrap();
        assert_eq!(read.role(6), Some(ArgRole::ReadOnly));
        assert_eq!(read.role(4), Some(ArgRole::Enum));
    }

    #[test]
    fn test_slice_rules() {
        let sub = descriptor("bufferSubData", 5).unwrap().slice().unwrap();
        assert_eq!(sub.source_index, 2);
        assert_eq!(sub.offset_index, 3);
        assert_eq!(sub.length_index, Some(4));
        assert_eq!(sub.trailing(), 2);

        let uniform = descriptor("uniformMatrix4fv", 4).unwrap().slice().unwrap();
        assert_eq!(uniform.source_index, 2);
        assert_eq!(uniform.length_index, None);
        assert_eq!(uniform.trailing(), 1);

        assert!(descriptor("uniform4fv", 2).unwrap().slice().is_none());
    }

    #[test]
    fn test_enum_arrays() {
        assert_eq!(descriptor("drawBuffers", 1).unwrap().role(0), Some(ArgRole::EnumArray));
        assert_eq!(
            descriptor("invalidateFramebuffer", 2).unwrap().role(1),
            Some(ArgRole::EnumArray)
        );
    }

    #[test]
    fn test_numbers_do_not_override_enums() {
        let d = d().enums(&[1]).numbers(&[1, 2]);
        assert_eq!(d.role(1), Some(ArgRole::Enum));
        assert_eq!(d.role(2), Some(ArgRole::Number));
    }
}
