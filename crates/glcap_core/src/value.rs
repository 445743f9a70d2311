//! Live argument and return values crossing the host boundary.
//!
//! `HostValue` is the typed facade over everything the observed program can
//! pass into, or receive from, a graphics context: scalars, binary views,
//! image sources, opaque host objects, and plain records/lists.

use crate::id::HostHandle;
use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Element type of a typed binary view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl ElementType {
    /// All element types, in constructor-lookup order
    pub const ALL: [ElementType; 9] = [
        Self::Int8,
        Self::Uint8,
        Self::Uint8Clamped,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Float32,
        Self::Float64,
    ];

    /// Constructor name used in replay code
    #[must_use]
    pub const fn ctor_name(self) -> &'static str {
        match self {
            Self::Int8 => "Int8Array",
            Self::Uint8 => "Uint8Array",
            Self::Uint8Clamped => "Uint8ClampedArray",
            Self::Int16 => "Int16Array",
            Self::Uint16 => "Uint16Array",
            Self::Int32 => "Int32Array",
            Self::Uint32 => "Uint32Array",
            Self::Float32 => "Float32Array",
            Self::Float64 => "Float64Array",
        }
    }

    /// Size of one element in bytes
    #[must_use]
    pub const fn bytes_per_element(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 | Self::Uint8Clamped => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Parse a constructor name
    #[must_use]
    pub fn from_ctor_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.ctor_name() == name)
    }
}

/// A typed view over a byte payload (little-endian, like the host)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedArray {
    /// Element type
    pub element: ElementType,
    /// Raw bytes covered by the view
    pub data: Bytes,
}

impl TypedArray {
    /// Create a view; trailing bytes that do not form a whole element are dropped
    #[must_use]
    pub fn new(element: ElementType, data: impl Into<Bytes>) -> Self {
        let mut data: Bytes = data.into();
        let whole = data.len() - data.len() % element.bytes_per_element();
        data.truncate(whole);
        Self { element, data }
    }

    /// `Float32Array` from values
    #[must_use]
    pub fn from_f32(values: &[f32]) -> Self {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::new(ElementType::Float32, data)
    }

    /// `Uint16Array` from values
    #[must_use]
    pub fn from_u16(values: &[u16]) -> Self {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::new(ElementType::Uint16, data)
    }

    /// `Int32Array` from values
    #[must_use]
    pub fn from_i32(values: &[i32]) -> Self {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::new(ElementType::Int32, data)
    }

    /// `Uint8Array` from bytes
    #[must_use]
    pub fn from_u8(values: &[u8]) -> Self {
        Self::new(ElementType::Uint8, values.to_vec())
    }

    /// Zero-filled view of `len` elements
    #[must_use]
    pub fn zeroed(element: ElementType, len: usize) -> Self {
        Self::new(element, vec![0u8; len * element.bytes_per_element()])
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.element.bytes_per_element()
    }

    /// Whether the view has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Sub-view over elements `[start, end)`, clamped to the view
    #[must_use]
    pub fn slice_elements(&self, start: usize, end: usize) -> Self {
        let bpe = self.element.bytes_per_element();
        let end = end.min(self.len());
        let start = start.min(end);
        Self {
            element: self.element,
            data: self.data.slice(start * bpe..end * bpe),
        }
    }

    /// Decode as f32 values (for Float32 views)
    #[must_use]
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

/// What kind of host image source a value is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    /// `HTMLCanvasElement`
    Canvas,
    /// `ImageData`
    ImageData,
    /// `HTMLImageElement` / `Image`
    ImageElement,
    /// `HTMLVideoElement`
    Video,
    /// `ImageBitmap`
    ImageBitmap,
    /// `OffscreenCanvas`
    OffscreenCanvas,
}

impl ImageKind {
    /// Whether this source is identified by a URL
    #[must_use]
    pub const fn has_url(self) -> bool {
        matches!(self, Self::ImageElement | Self::Video)
    }
}

/// A host image source passed to a texture upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Source kind
    pub kind: ImageKind,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Source URL for image/video elements; `data:` URLs are inline sources
    pub src: Option<String>,
    /// Host identity of the element
    pub handle: HostHandle,
}

impl ImageSource {
    /// Create an image source
    #[must_use]
    pub fn new(kind: ImageKind, width: u32, height: u32, handle: HostHandle) -> Self {
        Self {
            kind,
            width,
            height,
            src: None,
            handle,
        }
    }

    /// Set the source URL
    #[must_use]
    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    /// Number of pixels
    #[must_use]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether the source already embeds its pixels (`data:` URL)
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.src.as_deref().is_some_and(|s| s.starts_with("data:"))
    }
}

/// A value crossing the host boundary
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Typed array view
    TypedArray(TypedArray),
    /// Untyped `ArrayBuffer`
    ArrayBuffer(Bytes),
    /// `DataView` over a buffer
    DataView(Bytes),
    /// Image, canvas, video or bitmap
    Image(ImageSource),
    /// Opaque host object (resource, uniform location, extension, ...)
    Handle(HostHandle),
    /// Plain list
    List(Vec<HostValue>),
    /// Plain record with ordered fields
    Record(IndexMap<String, HostValue>),
}

impl HostValue {
    /// Number value from anything convertible to f64
    #[must_use]
    pub fn number(n: impl Into<f64>) -> Self {
        Self::Number(n.into())
    }

    /// String value
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// `null` or `undefined`
    #[must_use]
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    /// Number payload
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Number payload as a non-negative index
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Number(n) if n.is_finite() && *n >= 0.0 => Some(*n as usize),
            _ => None,
        }
    }

    /// String payload
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Opaque handle payload
    #[must_use]
    pub const fn as_handle(&self) -> Option<HostHandle> {
        match self {
            Self::Handle(h) => Some(*h),
            _ => None,
        }
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for HostValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<TypedArray> for HostValue {
    fn from(a: TypedArray) -> Self {
        Self::TypedArray(a)
    }
}

impl From<HostHandle> for HostValue {
    fn from(h: HostHandle) -> Self {
        Self::Handle(h)
    }
}

impl From<ImageSource> for HostValue {
    fn from(i: ImageSource) -> Self {
        Self::Image(i)
    }
}

/// Render a number the way the replay host prints it.
///
/// Integral and ordinary fractional values print plainly; very large or very
/// small magnitudes use exponent form with an explicit sign (`1e+21`).
#[must_use]
pub fn js_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }
    let exp = format!("{:e}", n);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
        _ => exp,
    }
}
