//! Argument encoder.
//!
//! Turns the live arguments of one call into replay source text. Roles come
//! from the call descriptor table; binary payloads go out of line into the
//! context's tables and are referenced by slot.

use crate::host::HostPage;
use crate::tracker::ResourceTracker;
use glcap_api::{as_constant_key, constant, descriptor, ArgRole, EnumTable, GL_NAMESPACE};
use glcap_core::{js_number, CoreResult, ElementType, HostValue, ImageSource, TypedArray};
use glcap_log::CaptureSession;
use glcap_storage::{base64_len, CaptureTables, ImageKey, ImagePayload, Placeholder};
use indexmap::IndexMap;
use std::borrow::Cow;
use tracing::warn;

/// Elements per line in inlined list literals
pub const LIST_CHUNK: usize = 32;

/// Encodes the arguments of calls on one context
pub struct ArgEncoder<'a> {
    enums: &'a EnumTable,
    tracker: &'a ResourceTracker,
    tables: &'a mut CaptureTables,
    session: &'a mut CaptureSession,
    page: &'a dyn HostPage,
}

impl<'a> ArgEncoder<'a> {
    /// Borrow everything one encoding pass touches
    pub fn new(
        enums: &'a EnumTable,
        tracker: &'a ResourceTracker,
        tables: &'a mut CaptureTables,
        session: &'a mut CaptureSession,
        page: &'a dyn HostPage,
    ) -> Self {
        Self {
            enums,
            tracker,
            tables,
            session,
            page,
        }
    }

    /// Render every argument of `function`, after applying its slice rule
    ///
    /// # Errors
    ///
    /// Returns `UntrackedResource` if an argument is a host object no
    /// creation call tagged
    pub fn encode_args(&mut self, function: &str, args: &[HostValue]) -> CoreResult<Vec<String>> {
        let info = descriptor(function, args.len());
        let args = apply_slice(function, args);
        args.iter()
            .enumerate()
            .map(|(i, value)| {
                let role = info.and_then(|d| d.role(i));
                self.encode_value(function, value, role)
            })
            .collect()
    }

    /// Render one value in the given role
    ///
    /// # Errors
    ///
    /// Returns `UntrackedResource` for untagged host objects
    pub fn encode_value(
        &mut self,
        function: &str,
        value: &HostValue,
        role: Option<ArgRole>,
    ) -> CoreResult<String> {
        let text = match value {
            HostValue::Undefined => "undefined".to_string(),
            HostValue::Null => "null".to_string(),
            HostValue::Bool(b) => b.to_string(),
            HostValue::Number(n) => match role {
                Some(ArgRole::Enum) => self.enum_name(*n),
                Some(ArgRole::Bitfield(flags)) => render_bitfield(*n, flags),
                _ => js_number(*n),
            },
            HostValue::String(s) => json_string(s),
            HostValue::TypedArray(array) => self.encode_typed_array(array, role),
            HostValue::ArrayBuffer(bytes) => self.encode_buffer(bytes, role, false),
            HostValue::DataView(bytes) => self.encode_buffer(bytes, role, true),
            HostValue::Image(image) => self.encode_image(image),
            HostValue::Handle(handle) => match self.tracker.uniform_location(*handle) {
                Some(location) => format!(
                    "{}.getUniformLocation({}, {})",
                    GL_NAMESPACE,
                    location.program.replay_name(),
                    json_string(&location.name)
                ),
                None => self.tracker.require(function, *handle)?.replay_name(),
            },
            HostValue::List(items) => match role {
                Some(ArgRole::EnumArray) => {
                    let names: Vec<String> = items
                        .iter()
                        .map(|item| match item.as_f64() {
                            Some(n) => self.enum_name(n),
                            None => js_number(f64::NAN),
                        })
                        .collect();
                    format!("[{}]", names.join(", "))
                }
                _ => {
                    let rendered = items
                        .iter()
                        .map(|item| self.encode_value(function, item, None))
                        .collect::<CoreResult<Vec<_>>>()?;
                    render_list(&rendered)
                }
            },
            HostValue::Record(fields) => self.encode_record(function, fields)?,
        };
        Ok(text)
    }

    fn enum_name(&self, value: f64) -> String {
        self.enums
            .name_of(value)
            .map_or_else(|| js_number(value), str::to_string)
    }

    fn encode_record(&mut self, function: &str, fields: &IndexMap<String, HostValue>) -> CoreResult<String> {
        if fields.is_empty() {
            return Ok("{}".to_string());
        }
        let rendered = fields
            .iter()
            .map(|(k, v)| -> CoreResult<String> {
                Ok(format!("{}: {}", json_string(k), self.encode_value(function, v, None)?))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(format!("{{\n    {}}}", rendered.join(",\n    ")))
    }

    fn encode_typed_array(&mut self, array: &TypedArray, role: Option<ArgRole>) -> String {
        let placeholder = Placeholder::Typed {
            element: array.element,
            len: array.len(),
        };
        if role == Some(ArgRole::ReadOnly) {
            return self.placeholder(placeholder);
        }
        if self.session.over_budget(array.len() as u64) {
            self.session.mark_incomplete();
            return self.placeholder(placeholder);
        }
        let slot = self.intern_binary(array.element, array.data.clone());
        format!("typedArrays[{}]", slot)
    }

    fn encode_buffer(&mut self, bytes: &bytes::Bytes, role: Option<ArgRole>, view: bool) -> String {
        let placeholder = if view {
            Placeholder::DataView { bytes: bytes.len() }
        } else {
            Placeholder::Buffer { bytes: bytes.len() }
        };
        if role == Some(ArgRole::ReadOnly) {
            return self.placeholder(placeholder);
        }
        if self.session.over_budget(bytes.len() as u64) {
            self.session.mark_incomplete();
            return self.placeholder(placeholder);
        }
        let slot = self.intern_binary(ElementType::Uint8, bytes.clone());
        if view {
            format!("new DataView(typedArrays[{}].buffer)", slot)
        } else {
            format!("typedArrays[{}].buffer", slot)
        }
    }

    fn intern_binary(&mut self, element: ElementType, data: bytes::Bytes) -> usize {
        let encoded = base64_len(data.len()) as u64;
        let interned = self.tables.binary.intern(element, data);
        if interned.is_new {
            self.session.add_serialized(encoded);
        }
        interned.slot
    }

    fn encode_image(&mut self, image: &ImageSource) -> String {
        let placeholder = Placeholder::Image {
            width: image.width,
            height: image.height,
        };
        if self.session.over_budget(image.pixel_count()) {
            self.session.mark_incomplete();
            return self.placeholder(placeholder);
        }

        let key = match image.src.as_deref() {
            Some(src) if image.is_inline() => ImageKey::content(src),
            Some(src) if image.kind.has_url() => ImageKey::Url(src.to_string()),
            _ => {
                return match self.page.rasterize(image) {
                    Ok(data_url) => self.store_image(ImageKey::content(&data_url), image, data_url),
                    Err(err) => self.rasterize_failed(image, &err.to_string(), placeholder),
                };
            }
        };
        if let Some(slot) = self.tables.images.lookup(&key) {
            return format!("imagesBase64[{}]", slot);
        }
        let data_url = match image.src.as_deref() {
            Some(src) if image.is_inline() => src.to_string(),
            _ => match self.page.rasterize(image) {
                Ok(data_url) => data_url,
                Err(err) => return self.rasterize_failed(image, &err.to_string(), placeholder),
            },
        };
        self.store_image(key, image, data_url)
    }

    fn store_image(&mut self, key: ImageKey, image: &ImageSource, data_url: String) -> String {
        let encoded = data_url.len() as u64;
        let interned = self.tables.images.intern(
            key,
            ImagePayload {
                data_url,
                width: image.width,
                height: image.height,
            },
        );
        if interned.is_new {
            self.session.add_serialized(encoded);
        }
        format!("imagesBase64[{}]", interned.slot)
    }

    fn rasterize_failed(&mut self, image: &ImageSource, reason: &str, placeholder: Placeholder) -> String {
        warn!(kind = ?image.kind, width = image.width, height = image.height, reason, "image not rasterized");
        self.session.mark_incomplete();
        self.placeholder(placeholder)
    }

    fn placeholder(&mut self, placeholder: Placeholder) -> String {
        format!("zeroArrays[{}]", self.tables.placeholders.intern(placeholder).slot)
    }
}

/// Narrow the source view of a sliced overload and drop its offset/length
/// arguments. The live arguments are never touched.
#[must_use]
pub fn apply_slice<'v>(function: &str, args: &'v [HostValue]) -> Cow<'v, [HostValue]> {
    let Some(rule) = descriptor(function, args.len()).and_then(|d| d.slice()) else {
        return Cow::Borrowed(args);
    };
    let Some(source) = args.get(rule.source_index) else {
        return Cow::Borrowed(args);
    };
    let offset = args
        .get(rule.offset_index)
        .and_then(HostValue::as_index)
        .unwrap_or(0);
    let length = rule
        .length_index
        .and_then(|i| args.get(i))
        .and_then(HostValue::as_index)
        .unwrap_or(0);
    let end = |len: usize| if length == 0 { len } else { offset.saturating_add(length).min(len) };

    let narrowed = match source {
        HostValue::TypedArray(array) => HostValue::TypedArray(array.slice_elements(offset, end(array.len()))),
        HostValue::ArrayBuffer(bytes) => {
            let stop = end(bytes.len());
            HostValue::ArrayBuffer(bytes.slice(offset.min(stop)..stop))
        }
        HostValue::DataView(bytes) => {
            let stop = end(bytes.len());
            HostValue::DataView(bytes.slice(offset.min(stop)..stop))
        }
        _ => return Cow::Borrowed(args),
    };

    let mut out = args[..rule.offset_index.min(args.len())].to_vec();
    out[rule.source_index] = narrowed;
    Cow::Owned(out)
}

/// Decompose `value` into declared flags, or the raw number when no exact
/// combination reconstructs it
#[must_use]
pub fn render_bitfield(value: f64, flags: &[&str]) -> String {
    let Some(bits) = as_constant_key(value) else {
        return js_number(value);
    };
    let mut acc = 0i64;
    let mut names = Vec::new();
    for flag in flags {
        if let Some(flag_value) = constant(flag) {
            if bits & flag_value != 0 {
                acc |= flag_value;
                names.push(format!("{}.{}", GL_NAMESPACE, flag));
            }
        }
    }
    if acc == bits && !names.is_empty() {
        names.join(" | ")
    } else {
        js_number(value)
    }
}

/// Inline list literal, chunked for readability
#[must_use]
pub fn render_list(items: &[String]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let lines: Vec<String> = items.chunks(LIST_CHUNK).map(|c| c.join(",")).collect();
    format!("\n[\n{}\n]", lines.join(",\n"))
}

/// JSON string literal
#[must_use]
pub fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glcap_core::{CaptureError, CaptureLimits, HostHandle, ImageKind, Timestamp, TypeTag};
    use proptest::prelude::*;
    use std::cell::Cell;

    struct Page {
        rasterized: Cell<usize>,
    }

    impl Page {
        fn new() -> Self {
            Self {
                rasterized: Cell::new(0),
            }
        }
    }

    impl HostPage for Page {
        fn rasterize(&self, image: &ImageSource) -> Result<String, crate::host::HostError> {
            self.rasterized.set(self.rasterized.get() + 1);
            Ok(format!("data:image/png;base64,{}x{}", image.width, image.height))
        }

        fn now(&self) -> Timestamp {
            Timestamp::zero()
        }
    }

    struct Fixture {
        enums: EnumTable,
        tracker: ResourceTracker,
        tables: CaptureTables,
        session: CaptureSession,
        page: Page,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_limits(CaptureLimits::default())
        }

        fn with_limits(limits: CaptureLimits) -> Self {
            let mut session = CaptureSession::new(limits);
            session.begin();
            Self {
                enums: EnumTable::webgl(),
                tracker: ResourceTracker::new(),
                tables: CaptureTables::new(),
                session,
                page: Page::new(),
            }
        }

        fn encode(&mut self, function: &str, args: &[HostValue]) -> CoreResult<Vec<String>> {
            ArgEncoder::new(
                &self.enums,
                &self.tracker,
                &mut self.tables,
                &mut self.session,
                &self.page,
            )
            .encode_args(function, args)
        }
    }

    fn num(n: f64) -> HostValue {
        HostValue::Number(n)
    }

    fn gl(name: &str) -> HostValue {
        HostValue::Number(constant(name).unwrap() as f64)
    }

    #[test]
    fn test_enum_and_number_roles() {
        let mut fx = Fixture::new();
        let out = fx
            .encode("drawArrays", &[gl("TRIANGLES"), num(0.0), num(3.0)])
            .unwrap();
        assert_eq!(out, vec!["gl.TRIANGLES", "0", "3"]);
    }

    #[test]
    fn test_unknown_enum_falls_back_to_decimal() {
        let mut fx = Fixture::new();
        let out = fx.encode("enable", &[num(123_456.0)]).unwrap();
        assert_eq!(out, vec!["123456"]);
    }

    #[test]
    fn test_bitfield_decomposes() {
        let value = (constant("COLOR_BUFFER_BIT").unwrap() | constant("DEPTH_BUFFER_BIT").unwrap()) as f64;
        let mut fx = Fixture::new();
        let out = fx.encode("clear", &[num(value)]).unwrap();
        assert_eq!(out, vec!["gl.COLOR_BUFFER_BIT | gl.DEPTH_BUFFER_BIT"]);
    }

    #[test]
    fn test_bitfield_falls_back_on_partial_match() {
        let value = (constant("COLOR_BUFFER_BIT").unwrap() | 1) as f64;
        assert_eq!(render_bitfield(value, glcap_api::BUFFER_BITS), js_number(value));
        assert_eq!(render_bitfield(0.0, glcap_api::BUFFER_BITS), "0");
    }

    #[test]
    fn test_strings_are_json_quoted() {
        let mut fx = Fixture::new();
        let out = fx
            .encode("someCall", &[HostValue::string("a \"b\"\n")])
            .unwrap();
        assert_eq!(out, vec!["\"a \\\"b\\\"\\n\""]);
    }

    #[test]
    fn test_typed_array_dedup() {
        let mut fx = Fixture::new();
        let data = HostValue::TypedArray(TypedArray::from_f32(&[1.0, 2.0, 3.0, 4.0]));
        let first = fx
            .encode("bufferData", &[gl("ARRAY_BUFFER"), data.clone(), gl("STATIC_DRAW")])
            .unwrap();
        let after_first = fx.session.serialized_bytes();
        let second = fx
            .encode("bufferData", &[gl("ARRAY_BUFFER"), data, gl("STATIC_DRAW")])
            .unwrap();
        assert_eq!(first[1], "typedArrays[0]");
        assert_eq!(second[1], "typedArrays[0]");
        assert_eq!(fx.tables.binary.len(), 1);
        assert_eq!(after_first, base64_len(16) as u64);
        assert_eq!(fx.session.serialized_bytes(), after_first);
    }

    #[test]
    fn test_same_bytes_different_element_types_get_two_slots() {
        let mut fx = Fixture::new();
        let bytes = vec![0u8, 0, 128, 63];
        let f = HostValue::TypedArray(TypedArray::new(ElementType::Float32, bytes.clone()));
        let u = HostValue::TypedArray(TypedArray::new(ElementType::Uint8, bytes));
        let out = fx.encode("someCall", &[f, u]).unwrap();
        assert_eq!(out, vec!["typedArrays[0]", "typedArrays[1]"]);
    }

    #[test]
    fn test_untyped_buffers() {
        let mut fx = Fixture::new();
        let out = fx
            .encode(
                "someCall",
                &[
                    HostValue::ArrayBuffer(vec![1u8, 2, 3].into()),
                    HostValue::DataView(vec![1u8, 2, 3].into()),
                ],
            )
            .unwrap();
        assert_eq!(out[0], "typedArrays[0].buffer");
        assert_eq!(out[1], "new DataView(typedArrays[0].buffer)");
    }

    #[test]
    fn test_untyped_buffer_slot_holds_original_bytes() {
        let mut fx = Fixture::new();
        let bytes = vec![0u8, 1, 127, 255];
        fx.encode("someCall", &[HostValue::DataView(bytes.clone().into())])
            .unwrap();
        let slot = fx.tables.binary.get(0).unwrap();
        assert_eq!(slot.element, ElementType::Uint8);
        assert_eq!(slot.data.as_ref(), bytes.as_slice());
    }

    #[test]
    fn test_untyped_placeholders_keep_byte_length() {
        let limits = CaptureLimits::default().with_max_array_size(2);
        let mut fx = Fixture::with_limits(limits);
        let out = fx
            .encode(
                "someCall",
                &[
                    HostValue::ArrayBuffer(vec![1u8; 5].into()),
                    HostValue::DataView(vec![1u8; 3].into()),
                ],
            )
            .unwrap();
        assert_eq!(out, vec!["zeroArrays[0]", "zeroArrays[1]"]);
        let placeholders: Vec<String> = fx
            .tables
            .placeholders
            .iter()
            .map(|(_, p)| p.expression())
            .collect();
        assert_eq!(
            placeholders,
            vec!["new ArrayBuffer(5)", "new DataView(new ArrayBuffer(3))"]
        );
        assert!(!fx.session.all_serialized());
    }

    #[test]
    fn test_over_budget_uses_placeholder_and_latches() {
        let limits = CaptureLimits::default().with_max_array_size(2);
        let mut fx = Fixture::with_limits(limits);
        let data = HostValue::TypedArray(TypedArray::from_f32(&[1.0, 2.0, 3.0]));
        let out = fx.encode("someCall", &[data]).unwrap();
        assert_eq!(out, vec!["zeroArrays[0]"]);
        assert!(!fx.session.all_serialized());
        assert_eq!(fx.tables.placeholders.len(), 1);
        assert!(fx.tables.binary.is_empty());
    }

    #[test]
    fn test_global_cap_forces_placeholders() {
        let limits = CaptureLimits::default().with_max_serialize_size(10);
        let mut fx = Fixture::with_limits(limits);
        let big = HostValue::TypedArray(TypedArray::from_u8(&[7u8; 12]));
        let small = HostValue::TypedArray(TypedArray::from_u8(&[1u8]));
        let out = fx.encode("someCall", &[big, small]).unwrap();
        assert_eq!(out[0], "typedArrays[0]");
        assert_eq!(out[1], "zeroArrays[0]");
        assert!(!fx.session.all_serialized());
    }

    #[test]
    fn test_read_only_never_touches_budget() {
        let mut fx = Fixture::new();
        let pixels = HostValue::TypedArray(TypedArray::zeroed(ElementType::Uint8, 16));
        let out = fx
            .encode(
                "readPixels",
                &[
                    num(0.0),
                    num(0.0),
                    num(2.0),
                    num(2.0),
                    gl("RGBA"),
                    gl("UNSIGNED_BYTE"),
                    pixels,
                ],
            )
            .unwrap();
        assert_eq!(out[6], "zeroArrays[0]");
        assert_eq!(fx.session.serialized_bytes(), 0);
        assert!(fx.session.all_serialized());
    }

    #[test]
    fn test_handles_resolve_or_fail() {
        let mut fx = Fixture::new();
        fx.tracker.tag(TypeTag::new("buffer"), HostHandle::from_raw(1));
        let out = fx
            .encode(
                "bindBuffer",
                &[gl("ARRAY_BUFFER"), HostValue::Handle(HostHandle::from_raw(1))],
            )
            .unwrap();
        assert_eq!(out[1], "buffer[0]");

        let err = fx
            .encode(
                "bindBuffer",
                &[gl("ARRAY_BUFFER"), HostValue::Handle(HostHandle::from_raw(2))],
            )
            .unwrap_err();
        assert!(matches!(err, CaptureError::UntrackedResource { handle: 2, .. }));
    }

    #[test]
    fn test_enum_array() {
        let mut fx = Fixture::new();
        let out = fx
            .encode(
                "drawBuffers",
                &[HostValue::List(vec![gl("COLOR_ATTACHMENT0"), gl("COLOR_ATTACHMENT1")])],
            )
            .unwrap();
        assert_eq!(out, vec!["[gl.COLOR_ATTACHMENT0, gl.COLOR_ATTACHMENT1]"]);
    }

    #[test]
    fn test_list_chunks() {
        let items: Vec<String> = (0..40).map(|i| i.to_string()).collect();
        let text = render_list(&items);
        assert!(text.starts_with("\n[\n0,1,"));
        assert!(text.contains("31,\n32,"));
        assert!(text.ends_with("39\n]"));
    }

    #[test]
    fn test_record_literal() {
        let mut fx = Fixture::new();
        let mut fields = IndexMap::new();
        fields.insert("alpha".to_string(), HostValue::Bool(false));
        fields.insert("depth".to_string(), HostValue::Bool(true));
        let out = fx.encode("someCall", &[HostValue::Record(fields)]).unwrap();
        assert_eq!(out[0], "{\n    \"alpha\": false,\n    \"depth\": true}");
    }

    #[test]
    fn test_slice_typed_array_drops_trailing_args() {
        let data = HostValue::TypedArray(TypedArray::from_f32(&[0.0, 1.0, 2.0, 3.0, 4.0]));
        let args = vec![HostValue::Null, data, num(1.0), num(2.0)];
        let sliced = apply_slice("uniform1fv", &args);
        assert_eq!(sliced.len(), 2);
        match &sliced[1] {
            HostValue::TypedArray(a) => assert_eq!(a.to_f32_vec(), vec![1.0, 2.0]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_slice_zero_length_means_to_end() {
        let data = HostValue::TypedArray(TypedArray::from_f32(&[0.0, 1.0, 2.0]));
        let args = vec![HostValue::Null, data, num(1.0), num(0.0)];
        let sliced = apply_slice("uniform1fv", &args);
        match &sliced[1] {
            HostValue::TypedArray(a) => assert_eq!(a.to_f32_vec(), vec![1.0, 2.0]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_slice_skips_non_view_source() {
        let args = vec![gl("ARRAY_BUFFER"), num(64.0), gl("STATIC_DRAW"), num(0.0)];
        assert!(matches!(apply_slice("bufferData", &args), Cow::Borrowed(_)));
    }

    #[test]
    fn test_image_dedup_by_url() {
        let mut fx = Fixture::new();
        let a = ImageSource::new(ImageKind::ImageElement, 4, 4, HostHandle::from_raw(1)).with_src("https://x/a.png");
        let b = ImageSource::new(ImageKind::ImageElement, 4, 4, HostHandle::from_raw(2)).with_src("https://x/a.png");
        let out = fx
            .encode("someCall", &[HostValue::Image(a), HostValue::Image(b)])
            .unwrap();
        assert_eq!(out, vec!["imagesBase64[0]", "imagesBase64[0]"]);
        assert_eq!(fx.page.rasterized.get(), 1);
    }

    #[test]
    fn test_inline_image_not_rasterized() {
        let mut fx = Fixture::new();
        let img = ImageSource::new(ImageKind::ImageElement, 1, 1, HostHandle::from_raw(1))
            .with_src("data:image/png;base64,AAAA");
        let out = fx.encode("someCall", &[HostValue::Image(img)]).unwrap();
        assert_eq!(out, vec!["imagesBase64[0]"]);
        assert_eq!(fx.page.rasterized.get(), 0);
        let stored = fx.tables.images.get(0).unwrap();
        assert_eq!(stored.data_url, "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_oversized_image_placeholder() {
        let limits = CaptureLimits::default().with_max_array_size(1024);
        let mut fx = Fixture::with_limits(limits);
        let img = ImageSource::new(ImageKind::Canvas, 64, 64, HostHandle::from_raw(1));
        let out = fx.encode("someCall", &[HostValue::Image(img)]).unwrap();
        assert_eq!(out, vec!["zeroArrays[0]"]);
        let placeholders: Vec<String> = fx
            .tables
            .placeholders
            .iter()
            .map(|(_, p)| p.expression())
            .collect();
        assert_eq!(placeholders, vec!["generateZeroImageData(64, 64)"]);
        assert!(!fx.session.all_serialized());
    }

    proptest! {
        #[test]
        fn prop_integers_render_plainly(n in -1_000_000i64..1_000_000) {
            let mut fx = Fixture::new();
            let out = fx.encode("someCall", &[num(n as f64)]).unwrap();
            prop_assert_eq!(&out[0], &n.to_string());
        }

        #[test]
        fn prop_bitfield_reconstructs(mask in 0u8..8) {
            let mut value = 0i64;
            for (i, flag) in glcap_api::BUFFER_BITS.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    value |= constant(flag).unwrap();
                }
            }
            let text = render_bitfield(value as f64, glcap_api::BUFFER_BITS);
            let decoded: i64 = if value == 0 {
                text.parse().unwrap()
            } else {
                text.split(" | ")
                    .map(|name| constant(name.trim_start_matches("gl.")).unwrap())
                    .fold(0, |acc, v| acc | v)
            };
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn prop_same_content_same_slot(data in proptest::collection::vec(any::<u8>(), 1..64)) {
            let mut fx = Fixture::new();
            let a = HostValue::TypedArray(TypedArray::from_u8(&data));
            let out = fx.encode("someCall", &[a.clone(), a]).unwrap();
            prop_assert_eq!(&out[0], &out[1]);
            prop_assert_eq!(fx.tables.binary.len(), 1);
        }
    }
}
