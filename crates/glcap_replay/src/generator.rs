//! Replay artifact generator.
//!
//! One synchronous pass over a finished capture: header comments, image tags,
//! declarations, context re-creation, resource collections, the frame-paced
//! step table and the driver loop, in that order.

use crate::program::ReplayProgram;
use crate::transport::{encode_data_url, GenerateError, StreamCompressor};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use glcap_core::{js_number, ContextId, Hash, HostValue};
use glcap_intercept::{json_string, CaptureContext, CaptureRegistry};
use glcap_storage::escape_template;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Id of the canvas the replay draws into
pub const CANVAS_ID: &str = "__main-canvas__";

const PRELUDE: &str = r#"window.captureDone = false;
function base64ToTypedArray(b64, dt) {
  const bs = window.atob(b64);
  const u8a = new Uint8Array(bs.length);
  for (let i = 0; i < bs.length; i++) {
    u8a[i] = bs.charCodeAt(i);
  }
  return new dt(u8a.buffer);
}
function generateZeroImageData(width, height) {
  const canvas = document.createElement('canvas');
  canvas.width = width;
  canvas.height = height;
  const ctx = canvas.getContext('2d');
  const imageData = ctx.createImageData(width, height);
  canvas.remove();
  return imageData;
}"#;

const SET_UNIFORM_HELPER: &str = r#"function setUniform(gl, type, program, name, ...args) {
  const loc = gl.getUniformLocation(program, name);
  gl[type].apply(gl, [loc, ...args]);
}"#;

const DRIVER: &str = r#"let stepIndex = 0;
function render() {
  if (stepIndex < steps.length) {
    steps[stepIndex++]();
  }
  if (stepIndex >= steps.length) {
    window.captureDone = true;
  } else {
    requestAnimationFrame(render);
  }
}"#;

/// Summary of one generated artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    /// Context the artifact was generated from
    pub context: ContextId,
    /// Entries in the capture log, frame boundaries included
    pub entries: usize,
    /// Frame segments in the step table
    pub frames: usize,
    /// Whether every payload was serialized in full
    pub all_serialized: bool,
    /// Digest of the capture log
    pub digest: Hash,
}

/// A generated, self-contained replay document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    text: String,
    info: ArtifactInfo,
}

impl Artifact {
    /// Uncompressed document text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Summary
    #[must_use]
    pub const fn info(&self) -> &ArtifactInfo {
        &self.info
    }

    /// Compress and wrap as `data:json/gzip;base64,...`
    ///
    /// # Errors
    ///
    /// Returns `Compress` if the compressor fails
    pub fn encode(&self, compressor: &dyn StreamCompressor) -> Result<String, GenerateError> {
        encode_data_url(&self.text, compressor)
    }
}

/// Line buffer the document is written into
#[derive(Debug, Default)]
struct Out {
    text: String,
}

impl Out {
    fn line(&mut self, s: impl AsRef<str>) {
        self.text.push_str(s.as_ref());
        self.text.push('\n');
    }
}

/// Generate the replay document for one context
#[must_use]
pub fn generate(ctx: &CaptureContext) -> Artifact {
    let session = ctx.session();
    let tables = ctx.tables();
    let limits = session.limits();
    let program = ReplayProgram::from_entries(session.entries(), ctx.tracker());
    let mut out = Out::default();

    out.line(format!("<!-- length of the captured commands: {}-->", session.len()));
    out.line(format!("<!-- all serialized: {}-->", session.all_serialized()));

    let (width, height) = ctx.canvas_size();
    out.line(format!(
        "<canvas id=\"{}\" width=\"{}\" height=\"{}\"></canvas>",
        CANVAS_ID, width, height
    ));
    for (slot, image) in tables.images.iter() {
        out.line(format!(
            "<img id=\"{}\" src=\"{}\" hidden>",
            image_element_id(slot),
            image.data_url.replace('"', "&quot;")
        ));
    }

    out.line("<script>");
    out.line(format!("window.HydAllSerialized = {};", session.all_serialized()));
    out.line(format!("window.HydMaxSerializeSize = {};", limits.max_serialize_size));
    out.line(format!("window.HydMaxArraySize = {};", limits.max_array_size));
    out.line(PRELUDE);

    if !tables.placeholders.is_empty() {
        out.line("const zeroArrays = {");
        for (slot, placeholder) in tables.placeholders.iter() {
            out.line(format!("{}: {},", slot, placeholder.expression()));
        }
        out.line("};");
    }

    if !tables.binary.is_empty() {
        out.line("const typedArrays = {");
        for (slot, binary) in tables.binary.iter() {
            out.line(format!(
                "{}: base64ToTypedArray(\"{}\", {}),",
                slot,
                BASE64_STANDARD.encode(&binary.data),
                binary.element.ctor_name()
            ));
        }
        out.line("};");
    }

    if !tables.shaders.is_empty() {
        out.line("const shaderSources = [");
        let sources: Vec<String> = tables
            .shaders
            .iter()
            .map(|(_, source)| format!("`{}`", escape_template(source)))
            .collect();
        out.line(sources.join(",\n"));
        out.line("];");
    }

    if ctx.options().helper {
        out.line(SET_UNIFORM_HELPER);
    }

    if !tables.images.is_empty() {
        out.line("const imagesBase64 = {};");
        out.line("function loadImages() {");
        for (slot, _) in tables.images.iter() {
            out.line(format!(
                "  imagesBase64[{}] = document.getElementById(\"{}\");",
                slot,
                image_element_id(slot)
            ));
        }
        out.line("}");
    }

    out.line(format!("const canvas = document.getElementById(\"{}\");", CANVAS_ID));
    out.line(format!(
        "const gl = canvas.getContext({}, {});",
        json_string(ctx.kind().as_str()),
        render_attributes(&ctx.context_attributes())
    ));

    for extension in ctx.extension_names() {
        out.line(format!(
            "const {} = gl.getExtension({});",
            extension,
            json_string(extension)
        ));
    }

    for tag in ctx.tracker().tags() {
        out.line(format!("const {} = [];", tag));
    }

    out.line("const steps = [");
    for segment in program.segments() {
        out.line("function () {");
        for statement in segment {
            out.line(statement);
        }
        out.line("},");
    }
    out.line("];");
    out.line(DRIVER);

    if !tables.images.is_empty() {
        out.line("loadImages();");
    }
    out.line("requestAnimationFrame(render);");
    out.line("</script>");

    let info = ArtifactInfo {
        context: ctx.id(),
        entries: session.len(),
        frames: program.len(),
        all_serialized: session.all_serialized(),
        digest: session.digest(),
    };
    debug!(
        context = %info.context,
        entries = info.entries,
        frames = info.frames,
        bytes = out.text.len(),
        "artifact generated"
    );
    Artifact {
        text: out.text,
        info,
    }
}

/// Generate one artifact per captured context, in registration order
#[must_use]
pub fn generate_all(registry: &CaptureRegistry) -> Vec<Artifact> {
    registry
        .contexts()
        .map(|ctx| generate(&ctx.state()))
        .collect()
}

fn image_element_id(slot: usize) -> String {
    format!("__hyd_img_b64_{}__", slot)
}

fn render_attributes(attributes: &IndexMap<String, HostValue>) -> String {
    if attributes.is_empty() {
        return "{}".to_string();
    }
    let fields: Vec<String> = attributes
        .iter()
        .map(|(k, v)| format!("    {}: {}", json_string(k), render_scalar(v)))
        .collect();
    format!("{{\n{}}}", fields.join(",\n"))
}

fn render_scalar(value: &HostValue) -> String {
    match value {
        HostValue::Null => "null".to_string(),
        HostValue::Bool(b) => b.to_string(),
        HostValue::Number(n) => js_number(*n),
        HostValue::String(s) => json_string(s),
        _ => "undefined".to_string(),
    }
}
