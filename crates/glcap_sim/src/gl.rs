//! Simulated graphics context.
//!
//! Enough of a WebGL context to exercise every capture path: handles are
//! minted from a shared counter, programs track attribute locations the way a
//! real linker assigns them, and a few invalid calls throw.

use glcap_api::WEBGL_CONSTANTS;
use glcap_core::{HostHandle, HostValue};
use glcap_intercept::{ContextKind, GlContext, HostError, HostObject, Member};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Functions the simulated context exposes
pub const FUNCTIONS: &[&str] = &[
    "activeTexture",
    "attachShader",
    "bindAttribLocation",
    "bindBuffer",
    "bindFramebuffer",
    "bindTexture",
    "bindVertexArray",
    "blendFunc",
    "bufferData",
    "bufferSubData",
    "clear",
    "clearColor",
    "clientWaitSync",
    "compileShader",
    "createBuffer",
    "createFramebuffer",
    "createProgram",
    "createShader",
    "createTexture",
    "createVertexArray",
    "deleteBuffer",
    "disable",
    "drawArrays",
    "drawElements",
    "enable",
    "enableVertexAttribArray",
    "fenceSync",
    "getAttribLocation",
    "getError",
    "getExtension",
    "getParameter",
    "getProgramParameter",
    "getShaderParameter",
    "getUniformLocation",
    "linkProgram",
    "pixelStorei",
    "readPixels",
    "shaderSource",
    "texImage2D",
    "texParameteri",
    "texSubImage2D",
    "uniform1f",
    "uniform1i",
    "uniform2f",
    "uniform4f",
    "uniform4fv",
    "uniformMatrix4fv",
    "useProgram",
    "vertexAttribPointer",
    "viewport",
];

/// One call that reached the simulated host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCall {
    /// `gl` or the lower-cased extension name
    pub target: String,
    /// Function name
    pub function: String,
    /// Argument count
    pub argc: usize,
}

/// Every call the host saw, shared between a context and its extensions
pub type CallJournal = Rc<RefCell<Vec<HostCall>>>;

#[derive(Debug, Default)]
struct SimProgram {
    shaders: Vec<HostHandle>,
    bound: HashMap<String, u32>,
    locations: IndexMap<String, u32>,
    linked: bool,
}

/// Settings for one simulated context
#[derive(Debug, Clone, PartialEq)]
pub struct SimGlConfig {
    /// Requested context kind
    pub kind: ContextKind,
    /// Canvas size in pixels
    pub width: u32,
    /// Canvas size in pixels
    pub height: u32,
    /// Whether the canvas is an `OffscreenCanvas`
    pub offscreen: bool,
    /// Supported extensions
    pub extensions: Vec<String>,
    /// Attributes reported by `getContextAttributes()`
    pub attributes: IndexMap<String, HostValue>,
}

impl SimGlConfig {
    /// A context of `kind` on a 300x150 canvas
    #[must_use]
    pub fn new(kind: ContextKind) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert("alpha".to_string(), HostValue::Bool(true));
        attributes.insert("antialias".to_string(), HostValue::Bool(true));
        attributes.insert("depth".to_string(), HostValue::Bool(true));
        attributes.insert("preserveDrawingBuffer".to_string(), HostValue::Bool(false));
        attributes.insert("powerPreference".to_string(), HostValue::string("default"));
        Self {
            kind,
            width: 300,
            height: 150,
            offscreen: false,
            extensions: vec![
                "OES_vertex_array_object".to_string(),
                "ANGLE_instanced_arrays".to_string(),
            ],
            attributes,
        }
    }

    /// Set the canvas size
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Mark the canvas as offscreen
    #[must_use]
    pub fn offscreen(mut self) -> Self {
        self.offscreen = true;
        self
    }
}

impl Default for SimGlConfig {
    fn default() -> Self {
        Self::new(ContextKind::Webgl)
    }
}

/// Simulated WebGL context
#[derive(Debug)]
pub struct SimGl {
    handle: HostHandle,
    config: SimGlConfig,
    handles: Rc<Cell<u64>>,
    journal: CallJournal,
    programs: HashMap<HostHandle, SimProgram>,
    shaders: HashMap<HostHandle, String>,
    properties: IndexMap<String, HostValue>,
}

impl SimGl {
    /// Create a context; handles are minted from `handles`
    #[must_use]
    pub fn new(config: SimGlConfig, handles: Rc<Cell<u64>>) -> Self {
        let handle = mint(&handles);
        let mut properties = IndexMap::new();
        properties.insert("drawingBufferWidth".to_string(), HostValue::from(config.width));
        properties.insert("drawingBufferHeight".to_string(), HostValue::from(config.height));
        Self {
            handle,
            config,
            handles,
            journal: CallJournal::default(),
            programs: HashMap::new(),
            shaders: HashMap::new(),
            properties,
        }
    }

    /// Calls the host saw, including those of its extensions
    #[must_use]
    pub fn journal(&self) -> CallJournal {
        Rc::clone(&self.journal)
    }

    fn program_mut(&mut self, function: &str, args: &[HostValue]) -> Result<&mut SimProgram, HostError> {
        args.first()
            .and_then(HostValue::as_handle)
            .and_then(|h| self.programs.get_mut(&h))
            .ok_or_else(|| HostError::threw(function, "INVALID_VALUE: not a program"))
    }

    fn link(&mut self, args: &[HostValue]) -> Result<HostValue, HostError> {
        let attributes: Vec<String> = {
            let program = self.program_mut("linkProgram", args)?;
            program.shaders.clone()
        }
        .iter()
        .filter_map(|shader| self.shaders.get(shader))
        .flat_map(|source| declared_attributes(source))
        .collect();

        let program = self.program_mut("linkProgram", args)?;
        let mut locations = IndexMap::new();
        for name in &attributes {
            if let Some(index) = program.bound.get(name) {
                locations.insert(name.clone(), *index);
            }
        }
        let mut next = 0;
        for name in attributes {
            if locations.contains_key(&name) {
                continue;
            }
            while locations.values().any(|used| *used == next) {
                next += 1;
            }
            locations.insert(name, next);
        }
        program.locations = locations;
        program.linked = true;
        Ok(HostValue::Undefined)
    }
}

/// Attribute names declared in a vertex shader
fn declared_attributes(source: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("attribute ") || line.starts_with("in "))
        .filter_map(|line| line.trim_end_matches(';').split_whitespace().last())
        .map(str::to_string)
        .collect()
}

fn mint(handles: &Cell<u64>) -> HostHandle {
    let next = handles.get() + 1;
    handles.set(next);
    HostHandle::from_raw(next)
}

fn journal_call(journal: &CallJournal, target: &str, function: &str, argc: usize) {
    journal.borrow_mut().push(HostCall {
        target: target.to_string(),
        function: function.to_string(),
        argc,
    });
}

impl HostObject for SimGl {
    fn members(&self) -> Vec<Member> {
        WEBGL_CONSTANTS
            .iter()
            .map(|(name, value)| Member::number(*name, *value as f64))
            .chain(FUNCTIONS.iter().map(|name| Member::function(*name)))
            .chain(self.properties.keys().map(Member::property))
            .collect()
    }

    fn get(&self, name: &str) -> Result<HostValue, HostError> {
        if let Some(value) = self.properties.get(name) {
            return Ok(value.clone());
        }
        WEBGL_CONSTANTS
            .iter()
            .find(|(constant, _)| *constant == name)
            .map(|(_, value)| HostValue::Number(*value as f64))
            .ok_or_else(|| HostError::UnknownMember {
                name: name.to_string(),
            })
    }

    fn set(&mut self, name: &str, value: HostValue) -> Result<(), HostError> {
        self.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn call(&mut self, name: &str, args: &[HostValue]) -> Result<HostValue, HostError> {
        journal_call(&self.journal, "gl", name, args.len());
        match name {
            "createProgram" => {
                let handle = mint(&self.handles);
                self.programs.insert(handle, SimProgram::default());
                Ok(HostValue::Handle(handle))
            }
            "createShader" => {
                let handle = mint(&self.handles);
                self.shaders.insert(handle, String::new());
                Ok(HostValue::Handle(handle))
            }
            n if n.starts_with("create") || n == "fenceSync" => Ok(HostValue::Handle(mint(&self.handles))),
            "shaderSource" => {
                let shader = args.first().and_then(HostValue::as_handle);
                let source = args.get(1).and_then(HostValue::as_str).unwrap_or_default();
                match shader.and_then(|h| self.shaders.get_mut(&h)) {
                    Some(slot) => {
                        *slot = source.to_string();
                        Ok(HostValue::Undefined)
                    }
                    None => Err(HostError::threw(name, "INVALID_VALUE: not a shader")),
                }
            }
            "attachShader" => {
                let shader = args
                    .get(1)
                    .and_then(HostValue::as_handle)
                    .ok_or_else(|| HostError::threw(name, "INVALID_VALUE: not a shader"))?;
                self.program_mut(name, args)?.shaders.push(shader);
                Ok(HostValue::Undefined)
            }
            "bindAttribLocation" => {
                let index = args.get(1).and_then(HostValue::as_f64).unwrap_or(-1.0);
                let attrib = args.get(2).and_then(HostValue::as_str).unwrap_or_default().to_string();
                if index < 0.0 {
                    return Err(HostError::threw(name, "INVALID_VALUE: negative index"));
                }
                self.program_mut(name, args)?.bound.insert(attrib, index as u32);
                Ok(HostValue::Undefined)
            }
            "linkProgram" => self.link(args),
            "useProgram" => {
                if args.first().is_some_and(HostValue::is_nullish) {
                    return Ok(HostValue::Undefined);
                }
                self.program_mut(name, args)?;
                Ok(HostValue::Undefined)
            }
            "getAttribLocation" => {
                let attrib = args.get(1).and_then(HostValue::as_str).unwrap_or_default().to_string();
                let program = self.program_mut(name, args)?;
                let location = if program.linked {
                    program.locations.get(&attrib).map_or(-1.0, |l| f64::from(*l))
                } else {
                    -1.0
                };
                Ok(HostValue::Number(location))
            }
            "getUniformLocation" => {
                self.program_mut(name, args)?;
                Ok(HostValue::Handle(mint(&self.handles)))
            }
            "getProgramParameter" | "getShaderParameter" => Ok(HostValue::Bool(true)),
            "getError" => Ok(HostValue::Number(0.0)),
            "getParameter" => Ok(HostValue::Number(0.0)),
            "clientWaitSync" => Ok(HostValue::Number(f64::from(0x911Au32))),
            "drawArrays" | "drawElements" if args.len() < 3 => {
                Err(HostError::threw(name, "not enough arguments"))
            }
            n if FUNCTIONS.contains(&n) => Ok(HostValue::Undefined),
            _ => Err(HostError::UnknownMember {
                name: name.to_string(),
            }),
        }
    }
}

impl GlContext for SimGl {
    fn handle(&self) -> HostHandle {
        self.handle
    }

    fn context_kind(&self) -> ContextKind {
        self.config.kind.clone()
    }

    fn canvas_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn context_attributes(&self) -> IndexMap<String, HostValue> {
        self.config.attributes.clone()
    }

    fn is_offscreen(&self) -> bool {
        self.config.offscreen
    }

    fn get_extension(&mut self, name: &str) -> Result<Option<Box<dyn HostObject>>, HostError> {
        journal_call(&self.journal, "gl", "getExtension", 1);
        let supported = self
            .config
            .extensions
            .iter()
            .find(|ext| ext.eq_ignore_ascii_case(name));
        Ok(supported.and_then(|ext| {
            SimExtension::new(ext, Rc::clone(&self.handles), Rc::clone(&self.journal))
                .map(|ext| Box::new(ext) as Box<dyn HostObject>)
        }))
    }
}

/// Simulated extension object
#[derive(Debug)]
pub struct SimExtension {
    name: String,
    constants: &'static [(&'static str, i64)],
    functions: &'static [&'static str],
    handles: Rc<Cell<u64>>,
    journal: CallJournal,
}

impl SimExtension {
    /// Extension `name`, or `None` if the simulator does not know it
    #[must_use]
    pub fn new(name: &str, handles: Rc<Cell<u64>>, journal: CallJournal) -> Option<Self> {
        let (constants, functions): (&'static [(&'static str, i64)], &'static [&'static str]) =
            match name.to_ascii_lowercase().as_str() {
                "oes_vertex_array_object" => (
                    &[("VERTEX_ARRAY_BINDING_OES", 0x85B5)],
                    &["createVertexArrayOES", "bindVertexArrayOES", "deleteVertexArrayOES"],
                ),
                "angle_instanced_arrays" => (
                    &[("VERTEX_ATTRIB_ARRAY_DIVISOR_ANGLE", 0x88FE)],
                    &["drawArraysInstancedANGLE", "vertexAttribDivisorANGLE"],
                ),
                _ => return None,
            };
        Some(Self {
            name: name.to_ascii_lowercase(),
            constants,
            functions,
            handles,
            journal,
        })
    }
}

impl HostObject for SimExtension {
    fn members(&self) -> Vec<Member> {
        self.constants
            .iter()
            .map(|(name, value)| Member::number(*name, *value as f64))
            .chain(self.functions.iter().map(|name| Member::function(*name)))
            .collect()
    }

    fn get(&self, name: &str) -> Result<HostValue, HostError> {
        self.constants
            .iter()
            .find(|(constant, _)| *constant == name)
            .map(|(_, value)| HostValue::Number(*value as f64))
            .ok_or_else(|| HostError::UnknownMember {
                name: name.to_string(),
            })
    }

    fn set(&mut self, name: &str, _value: HostValue) -> Result<(), HostError> {
        Err(HostError::UnknownMember {
            name: name.to_string(),
        })
    }

    fn call(&mut self, name: &str, args: &[HostValue]) -> Result<HostValue, HostError> {
        journal_call(&self.journal, &self.name, name, args.len());
        if !self.functions.contains(&name) {
            return Err(HostError::UnknownMember {
                name: name.to_string(),
            });
        }
        if name.starts_with("create") {
            return Ok(HostValue::Handle(mint(&self.handles)));
        }
        Ok(HostValue::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "attribute vec3 position;\nattribute vec3 normal;\nvoid main() {}";

    fn gl() -> SimGl {
        SimGl::new(SimGlConfig::default(), Rc::new(Cell::new(0)))
    }

    fn linked_program(gl: &mut SimGl, bind: Option<(u32, &str)>) -> HostValue {
        let program = gl.call("createProgram", &[]).unwrap();
        let shader = gl.call("createShader", &[HostValue::Number(35633.0)]).unwrap();
        gl.call("shaderSource", &[shader.clone(), HostValue::string(VERTEX)]).unwrap();
        gl.call("attachShader", &[program.clone(), shader]).unwrap();
        if let Some((index, name)) = bind {
            gl.call(
                "bindAttribLocation",
                &[program.clone(), HostValue::from(index), HostValue::string(name)],
            )
            .unwrap();
        }
        gl.call("linkProgram", &[program.clone()]).unwrap();
        program
    }

    fn location(gl: &mut SimGl, program: &HostValue, name: &str) -> f64 {
        gl.call("getAttribLocation", &[program.clone(), HostValue::string(name)])
            .unwrap()
            .as_f64()
            .unwrap()
    }

    #[test]
    fn test_declared_attributes() {
        assert_eq!(declared_attributes(VERTEX), vec!["position", "normal"]);
        assert_eq!(declared_attributes("in vec2 uv;"), vec!["uv"]);
    }

    #[test]
    fn test_link_assigns_in_declaration_order() {
        let mut gl = gl();
        let program = linked_program(&mut gl, None);
        assert_eq!(location(&mut gl, &program, "position"), 0.0);
        assert_eq!(location(&mut gl, &program, "normal"), 1.0);
        assert_eq!(location(&mut gl, &program, "missing"), -1.0);
    }

    #[test]
    fn test_link_honours_bindings() {
        let mut gl = gl();
        let program = linked_program(&mut gl, Some((0, "normal")));
        assert_eq!(location(&mut gl, &program, "normal"), 0.0);
        assert_eq!(location(&mut gl, &program, "position"), 1.0);
    }

    #[test]
    fn test_invalid_program_throws() {
        let mut gl = gl();
        let err = gl
            .call("useProgram", &[HostValue::Handle(HostHandle::from_raw(999))])
            .unwrap_err();
        assert!(matches!(err, HostError::Threw { .. }));
        assert!(gl.call("useProgram", &[HostValue::Null]).is_ok());
    }

    #[test]
    fn test_handles_are_unique() {
        let mut gl = gl();
        let a = gl.call("createBuffer", &[]).unwrap();
        let b = gl.call("createBuffer", &[]).unwrap();
        assert_ne!(a, b);
        assert_ne!(a.as_handle(), Some(gl.handle()));
    }

    #[test]
    fn test_extensions() {
        let mut gl = gl();
        let mut ext = gl.get_extension("oes_vertex_array_object").unwrap().unwrap();
        assert!(ext.call("createVertexArrayOES", &[]).unwrap().as_handle().is_some());
        assert!(gl.get_extension("WEBGL_draw_buffers").unwrap().is_none());
        let journal = gl.journal();
        let journal = journal.borrow();
        let last = journal.last().unwrap();
        assert_eq!(last.function, "getExtension");
        assert!(journal.iter().any(|c| c.target == "oes_vertex_array_object"));
    }

    #[test]
    fn test_members_include_constants() {
        let members = gl().members();
        assert!(members.iter().any(|m| m.name == "ARRAY_BUFFER"));
        assert!(members.iter().any(|m| m.name == "drawArrays"));
        assert!(members.iter().any(|m| m.name == "drawingBufferWidth"));
    }
}
