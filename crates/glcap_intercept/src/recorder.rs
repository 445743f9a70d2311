//! Recording proxy over a host context.
//!
//! [`CapturingContext`] decorates a [`GlContext`]: every call is forwarded to
//! the host unchanged and, while the session is capturing, also rendered into
//! a [`CaptureEntry`]. The program-facing proxy and the driver-facing registry
//! share the same [`CaptureContext`] through `Rc<RefCell<..>>`.

use crate::encoder::{json_string, ArgEncoder};
use crate::host::{ContextKind, GlContext, HostError, HostObject, HostPage, Member, MemberKind};
use crate::tracker::ResourceTracker;
use glcap_api::{as_constant_key, classify, CallClass, EnumTable, GL_NAMESPACE};
use glcap_core::{
    CaptureError, CaptureOptions, ContextId, CoreResult, HostHandle, HostValue, ResourceId,
    TypeTag,
};
use glcap_log::{CaptureEntry, CaptureSession};
use glcap_storage::CaptureTables;
use indexmap::IndexMap;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Everything recorded for one captured context
pub struct CaptureContext {
    id: ContextId,
    host: Box<dyn GlContext>,
    page: Rc<dyn HostPage>,
    options: CaptureOptions,
    kind: ContextKind,
    enums: EnumTable,
    session: CaptureSession,
    tracker: ResourceTracker,
    tables: CaptureTables,
    extensions: IndexMap<String, Box<dyn HostObject>>,
    current_program: Option<ResourceId>,
}

impl CaptureContext {
    /// Wrap a host context. Its numeric members join the `gl` enum namespace.
    pub fn new(host: Box<dyn GlContext>, page: Rc<dyn HostPage>, options: CaptureOptions) -> Self {
        let mut enums = EnumTable::webgl();
        register_constants(&mut enums, GL_NAMESPACE, &host.members());
        let kind = host.context_kind();
        Self {
            id: ContextId::new(),
            host,
            page,
            session: CaptureSession::new(options.limits),
            options,
            kind,
            enums,
            tracker: ResourceTracker::new(),
            tables: CaptureTables::new(),
            extensions: IndexMap::new(),
            current_program: None,
        }
    }

    /// Context id
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// Kind the context was created with
    #[must_use]
    pub const fn kind(&self) -> &ContextKind {
        &self.kind
    }

    /// Options in force
    #[must_use]
    pub const fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Host identity of the wrapped context
    #[must_use]
    pub fn host_handle(&self) -> HostHandle {
        self.host.handle()
    }

    /// Canvas `(width, height)`
    #[must_use]
    pub fn canvas_size(&self) -> (u32, u32) {
        self.host.canvas_size()
    }

    /// Creation attributes
    #[must_use]
    pub fn context_attributes(&self) -> IndexMap<String, HostValue> {
        self.host.context_attributes()
    }

    /// Capture session
    #[must_use]
    pub const fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Capture session, for driver controls
    pub fn session_mut(&mut self) -> &mut CaptureSession {
        &mut self.session
    }

    /// Resource tracker
    #[must_use]
    pub const fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    /// Out-of-line tables
    #[must_use]
    pub const fn tables(&self) -> &CaptureTables {
        &self.tables
    }

    /// Enum-name table
    #[must_use]
    pub const fn enums(&self) -> &EnumTable {
        &self.enums
    }

    /// Lower-cased names of the extensions the program obtained, in order
    pub fn extension_names(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }

    /// Program most recently passed to `useProgram`
    #[must_use]
    pub const fn current_program(&self) -> Option<&ResourceId> {
        self.current_program.as_ref()
    }

    fn call(&mut self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        match classify(name) {
            CallClass::Record => self.record(None, name, args, false),
            CallClass::Read | CallClass::Skip => self.record(None, name, args, true),
            CallClass::Create => self.create(None, name, args, TypeTag::from_create_fn(name)),
            CallClass::FenceSync => self.create(None, name, args, TypeTag::new("sync")),
            CallClass::ShaderSource => self.shader_source(name, args),
            CallClass::UseProgram => self.use_program(name, args),
            CallClass::GetUniformLocation => self.get_uniform_location(name, args),
            CallClass::GetAttribLocation => self.get_attrib_location(name, args),
            CallClass::BindAttribLocation => self.bind_attrib_location(name, args),
            CallClass::LinkProgram => self.link_program(name, args),
            CallClass::Uniform => self.uniform(name, args),
            CallClass::GetExtension => {
                let requested = args.first().and_then(HostValue::as_str).unwrap_or_default();
                Ok(self
                    .get_extension(requested)?
                    .map_or(HostValue::Null, HostValue::String))
            }
        }
    }

    fn call_extension(&mut self, extension: &str, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        let target = Some(extension);
        match classify(name) {
            CallClass::Create => self.create(target, name, args, TypeTag::from_create_fn(name)),
            CallClass::Read | CallClass::Skip => self.record(target, name, args, true),
            _ => self.record(target, name, args, false),
        }
    }

    fn get_extension(&mut self, name: &str) -> CoreResult<Option<String>> {
        let key = name.to_ascii_lowercase();
        if self.extensions.contains_key(&key) {
            return Ok(Some(key));
        }
        let extension = match self.host.get_extension(name) {
            Ok(extension) => extension,
            Err(err) => return Err(self.host_failed("getExtension", err)),
        };
        let Some(extension) = extension else {
            return Ok(None);
        };
        register_constants(&mut self.enums, &key, &extension.members());
        debug!(context = %self.id, extension = %key, "extension wrapped");
        self.extensions.insert(key.clone(), extension);
        Ok(Some(key))
    }

    fn forward(&mut self, target: Option<&str>, name: &str, args: &[HostValue]) -> Result<HostValue, HostError> {
        match target {
            None => self.host.call(name, args),
            Some(extension) => match self.extensions.get_mut(extension) {
                Some(object) => object.call(name, args),
                None => Err(HostError::UnknownMember {
                    name: extension.to_string(),
                }),
            },
        }
    }

    fn encode_if_capturing(&mut self, name: &str, args: &[HostValue]) -> Option<CoreResult<Vec<String>>> {
        if !self.session.is_capturing() {
            return None;
        }
        let mut encoder = ArgEncoder::new(
            &self.enums,
            &self.tracker,
            &mut self.tables,
            &mut self.session,
            self.page.as_ref(),
        );
        Some(encoder.encode_args(name, args))
    }

    fn append(&mut self, entry: CaptureEntry) {
        if self.session.append(entry) {
            trace!(context = %self.id, entries = self.session.len(), "call recorded");
        }
    }

    fn host_failed(&self, function: &str, err: HostError) -> CaptureError {
        warn!(context = %self.id, function, error = %err, "host call failed");
        err.into()
    }

    /// Arguments of a forwarded call, once encoded. A host failure outranks
    /// an encoding failure so the caller sees what the host threw.
    fn settle(
        &self,
        function: &str,
        encoded: Option<CoreResult<Vec<String>>>,
        result: &Result<HostValue, HostError>,
    ) -> CoreResult<Option<Vec<String>>> {
        match (encoded, result) {
            (Some(Err(_)), Err(err)) => Err(self.host_failed(function, err.clone())),
            (Some(Err(err)), Ok(_)) => Err(err),
            (Some(Ok(rendered)), _) => Ok(Some(rendered)),
            (None, _) => Ok(None),
        }
    }

    /// Default wrapper: record, then forward
    fn record(&mut self, target: Option<&str>, name: &str, args: &[HostValue], comment: bool) -> CoreResult<HostValue> {
        let encoded = self.encode_if_capturing(name, args);
        let result = self.forward(target, name, args);
        if let Some(rendered) = self.settle(name, encoded, &result)? {
            let call = format!("{}.{}({})", target.unwrap_or(GL_NAMESPACE), name, rendered.join(", "));
            let entry = if comment {
                CaptureEntry::comment_call(&call)
            } else {
                CaptureEntry::Call(format!("{};", call))
            };
            self.append(entry);
        }
        result.map_err(|err| self.host_failed(name, err))
    }

    fn create(&mut self, target: Option<&str>, name: &str, args: &[HostValue], tag: TypeTag) -> CoreResult<HostValue> {
        let encoded = self.encode_if_capturing(name, args);
        let result = self.forward(target, name, args);
        let created = match &result {
            Ok(HostValue::Handle(handle)) => Some(self.tracker.tag(tag, *handle)),
            _ => None,
        };
        if let Some(rendered) = self.settle(name, encoded, &result)? {
            let call = format!("{}.{}({});", target.unwrap_or(GL_NAMESPACE), name, rendered.join(", "));
            let text = match created {
                Some(id) => format!("{} = {}", id.replay_name(), call),
                None => call,
            };
            self.append(CaptureEntry::Call(text));
        }
        result.map_err(|err| self.host_failed(name, err))
    }

    fn shader_source(&mut self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        let encoded = self.encode_if_capturing(name, args);
        let result = self.forward(None, name, args);
        if let Some(mut rendered) = self.settle(name, encoded, &result)? {
            if let (Some(source), Some(slot)) = (args.get(1).and_then(HostValue::as_str), rendered.get_mut(1)) {
                *slot = format!("shaderSources[{}]", self.tables.shaders.intern(source).slot);
            }
            self.append(CaptureEntry::Call(format!("{}.{}({});", GL_NAMESPACE, name, rendered.join(", "))));
        }
        result.map_err(|err| self.host_failed(name, err))
    }

    fn use_program(&mut self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        let result = self.record(None, name, args, false)?;
        self.current_program = args
            .first()
            .and_then(HostValue::as_handle)
            .and_then(|h| self.tracker.resolve(h).cloned());
        Ok(result)
    }

    fn get_uniform_location(&mut self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        let program = args.first().and_then(HostValue::as_handle);
        let uniform = args.get(1).and_then(HostValue::as_str);
        if let (Some(program), Some(uniform)) = (program, uniform) {
            if let Some(location) = self.tracker.cached_uniform_location(program, uniform) {
                return Ok(HostValue::Handle(location));
            }
        }
        let result = self
            .forward(None, name, args)
            .map_err(|err| self.host_failed(name, err))?;
        if let (Some(program), Some(uniform), HostValue::Handle(location)) = (program, uniform, &result) {
            self.tracker.remember_uniform_location(program, uniform, *location);
        }
        Ok(result)
    }

    fn get_attrib_location(&mut self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        let program = args.first().and_then(HostValue::as_handle);
        let attrib = args.get(1).and_then(HostValue::as_str);
        if let (Some(program), Some(attrib)) = (program, attrib) {
            if let Some(location) = self.tracker.cached_attrib_location(program, attrib) {
                return Ok(HostValue::from(location));
            }
        }
        let result = self
            .forward(None, name, args)
            .map_err(|err| self.host_failed(name, err))?;
        if let (Some(program), Some(attrib), Some(location)) = (program, attrib, result.as_f64()) {
            self.tracker.remember_attrib_location(program, attrib, location as i64);
        }
        Ok(result)
    }

    /// Explicit bindings run for real and are replayed with the learned ones at link time
    fn bind_attrib_location(&mut self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        let result = self
            .forward(None, name, args)
            .map_err(|err| self.host_failed(name, err))?;
        let program = args.first().and_then(HostValue::as_handle);
        let index = args.get(1).and_then(HostValue::as_f64);
        let attrib = args.get(2).and_then(HostValue::as_str);
        if let (Some(program), Some(index), Some(attrib)) = (program, index, attrib) {
            self.tracker.remember_attrib_location(program, attrib, index as i64);
        }
        Ok(result)
    }

    fn link_program(&mut self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        let encoded = self.encode_if_capturing(name, args);
        let result = self.forward(None, name, args);
        if let Some(handle) = args.first().and_then(HostValue::as_handle) {
            self.tracker.forget_locations(handle);
        }
        if let Some(rendered) = self.settle(name, encoded, &result)? {
            let program = args
                .first()
                .and_then(HostValue::as_handle)
                .and_then(|h| self.tracker.resolve(h).cloned());
            if let Some(program) = program {
                self.append(CaptureEntry::AttribBindings { program });
            }
            self.append(CaptureEntry::Call(format!("{}.{}({});", GL_NAMESPACE, name, rendered.join(", "))));
        }
        result.map_err(|err| self.host_failed(name, err))
    }

    fn uniform(&mut self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        let encoded = self.encode_if_capturing(name, args);
        let result = self.forward(None, name, args);
        if let Some(mut rendered) = self.settle(name, encoded, &result)? {
            let location = args
                .first()
                .and_then(HostValue::as_handle)
                .and_then(|h| self.tracker.uniform_location(h).cloned());
            let text = match location {
                Some(location) => {
                    let program = self.current_program.clone().unwrap_or(location.program);
                    if self.options.helper {
                        let values: String = rendered.iter().skip(1).map(|v| format!(", {}", v)).collect();
                        format!(
                            "setUniform({}, {}, {}, {}{});",
                            GL_NAMESPACE,
                            json_string(name),
                            program.replay_name(),
                            json_string(&location.name),
                            values
                        )
                    } else {
                        rendered[0] = format!(
                            "{}.getUniformLocation({}, {})",
                            GL_NAMESPACE,
                            program.replay_name(),
                            json_string(&location.name)
                        );
                        format!("{}.{}({});", GL_NAMESPACE, name, rendered.join(", "))
                    }
                }
                None => format!("{}.{}({});", GL_NAMESPACE, name, rendered.join(", ")),
            };
            self.append(CaptureEntry::Call(text));
        }
        result.map_err(|err| self.host_failed(name, err))
    }
}

impl fmt::Debug for CaptureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureContext")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.session.state())
            .field("entries", &self.session.len())
            .field("resources", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

fn register_constants(enums: &mut EnumTable, namespace: &str, members: &[Member]) {
    for member in members {
        if let MemberKind::Number(value) = member.kind {
            if let Some(value) = as_constant_key(value) {
                enums.register(namespace, &member.name, value);
            }
        }
    }
}

/// Program-facing proxy for a captured context
#[derive(Clone)]
pub struct CapturingContext {
    inner: Rc<RefCell<CaptureContext>>,
}

impl CapturingContext {
    /// Wrap shared capture state
    #[must_use]
    pub fn new(inner: Rc<RefCell<CaptureContext>>) -> Self {
        Self { inner }
    }

    /// Call a context function
    ///
    /// # Errors
    ///
    /// Returns `Host` if the real call failed, after recording it, and
    /// `UntrackedResource` if an argument was never tagged, after forwarding it
    pub fn call(&self, name: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        self.inner.borrow_mut().call(name, args)
    }

    /// Read a context property
    ///
    /// # Errors
    ///
    /// Returns error if the host rejects the read
    pub fn get(&self, name: &str) -> CoreResult<HostValue> {
        let inner = self.inner.borrow();
        inner.host.get(name).map_err(|err| inner.host_failed(name, err))
    }

    /// Write a context property
    ///
    /// # Errors
    ///
    /// Returns error if the host rejects the write
    pub fn set(&self, name: &str, value: HostValue) -> CoreResult<()> {
        let mut inner = self.inner.borrow_mut();
        match inner.host.set(name, value) {
            Ok(()) => Ok(()),
            Err(err) => Err(inner.host_failed(name, err)),
        }
    }

    /// Obtain a wrapped extension; `None` if the host does not support it
    ///
    /// # Errors
    ///
    /// Returns error if the host throws
    pub fn get_extension(&self, name: &str) -> CoreResult<Option<CapturingExtension>> {
        let key = self.inner.borrow_mut().get_extension(name)?;
        Ok(key.map(|name| CapturingExtension {
            inner: Rc::clone(&self.inner),
            name,
        }))
    }

    /// Context id
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.inner.borrow().id()
    }

    /// Borrow the capture state
    #[must_use]
    pub fn state(&self) -> Ref<'_, CaptureContext> {
        self.inner.borrow()
    }

    /// Borrow the capture state mutably
    #[must_use]
    pub fn state_mut(&self) -> RefMut<'_, CaptureContext> {
        self.inner.borrow_mut()
    }

    /// Shared capture state
    #[must_use]
    pub fn shared(&self) -> Rc<RefCell<CaptureContext>> {
        Rc::clone(&self.inner)
    }
}

impl fmt::Debug for CapturingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapturingContext").field(&*self.inner.borrow()).finish()
    }
}

fn into_host_error(err: CaptureError) -> HostError {
    match err {
        CaptureError::Host { function, message } => HostError::Threw { function, message },
        other => HostError::Capture(other),
    }
}

impl HostObject for CapturingContext {
    fn members(&self) -> Vec<Member> {
        self.inner.borrow().host.members()
    }

    fn get(&self, name: &str) -> Result<HostValue, HostError> {
        CapturingContext::get(self, name).map_err(into_host_error)
    }

    fn set(&mut self, name: &str, value: HostValue) -> Result<(), HostError> {
        CapturingContext::set(self, name, value).map_err(into_host_error)
    }

    fn call(&mut self, name: &str, args: &[HostValue]) -> Result<HostValue, HostError> {
        CapturingContext::call(self, name, args).map_err(into_host_error)
    }
}

/// Program-facing proxy for an extension of a captured context.
///
/// Calls record as `<extension>.<function>(...)`.
#[derive(Clone)]
pub struct CapturingExtension {
    inner: Rc<RefCell<CaptureContext>>,
    name: String,
}

impl CapturingExtension {
    /// Lower-cased extension name, also its replay namespace
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call an extension function
    ///
    /// # Errors
    ///
    /// Same as [`CapturingContext::call`]
    pub fn call(&self, function: &str, args: &[HostValue]) -> CoreResult<HostValue> {
        self.inner.borrow_mut().call_extension(&self.name, function, args)
    }

    /// Read an extension property
    ///
    /// # Errors
    ///
    /// Returns error if the host rejects the read
    pub fn get(&self, property: &str) -> CoreResult<HostValue> {
        let inner = self.inner.borrow();
        match inner.extensions.get(&self.name) {
            Some(object) => object.get(property).map_err(|err| inner.host_failed(property, err)),
            None => Err(CaptureError::Host {
                function: property.to_string(),
                message: format!("extension {} not loaded", self.name),
            }),
        }
    }
}

impl fmt::Debug for CapturingExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturingExtension").field("name", &self.name).finish()
    }
}
