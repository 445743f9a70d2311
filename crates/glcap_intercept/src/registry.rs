//! Registry of captured contexts and the per-refresh frame clock.
//!
//! This is the surface the driver talks to. Contexts are fully isolated; the
//! registry only broadcasts session controls to each of them.

use crate::host::{GlContext, HostPage};
use crate::recorder::{CaptureContext, CapturingContext};
use glcap_core::{CaptureOptions, CoreResult, Timestamp};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

/// Counters the driver stores alongside each checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureCounters {
    /// Number of captured contexts
    pub contexts_num: usize,
    /// Context kinds requested on offscreen canvases, first-seen order
    pub used_offscreen_canvas: Vec<String>,
}

/// All captured contexts of one page
pub struct CaptureRegistry {
    options: CaptureOptions,
    page: Rc<dyn HostPage>,
    contexts: Vec<Rc<RefCell<CaptureContext>>>,
    offscreen_kinds: Vec<String>,
    remaining_frames: Option<u32>,
}

impl CaptureRegistry {
    /// Create an empty registry
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the options are rejected
    pub fn new(options: CaptureOptions, page: Rc<dyn HostPage>) -> CoreResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            page,
            contexts: Vec::new(),
            offscreen_kinds: Vec::new(),
            remaining_frames: None,
        })
    }

    /// Register a context returned by `getContext`.
    ///
    /// Only `webgl`, `experimental-webgl` and `webgl2` contexts are captured;
    /// anything else is handed back unwrapped as `None`. A context already
    /// registered yields its existing proxy.
    pub fn register(&mut self, host: Box<dyn GlContext>) -> Option<CapturingContext> {
        let kind = host.context_kind();
        if host.is_offscreen() && !self.offscreen_kinds.iter().any(|k| k == kind.as_str()) {
            self.offscreen_kinds.push(kind.as_str().to_string());
        }
        if !kind.is_capturable() {
            return None;
        }

        let handle = host.handle();
        if let Some(existing) = self
            .contexts
            .iter()
            .find(|ctx| ctx.borrow().host_handle() == handle)
        {
            return Some(CapturingContext::new(Rc::clone(existing)));
        }

        let mut context = CaptureContext::new(host, Rc::clone(&self.page), self.options);
        if self.options.auto_capture {
            context.session_mut().begin();
        }
        info!(context = %context.id(), %kind, "context registered");
        let shared = Rc::new(RefCell::new(context));
        self.contexts.push(Rc::clone(&shared));
        Some(CapturingContext::new(shared))
    }

    /// Begin capturing on every context
    pub fn start_all(&self) {
        self.each(|ctx| ctx.session_mut().begin());
    }

    /// End capturing on every context
    pub fn stop_all(&self) {
        self.each(|ctx| ctx.session_mut().end());
    }

    /// Capture on every context for `duration` from now
    pub fn period_all(&self, duration: Duration) {
        let now = self.page.now();
        self.each(|ctx| ctx.session_mut().period(duration, now));
    }

    /// Frame boundary on every context
    pub fn add_yield_all(&self) {
        self.each(|ctx| {
            ctx.session_mut().add_yield();
        });
    }

    /// Debug annotation on every capturing context
    pub fn debug_info_all(&self, text: &str) {
        self.each(|ctx| {
            ctx.session_mut().add_debug_info(text);
        });
    }

    /// Number of captured contexts
    #[must_use]
    pub fn contexts_num(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no context is capturing; true when there are none
    #[must_use]
    pub fn all_stopped(&self) -> bool {
        self.contexts.iter().all(|ctx| ctx.borrow().session().is_stopped())
    }

    /// Counters for the driver record
    #[must_use]
    pub fn counters(&self) -> CaptureCounters {
        CaptureCounters {
            contexts_num: self.contexts_num(),
            used_offscreen_canvas: self.offscreen_kinds.clone(),
        }
    }

    /// Stop every context after `frames` more refreshes
    pub fn set_remaining_frames(&mut self, frames: u32) {
        self.remaining_frames = (frames > 0).then_some(frames);
    }

    /// Refreshes left before the capture window closes
    #[must_use]
    pub const fn remaining_frames(&self) -> Option<u32> {
        self.remaining_frames
    }

    /// One display refresh: frame boundary everywhere, due period ends fire,
    /// and the frame window counts down
    pub fn on_animation_frame(&mut self, now: Timestamp) {
        self.add_yield_all();
        self.each(|ctx| {
            ctx.session_mut().poll(now);
        });
        if let Some(frames) = self.remaining_frames {
            let left = frames.saturating_sub(1);
            if left == 0 {
                debug!("frame window closed, stopping all contexts");
                self.stop_all();
                self.remaining_frames = None;
            } else {
                self.remaining_frames = Some(left);
            }
        }
    }

    /// Captured contexts in registration order
    pub fn contexts(&self) -> impl Iterator<Item = CapturingContext> + '_ {
        self.contexts
            .iter()
            .map(|ctx| CapturingContext::new(Rc::clone(ctx)))
    }

    fn each(&self, mut f: impl FnMut(&mut CaptureContext)) {
        for ctx in &self.contexts {
            f(&mut ctx.borrow_mut());
        }
    }
}

impl std::fmt::Debug for CaptureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureRegistry")
            .field("contexts", &self.contexts.len())
            .field("remaining_frames", &self.remaining_frames)
            .finish_non_exhaustive()
    }
}
