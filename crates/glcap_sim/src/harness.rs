//! Simulation harness: one page, its contexts, and a frame loop.

use crate::gl::{SimGl, SimGlConfig};
use crate::page::SimPage;
use crate::scene::{Scene, ScenePlayer};
use crate::seed::SimSeed;
use glcap_core::{CaptureError, CaptureOptions, ContextId};
use glcap_intercept::{CaptureCounters, CaptureRegistry, CapturingContext, ContextKind, HostPage};
use glcap_replay::{generate_all, Artifact};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

/// Error from a simulation run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// Capture or host failure while playing a scene
    #[error("scene {scene} failed: {source}")]
    Scene {
        /// Scene being played
        scene: Scene,
        /// Underlying error
        source: CaptureError,
    },

    /// Rejected configuration
    #[error(transparent)]
    Config(#[from] CaptureError),
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for scene randomness
    pub seed: SimSeed,
    /// Scene every context plays
    pub scene: Scene,
    /// Number of graphics contexts on the page
    pub contexts: usize,
    /// Also open a `2d` canvas, which is never captured
    pub with_2d_canvas: bool,
    /// Refresh interval of the simulated display
    pub frame_interval: Duration,
    /// Capture options for every context
    pub options: CaptureOptions,
}

impl SimConfig {
    /// Config for `scene` with defaults elsewhere
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        Self {
            seed: SimSeed::default(),
            scene,
            contexts: 1,
            with_2d_canvas: false,
            frame_interval: Duration::from_millis(16),
            options: CaptureOptions::default(),
        }
    }

    /// Set the seed
    #[must_use]
    pub fn with_seed(mut self, seed: SimSeed) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of graphics contexts
    #[must_use]
    pub fn with_contexts(mut self, contexts: usize) -> Self {
        self.contexts = contexts;
        self
    }

    /// Set the capture options
    #[must_use]
    pub fn with_options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    /// Also open an uncaptured `2d` canvas
    #[must_use]
    pub fn with_2d_canvas(mut self) -> Self {
        self.with_2d_canvas = true;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(Scene::Triangle)
    }
}

/// Outcome of [`SimHarness::run`]
#[derive(Debug, Clone)]
pub struct SimResult {
    /// Refreshes executed
    pub ticks: u64,
    /// Registry counters
    pub counters: CaptureCounters,
    /// Whether every context stopped on its own
    pub all_stopped: bool,
    /// One artifact per context
    pub artifacts: Vec<Artifact>,
}

/// Drives a simulated page through load, capture and generation
pub struct SimHarness {
    config: SimConfig,
    page: Rc<SimPage>,
    registry: CaptureRegistry,
    handles: Rc<Cell<u64>>,
    players: Vec<(CapturingContext, ScenePlayer)>,
    loaded: usize,
    opened_2d: bool,
    frame: u32,
    ticks: u64,
}

impl SimHarness {
    /// Create a harness over a fresh page
    ///
    /// # Errors
    ///
    /// Returns `Config` if the capture options are rejected
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_page(config, SimPage::new())
    }

    /// Create a harness over a given page
    ///
    /// # Errors
    ///
    /// Returns `Config` if the capture options are rejected
    pub fn with_page(config: SimConfig, page: SimPage) -> Result<Self, SimError> {
        let page = Rc::new(page);
        let registry = CaptureRegistry::new(config.options, Rc::clone(&page) as Rc<dyn HostPage>)?;
        Ok(Self {
            config,
            page,
            registry,
            handles: Rc::new(Cell::new(0)),
            players: Vec::new(),
            loaded: 0,
            opened_2d: false,
            frame: 0,
            ticks: 0,
        })
    }

    /// Open a context of `gl` on the page, as `canvas.getContext()` would.
    /// `None` for kinds that are not captured.
    pub fn open_context(&mut self, gl: SimGlConfig) -> Option<CapturingContext> {
        let host = SimGl::new(gl, Rc::clone(&self.handles));
        self.registry.register(Box::new(host))
    }

    /// Page load: open every context and run scene setup on each
    ///
    /// # Errors
    ///
    /// Returns `Scene` if setup fails
    pub fn load(&mut self) -> Result<(), SimError> {
        while self.load_next()? {}
        Ok(())
    }

    /// Open the next context and run its scene setup. Returns `false` once
    /// every context is loaded.
    ///
    /// # Errors
    ///
    /// Returns `Scene` if setup fails
    pub fn load_next(&mut self) -> Result<bool, SimError> {
        if self.config.with_2d_canvas && !self.opened_2d {
            self.opened_2d = true;
            self.open_context(SimGlConfig::new(ContextKind::parse("2d")));
        }
        let index = self.loaded;
        if index >= self.config.contexts {
            return Ok(false);
        }
        self.loaded += 1;
        if let Some(ctx) = self.open_context(SimGlConfig::default()) {
            let seed = self.config.seed.derive(&format!("context-{}", index));
            let mut player = ScenePlayer::new(self.config.scene, &seed);
            player.setup(&ctx).map_err(|source| self.scene_failed(source))?;
            self.players.push((ctx, player));
        }
        if self.loaded == self.config.contexts {
            info!(
                scene = %self.config.scene,
                contexts = self.registry.contexts_num(),
                "page loaded"
            );
        }
        Ok(true)
    }

    /// Begin capturing everywhere and stop after `frames` refreshes
    pub fn start_capture(&mut self, frames: u32) {
        self.registry.start_all();
        self.registry.set_remaining_frames(frames);
    }

    /// One display refresh: every scene draws, then the frame clock ticks
    ///
    /// # Errors
    ///
    /// Returns `Scene` if drawing fails
    pub fn step(&mut self) -> Result<(), SimError> {
        let frame = self.frame;
        let scene = self.config.scene;
        for (ctx, player) in &mut self.players {
            player
                .frame(ctx, frame)
                .map_err(|source| SimError::Scene { scene, source })?;
        }
        self.page.advance(self.config.frame_interval);
        self.registry.on_animation_frame(self.page.now());
        self.frame += 1;
        self.ticks += 1;
        debug!(frame, "frame rendered");
        Ok(())
    }

    /// Step until every context has stopped or `max_frames` elapse.
    /// Returns whether every context stopped.
    ///
    /// # Errors
    ///
    /// Returns `Scene` if drawing fails
    pub fn run_until_stopped(&mut self, max_frames: u32) -> Result<bool, SimError> {
        for _ in 0..max_frames {
            if self.registry.all_stopped() {
                break;
            }
            self.step()?;
        }
        Ok(self.registry.all_stopped())
    }

    /// Artifacts for every context
    #[must_use]
    pub fn generate(&self) -> Vec<Artifact> {
        generate_all(&self.registry)
    }

    /// Load, capture `frames` refreshes, generate
    ///
    /// # Errors
    ///
    /// Returns error if loading or drawing fails
    pub fn run(&mut self, frames: u32) -> Result<SimResult, SimError> {
        self.load()?;
        self.start_capture(frames);
        let all_stopped = self.run_until_stopped(frames.saturating_add(1))?;
        Ok(SimResult {
            ticks: self.ticks,
            counters: self.registry.counters(),
            all_stopped,
            artifacts: self.generate(),
        })
    }

    /// Registry of captured contexts
    #[must_use]
    pub const fn registry(&self) -> &CaptureRegistry {
        &self.registry
    }

    /// Registry, mutably
    pub fn registry_mut(&mut self) -> &mut CaptureRegistry {
        &mut self.registry
    }

    /// The simulated page
    #[must_use]
    pub fn page(&self) -> &SimPage {
        &self.page
    }

    /// Ids of the contexts playing the scene
    #[must_use]
    pub fn context_ids(&self) -> Vec<ContextId> {
        self.players.iter().map(|(ctx, _)| ctx.id()).collect()
    }

    /// Refreshes executed so far
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    fn scene_failed(&self, source: CaptureError) -> SimError {
        SimError::Scene {
            scene: self.config.scene,
            source,
        }
    }
}

impl std::fmt::Debug for SimHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimHarness")
            .field("scene", &self.config.scene)
            .field("contexts", &self.players.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SimConfig::new(Scene::Animated)
            .with_contexts(2)
            .with_seed(SimSeed::from_literal(7))
            .with_2d_canvas();
        assert_eq!(config.contexts, 2);
        assert_eq!(config.seed.seed, 7);
        assert!(config.with_2d_canvas);
        assert_eq!(SimConfig::default().scene, Scene::Triangle);
    }

    #[test]
    fn test_run_captures_every_frame() {
        let mut harness = SimHarness::new(SimConfig::default()).unwrap();
        let result = harness.run(5).unwrap();
        assert!(result.all_stopped);
        assert_eq!(result.ticks, 5);
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(result.counters.contexts_num, 1);
    }

    #[test]
    fn test_2d_canvas_not_captured() {
        let config = SimConfig::default().with_2d_canvas().with_contexts(2);
        let mut harness = SimHarness::new(config).unwrap();
        harness.load().unwrap();
        assert_eq!(harness.registry().contexts_num(), 2);
        assert_eq!(harness.context_ids().len(), 2);
    }

    #[test]
    fn test_page_clock_follows_frames() {
        let mut harness = SimHarness::new(SimConfig::default()).unwrap();
        harness.load().unwrap();
        harness.step().unwrap();
        harness.step().unwrap();
        assert_eq!(harness.page().now().as_micros(), 32_000);
        assert_eq!(harness.ticks(), 2);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = CaptureOptions::default().with_limits(
            glcap_core::CaptureLimits::default().with_max_array_size(0),
        );
        let err = SimHarness::new(SimConfig::default().with_options(options)).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn test_load_next_one_context_at_a_time() {
        let mut harness = SimHarness::new(SimConfig::default().with_contexts(2)).unwrap();
        assert!(harness.load_next().unwrap());
        assert_eq!(harness.context_ids().len(), 1);
        assert!(harness.load_next().unwrap());
        assert!(!harness.load_next().unwrap());
        assert_eq!(harness.context_ids().len(), 2);
        assert_eq!(harness.registry().contexts_num(), 2);
    }
}
