//! Capture driver: staged page run with per-stage timeouts.
//!
//! Every stage degrades on timeout to a checkpoint and execution continues;
//! only a failing scene or an I/O error aborts the run.

use glcap_core::{CaptureError, CaptureOptions};
use glcap_intercept::CaptureCounters;
use glcap_replay::GzipCompressor;
use glcap_sim::{Scene, SimConfig, SimError, SimHarness, SimSeed};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::error::Elapsed;
use tracing::{info, warn};

/// Error from a driver run
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Reading or writing files
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Output record (de)serialization
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Simulation failed
    #[error(transparent)]
    Sim(#[from] SimError),

    /// Capture options or artifact encoding
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Timeout for each stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimeouts {
    /// Page load until content is settled
    pub navigate: Duration,
    /// Until the network is idle
    pub settle: Duration,
    /// Capture start until every context stopped
    pub capture: Duration,
    /// Artifact generation
    pub generate: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            navigate: Duration::from_secs(30),
            settle: Duration::from_secs(60),
            capture: Duration::from_secs(10),
            generate: Duration::from_secs(100),
        }
    }
}

/// Which stages timed out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedOut {
    /// Navigate stage
    pub navigate: bool,
    /// Settle stage
    pub settle: bool,
    /// Capture stage
    pub capture: bool,
    /// Generate stage
    pub generate: bool,
}

/// Checkpoint timestamps, milliseconds since the driver started
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventTimes {
    /// Run start
    pub start_time_hp: f64,
    /// Network idle reached (or settle timed out)
    pub net_idle_time_hp: f64,
    /// Every context stopped (or capture timed out)
    pub gl_cap_time_hp: f64,
}

/// Per-page capture payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Counters at network idle
    pub net_idle_counters: CaptureCounters,
    /// Counters after capture
    pub gl_cap_counters: CaptureCounters,
    /// One encoded artifact per context
    pub gl_captures: Vec<String>,
}

/// What the driver writes to `<out>/<name>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Page captured
    pub url: String,
    /// Wall-clock start, Unix milliseconds
    pub date: i64,
    /// 1 if the settle stage timed out, else 0
    pub net_idle_timeout: i32,
    /// Stage timeout flags
    pub timed_out: TimedOut,
    /// Checkpoints
    pub events_time_hp: EventTimes,
    /// Capture payload
    pub frame: FrameRecord,
}

/// Driver settings
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Output record name
    pub name: String,
    /// Output directory
    pub out_dir: PathBuf,
    /// Scene to load
    pub scene: Scene,
    /// Seed for the scene
    pub seed: SimSeed,
    /// Graphics contexts on the page
    pub contexts: usize,
    /// Frames played before the network counts as idle
    pub settle_frames: u32,
    /// Frames in the capture window
    pub capture_frames: u32,
    /// Display refresh interval
    pub frame_interval: Duration,
    /// Capture options
    pub options: CaptureOptions,
    /// Stage timeouts
    pub timeouts: StageTimeouts,
}

impl DriverConfig {
    /// Defaults for `scene`: one context, 60 captured frames
    #[must_use]
    pub fn new(scene: Scene, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: scene.to_string(),
            out_dir: out_dir.into(),
            scene,
            seed: SimSeed::default(),
            contexts: 1,
            settle_frames: 10,
            capture_frames: 60,
            frame_interval: Duration::from_millis(16),
            options: CaptureOptions::default(),
            timeouts: StageTimeouts::default(),
        }
    }

    /// Path of the output record
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.json", self.name))
    }

    fn url(&self) -> String {
        format!("sim://{}", self.scene)
    }
}

/// Runs one page through navigate, settle, capture and generate
#[derive(Debug)]
pub struct Driver {
    config: DriverConfig,
    origin: Instant,
}

impl Driver {
    /// Create a driver
    #[must_use]
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            origin: Instant::now(),
        }
    }

    /// Run and save the record. `None` if the output already exists.
    ///
    /// # Errors
    ///
    /// Returns error if the scene fails or the record cannot be written
    pub async fn run_and_save(&self) -> Result<Option<PathBuf>, DriverError> {
        let path = self.config.output_path();
        if path.exists() {
            info!(path = %path.display(), "skip, output exists");
            return Ok(None);
        }
        let record = self.run().await?;
        write_record(&path, &record)?;
        info!(path = %path.display(), captures = record.frame.gl_captures.len(), "saved");
        Ok(Some(path))
    }

    /// Run every stage
    ///
    /// # Errors
    ///
    /// Returns error if the scene fails on the host or in capture
    pub async fn run(&self) -> Result<CaptureRecord, DriverError> {
        let cfg = &self.config;
        let sim = SimConfig::new(cfg.scene)
            .with_seed(cfg.seed.clone())
            .with_contexts(cfg.contexts)
            .with_options(cfg.options);
        let mut harness = SimHarness::new(SimConfig {
            frame_interval: cfg.frame_interval,
            ..sim
        })?;
        let date = chrono::Utc::now().timestamp_millis();
        let start_time_hp = self.elapsed_ms();
        let mut timed_out = TimedOut::default();

        let interval = cfg.frame_interval;
        info!(url = %cfg.url(), "goto");
        let outcome = tokio::time::timeout(cfg.timeouts.navigate, async {
            while harness.load_next()? {
                wait(interval).await;
            }
            Ok::<(), SimError>(())
        })
        .await;
        timed_out.navigate = checkpoint("domcontentloaded", outcome, &harness)?;

        let outcome = tokio::time::timeout(cfg.timeouts.settle, play(&mut harness, cfg.settle_frames, interval)).await;
        timed_out.settle = checkpoint("networkidle", outcome, &harness)?;
        let net_idle_time_hp = self.elapsed_ms();
        let net_idle_counters = harness.registry().counters();
        info!(contexts = net_idle_counters.contexts_num, "net idle");

        harness.registry().debug_info_all("capture - START");
        harness.start_capture(cfg.capture_frames);
        let outcome = tokio::time::timeout(cfg.timeouts.capture, async {
            while !harness.registry().all_stopped() {
                play(&mut harness, 1, interval).await?;
            }
            Ok::<(), SimError>(())
        })
        .await;
        timed_out.capture = checkpoint("capture", outcome, &harness)?;
        if timed_out.capture {
            harness.registry().stop_all();
        }
        harness.registry().debug_info_all("capture - STOP");
        let gl_cap_time_hp = self.elapsed_ms();
        let gl_cap_counters = harness.registry().counters();
        info!(ticks = harness.ticks(), "capture");

        let generated = tokio::time::timeout(cfg.timeouts.generate, async {
            tokio::task::yield_now().await;
            encode_all(&harness)
        })
        .await;
        let gl_captures = match generated {
            Ok(captures) => captures?,
            Err(_) => {
                warn!(stage = "generate", "stage timed out");
                timed_out.generate = true;
                Vec::new()
            }
        };

        Ok(CaptureRecord {
            url: cfg.url(),
            date,
            net_idle_timeout: i32::from(timed_out.settle),
            timed_out,
            events_time_hp: EventTimes {
                start_time_hp,
                net_idle_time_hp,
                gl_cap_time_hp,
            },
            frame: FrameRecord {
                net_idle_counters,
                gl_cap_counters,
                gl_captures,
            },
        })
    }

    fn elapsed_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1_000.0
    }
}

/// Annotate every context with a stage outcome. Returns whether the stage
/// timed out.
fn checkpoint(
    label: &str,
    outcome: Result<Result<(), SimError>, Elapsed>,
    harness: &SimHarness,
) -> Result<bool, DriverError> {
    let timed_out = match outcome {
        Ok(result) => {
            result?;
            false
        }
        Err(_) => {
            warn!(stage = label, "stage timed out");
            true
        }
    };
    let status = if timed_out { "ERROR (TIMEOUT?)" } else { "OK" };
    harness.registry().debug_info_all(&format!("{} - {}", label, status));
    Ok(timed_out)
}

/// Play `frames` refreshes, waiting one interval between them
async fn play(harness: &mut SimHarness, frames: u32, interval: Duration) -> Result<(), SimError> {
    for _ in 0..frames {
        harness.step()?;
        wait(interval).await;
    }
    Ok(())
}

async fn wait(interval: Duration) {
    if interval.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(interval).await;
    }
}

fn encode_all(harness: &SimHarness) -> Result<Vec<String>, DriverError> {
    let compressor = GzipCompressor::default();
    harness
        .generate()
        .iter()
        .map(|artifact| {
            artifact
                .encode(&compressor)
                .map_err(|err| DriverError::Capture(err.into()))
        })
        .collect()
}

/// Write `record` as JSON, creating the directory
///
/// # Errors
///
/// Returns `Io` or `Json` on failure
pub fn write_record(path: &Path, record: &CaptureRecord) -> Result<(), DriverError> {
    let io = |source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io)?;
    }
    let json = serde_json::to_string(record)?;
    std::fs::write(path, json).map_err(io)
}

/// Read a record written by [`write_record`]
///
/// # Errors
///
/// Returns `Io` or `Json` on failure
pub fn read_record(path: &Path) -> Result<CaptureRecord, DriverError> {
    let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glcap_replay::decode_data_url;

    fn quick(scene: Scene, dir: &Path) -> DriverConfig {
        DriverConfig {
            settle_frames: 2,
            capture_frames: 3,
            frame_interval: Duration::ZERO,
            ..DriverConfig::new(scene, dir)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_run_writes_record() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Driver::new(quick(Scene::Triangle, dir.path()));
        let path = driver.run_and_save().await.unwrap().unwrap();
        assert_eq!(path, dir.path().join("triangle.json"));

        let record = read_record(&path).unwrap();
        assert_eq!(record.url, "sim://triangle");
        assert_eq!(record.net_idle_timeout, 0);
        assert_eq!(record.timed_out, TimedOut::default());
        assert_eq!(record.frame.gl_cap_counters.contexts_num, 1);
        assert_eq!(record.frame.gl_captures.len(), 1);
        let events = record.events_time_hp;
        assert!(events.start_time_hp <= events.net_idle_time_hp);
        assert!(events.net_idle_time_hp <= events.gl_cap_time_hp);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_existing_output_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = quick(Scene::Triangle, dir.path());
        std::fs::write(config.output_path(), "{}").unwrap();
        assert!(Driver::new(config).run_and_save().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_captures_decode_with_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let record = Driver::new(quick(Scene::Bindings, dir.path())).run().await.unwrap();
        let text = decode_data_url(&record.frame.gl_captures[0], &GzipCompressor::default()).unwrap();
        assert!(text.contains("// ** HAN_DEBUG_INFO ** domcontentloaded - OK"));
        assert!(text.contains("// ** HAN_DEBUG_INFO ** networkidle - OK"));
        assert!(text.contains("// ** HAN_DEBUG_INFO ** capture - START"));
        assert!(text.contains("gl.bindAttribLocation(program[0], 2, \"normal\");"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_capture_timeout_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let config = DriverConfig {
            capture_frames: 1_000,
            frame_interval: Duration::from_millis(5),
            timeouts: StageTimeouts {
                capture: Duration::from_millis(20),
                ..StageTimeouts::default()
            },
            ..quick(Scene::Triangle, dir.path())
        };
        let record = Driver::new(config).run().await.unwrap();
        assert!(record.timed_out.capture);
        assert!(!record.timed_out.settle);
        assert_eq!(record.frame.gl_captures.len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_navigate_timeout_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let config = DriverConfig {
            contexts: 3,
            settle_frames: 1,
            capture_frames: 2,
            frame_interval: Duration::from_millis(20),
            timeouts: StageTimeouts {
                navigate: Duration::from_millis(5),
                ..StageTimeouts::default()
            },
            ..quick(Scene::Triangle, dir.path())
        };
        let record = Driver::new(config).run().await.unwrap();
        assert!(record.timed_out.navigate);
        assert!(!record.timed_out.capture);
        assert_eq!(record.frame.net_idle_counters.contexts_num, 1);
        assert_eq!(record.frame.gl_captures.len(), 1);
        let text = decode_data_url(&record.frame.gl_captures[0], &GzipCompressor::default()).unwrap();
        assert!(text.contains("// ** HAN_DEBUG_INFO ** domcontentloaded - ERROR (TIMEOUT?)"));
    }

    #[test]
    fn test_record_json_shape() {
        let record = CaptureRecord {
            url: "sim://triangle".to_string(),
            date: 0,
            net_idle_timeout: 1,
            timed_out: TimedOut::default(),
            events_time_hp: EventTimes {
                start_time_hp: 0.0,
                net_idle_time_hp: 1.0,
                gl_cap_time_hp: 2.0,
            },
            frame: FrameRecord {
                net_idle_counters: CaptureCounters::default(),
                gl_cap_counters: CaptureCounters::default(),
                gl_captures: vec![],
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["net_idle_timeout"], 1);
        assert!(value["events_time_hp"]["gl_cap_time_hp"].is_number());
        assert!(value["frame"]["gl_captures"].is_array());
        assert_eq!(value["frame"]["net_idle_counters"]["contexts_num"], 0);
    }
}
