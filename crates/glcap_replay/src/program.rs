//! Resumable replay program.
//!
//! The command log split at frame boundaries. Each segment runs in one
//! display refresh; the emitted step table is this structure written out as
//! script, so pacing can be checked here without a script engine.

use glcap_log::{CaptureEntry, DeferredResolver};

/// Frame segments of a capture log with a resume cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayProgram {
    segments: Vec<Vec<String>>,
    cursor: usize,
}

impl ReplayProgram {
    /// Render `entries` and split them at yield markers.
    ///
    /// A log with `k` markers always has `k + 1` segments, some possibly empty.
    #[must_use]
    pub fn from_entries(entries: &[CaptureEntry], resolver: &dyn DeferredResolver) -> Self {
        let mut segments = vec![Vec::new()];
        for entry in entries {
            if entry.is_yield() {
                segments.push(Vec::new());
                continue;
            }
            if let Some(current) = segments.last_mut() {
                current.extend(entry.render(resolver));
            }
        }
        Self { segments, cursor: 0 }
    }

    /// Run the next segment. `None` once every segment has run.
    pub fn step(&mut self) -> Option<&[String]> {
        let segment = self.segments.get(self.cursor)?;
        self.cursor += 1;
        Some(segment)
    }

    /// Whether every segment has run
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cursor >= self.segments.len()
    }

    /// Rewind to the first segment
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// All segments in order
    #[must_use]
    pub fn segments(&self) -> &[Vec<String>] {
        &self.segments
    }

    /// Number of segments
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the program has no segments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total statement lines across segments
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }
}

/// Drives a [`ReplayProgram`] one segment per display refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickScheduler {
    ticks: u64,
}

impl TickScheduler {
    /// Create a scheduler at tick zero
    #[must_use]
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    /// One refresh: run the next segment. Returns `true` when the program is
    /// exhausted after this tick, i.e. when the completion flag would be set.
    pub fn tick(&mut self, program: &mut ReplayProgram) -> bool {
        self.ticks += 1;
        program.step();
        program.is_done()
    }

    /// Tick until the program is exhausted, handing each segment to `on_step`
    pub fn run(&mut self, program: &mut ReplayProgram, mut on_step: impl FnMut(u64, &[String])) -> u64 {
        while !program.is_done() {
            self.ticks += 1;
            if let Some(segment) = program.step() {
                on_step(self.ticks, segment);
            }
        }
        self.ticks
    }

    /// Refreshes elapsed
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glcap_log::NoDeferred;
    use proptest::prelude::*;

    fn call(text: &str) -> CaptureEntry {
        CaptureEntry::Call(text.to_string())
    }

    #[test]
    fn test_split_at_yields() {
        let entries = vec![
            call("a();"),
            call("b();"),
            CaptureEntry::Yield,
            call("c();"),
            CaptureEntry::Yield,
        ];
        let program = ReplayProgram::from_entries(&entries, &NoDeferred);
        assert_eq!(program.len(), 3);
        assert_eq!(program.segments()[0], vec!["a();", "b();"]);
        assert_eq!(program.segments()[1], vec!["c();"]);
        assert!(program.segments()[2].is_empty());
        assert_eq!(program.line_count(), 3);
    }

    #[test]
    fn test_empty_log_is_one_segment() {
        let program = ReplayProgram::from_entries(&[], &NoDeferred);
        assert_eq!(program.len(), 1);
        assert!(!program.is_done());
    }

    #[test]
    fn test_one_tick_per_segment() {
        let entries = vec![call("a();"), CaptureEntry::Yield, call("b();")];
        let mut program = ReplayProgram::from_entries(&entries, &NoDeferred);
        let mut scheduler = TickScheduler::new();
        assert!(!scheduler.tick(&mut program));
        assert!(scheduler.tick(&mut program));
        assert_eq!(scheduler.ticks(), 2);
        assert!(program.step().is_none());
    }

    #[test]
    fn test_run_collects_in_order() {
        let entries = vec![call("a();"), CaptureEntry::Yield, call("b();")];
        let mut program = ReplayProgram::from_entries(&entries, &NoDeferred);
        let mut seen = Vec::new();
        let ticks = TickScheduler::new().run(&mut program, |tick, lines| {
            seen.push((tick, lines.to_vec()));
        });
        assert_eq!(ticks, 2);
        assert_eq!(seen[0], (1, vec!["a();".to_string()]));
        assert_eq!(seen[1], (2, vec!["b();".to_string()]));
        program.reset();
        assert!(!program.is_done());
    }

    proptest! {
        #[test]
        fn prop_ticks_equal_yields_plus_one(ops in proptest::collection::vec(any::<bool>(), 0..64)) {
            let entries: Vec<CaptureEntry> = ops
                .iter()
                .map(|is_yield| if *is_yield { CaptureEntry::Yield } else { call("x();") })
                .collect();
            let yields = ops.iter().filter(|y| **y).count();
            let mut program = ReplayProgram::from_entries(&entries, &NoDeferred);
            let ticks = TickScheduler::new().run(&mut program, |_, _| {});
            prop_assert_eq!(ticks as usize, yields + 1);
            prop_assert_eq!(program.line_count(), ops.len() - yields);
        }
    }
}
