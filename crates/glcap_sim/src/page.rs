//! Simulated host page: a manual clock and a deterministic rasterizer.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use glcap_core::{ImageSource, Timestamp};
use glcap_intercept::{HostError, HostPage};
use std::cell::Cell;
use std::time::Duration;

/// Page with a clock that only moves when told to
#[derive(Debug, Default)]
pub struct SimPage {
    now: Cell<Timestamp>,
    rasterized: Cell<usize>,
    fail_rasterize: bool,
}

impl SimPage {
    /// Page at time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Page whose rasterizer always fails
    #[must_use]
    pub fn failing_rasterizer() -> Self {
        Self {
            fail_rasterize: true,
            ..Self::default()
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }

    /// Number of successful rasterizations
    #[must_use]
    pub fn rasterized(&self) -> usize {
        self.rasterized.get()
    }
}

impl HostPage for SimPage {
    /// Stands in for draw-to-canvas plus `toDataURL()`: the payload encodes
    /// the source's identity, so equal sources give equal URLs
    fn rasterize(&self, image: &ImageSource) -> Result<String, HostError> {
        if self.fail_rasterize {
            return Err(HostError::Rasterize {
                reason: "canvas is tainted".to_string(),
            });
        }
        self.rasterized.set(self.rasterized.get() + 1);
        let identity = format!(
            "{:?}:{}x{}:{}:{}",
            image.kind,
            image.width,
            image.height,
            image.handle.as_u64(),
            image.src.as_deref().unwrap_or_default()
        );
        Ok(format!("data:image/png;base64,{}", BASE64_STANDARD.encode(identity)))
    }

    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glcap_core::{HostHandle, ImageKind};

    #[test]
    fn test_clock_advances() {
        let page = SimPage::new();
        assert_eq!(page.now(), Timestamp::zero());
        page.advance(Duration::from_millis(16));
        assert_eq!(page.now(), Timestamp::from_millis(16));
    }

    #[test]
    fn test_rasterize_is_deterministic() {
        let page = SimPage::new();
        let canvas = ImageSource::new(ImageKind::Canvas, 4, 4, HostHandle::from_raw(9));
        let a = page.rasterize(&canvas).unwrap();
        assert!(a.starts_with("data:image/png;base64,"));
        assert_eq!(a, page.rasterize(&canvas).unwrap());
        assert_eq!(page.rasterized(), 2);
    }

    #[test]
    fn test_failing_rasterizer() {
        let page = SimPage::failing_rasterizer();
        let canvas = ImageSource::new(ImageKind::Canvas, 4, 4, HostHandle::from_raw(9));
        assert!(matches!(page.rasterize(&canvas), Err(HostError::Rasterize { .. })));
    }
}
