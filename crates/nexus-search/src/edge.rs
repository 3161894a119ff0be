//! Scroll edge detection.
//!
//! The rendering layer decides when the end of the list is in view; the
//! pagination controller only consumes the resulting edge events and guards
//! against duplicates itself.

/// What the rendering layer currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Number of items rendered
    pub rendered: usize,
    /// Index of the last item at least partially visible
    pub last_visible: usize,
}

pub trait ScrollEdgeDetector {
    fn is_near_end(&self, viewport: &Viewport) -> bool;
}

/// Fires once the last visible index is within `threshold` items of the end.
///
/// A threshold of 0 means the final item itself has to be visible, which is
/// the sentinel-element behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelDetector {
    pub threshold: usize,
}

impl SentinelDetector {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl ScrollEdgeDetector for SentinelDetector {
    fn is_near_end(&self, viewport: &Viewport) -> bool {
        if viewport.rendered == 0 {
            return false;
        }
        viewport.last_visible + 1 + self.threshold >= viewport.rendered
    }
}
