//! Stream Element Contract
//!
//! An element is one named processing step over a planar buffer. Elements
//! are shared between the pipeline worker and the control plane as
//! `Arc<dyn Element>`, so every method takes `&self` and elements keep their
//! mutable state behind atomics or short locks.
//!
//! Rust pattern: `Send + Sync` supertraits make the trait object usable from
//! any thread without wrapping every element in a mutex.

use crate::error::ElementResult;
use crate::samples::Samples;

/// How the pipeline drives an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementKind {
    /// `stream` sees the whole buffer once per pass
    #[default]
    WholeBuffer,
    /// `sample` is called for every delivered sample of every channel
    PerSample,
}

pub trait Element: Send + Sync {
    /// Human-readable name for logs and cost reports
    fn name(&self) -> &str;

    fn kind(&self) -> ElementKind {
        ElementKind::WholeBuffer
    }

    /// Process the buffer in place
    fn stream(&self, samples: &mut Samples) -> ElementResult<()>;

    /// Per-sample hook, used when `kind()` is `PerSample`
    fn sample(&self, _sample: &mut f64, _channel: usize, _index: usize) {}

    /// Release resources; the element is not streamed again afterwards
    fn close(&self) {}
}

/// Elements that can be bypassed at runtime
pub trait Switch {
    fn on(&self);
    fn off(&self);
    fn is_on(&self) -> bool;

    fn set_on(&self, on: bool) {
        if on {
            self.on()
        } else {
            self.off()
        }
    }
}
