//! Element Pipeline
//!
//! An ordered list of elements run over one buffer per pass.
//!
//! # Architecture
//!
//! ```text
//! timer/worker ──stream()──▶ [ lock ] E0 ─▶ E1 ─▶ E2 ─▶ PassReport
//!                                │      │      │
//!                                └ cost ┴ cost ┴ cost (last / max)
//! ```
//!
//! One mutex serializes passes and list edits, so an edit made during a
//! pass takes effect on the next one. A failing element does not
//! stop the pass: its error is collected into the returned [`PassReport`]
//! under the element's name, and the next element still runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::element::{Element, ElementKind};
use crate::error::ElementError;
use crate::samples::Samples;

struct Stage {
    element: Arc<dyn Element>,
    last: Duration,
    max: Duration,
}

impl Stage {
    fn new(element: Arc<dyn Element>) -> Self {
        Self {
            element,
            last: Duration::ZERO,
            max: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct Inner {
    stages: Vec<Stage>,
    buffer: Option<Samples>,
    last: Duration,
    max: Duration,
}

/// Cost of one element, for introspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStats {
    pub name: String,
    pub last: Duration,
    pub max: Duration,
}

/// Outcome of one pass
#[derive(Debug, Default)]
pub struct PassReport {
    /// Samples per channel the buffer holds after the pass
    pub delivered: usize,
    /// Elements that failed, in execution order
    pub failures: Vec<(String, ElementError)>,
    pub cost: Duration,
}

impl PassReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Error reported by the element named `name`, if any
    pub fn failure_of(&self, name: &str) -> Option<&ElementError> {
        self.failures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }
}

#[derive(Default)]
pub struct Pipeline {
    inner: Mutex<Inner>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().stages.is_empty()
    }

    /// Add an element to the end
    pub fn append(&self, element: Arc<dyn Element>) {
        debug!(element = element.name(), "pipeline append");
        self.inner.lock().stages.push(Stage::new(element));
    }

    /// Add an element to the front
    pub fn prepend(&self, element: Arc<dyn Element>) {
        debug!(element = element.name(), "pipeline prepend");
        self.inner.lock().stages.insert(0, Stage::new(element));
    }

    /// Take out the first element named `name`, without closing it
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Element>> {
        let mut inner = self.inner.lock();
        let at = inner.stages.iter().position(|s| s.element.name() == name)?;
        debug!(element = name, "pipeline remove");
        Some(inner.stages.remove(at).element)
    }

    /// Remove every element without closing it
    pub fn clear(&self) {
        self.inner.lock().stages.clear();
    }

    /// Element names in execution order
    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .stages
            .iter()
            .map(|s| s.element.name().to_string())
            .collect()
    }

    /// Install a buffer owned by the pipeline, for [`Pipeline::stream_owned`]
    pub fn set_buffer(&self, buffer: Samples) {
        self.inner.lock().buffer = Some(buffer);
    }

    pub fn take_buffer(&self) -> Option<Samples> {
        self.inner.lock().buffer.take()
    }

    /// Inspect the owned buffer
    pub fn with_buffer<R>(&self, f: impl FnOnce(&Samples) -> R) -> Option<R> {
        self.inner.lock().buffer.as_ref().map(f)
    }

    /// Run every element in order over `samples`
    pub fn stream(&self, samples: &mut Samples) -> PassReport {
        let mut inner = self.inner.lock();
        run(&mut inner, samples)
    }

    /// Run a pass over the owned buffer; `None` without one
    pub fn stream_owned(&self) -> Option<PassReport> {
        let mut inner = self.inner.lock();
        let mut buffer = inner.buffer.take()?;
        let report = run(&mut inner, &mut buffer);
        inner.buffer = Some(buffer);
        Some(report)
    }

    pub fn last_cost(&self) -> Duration {
        self.inner.lock().last
    }

    pub fn last_max_cost(&self) -> Duration {
        self.inner.lock().max
    }

    pub fn stats(&self) -> Vec<StageStats> {
        self.inner
            .lock()
            .stages
            .iter()
            .map(|s| StageStats {
                name: s.element.name().to_string(),
                last: s.last,
                max: s.max,
            })
            .collect()
    }

    /// Close every element and drop them and the owned buffer
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        for stage in inner.stages.drain(..) {
            stage.element.close();
        }
        inner.buffer = None;
    }
}

fn run(inner: &mut Inner, samples: &mut Samples) -> PassReport {
    let started = Instant::now();
    let mut report = PassReport::default();

    for stage in inner.stages.iter_mut() {
        let t = Instant::now();
        let result = match stage.element.kind() {
            ElementKind::WholeBuffer => stage.element.stream(samples),
            ElementKind::PerSample => run_per_sample(stage.element.as_ref(), samples),
        };
        stage.last = t.elapsed();
        stage.max = stage.max.max(stage.last);

        if let Err(err) = result {
            warn!(element = stage.element.name(), error = %err, "element failed, pass continues");
            report.failures.push((stage.element.name().to_string(), err));
        }
    }

    inner.last = started.elapsed();
    inner.max = inner.max.max(inner.last);
    report.delivered = samples.delivered();
    report.cost = inner.last;
    report
}

fn run_per_sample(element: &dyn Element, samples: &mut Samples) -> Result<(), ElementError> {
    let delivered = samples.delivered();
    for (ch, plane) in samples.planes_mut()?.enumerate() {
        for (i, x) in plane[..delivered].iter_mut().enumerate() {
            element.sample(x, ch, i);
        }
    }
    Ok(())
}
