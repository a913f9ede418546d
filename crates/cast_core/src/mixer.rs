//! Multi-Source Mixer
//!
//! Combines independently clocked sources into one output buffer and keeps
//! the output format in step with them.
//!
//! # Architecture
//!
//! ```text
//!            add/remove (control plane)
//!                   │
//!             [ sources lock ] ──snapshot──┐
//!                                          ▼
//! stream(dst): for each source ─▶ scratch ─▶ Resample? ─▶ to f64 ─▶ dst += scratch
//!                                          │
//!                 produced 0 && can_remove ┴─▶ detach ─▶ renegotiate ─▶ MixerEvent
//! ```
//!
//! A pass works on a snapshot of the source list, so edits never wait for
//! the pass and a source added mid-pass is first heard on the next one.
//! Output bits are always the internal float width; negotiation only picks
//! the widest layout and the highest rate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::audio::{Bits, Format};
use crate::element::{Element, Switch};
use crate::elements::resample::{BackendFactory, Resample};
use crate::error::{ElementError, ElementResult};
use crate::event::MixerEvent;
use crate::samples::Samples;
use crate::source::{SharedSource, SourceId};

#[derive(Clone)]
struct Entry {
    id: SourceId,
    source: SharedSource,
    resample: Arc<Resample>,
    // Output format seen at the last negotiation
    out: Format,
}

struct Negotiated {
    format: Format,
    forced: Option<Format>,
}

struct Scratch {
    buffer: Samples,
    snapshot: Vec<Entry>,
    finished: Vec<SourceId>,
}

pub struct Mixer {
    sources: Mutex<Vec<Entry>>,
    negotiated: Mutex<Negotiated>,
    listeners: Mutex<Vec<Sender<MixerEvent>>>,
    scratch: Mutex<Scratch>,
    resample: AtomicBool,
    factory: Mutex<Option<BackendFactory>>,
    next_id: AtomicU64,
}

impl Mixer {
    pub fn new() -> Self {
        Self::with_format(Format::default())
    }

    /// Mixer starting at `format` until sources say otherwise
    pub fn with_format(format: Format) -> Self {
        let format = format.with_internal_bits();
        Self {
            sources: Mutex::new(Vec::new()),
            negotiated: Mutex::new(Negotiated { format, forced: None }),
            listeners: Mutex::new(Vec::new()),
            scratch: Mutex::new(Scratch {
                buffer: Samples::new(0, format),
                snapshot: Vec::new(),
                finished: Vec::new(),
            }),
            resample: AtomicBool::new(false),
            factory: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Receive format and source list notifications
    pub fn subscribe(&self) -> Receiver<MixerEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.listeners.lock().push(tx);
        rx
    }

    fn emit(&self, event: MixerEvent) {
        self.listeners
            .lock()
            .retain(|tx| !matches!(tx.try_send(event.clone()), Err(TrySendError::Disconnected(_))));
    }

    /// Current output format
    pub fn format(&self) -> Format {
        self.negotiated.lock().format
    }

    /// Force the output format, overriding negotiation until cleared with `None`
    ///
    /// An invalid format is refused.
    pub fn set_format(&self, format: Option<Format>) -> bool {
        if let Some(f) = format {
            if !f.is_valid() {
                warn!(format = %f, "mixer format refused");
                return false;
            }
        }
        self.negotiated.lock().forced = format.map(Format::with_internal_bits);
        self.renegotiate();
        true
    }

    /// Run every source through its own resample element
    pub fn set_resample(&self, enabled: bool) {
        self.resample.store(enabled, Ordering::Relaxed);
    }

    pub fn resample_enabled(&self) -> bool {
        self.resample.load(Ordering::Relaxed)
    }

    /// Backend used by the per-source resample elements, current and future
    pub fn set_resampler(&self, factory: BackendFactory) {
        for entry in self.sources.lock().iter() {
            entry.resample.set_backend(factory());
        }
        *self.factory.lock() = Some(factory);
    }

    fn new_resample(&self) -> Resample {
        match self.factory.lock().as_ref() {
            Some(factory) => Resample::with_backend(factory()),
            None => Resample::new(),
        }
    }

    /// Append a source; it is mixed after those already present
    pub fn add(&self, source: SharedSource) -> SourceId {
        self.insert(source, false)
    }

    /// Insert a source ahead of every other one
    pub fn prepend(&self, source: SharedSource) -> SourceId {
        self.insert(source, true)
    }

    fn insert(&self, source: SharedSource, front: bool) -> SourceId {
        let id = SourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let resample = Arc::new(self.new_resample());
        resample.set_format(self.format());
        let out = {
            let source = source.lock();
            debug!(%id, source = source.name(), front, "mixer source added");
            source.out_format()
        };
        let entry = Entry {
            id,
            source,
            resample,
            out,
        };
        {
            let mut sources = self.sources.lock();
            if front {
                sources.insert(0, entry);
            } else {
                sources.push(entry);
            }
        }
        self.emit(MixerEvent::SourceAdded { id });
        self.renegotiate();
        id
    }

    /// Detach a source without closing it
    pub fn remove(&self, id: SourceId) -> Option<SharedSource> {
        let removed = {
            let mut sources = self.sources.lock();
            let at = sources.iter().position(|e| e.id == id)?;
            sources.remove(at)
        };
        debug!(%id, "mixer source removed");
        self.emit(MixerEvent::SourceRemoved { id, detached: false });
        self.renegotiate();
        Some(removed.source)
    }

    pub fn has(&self, id: SourceId) -> bool {
        self.sources.lock().iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.lock().is_empty()
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.lock().iter().map(|e| e.id).collect()
    }

    /// Detach every source without closing them
    pub fn clear(&self) {
        let removed: Vec<Entry> = self.sources.lock().drain(..).collect();
        for entry in &removed {
            self.emit(MixerEvent::SourceRemoved {
                id: entry.id,
                detached: false,
            });
        }
        self.renegotiate();
    }

    /// Close and detach every source
    pub fn close(&self) {
        let removed: Vec<Entry> = self.sources.lock().drain(..).collect();
        for entry in removed {
            if let Err(err) = entry.source.lock().close() {
                warn!(id = %entry.id, error = %err, "source close failed");
            }
            self.emit(MixerEvent::SourceRemoved {
                id: entry.id,
                detached: false,
            });
        }
    }

    /// Recompute the output format from the sources
    ///
    /// Widest layout (first one wins ties) and highest rate, always at the
    /// internal width. Without sources the format is left as it is.
    fn renegotiate(&self) {
        let negotiated = {
            let sources = self.sources.lock();
            sources.iter().fold(None, |acc: Option<Format>, entry| {
                let out = entry.out;
                if !out.is_valid() {
                    return acc;
                }
                Some(match acc {
                    None => out.with_internal_bits(),
                    Some(best) => {
                        let layout = if out.layout.count() > best.layout.count() {
                            out.layout
                        } else {
                            best.layout
                        };
                        Format::internal(best.rate.max(out.rate), layout)
                    }
                })
            })
        };

        let changed = {
            let mut state = self.negotiated.lock();
            let target = state.forced.or(negotiated).unwrap_or(state.format);
            if target == state.format {
                None
            } else {
                state.format = target;
                Some(target)
            }
        };

        if let Some(format) = changed {
            info!(format = %format, layout = %format.layout, "mixer format renegotiated");
            for entry in self.sources.lock().iter() {
                entry.resample.set_format(format);
            }
            self.emit(MixerEvent::format_changed(format));
        }
    }

    /// Record output format changes made by the sources themselves
    fn source_formats_changed(&self) -> bool {
        let mut changed = false;
        for entry in self.sources.lock().iter_mut() {
            let out = entry.source.lock().out_format();
            if out != entry.out {
                debug!(id = %entry.id, format = %out, "source format changed");
                entry.out = out;
                changed = true;
            }
        }
        changed
    }

    fn detach_finished(&self, finished: &[SourceId]) {
        if finished.is_empty() {
            return;
        }
        self.sources.lock().retain(|e| !finished.contains(&e.id));
        for &id in finished {
            info!(%id, "source ended, detached from mixer");
            self.emit(MixerEvent::SourceRemoved { id, detached: true });
        }
        self.renegotiate();
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Mixer {
    fn name(&self) -> &str {
        "Mixer"
    }

    fn stream(&self, dst: &mut Samples) -> ElementResult<()> {
        if self.source_formats_changed() {
            self.renegotiate();
        }
        let format = self.format();
        dst.set_format(format)?;
        dst.silence();
        dst.set_delivered(0);

        let len = dst.len();
        let resample = self.resample_enabled();
        let mut first_error: Option<ElementError> = None;
        let mut produced_max = 0;

        let mut guard = self.scratch.lock();
        let scratch = &mut *guard;
        scratch.snapshot.clear();
        scratch.snapshot.extend(self.sources.lock().iter().cloned());
        scratch.finished.clear();

        for entry in &scratch.snapshot {
            let buffer = &mut scratch.buffer;
            let (produced, removable) = {
                let mut source = entry.source.lock();
                let produced = match buffer.set_format(source.out_format()) {
                    Ok(()) => {
                        buffer.resize(len);
                        buffer.silence();
                        buffer.set_delivered(0);
                        source.stream(buffer).min(len)
                    }
                    // Unusable this pass, but an ended source is still detached
                    Err(err) => {
                        first_error.get_or_insert(err.into());
                        0
                    }
                };
                (produced, source.can_remove())
            };

            if produced == 0 {
                if removable {
                    scratch.finished.push(entry.id);
                }
                continue;
            }
            buffer.set_delivered(produced);

            if resample {
                if let Err(err) = entry.resample.stream(buffer) {
                    first_error.get_or_insert(err);
                    continue;
                }
            }
            if buffer.format().bits != Bits::INTERNAL {
                if let Err(err) = buffer.convert_bits(Bits::INTERNAL) {
                    first_error.get_or_insert(err.into());
                    continue;
                }
            }
            match dst.mix_from(buffer, 0, 0) {
                Ok(count) => produced_max = produced_max.max(count),
                Err(err) => {
                    first_error.get_or_insert(err.into());
                }
            }
        }

        let finished = std::mem::take(&mut scratch.finished);
        scratch.snapshot.clear();
        drop(guard);

        dst.set_delivered(produced_max);
        self.detach_finished(&finished);
        self.scratch.lock().finished = finished;

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close(&self) {
        Mixer::close(self);
    }
}

/// Toggle for the per-source resample stage
impl Switch for Mixer {
    fn on(&self) {
        self.set_resample(true);
    }

    fn off(&self) {
        self.set_resample(false);
    }

    fn is_on(&self) -> bool {
        self.resample_enabled()
    }
}
