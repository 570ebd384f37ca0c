//! Infinite scroll: fetch the next page when the end of a list comes close.
//!
//! The UI reports where its viewport ends and where the list's sentinel (the
//! element after the last item) starts.  When the sentinel is within the
//! prefetch margin, the next page is requested, at most one at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;
use crate::loader::LoadMore;

/// A feed that can be paged through by scrolling.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load_next(&self) -> Result<LoadMore>;

    fn has_more(&self) -> bool;

    fn is_torn_down(&self) -> bool;
}

/// Positions reported by the UI, in logical pixels from the top of the
/// scroll container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSample {
    pub viewport_bottom: f64,
    pub sentinel_top: f64,
}

impl ViewportSample {
    pub fn new(viewport_bottom: f64, sentinel_top: f64) -> Self {
        Self {
            viewport_bottom,
            sentinel_top,
        }
    }

    /// How far the sentinel is below the viewport; negative once visible.
    pub fn distance(&self) -> f64 {
        self.sentinel_top - self.viewport_bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The sentinel is not close enough yet.
    Idle,
    /// A page is already being fetched.
    Ignored,
    /// A load was started and finished.
    Loaded(LoadMore),
    /// Nothing left to observe.
    Stopped,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ScrollTrigger<S: PageSource + ?Sized> {
    source: Arc<S>,
    prefetch_margin: f64,
    in_flight: AtomicBool,
    disconnected: AtomicBool,
}

impl<S: PageSource + ?Sized> ScrollTrigger<S> {
    pub fn new(source: Arc<S>, prefetch_margin: f64) -> Self {
        Self {
            source,
            prefetch_margin,
            in_flight: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Stop observing.  Later samples are answered with `Stopped`.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
            || self.source.is_torn_down()
            || !self.source.has_more()
    }

    /// React to one viewport sample.
    ///
    /// A failed load is returned as an error; the source stops paginating
    /// after it, so the next sample yields `Stopped`.
    pub async fn on_viewport(&self, sample: ViewportSample) -> Result<TriggerOutcome> {
        if self.is_stopped() {
            return Ok(TriggerOutcome::Stopped);
        }
        if sample.distance() > self.prefetch_margin {
            return Ok(TriggerOutcome::Idle);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(TriggerOutcome::Ignored);
        }
        let _in_flight = InFlight(&self.in_flight);

        debug!(distance = sample.distance(), "Sentinel in range, loading next page");
        let loaded = self.source.load_next().await?;
        Ok(TriggerOutcome::Loaded(loaded))
    }

    /// Consume viewport samples until the trigger stops or the sender goes
    /// away.  Samples that piled up while a page was loading are dropped.
    /// Returns the number of pages appended.
    pub async fn drive(&self, mut samples: mpsc::Receiver<ViewportSample>) -> usize {
        let mut appended = 0;
        while let Some(sample) = samples.recv().await {
            match self.on_viewport(sample).await {
                Ok(TriggerOutcome::Stopped) => break,
                Ok(TriggerOutcome::Loaded(outcome)) => {
                    if matches!(outcome, LoadMore::Appended { .. }) {
                        appended += 1;
                    }
                    while samples.try_recv().is_ok() {}
                }
                Ok(TriggerOutcome::Idle | TriggerOutcome::Ignored) => {}
                Err(e) => {
                    debug!(error = %e, "Scroll-triggered load failed");
                    while samples.try_recv().is_ok() {}
                }
            }
        }
        debug!(appended, "Scroll trigger stopped");
        appended
    }
}
