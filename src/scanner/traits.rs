//! Prober trait abstraction.
//!
//! The scheduler only needs "give me an outcome for this unit", so the
//! network-facing prober can be swapped for a scripted one in tests.

use crate::types::{ProbeOutcome, WorkUnit};
use async_trait::async_trait;
use std::sync::Arc;

/// Performs one connection attempt and classifies it.
///
/// Implementations must always return an outcome; failures are outcomes,
/// not errors.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, unit: WorkUnit) -> ProbeOutcome;
}

/// A prober shared across spawned probe tasks.
pub type SharedProber = Arc<dyn Prober>;

/// Prober driven by a closure, with an optional artificial delay.
#[cfg(test)]
pub(crate) struct ScriptedProber<F> {
    script: F,
    delay: std::time::Duration,
}

#[cfg(test)]
impl<F> ScriptedProber<F>
where
    F: Fn(WorkUnit) -> ProbeOutcome + Send + Sync,
{
    pub(crate) fn new(script: F) -> Self {
        Self {
            script,
            delay: std::time::Duration::ZERO,
        }
    }

    pub(crate) fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[cfg(test)]
#[async_trait]
impl<F> Prober for ScriptedProber<F>
where
    F: Fn(WorkUnit) -> ProbeOutcome + Send + Sync,
{
    async fn probe(&self, unit: WorkUnit) -> ProbeOutcome {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)(unit)
    }
}
