//! Engine event types.
//!
//! Events are published on the engine's broadcast bus; anything holding an
//! [`EngineHandle`](crate::engine::EngineHandle) can subscribe. Propagation
//! failures surface here (and in the log) instead of flowing back to the
//! host's notification source, which must never see an error.

use crate::propagator::PropagationAction;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The command loop is up and the registry snapshot is loaded.
    EngineStarted,

    /// A change event finished fanning out to a target's subscribers.
    Propagated {
        /// Target domain the change arrived on.
        target: String,
        /// What was replayed onto the subscribers.
        action: PropagationAction,
        /// Number of subscriber writes attempted.
        subscribers: usize,
        /// How many of them failed.
        failures: usize,
    },

    /// One subscriber write failed; siblings were unaffected.
    PropagationFailed {
        subscriber: String,
        name: String,
        error: String,
    },

    /// The registry was flushed to the backing store.
    RegistryFlushed {
        /// Number of target entries in the flushed snapshot.
        targets: usize,
    },

    /// The engine shut down after a final flush.
    EngineStopped,
}
