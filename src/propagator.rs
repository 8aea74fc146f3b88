//! Change propagation.
//!
//! Classifies a host cookie-change notification and replays it onto every
//! subscriber of the changed cookie's domain. The propagator is stateless
//! between events: each round reads the registry snapshot it is handed,
//! fans the writes out concurrently, and terminates.
//!
//! # Classification
//! `evicted`, `expired`, and `expired_overwrite` always mean the store
//! discarded the cookie, whatever the notification's `removed` flag says.
//! `explicit` and `overwrite` fire for deletions *and* fresh sets, so for
//! those two causes, and only those, `removed` is the discriminator.

use futures::future::join_all;
use tokio::sync::broadcast;

use crate::cookies::{remove_cookie, set_cookie, ChangeCause, CookieApiHandle, CookieChange};
use crate::events::EngineEvent;
use crate::registry::Subscriber;

/// What a change event means for subscriber domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationAction {
    /// Mirror the cookie onto each subscriber domain.
    Set,
    /// Expire the cookie on each subscriber domain.
    Remove,
}

/// Maps `(cause, removed)` to the action replayed on subscribers.
pub fn classify(cause: ChangeCause, removed: bool) -> PropagationAction {
    match cause {
        ChangeCause::Evicted | ChangeCause::Expired | ChangeCause::ExpiredOverwrite => {
            PropagationAction::Remove
        }
        ChangeCause::Explicit | ChangeCause::Overwrite => {
            if removed {
                PropagationAction::Remove
            } else {
                PropagationAction::Set
            }
        }
    }
}

/// Replays classified change events onto subscriber domains.
pub struct Propagator {
    api: CookieApiHandle,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl Propagator {
    pub fn new(api: CookieApiHandle, event_tx: broadcast::Sender<EngineEvent>) -> Self {
        Self { api, event_tx }
    }

    /// Fans `change` out to `subscribers`.
    ///
    /// Each subscriber write is an independent future; all of them are
    /// joined without short-circuiting, so one rejected write never blocks
    /// or aborts the others. Failures are logged and published as
    /// [`EngineEvent::PropagationFailed`], not retried: propagation is
    /// at-most-once, best-effort.
    pub async fn propagate(&self, change: &CookieChange, subscribers: &[Subscriber]) {
        if subscribers.is_empty() {
            return;
        }

        let action = classify(change.cause, change.removed);

        let writes = subscribers.iter().map(|sub| {
            let mirrored = change.cookie.with_domain(&sub.domain);
            let api = &self.api;
            async move {
                let result = match action {
                    PropagationAction::Set => set_cookie(api, &mirrored).await,
                    PropagationAction::Remove => remove_cookie(api, &mirrored).await,
                };
                (sub.domain.clone(), result)
            }
        });

        let mut failures = 0;
        for (subscriber, result) in join_all(writes).await {
            if let Err(err) = result {
                failures += 1;
                log::warn!(
                    "propagating {:?} from {:?} to {subscriber:?} failed: {err}",
                    change.cookie.name,
                    change.cookie.domain,
                );
                // send() only fails with no receivers; that is fine here.
                let _ = self.event_tx.send(EngineEvent::PropagationFailed {
                    subscriber,
                    name: change.cookie.name.clone(),
                    error: err.to_string(),
                });
            }
        }

        let _ = self.event_tx.send(EngineEvent::Propagated {
            target: change.cookie.domain.clone(),
            action,
            subscribers: subscribers.len(),
            failures,
        });
    }
}
