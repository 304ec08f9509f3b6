#![cfg(feature = "subscriber")]

//! Taskvisor event logging for the periodic reconciliation task.
//!
//! Each supervised attempt is one reconciliation pass, so a failed attempt is a pass
//! aborted by a fetch error, and a scheduled backoff after success is the wait until
//! the next pass.
use async_trait::async_trait;
use taskvisor::{BackoffSource, Event, EventKind, Subscribe};
use tracing::{debug, error, info, trace, warn};

/// Bounded queue between the event bus and this subscriber.
///
/// On overflow taskvisor drops the event and emits `SubscriberOverflow` instead of blocking.
const QUEUE_CAPACITY: usize = 1024;

/// Subscriber writing supervision events as structured `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassEventLogger;

#[async_trait]
impl Subscribe for PassEventLogger {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "pass-event-logger"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

fn log_event(e: &Event) {
    let task = e.task.as_deref().unwrap_or("unknown");
    let reason = e.reason.as_deref().unwrap_or("unknown");
    let attempt = e.attempt.unwrap_or(0);
    let msg = message_for(e.kind);

    match e.kind {
        EventKind::TaskAddRequested
        | EventKind::TaskRemoveRequested
        | EventKind::TaskRemoved
        | EventKind::TaskStopped
        | EventKind::ControllerSubmitted => trace!(task, "{msg}"),
        EventKind::TaskAdded | EventKind::ControllerSlotTransition => debug!(task, "{msg}"),

        EventKind::TaskStarting => debug!(task, attempt, "{msg}"),
        EventKind::TaskFailed => error!(task, attempt, reason, "{msg}"),
        EventKind::TimeoutHit => {
            warn!(task, timeout_ms = e.timeout_ms.unwrap_or(0), "{msg}")
        }
        EventKind::BackoffScheduled => {
            let delay_ms = e.delay_ms.unwrap_or(0);
            if e.backoff_source == Some(BackoffSource::Failure) {
                warn!(task, attempt, delay_ms, reason, "pass failed, retrying after backoff");
            } else {
                debug!(task, delay_ms, "{msg}");
            }
        }

        EventKind::ShutdownRequested | EventKind::AllStoppedWithinGrace => info!("{msg}"),
        EventKind::GraceExceeded => warn!("{msg}"),

        EventKind::ActorExhausted => warn!(task, reason, "{msg}"),
        EventKind::ActorDead
        | EventKind::SubscriberPanicked
        | EventKind::SubscriberOverflow
        | EventKind::ControllerRejected => error!(task, reason, "{msg}"),
    }
}

fn message_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::TaskAddRequested => "reconcile task registration requested",
        EventKind::TaskAdded => "reconcile task registered",
        EventKind::TaskRemoveRequested => "reconcile task removal requested",
        EventKind::TaskRemoved => "reconcile task removed",

        EventKind::TaskStarting => "reconciliation pass starting",
        EventKind::TaskStopped => "reconciliation pass returned",
        EventKind::TaskFailed => "reconciliation pass aborted",
        EventKind::TimeoutHit => "reconciliation pass exceeded its timeout",
        EventKind::BackoffScheduled => "next reconciliation pass scheduled",

        EventKind::ShutdownRequested => "shutdown requested",
        EventKind::AllStoppedWithinGrace => "reconciliation stopped within grace period",
        EventKind::GraceExceeded => "reconciliation did not stop within grace period",

        EventKind::ActorExhausted => "reconcile task will not be restarted",
        EventKind::ActorDead => "reconcile task terminated permanently",
        EventKind::SubscriberOverflow => "supervision event dropped (queue full)",
        EventKind::SubscriberPanicked => "event subscriber panicked",

        EventKind::ControllerRejected => "reconcile task submission rejected",
        EventKind::ControllerSubmitted => "reconcile task submitted",
        EventKind::ControllerSlotTransition => "reconcile slot transition",
    }
}
