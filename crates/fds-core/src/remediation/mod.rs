//! Remediation: force a rolling restart of a violating workload.
//!
//! The pod template annotation [`RESTARTED_AT_ANNOTATION`] is set to the current time
//! and the whole workload is submitted back unchanged otherwise.
//! Every call writes a fresh value, so every pass that flags a workload rolls it again.
use std::{fmt, sync::Arc};

use fds_model::{RESTARTED_AT_ANNOTATION, Workload};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::trace;

use crate::{cluster::ClusterState, error::UpdateError};

/// Source of the current time for restart timestamps.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Format a restart timestamp: RFC 3339, second precision, explicit offset.
///
/// e.g. `2023-11-14T22:13:20Z`.
pub fn restart_stamp(now: OffsetDateTime) -> Result<String, UpdateError> {
    now.replace_nanosecond(0)
        .map_err(|e| UpdateError::Timestamp(e.to_string()))?
        .format(&Rfc3339)
        .map_err(|e| UpdateError::Timestamp(e.to_string()))
}

/// Submits restart-trigger updates.
#[derive(Clone)]
pub struct Remediator {
    clock: Arc<dyn Clock>,
}

impl Remediator {
    /// Create a remediator using the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Stamp the workload's pod template and submit the update.
    ///
    /// Returns the written timestamp. No retry on failure.
    pub async fn restart<C>(&self, cluster: &C, workload: &Workload) -> Result<String, UpdateError>
    where
        C: ClusterState + ?Sized,
    {
        let stamp = restart_stamp(self.clock.now())?;

        let mut patched = workload.clone();
        patched
            .template_annotations
            .insert(RESTARTED_AT_ANNOTATION, stamp.clone());

        trace!(workload = %workload.reference(), restarted_at = %stamp, "submitting workload update");
        cluster.update_workload(&patched).await?;
        Ok(stamp)
    }
}

impl Default for Remediator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for Remediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remediator")
            .field("clock", &"<clock>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCluster, FixedClock};
    use fds_model::LabelSelector;

    #[test]
    fn stamp_is_second_precision_rfc3339() {
        let now = OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789).unwrap();
        assert_eq!(restart_stamp(now).unwrap(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn stamp_keeps_offset() {
        let offset = time::UtcOffset::from_hms(3, 0, 0).unwrap();
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000)
            .unwrap()
            .to_offset(offset);
        let stamp = restart_stamp(now).unwrap();
        assert_eq!(stamp, "2023-11-15T01:13:20+03:00");
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn restart_sets_annotation_and_keeps_everything_else() {
        let cluster = FakeCluster::new();
        let mut workload = Workload::new("prod", "web", LabelSelector::new());
        workload.template_annotations.insert("team", "core");
        workload.object = serde_json::json!({"spec": {"replicas": 3}});

        let remediator = Remediator::new(Arc::new(FixedClock(1_700_000_000)));
        let stamp = remediator.restart(&cluster, &workload).await.unwrap();
        assert_eq!(stamp, "2023-11-14T22:13:20Z");

        let updates = cluster.updates();
        assert_eq!(updates.len(), 1);
        let sent = &updates[0];
        assert_eq!(sent.template_annotations.get(RESTARTED_AT_ANNOTATION), Some(stamp.as_str()));
        assert_eq!(sent.template_annotations.get("team"), Some("core"));
        assert_eq!(sent.object, workload.object);
        assert_eq!(sent.selector, workload.selector);
    }

    #[tokio::test]
    async fn restart_propagates_update_error() {
        let cluster = FakeCluster::new().fail_update("prod", "web");
        let workload = Workload::new("prod", "web", LabelSelector::new());

        let res = Remediator::default().restart(&cluster, &workload).await;
        assert!(matches!(res, Err(UpdateError::Conflict(_))));
    }
}
