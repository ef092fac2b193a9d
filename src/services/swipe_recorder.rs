///! Fire-and-forget swipe persistence.
///! At most once, no retry buffer: a failed insert is logged and dropped.
use crate::db::SharedPersistence;
use crate::domain::models::SwipeRecord;
use tokio::task::JoinHandle;

pub fn record_in_background(persistence: SharedPersistence, record: SwipeRecord) -> JoinHandle<()> {
    tokio::spawn(async move {
        match persistence.insert_swipe(&record).await {
            Ok(()) => tracing::debug!(
                "Recorded swipe {} on {} for {}",
                record.choice,
                record.design_id,
                record.participant_id
            ),
            Err(e) => tracing::warn!(
                "Swipe insert failed for participant {} on {}: {}",
                record.participant_id,
                record.design_id,
                e
            ),
        }
    })
}
