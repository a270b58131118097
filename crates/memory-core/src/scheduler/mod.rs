//! The proactive scheduler (§4.I): fires due `ScheduledItem`s, dispatching
//! nudges as delivered messages and tasks to a `SubAgentExecutor`.

pub mod backoff;

use chrono::Utc;

use crate::error::{CoreError, Result};
use crate::llm::SubAgentExecutor;
use crate::store::Store;
use crate::types::{ScheduledItem, ScheduledKind, ScheduledStatus};

/// Outcome of firing one due scheduled item.
#[derive(Debug, Clone)]
pub struct FiredItem {
    pub item: ScheduledItem,
    pub outcome: FireOutcome,
}

#[derive(Debug, Clone)]
pub enum FireOutcome {
    /// A nudge ready to hand to the caller for delivery (e.g. surfaced in
    /// the next assistant turn).
    NudgeDelivered,
    /// A delegated task ran to completion via the `SubAgentExecutor`.
    TaskCompleted { output: String },
    /// The task's sub-agent failed; the item is left `Pending` for the
    /// caller to retry or dismiss.
    TaskFailed { error: String },
}

/// Pops every `ScheduledItem` due for `user_id` as of now, dispatches nudges
/// and tasks, and transitions each item's status accordingly.
pub async fn fire_due_items(
    store: &Store,
    executor: &dyn SubAgentExecutor,
    user_id: &str,
) -> Result<Vec<FiredItem>> {
    let now = Utc::now();
    let due = store
        .get_pending_scheduled_items_by_user(user_id, now)
        .map_err(CoreError::from)?;

    let mut fired = Vec::with_capacity(due.len());
    for item in due {
        let outcome = match item.kind {
            ScheduledKind::Nudge => {
                store
                    .update_scheduled_item_status(item.id, ScheduledStatus::Acted)
                    .map_err(CoreError::from)?;
                FireOutcome::NudgeDelivered
            }
            ScheduledKind::Task => {
                let Some(task_config) = &item.task_config else {
                    store
                        .update_scheduled_item_status(item.id, ScheduledStatus::Dismissed)
                        .map_err(CoreError::from)?;
                    fired.push(FiredItem {
                        item: item.clone(),
                        outcome: FireOutcome::TaskFailed { error: "task item missing task_config".to_string() },
                    });
                    continue;
                };
                match executor.run(&task_config.goal, &task_config.tools).await {
                    Ok(result) if result.task_complete => {
                        store
                            .update_scheduled_item_status(item.id, ScheduledStatus::Acted)
                            .map_err(CoreError::from)?;
                        FireOutcome::TaskCompleted { output: result.output }
                    }
                    Ok(result) => {
                        tracing::debug!(iterations = result.iterations_used, "task left incomplete, retrying later");
                        FireOutcome::TaskFailed { error: "task did not complete within its iteration budget".to_string() }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "sub-agent task execution failed");
                        FireOutcome::TaskFailed { error: e.to_string() }
                    }
                }
            }
        };

        fired.push(FiredItem { item, outcome });
    }

    Ok(fired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::llm::SubAgentResult;
    use crate::types::TaskConfig;
    use async_trait::async_trait;

    struct AlwaysSucceeds;

    #[async_trait]
    impl SubAgentExecutor for AlwaysSucceeds {
        async fn run(&self, _goal: &str, _tools: &[String]) -> std::result::Result<SubAgentResult, ProviderError> {
            Ok(SubAgentResult { output: "done".to_string(), task_complete: true, iterations_used: 1 })
        }
    }

    #[tokio::test]
    async fn fires_a_due_nudge_and_marks_it_acted() {
        let store = Store::open_in_memory().unwrap();
        let item = ScheduledItem::nudge("u1", "stale_goal", "hi", Utc::now() - chrono::Duration::minutes(1));
        store.add_scheduled_item(&item).unwrap();

        let executor = AlwaysSucceeds;
        let fired = fire_due_items(&store, &executor, "u1").await.unwrap();
        assert_eq!(fired.len(), 1);
        assert!(matches!(fired[0].outcome, FireOutcome::NudgeDelivered));
    }

    #[tokio::test]
    async fn fires_a_due_task_and_reports_completion() {
        let store = Store::open_in_memory().unwrap();
        let mut item = ScheduledItem::nudge("u1", "task", "do it", Utc::now() - chrono::Duration::minutes(1));
        item.kind = ScheduledKind::Task;
        item.task_config = Some(TaskConfig { goal: "summarize".to_string(), tools: vec![], max_iterations: 3 });
        store.add_scheduled_item(&item).unwrap();

        let executor = AlwaysSucceeds;
        let fired = fire_due_items(&store, &executor, "u1").await.unwrap();
        assert_eq!(fired.len(), 1);
        assert!(matches!(fired[0].outcome, FireOutcome::TaskCompleted { .. }));
    }

    #[tokio::test]
    async fn not_yet_due_items_are_left_alone() {
        let store = Store::open_in_memory().unwrap();
        let item = ScheduledItem::nudge("u1", "stale_goal", "hi", Utc::now() + chrono::Duration::hours(1));
        store.add_scheduled_item(&item).unwrap();

        let executor = AlwaysSucceeds;
        let fired = fire_due_items(&store, &executor, "u1").await.unwrap();
        assert!(fired.is_empty());
    }
}
