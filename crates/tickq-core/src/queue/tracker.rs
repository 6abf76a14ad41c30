//! Completion tracker: one resolved/unresolved slot per submitted task.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::{Resolution, TaskId, TaskOutcome};
use crate::error::QueueError;

#[derive(Debug)]
struct Slot {
    position: usize,
    attempts: u32,
    /// `None` until the task's outcome is final.
    resolution: Option<Resolution>,
}

/// Answers "is everything done?".
///
/// Every read that decides completion takes the same lock as `mark_resolved`.
#[derive(Debug)]
pub struct CompletionTracker {
    slots: Mutex<HashMap<TaskId, Slot>>,
}

impl CompletionTracker {
    /// One unresolved slot per `(id, position)`; a repeated id is rejected.
    pub fn initialize(
        identities: impl IntoIterator<Item = (TaskId, usize)>,
    ) -> Result<Self, QueueError> {
        let mut slots: HashMap<TaskId, Slot> = HashMap::new();
        for (task_id, position) in identities {
            if let Some(existing) = slots.get(&task_id) {
                return Err(QueueError::DuplicateTaskId {
                    task_id,
                    first: existing.position,
                    second: position,
                });
            }
            slots.insert(
                task_id,
                Slot {
                    position,
                    attempts: 0,
                    resolution: None,
                },
            );
        }
        Ok(Self {
            slots: Mutex::new(slots),
        })
    }

    /// Record the final outcome. Returns `false` when the id was already
    /// resolved (first resolution wins) or is unknown.
    pub async fn mark_resolved(&self, task_id: TaskId, attempts: u32, resolution: Resolution) -> bool {
        let mut slots = self.slots.lock().await;
        match slots.get_mut(&task_id) {
            Some(slot) if slot.resolution.is_none() => {
                slot.attempts = attempts;
                slot.resolution = Some(resolution);
                true
            }
            _ => false,
        }
    }

    /// `true` iff every slot is resolved. Vacuously true when empty.
    pub async fn all_resolved(&self) -> bool {
        self.slots
            .lock()
            .await
            .values()
            .all(|slot| slot.resolution.is_some())
    }

    /// `None` for an unknown id, `Some(None)` while unresolved.
    pub async fn resolution(&self, task_id: TaskId) -> Option<Option<Resolution>> {
        self.slots
            .lock()
            .await
            .get(&task_id)
            .map(|slot| slot.resolution.clone())
    }

    /// `(succeeded, exhausted)`.
    pub async fn resolved_counts(&self) -> (usize, usize) {
        let slots = self.slots.lock().await;
        slots
            .values()
            .filter_map(|slot| slot.resolution.as_ref())
            .fold((0, 0), |(ok, dead), r| {
                if r.is_success() {
                    (ok + 1, dead)
                } else {
                    (ok, dead + 1)
                }
            })
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Resolved tasks in submission order.
    pub async fn outcomes(&self) -> Vec<TaskOutcome> {
        let slots = self.slots.lock().await;
        let mut outcomes: Vec<TaskOutcome> = slots
            .iter()
            .filter_map(|(task_id, slot)| {
                slot.resolution.clone().map(|resolution| TaskOutcome {
                    task_id: *task_id,
                    position: slot.position,
                    attempts: slot.attempts,
                    resolution,
                })
            })
            .collect();
        outcomes.sort_by_key(|o| o.position);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use ulid::Ulid;

    fn ids(n: usize) -> Vec<(TaskId, usize)> {
        (0..n)
            .map(|i| (TaskId::from_ulid(Ulid::new()), i))
            .collect()
    }

    #[tokio::test]
    async fn empty_tracker_is_vacuously_resolved() {
        let tracker = CompletionTracker::initialize(Vec::new()).unwrap();
        assert!(tracker.all_resolved().await);
    }

    #[tokio::test]
    async fn resolves_only_when_every_slot_is_set() {
        let entries = ids(2);
        let tracker = CompletionTracker::initialize(entries.clone()).unwrap();
        assert!(!tracker.all_resolved().await);

        assert!(tracker.mark_resolved(entries[0].0, 1, Resolution::Succeeded).await);
        assert!(!tracker.all_resolved().await);

        assert!(
            tracker
                .mark_resolved(entries[1].0, 3, Resolution::exhausted("boom"))
                .await
        );
        assert!(tracker.all_resolved().await);
        assert_eq!(tracker.resolved_counts().await, (1, 1));
    }

    #[tokio::test]
    async fn mark_resolved_is_idempotent_and_first_wins() {
        let entries = ids(1);
        let id = entries[0].0;
        let tracker = CompletionTracker::initialize(entries).unwrap();

        assert!(tracker.mark_resolved(id, 1, Resolution::Succeeded).await);
        assert!(!tracker.mark_resolved(id, 2, Resolution::exhausted("late")).await);

        let outcomes = tracker.outcomes().await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].attempts, 1);
        assert_eq!(outcomes[0].resolution, Resolution::Succeeded);
    }

    #[tokio::test]
    async fn unknown_id_is_ignored() {
        let tracker = CompletionTracker::initialize(ids(1)).unwrap();
        let stranger = TaskId::from_ulid(Ulid::new());

        assert!(!tracker.mark_resolved(stranger, 1, Resolution::Succeeded).await);
        assert!(!tracker.all_resolved().await);
        assert_eq!(tracker.resolution(stranger).await, None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let id = TaskId::from_ulid(Ulid::new());
        let err = CompletionTracker::initialize(vec![(id, 0), (id, 4)]).unwrap_err();

        assert!(matches!(
            err,
            QueueError::DuplicateTaskId { first: 0, second: 4, .. }
        ));
    }

    #[tokio::test]
    async fn outcomes_follow_submission_order() {
        let entries = ids(3);
        let tracker = Arc::new(CompletionTracker::initialize(entries.clone()).unwrap());

        for (id, _) in entries.iter().rev() {
            tracker.mark_resolved(*id, 1, Resolution::Succeeded).await;
        }

        let positions: Vec<usize> = tracker.outcomes().await.iter().map(|o| o.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(
            tracker.resolution(entries[2].0).await,
            Some(Some(Resolution::Succeeded))
        );
    }
}
