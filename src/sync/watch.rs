use tokio_util::sync::CancellationToken;

use super::reconcile::{reconcile_groups, reconcile_notes};
use crate::entity::{Note, RawDocument, TaskGroup};
use crate::storage::Subscription;

/// A subscription whose snapshots come out already validated.
pub struct CollectionWatch<T> {
    subscription: Subscription,
    reconcile: fn(&[RawDocument]) -> Vec<T>,
}

impl CollectionWatch<Note> {
    pub fn notes(subscription: Subscription) -> Self {
        Self {
            subscription,
            reconcile: reconcile_notes,
        }
    }
}

impl CollectionWatch<TaskGroup> {
    pub fn groups(subscription: Subscription) -> Self {
        Self {
            subscription,
            reconcile: reconcile_groups,
        }
    }
}

impl<T> CollectionWatch<T> {
    /// The next full, validated collection. `None` once cancelled.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        let batch = self.subscription.next().await?;
        Some((self.reconcile)(&batch))
    }

    /// The raw batch, for callers that reconcile themselves.
    pub async fn next_raw(&mut self) -> Option<Vec<RawDocument>> {
        self.subscription.next().await
    }

    pub fn cancel(&self) {
        self.subscription.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.subscription.cancel_token()
    }
}
