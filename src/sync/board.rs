use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::mutate::{append_task, replace_tasks, toggle_completion};
use super::reconcile::reconcile_groups;
use super::{CollectionWatch, PendingWrites};
use crate::entity::{NewTask, RawDocument, Task, TaskGroup};
use crate::error::{Result, StickyError};
use crate::storage::{DocumentStore, FieldWrite, FieldWrites};

/// Local view of every task group, kept in step with the store.
///
/// Task changes are applied here first, then written as a whole-array
/// overwrite of the group's `tasks` field. A failed write is rolled back.
pub struct TaskBoard<S> {
    store: Arc<S>,
    collection: String,
    groups: Vec<TaskGroup>,
    pending: PendingWrites<Vec<Task>>,
}

impl<S: DocumentStore> TaskBoard<S> {
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            groups: Vec::new(),
            pending: PendingWrites::new(),
        }
    }

    pub fn groups(&self) -> &[TaskGroup] {
        &self.groups
    }

    pub fn group(&self, group_id: &str) -> Option<&TaskGroup> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    /// Whether a write for this group has not been confirmed yet.
    pub fn is_pending(&self, group_id: &str) -> bool {
        self.pending.is_pending(group_id)
    }

    /// Replace local state with a freshly delivered snapshot.
    pub fn apply_snapshot(&mut self, batch: &[RawDocument]) {
        self.groups = reconcile_groups(batch);
        debug!(groups = self.groups.len(), "task board snapshot applied");
    }

    pub async fn watch(&self) -> Result<CollectionWatch<TaskGroup>> {
        let subscription = self.store.subscribe(&self.collection, None).await?;
        Ok(CollectionWatch::groups(subscription))
    }

    /// Read the collection once and apply it.
    pub async fn refresh(&mut self) -> Result<()> {
        let batch = self.store.fetch(&self.collection, None).await?;
        self.apply_snapshot(&batch);
        Ok(())
    }

    /// Seed a new, empty group.
    pub async fn create_group(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StickyError::InvalidInput(
                "group name must be non-empty".to_string(),
            ));
        }

        let mut fields = FieldWrites::new();
        fields.insert("name".to_string(), FieldWrite::Set(Value::String(name.to_string())));
        fields.insert("tasks".to_string(), FieldWrite::Set(Value::Array(Vec::new())));

        let id = match self.store.create(&self.collection, fields).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "failed to create task group");
                if e.write_applied() {
                    if let Err(e) = self.refresh().await {
                        error!(error = %e, "could not re-read task groups");
                    }
                }
                return Err(e);
            }
        };

        self.groups.push(TaskGroup {
            id: id.clone(),
            name: name.to_string(),
            tasks: Vec::new(),
        });
        Ok(id)
    }

    /// Flip a task's completion and overwrite the group's task list.
    pub async fn toggle_task(&mut self, group_id: &str, task_id: &str) -> Result<()> {
        let Some(group) = self.group(group_id) else {
            warn!(group_id, "toggle aborted: group not found");
            return Err(StickyError::GroupNotFound(group_id.to_string()));
        };
        let before = group.tasks.clone();
        let Some(after) = toggle_completion(&before, task_id) else {
            warn!(group_id, task_id, "toggle aborted: task not found");
            return Err(StickyError::TaskNotFound {
                group_id: group_id.to_string(),
                task_id: task_id.to_string(),
            });
        };

        self.overwrite_tasks(group_id, before, after).await
    }

    /// Append a new task to a group and overwrite the group's task list.
    pub async fn add_task(&mut self, group_id: &str, new_task: NewTask) -> Result<Task> {
        if new_task.title.trim().is_empty() {
            return Err(StickyError::InvalidInput(
                "task title must be non-empty".to_string(),
            ));
        }

        let task = new_task.into_task();
        let Some(updated) = append_task(&self.groups, group_id, task.clone()) else {
            warn!(group_id, "add task aborted: group not found");
            return Err(StickyError::GroupNotFound(group_id.to_string()));
        };

        let before = self
            .group(group_id)
            .map(|g| g.tasks.clone())
            .unwrap_or_default();
        let after = updated
            .into_iter()
            .find(|g| g.id == group_id)
            .map(|g| g.tasks)
            .unwrap_or_default();

        self.overwrite_tasks(group_id, before, after).await?;
        Ok(task)
    }

    async fn overwrite_tasks(
        &mut self,
        group_id: &str,
        before: Vec<Task>,
        after: Vec<Task>,
    ) -> Result<()> {
        let mut fields = FieldWrites::new();
        fields.insert(
            "tasks".to_string(),
            FieldWrite::Set(TaskGroup::tasks_value(&after)),
        );

        replace_tasks(&mut self.groups, group_id, after.clone());
        self.pending.begin(group_id, before, after);

        match self.store.update(&self.collection, group_id, fields).await {
            Ok(()) => {
                self.pending.settle(group_id);
                Ok(())
            }
            Err(e) if e.write_applied() => {
                self.pending.settle(group_id);
                Err(e)
            }
            Err(e) => {
                error!(group_id, error = %e, "task write failed, rolling back");
                let current = self.group(group_id).map(|g| g.tasks.clone());
                if let Some(restore) = self.pending.rollback(group_id, current.as_ref()) {
                    replace_tasks(&mut self.groups, group_id, restore);
                }
                Err(e)
            }
        }
    }
}
