//! Pure computations behind each user action. None of these touch the input;
//! they return a new value for the caller to apply and write.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::entity::{Note, NoteColor, Task, TaskGroup, WireTimestamp};
use crate::schema::{FieldIssue, ValidationError};
use crate::storage::{FieldWrite, FieldWrites};

/// Invert `completed` on the task with `task_id`. `None` if there is no such task.
pub fn toggle_completion(tasks: &[Task], task_id: &str) -> Option<Vec<Task>> {
    if !tasks.iter().any(|t| t.id == task_id) {
        return None;
    }
    Some(
        tasks
            .iter()
            .map(|t| {
                if t.id == task_id {
                    Task {
                        completed: !t.completed,
                        ..t.clone()
                    }
                } else {
                    t.clone()
                }
            })
            .collect(),
    )
}

/// Append `task` to the end of the group with `group_id`. `None` if there is no such group.
pub fn append_task(groups: &[TaskGroup], group_id: &str, task: Task) -> Option<Vec<TaskGroup>> {
    let mut task = Some(task);
    let mut found = false;
    let updated: Vec<TaskGroup> = groups
        .iter()
        .map(|g| {
            if g.id == group_id && !found {
                found = true;
                let mut tasks = g.tasks.clone();
                tasks.extend(task.take());
                TaskGroup {
                    tasks,
                    ..g.clone()
                }
            } else {
                g.clone()
            }
        })
        .collect();
    found.then_some(updated)
}

/// Swap in a new task list for one group, leaving the rest alone.
pub fn replace_tasks(groups: &mut [TaskGroup], group_id: &str, tasks: Vec<Task>) -> bool {
    match groups.iter_mut().find(|g| g.id == group_id) {
        Some(group) => {
            group.tasks = tasks;
            true
        }
        None => false,
    }
}

/// A partial edit of a note. Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteEdit {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<NoteColor>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NoteEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.color.is_none()
            && self.created_at.is_none()
    }

    /// Reject edits that would break a note's invariants.
    pub fn check(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        for (field, value) in [("title", &self.title), ("content", &self.content)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                issues.push(FieldIssue {
                    path: field.to_string(),
                    message: "must be non-empty".to_string(),
                });
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn apply_to(&self, note: &Note) -> Note {
        Note {
            id: note.id.clone(),
            title: self.title.clone().unwrap_or_else(|| note.title.clone()),
            content: self.content.clone().unwrap_or_else(|| note.content.clone()),
            color: self.color.unwrap_or(note.color),
            created_at: self.created_at.unwrap_or(note.created_at),
        }
    }

    pub fn to_writes(&self) -> FieldWrites {
        let mut writes = FieldWrites::new();
        if let Some(ref title) = self.title {
            writes.insert("title".to_string(), FieldWrite::Set(Value::String(title.clone())));
        }
        if let Some(ref content) = self.content {
            writes.insert(
                "content".to_string(),
                FieldWrite::Set(Value::String(content.clone())),
            );
        }
        if let Some(color) = self.color {
            writes.insert(
                "color".to_string(),
                FieldWrite::Set(Value::String(color.to_string())),
            );
        }
        if let Some(ref created_at) = self.created_at {
            writes.insert(
                "createdAt".to_string(),
                FieldWrite::Set(WireTimestamp::from_datetime(created_at).to_value()),
            );
        }
        writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {}", id),
            completed,
            description: None,
            due_date: None,
        }
    }

    fn group(id: &str, tasks: Vec<Task>) -> TaskGroup {
        TaskGroup {
            id: id.to_string(),
            name: format!("group {}", id),
            tasks,
        }
    }

    #[test]
    fn test_toggle_flips_only_the_target() {
        let tasks = vec![task("t1", false), task("t2", true)];
        let toggled = toggle_completion(&tasks, "t1").unwrap();
        assert!(toggled[0].completed);
        assert_eq!(toggled[1], tasks[1]);
        // input untouched
        assert!(!tasks[0].completed);
    }

    #[test]
    fn test_toggle_twice_is_identity() {
        let tasks = vec![task("t1", false), task("t2", true), task("t3", false)];
        for id in ["t1", "t2", "t3"] {
            let once = toggle_completion(&tasks, id).unwrap();
            let twice = toggle_completion(&once, id).unwrap();
            assert_eq!(twice, tasks);
        }
    }

    #[test]
    fn test_toggle_unknown_task() {
        assert!(toggle_completion(&[task("t1", false)], "nope").is_none());
    }

    #[test]
    fn test_append_grows_target_by_one_and_leaves_others() {
        let groups = vec![
            group("g1", vec![task("t1", false)]),
            group("g2", vec![task("t2", false), task("t3", true)]),
        ];
        let updated = append_task(&groups, "g2", task("t4", false)).unwrap();

        assert_eq!(updated[1].tasks.len(), groups[1].tasks.len() + 1);
        assert_eq!(updated[1].tasks.last().unwrap().id, "t4");
        assert_eq!(updated[0], groups[0]);
        assert_eq!(groups[1].tasks.len(), 2);
    }

    #[test]
    fn test_append_unknown_group() {
        let groups = vec![group("g1", vec![])];
        assert!(append_task(&groups, "g9", task("t1", false)).is_none());
    }

    #[test]
    fn test_replace_tasks() {
        let mut groups = vec![group("g1", vec![]), group("g2", vec![])];
        assert!(replace_tasks(&mut groups, "g2", vec![task("t1", false)]));
        assert_eq!(groups[1].tasks.len(), 1);
        assert!(groups[0].tasks.is_empty());
        assert!(!replace_tasks(&mut groups, "g3", vec![]));
    }

    #[test]
    fn test_note_edit_writes_only_changed_fields() {
        let edit = NoteEdit {
            content: Some("new".to_string()),
            color: Some(NoteColor::Pink),
            ..NoteEdit::default()
        };
        let writes = edit.to_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes["color"], FieldWrite::Set(Value::String("pink".to_string())));
        assert!(!writes.contains_key("title"));
    }

    #[test]
    fn test_note_edit_check_rejects_blank_title() {
        let edit = NoteEdit {
            title: Some("  ".to_string()),
            ..NoteEdit::default()
        };
        let err = edit.check().unwrap_err();
        assert!(err.mentions("title"));
        assert!(NoteEdit::default().check().is_ok());
        assert!(NoteEdit::default().is_empty());
    }
}
