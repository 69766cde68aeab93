//! Validation of untyped store records into typed entities.
//!
//! Documents arrive from the store with no compile-time contract. Every
//! record goes through here before anything reads `.title` or `.tasks`.
//! Failures are values, never panics: each carries every offending field.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::entity::{normalize_time, Note, NoteColor, Task, TaskGroup};

/// One field that broke its constraint, e.g. `tasks[2].title: must be non-empty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    fn single(path: &str, message: &str) -> Self {
        Self {
            issues: vec![FieldIssue {
                path: path.to_string(),
                message: message.to_string(),
            }],
        }
    }

    /// Whether any issue concerns the given field path.
    pub fn mentions(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(FieldIssue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates issues for one record, prefixing nested paths.
struct Issues<'a> {
    prefix: String,
    found: &'a mut Vec<FieldIssue>,
}

impl<'a> Issues<'a> {
    fn push(&mut self, field: &str, message: &str) {
        self.found.push(FieldIssue {
            path: format!("{}{}", self.prefix, field),
            message: message.to_string(),
        });
    }

    fn required_text(&mut self, map: &Map<String, Value>, field: &str) -> Option<String> {
        match map.get(field) {
            None | Some(Value::Null) => {
                self.push(field, "is required");
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.push(field, "must be non-empty");
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.push(field, "must be a string");
                None
            }
        }
    }

    fn optional_text(&mut self, map: &Map<String, Value>, field: &str) -> Option<String> {
        match map.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.push(field, "must be a string");
                None
            }
        }
    }
}

fn as_object<'v>(record: &'v Value, path: &str) -> Result<&'v Map<String, Value>, ValidationError> {
    record
        .as_object()
        .ok_or_else(|| ValidationError::single(path, "must be an object"))
}

fn finish<T>(value: Option<T>, issues: Vec<FieldIssue>) -> Result<T, ValidationError> {
    match value {
        Some(v) if issues.is_empty() => Ok(v),
        _ => Err(ValidationError { issues }),
    }
}

/// Validate a note record. `id` is the store key; when absent the record's own
/// `id` field is used, and a note with neither is treated as not yet persisted.
pub fn validate_note(id: Option<&str>, record: &Value) -> Result<Note, ValidationError> {
    let map = as_object(record, "(root)")?;
    let mut found = Vec::new();
    let mut issues = Issues {
        prefix: String::new(),
        found: &mut found,
    };

    let title = issues.required_text(map, "title");
    let content = issues.required_text(map, "content");

    let color = match map.get("color") {
        None | Some(Value::Null) => Some(NoteColor::default()),
        Some(Value::String(s)) => match s.parse::<NoteColor>() {
            Ok(c) => Some(c),
            Err(_) => {
                issues.push("color", "must be one of yellow, blue, green, pink");
                None
            }
        },
        Some(_) => {
            issues.push("color", "must be a string");
            None
        }
    };

    let created_at = match map.get("createdAt") {
        None | Some(Value::Null) => {
            issues.push("createdAt", "is required");
            None
        }
        Some(v) => {
            let normalized = normalize_time(v);
            if normalized.is_none() {
                issues.push("createdAt", "must be a timestamp");
            }
            normalized
        }
    };

    let id = id
        .map(str::to_string)
        .or_else(|| map.get("id").and_then(Value::as_str).map(str::to_string))
        .filter(|s| !s.is_empty());

    let note = match (title, content, color, created_at) {
        (Some(title), Some(content), Some(color), Some(created_at)) => Some(Note {
            id,
            title,
            content,
            color,
            created_at,
        }),
        _ => None,
    };
    finish(note, found)
}

/// Validate a single task record.
pub fn validate_task(record: &Value) -> Result<Task, ValidationError> {
    let mut found = Vec::new();
    let task = task_at(record, "", &mut found);
    finish(task, found)
}

fn task_at(record: &Value, prefix: &str, found: &mut Vec<FieldIssue>) -> Option<Task> {
    let Some(map) = record.as_object() else {
        let path = if prefix.is_empty() {
            "(root)".to_string()
        } else {
            prefix.trim_end_matches('.').to_string()
        };
        found.push(FieldIssue {
            path,
            message: "must be an object".to_string(),
        });
        return None;
    };

    let mut issues = Issues {
        prefix: prefix.to_string(),
        found,
    };

    let id = issues.required_text(map, "id");
    let title = issues.required_text(map, "title");

    let completed = match map.get("completed") {
        None | Some(Value::Null) => Some(false),
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            issues.push("completed", "must be a boolean");
            None
        }
    };

    let description = issues.optional_text(map, "description");

    // `DueDate` is the spelling used by early documents.
    let (due_field, due_raw) = match map.get("dueDate") {
        Some(v) => ("dueDate", Some(v)),
        None => ("DueDate", map.get("DueDate")),
    };
    let due_date = match due_raw {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(s)) if s.trim().is_empty() => Some(None),
        Some(v) => match normalize_time(v) {
            Some(dt) => Some(Some(dt)),
            None => {
                issues.push(due_field, "must be a timestamp or date");
                None
            }
        },
    };

    match (id, title, completed, due_date) {
        (Some(id), Some(title), Some(completed), Some(due_date)) => Some(Task {
            id,
            title,
            completed,
            description,
            due_date,
        }),
        _ => None,
    }
}

/// Validate a task group record stored under `id`.
pub fn validate_task_group(id: &str, record: &Value) -> Result<TaskGroup, ValidationError> {
    let map = as_object(record, "(root)")?;
    let mut found = Vec::new();

    let name = Issues {
        prefix: String::new(),
        found: &mut found,
    }
    .required_text(map, "name");

    let tasks = match map.get("tasks") {
        Some(Value::Array(items)) => {
            let mut tasks = Vec::with_capacity(items.len());
            let mut seen = HashSet::new();
            for (i, item) in items.iter().enumerate() {
                let prefix = format!("tasks[{}].", i);
                if let Some(task) = task_at(item, &prefix, &mut found) {
                    if !seen.insert(task.id.clone()) {
                        found.push(FieldIssue {
                            path: format!("{}id", prefix),
                            message: "duplicate task id".to_string(),
                        });
                    }
                    tasks.push(task);
                }
            }
            Some(tasks)
        }
        _ => {
            found.push(FieldIssue {
                path: "tasks".to_string(),
                message: "must be an array".to_string(),
            });
            None
        }
    };

    let group = match (name, tasks) {
        (Some(name), Some(tasks)) => Some(TaskGroup {
            id: id.to_string(),
            name,
            tasks,
        }),
        _ => None,
    };
    finish(group, found)
}
