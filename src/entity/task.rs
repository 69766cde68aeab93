use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::WireTimestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            completed: false,
            description: None,
            due_date: None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("title".to_string(), Value::String(self.title.clone()));
        map.insert("completed".to_string(), Value::Bool(self.completed));
        if let Some(ref description) = self.description {
            map.insert("description".to_string(), Value::String(description.clone()));
        }
        if let Some(ref due) = self.due_date {
            map.insert(
                "dueDate".to_string(),
                WireTimestamp::from_datetime(due).to_value(),
            );
        }
        Value::Object(map)
    }
}

/// A named, ordered list of tasks stored as one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: String,
    pub name: String,
    pub tasks: Vec<Task>,
}

impl TaskGroup {
    pub fn tasks_value(tasks: &[Task]) -> Value {
        Value::Array(tasks.iter().map(Task::to_value).collect())
    }

    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(self.name.clone()));
        fields.insert("tasks".to_string(), Self::tasks_value(&self.tasks));
        fields
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

/// User input for a task about to be appended to a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn into_task(self) -> Task {
        let mut task = Task::new(self.title);
        task.description = self.description.filter(|d| !d.trim().is_empty());
        task.due_date = self.due_date;
        task
    }
}
