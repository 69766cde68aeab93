use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::WireTimestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    #[default]
    Yellow,
    Blue,
    Green,
    Pink,
}

impl NoteColor {
    pub const ALL: [NoteColor; 4] = [
        NoteColor::Yellow,
        NoteColor::Blue,
        NoteColor::Green,
        NoteColor::Pink,
    ];
}

impl std::fmt::Display for NoteColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteColor::Yellow => write!(f, "yellow"),
            NoteColor::Blue => write!(f, "blue"),
            NoteColor::Green => write!(f, "green"),
            NoteColor::Pink => write!(f, "pink"),
        }
    }
}

impl std::str::FromStr for NoteColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older documents stored the CSS class, e.g. "bg-yellow-200".
        let lowered = s.trim().to_lowercase();
        let name = lowered
            .strip_prefix("bg-")
            .and_then(|rest| rest.strip_suffix("-200"))
            .unwrap_or(&lowered);
        match name {
            "yellow" => Ok(NoteColor::Yellow),
            "blue" => Ok(NoteColor::Blue),
            "green" => Ok(NoteColor::Green),
            "pink" => Ok(NoteColor::Pink),
            _ => Err(format!("Invalid note color: {}", s)),
        }
    }
}

/// A sticky note. `id` is `None` until the store has assigned one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub color: NoteColor,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// The stored field record, without the id.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::String(self.title.clone()));
        fields.insert("content".to_string(), Value::String(self.content.clone()));
        fields.insert("color".to_string(), Value::String(self.color.to_string()));
        fields.insert(
            "createdAt".to_string(),
            WireTimestamp::from_datetime(&self.created_at).to_value(),
        );
        fields
    }
}

/// Field values for a note that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub color: NoteColor,
}

impl Default for NoteDraft {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            content: "Start typing...".to_string(),
            color: NoteColor::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parses_short_and_legacy_names() {
        assert_eq!("blue".parse::<NoteColor>().unwrap(), NoteColor::Blue);
        assert_eq!("bg-pink-200".parse::<NoteColor>().unwrap(), NoteColor::Pink);
        assert_eq!(" Green ".parse::<NoteColor>().unwrap(), NoteColor::Green);
        assert!("bg-purple-200".parse::<NoteColor>().is_err());
    }

    #[test]
    fn test_color_display_round_trips() {
        for color in NoteColor::ALL {
            assert_eq!(color.to_string().parse::<NoteColor>().unwrap(), color);
        }
    }

    #[test]
    fn test_to_fields_uses_wire_timestamp() {
        let note = Note {
            id: Some("n1".to_string()),
            title: "Groceries".to_string(),
            content: "Milk".to_string(),
            color: NoteColor::Green,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let fields = note.to_fields();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["color"], "green");
        assert_eq!(fields["createdAt"]["seconds"], 1_700_000_000i64);
    }
}
