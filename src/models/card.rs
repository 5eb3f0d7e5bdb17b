//! Card is a pair <front, back> plus its spaced repetition state.
//! Front and back are opaque rich-text blobs; nothing here looks inside them.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;
pub const MIN_EASINESS_FACTOR: f64 = 1.3;

/// SM-2 state of a reviewed card. Replaced wholesale after every review.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulingState {
    /// Days between the last review and `due_at`.
    pub interval: i64,
    /// Consecutive reviews graded 3 or better.
    pub repetition: u32,
    #[serde(rename = "efactor")]
    pub easiness_factor: f64,
    /// Epoch milliseconds.
    #[serde(rename = "dueDate")]
    pub due_at: i64,
}

impl SchedulingState {
    pub fn is_due(&self, now_millis: i64) -> bool {
        self.due_at <= now_millis
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub front: String,
    pub back: String,
    /// Absent until the first review.
    #[serde(default, rename = "srs", skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<SchedulingState>,
    /// Fields owned by other parts of the app, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    pub fn new(id: impl Into<String>, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            front: front.into(),
            back: back.into(),
            scheduling: None,
            extra: Map::new(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.scheduling.is_none()
    }

    /// Returns a copy carrying `state` in place of the previous one.
    pub fn with_scheduling(&self, state: SchedulingState) -> Self {
        Self {
            scheduling: Some(state),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_creation() {
        let card = Card::new("c1", "hello", "cześć");

        assert_eq!(card.id, "c1");
        assert_eq!(card.front, "hello");
        assert_eq!(card.back, "cześć");
        assert!(card.is_new());
    }

    #[test]
    fn test_with_scheduling_replaces_state() {
        let card = Card::new("c1", "a", "b");
        let first = SchedulingState {
            interval: 1,
            repetition: 1,
            easiness_factor: 2.5,
            due_at: 100,
        };
        let second = SchedulingState {
            interval: 6,
            repetition: 2,
            easiness_factor: 2.6,
            due_at: 200,
        };

        let updated = card.with_scheduling(first).with_scheduling(second);
        assert_eq!(updated.scheduling, Some(second));
        assert!(card.is_new());
    }

    #[test]
    fn test_persisted_shape() {
        let json = r#"{
            "id": "7",
            "front": "<p>Q</p>",
            "back": "<p>A</p>",
            "srs": {"interval": 6, "repetition": 2, "efactor": 2.36, "dueDate": 1700000000000}
        }"#;

        let card: Card = serde_json::from_str(json).unwrap();
        let state = card.scheduling.unwrap();
        assert_eq!(state.interval, 6);
        assert_eq!(state.repetition, 2);
        assert_eq!(state.easiness_factor, 2.36);
        assert_eq!(state.due_at, 1_700_000_000_000);
    }

    #[test]
    fn test_unknown_fields_survive() {
        let json = r#"{"id":"1","front":"f","back":"b","image":"data:xyz","tags":["x"]}"#;

        let card: Card = serde_json::from_str(json).unwrap();
        assert!(card.is_new());

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["image"], "data:xyz");
        assert_eq!(value["tags"][0], "x");
        assert!(value.get("srs").is_none());
    }
}
