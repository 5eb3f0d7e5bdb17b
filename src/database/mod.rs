pub mod db;

use crate::models::SchedulingState;
use thiserror::Error;

pub use db::Database;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Card not found: {card_id} in topic {topic_id}")]
    CardNotFound { topic_id: String, card_id: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidAppState { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable home of per-card scheduling state.
pub trait CardStore {
    /// Replaces the card's scheduling state with `state`.
    fn save_scheduling_state(
        &mut self,
        topic_id: &str,
        card_id: &str,
        state: &SchedulingState,
    ) -> Result<()>;
}

impl<S: CardStore + ?Sized> CardStore for &mut S {
    fn save_scheduling_state(
        &mut self,
        topic_id: &str,
        card_id: &str,
        state: &SchedulingState,
    ) -> Result<()> {
        (**self).save_scheduling_state(topic_id, card_id, state)
    }
}
