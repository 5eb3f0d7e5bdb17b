//! Database operations for the study application
//!
//! Handles SQLite initialization, CRUD for topics and cards,
//! and SM-2 scheduling state persistence.

use super::{CardStore, Result, StoreError};
use crate::models::{Card, SchedulingState, Topic};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::{Map, Value};
use std::path::Path;
use uuid::Uuid;

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening database {:?}", path);
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Creates tables for topics, cards, scheduling state and app state.
    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS topics (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                position INTEGER NOT NULL,
                extra TEXT NOT NULL DEFAULT '{}'
            )",
            (),
        )?;

        // Scheduling columns are NULL until the first review
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cards (
                topic_id TEXT NOT NULL,
                id TEXT NOT NULL,
                position INTEGER NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                extra TEXT NOT NULL DEFAULT '{}',
                interval_days INTEGER,
                repetition INTEGER,
                easiness_factor REAL,
                due_at INTEGER,
                PRIMARY KEY (topic_id, id),
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
            )",
            (),
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            (),
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO app_state (key, value) VALUES ('day_offset', '0')",
            (),
        )?;

        Ok(Self { conn })
    }

    /// Number of simulated days added to the wall clock
    pub fn day_offset(&self) -> Result<i64> {
        let value: String = self.conn.query_row(
            "SELECT value FROM app_state WHERE key = 'day_offset'",
            [],
            |row| row.get(0),
        )?;
        value.parse().map_err(|_| StoreError::InvalidAppState {
            key: "day_offset",
            value,
        })
    }

    /// Advances the simulated date by one day (for exercising spaced repetition)
    pub fn advance_day(&self) -> Result<i64> {
        let next = self.day_offset()? + 1;
        self.conn.execute(
            "UPDATE app_state SET value = ?1 WHERE key = 'day_offset'",
            params![next.to_string()],
        )?;
        info!("Advanced simulated date to day +{}", next);
        Ok(next)
    }

    pub fn create_topic(&self, name: &str) -> Result<Topic> {
        let topic = Topic::new(Uuid::new_v4().to_string(), name);
        self.insert_topic_row(&topic)?;
        info!("Topic '{}' created with id {}", name, topic.id);
        Ok(topic)
    }

    fn insert_topic_row(&self, topic: &Topic) -> Result<()> {
        let position: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(position) + 1, 0) FROM topics", [], |row| {
                row.get(0)
            })?;
        self.conn.execute(
            "INSERT INTO topics (id, name, position, extra) VALUES (?1, ?2, ?3, ?4)",
            params![
                topic.id,
                topic.name,
                position,
                serde_json::to_string(&topic.extra)?
            ],
        )?;
        Ok(())
    }

    pub fn delete_topic(&self, topic_id: &str) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM topics WHERE id = ?1", params![topic_id])?;
        if deleted == 0 {
            return Err(StoreError::TopicNotFound(topic_id.to_string()));
        }
        info!("Topic {} deleted", topic_id);
        Ok(())
    }

    /// Adds a new, never reviewed card at the end of a topic
    pub fn add_card(&self, topic_id: &str, front: &str, back: &str) -> Result<Card> {
        self.ensure_topic(topic_id)?;
        let card = Card::new(Uuid::new_v4().to_string(), front, back);
        let position = self.next_card_position(topic_id)?;
        insert_card_row(&self.conn, topic_id, position, &card)?;
        debug!("Card {} added to topic {}", card.id, topic_id);
        Ok(card)
    }

    pub fn delete_card(&self, topic_id: &str, card_id: &str) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM cards WHERE topic_id = ?1 AND id = ?2",
            params![topic_id, card_id],
        )?;
        if deleted == 0 {
            return Err(card_not_found(topic_id, card_id));
        }
        Ok(())
    }

    fn ensure_topic(&self, topic_id: &str) -> Result<()> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM topics WHERE id = ?1",
                params![topic_id],
                |_| Ok(()),
            )
            .optional()?;
        exists.ok_or_else(|| StoreError::TopicNotFound(topic_id.to_string()))
    }

    fn next_card_position(&self, topic_id: &str) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM cards WHERE topic_id = ?1",
            params![topic_id],
            |row| row.get(0),
        )?)
    }

    /// Lists all topics in creation order, without their cards
    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, extra FROM topics ORDER BY position")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, name, extra)| {
                Ok(Topic {
                    id,
                    name,
                    cards: Vec::new(),
                    extra: parse_extra(&extra)?,
                })
            })
            .collect()
    }

    /// Loads a topic together with its cards, in their stored order
    pub fn load_topic(&self, topic_id: &str) -> Result<Topic> {
        let header = self
            .conn
            .query_row(
                "SELECT name, extra FROM topics WHERE id = ?1",
                params![topic_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((name, extra)) = header else {
            return Err(StoreError::TopicNotFound(topic_id.to_string()));
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, front, back, extra, interval_days, repetition, easiness_factor, due_at
             FROM cards WHERE topic_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![topic_id], card_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let cards = rows
            .into_iter()
            .map(|(mut card, extra)| {
                card.extra = parse_extra(&extra)?;
                Ok(card)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Topic {
            id: topic_id.to_string(),
            name,
            cards,
            extra: parse_extra(&extra)?,
        })
    }

    /// Loads every topic with its cards
    pub fn load_all_topics(&self) -> Result<Vec<Topic>> {
        self.list_topics()?
            .into_iter()
            .map(|t| self.load_topic(&t.id))
            .collect()
    }

    /// Writes `topic` in full, replacing any stored topic with the same id
    pub fn replace_topic(&mut self, topic: &Topic) -> Result<()> {
        let tx = self.conn.transaction()?;
        let position: Option<i64> = tx
            .query_row(
                "SELECT position FROM topics WHERE id = ?1",
                params![topic.id],
                |row| row.get(0),
            )
            .optional()?;
        let extra = serde_json::to_string(&topic.extra)?;
        match position {
            Some(_) => {
                tx.execute(
                    "UPDATE topics SET name = ?1, extra = ?2 WHERE id = ?3",
                    params![topic.name, extra, topic.id],
                )?;
                tx.execute("DELETE FROM cards WHERE topic_id = ?1", params![topic.id])?;
            }
            None => {
                tx.execute(
                    "INSERT INTO topics (id, name, position, extra)
                     VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM topics), ?3)",
                    params![topic.id, topic.name, extra],
                )?;
            }
        }
        for (position, card) in topic.cards.iter().enumerate() {
            insert_card_row(&tx, &topic.id, position as i64, card)?;
        }
        tx.commit()?;
        debug!("Topic {} written with {} cards", topic.id, topic.cards.len());
        Ok(())
    }
}

impl CardStore for Database {
    fn save_scheduling_state(
        &mut self,
        topic_id: &str,
        card_id: &str,
        state: &SchedulingState,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE cards
             SET interval_days = ?1, repetition = ?2, easiness_factor = ?3, due_at = ?4
             WHERE topic_id = ?5 AND id = ?6",
            params![
                state.interval,
                state.repetition,
                state.easiness_factor,
                state.due_at,
                topic_id,
                card_id
            ],
        )?;
        if updated == 0 {
            return Err(card_not_found(topic_id, card_id));
        }
        Ok(())
    }
}

fn insert_card_row(conn: &Connection, topic_id: &str, position: i64, card: &Card) -> Result<()> {
    let state = card.scheduling;
    conn.execute(
        "INSERT INTO cards (topic_id, id, position, front, back, extra,
                            interval_days, repetition, easiness_factor, due_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            topic_id,
            card.id,
            position,
            card.front,
            card.back,
            serde_json::to_string(&card.extra)?,
            state.map(|s| s.interval),
            state.map(|s| s.repetition),
            state.map(|s| s.easiness_factor),
            state.map(|s| s.due_at),
        ],
    )?;
    Ok(())
}

fn card_not_found(topic_id: &str, card_id: &str) -> StoreError {
    StoreError::CardNotFound {
        topic_id: topic_id.to_string(),
        card_id: card_id.to_string(),
    }
}

fn parse_extra(raw: &str) -> Result<Map<String, Value>> {
    Ok(serde_json::from_str(raw)?)
}

/// Maps a card row; the raw `extra` JSON is parsed by the caller
fn card_row(row: &Row) -> rusqlite::Result<(Card, String)> {
    let interval: Option<i64> = row.get(4)?;
    let repetition: Option<u32> = row.get(5)?;
    let easiness_factor: Option<f64> = row.get(6)?;
    let due_at: Option<i64> = row.get(7)?;

    let scheduling = match (interval, repetition, easiness_factor, due_at) {
        (Some(interval), Some(repetition), Some(easiness_factor), Some(due_at)) => {
            Some(SchedulingState {
                interval,
                repetition,
                easiness_factor,
                due_at,
            })
        }
        _ => None,
    };

    Ok((
        Card {
            id: row.get(0)?,
            front: row.get(1)?,
            back: row.get(2)?,
            scheduling,
            extra: Map::new(),
        },
        row.get(3)?,
    ))
}
