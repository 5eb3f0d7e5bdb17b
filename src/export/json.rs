//! JSON backup and restore for topics.
//!
//! Current format (version 2):
//! ```json
//! { "version": 2, "exportedAt": 1700000000000, "topics": [ ... ] }
//! ```
//! Version 1 backups are a bare array of topics and are upgraded on read.

use crate::models::{Card, Topic};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const BACKUP_VERSION: u32 = 2;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backup version {0} is newer than this program supports")]
    UnsupportedVersion(u32),

    #[error("Not a backup file: {0}")]
    Malformed(&'static str),
}

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub version: u32,
    /// Epoch milliseconds; zero for backups migrated from version 1.
    #[serde(default)]
    pub exported_at: i64,
    pub topics: Vec<Topic>,
}

impl Backup {
    pub fn new(topics: Vec<Topic>, exported_at: i64) -> Self {
        Self {
            version: BACKUP_VERSION,
            exported_at,
            topics,
        }
    }
}

/// Parses a backup of any supported version into the current shape.
pub fn parse_backup(contents: &str) -> Result<Backup> {
    let value: Value = serde_json::from_str(contents)?;
    if value.is_array() {
        let topics: Vec<Topic> = serde_json::from_value(value)?;
        info!("Migrating version 1 backup with {} topics", topics.len());
        return Ok(Backup::new(topics, 0));
    }
    if !value.is_object() {
        return Err(BackupError::Malformed("expected an object or an array"));
    }

    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(BackupError::Malformed("missing version"))?;
    let version = u32::try_from(version).map_err(|_| BackupError::Malformed("bad version"))?;
    if version > BACKUP_VERSION {
        return Err(BackupError::UnsupportedVersion(version));
    }
    let mut backup: Backup = serde_json::from_value(value)?;
    backup.version = BACKUP_VERSION;
    Ok(backup)
}

/// Exports a backup to a JSON file at the specified path.
pub fn export_to_path(backup: &Backup, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(backup)?;
    fs::write(path, json_string)?;
    info!("Exported {} topics to {:?}", backup.topics.len(), path);
    Ok(())
}

/// Imports a backup from a JSON file, upgrading old versions.
pub fn import_from_path(path: &Path) -> Result<Backup> {
    let contents = fs::read_to_string(path)?;
    let backup = parse_backup(&contents)?;
    info!("Read {} topics from {:?}", backup.topics.len(), path);
    Ok(backup)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub topics_added: usize,
    pub topics_updated: usize,
    pub cards_added: usize,
    pub cards_updated: usize,
}

/// Merges restored topics into `existing`.
///
/// Topics and cards are matched by id. Incoming content wins, except that a
/// card arriving without scheduling state keeps the state it already had.
/// Anything present only locally is left alone.
pub fn merge_topics(existing: &mut Vec<Topic>, incoming: Vec<Topic>) -> MergeReport {
    let mut report = MergeReport::default();
    for topic in incoming {
        match existing.iter_mut().find(|t| t.id == topic.id) {
            Some(current) => {
                report.topics_updated += 1;
                current.name = topic.name;
                current.extra.extend(topic.extra);
                for card in topic.cards {
                    if merge_card(&mut current.cards, card) {
                        report.cards_updated += 1;
                    } else {
                        report.cards_added += 1;
                    }
                }
            }
            None => {
                report.topics_added += 1;
                report.cards_added += topic.cards.len();
                existing.push(topic);
            }
        }
    }
    report
}

/// Returns true when a card with the same id was replaced.
fn merge_card(cards: &mut Vec<Card>, mut incoming: Card) -> bool {
    match cards.iter_mut().find(|c| c.id == incoming.id) {
        Some(current) => {
            if incoming.scheduling.is_none() {
                incoming.scheduling = current.scheduling;
            }
            *current = incoming;
            true
        }
        None => {
            cards.push(incoming);
            false
        }
    }
}
