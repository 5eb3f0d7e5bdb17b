pub mod json;

use crate::database::{self, Database};
use json::{Backup, MergeReport, merge_topics};
use log::info;

/// Collects every stored topic into a backup stamped `exported_at`.
pub fn snapshot(db: &Database, exported_at: i64) -> database::Result<Backup> {
    Ok(Backup::new(db.load_all_topics()?, exported_at))
}

/// Merges a backup into the database, rewriting only the topics it touches.
pub fn restore(db: &mut Database, backup: Backup) -> database::Result<MergeReport> {
    let touched: Vec<String> = backup.topics.iter().map(|t| t.id.clone()).collect();
    let mut topics = db.load_all_topics()?;
    let report = merge_topics(&mut topics, backup.topics);

    for topic in topics.iter().filter(|t| touched.contains(&t.id)) {
        db.replace_topic(topic)?;
    }
    info!(
        "Restore finished: {} topics added, {} updated, {} cards added, {} updated",
        report.topics_added, report.topics_updated, report.cards_added, report.cards_updated
    );
    Ok(report)
}
