use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::{stdin, stdout};
use std::path::PathBuf;
use study_cards::app::{run_review, write_stats};
use study_cards::config::{Config, DEFAULT_DATABASE};
use study_cards::export::json::{export_to_path, import_from_path};
use study_cards::export::{restore, snapshot};
use study_cards::models::{ReviewSession, Topic, summarize};
use study_cards::{Clock, Database};

/// Spaced-repetition study cards.
#[derive(Parser)]
#[command(name = "study")]
struct Cli {
    /// Path to the card database (SQLite file)
    #[arg(long, env = "STUDY_DB", default_value = DEFAULT_DATABASE, global = true)]
    db: PathBuf,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage topics
    Topic {
        #[command(subcommand)]
        action: TopicCommand,
    },
    /// Manage cards
    Card {
        #[command(subcommand)]
        action: CardCommand,
    },
    /// Review the cards of a topic
    Review { topic: String },
    /// Show due, new and upcoming card counts for a topic
    Stats { topic: String },
    /// Write all topics to a JSON backup
    Export { path: PathBuf },
    /// Merge a JSON backup into the database
    Import { path: PathBuf },
    /// Move the simulated date one day forward
    AdvanceDay,
}

#[derive(Subcommand)]
enum TopicCommand {
    New { name: String },
    List,
    Delete { topic: String },
}

#[derive(Subcommand)]
enum CardCommand {
    Add {
        topic: String,
        front: String,
        back: String,
    },
    Delete {
        topic: String,
        card: String,
    },
}

/// Finds a topic by id, falling back to an exact name match.
fn resolve_topic(db: &Database, key: &str) -> Result<Topic> {
    let topics = db.list_topics()?;
    let found = topics
        .iter()
        .find(|t| t.id == key)
        .or_else(|| topics.iter().find(|t| t.name == key))
        .ok_or_else(|| anyhow!("No topic with id or name '{}'", key))?;
    Ok(db.load_topic(&found.id)?)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = Config::new(args.db, args.verbose);
    config.init_logging();

    let mut db = config
        .open_database()
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    let clock = config.clock(&db)?;

    match args.command {
        Command::Topic { action } => match action {
            TopicCommand::New { name } => {
                let topic = db.create_topic(&name)?;
                println!("Created topic '{}' ({})", topic.name, topic.id);
            }
            TopicCommand::List => {
                for topic in db.list_topics()? {
                    let topic = db.load_topic(&topic.id)?;
                    println!("{}  {} ({} cards)", topic.id, topic.name, topic.cards.len());
                }
            }
            TopicCommand::Delete { topic } => {
                let topic = resolve_topic(&db, &topic)?;
                db.delete_topic(&topic.id)?;
                println!("Deleted topic '{}'", topic.name);
            }
        },
        Command::Card { action } => match action {
            CardCommand::Add { topic, front, back } => {
                let topic = resolve_topic(&db, &topic)?;
                let card = db.add_card(&topic.id, &front, &back)?;
                println!("Added card {} to '{}'", card.id, topic.name);
            }
            CardCommand::Delete { topic, card } => {
                let topic = resolve_topic(&db, &topic)?;
                db.delete_card(&topic.id, &card)?;
                println!("Deleted card {}", card);
            }
        },
        Command::Review { topic } => {
            let topic = resolve_topic(&db, &topic)?;
            let mut session = ReviewSession::start(&topic, &mut db, clock);
            run_review(&mut session, &mut stdin().lock(), &mut stdout().lock())?;
        }
        Command::Stats { topic } => {
            let topic = resolve_topic(&db, &topic)?;
            let summary = summarize(&topic.cards, clock.now_millis());
            write_stats(&mut stdout().lock(), &topic.name, &summary)?;
        }
        Command::Export { path } => {
            let backup = snapshot(&db, clock.now_millis())?;
            export_to_path(&backup, &path)
                .with_context(|| format!("Failed to export to {:?}", path))?;
            println!("Exported {} topics to {:?}", backup.topics.len(), path);
        }
        Command::Import { path } => {
            let backup = import_from_path(&path)
                .with_context(|| format!("Failed to import {:?}", path))?;
            let report = restore(&mut db, backup)?;
            println!(
                "Imported: {} new topics, {} updated, {} new cards, {} updated cards",
                report.topics_added,
                report.topics_updated,
                report.cards_added,
                report.cards_updated
            );
        }
        Command::AdvanceDay => {
            let days = db.advance_day()?;
            println!("Simulated date is now {} day(s) ahead", days);
        }
    }
    Ok(())
}
