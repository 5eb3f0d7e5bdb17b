//! Terminal front end for review sessions and topic statistics.
//! Generic over reader and writer so sessions can be scripted in tests.

use crate::clock::Clock;
use crate::database::CardStore;
use crate::models::due_queue::QueueSummary;
use crate::models::review_session::{ReviewError, ReviewSession, SessionProgress};
use crate::models::sm2::preview_intervals;
use chrono::{DateTime, Local, TimeZone, Utc};
use log::warn;
use std::io::{self, BufRead, Write};

/// Reads one line without its line ending. `None` at end of input.
fn read_line<R: BufRead>(stdin: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Formats an interval in days as a short label
pub fn format_interval(days: i64) -> String {
    match days {
        ..=0 => "now".to_string(),
        1..7 => format!("{}d", days),
        7..30 => format!("{}w", days / 7),
        30..365 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

/// Formats epoch milliseconds as local YYYY-MM-DD HH:MM
pub fn format_timestamp(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(time) => {
            let local: DateTime<Local> = time.into();
            local.format("%Y-%m-%d %H:%M").to_string()
        }
        None => "unknown".to_string(),
    }
}

/// Runs the session until it is empty or input ends.
///
/// Enter flips the card, then a grade 0-5 rates it. Unsaved reviews are
/// retried once at the end.
pub fn run_review<S, C, R, W>(
    session: &mut ReviewSession<S, C>,
    stdin: &mut R,
    stdout: &mut W,
) -> io::Result<SessionProgress>
where
    S: CardStore,
    C: Clock,
    R: BufRead,
    W: Write,
{
    let total = session.progress().remaining;
    if total == 0 {
        writeln!(stdout, "No cards to review.")?;
        return Ok(session.progress());
    }
    writeln!(
        stdout,
        "{} card{} to review\n",
        total,
        if total == 1 { "" } else { "s" }
    )?;

    'cards: while let Ok(card) = session.current_card() {
        write!(stdout, "F: {}", card.front)?;
        stdout.flush()?;
        if read_line(stdin)?.is_none() {
            break;
        }
        let back = card.back.clone();
        let preview = preview_intervals(card.scheduling.as_ref());
        match session.flip() {
            Ok(_) => {}
            Err(ReviewError::EmptyQueue) => break,
            Err(err) => return Err(io::Error::other(err)),
        }
        writeln!(stdout, "B: {}", back)?;

        loop {
            write!(
                stdout,
                "Grade 0-5 (fail: {}, 3: {}, 4: {}, 5: {}): ",
                format_interval(preview[0]),
                format_interval(preview[3]),
                format_interval(preview[4]),
                format_interval(preview[5])
            )?;
            stdout.flush()?;
            let Some(input) = read_line(stdin)? else {
                break 'cards;
            };
            let Ok(grade) = input.trim().parse::<i32>() else {
                writeln!(stdout, "Please enter a number from 0 to 5.")?;
                continue;
            };

            match session.rate(grade) {
                Ok(outcome) => {
                    if outcome.requeued {
                        writeln!(stdout, "You will see this card again shortly.")?;
                    }
                    break;
                }
                Err(ReviewError::InvalidGrade(_)) => {
                    writeln!(stdout, "Please enter a number from 0 to 5.")?;
                }
                Err(err @ ReviewError::Persistence { .. }) => {
                    writeln!(stdout, "Warning: {}", err)?;
                    break;
                }
                Err(ReviewError::EmptyQueue) => break 'cards,
            }
        }
        writeln!(stdout)?;
    }

    if !session.unsynced().is_empty() {
        if let Err(err) = session.retry_unsynced() {
            warn!("Retry of unsaved reviews failed: {}", err);
            writeln!(
                stdout,
                "{} review(s) could not be saved.",
                session.unsynced().len()
            )?;
        }
    }

    let progress = session.progress();
    writeln!(
        stdout,
        "{} review{}: {} passed, {} failed, {} left.",
        progress.reviewed,
        if progress.reviewed == 1 { "" } else { "s" },
        progress.passed,
        progress.failed,
        progress.remaining
    )?;
    Ok(progress)
}

pub fn write_stats<W: Write>(
    stdout: &mut W,
    name: &str,
    summary: &QueueSummary,
) -> io::Result<()> {
    writeln!(stdout, "Topic: {}", name)?;
    writeln!(stdout, "  due     {}", summary.due)?;
    writeln!(stdout, "  new     {}", summary.new)?;
    writeln!(stdout, "  later   {}", summary.future)?;
    writeln!(stdout, "Total: {}", summary.total())?;
    if let Some(next) = summary.next_due_at {
        writeln!(stdout, "Next review: {}", format_timestamp(next))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::Database;
    use crate::models::Topic;
    use std::io::Cursor;

    fn setup(cards: &[(&str, &str)]) -> (Database, Topic) {
        let db = Database::open_in_memory().unwrap();
        let topic = db.create_topic("Polish Vocabulary").unwrap();
        for (front, back) in cards {
            db.add_card(&topic.id, front, back).unwrap();
        }
        let topic = db.load_topic(&topic.id).unwrap();
        (db, topic)
    }

    #[test]
    fn test_review_all_cards() {
        let (mut db, topic) = setup(&[("cześć", "hello"), ("proszę", "please")]);
        let clock = FixedClock::from_millis(1_700_000_000_000);
        let mut session = ReviewSession::start(&topic, &mut db, clock);
        let mut stdin = Cursor::new(b"\n4\n\n5\n".to_vec());
        let mut stdout = Cursor::new(Vec::new());

        let progress = run_review(&mut session, &mut stdin, &mut stdout).unwrap();
        assert_eq!(progress.passed, 2);
        assert!(session.is_empty());
        drop(session);

        let output = String::from_utf8(stdout.into_inner()).unwrap();
        assert!(output.starts_with("2 cards to review\n\nF: cześćB: hello\n"));
        assert!(output.contains("Grade 0-5 (fail: 1d, 3: 1d, 4: 1d, 5: 1d): "));
        assert!(output.ends_with("2 reviews: 2 passed, 0 failed, 0 left.\n"));

        let stored = db.load_topic(&topic.id).unwrap();
        assert!(stored.cards.iter().all(|c| c.scheduling.is_some()));
    }

    #[test]
    fn test_bad_input_reprompts_and_failed_card_returns() {
        let (mut db, topic) = setup(&[("a", "b")]);
        let mut session = ReviewSession::start(&topic, &mut db, FixedClock::from_millis(0));
        let mut stdin = Cursor::new(b"\nx\n9\n1\n\n3\n".to_vec());
        let mut stdout = Cursor::new(Vec::new());

        let progress = run_review(&mut session, &mut stdin, &mut stdout).unwrap();
        assert_eq!(progress.reviewed, 2);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.passed, 1);

        let output = String::from_utf8(stdout.into_inner()).unwrap();
        assert_eq!(output.matches("Please enter a number from 0 to 5.").count(), 2);
        assert!(output.contains("You will see this card again shortly."));
    }

    #[test]
    fn test_end_of_input_abandons_session() {
        let (mut db, topic) = setup(&[("a", "b"), ("c", "d")]);
        let mut session = ReviewSession::start(&topic, &mut db, FixedClock::from_millis(0));
        let mut stdin = Cursor::new(b"\n2\n".to_vec());
        let mut stdout = Cursor::new(Vec::new());

        let progress = run_review(&mut session, &mut stdin, &mut stdout).unwrap();
        assert_eq!(progress.reviewed, 1);
        assert_eq!(progress.remaining, 2);
        assert!(!session.is_empty());
    }

    #[test]
    fn test_input_ending_after_flip_leaves_answer_shown() {
        let (mut db, topic) = setup(&[("a", "b")]);
        let mut session = ReviewSession::start(&topic, &mut db, FixedClock::from_millis(0));
        let mut stdin = Cursor::new(b"\n".to_vec());
        let mut stdout = Cursor::new(Vec::new());

        let progress = run_review(&mut session, &mut stdin, &mut stdout).unwrap();
        assert_eq!(progress.reviewed, 0);
        assert!(session.answer_visible());
        assert_eq!(session.current_card().unwrap().front, "a");
    }

    #[test]
    fn test_empty_topic() {
        let (mut db, topic) = setup(&[]);
        let mut session = ReviewSession::start(&topic, &mut db, FixedClock::from_millis(0));
        let mut stdout = Cursor::new(Vec::new());

        run_review(&mut session, &mut Cursor::new(Vec::new()), &mut stdout).unwrap();
        assert_eq!(stdout.into_inner(), b"No cards to review.\n");
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(6), "6d");
        assert_eq!(format_interval(15), "2w");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(800), "2y");
    }

    #[test]
    fn test_write_stats() {
        let summary = QueueSummary {
            due: 2,
            new: 1,
            future: 0,
            next_due_at: None,
        };
        let mut out = Vec::new();
        write_stats(&mut out, "Biology", &summary).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Topic: Biology\n  due     2\n  new     1\n  later   0\nTotal: 3\n"
        );
    }
}
