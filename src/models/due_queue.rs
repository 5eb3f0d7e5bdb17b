//! Orders a topic's cards into a study queue.
//!
//! Overdue reviews come first, then cards never seen before, then cards that are
//! not yet due, soonest first. The result is a snapshot taken at `now`.

use super::Card;
use std::collections::VecDeque;

/// Card counts per tier at the time the queue was built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub due: usize,
    pub new: usize,
    pub future: usize,
    /// Earliest `due_at` among future cards, epoch milliseconds.
    pub next_due_at: Option<i64>,
}

impl QueueSummary {
    pub fn total(&self) -> usize {
        self.due + self.new + self.future
    }

    /// Cards that should be studied right now.
    pub fn ready(&self) -> usize {
        self.due + self.new
    }
}

enum Tier {
    Due,
    New,
    Future(i64),
}

fn tier(card: &Card, now_millis: i64) -> Tier {
    match &card.scheduling {
        None => Tier::New,
        Some(state) if state.is_due(now_millis) => Tier::Due,
        Some(state) => Tier::Future(state.due_at),
    }
}

/// Builds the session queue: due ++ new ++ future (ascending by due date).
pub fn build_queue(cards: &[Card], now_millis: i64) -> VecDeque<Card> {
    let mut due = Vec::new();
    let mut new = Vec::new();
    let mut future = Vec::new();

    for card in cards {
        match tier(card, now_millis) {
            Tier::Due => due.push(card.clone()),
            Tier::New => new.push(card.clone()),
            Tier::Future(due_at) => future.push((due_at, card.clone())),
        }
    }

    // sort_by_key is stable, equal due dates keep collection order
    future.sort_by_key(|(due_at, _)| *due_at);

    due.into_iter()
        .chain(new)
        .chain(future.into_iter().map(|(_, card)| card))
        .collect()
}

pub fn summarize(cards: &[Card], now_millis: i64) -> QueueSummary {
    let mut summary = QueueSummary::default();
    for card in cards {
        match tier(card, now_millis) {
            Tier::Due => summary.due += 1,
            Tier::New => summary.new += 1,
            Tier::Future(due_at) => {
                summary.future += 1;
                summary.next_due_at = Some(summary.next_due_at.map_or(due_at, |n| n.min(due_at)));
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SchedulingState;

    const NOW: i64 = 1_700_000_000_000;

    fn card(id: &str, due_at: Option<i64>) -> Card {
        let card = Card::new(id, format!("front {id}"), format!("back {id}"));
        match due_at {
            Some(due_at) => card.with_scheduling(SchedulingState {
                interval: 1,
                repetition: 1,
                easiness_factor: 2.5,
                due_at,
            }),
            None => card,
        }
    }

    fn ids(queue: &VecDeque<Card>) -> Vec<&str> {
        queue.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_due_then_new_then_future() {
        let cards = vec![
            card("futureB", Some(NOW + 5_000)),
            card("due1", Some(NOW - 10)),
            card("new1", None),
            card("futureA", Some(NOW + 1_000)),
            card("due2", Some(NOW)),
        ];

        let queue = build_queue(&cards, NOW);
        assert_eq!(ids(&queue), ["due1", "due2", "new1", "futureA", "futureB"]);
    }

    #[test]
    fn test_due_and_new_keep_collection_order() {
        let cards = vec![
            card("n2", None),
            card("d2", Some(NOW - 1)),
            card("n1", None),
            card("d1", Some(NOW - 999_999)),
        ];

        let queue = build_queue(&cards, NOW);
        assert_eq!(ids(&queue), ["d2", "d1", "n2", "n1"]);
    }

    #[test]
    fn test_future_ties_are_stable() {
        let cards = vec![
            card("x", Some(NOW + 50)),
            card("y", Some(NOW + 50)),
            card("w", Some(NOW + 10)),
        ];

        let queue = build_queue(&cards, NOW);
        assert_eq!(ids(&queue), ["w", "x", "y"]);
    }

    #[test]
    fn test_every_card_once() {
        let cards: Vec<Card> = (0..20)
            .map(|i| {
                let due_at = match i % 3 {
                    0 => None,
                    1 => Some(NOW - i as i64),
                    _ => Some(NOW + 100 - i as i64),
                };
                card(&i.to_string(), due_at)
            })
            .collect();

        let queue = build_queue(&cards, NOW);
        assert_eq!(queue.len(), cards.len());
        let mut seen: Vec<&str> = ids(&queue);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), cards.len());
    }

    #[test]
    fn test_empty_collection() {
        assert!(build_queue(&[], NOW).is_empty());
        assert_eq!(summarize(&[], NOW), QueueSummary::default());
    }

    #[test]
    fn test_summary_counts() {
        let cards = vec![
            card("a", Some(NOW - 1)),
            card("b", None),
            card("c", None),
            card("d", Some(NOW + 300)),
            card("e", Some(NOW + 200)),
        ];

        let summary = summarize(&cards, NOW);
        assert_eq!(summary.due, 1);
        assert_eq!(summary.new, 2);
        assert_eq!(summary.future, 2);
        assert_eq!(summary.ready(), 3);
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.next_due_at, Some(NOW + 200));
    }
}
