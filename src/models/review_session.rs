//! Review session management for spaced repetition practice.
//! Serves cards from a due queue one at a time and applies SM-2 to each grade.

use super::due_queue::build_queue;
use super::sm2::{self, Grade, InvalidGrade};
use super::{Card, SchedulingState, Topic};
use crate::clock::Clock;
use crate::database::{CardStore, StoreError};
use log::{debug, info, warn};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    InvalidGrade(#[from] InvalidGrade),

    #[error("No cards left in this session")]
    EmptyQueue,

    /// The session already moved on; the new state lives only in memory.
    #[error("Review of card {card_id} was not saved: {source}")]
    Persistence {
        card_id: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Empty,
}

/// What a single `rate` did.
#[derive(Clone, Debug, PartialEq)]
pub struct RateOutcome {
    pub card_id: String,
    pub state: SchedulingState,
    /// Failed cards go to the back of the queue for another try this session.
    pub requeued: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionProgress {
    pub reviewed: usize,
    pub passed: usize,
    pub failed: usize,
    pub remaining: usize,
}

/// Graded review whose durable write failed.
#[derive(Clone, Debug, PartialEq)]
pub struct UnsyncedReview {
    pub card_id: String,
    pub state: SchedulingState,
}

/// One study sitting over a topic.
/// Cards graded below 3 are repeated later in the same session; the rest leave it.
pub struct ReviewSession<S, C> {
    topic_id: String,
    queue: VecDeque<Card>,
    show_answer: bool,
    progress: SessionProgress,
    unsynced: Vec<UnsyncedReview>,
    store: S,
    clock: C,
}

impl<S: CardStore, C: Clock> ReviewSession<S, C> {
    /// Starts a session over every card of `topic`, ordered by the due queue.
    pub fn start(topic: &Topic, store: S, clock: C) -> Self {
        let queue = build_queue(&topic.cards, clock.now_millis());
        info!(
            "Starting review of topic '{}' with {} cards",
            topic.name,
            queue.len()
        );
        Self::from_queue(topic.id.clone(), queue, store, clock)
    }

    pub fn from_queue(topic_id: String, queue: VecDeque<Card>, store: S, clock: C) -> Self {
        let progress = SessionProgress {
            remaining: queue.len(),
            ..Default::default()
        };
        Self {
            topic_id,
            queue,
            show_answer: false,
            progress,
            unsynced: Vec::new(),
            store,
            clock,
        }
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    pub fn state(&self) -> SessionState {
        if self.queue.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Active
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn current_card(&self) -> Result<&Card, ReviewError> {
        self.queue.front().ok_or(ReviewError::EmptyQueue)
    }

    pub fn answer_visible(&self) -> bool {
        self.show_answer
    }

    /// Shows or hides the back of the current card. Returns the new visibility.
    pub fn flip(&mut self) -> Result<bool, ReviewError> {
        if self.queue.is_empty() {
            return Err(ReviewError::EmptyQueue);
        }
        self.show_answer = !self.show_answer;
        Ok(self.show_answer)
    }

    /// Grades the current card, persists its new state and advances the queue.
    ///
    /// Nothing changes when the queue is empty or the grade is out of range.
    /// A failed write still advances the queue; the review is then kept in
    /// [`unsynced`](Self::unsynced) and reported as [`ReviewError::Persistence`].
    pub fn rate(&mut self, grade: i32) -> Result<RateOutcome, ReviewError> {
        if self.queue.is_empty() {
            return Err(ReviewError::EmptyQueue);
        }
        let grade = Grade::new(grade)?;
        let Some(mut card) = self.queue.pop_front() else {
            return Err(ReviewError::EmptyQueue);
        };

        let state = sm2::next_state(card.scheduling.as_ref(), grade, self.clock.now());
        card.scheduling = Some(state);
        self.show_answer = false;

        let card_id = card.id.clone();
        let requeued = !grade.is_pass();
        self.progress.reviewed += 1;
        if requeued {
            self.progress.failed += 1;
            self.queue.push_back(card);
        } else {
            self.progress.passed += 1;
        }
        self.progress.remaining = self.queue.len();

        debug!(
            "Card {} graded {}: interval {}d, repetition {}, EF {:.2}",
            card_id,
            grade.value(),
            state.interval,
            state.repetition,
            state.easiness_factor
        );
        if self.queue.is_empty() {
            info!(
                "Review of topic {} finished after {} reviews",
                self.topic_id, self.progress.reviewed
            );
        }

        // A newer state supersedes any earlier unsaved one for the same card.
        self.unsynced.retain(|u| u.card_id != card_id);
        match self
            .store
            .save_scheduling_state(&self.topic_id, &card_id, &state)
        {
            Ok(()) => Ok(RateOutcome {
                card_id,
                state,
                requeued,
            }),
            Err(source) => {
                warn!("Could not save review of card {}: {}", card_id, source);
                self.unsynced.push(UnsyncedReview {
                    card_id: card_id.clone(),
                    state,
                });
                Err(ReviewError::Persistence { card_id, source })
            }
        }
    }

    pub fn progress(&self) -> SessionProgress {
        self.progress
    }

    pub fn unsynced(&self) -> &[UnsyncedReview] {
        &self.unsynced
    }

    /// Writes unsaved reviews again. Reviews that still fail stay queued and the
    /// first failure is returned.
    pub fn retry_unsynced(&mut self) -> Result<(), ReviewError> {
        let pending = std::mem::take(&mut self.unsynced);
        let mut first_error = None;
        for review in pending {
            match self
                .store
                .save_scheduling_state(&self.topic_id, &review.card_id, &review.state)
            {
                Ok(()) => debug!("Card {} synced on retry", review.card_id),
                Err(source) => {
                    if first_error.is_none() {
                        first_error = Some(ReviewError::Persistence {
                            card_id: review.card_id.clone(),
                            source,
                        });
                    }
                    self.unsynced.push(review);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
