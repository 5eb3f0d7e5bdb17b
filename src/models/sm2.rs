//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each card has an easiness factor (EF) that adjusts based on performance
//! - Grades 0-2: repetitions reset and the card comes back the next day, EF untouched
//! - Grades 3-5: interval grows progressively (1 day → 6 days → EF multiplier)
//! - EF never falls below 1.3
//! - Grades outside 0-5 are rejected

use super::card::{DEFAULT_EASINESS_FACTOR, MIN_EASINESS_FACTOR, SchedulingState};
use crate::clock::MILLIS_PER_DAY;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Lowest grade that counts as recalled.
pub const PASSING_GRADE: u8 = 3;
pub const MAX_GRADE: u8 = 5;
const SECOND_INTERVAL: i64 = 6;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("grade {0} is outside 0..=5")]
pub struct InvalidGrade(pub i32);

/// Recall quality, 0 = complete blackout, 5 = perfect response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Grade(u8);

impl Grade {
    pub fn new(value: i32) -> Result<Self, InvalidGrade> {
        if (0..=MAX_GRADE as i32).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(InvalidGrade(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= PASSING_GRADE
    }
}

impl TryFrom<i32> for Grade {
    type Error = InvalidGrade;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Interval, repetition count and EF a card starts from before its first review.
fn initial_parts() -> (i64, u32, f64) {
    (0, 0, DEFAULT_EASINESS_FACTOR)
}

/// Interval, repetition count and EF after a review graded `grade`.
fn next_parts(current: Option<&SchedulingState>, grade: Grade) -> (i64, u32, f64) {
    let (interval, repetition, easiness_factor) = current
        .map(|s| (s.interval, s.repetition, s.easiness_factor))
        .unwrap_or_else(initial_parts);

    if !grade.is_pass() {
        return (1, 0, easiness_factor.max(MIN_EASINESS_FACTOR));
    }

    // Second success lands on six days unless the interval is already that long.
    // Float to int casts saturate, so huge imported intervals stay at i64::MAX.
    let new_interval = match repetition {
        0 => 1,
        1 if interval < SECOND_INTERVAL => SECOND_INTERVAL,
        _ => (interval as f64 * easiness_factor).round() as i64,
    };
    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let miss = (MAX_GRADE - grade.value()) as f64;
    let new_ef =
        (easiness_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASINESS_FACTOR);
    (new_interval.max(1), repetition.saturating_add(1), new_ef)
}

/// Calculates the scheduling state that follows a review graded `grade` at `now`.
pub fn next_state(
    current: Option<&SchedulingState>,
    grade: Grade,
    now: DateTime<Utc>,
) -> SchedulingState {
    let (interval, repetition, easiness_factor) = next_parts(current, grade);
    SchedulingState {
        interval,
        repetition,
        easiness_factor,
        due_at: now
            .timestamp_millis()
            .saturating_add(interval.saturating_mul(MILLIS_PER_DAY)),
    }
}

/// Validates a raw grade and schedules the review.
pub fn schedule(
    current: Option<&SchedulingState>,
    grade: i32,
    now: DateTime<Utc>,
) -> Result<SchedulingState, InvalidGrade> {
    let grade = Grade::new(grade)?;
    Ok(next_state(current, grade, now))
}

/// Interval in days each grade 0..=5 would give, indexed by grade.
pub fn preview_intervals(current: Option<&SchedulingState>) -> [i64; 6] {
    let mut intervals = [0; 6];
    for (value, slot) in intervals.iter_mut().enumerate() {
        *slot = next_parts(current, Grade(value as u8)).0;
    }
    intervals
}
