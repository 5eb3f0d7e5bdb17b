pub mod app;
pub mod clock;
pub mod config;
pub mod database;
pub mod export;
pub mod models;

pub use clock::{Clock, FixedClock, SystemClock};
pub use database::{CardStore, Database, StoreError};
pub use models::{Card, ReviewSession, SchedulingState, Topic};
