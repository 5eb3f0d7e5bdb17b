pub mod card;
pub mod due_queue;
pub mod review_session;
pub mod sm2;
pub mod topic;

pub use card::{Card, SchedulingState};
pub use due_queue::{QueueSummary, build_queue, summarize};
pub use review_session::{ReviewError, ReviewSession, SessionProgress, SessionState};
pub use sm2::{Grade, InvalidGrade};
pub use topic::Topic;
