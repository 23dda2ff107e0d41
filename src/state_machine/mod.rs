mod job;
mod retry;
mod status;

pub use job::Job;
pub use retry::RetryConfig;
pub use status::{Action, Status};
