pub mod bridge;
pub mod poster;
pub mod queue;
