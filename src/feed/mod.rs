pub mod client;
pub mod message;

pub use client::run_feed_stream;
pub use message::{parse_frame, FeedEvent};
