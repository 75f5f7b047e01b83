//! Activity stream synchronizer
//!
//! Merges paginated catch-up and interval polling into one ordered,
//! duplicate-free stream of activities. See [`stream_activities`].

mod cursor;
mod stream;

pub use cursor::StreamCursor;
pub use stream::{ActivityPage, ActivityPageFetcher, StreamOptions, stream_activities};
