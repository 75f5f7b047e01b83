//! Bounded-concurrency helpers

mod batch;

pub use batch::{BatchOptions, batch_map, batch_map_settled};
