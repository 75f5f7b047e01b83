//! Cache freshness rules
//!
//! Decides whether a locally cached session may answer a read on its own or
//! must be refreshed from the remote service first.

mod tier;

pub use tier::{
    CacheTier, FROZEN_AFTER_DAYS, WARM_TTL_HOURS, determine_cache_tier, is_cache_valid,
};
