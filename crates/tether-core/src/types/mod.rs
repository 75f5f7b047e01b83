//! Core data model shared by the stores, the synchronizer and the SDK

mod activity;
mod session;

pub use activity::{Activity, ActivityEvent, Originator, Plan, PlanStep};
pub use session::{
    CachedSession, GlobalCacheMetadata, Session, SessionIndexEntry, SessionState, SourceContext,
    is_terminal_state,
};
