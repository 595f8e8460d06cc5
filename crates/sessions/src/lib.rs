//! In-memory session store (spec.md C4). No cross-restart persistence.

pub mod store;

pub use store::{Session, SessionStore, SessionSummary};
