//! Session history: the reactive store and the comparison orchestrator

pub mod compare;
pub mod store;
pub mod subscription;

pub use compare::MIN_COMPARISON_MODELS;
pub use store::{Record, SessionStore};
pub use subscription::{Observable, Snapshot, Subscription};
