//! The ReadWatch actors: coordinator, page observers, tab host and review.
//!
//! This crate provides:
//! - [`Coordinator`] — background classification, the pending-analysis queue
//!   and notifications
//! - [`ObserverHandle`] — the per-page observer task
//! - [`TabHost`] — an in-process [`Browser`] owning tabs and their observers
//! - [`ReviewSession`] — the interactive classify → summarize → save flow
//!
//! Actors share nothing; they talk over channels and each reply is checked
//! against the page identity it was requested for.

pub mod browser;
pub mod coordinator;
pub mod host;
pub mod observer;
pub mod queue;
pub mod review;

#[cfg(test)]
pub(crate) mod testing;

pub use browser::{Browser, BrowserTab};
pub use coordinator::{
    Coordinator, CoordinatorEvent, CoordinatorHandle, CoordinatorSnapshot, DrainOutcome,
};
pub use host::TabHost;
pub use observer::ObserverHandle;
pub use queue::PendingQueue;
pub use review::{
    AcceptOutcome, DUPLICATE_MESSAGE, LOGIN_REQUIRED_MESSAGE, ReviewOutcome, ReviewSession,
    ReviewState,
};
