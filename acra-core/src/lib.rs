//! Core of the acra ecosystem.
//!
//! This crate mirrors meetings from the ACRA service into a calendar store:
//! - `engine` runs the full-replace sync and the reminder helper
//! - `store` defines the calendar store capability and its implementations
//! - `translate` maps meetings onto calendar events

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod guard;
pub mod ics;
pub mod meeting;
pub mod preferences;
pub mod store;
pub mod translate;

pub use cancel::CancelToken;
pub use engine::{CalendarSync, SyncReport};
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use meeting::Meeting;
