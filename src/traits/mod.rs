//! Core trait abstractions for the pipeline.
//!
//! These traits define the capability interfaces the pipeline invokes:
//! page fetching, LLM operations, geo lookups, storage, and notification.
//! Each has real implementations elsewhere in the crate and deterministic
//! fakes in [`crate::testing`].

pub mod ai;
pub mod fetcher;
pub mod maps;
pub mod notifier;
pub mod store;
