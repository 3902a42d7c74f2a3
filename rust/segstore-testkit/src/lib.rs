//! Test utilities for the segstore crates.
//!
//! This crate provides storage provider doubles:
//! - [`scripted::ScriptedStorageProvider`] succeeds or fails according to a script
//! - [`recording::RecordingStorageProvider`] forwards to a real provider and
//!   records every call
//!
//! Both write to a shared [`call_log::CallLog`], so a test can keep inspecting the
//! calls after handing the provider over to an owning wrapper.

pub mod call_log;
pub mod recording;
pub mod scripted;

pub use call_log::CallLog;
pub use recording::RecordingStorageProvider;
pub use scripted::{Outcomes, ScriptedStorageProvider};
