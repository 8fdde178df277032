//! Bulk transfer engine and CLI for macOS aerial wallpapers.
//!
//! The catalog lives in [`aerial_catalog`]; this crate owns the concurrent
//! transfer engine (worker pool, shared progress tracker, polling reporter)
//! and the command-line surface around it.

pub mod client;
pub mod colors;
pub mod config;
pub mod error;
pub mod preflight;
pub mod progress;
pub mod transfer;

pub use aerial_catalog as catalog;

pub use client::TransferClient;
pub use colors::{ColorHelper, ColorMode};
pub use config::AerialConfig;
pub use error::{AerialError, Result};
pub use progress::{ProgressReporter, ProgressSnapshot, ProgressTracker};
pub use transfer::{TransferAction, TransferOutcome, WorkItem, run_batch};
