//! Core library for hoarder.
//!
//! Collects repository popularity and traffic metrics from a forge and
//! appends them as dated rows to per-repository history files kept on a
//! branch of a separate "hoard" repository.
//!
//! # Modules
//!
//! - [`record`] / [`history`] - Daily records and the date-keyed history
//! - [`codec`] - JSON and CSV history files
//! - [`reconcile`] - Backfill of sparse histories
//! - [`commit`] - Race-safe commits through the git object API
//! - [`forge`] - Forge traits and the GitHub client
//! - [`sync`] - The run over all configured repositories
//! - [`config`] / [`settings`] / [`context`] - Configuration and resolution
//! - [`error`] - Configuration error types
//!
//! # Quick Start
//!
//! ```no_run
//! use hoarder_core::{ConfigLoader, InvocationContext, SyncSettings};
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//! let settings = SyncSettings::resolve(&config, &InvocationContext::detect())
//!     .expect("incomplete configuration");
//!
//! println!("Hoarding into {} on {}", settings.hoard, settings.branch);
//! ```
#![deny(unsafe_code)]

pub mod codec;

pub mod commit;

pub mod config;

pub mod context;

pub mod error;

pub mod forge;

pub mod git;

pub mod history;

pub mod reconcile;

pub mod record;

pub mod retry;

pub mod settings;

pub mod sync;

pub mod target;

pub use codec::Format;
pub use config::{Config, ConfigLoader, ConfigOverrides, LogLevel};
pub use context::InvocationContext;
pub use error::{ConfigError, ConfigResult};
pub use forge::RepoSlug;
pub use forge::github::{GithubClient, GithubClientConfig};
pub use settings::SyncSettings;
pub use sync::{RunReport, SyncError, SyncEvent};
