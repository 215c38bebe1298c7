//! Core functionality for git-asset-state.
//!
//! This module provides the building blocks of state reconciliation: the batched
//! process runner, the status and lock text parsers, the lock cache, the remote
//! divergence checker, the canonical state store, and the [`Engine`] that ties them
//! together.

pub mod colors;
pub mod config;
pub mod dirs;
pub mod engine;
pub mod error;
pub mod git;
pub mod history;
pub mod lock_cache;
pub mod lock_parser;
pub mod lockable;
pub mod output;
pub mod paths;
pub mod reconciler;
pub mod remote;
pub mod runner;
pub mod state;
pub mod status_parser;

// === Error handling ===
pub use error::{AssetStateError, Result};

// === Configuration ===
pub use config::EngineConfig;

// === Engine ===
// The surface used by editor integrations
pub use engine::{AssetHost, DetachedHost, Engine, PullOutcome};

// === Process execution ===
pub use runner::{CommandOutput, GitRunner, Invocation, ProcessBackend, RawOutput, SystemBackend};

// === State model ===
pub use state::{
    ConflictInfo, FileState, FileStateRecord, LockState, LockStatus, PartialStateUpdate,
    RemoteState, RemoteStatus, TreeState,
};
pub use reconciler::StateCache;

// === Locks ===
pub use lock_cache::{LockCache, LockChangeHook, LockQuery, LockScope, ReadOnlyToggle};
pub use lockable::LockableTypes;

// === Repository queries ===
pub use git::GitRepo;
pub use history::{LogAction, Revision};
pub use remote::{DivergenceReport, RemoteCheck};

// === Output formatting ===
pub use output::{
    print_error, print_field, print_info, print_json, print_section_header, print_success,
    print_warning,
};
