//! Git Asset State - Git and Git LFS state reconciliation for asset-managing editors.
//!
//! The library keeps one canonical record per file (content state, tree state, lock
//! ownership, divergence from watched remote branches) and refreshes it by driving the
//! `git` and `git-lfs` executables.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module, which provides:
//! - The [`Engine`] with every operation exposed to an editor integration
//! - Per-file state records and field-sparse updates
//! - The lock cache and its change hook
//! - Error handling and result types

pub mod commands;
pub mod core;

// Re-export the core public API for external users
pub use core::{
    AssetHost,
    // Error handling
    AssetStateError,
    CommandOutput,
    DetachedHost,
    // Engine
    Engine,
    EngineConfig,
    // State model
    FileState,
    FileStateRecord,
    GitRepo,
    GitRunner,
    LockChangeHook,
    LockState,
    LockStatus,
    PartialStateUpdate,
    PullOutcome,
    RemoteState,
    RemoteStatus,
    Result,
    Revision,
    TreeState,
};
