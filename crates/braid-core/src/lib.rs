//! braid-core library.
//!
//! Resolves task files scattered over many git branches into one board.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums carrying a stable [`error::ErrorCode`].
//!   Degraded conditions are [`scan::ScanWarning`]s, not errors.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).
//! - **I/O**: only through the traits in [`provider`]. Resolution, conflict
//!   selection and board assembly are synchronous and pure.

pub mod alloc;
pub mod board;
pub mod config;
pub mod conflict;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod resolve;
pub mod scan;

pub use board::{Board, StatusGroup, assemble};
pub use config::{ProjectConfig, ScanConfig, load_project_config};
pub use conflict::{ConflictResolver, ConflictStrategy};
pub use error::{CoreError, ErrorCode};
pub use pipeline::{
    BoardView, Collaborators, LocationReport, allocate_id, locate_tasks, query_board,
};
pub use resolve::resolve_locations;
pub use scan::{BranchTaskScanner, ScanOutcome, ScanWarning};
