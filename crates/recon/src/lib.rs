//! `feedsync-recon` — Catalog feed reconciliation engine.
//!
//! Pure engine crate: receives parsed feed rows, returns change records,
//! export views and mutation plans. No CLI or IO dependencies.

pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod index;
pub mod matcher;
pub mod metafields;
pub mod model;
pub mod order;
pub mod plan;
pub mod project;
pub mod summary;

pub use config::{FeedSchema, SyncConfig, ViewConfig};
pub use engine::{build_views, reconcile, run, UploadViews};
pub use error::ReconError;
pub use model::{Action, ChangeRecord, Columns, ReconResult, Row};
pub use project::ProjectedView;
