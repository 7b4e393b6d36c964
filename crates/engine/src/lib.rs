//! `lashpop-palette-engine`: Command palette ranking core.
//!
//! Pure engine crate: takes a command catalog, a user's usage record and a UI
//! snapshot, returns ranked commands. No CLI or IO dependencies.

pub mod catalog;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod insights;
pub mod scoring;
pub mod search;
pub mod usage;

pub use command::{Affinity, Availability, Command};
pub use config::PaletteConfig;
pub use context::{build_context, FilterChip, ScoringContext, UiState};
pub use error::PaletteError;
pub use scoring::{
    get_top_commands, group_scored_commands, score_and_rank_commands, CommandGroup, RankOptions,
    Ranker, ScoredCommand, Signal,
};
pub use usage::{record_usage, toggle_favorite, toggle_hidden, CommandUsage, Tracker, UsageRecord};
