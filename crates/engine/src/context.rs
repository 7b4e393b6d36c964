//! Context builder: projects live UI state into the inputs the scorer reads.
//!
//! The UI hands over whatever it has; anything missing or nonsensical
//! becomes the neutral value (nothing selected, no filters, unknown library
//! size). Building a context never fails.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::usage::UsageRecord;

/// One active filter chip, e.g. `team:emily` or `lash_type:volume`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChip {
    pub category: String,
    pub option: String,
}

impl FilterChip {
    pub fn new(category: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            option: option.into(),
        }
    }
}

/// Raw UI snapshot as reported by the palette host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiState {
    pub selection_count: Option<i64>,
    pub selected_ids: Vec<String>,
    pub active_filters: Vec<FilterChip>,
    pub lightbox_open: Option<bool>,
    pub active_asset_name: Option<String>,
    pub total_assets: Option<i64>,
    pub last_command_id: Option<String>,
    pub search_query: Option<String>,
    pub now: Option<DateTime<FixedOffset>>,
}

/// Ephemeral snapshot consumed by availability predicates and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringContext {
    pub selection_count: usize,
    pub active_filter_count: usize,
    /// Canonical `category:option|...` form of the active filters, sorted.
    pub filter_signature: String,
    pub lightbox_open: bool,
    pub active_asset_name: Option<String>,
    /// `None` when the host did not report a library size.
    pub total_assets: Option<usize>,
    pub last_command_id: Option<String>,
    pub search_query: Option<String>,
    pub now: DateTime<FixedOffset>,
}

impl ScoringContext {
    /// Context with no selection, no filters and nothing open.
    pub fn neutral(now: DateTime<FixedOffset>) -> Self {
        Self {
            selection_count: 0,
            active_filter_count: 0,
            filter_signature: String::new(),
            lightbox_open: false,
            active_asset_name: None,
            total_assets: None,
            last_command_id: None,
            search_query: None,
            now,
        }
    }

    pub fn has_selection(&self) -> bool {
        self.selection_count > 0
    }

    pub fn has_filters(&self) -> bool {
        self.active_filter_count > 0
    }

    /// True only when the host reported an empty library.
    pub fn is_empty_library(&self) -> bool {
        self.total_assets == Some(0)
    }

    /// Hour of day (0-23) in the context's own offset.
    pub fn current_hour(&self) -> usize {
        self.now.hour() as usize
    }

    /// Day of week (0 = Sunday) in the context's own offset.
    pub fn current_weekday(&self) -> usize {
        self.now.weekday().num_days_from_sunday() as usize
    }

    /// Fill `last_command_id` from history when the UI did not report one.
    pub fn fill_last_command(mut self, record: &UsageRecord, window: Duration) -> Self {
        if self.last_command_id.is_none() {
            self.last_command_id = record
                .last_command_within(self.now, window)
                .map(str::to_string);
        }
        self
    }
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self::neutral(Local::now().fixed_offset())
    }
}

/// Build a scoring context from a raw UI snapshot.
pub fn build_context(ui: &UiState) -> ScoringContext {
    let selection_count = match ui.selection_count {
        Some(n) => clamp_count(n),
        None => ui.selected_ids.len(),
    };

    let mut chips: Vec<String> = ui
        .active_filters
        .iter()
        .filter(|f| !f.category.trim().is_empty() && !f.option.trim().is_empty())
        .map(|f| format!("{}:{}", f.category.trim(), f.option.trim()))
        .collect();
    chips.sort();
    chips.dedup();

    ScoringContext {
        selection_count,
        active_filter_count: chips.len(),
        filter_signature: chips.join("|"),
        lightbox_open: ui.lightbox_open.unwrap_or(false),
        active_asset_name: non_blank(ui.active_asset_name.as_deref()),
        // Negative totals read as unknown
        total_assets: ui.total_assets.and_then(|n| usize::try_from(n).ok()),
        last_command_id: non_blank(ui.last_command_id.as_deref()),
        search_query: non_blank(ui.search_query.as_deref()),
        now: ui.now.unwrap_or_else(|| Local::now().fixed_offset()),
    }
}

fn clamp_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
