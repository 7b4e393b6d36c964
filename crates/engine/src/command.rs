//! Command descriptors supplied by the palette host.
//!
//! A command is static data: id, label, category, search keywords, a hard
//! availability predicate and a soft context affinity. Predicates are enums
//! rather than closures so catalogs stay serializable and every case is
//! checked exhaustively.

use serde::{Deserialize, Serialize};

use crate::context::ScoringContext;

/// Hard availability predicate. A command whose predicate fails is never
/// shown, pinned or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Always,
    /// At least one asset selected.
    RequiresSelection,
    /// Two or more assets selected.
    RequiresMultiSelection,
    /// Lightbox / detail view open.
    RequiresLightbox,
    /// Grid view, lightbox closed.
    RequiresBrowsing,
    /// At least one filter active.
    RequiresFilters,
    /// Library is not known to be empty.
    RequiresAssets,
}

impl Availability {
    pub fn is_available(&self, ctx: &ScoringContext) -> bool {
        match self {
            Self::Always => true,
            Self::RequiresSelection => ctx.selection_count >= 1,
            Self::RequiresMultiSelection => ctx.selection_count >= 2,
            Self::RequiresLightbox => ctx.lightbox_open,
            Self::RequiresBrowsing => !ctx.lightbox_open,
            Self::RequiresFilters => ctx.has_filters(),
            Self::RequiresAssets => !ctx.is_empty_library(),
        }
    }
}

/// Soft relevance of a command to the current UI situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
    #[default]
    Neutral,
    /// Bulk actions on a selection (tagging, export, team assignment).
    Selection,
    /// Narrowing the grid (filters, select all).
    Browsing,
    /// Single-asset actions while the lightbox is open.
    Lightbox,
    /// Clearing or toggling active filters.
    Filtering,
    /// Upload / import / help when the library is empty.
    EmptyLibrary,
    /// Grouping and collections, most useful when many filters are active.
    Organizing,
}

impl Affinity {
    /// Context relevance in `[-1, 1]`. Neutral commands always score 0.
    pub fn context_signal(&self, ctx: &ScoringContext) -> f64 {
        let empty = ctx.is_empty_library();
        let raw: f64 = match self {
            Self::Neutral => 0.0,
            Self::Selection => {
                if empty {
                    -0.5
                } else if ctx.has_selection() {
                    1.0
                } else if !ctx.lightbox_open {
                    -0.5
                } else {
                    0.0
                }
            }
            Self::Browsing => {
                if empty {
                    -0.5
                } else if ctx.has_selection() {
                    -0.3
                } else if ctx.lightbox_open {
                    0.0
                } else {
                    0.6
                }
            }
            Self::Lightbox => {
                if ctx.lightbox_open {
                    0.9
                } else {
                    0.0
                }
            }
            Self::Filtering => {
                if ctx.has_filters() {
                    0.75
                } else {
                    0.0
                }
            }
            Self::EmptyLibrary => {
                if empty {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Organizing => {
                if ctx.active_filter_count >= 3 {
                    0.5
                } else if !ctx.has_selection() && !ctx.lightbox_open {
                    0.4
                } else {
                    0.0
                }
            }
        };
        raw.clamp(-1.0, 1.0)
    }
}

/// A palette command. Catalogs are immutable once handed to the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    pub label: String,
    /// Group the command renders under.
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub affinity: Affinity,
}

impl Command {
    /// Create an always-available, context-neutral command.
    pub fn new(id: impl Into<String>, label: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category: category.into(),
            keywords: Vec::new(),
            description: None,
            availability: Availability::Always,
            affinity: Affinity::Neutral,
        }
    }

    /// Builder: set search keywords (whitespace separated)
    pub fn with_keywords(mut self, keywords: &str) -> Self {
        self.keywords = keywords.split_whitespace().map(str::to_string).collect();
        self
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: set availability predicate
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Builder: set context affinity
    pub fn with_affinity(mut self, affinity: Affinity) -> Self {
        self.affinity = affinity;
        self
    }

    pub fn is_available(&self, ctx: &ScoringContext) -> bool {
        self.availability.is_available(ctx)
    }
}
