//! Built-in DAM command catalog.
//!
//! Stable ids matter: usage records, pins and hides key on them. Never
//! rename an id; add a new command instead.

use crate::command::{Affinity, Availability, Command};

use crate::command::Affinity as Af;
use crate::command::Availability as Av;

// (id, label, category, keywords, availability, affinity)
type Entry = (&'static str, &'static str, &'static str, &'static str, Availability, Affinity);

#[rustfmt::skip]
const ENTRIES: &[Entry] = &[
    // Quick actions
    ("search-filename", "Search by filename", "Quick Actions", "find name file", Av::RequiresAssets, Af::Browsing),
    ("search-caption", "Search by caption", "Quick Actions", "find text caption", Av::RequiresAssets, Af::Browsing),
    ("undo", "Undo last action", "Quick Actions", "revert back", Av::Always, Af::Neutral),
    ("redo", "Redo last action", "Quick Actions", "repeat again", Av::Always, Af::Neutral),

    // Selection
    ("selection-all", "Select all assets", "Selection", "everything grid", Av::RequiresAssets, Af::Browsing),
    ("selection-clear", "Clear selection", "Selection", "deselect none", Av::RequiresSelection, Af::Selection),
    ("selection-apply", "Apply pending changes to selection", "Selection", "save commit", Av::RequiresSelection, Af::Selection),
    ("selection-delete", "Delete selected assets", "Selection", "remove trash", Av::RequiresSelection, Af::Selection),
    ("select-invert", "Invert selection", "Smart Selection", "flip toggle", Av::RequiresAssets, Af::Browsing),
    ("select-untagged", "Select untagged assets", "Smart Selection", "missing tags", Av::RequiresAssets, Af::Browsing),
    ("select-unassigned", "Select assets without team member", "Smart Selection", "artist missing", Av::RequiresAssets, Af::Browsing),
    ("select-similar", "Select similar assets", "Smart Selection", "match like", Av::RequiresSelection, Af::Selection),

    // Tagging and team
    ("tag-add", "Add tag to selected", "Tagging", "label categorize lash", Av::RequiresSelection, Af::Selection),
    ("tag-remove", "Remove tag from selected", "Tagging", "untag label", Av::RequiresSelection, Af::Selection),
    ("team-assign", "Assign team member", "Team", "artist stylist", Av::RequiresSelection, Af::Selection),
    ("team-unassign", "Remove team member", "Team", "artist stylist clear", Av::RequiresSelection, Af::Selection),

    // Metadata
    ("edit-caption", "Edit caption for selected", "Metadata", "text description", Av::RequiresSelection, Af::Selection),
    ("edit-alttext", "Edit alt text for selected", "Metadata", "accessibility alt", Av::RequiresSelection, Af::Selection),
    ("clear-caption", "Clear captions from selected", "Metadata", "remove text", Av::RequiresSelection, Af::Selection),

    // Filtering
    ("filter-team", "Filter by team member", "Filtering", "artist show only", Av::RequiresAssets, Af::Browsing),
    ("filter-tag", "Filter by tag", "Filtering", "label show only", Av::RequiresAssets, Af::Browsing),
    ("filter-today", "Filter uploaded today", "Advanced Filtering", "recent date new", Av::RequiresAssets, Af::Browsing),
    ("filter-this-week", "Filter uploaded this week", "Advanced Filtering", "recent date", Av::RequiresAssets, Af::Browsing),
    ("filter-this-month", "Filter uploaded this month", "Advanced Filtering", "recent date", Av::RequiresAssets, Af::Browsing),
    ("filters-clear", "Clear all filters", "Filtering", "reset remove show all", Av::RequiresFilters, Af::Filtering),

    // Organization
    ("group-by-team", "Group by team member", "Organization", "cluster artist", Av::RequiresAssets, Af::Organizing),
    ("group-by-tag", "Group by tag", "Organization", "cluster label", Av::RequiresAssets, Af::Organizing),
    ("sort-date-desc", "Sort newest first", "Organization", "order recent date", Av::RequiresAssets, Af::Organizing),
    ("sort-date-asc", "Sort oldest first", "Organization", "order date", Av::RequiresAssets, Af::Organizing),
    ("sort-filename-asc", "Sort by filename (A-Z)", "Organization", "order alphabetical name", Av::RequiresAssets, Af::Organizing),
    ("sort-filesize-desc", "Sort largest files first", "Organization", "order size", Av::RequiresAssets, Af::Organizing),

    // Lightbox
    ("single-tag", "Tag this asset", "Current Asset", "label lightbox", Av::RequiresLightbox, Af::Lightbox),
    ("single-select", "Add this asset to selection", "Current Asset", "pick lightbox", Av::RequiresLightbox, Af::Lightbox),
    ("single-unselect", "Remove this asset from selection", "Current Asset", "deselect lightbox", Av::RequiresLightbox, Af::Lightbox),
    ("single-download", "Download this asset", "Current Asset", "save original", Av::RequiresLightbox, Af::Lightbox),
    ("lightbox-close", "Close lightbox", "Current Asset", "exit back grid", Av::RequiresLightbox, Af::Lightbox),

    // Export
    ("download-selected", "Download selected as ZIP", "Export & Download", "export archive save", Av::RequiresSelection, Af::Selection),
    ("export-metadata", "Export metadata as CSV", "Export & Download", "spreadsheet csv", Av::RequiresSelection, Af::Selection),
    ("download-all", "Download all as ZIP", "Export & Download", "export archive everything", Av::RequiresAssets, Af::Neutral),

    // Getting started
    ("upload-assets", "Upload assets", "Getting Started", "add import photos", Av::RequiresBrowsing, Af::EmptyLibrary),
    ("import-folder", "Import folder", "Getting Started", "add upload bulk", Av::RequiresBrowsing, Af::EmptyLibrary),
    ("help-shortcuts", "Show keyboard shortcuts", "Help", "keys hotkeys tutorial", Av::Always, Af::EmptyLibrary),

    // Workspaces
    ("save-workspace", "Save current view as workspace", "Workspaces", "preset bookmark view", Av::RequiresFilters, Af::Organizing),
];

/// Every built-in DAM command, in display order.
pub fn dam_commands() -> Vec<Command> {
    ENTRIES
        .iter()
        .map(|(id, label, category, keywords, availability, affinity)| {
            Command::new(*id, *label, *category)
                .with_keywords(keywords)
                .with_availability(*availability)
                .with_affinity(*affinity)
        })
        .collect()
}

/// Look up a built-in command by id.
pub fn find(id: &str) -> Option<Command> {
    dam_commands().into_iter().find(|c| c.id == id)
}
