//! Command scoring and ranking.
//!
//! Design principles:
//!
//! - Ranking is a pure function of (catalog, usage record, context, query)
//! - Hard filters first (availability, hidden, search miss), then scoring
//! - Pins always lead, most recently pinned first
//! - Everything else sorts by composite score; ties keep catalog order

use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::command::Command;
use crate::config::PaletteConfig;
use crate::context::ScoringContext;
use crate::search::{match_command, SearchMatch};
use crate::usage::UsageRecord;

// ============================================================================
// Signals
// ============================================================================

/// One input to the composite score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Search,
    Frequency,
    Recency,
    TimeOfDay,
    DayOfWeek,
    CoOccurrence,
    Context,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Frequency => "frequency",
            Self::Recency => "recency",
            Self::TimeOfDay => "time_of_day",
            Self::DayOfWeek => "day_of_week",
            Self::CoOccurrence => "co_occurrence",
            Self::Context => "context",
        }
    }

    pub fn all() -> &'static [Signal] {
        &[
            Self::Search,
            Self::Frequency,
            Self::Recency,
            Self::TimeOfDay,
            Self::DayOfWeek,
            Self::CoOccurrence,
            Self::Context,
        ]
    }
}

/// Weighted contribution of every signal to a command's score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub search: f64,
    pub frequency: f64,
    pub recency: f64,
    pub time_of_day: f64,
    pub day_of_week: f64,
    pub co_occurrence: f64,
    pub context: f64,
}

impl ScoreBreakdown {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Search => self.search,
            Signal::Frequency => self.frequency,
            Signal::Recency => self.recency,
            Signal::TimeOfDay => self.time_of_day,
            Signal::DayOfWeek => self.day_of_week,
            Signal::CoOccurrence => self.co_occurrence,
            Signal::Context => self.context,
        }
    }

    pub fn total(&self) -> f64 {
        Signal::all().iter().map(|s| self.get(*s)).sum()
    }

    /// Non-zero signals, largest contribution first.
    pub fn contributing(&self) -> Vec<Signal> {
        let mut signals: Vec<Signal> = Signal::all()
            .iter()
            .copied()
            .filter(|s| self.get(*s) != 0.0)
            .collect();
        signals.sort_by_key(|s| Reverse(OrderedFloat(self.get(*s))));
        signals
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct ScoredCommand<'a> {
    pub command: &'a Command,
    pub score: f64,
    pub pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchMatch>,
    /// Signals that moved the score, largest first.
    pub signals: Vec<Signal>,
    pub breakdown: ScoreBreakdown,
}

impl<'a> ScoredCommand<'a> {
    pub fn id(&self) -> &'a str {
        &self.command.id
    }

    pub fn category(&self) -> &'a str {
        &self.command.category
    }

    pub fn signal_names(&self) -> Vec<&'static str> {
        self.signals.iter().map(Signal::name).collect()
    }
}

/// Ranked commands sharing a category.
#[derive(Clone, Debug, Serialize)]
pub struct CommandGroup<'a> {
    pub category: &'a str,
    pub commands: Vec<ScoredCommand<'a>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RankOptions {
    /// Keep at most this many results.
    pub limit: Option<usize>,
    /// Drop unpinned commands scoring below this.
    pub min_score: Option<f64>,
}

// ============================================================================
// Ranker
// ============================================================================

/// Scores and orders commands with a fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct Ranker {
    config: PaletteConfig,
}

impl Ranker {
    pub fn new(config: PaletteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaletteConfig {
        &self.config
    }

    pub fn rank<'a>(
        &self,
        commands: &'a [Command],
        record: &UsageRecord,
        ctx: &ScoringContext,
        search_text: Option<&str>,
    ) -> Vec<ScoredCommand<'a>> {
        self.rank_with_options(commands, record, ctx, search_text, &RankOptions::default())
    }

    /// Rank `commands`. When `search_text` is `None` the context's own
    /// search query (if any) is used.
    pub fn rank_with_options<'a>(
        &self,
        commands: &'a [Command],
        record: &UsageRecord,
        ctx: &ScoringContext,
        search_text: Option<&str>,
        options: &RankOptions,
    ) -> Vec<ScoredCommand<'a>> {
        let started = Instant::now();
        let query = search_text
            .or(ctx.search_query.as_deref())
            .map(str::trim)
            .filter(|q| !q.is_empty());
        let max_count = record.max_count();

        let mut seen: HashSet<&str> = HashSet::with_capacity(commands.len());
        let mut pinned: Vec<(usize, ScoredCommand<'a>)> = Vec::new();
        let mut rest: Vec<ScoredCommand<'a>> = Vec::with_capacity(commands.len());

        for command in commands {
            // A repeated id keeps its first catalog entry
            if !seen.insert(command.id.as_str()) {
                continue;
            }
            if !command.is_available(ctx) || record.is_hidden(&command.id) {
                continue;
            }

            let search = match query {
                Some(q) => match match_command(command, q) {
                    Some(m) => Some(m),
                    None => continue,
                },
                None => None,
            };

            let breakdown = self.breakdown(command, record, ctx, search, max_count);
            let pin_rank = record.pin_rank(&command.id);
            let scored = ScoredCommand {
                command,
                score: breakdown.total(),
                pinned: pin_rank.is_some(),
                search,
                signals: breakdown.contributing(),
                breakdown,
            };

            match pin_rank {
                Some(rank) => pinned.push((rank, scored)),
                None => rest.push(scored),
            }
        }

        pinned.sort_by_key(|(rank, _)| *rank);
        // Stable: equal scores keep catalog order
        rest.sort_by_key(|s| Reverse(OrderedFloat(s.score)));
        if let Some(min) = options.min_score {
            rest.retain(|s| s.score >= min);
        }

        let mut ranked: Vec<ScoredCommand<'a>> =
            pinned.into_iter().map(|(_, s)| s).chain(rest).collect();
        if let Some(limit) = options.limit {
            ranked.truncate(limit);
        }

        log::debug!(
            "ranked {} of {} commands (query: {:?}) in {:?}",
            ranked.len(),
            commands.len(),
            query,
            started.elapsed()
        );
        ranked
    }

    /// Weighted signal contributions for one command.
    pub fn breakdown(
        &self,
        command: &Command,
        record: &UsageRecord,
        ctx: &ScoringContext,
        search: Option<SearchMatch>,
        max_count: u64,
    ) -> ScoreBreakdown {
        let w = &self.config.weights;
        let usage = record.usage(&command.id);
        let count = usage.map_or(0, |u| u.count);

        let frequency = if count == 0 || max_count == 0 {
            0.0
        } else {
            ((1.0 + count as f64).ln() / (1.0 + max_count.max(count) as f64).ln()).clamp(0.0, 1.0)
        };

        let recency = usage
            .and_then(|u| u.last_used_at)
            .map_or(0.0, |last| {
                let now = ctx.now.with_timezone(&Utc);
                let age_hours = ((now - last).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
                0.5f64
                    .powf(age_hours / self.config.tuning.recency_half_life_hours)
                    .clamp(0.0, 1.0)
            });

        let patterns_trusted = count >= self.config.tuning.min_usage_for_patterns;
        let (time_of_day, day_of_week) = match usage {
            Some(u) if patterns_trusted => (
                share(u.hour_buckets[ctx.current_hour()], u.hour_total()),
                share(u.day_buckets[ctx.current_weekday()], u.day_total()),
            ),
            _ => (0.0, 0.0),
        };

        let co_occurrence = ctx
            .last_command_id
            .as_deref()
            .filter(|last| *last != command.id)
            .and_then(|last| record.usage(last))
            .map_or(0.0, |last_usage| {
                let together = last_usage.co_occurrence.get(&command.id).copied().unwrap_or(0);
                share(together, last_usage.co_occurrence_total())
            });

        ScoreBreakdown {
            search: w.search * search.map_or(0.0, |m| m.score),
            frequency: w.frequency * frequency,
            recency: w.recency * recency,
            time_of_day: w.time_of_day * time_of_day,
            day_of_week: w.day_of_week * day_of_week,
            co_occurrence: w.co_occurrence * co_occurrence,
            context: w.context * command.affinity.context_signal(ctx),
        }
    }
}

fn share(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64).clamp(0.0, 1.0)
    }
}

// ============================================================================
// Free-function API
// ============================================================================

/// Rank `commands` with the default configuration.
pub fn score_and_rank_commands<'a>(
    commands: &'a [Command],
    record: &UsageRecord,
    ctx: &ScoringContext,
    search_text: Option<&str>,
) -> Vec<ScoredCommand<'a>> {
    Ranker::default().rank(commands, record, ctx, search_text)
}

/// Partition a ranked list by category.
///
/// Groups appear in the order of their best-ranked command; members keep
/// their ranked order.
pub fn group_scored_commands<'a>(scored: &[ScoredCommand<'a>]) -> Vec<CommandGroup<'a>> {
    let mut groups: Vec<CommandGroup<'a>> = Vec::new();
    for item in scored {
        match groups.iter_mut().find(|g| g.category == item.category()) {
            Some(group) => group.commands.push(item.clone()),
            None => groups.push(CommandGroup {
                category: item.category(),
                commands: vec![item.clone()],
            }),
        }
    }
    groups
}

/// First `n` ranked commands, no re-sort.
pub fn get_top_commands<'s, 'a>(scored: &'s [ScoredCommand<'a>], n: usize) -> &'s [ScoredCommand<'a>] {
    &scored[..n.min(scored.len())]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Affinity, Availability};
    use crate::usage::{record_usage, toggle_favorite, toggle_hidden, CommandUsage};
    use chrono::{DateTime, Duration, FixedOffset};

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-03-04T14:30:00-08:00").unwrap()
    }

    fn ctx() -> ScoringContext {
        ScoringContext::neutral(now())
    }

    fn ids<'a>(ranked: &[ScoredCommand<'a>]) -> Vec<&'a str> {
        ranked.iter().map(|s| s.id()).collect()
    }

    fn with_count(record: &mut UsageRecord, id: &str, count: u64) {
        record.commands.insert(
            id.to_string(),
            CommandUsage {
                count,
                ..CommandUsage::default()
            },
        );
    }

    #[test]
    fn empty_catalog_ranks_to_nothing() {
        let ranked = score_and_rank_commands(&[], &UsageRecord::new(), &ctx(), None);
        assert!(ranked.is_empty());
    }

    #[test]
    fn availability_filters_selection_commands() {
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("b", "Bravo", "General").with_availability(Availability::RequiresSelection),
        ];
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &ctx(), None);
        assert_eq!(ids(&ranked), vec!["a"]);
    }

    #[test]
    fn pin_beats_higher_score() {
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("b", "Bravo", "General"),
        ];
        let mut record = UsageRecord::new();
        with_count(&mut record, "a", 50);
        let record = toggle_favorite(&record, "b");

        let ranked = score_and_rank_commands(&catalog, &record, &ctx(), None);
        assert_eq!(ids(&ranked), vec!["b", "a"]);
        assert!(ranked[0].pinned);
        assert!(ranked[0].score < ranked[1].score);
    }

    #[test]
    fn pinned_but_unavailable_is_excluded() {
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("b", "Bravo", "General").with_availability(Availability::RequiresLightbox),
        ];
        let record = toggle_favorite(&UsageRecord::new(), "b");
        let ranked = score_and_rank_commands(&catalog, &record, &ctx(), None);
        assert_eq!(ids(&ranked), vec!["a"]);
    }

    #[test]
    fn most_recent_pin_leads() {
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("b", "Bravo", "General"),
            Command::new("c", "Charlie", "General"),
        ];
        let record = toggle_favorite(&UsageRecord::new(), "a");
        let record = toggle_favorite(&record, "c");
        let ranked = score_and_rank_commands(&catalog, &record, &ctx(), None);
        assert_eq!(ids(&ranked), vec!["c", "a", "b"]);
    }

    #[test]
    fn search_keeps_only_matches() {
        let catalog = vec![
            Command::new("export", "Export", "Export"),
            Command::new("tag", "Tag", "Tagging"),
        ];
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &ctx(), Some("expo"));
        assert_eq!(ids(&ranked), vec!["export"]);
        assert_eq!(ranked[0].signals, vec![Signal::Search]);
    }

    #[test]
    fn search_filters_pins_but_matching_pins_lead() {
        let catalog = vec![
            Command::new("export", "Export", "Export"),
            Command::new("export-zip", "Export zip", "Export"),
            Command::new("tag", "Tag", "Tagging"),
        ];
        let record = toggle_favorite(&UsageRecord::new(), "export-zip");
        let record = toggle_favorite(&record, "tag");

        let ranked = score_and_rank_commands(&catalog, &record, &ctx(), Some("export"));
        assert_eq!(ids(&ranked), vec!["export-zip", "export"]);
        assert!(ranked[0].pinned);
        assert!(ranked[0].score < ranked[1].score);
    }

    #[test]
    fn extreme_counters_rank_without_overflow() {
        let json = format!(
            r#"{{"commandUsage": {{
                "a": {{"count": 3, "timeOfDayPattern": [{max}, 1], "dayOfWeekPattern": [{max}, 1]}},
                "b": {{"count": {max}, "coOccurrence": {{"a": {max}, "c": {max}}}}}
            }}}}"#,
            max = u64::MAX
        );
        let record = UsageRecord::from_json(&json);
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("b", "Bravo", "General"),
        ];
        let mut c = ctx();
        c.last_command_id = Some("b".into());

        let ranked = score_and_rank_commands(&catalog, &record, &c, None);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|s| s.score.is_finite()));
    }

    #[test]
    fn search_falls_back_to_context_query() {
        let catalog = vec![
            Command::new("export", "Export", "Export"),
            Command::new("tag", "Tag", "Tagging"),
        ];
        let mut c = ctx();
        c.search_query = Some("tag".into());
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &c, None);
        assert_eq!(ids(&ranked), vec!["tag"]);
    }

    #[test]
    fn better_match_ranks_first() {
        let catalog = vec![
            Command::new("download", "Download originals", "Export").with_keywords("export"),
            Command::new("export", "Export metadata", "Export"),
        ];
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &ctx(), Some("export"));
        assert_eq!(ids(&ranked), vec!["export", "download"]);
    }

    #[test]
    fn frequency_orders_then_hidden_removes() {
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("b", "Bravo", "General"),
        ];
        let mut record = UsageRecord::new();
        with_count(&mut record, "a", 100);
        with_count(&mut record, "b", 1);

        let ranked = score_and_rank_commands(&catalog, &record, &ctx(), None);
        assert_eq!(ids(&ranked), vec!["a", "b"]);

        let record = toggle_hidden(&record, "a");
        let ranked = score_and_rank_commands(&catalog, &record, &ctx(), None);
        assert_eq!(ids(&ranked), vec!["b"]);
    }

    #[test]
    fn frequency_is_log_scaled() {
        let ranker = Ranker::default();
        let cmd = Command::new("a", "Alpha", "General");
        let mut record = UsageRecord::new();
        with_count(&mut record, "a", 10);
        with_count(&mut record, "z", 100);
        let b = ranker.breakdown(&cmd, &record, &ctx(), None, record.max_count());
        // ln(11)/ln(101) ~= 0.52, well above the linear 0.1
        assert!(b.frequency > 50.0 && b.frequency < 55.0, "got {}", b.frequency);
    }

    #[test]
    fn ties_keep_catalog_order() {
        let catalog = vec![
            Command::new("z", "Zulu", "General"),
            Command::new("m", "Mike", "General"),
            Command::new("a", "Alpha", "General"),
        ];
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &ctx(), None);
        assert_eq!(ids(&ranked), vec!["z", "m", "a"]);
    }

    #[test]
    fn recency_decays_by_half_life() {
        let ranker = Ranker::default();
        let cmd = Command::new("a", "Alpha", "General");
        let week_ago = now() - Duration::days(7);
        let record = record_usage(&UsageRecord::new(), "a", week_ago);
        let b = ranker.breakdown(&cmd, &record, &ctx(), None, record.max_count());
        assert!((b.recency - 25.0).abs() < 1e-6, "got {}", b.recency);

        let fresh = record_usage(&UsageRecord::new(), "a", now());
        let b = ranker.breakdown(&cmd, &fresh, &ctx(), None, fresh.max_count());
        assert!((b.recency - 50.0).abs() < 1e-6);
    }

    #[test]
    fn future_timestamps_do_not_exceed_full_recency() {
        let ranker = Ranker::default();
        let cmd = Command::new("a", "Alpha", "General");
        let record = record_usage(&UsageRecord::new(), "a", now() + Duration::days(3));
        let b = ranker.breakdown(&cmd, &record, &ctx(), None, record.max_count());
        assert!((b.recency - 50.0).abs() < 1e-6);
    }

    #[test]
    fn temporal_patterns_need_minimum_usage() {
        let ranker = Ranker::default();
        let cmd = Command::new("a", "Alpha", "General");

        let two = record_usage(&UsageRecord::new(), "a", now() - Duration::days(7));
        let two = record_usage(&two, "a", now() - Duration::days(14));
        let b = ranker.breakdown(&cmd, &two, &ctx(), None, two.max_count());
        assert_eq!(b.time_of_day, 0.0);
        assert_eq!(b.day_of_week, 0.0);

        let three = record_usage(&two, "a", now() - Duration::days(21));
        let b = ranker.breakdown(&cmd, &three, &ctx(), None, three.max_count());
        // Always 14:xx on a Wednesday
        assert!((b.time_of_day - 30.0).abs() < 1e-6);
        assert!((b.day_of_week - 20.0).abs() < 1e-6);
    }

    #[test]
    fn co_occurrence_follows_last_command() {
        let catalog = vec![
            Command::new("filter", "Filter by team", "Filtering"),
            Command::new("tag", "Add tag", "Tagging"),
        ];
        let base = now() - Duration::days(30);
        let record = record_usage(&UsageRecord::new(), "select-all", base);
        let record = record_usage(&record, "tag", base + Duration::minutes(1));

        let mut c = ctx();
        c.last_command_id = Some("select-all".into());
        let ranked = score_and_rank_commands(&catalog, &record, &c, None);
        assert_eq!(ids(&ranked), vec!["tag", "filter"]);
        assert!(ranked[0].signals.contains(&Signal::CoOccurrence));
        assert!((ranked[0].breakdown.co_occurrence - 50.0).abs() < 1e-6);
    }

    #[test]
    fn context_affinity_boosts_and_penalizes() {
        let catalog = vec![
            Command::new("filter", "Filter by team", "Filtering").with_affinity(Affinity::Browsing),
            Command::new("tag", "Add tag", "Tagging").with_affinity(Affinity::Selection),
        ];
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &ctx(), None);
        assert_eq!(ids(&ranked), vec!["filter", "tag"]);
        assert!(ranked[1].score < 0.0);

        let mut selecting = ctx();
        selecting.selection_count = 4;
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &selecting, None);
        assert_eq!(ids(&ranked), vec!["tag", "filter"]);
    }

    #[test]
    fn contributing_signals_are_ordered() {
        let b = ScoreBreakdown {
            frequency: 10.0,
            recency: 40.0,
            context: -5.0,
            ..ScoreBreakdown::default()
        };
        assert_eq!(
            b.contributing(),
            vec![Signal::Recency, Signal::Frequency, Signal::Context]
        );
        assert!((b.total() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn options_limit_and_min_score() {
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("b", "Bravo", "General"),
            Command::new("c", "Charlie", "General"),
        ];
        let mut record = UsageRecord::new();
        with_count(&mut record, "a", 5);
        let record = toggle_favorite(&record, "c");

        let ranker = Ranker::default();
        let opts = RankOptions {
            limit: None,
            min_score: Some(1.0),
        };
        let ranked = ranker.rank_with_options(&catalog, &record, &ctx(), None, &opts);
        // b scores 0 and is dropped; pinned c survives despite scoring 0
        assert_eq!(ids(&ranked), vec!["c", "a"]);

        let opts = RankOptions {
            limit: Some(1),
            min_score: None,
        };
        let ranked = ranker.rank_with_options(&catalog, &record, &ctx(), None, &opts);
        assert_eq!(ids(&ranked), vec!["c"]);
    }

    #[test]
    fn duplicate_ids_keep_first_entry() {
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("a", "Alpha again", "Other"),
        ];
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &ctx(), None);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].command.label, "Alpha");
    }

    #[test]
    fn grouping_preserves_rank_order() {
        let catalog = vec![
            Command::new("t1", "Tag one", "Tagging"),
            Command::new("e1", "Export one", "Export"),
            Command::new("t2", "Tag two", "Tagging"),
        ];
        let mut record = UsageRecord::new();
        with_count(&mut record, "e1", 9);
        with_count(&mut record, "t2", 3);
        let ranked = score_and_rank_commands(&catalog, &record, &ctx(), None);
        assert_eq!(ids(&ranked), vec!["e1", "t2", "t1"]);

        let groups = group_scored_commands(&ranked);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "Export");
        assert_eq!(groups[1].category, "Tagging");
        assert_eq!(ids(&groups[1].commands), vec!["t2", "t1"]);
    }

    #[test]
    fn top_commands_truncates() {
        let catalog = vec![
            Command::new("a", "Alpha", "General"),
            Command::new("b", "Bravo", "General"),
        ];
        let ranked = score_and_rank_commands(&catalog, &UsageRecord::new(), &ctx(), None);
        assert_eq!(ids(get_top_commands(&ranked, 1)), vec!["a"]);
        assert_eq!(get_top_commands(&ranked, 10).len(), 2);
        assert!(get_top_commands(&ranked, 0).is_empty());
    }
}
