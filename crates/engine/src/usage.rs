//! Usage tracker: per-user invocation history, pins and hidden commands.
//!
//! Every update is a pure function from one `UsageRecord` value to the next;
//! nothing here performs I/O. Callers persist the returned record however
//! they like (see `lashpop-palette-config`). Malformed input is treated as an
//! empty record so tracking can never break the palette.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::SessionConfig;

pub const HOURS_PER_DAY: usize = 24;
pub const DAYS_PER_WEEK: usize = 7;

// ============================================================================
// Record types
// ============================================================================

/// Invocation history for a single command.
///
/// Serialized in the settings document's `commandUsage` entry shape: buckets
/// are `{"hour": count}` maps and keys this type does not model (such as
/// `avgTimeToSelect`) are carried in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandUsage {
    pub count: u64,
    #[serde(rename = "lastUsed", alias = "lastUsedAt")]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Invocations per hour of day, local to the invocation's offset.
    #[serde(
        rename = "timeOfDayPattern",
        alias = "hourBuckets",
        serialize_with = "buckets::serialize",
        deserialize_with = "buckets::deserialize"
    )]
    pub hour_buckets: [u64; HOURS_PER_DAY],
    /// Invocations per weekday, 0 = Sunday.
    #[serde(
        rename = "dayOfWeekPattern",
        alias = "dayBuckets",
        serialize_with = "buckets::serialize",
        deserialize_with = "buckets::deserialize"
    )]
    pub day_buckets: [u64; DAYS_PER_WEEK],
    /// Other command id -> times both ran inside one session window.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub co_occurrence: BTreeMap<String, u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandUsage {
    pub fn hour_total(&self) -> u64 {
        self.hour_buckets.iter().copied().fold(0, u64::saturating_add)
    }

    pub fn day_total(&self) -> u64 {
        self.day_buckets.iter().copied().fold(0, u64::saturating_add)
    }

    /// Sum of all pair counts.
    pub fn co_occurrence_total(&self) -> u64 {
        self.co_occurrence.values().copied().fold(0, u64::saturating_add)
    }
}

/// A user's command palette history. Created lazily on first invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UsageRecord {
    #[serde(rename = "commandUsage", alias = "commands")]
    pub commands: BTreeMap<String, CommandUsage>,
    /// Pinned command ids, oldest pin first.
    #[serde(rename = "favorites", alias = "pinned")]
    pub pinned: Vec<String>,
    pub hidden: Vec<String>,
}

impl UsageRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted record. Anything unparseable yields an empty record.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<UsageRecord>(json) {
            Ok(record) => record.normalized(),
            Err(e) => {
                log::warn!("discarding malformed usage record: {e}");
                Self::default()
            }
        }
    }

    /// Like `from_json`, for a value already pulled out of a settings blob.
    pub fn from_value(value: serde_json::Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        match serde_json::from_value::<UsageRecord>(value) {
            Ok(record) => record.normalized(),
            Err(e) => {
                log::warn!("discarding malformed usage record: {e}");
                Self::default()
            }
        }
    }

    /// Repair structural problems: blank ids, duplicate list entries and
    /// commands that are both pinned and hidden (the pin wins).
    pub fn normalized(&self) -> Self {
        let mut pinned: Vec<String> = Vec::with_capacity(self.pinned.len());
        for id in &self.pinned {
            if !id.trim().is_empty() && !pinned.contains(id) {
                pinned.push(id.clone());
            }
        }

        let mut hidden: Vec<String> = Vec::with_capacity(self.hidden.len());
        for id in &self.hidden {
            if !id.trim().is_empty() && !hidden.contains(id) && !pinned.contains(id) {
                hidden.push(id.clone());
            }
        }

        let commands = self
            .commands
            .iter()
            .filter(|(id, _)| !id.trim().is_empty())
            .map(|(id, usage)| (id.clone(), usage.clone()))
            .collect();

        Self {
            commands,
            pinned,
            hidden,
        }
    }

    pub fn usage(&self, command_id: &str) -> Option<&CommandUsage> {
        self.commands.get(command_id)
    }

    pub fn count(&self, command_id: &str) -> u64 {
        self.usage(command_id).map_or(0, |u| u.count)
    }

    pub fn is_pinned(&self, command_id: &str) -> bool {
        self.pinned.iter().any(|id| id == command_id)
    }

    pub fn is_hidden(&self, command_id: &str) -> bool {
        self.hidden.iter().any(|id| id == command_id)
    }

    /// Position of a pin, 0 = most recently pinned.
    pub fn pin_rank(&self, command_id: &str) -> Option<usize> {
        self.pinned
            .iter()
            .rev()
            .position(|id| id == command_id)
    }

    pub fn total_executions(&self) -> u64 {
        self.commands.values().map(|u| u.count).fold(0, u64::saturating_add)
    }

    /// Highest invocation count across all commands (0 when empty).
    pub fn max_count(&self) -> u64 {
        self.commands.values().map(|u| u.count).max().unwrap_or(0)
    }

    /// Most recently invoked command, if it ran within `window` before `now`.
    pub fn last_command_within(&self, now: DateTime<FixedOffset>, window: Duration) -> Option<&str> {
        let now = now.with_timezone(&Utc);
        self.commands
            .iter()
            .filter_map(|(id, usage)| usage.last_used_at.map(|at| (id, at)))
            .filter(|(_, at)| within(now, *at, window))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(id, _)| id.as_str())
    }
}

fn within(now: DateTime<Utc>, earlier: DateTime<Utc>, window: Duration) -> bool {
    let gap = now - earlier;
    gap >= Duration::zero() && gap <= window
}

// ============================================================================
// Tracker
// ============================================================================

/// Records invocations. Holds only the co-occurrence session window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tracker {
    session_window: Duration,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl Tracker {
    pub fn new(session: &SessionConfig) -> Self {
        Self::with_window(session.window())
    }

    pub fn with_window(session_window: Duration) -> Self {
        Self { session_window }
    }

    pub fn session_window(&self) -> Duration {
        self.session_window
    }

    /// Record one invocation of `command_id` at `at`.
    ///
    /// Increments the count and the hour/weekday buckets, advances
    /// `lastUsedAt`, and bumps the pair count (both directions) for every
    /// other command last used within the session window before `at`.
    pub fn record_usage(
        &self,
        record: &UsageRecord,
        command_id: &str,
        at: DateTime<FixedOffset>,
    ) -> UsageRecord {
        if command_id.trim().is_empty() {
            log::debug!("ignoring usage for blank command id");
            return record.clone();
        }

        let mut next = record.clone();
        let at_utc = at.with_timezone(&Utc);

        let partners: Vec<String> = next
            .commands
            .iter()
            .filter(|(other, _)| other.as_str() != command_id)
            .filter(|(_, usage)| {
                usage
                    .last_used_at
                    .is_some_and(|last| within(at_utc, last, self.session_window))
            })
            .map(|(other, _)| other.clone())
            .collect();

        let hour = at.hour() as usize;
        let day = at.weekday().num_days_from_sunday() as usize;

        let entry = next.commands.entry(command_id.to_string()).or_default();
        entry.count = entry.count.saturating_add(1);
        entry.hour_buckets[hour] = entry.hour_buckets[hour].saturating_add(1);
        entry.day_buckets[day] = entry.day_buckets[day].saturating_add(1);
        entry.last_used_at = match entry.last_used_at {
            Some(prev) if prev > at_utc => Some(prev),
            _ => Some(at_utc),
        };
        for partner in &partners {
            let n = entry.co_occurrence.entry(partner.clone()).or_insert(0);
            *n = n.saturating_add(1);
        }

        for partner in partners {
            if let Some(usage) = next.commands.get_mut(&partner) {
                let n = usage.co_occurrence.entry(command_id.to_string()).or_insert(0);
                *n = n.saturating_add(1);
            }
        }

        next
    }
}

// ============================================================================
// Free-function API (default tracker)
// ============================================================================

pub fn record_usage(record: &UsageRecord, command_id: &str, at: DateTime<FixedOffset>) -> UsageRecord {
    Tracker::default().record_usage(record, command_id, at)
}

/// Pin `command_id`, or unpin it if already pinned. Pinning unhides.
pub fn toggle_favorite(record: &UsageRecord, command_id: &str) -> UsageRecord {
    if record.is_pinned(command_id) {
        remove_favorite(record, command_id)
    } else {
        add_favorite(record, command_id)
    }
}

/// Hide `command_id`, or unhide it if already hidden. Hiding unpins.
pub fn toggle_hidden(record: &UsageRecord, command_id: &str) -> UsageRecord {
    if record.is_hidden(command_id) {
        unhide_command(record, command_id)
    } else {
        hide_command(record, command_id)
    }
}

pub fn add_favorite(record: &UsageRecord, command_id: &str) -> UsageRecord {
    let mut next = record.clone();
    if command_id.trim().is_empty() || next.is_pinned(command_id) {
        return next;
    }
    next.hidden.retain(|id| id != command_id);
    next.pinned.push(command_id.to_string());
    next
}

pub fn remove_favorite(record: &UsageRecord, command_id: &str) -> UsageRecord {
    let mut next = record.clone();
    next.pinned.retain(|id| id != command_id);
    next
}

pub fn hide_command(record: &UsageRecord, command_id: &str) -> UsageRecord {
    let mut next = record.clone();
    if command_id.trim().is_empty() || next.is_hidden(command_id) {
        return next;
    }
    next.pinned.retain(|id| id != command_id);
    next.hidden.push(command_id.to_string());
    next
}

pub fn unhide_command(record: &UsageRecord, command_id: &str) -> UsageRecord {
    let mut next = record.clone();
    next.hidden.retain(|id| id != command_id);
    next
}

/// Forget all invocation history. Pins and hidden commands survive.
pub fn reset_usage(record: &UsageRecord) -> UsageRecord {
    UsageRecord {
        commands: BTreeMap::new(),
        pinned: record.pinned.clone(),
        hidden: record.hidden.clone(),
    }
}

// ============================================================================
// Bucket (de)serialization
// ============================================================================

mod buckets {
    use std::collections::BTreeMap;

    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Buckets are stored as `{"14": 3}` maps holding the non-zero slots.
    /// Fixed-length arrays are accepted too; out-of-range slots are dropped.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBuckets {
        Slots(Vec<u64>),
        Keyed(BTreeMap<String, u64>),
    }

    pub fn serialize<S, const N: usize>(buckets: &[u64; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let used = buckets.iter().filter(|n| **n > 0).count();
        let mut map = serializer.serialize_map(Some(used))?;
        for (idx, n) in buckets.iter().enumerate().filter(|(_, n)| **n > 0) {
            map.serialize_entry(&idx.to_string(), n)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u64; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut out = [0u64; N];
        match Option::<RawBuckets>::deserialize(deserializer)? {
            Some(RawBuckets::Slots(slots)) => {
                for (slot, value) in out.iter_mut().zip(slots) {
                    *slot = value;
                }
            }
            Some(RawBuckets::Keyed(map)) => {
                for (key, value) in map {
                    if let Ok(idx) = key.trim().parse::<usize>() {
                        if idx < N {
                            out[idx] = value;
                        }
                    }
                }
            }
            None => {}
        }
        Ok(out)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn first_usage_creates_entry() {
        let record = UsageRecord::new();
        let next = record_usage(&record, "export-zip", at("2026-03-04T14:30:00-08:00"));

        let usage = next.usage("export-zip").unwrap();
        assert_eq!(usage.count, 1);
        assert_eq!(usage.hour_buckets[14], 1);
        assert_eq!(usage.day_buckets[3], 1); // Wednesday
        assert_eq!(usage.hour_total(), 1);
        assert_eq!(usage.day_total(), 1);
        assert_eq!(
            usage.last_used_at.unwrap().to_rfc3339(),
            "2026-03-04T22:30:00+00:00"
        );
        // Input untouched
        assert!(record.commands.is_empty());
    }

    #[test]
    fn last_used_never_moves_backwards() {
        let r = record_usage(&UsageRecord::new(), "tag", at("2026-03-04T12:00:00+00:00"));
        let r = record_usage(&r, "tag", at("2026-03-01T12:00:00+00:00"));
        let usage = r.usage("tag").unwrap();
        assert_eq!(usage.count, 2);
        assert_eq!(
            usage.last_used_at.unwrap().to_rfc3339(),
            "2026-03-04T12:00:00+00:00"
        );
        assert_eq!(usage.day_total(), 2);
    }

    #[test]
    fn co_occurrence_within_window_is_symmetric() {
        let r = record_usage(&UsageRecord::new(), "select-all", at("2026-03-04T10:00:00+00:00"));
        let r = record_usage(&r, "tag-add", at("2026-03-04T10:02:00+00:00"));

        assert_eq!(r.usage("tag-add").unwrap().co_occurrence.get("select-all"), Some(&1));
        assert_eq!(r.usage("select-all").unwrap().co_occurrence.get("tag-add"), Some(&1));
    }

    #[test]
    fn co_occurrence_ignores_stale_commands() {
        let r = record_usage(&UsageRecord::new(), "select-all", at("2026-03-04T10:00:00+00:00"));
        let r = record_usage(&r, "tag-add", at("2026-03-04T10:30:00+00:00"));

        assert!(r.usage("tag-add").unwrap().co_occurrence.is_empty());
        assert!(r.usage("select-all").unwrap().co_occurrence.is_empty());
    }

    #[test]
    fn custom_window_widens_sessions() {
        let tracker = Tracker::with_window(Duration::hours(1));
        let r = tracker.record_usage(&UsageRecord::new(), "a", at("2026-03-04T10:00:00+00:00"));
        let r = tracker.record_usage(&r, "b", at("2026-03-04T10:30:00+00:00"));
        assert_eq!(r.usage("b").unwrap().co_occurrence.get("a"), Some(&1));
    }

    #[test]
    fn repeat_invocation_does_not_pair_with_itself() {
        let r = record_usage(&UsageRecord::new(), "a", at("2026-03-04T10:00:00+00:00"));
        let r = record_usage(&r, "a", at("2026-03-04T10:01:00+00:00"));
        assert!(r.usage("a").unwrap().co_occurrence.is_empty());
    }

    #[test]
    fn blank_command_id_is_ignored() {
        let r = record_usage(&UsageRecord::new(), "  ", at("2026-03-04T10:00:00+00:00"));
        assert_eq!(r, UsageRecord::new());
    }

    #[test]
    fn toggle_favorite_unhides() {
        let r = toggle_hidden(&UsageRecord::new(), "delete");
        assert!(r.is_hidden("delete"));

        let r = toggle_favorite(&r, "delete");
        assert!(r.is_pinned("delete"));
        assert!(!r.is_hidden("delete"));

        let r = toggle_favorite(&r, "delete");
        assert!(!r.is_pinned("delete"));
    }

    #[test]
    fn toggle_hidden_unpins() {
        let r = toggle_favorite(&UsageRecord::new(), "export");
        let r = toggle_hidden(&r, "export");
        assert!(r.is_hidden("export"));
        assert!(!r.is_pinned("export"));

        let r = toggle_hidden(&r, "export");
        assert!(!r.is_hidden("export"));
    }

    #[test]
    fn pin_rank_puts_latest_first() {
        let r = add_favorite(&UsageRecord::new(), "a");
        let r = add_favorite(&r, "b");
        let r = add_favorite(&r, "a"); // already pinned, no reorder
        assert_eq!(r.pin_rank("b"), Some(0));
        assert_eq!(r.pin_rank("a"), Some(1));
        assert_eq!(r.pin_rank("c"), None);
    }

    #[test]
    fn reset_usage_keeps_preferences() {
        let r = record_usage(&UsageRecord::new(), "a", at("2026-03-04T10:00:00+00:00"));
        let r = add_favorite(&r, "a");
        let r = hide_command(&r, "b");
        let r = reset_usage(&r);
        assert!(r.commands.is_empty());
        assert!(r.is_pinned("a"));
        assert!(r.is_hidden("b"));
    }

    #[test]
    fn malformed_json_yields_empty_record() {
        assert_eq!(UsageRecord::from_json("{not json"), UsageRecord::new());
        assert_eq!(UsageRecord::from_json(r#"{"favorites": 42}"#), UsageRecord::new());
        assert_eq!(UsageRecord::from_value(serde_json::Value::Null), UsageRecord::new());
    }

    #[test]
    fn round_trips_through_json() {
        let r = record_usage(&UsageRecord::new(), "a", at("2026-03-04T10:00:00+00:00"));
        let r = record_usage(&r, "b", at("2026-03-04T10:01:00+00:00"));
        let r = add_favorite(&r, "b");
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"timeOfDayPattern\":{\"10\":1}"));
        assert!(json.contains("\"lastUsed\""));
        assert!(json.contains("\"favorites\":[\"b\"]"));
        assert_eq!(UsageRecord::from_json(&json), r);
    }

    #[test]
    fn legacy_settings_shape_is_understood() {
        let legacy = r#"{
            "favorites": ["select-all"],
            "hidden": [],
            "commandUsage": {
                "export-zip": {
                    "count": 4,
                    "lastUsed": "2026-02-10T09:00:00.000Z",
                    "avgTimeToSelect": 0,
                    "timeOfDayPattern": {"9": 3, "17": 1, "99": 5},
                    "dayOfWeekPattern": {"2": 4}
                }
            },
            "commandPairs": {}
        }"#;
        let r = UsageRecord::from_json(legacy);
        assert!(r.is_pinned("select-all"));
        let usage = r.usage("export-zip").unwrap();
        assert_eq!(usage.count, 4);
        assert_eq!(usage.hour_buckets[9], 3);
        assert_eq!(usage.hour_buckets[17], 1);
        assert_eq!(usage.hour_total(), 4);
        assert_eq!(usage.day_buckets[2], 4);
    }

    #[test]
    fn counters_saturate_instead_of_overflowing() {
        let json = format!(
            r#"{{"commandUsage": {{
                "a": {{"count": 3, "timeOfDayPattern": [{max}, 1], "dayOfWeekPattern": [{max}, {max}],
                       "coOccurrence": {{"b": {max}}}}},
                "b": {{"count": {max}, "lastUsed": "2026-03-04T10:00:00Z", "coOccurrence": {{"a": {max}}}}}
            }}}}"#,
            max = u64::MAX
        );
        let r = UsageRecord::from_json(&json);
        let a = r.usage("a").unwrap();
        assert_eq!(a.hour_total(), u64::MAX);
        assert_eq!(a.day_total(), u64::MAX);
        assert_eq!(r.total_executions(), u64::MAX);

        let r = record_usage(&r, "a", at("2026-03-04T10:01:00+00:00"));
        assert_eq!(r.usage("a").unwrap().co_occurrence.get("b"), Some(&u64::MAX));
        assert_eq!(r.usage("b").unwrap().co_occurrence.get("a"), Some(&u64::MAX));
    }

    #[test]
    fn writes_the_settings_document_shape() {
        let legacy = r#"{
            "favorites": ["select-all"],
            "commandUsage": {
                "export-zip": {"count": 1, "avgTimeToSelect": 420, "timeOfDayPattern": {"9": 1}}
            }
        }"#;
        let r = UsageRecord::from_json(legacy);
        let back: serde_json::Value = serde_json::to_value(&r).unwrap();
        assert_eq!(back["favorites"][0], "select-all");
        assert_eq!(back["commandUsage"]["export-zip"]["avgTimeToSelect"], 420);
        assert_eq!(back["commandUsage"]["export-zip"]["timeOfDayPattern"]["9"], 1);
        assert!(back.get("pinned").is_none());
        assert!(back.get("commands").is_none());
    }

    #[test]
    fn normalized_resolves_pin_hide_conflict() {
        let raw = UsageRecord {
            commands: BTreeMap::new(),
            pinned: vec!["a".into(), "a".into(), "".into()],
            hidden: vec!["a".into(), "b".into(), "b".into()],
        };
        let r = raw.normalized();
        assert_eq!(r.pinned, vec!["a".to_string()]);
        assert_eq!(r.hidden, vec!["b".to_string()]);
    }

    #[test]
    fn last_command_within_picks_latest() {
        let r = record_usage(&UsageRecord::new(), "a", at("2026-03-04T10:00:00+00:00"));
        let r = record_usage(&r, "b", at("2026-03-04T10:03:00+00:00"));

        let window = Duration::minutes(5);
        assert_eq!(r.last_command_within(at("2026-03-04T10:04:00+00:00"), window), Some("b"));
        assert_eq!(r.last_command_within(at("2026-03-04T11:00:00+00:00"), window), None);
    }
}
