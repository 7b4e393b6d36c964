//! Read-only analytics over a usage record.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::usage::UsageRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandCount {
    pub command_id: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandLastUsed {
    pub command_id: String,
    pub last_used_at: DateTime<Utc>,
}

/// Snapshot of a user's palette history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub total_commands: usize,
    pub total_executions: u64,
    pub pinned: Vec<String>,
    pub hidden: Vec<String>,
    pub usage_by_command: BTreeMap<String, u64>,
}

/// Commands by invocation count, highest first.
pub fn most_frequent(record: &UsageRecord, limit: usize) -> Vec<CommandCount> {
    let mut counts: Vec<CommandCount> = record
        .commands
        .iter()
        .filter(|(_, u)| u.count > 0)
        .map(|(id, u)| CommandCount {
            command_id: id.clone(),
            count: u.count,
        })
        .collect();
    // BTreeMap iteration is id-ordered; stable sort keeps that for ties
    counts.sort_by_key(|c| Reverse(c.count));
    counts.truncate(limit);
    counts
}

/// Commands by last invocation, newest first.
pub fn most_recent(record: &UsageRecord, limit: usize) -> Vec<CommandLastUsed> {
    let mut recent: Vec<CommandLastUsed> = record
        .commands
        .iter()
        .filter_map(|(id, u)| {
            u.last_used_at.map(|at| CommandLastUsed {
                command_id: id.clone(),
                last_used_at: at,
            })
        })
        .collect();
    recent.sort_by_key(|c| Reverse(c.last_used_at));
    recent.truncate(limit);
    recent
}

/// Commands most often run in the same session as `command_id`.
pub fn used_with(record: &UsageRecord, command_id: &str, limit: usize) -> Vec<CommandCount> {
    let Some(usage) = record.usage(command_id) else {
        return Vec::new();
    };
    let mut pairs: Vec<CommandCount> = usage
        .co_occurrence
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(id, n)| CommandCount {
            command_id: id.clone(),
            count: *n,
        })
        .collect();
    pairs.sort_by_key(|c| Reverse(c.count));
    pairs.truncate(limit);
    pairs
}

/// Hour of day (0-23) the command runs most. Earliest hour wins ties.
pub fn peak_hour(record: &UsageRecord, command_id: &str) -> Option<usize> {
    record
        .usage(command_id)
        .and_then(|u| peak_bucket(&u.hour_buckets))
}

/// Weekday (0 = Sunday) the command runs most. Earliest day wins ties.
pub fn peak_day(record: &UsageRecord, command_id: &str) -> Option<usize> {
    record
        .usage(command_id)
        .and_then(|u| peak_bucket(&u.day_buckets))
}

fn peak_bucket(buckets: &[u64]) -> Option<usize> {
    let max = buckets.iter().copied().max().filter(|m| *m > 0)?;
    buckets.iter().position(|n| *n == max)
}

pub fn summarize(record: &UsageRecord) -> UsageSummary {
    UsageSummary {
        total_commands: record.commands.len(),
        total_executions: record.total_executions(),
        pinned: record.pinned.clone(),
        hidden: record.hidden.clone(),
        usage_by_command: record
            .commands
            .iter()
            .map(|(id, u)| (id.clone(), u.count))
            .collect(),
    }
}
