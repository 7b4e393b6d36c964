// Per-user DAM settings document
// Stored as one JSON blob per user; only `commandPalette` is typed here

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Serialize};
use serde_json::{Map, Value};

use lashpop_palette_engine::UsageRecord;

/// Current schema version of the `commandPalette` section.
pub const PALETTE_SETTINGS_VERSION: u32 = 1;

/// The whole settings blob. Keys other than `commandPalette` (grid view
/// mode, active filters, sort order, ...) round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_palette: Option<CommandPaletteSettings>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Command palette section: usage history plus display preferences.
/// Keys not modelled here (autocomplete and NLP preferences, `commandPairs`,
/// ...) are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandPaletteSettings {
    #[serde(flatten)]
    pub usage: UsageRecord,

    /// Groups that start collapsed
    pub collapsed_groups: Vec<String>,
    /// Groups never shown
    pub hidden_groups: Vec<String>,
    /// Custom group ordering
    pub group_order: Vec<String>,

    pub show_frequently_used: bool,
    pub frequently_used_limit: u32,
    pub show_suggestions: bool,
    pub suggestion_count: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    pub version: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CommandPaletteSettings {
    fn default() -> Self {
        Self {
            usage: UsageRecord::default(),
            collapsed_groups: Vec::new(),
            hidden_groups: Vec::new(),
            group_order: Vec::new(),
            show_frequently_used: true,
            frequently_used_limit: 5,
            show_suggestions: true,
            suggestion_count: 3,
            last_modified: None,
            version: PALETTE_SETTINGS_VERSION,
            extra: Map::new(),
        }
    }
}

impl DamSettings {
    /// Parse a stored blob. Malformed JSON yields empty settings.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                log::warn!("discarding malformed settings document: {e}");
                Self::default()
            }
        }
    }

    /// Like `from_json`, for an already-parsed value. A `commandPalette`
    /// section that fails to parse is dropped; the other keys are kept.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut other) = value else {
            if !value.is_null() {
                log::warn!("settings document is not an object, ignoring");
            }
            return Self::default();
        };

        let command_palette = match other.remove("commandPalette") {
            None | Some(Value::Null) => None,
            Some(section) => match parse_palette(section) {
                Ok(palette) => Some(palette),
                Err(e) => {
                    log::warn!("discarding malformed commandPalette settings: {e}");
                    None
                }
            },
        };

        Self {
            command_palette,
            other,
        }
    }

    /// Strict counterpart of `from_value` for read-modify-write callers: a
    /// document that is not an object, or a malformed `commandPalette`
    /// section, is an error instead of being dropped.
    pub fn try_from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut other = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => return Err(de::Error::custom("settings document is not an object")),
        };

        let command_palette = match other.remove("commandPalette") {
            None | Some(Value::Null) => None,
            Some(section) => Some(parse_palette(section)?),
        };

        Ok(Self {
            command_palette,
            other,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The user's usage record, empty when none has been stored yet.
    pub fn usage(&self) -> UsageRecord {
        self.command_palette
            .as_ref()
            .map(|p| p.usage.clone())
            .unwrap_or_default()
    }

    /// Replace the usage record, creating the palette section if needed.
    pub fn with_usage(mut self, usage: UsageRecord, now: DateTime<Utc>) -> Self {
        let palette = self.command_palette.get_or_insert_with(CommandPaletteSettings::default);
        palette.usage = usage;
        palette.last_modified = Some(now);
        self
    }
}

fn parse_palette(section: Value) -> Result<CommandPaletteSettings, serde_json::Error> {
    let section = match section {
        Value::Object(map) => Value::Object(canonical_usage_keys(map)),
        other => other,
    };
    let mut palette: CommandPaletteSettings = serde_json::from_value(section)?;
    palette.usage = palette.usage.normalized();
    Ok(palette)
}

/// Early documents spelled the usage keys `pinned` and `commands`.
fn canonical_usage_keys(mut map: Map<String, Value>) -> Map<String, Value> {
    for (old, current) in [("pinned", "favorites"), ("commands", "commandUsage")] {
        if let Some(value) = map.remove(old) {
            map.entry(current).or_insert(value);
        }
    }
    map
}
