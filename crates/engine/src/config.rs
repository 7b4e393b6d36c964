use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::PaletteError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Tunable constants for the ranking engine.
///
/// Every section is optional in TOML; missing sections fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub weights: ScoringWeights,
    pub tuning: ScoringTuning,
    pub session: SessionConfig,
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Points awarded by each signal at full strength.
///
/// Signals are normalized to `[0, 1]` (context to `[-1, 1]`) before the
/// weight is applied, so a weight is the signal's maximum contribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub search: f64,
    pub frequency: f64,
    pub recency: f64,
    pub time_of_day: f64,
    pub day_of_week: f64,
    pub co_occurrence: f64,
    pub context: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            search: 100.0,
            frequency: 100.0,
            recency: 50.0,
            time_of_day: 30.0,
            day_of_week: 20.0,
            co_occurrence: 50.0,
            context: 60.0,
        }
    }
}

impl ScoringWeights {
    fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("search", self.search),
            ("frequency", self.frequency),
            ("recency", self.recency),
            ("time_of_day", self.time_of_day),
            ("day_of_week", self.day_of_week),
            ("co_occurrence", self.co_occurrence),
            ("context", self.context),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTuning {
    /// Hours after which the recency signal has decayed to half.
    pub recency_half_life_hours: f64,
    /// Invocations required before hour/weekday buckets are trusted.
    pub min_usage_for_patterns: u64,
}

impl Default for ScoringTuning {
    fn default() -> Self {
        Self {
            recency_half_life_hours: 7.0 * 24.0,
            min_usage_for_patterns: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Two invocations closer than this count as co-occurring.
    pub window_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { window_secs: 5 * 60 }
    }
}

impl SessionConfig {
    /// The window as a duration. Out-of-range values fall back to the default.
    pub fn window(&self) -> Duration {
        Duration::try_seconds(self.window_secs)
            .unwrap_or_else(|| Duration::seconds(Self::default().window_secs))
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PaletteConfig {
    pub fn from_toml(input: &str) -> Result<Self, PaletteError> {
        let config: PaletteConfig =
            toml::from_str(input).map_err(|e| PaletteError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PaletteError> {
        for (name, weight) in self.weights.named() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PaletteError::ConfigValidation(format!(
                    "weights.{name} must be a finite, non-negative number, got {weight}"
                )));
            }
        }

        let half_life = self.tuning.recency_half_life_hours;
        if !half_life.is_finite() || half_life <= 0.0 {
            return Err(PaletteError::ConfigValidation(format!(
                "tuning.recency_half_life_hours must be positive, got {half_life}"
            )));
        }

        if self.session.window_secs <= 0 || Duration::try_seconds(self.session.window_secs).is_none() {
            return Err(PaletteError::ConfigValidation(format!(
                "session.window_secs must be a positive number of seconds within range, got {}",
                self.session.window_secs
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
