//! Log line field naming and value conventions.
//!
//! Different logging libraries name the level, message, error and time fields
//! differently and use different level spellings. A [`LogConfig`] captures one
//! such convention; the presets cover the common JSON loggers.

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Log severity levels known to the presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Most verbose.
    Trace,
    /// Debugging information.
    Debug,
    /// General information.
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
    /// Fatal conditions.
    Fatal,
    /// Panics.
    Panic,
}

impl Level {
    /// Returns the canonical lowercase name of this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Panic => "panic",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The strings a logger writes into the level field for each [`Level`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelValues {
    /// Trace level value.
    pub trace: String,
    /// Debug level value.
    pub debug: String,
    /// Info level value.
    pub info: String,
    /// Warn level value.
    pub warn: String,
    /// Error level value.
    pub error: String,
    /// Fatal level value.
    pub fatal: String,
    /// Panic level value.
    pub panic: String,
}

impl LevelValues {
    fn lowercase() -> Self {
        Self {
            trace: "trace".to_string(),
            debug: "debug".to_string(),
            info: "info".to_string(),
            warn: "warn".to_string(),
            error: "error".to_string(),
            fatal: "fatal".to_string(),
            panic: "panic".to_string(),
        }
    }

    fn uppercase() -> Self {
        Self {
            trace: "TRACE".to_string(),
            debug: "DEBUG".to_string(),
            info: "INFO".to_string(),
            warn: "WARN".to_string(),
            error: "ERROR".to_string(),
            fatal: "FATAL".to_string(),
            panic: "PANIC".to_string(),
        }
    }
}

/// How time fields are formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// RFC 3339, with or without fractional seconds.
    Rfc3339,
    /// A `chrono` strftime pattern which must include an offset.
    Strftime(String),
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rfc3339 => f.write_str("RFC3339"),
            Self::Strftime(pattern) => f.write_str(pattern),
        }
    }
}

/// Unit of numeric duration fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    /// Nanoseconds.
    Nanosecond,
    /// Microseconds.
    Microsecond,
    /// Milliseconds.
    Millisecond,
    /// Seconds.
    Second,
}

impl DurationUnit {
    /// Returns the length of one unit in nanoseconds.
    #[must_use]
    pub const fn nanos(&self) -> i64 {
        match self {
            Self::Nanosecond => 1,
            Self::Microsecond => 1_000,
            Self::Millisecond => 1_000_000,
            Self::Second => 1_000_000_000,
        }
    }

    /// Converts a number of units to a duration, truncating fractions.
    #[must_use]
    pub fn to_delta(&self, units: f64) -> TimeDelta {
        TimeDelta::nanoseconds((units as i64).saturating_mul(self.nanos()))
    }

    /// Expresses a duration as a whole number of units.
    #[must_use]
    pub fn units_in(&self, delta: TimeDelta) -> i64 {
        delta
            .num_nanoseconds()
            .map_or(i64::MAX, |nanos| nanos / self.nanos())
    }
}

/// Field names and value conventions of one logging library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Time field name.
    pub time_field: String,
    /// Level field name.
    pub level_field: String,
    /// Message field name.
    pub message_field: String,
    /// Error field name; empty when the logger has none.
    pub error_field: String,
    /// Level field values.
    pub levels: LevelValues,
    /// Time field format.
    pub time_format: TimeFormat,
    /// Unit of numeric duration fields.
    pub duration_unit: DurationUnit,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::zerolog()
    }
}

impl LogConfig {
    /// `zerolog` defaults. This is the default configuration.
    #[must_use]
    pub fn zerolog() -> Self {
        Self {
            time_field: "time".to_string(),
            level_field: "level".to_string(),
            message_field: "message".to_string(),
            error_field: "error".to_string(),
            levels: LevelValues::lowercase(),
            time_format: TimeFormat::Rfc3339,
            duration_unit: DurationUnit::Millisecond,
        }
    }

    /// `log/slog` JSON handler defaults.
    #[must_use]
    pub fn slog() -> Self {
        Self {
            time_field: "time".to_string(),
            level_field: "level".to_string(),
            message_field: "msg".to_string(),
            error_field: "error".to_string(),
            levels: LevelValues::uppercase(),
            time_format: TimeFormat::Rfc3339,
            duration_unit: DurationUnit::Millisecond,
        }
    }

    /// `logrus` JSON formatter defaults.
    #[must_use]
    pub fn logrus() -> Self {
        Self {
            time_field: "time".to_string(),
            level_field: "level".to_string(),
            message_field: "msg".to_string(),
            error_field: "error".to_string(),
            levels: LevelValues {
                warn: "warning".to_string(),
                ..LevelValues::lowercase()
            },
            time_format: TimeFormat::Rfc3339,
            duration_unit: DurationUnit::Nanosecond,
        }
    }

    /// `zap` production encoder configured with RFC 3339 timestamps.
    #[must_use]
    pub fn zap() -> Self {
        Self {
            time_field: "ts".to_string(),
            level_field: "level".to_string(),
            message_field: "msg".to_string(),
            error_field: String::new(),
            levels: LevelValues::lowercase(),
            time_format: TimeFormat::Rfc3339,
            duration_unit: DurationUnit::Second,
        }
    }

    /// `tracing-subscriber` JSON formatter with `flatten_event(true)`.
    #[must_use]
    pub fn tracing() -> Self {
        Self {
            time_field: "timestamp".to_string(),
            level_field: "level".to_string(),
            message_field: "message".to_string(),
            error_field: "error".to_string(),
            levels: LevelValues::uppercase(),
            time_format: TimeFormat::Rfc3339,
            duration_unit: DurationUnit::Millisecond,
        }
    }

    /// Returns the configuration for a preset.
    #[must_use]
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Zerolog => Self::zerolog(),
            Preset::Slog => Self::slog(),
            Preset::Logrus => Self::logrus(),
            Preset::Zap => Self::zap(),
            Preset::Tracing => Self::tracing(),
        }
    }

    /// Returns the value the logger writes for the given level.
    #[must_use]
    pub fn level_value(&self, level: Level) -> &str {
        match level {
            Level::Trace => &self.levels.trace,
            Level::Debug => &self.levels.debug,
            Level::Info => &self.levels.info,
            Level::Warn => &self.levels.warn,
            Level::Error => &self.levels.error,
            Level::Fatal => &self.levels.fatal,
            Level::Panic => &self.levels.panic,
        }
    }
}

/// Named configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// See [`LogConfig::zerolog`].
    Zerolog,
    /// See [`LogConfig::slog`].
    Slog,
    /// See [`LogConfig::logrus`].
    Logrus,
    /// See [`LogConfig::zap`].
    Zap,
    /// See [`LogConfig::tracing`].
    Tracing,
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zerolog" => Ok(Self::Zerolog),
            "slog" => Ok(Self::Slog),
            "logrus" => Ok(Self::Logrus),
            "zap" => Ok(Self::Zap),
            "tracing" => Ok(Self::Tracing),
            other => Err(format!("unknown log config preset: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn default_is_zerolog() {
        assert_eq!(LogConfig::default(), LogConfig::zerolog());
    }

    #[test]
    fn zerolog_fields() {
        let cfg = LogConfig::zerolog();
        assert_eq!(cfg.time_field, "time");
        assert_eq!(cfg.level_field, "level");
        assert_eq!(cfg.message_field, "message");
        assert_eq!(cfg.error_field, "error");
        assert_eq!(cfg.time_format, TimeFormat::Rfc3339);
        assert_eq!(cfg.duration_unit, DurationUnit::Millisecond);
    }

    #[test_case(Preset::Zerolog, Level::Warn, "warn" ; "zerolog warn")]
    #[test_case(Preset::Slog, Level::Info, "INFO" ; "slog info")]
    #[test_case(Preset::Logrus, Level::Warn, "warning" ; "logrus warn")]
    #[test_case(Preset::Zap, Level::Error, "error" ; "zap error")]
    #[test_case(Preset::Tracing, Level::Debug, "DEBUG" ; "tracing debug")]
    fn level_values(preset: Preset, level: Level, want: &str) {
        assert_eq!(LogConfig::from_preset(preset).level_value(level), want);
    }

    #[test_case("zerolog", Preset::Zerolog ; "zerolog")]
    #[test_case("SLOG", Preset::Slog ; "upper case")]
    #[test_case("logrus", Preset::Logrus ; "logrus")]
    #[test_case("zap", Preset::Zap ; "zap")]
    #[test_case("tracing", Preset::Tracing ; "tracing")]
    fn preset_from_str(name: &str, want: Preset) {
        assert_eq!(name.parse::<Preset>(), Ok(want));
    }

    #[test]
    fn preset_from_str_unknown() {
        assert!("log4j".parse::<Preset>().is_err());
    }

    #[test]
    fn zap_has_no_error_field() {
        let cfg = LogConfig::zap();
        assert!(cfg.error_field.is_empty());
        assert_eq!(cfg.time_field, "ts");
        assert_eq!(cfg.duration_unit, DurationUnit::Second);
    }

    #[test]
    fn duration_unit_conversion() {
        assert_eq!(DurationUnit::Millisecond.to_delta(1500.0), TimeDelta::milliseconds(1500));
        assert_eq!(DurationUnit::Second.to_delta(2.9), TimeDelta::seconds(2));
        assert_eq!(DurationUnit::Nanosecond.to_delta(7.0), TimeDelta::nanoseconds(7));
        assert_eq!(DurationUnit::Millisecond.units_in(TimeDelta::seconds(2)), 2000);
    }

    #[test]
    fn config_serde_round_trip() {
        let cfg = LogConfig::logrus();
        let json = serde_json::to_string(&cfg).unwrap_or_default();
        let back: Option<LogConfig> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(cfg));
    }

    #[test]
    fn config_from_json_strftime() {
        let json = r#"{
            "time_field": "t",
            "level_field": "lvl",
            "message_field": "m",
            "error_field": "e",
            "levels": {"trace":"t","debug":"d","info":"i","warn":"w","error":"e","fatal":"f","panic":"p"},
            "time_format": {"strftime": "%Y-%m-%d %H:%M:%S %z"},
            "duration_unit": "second"
        }"#;
        let cfg: Option<LogConfig> = serde_json::from_str(json).ok();
        assert!(cfg.is_some());
        if let Some(cfg) = cfg {
            assert_eq!(cfg.level_value(Level::Info), "i");
            assert_eq!(
                cfg.time_format,
                TimeFormat::Strftime("%Y-%m-%d %H:%M:%S %z".to_string())
            );
        }
    }
}
