//! Documented, environment-overridable configuration knobs.
//!
//! A much smaller sibling of the teacher's `foundations::settings`: hydroeval
//! has no sub-service YAML tree to assemble, just a handful of scoring/logging
//! knobs, so `#[settings]` here only has to turn doc comments into
//! [`EvaluationSettings::FIELD_DOCS`] and derive `Clone`/`Debug`/`Serialize`.
//! `Default` is hand-written below instead of derived, since the defaults are
//! the engine's own constants (`DEFAULT_EPSILON`, `RESAMPLE_COUNT`, ...)
//! rather than each field's zero value.

use hydroeval_macros::settings;

/// The log level applied when `METRIC_LOG_LEVEL` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Scoring and retry knobs, overridable from the process environment via
/// [`EvaluationSettings::from_env`].
#[settings]
pub struct EvaluationSettings {
    /// Equality tolerance used when deciding whether a metric's scaled value
    /// has crossed its `fails_on` boundary.
    pub epsilon: f64,

    /// Maximum number of alternating variable/expression substitution passes
    /// `process_expressions` performs before giving up.
    pub process_iteration_count: usize,

    /// Number of resamples drawn per bootstrap confidence interval.
    pub bootstrap_resamples: usize,

    /// Maximum number of enqueue attempts a `Communicator` makes before
    /// dropping the oldest queued entry.
    pub retry_attempts: u32,

    /// Per-attempt enqueue timeout, in milliseconds.
    pub retry_timeout_ms: u64,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        EvaluationSettings {
            epsilon: crate::scoring::scheme::DEFAULT_EPSILON,
            process_iteration_count: crate::expression::DEFAULT_PROCESS_ITERATION_COUNT,
            bootstrap_resamples: crate::scoring::bootstrap::RESAMPLE_COUNT,
            retry_attempts: crate::communicator::MAX_ENQUEUE_ATTEMPTS as u32,
            retry_timeout_ms: 5_000,
        }
    }
}

impl EvaluationSettings {
    /// Builds settings from defaults, overridden by `METRIC_EPSILON` and
    /// `METRIC_LOG_LEVEL`/`UDP_LOG_PORT` (the latter two consumed by
    /// [`crate::telemetry::log::init`], not stored here).
    pub fn from_env() -> Self {
        let mut settings = EvaluationSettings::default();

        if let Ok(raw) = std::env::var("METRIC_EPSILON") {
            if let Ok(value) = raw.parse() {
                settings.epsilon = value;
            }
        }

        settings
    }
}

/// Logging knobs, overridable from the process environment via
/// [`LogSettings::from_env`].
#[settings]
pub struct LogSettings {
    /// `slog` filter level name (e.g. `"trace"`, `"info"`, `"warning"`).
    pub level: String,

    /// Emit structured JSON records instead of human-readable text.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: DEFAULT_LOG_LEVEL.to_owned(),
            json: false,
        }
    }
}

impl LogSettings {
    /// Applies `METRIC_LOG_LEVEL` over the default level; `UDP_LOG_PORT` is
    /// read directly by `telemetry::log::init` since it names a drain rather
    /// than a `LogSettings` field.
    pub fn from_env() -> Self {
        let mut settings = LogSettings::default();

        if let Ok(level) = std::env::var("METRIC_LOG_LEVEL") {
            settings.level = level;
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_engine_wide_constants() {
        let settings = EvaluationSettings::default();
        assert_eq!(settings.epsilon, crate::scoring::scheme::DEFAULT_EPSILON);
        assert_eq!(settings.retry_attempts as usize, crate::communicator::MAX_ENQUEUE_ATTEMPTS);
    }

    #[test]
    fn metric_epsilon_env_var_overrides_the_default() {
        std::env::set_var("METRIC_EPSILON", "0.5");
        let settings = EvaluationSettings::from_env();
        std::env::remove_var("METRIC_EPSILON");

        assert_eq!(settings.epsilon, 0.5);
    }

    #[test]
    fn log_level_defaults_when_unset() {
        std::env::remove_var("METRIC_LOG_LEVEL");
        assert_eq!(LogSettings::from_env().level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn field_docs_are_generated_for_every_field() {
        assert_eq!(EvaluationSettings::FIELD_DOCS.len(), 5);
        assert_eq!(LogSettings::FIELD_DOCS.len(), 2);
    }
}
