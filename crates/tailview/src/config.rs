#![forbid(unsafe_code)]

//! Configuration for [`VirtualLogList`](crate::list::VirtualLogList).
//!
//! Values can be set with the `with_*` builders or read from the
//! environment:
//!
//! - `TAILVIEW_VIEWPORT_HEIGHT` (f64, layout units)
//! - `TAILVIEW_ESTIMATED_ITEM_HEIGHT` (f64, layout units)
//! - `TAILVIEW_OVERSCAN` (usize)
//! - `TAILVIEW_RESET_THRESHOLD` (f64 in `[0, 1]`)
//! - `TAILVIEW_SETTLE_MS` (u64)
//! - `TAILVIEW_NEAR_BOTTOM` (f64, layout units)
//! - `TAILVIEW_SCROLL_UP_THRESHOLD` (f64, layout units)
//! - `TAILVIEW_MEASURE_TOLERANCE` (f64, layout units)
//! - `TAILVIEW_PRESERVE_FRONT_TRIM` (bool)
//!
//! Unparseable values are reported as diagnostics and leave the default in
//! place; out-of-range values are reported by [`VirtualListConfig::validate`].

use std::env;
use std::fmt;
use std::time::Duration;

pub const ENV_VIEWPORT_HEIGHT: &str = "TAILVIEW_VIEWPORT_HEIGHT";
pub const ENV_ESTIMATED_ITEM_HEIGHT: &str = "TAILVIEW_ESTIMATED_ITEM_HEIGHT";
pub const ENV_OVERSCAN: &str = "TAILVIEW_OVERSCAN";
pub const ENV_RESET_THRESHOLD: &str = "TAILVIEW_RESET_THRESHOLD";
pub const ENV_SETTLE_MS: &str = "TAILVIEW_SETTLE_MS";
pub const ENV_NEAR_BOTTOM: &str = "TAILVIEW_NEAR_BOTTOM";
pub const ENV_SCROLL_UP_THRESHOLD: &str = "TAILVIEW_SCROLL_UP_THRESHOLD";
pub const ENV_MEASURE_TOLERANCE: &str = "TAILVIEW_MEASURE_TOLERANCE";
pub const ENV_PRESERVE_FRONT_TRIM: &str = "TAILVIEW_PRESERVE_FRONT_TRIM";

/// Tunables for one virtual list instance.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualListConfig {
    /// Height of the visible area.
    pub viewport_height: f64,
    /// Placeholder height for items not yet measured. Must be positive.
    pub estimated_item_height: f64,
    /// Extra items mounted above and below the visible window.
    pub overscan_count: usize,
    /// Fraction of item-count change (or of ids lost) that forces a full reset.
    pub reset_threshold_ratio: f64,
    /// Quiet period after the last scroll event before scrolling counts as settled.
    pub settle_delay: Duration,
    /// Distance from the bottom within which the view re-enables tail following.
    pub near_bottom_threshold: f64,
    /// Upward movement larger than this disables tail following.
    pub scroll_up_threshold: f64,
    /// Height changes at or below this are treated as measurement noise.
    pub measurement_tolerance: f64,
    /// Treat front eviction that keeps the remaining order as incremental
    /// instead of a full reset.
    pub preserve_on_front_trim: bool,
}

impl Default for VirtualListConfig {
    fn default() -> Self {
        Self {
            viewport_height: 400.0,
            estimated_item_height: 28.0,
            overscan_count: 3,
            reset_threshold_ratio: 0.3,
            settle_delay: Duration::from_millis(150),
            near_bottom_threshold: 50.0,
            scroll_up_threshold: 1.0,
            measurement_tolerance: 1.0,
            preserve_on_front_trim: false,
        }
    }
}

impl VirtualListConfig {
    #[must_use]
    pub fn with_viewport_height(mut self, height: f64) -> Self {
        self.viewport_height = height;
        self
    }

    #[must_use]
    pub fn with_estimated_item_height(mut self, height: f64) -> Self {
        self.estimated_item_height = height;
        self
    }

    #[must_use]
    pub fn with_overscan(mut self, count: usize) -> Self {
        self.overscan_count = count;
        self
    }

    #[must_use]
    pub fn with_reset_threshold(mut self, ratio: f64) -> Self {
        self.reset_threshold_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn with_near_bottom_threshold(mut self, distance: f64) -> Self {
        self.near_bottom_threshold = distance;
        self
    }

    #[must_use]
    pub fn with_scroll_up_threshold(mut self, distance: f64) -> Self {
        self.scroll_up_threshold = distance;
        self
    }

    #[must_use]
    pub fn with_measurement_tolerance(mut self, tolerance: f64) -> Self {
        self.measurement_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_preserve_on_front_trim(mut self, preserve: bool) -> Self {
        self.preserve_on_front_trim = preserve;
        self
    }

    /// Terminal-friendly defaults: one row per unmeasured line, row-granular
    /// thresholds.
    #[must_use]
    pub fn terminal(rows: u16) -> Self {
        Self {
            viewport_height: f64::from(rows),
            estimated_item_height: 1.0,
            overscan_count: 2,
            near_bottom_threshold: 1.0,
            scroll_up_threshold: 0.0,
            measurement_tolerance: 0.5,
            ..Self::default()
        }
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ConfigParse {
        Self::default().overlay_env()
    }

    /// Overlay environment variables onto this config, e.g. on top of
    /// [`VirtualListConfig::terminal`]. Unset variables keep `self`'s values.
    #[must_use]
    pub fn overlay_env(self) -> ConfigParse {
        from_env_with(self, |key| env::var(key).ok())
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        validate_non_negative("viewport_height", self.viewport_height, &mut errors);
        if !(self.estimated_item_height.is_finite() && self.estimated_item_height > 0.0) {
            errors.push(ConfigError::new(
                "estimated_item_height",
                self.estimated_item_height.to_string(),
                "must be a positive finite number",
            ));
        }
        if !(0.0..=1.0).contains(&self.reset_threshold_ratio) {
            errors.push(ConfigError::new(
                "reset_threshold_ratio",
                self.reset_threshold_ratio.to_string(),
                "must be within [0, 1]",
            ));
        }
        validate_non_negative(
            "near_bottom_threshold",
            self.near_bottom_threshold,
            &mut errors,
        );
        validate_non_negative("scroll_up_threshold", self.scroll_up_threshold, &mut errors);
        validate_non_negative(
            "measurement_tolerance",
            self.measurement_tolerance,
            &mut errors,
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Estimate with invalid values replaced by the default.
    pub(crate) fn effective_estimate(&self) -> f64 {
        if self.estimated_item_height.is_finite() && self.estimated_item_height > 0.0 {
            self.estimated_item_height
        } else {
            Self::default().estimated_item_height
        }
    }

    /// Viewport height with invalid values clamped to zero.
    pub(crate) fn effective_viewport(&self) -> f64 {
        sanitize_extent(self.viewport_height)
    }
}

/// Clamp NaN, infinite and negative extents to zero.
pub(crate) fn sanitize_extent(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct ConfigParse {
    pub config: VirtualListConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

pub(crate) fn from_env_with<F>(mut config: VirtualListConfig, mut get: F) -> ConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    let mut read_f64 = |key: &str, field: &'static str, slot: &mut f64, errors: &mut Vec<_>| {
        if let Some(value) = get(key) {
            match value.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => *slot = parsed,
                _ => errors.push(ConfigError::new(field, value, "expected a finite number")),
            }
        }
    };
    read_f64(
        ENV_VIEWPORT_HEIGHT,
        "viewport_height",
        &mut config.viewport_height,
        &mut errors,
    );
    read_f64(
        ENV_ESTIMATED_ITEM_HEIGHT,
        "estimated_item_height",
        &mut config.estimated_item_height,
        &mut errors,
    );
    read_f64(
        ENV_RESET_THRESHOLD,
        "reset_threshold_ratio",
        &mut config.reset_threshold_ratio,
        &mut errors,
    );
    read_f64(
        ENV_NEAR_BOTTOM,
        "near_bottom_threshold",
        &mut config.near_bottom_threshold,
        &mut errors,
    );
    read_f64(
        ENV_SCROLL_UP_THRESHOLD,
        "scroll_up_threshold",
        &mut config.scroll_up_threshold,
        &mut errors,
    );
    read_f64(
        ENV_MEASURE_TOLERANCE,
        "measurement_tolerance",
        &mut config.measurement_tolerance,
        &mut errors,
    );

    if let Some(value) = get(ENV_OVERSCAN) {
        match parse_usize(&value) {
            Some(parsed) => config.overscan_count = parsed,
            None => errors.push(ConfigError::new(
                "overscan_count",
                value,
                "expected non-negative integer",
            )),
        }
    }

    if let Some(value) = get(ENV_SETTLE_MS) {
        match value.trim().parse::<u64>() {
            Ok(ms) => config.settle_delay = Duration::from_millis(ms),
            Err(_) => errors.push(ConfigError::new(
                "settle_delay",
                value,
                "expected milliseconds as integer",
            )),
        }
    }

    if let Some(value) = get(ENV_PRESERVE_FRONT_TRIM) {
        match parse_bool(&value) {
            Some(parsed) => config.preserve_on_front_trim = parsed,
            None => errors.push(ConfigError::new(
                "preserve_on_front_trim",
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }

    if let Err(violations) = config.validate() {
        errors.extend(violations);
    }

    ConfigParse { config, errors }
}

fn validate_non_negative(field: &'static str, value: f64, errors: &mut Vec<ConfigError>) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(ConfigError::new(
            field,
            value.to_string(),
            "must be a non-negative finite number",
        ));
    }
}

fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_is_valid() {
        assert!(VirtualListConfig::default().validate().is_ok());
        assert!(VirtualListConfig::terminal(24).validate().is_ok());
    }

    #[test]
    fn env_parsing() {
        let mut env = HashMap::new();
        env.insert(ENV_VIEWPORT_HEIGHT, "600");
        env.insert(ENV_ESTIMATED_ITEM_HEIGHT, "18.5");
        env.insert(ENV_OVERSCAN, "5");
        env.insert(ENV_RESET_THRESHOLD, "0.5");
        env.insert(ENV_SETTLE_MS, "250");
        env.insert(ENV_NEAR_BOTTOM, "12");
        env.insert(ENV_PRESERVE_FRONT_TRIM, "yes");

        let parsed = from_env_with(VirtualListConfig::default(), |key| {
            env.get(key).map(|value| value.to_string())
        });
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let config = parsed.config;
        assert_eq!(config.viewport_height, 600.0);
        assert_eq!(config.estimated_item_height, 18.5);
        assert_eq!(config.overscan_count, 5);
        assert_eq!(config.reset_threshold_ratio, 0.5);
        assert_eq!(config.settle_delay, Duration::from_millis(250));
        assert_eq!(config.near_bottom_threshold, 12.0);
        assert!(config.preserve_on_front_trim);
    }

    #[test]
    fn env_invalid_values_reported() {
        let mut env = HashMap::new();
        env.insert(ENV_OVERSCAN, "-1");
        env.insert(ENV_SETTLE_MS, "soon");
        env.insert(ENV_PRESERVE_FRONT_TRIM, "maybe");
        env.insert(ENV_VIEWPORT_HEIGHT, "NaN");

        let parsed = from_env_with(VirtualListConfig::default(), |key| {
            env.get(key).map(|value| value.to_string())
        });
        assert!(parsed.errors.iter().any(|err| err.field == "overscan_count"));
        assert!(parsed.errors.iter().any(|err| err.field == "settle_delay"));
        assert!(
            parsed
                .errors
                .iter()
                .any(|err| err.field == "preserve_on_front_trim")
        );
        assert!(parsed.errors.iter().any(|err| err.field == "viewport_height"));
        // Defaults survive bad input.
        assert_eq!(parsed.config.overscan_count, 3);
        assert_eq!(parsed.config.viewport_height, 400.0);
    }

    #[test]
    fn from_env_drops_diagnostics() {
        assert_eq!(
            VirtualListConfig::from_env(),
            VirtualListConfig::from_env_with_diagnostics().config
        );
    }

    #[test]
    fn env_overlays_base_config() {
        let mut env = HashMap::new();
        env.insert(ENV_OVERSCAN, "6");

        let parsed = from_env_with(VirtualListConfig::terminal(30), |key| {
            env.get(key).map(|value| value.to_string())
        });
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config.overscan_count, 6);
        assert_eq!(parsed.config.viewport_height, 30.0);
        assert_eq!(parsed.config.estimated_item_height, 1.0);
    }

    #[test]
    fn validation_collects_every_violation() {
        let config = VirtualListConfig::default()
            .with_estimated_item_height(0.0)
            .with_reset_threshold(1.5)
            .with_near_bottom_threshold(-3.0);
        let errors = config.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|err| err.field).collect();
        assert_eq!(
            fields,
            vec![
                "estimated_item_height",
                "reset_threshold_ratio",
                "near_bottom_threshold"
            ]
        );
    }

    #[test]
    fn effective_estimate_falls_back() {
        let config = VirtualListConfig::default().with_estimated_item_height(f64::NAN);
        assert_eq!(config.effective_estimate(), 28.0);
    }

    #[test]
    fn error_display() {
        let err = ConfigError::new("overscan_count", "x", "expected integer");
        assert_eq!(err.to_string(), "overscan_count=x (expected integer)");
    }
}
