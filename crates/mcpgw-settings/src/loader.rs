//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GatewaySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `MCPGW_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::GatewaySettings;

/// Resolve the default settings file path (`~/.mcpgw/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".mcpgw").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<GatewaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// validation is an error.
pub fn load_settings_from_path(path: &Path) -> Result<GatewaySettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<GatewaySettings> {
    let defaults = serde_json::to_value(GatewaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `MCPGW_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut GatewaySettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Invalid values are ignored with a warning and leave the file/default
/// value in place.
pub fn apply_overrides<F>(settings: &mut GatewaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("MCPGW_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("MCPGW_PORT", 0, 65535) {
        settings.server.port = v;
    }

    // ── Sessions ────────────────────────────────────────────────────
    if let Some(v) = env.u64("MCPGW_HEARTBEAT_SECS", 1, 3_600) {
        settings.sessions.heartbeat_interval_secs = v;
    }
    if let Some(v) = env.usize("MCPGW_BUFFER_CAPACITY", 1, 1_048_576) {
        settings.sessions.buffer_capacity = v;
    }

    // ── Upstream ────────────────────────────────────────────────────
    if let Some(v) = env.u64("MCPGW_REQUEST_TIMEOUT_MS", 100, 600_000) {
        settings.upstream.request_timeout_ms = v;
    }
    if let Some(v) = env.u64("MCPGW_CONNECT_TIMEOUT_MS", 100, 600_000) {
        settings.upstream.connect_timeout_ms = v;
    }
    if let Some(v) = env.u64("MCPGW_STREAM_COUNT", 0, 1_000_000) {
        settings.upstream.stream_count = u32::try_from(v).unwrap_or(u32::MAX);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("MCPGW_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("MCPGW_LOG_FORMAT") {
        match v.parse() {
            Ok(format) => settings.logging.format = format,
            Err(e) => tracing::warn!(key = "MCPGW_LOG_FORMAT", value = %v, error = %e, "invalid env var, ignoring"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = self.string(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        let val = self.string(name)?;
        let result = parse_usize_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;
    use mcpgw_core::LogFormat;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn write_settings(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8000, "host": "127.0.0.1"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "127.0.0.1");
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replaces() {
        let merged = deep_merge(
            serde_json::json!({"items": [1, 2, 3]}),
            serde_json::json!({"items": [4]}),
        );
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let merged = deep_merge(
            serde_json::json!({"a": {"nested": true}}),
            serde_json::json!({"a": 42}),
        );
        assert_eq!(merged["a"], 42);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, GatewaySettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let (_dir, path) = write_settings(
            r#"{"server": {"port": 9090}, "sessions": {"heartbeatIntervalSecs": 3}}"#,
        );
        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.sessions.heartbeat_interval_secs, 3);
        assert_eq!(settings.sessions.buffer_capacity, 1024);
    }

    #[test]
    fn invalid_json_is_error() {
        let (_dir, path) = write_settings("not valid json");
        assert_matches!(load_file_layer(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn wrong_type_is_error() {
        let (_dir, path) = write_settings(r#"{"server": {"port": "eighty"}}"#);
        assert_matches!(load_file_layer(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn invalid_value_fails_validation() {
        let (_dir, path) = write_settings(r#"{"sessions": {"bufferCapacity": 0}}"#);
        assert_matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        );
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_file_values() {
        let (_dir, path) = write_settings(r#"{"server": {"port": 9090}}"#);
        let mut settings = load_file_layer(&path).unwrap();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("MCPGW_PORT", "7000"),
                ("MCPGW_HOST", "0.0.0.0"),
                ("MCPGW_HEARTBEAT_SECS", "2"),
                ("MCPGW_BUFFER_CAPACITY", "16"),
                ("MCPGW_STREAM_COUNT", "3"),
                ("MCPGW_LOG_FORMAT", "json"),
                ("MCPGW_LOG_LEVEL", "debug"),
            ]),
        );
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.sessions.heartbeat_interval_secs, 2);
        assert_eq!(settings.sessions.buffer_capacity, 16);
        assert_eq!(settings.upstream.stream_count, 3);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut settings = GatewaySettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("MCPGW_PORT", "99999"),
                ("MCPGW_HEARTBEAT_SECS", "0"),
                ("MCPGW_BUFFER_CAPACITY", "lots"),
                ("MCPGW_LOG_FORMAT", "xml"),
                ("MCPGW_HOST", ""),
            ]),
        );
        assert_eq!(settings, GatewaySettings::default());
    }

    #[test]
    fn timeouts_from_env() {
        let mut settings = GatewaySettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("MCPGW_REQUEST_TIMEOUT_MS", "2500"),
                ("MCPGW_CONNECT_TIMEOUT_MS", "50"),
            ]),
        );
        assert_eq!(settings.upstream.request_timeout_ms, 2500);
        // below the minimum, ignored
        assert_eq!(settings.upstream.connect_timeout_ms, 5_000);
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16_range("0", 0, 65535), Some(0));
        assert_eq!(parse_u16_range("65535", 1, 65535), Some(65535));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("99999", 1, 65535), None);
        assert_eq!(parse_u16_range("", 1, 65535), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range(" 30 ", 1, 3600), Some(30));
        assert_eq!(parse_u64_range("3601", 1, 3600), None);
        assert_eq!(parse_u64_range("abc", 1, 3600), None);
    }

    #[test]
    fn parse_usize_bounds() {
        assert_eq!(parse_usize_range("50", 1, 10_000), Some(50));
        assert_eq!(parse_usize_range("0", 1, 10_000), None);
    }
}
