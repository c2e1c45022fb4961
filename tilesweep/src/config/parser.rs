//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::provider::{SourcePreset, UrlTemplate};
use crate::region::ZoomRange;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [tiles] section
    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.tiles.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("extension") {
            let v = v.trim().trim_start_matches('.');
            if v.is_empty() || v.contains('/') {
                return Err(invalid(
                    "tiles",
                    "extension",
                    v,
                    "must be a plain file extension like 'jpg'",
                ));
            }
            config.tiles.extension = v.to_string();
        }
    }

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = section.get("preset") {
            config.source.preset = SourcePreset::from_str(v.trim()).map_err(|_| {
                let names: Vec<&str> = SourcePreset::ALL.iter().map(|p| p.name()).collect();
                invalid(
                    "source",
                    "preset",
                    v,
                    &format!("must be one of: {}", names.join(", ")),
                )
            })?;
        }
        if let Some(v) = section.get("url_template") {
            let v = v.trim();
            if !v.is_empty() {
                let template = UrlTemplate::parse(v)
                    .map_err(|e| invalid("source", "url_template", v, &e.to_string()))?;
                config.source.url_template = Some(template);
            }
        }
        if let Some(v) = section.get("layer") {
            let v = v.trim();
            if !v.is_empty() {
                config.source.layer = Some(v.to_string());
            }
        }
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("concurrency") {
            config.fetch.concurrency = parse_positive(v)
                .ok_or_else(|| invalid("fetch", "concurrency", v, "must be a positive integer"))?
                as usize;
        }
        if let Some(v) = section.get("timeout_secs") {
            config.fetch.timeout_secs = parse_positive(v).ok_or_else(|| {
                invalid("fetch", "timeout_secs", v, "must be a positive integer (seconds)")
            })?;
        }
        if let Some(v) = section.get("connect_timeout_secs") {
            config.fetch.connect_timeout_secs = parse_positive(v).ok_or_else(|| {
                invalid(
                    "fetch",
                    "connect_timeout_secs",
                    v,
                    "must be a positive integer (seconds)",
                )
            })?;
        }
    }

    // [pipeline] section
    if let Some(section) = ini.section(Some("pipeline")) {
        let mut min = config.pipeline.zooms.min();
        let mut max = config.pipeline.zooms.max();
        if let Some(v) = section.get("min_zoom") {
            min = v
                .trim()
                .parse()
                .map_err(|_| invalid("pipeline", "min_zoom", v, "must be an integer 0-22"))?;
        }
        if let Some(v) = section.get("max_zoom") {
            max = v
                .trim()
                .parse()
                .map_err(|_| invalid("pipeline", "max_zoom", v, "must be an integer 0-22"))?;
        }
        config.pipeline.zooms = ZoomRange::new(min, max).map_err(|e| {
            invalid(
                "pipeline",
                "min_zoom/max_zoom",
                &format!("{}-{}", min, max),
                &e.to_string(),
            )
        })?;
        if let Some(v) = section.get("cooldown_secs") {
            config.pipeline.cooldown_secs = v.trim().parse().map_err(|_| {
                invalid(
                    "pipeline",
                    "cooldown_secs",
                    v,
                    "must be a non-negative integer (seconds)",
                )
            })?;
        }
        if let Some(v) = section.get("drain_timeout_secs") {
            config.pipeline.drain_timeout_secs = v.trim().parse().map_err(|_| {
                invalid(
                    "pipeline",
                    "drain_timeout_secs",
                    v,
                    "must be a non-negative integer (seconds)",
                )
            })?;
        }
    }

    // [transport] section
    if let Some(section) = ini.section(Some("transport")) {
        if let Some(v) = section.get("endpoint") {
            let v = v.trim();
            config.transport.endpoint = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = section.get("user_env") {
            config.transport.user_env = parse_env_name("user_env", v)?;
        }
        if let Some(v) = section.get("password_env") {
            config.transport.password_env = parse_env_name("password_env", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_positive(v: &str) -> Option<u64> {
    v.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

/// Environment variable names only. Credential values never go in the file.
fn parse_env_name(key: &str, v: &str) -> Result<String, ConfigFileError> {
    let v = v.trim();
    let valid = !v.is_empty()
        && !v.starts_with(|c: char| c.is_ascii_digit())
        && v.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(invalid(
            "transport",
            key,
            v,
            "must be an environment variable name like TILESWEEP_TRANSPORT_USER",
        ));
    }
    Ok(v.to_string())
}

/// Expand `~/` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
