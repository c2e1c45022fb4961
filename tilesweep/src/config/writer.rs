//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let url_template = config
        .source
        .url_template
        .as_ref()
        .map(|t| t.as_str().to_string())
        .unwrap_or_default();
    let layer = config.source.layer.as_deref().unwrap_or("");
    let endpoint = config.transport.endpoint.as_deref().unwrap_or("");

    format!(
        r#"[tiles]
; Root directory for raw tiles, region archives (<region>.zip) and run bundles
directory = {}
; File extension for stored tiles
extension = {}

[source]
; Built-in imagery source:
;   google-hybrid    - Google satellite with roads and labels
;   google-satellite - Google satellite only
;   bing-hybrid      - Bing aerial with labels
preset = {}
; Custom URL template, overrides the preset when set.
; Placeholders: {{x}} {{y}} {{z}} {{zoom}} {{layer}} {{quadkey}}
url_template = {}
; Layer substituted for {{layer}} (leave empty for the preset default)
layer = {}

[fetch]
; Maximum tile requests in flight
concurrency = {}
; Per-tile timeout in seconds
timeout_secs = {}
; TCP connect timeout in seconds
connect_timeout_secs = {}

[pipeline]
; Zoom levels fetched for every region (0-22)
min_zoom = {}
max_zoom = {}
; Pause between regions that fetched tiles, in seconds
cooldown_secs = {}
; Grace period for in-flight fetches after Ctrl-C, in seconds
drain_timeout_secs = {}

[transport]
; Where the run bundle is delivered. Either an upload URL (sent with curl)
; or a local directory. Leave empty to skip delivery.
endpoint = {}
; Names of the environment variables holding upload credentials.
; Credentials themselves are never stored in this file.
user_env = {}
password_env = {}

[logging]
; Log file, truncated at the start of every run
file = {}
"#,
        path_to_string(&config.tiles.directory),
        config.tiles.extension,
        config.source.preset.name(),
        url_template,
        layer,
        config.fetch.concurrency,
        config.fetch.timeout_secs,
        config.fetch.connect_timeout_secs,
        config.pipeline.zooms.min(),
        config.pipeline.zooms.max(),
        config.pipeline.cooldown_secs,
        config.pipeline.drain_timeout_secs,
        endpoint,
        config.transport.user_env,
        config.transport.password_env,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
