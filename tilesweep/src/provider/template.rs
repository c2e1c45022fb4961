//! Tile URL templates and built-in source presets

use crate::coord::TileCoord;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a URL template or preset name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template lacks a placeholder needed to address a tile
    #[error("URL template '{template}' is missing {missing}")]
    MissingPlaceholder {
        template: String,
        missing: &'static str,
    },

    /// An opening brace without a known placeholder name
    #[error("URL template '{template}' contains unknown placeholder '{{{name}}}'")]
    UnknownPlaceholder { template: String, name: String },

    /// Preset name not recognised
    #[error("unknown source preset '{0}' (expected google-hybrid, google-satellite or bing-hybrid)")]
    UnknownPreset(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    X,
    Y,
    Zoom,
    Layer,
    Quadkey,
}

/// A tile URL pattern such as `https://host/tiles?lyrs={layer}&x={x}&y={y}&z={z}`.
///
/// Recognised placeholders are `{x}`, `{y}`, `{z}` (alias `{zoom}`),
/// `{layer}` and `{quadkey}`. A template must address tiles either by
/// `{x}`, `{y}` and `{z}` together or by `{quadkey}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    /// Parses and validates a template string.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let segments = scan(template).map_err(|name| TemplateError::UnknownPlaceholder {
            template: template.to_string(),
            name,
        })?;

        let has = |s: &Segment| segments.contains(s);
        if !has(&Segment::Quadkey) {
            for (segment, label) in [
                (Segment::X, "{x}"),
                (Segment::Y, "{y}"),
                (Segment::Zoom, "{z}"),
            ] {
                if !has(&segment) {
                    return Err(TemplateError::MissingPlaceholder {
                        template: template.to_string(),
                        missing: label,
                    });
                }
            }
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// Template text as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Short stable digest of the template text: the first eight hex digits
    /// of its SHA-256.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.raw.as_bytes());
        format!("{:x}", digest)[..8].to_string()
    }

    /// Renders the URL for one tile.
    pub fn render(&self, tile: &TileCoord, layer: &str) -> String {
        let mut url = String::with_capacity(self.raw.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::X => url.push_str(&tile.x.to_string()),
                Segment::Y => url.push_str(&tile.y.to_string()),
                Segment::Zoom => url.push_str(&tile.zoom.to_string()),
                Segment::Layer => url.push_str(layer),
                Segment::Quadkey => url.push_str(&tile.quadkey()),
            }
        }
        url
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Splits a template into literal text and placeholders.
///
/// Returns the offending name for an unknown or unterminated placeholder.
fn scan(template: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| after.to_string())?;
        let segment = match &after[..close] {
            "x" => Segment::X,
            "y" => Segment::Y,
            "z" | "zoom" => Segment::Zoom,
            "layer" => Segment::Layer,
            "quadkey" => Segment::Quadkey,
            other => return Err(other.to_string()),
        };
        segments.push(segment);
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

/// Built-in imagery sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePreset {
    /// Google satellite imagery with road and label overlay
    GoogleHybrid,
    /// Google satellite imagery without overlays
    GoogleSatellite,
    /// Bing aerial imagery with labels
    BingHybrid,
}

impl SourcePreset {
    /// All presets, in the order they are listed to users.
    pub const ALL: [SourcePreset; 3] = [
        SourcePreset::GoogleHybrid,
        SourcePreset::GoogleSatellite,
        SourcePreset::BingHybrid,
    ];

    /// Name accepted on the command line and in the config file.
    pub fn name(&self) -> &'static str {
        match self {
            SourcePreset::GoogleHybrid => "google-hybrid",
            SourcePreset::GoogleSatellite => "google-satellite",
            SourcePreset::BingHybrid => "bing-hybrid",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            SourcePreset::GoogleHybrid | SourcePreset::GoogleSatellite => {
                "http://mt0.google.com/vt/lyrs={layer}&hl=en&x={x}&y={y}&z={z}"
            }
            SourcePreset::BingHybrid => {
                "https://t.ssl.ak.dynamic.tiles.virtualearth.net/comp/ch/{z}/{x}/{y}?mkt=en-US&it=A&og=1&n=z"
            }
        }
    }

    fn default_layer(&self) -> &'static str {
        match self {
            SourcePreset::GoogleHybrid => "y",
            SourcePreset::GoogleSatellite => "s",
            SourcePreset::BingHybrid => "hybrid",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SourcePreset::GoogleHybrid => "google_hybrid",
            SourcePreset::GoogleSatellite => "google_satellite",
            SourcePreset::BingHybrid => "bing_hybrid",
        }
    }
}

impl FromStr for SourcePreset {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        SourcePreset::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| TemplateError::UnknownPreset(s.to_string()))
    }
}

impl fmt::Display for SourcePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where tiles come from: a URL template, the layer substituted into it,
/// and a short label that ends up in region identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    template: UrlTemplate,
    layer: String,
    label: String,
}

impl TileSource {
    /// Source for a built-in preset.
    pub fn preset(preset: SourcePreset) -> Self {
        let raw = preset.template();
        // Preset templates only use known placeholders.
        let segments = scan(raw).unwrap_or_else(|_| vec![Segment::Literal(raw.to_string())]);
        Self {
            template: UrlTemplate {
                raw: raw.to_string(),
                segments,
            },
            layer: preset.default_layer().to_string(),
            label: preset.label().to_string(),
        }
    }

    /// Source for a user supplied template.
    pub fn custom(
        template: UrlTemplate,
        layer: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            template,
            layer: layer.into(),
            label: label.into(),
        }
    }

    /// Builds the source from user choices: a custom template wins over the
    /// preset, and a layer override changes both the substituted layer and
    /// the label, so archives of different layers never share a region id.
    ///
    /// Custom labels carry the template fingerprint (`custom_<hash>` or
    /// `custom_<hash>_<layer>`), so different servers never share one either.
    pub fn resolve(
        preset: SourcePreset,
        template: Option<UrlTemplate>,
        layer: Option<&str>,
    ) -> Self {
        let layer = layer.map(str::trim).filter(|l| !l.is_empty());
        match (template, layer) {
            (Some(template), Some(layer)) => {
                let label = format!("custom_{}_{}", template.fingerprint(), layer);
                Self::custom(template, layer, label)
            }
            (Some(template), None) => {
                let label = format!("custom_{}", template.fingerprint());
                Self::custom(template, "", label)
            }
            (None, Some(layer)) if layer != preset.default_layer() => {
                let label = format!("{}_{}", preset.label(), layer);
                Self {
                    label,
                    ..Self::preset(preset).with_layer(layer)
                }
            }
            (None, _) => Self::preset(preset),
        }
    }

    /// Overrides the layer substituted for `{layer}`.
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Label used when naming regions, e.g. `google_hybrid`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Full URL for a tile.
    pub fn url_for(&self, tile: &TileCoord) -> String {
        self.template.render(tile, &self.layer)
    }
}

impl Default for TileSource {
    fn default() -> Self {
        Self::preset(SourcePreset::GoogleHybrid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(zoom: u8, x: u32, y: u32) -> TileCoord {
        TileCoord::new(zoom, x, y).unwrap()
    }

    #[test]
    fn test_render_xyz_template() {
        let t = UrlTemplate::parse("https://tiles.example/{z}/{x}/{y}.png").unwrap();
        assert_eq!(t.render(&tile(5, 10, 12), ""), "https://tiles.example/5/10/12.png");
    }

    #[test]
    fn test_render_layer_and_zoom_alias() {
        let t = UrlTemplate::parse("http://h/vt?lyrs={layer}&x={x}&y={y}&z={zoom}").unwrap();
        assert_eq!(t.render(&tile(2, 1, 3), "y"), "http://h/vt?lyrs=y&x=1&y=3&z=2");
    }

    #[test]
    fn test_render_quadkey_template() {
        let t = UrlTemplate::parse("https://h/a{quadkey}.jpeg").unwrap();
        assert_eq!(t.render(&tile(3, 3, 5), ""), "https://h/a213.jpeg");
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        let err = UrlTemplate::parse("https://h/{z}/{x}.png").unwrap_err();
        assert!(matches!(err, TemplateError::MissingPlaceholder { missing: "{y}", .. }));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = UrlTemplate::parse("https://h/{z}/{x}/{y}/{s}").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPlaceholder { ref name, .. } if name == "s"));
    }

    #[test]
    fn test_unclosed_brace_rejected() {
        assert!(UrlTemplate::parse("https://h/{z}/{x}/{y").is_err());
    }

    #[test]
    fn test_google_hybrid_preset_url() {
        let source = TileSource::preset(SourcePreset::GoogleHybrid);
        assert_eq!(
            source.url_for(&tile(16, 19295, 24640)),
            "http://mt0.google.com/vt/lyrs=y&hl=en&x=19295&y=24640&z=16"
        );
        assert_eq!(source.label(), "google_hybrid");
    }

    #[test]
    fn test_google_satellite_preset_layer() {
        let source = TileSource::preset(SourcePreset::GoogleSatellite);
        assert!(source.url_for(&tile(1, 0, 0)).contains("lyrs=s"));
    }

    #[test]
    fn test_bing_preset_url() {
        let source = TileSource::preset(SourcePreset::BingHybrid);
        assert_eq!(
            source.url_for(&tile(4, 2, 3)),
            "https://t.ssl.ak.dynamic.tiles.virtualearth.net/comp/ch/4/2/3?mkt=en-US&it=A&og=1&n=z"
        );
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("google-hybrid".parse::<SourcePreset>().unwrap(), SourcePreset::GoogleHybrid);
        assert_eq!("Bing_Hybrid".parse::<SourcePreset>().unwrap(), SourcePreset::BingHybrid);
        assert!("osm".parse::<SourcePreset>().is_err());
    }

    #[test]
    fn test_resolve_preset_only() {
        let source = TileSource::resolve(SourcePreset::GoogleSatellite, None, None);
        assert_eq!(source, TileSource::preset(SourcePreset::GoogleSatellite));
    }

    #[test]
    fn test_resolve_layer_override_changes_label() {
        let source = TileSource::resolve(SourcePreset::GoogleHybrid, None, Some("m"));
        assert_eq!(source.layer(), "m");
        assert_eq!(source.label(), "google_hybrid_m");
        assert!(source.url_for(&tile(1, 0, 0)).contains("lyrs=m"));

        let same = TileSource::resolve(SourcePreset::GoogleHybrid, None, Some("y"));
        assert_eq!(same.label(), "google_hybrid");
    }

    #[test]
    fn test_resolve_custom_template() {
        let template = UrlTemplate::parse("https://h/{layer}/{z}/{x}/{y}.png").unwrap();
        let hash = template.fingerprint();
        let source = TileSource::resolve(
            SourcePreset::GoogleHybrid,
            Some(template.clone()),
            Some("ortho"),
        );
        assert_eq!(source.label(), format!("custom_{}_ortho", hash));
        assert_eq!(source.url_for(&tile(2, 1, 1)), "https://h/ortho/2/1/1.png");

        let bare = TileSource::resolve(SourcePreset::GoogleHybrid, Some(template), None);
        assert_eq!(bare.label(), format!("custom_{}", hash));
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let t = UrlTemplate::parse("https://tiles.example/{z}/{x}/{y}.png").unwrap();
        let hash = t.fingerprint();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, UrlTemplate::parse(t.as_str()).unwrap().fingerprint());
    }

    #[test]
    fn test_different_templates_get_different_labels() {
        let osm = UrlTemplate::parse("https://osm.example/{z}/{x}/{y}.png").unwrap();
        let esri = UrlTemplate::parse("https://esri.example/{z}/{y}/{x}").unwrap();

        let a = TileSource::resolve(SourcePreset::GoogleHybrid, Some(osm), None);
        let b = TileSource::resolve(SourcePreset::GoogleHybrid, Some(esri), None);
        assert_ne!(a.label(), b.label());
    }

    #[test]
    fn test_all_presets_parse() {
        for preset in SourcePreset::ALL {
            assert!(UrlTemplate::parse(preset.template()).is_ok(), "{}", preset);
        }
    }
}
