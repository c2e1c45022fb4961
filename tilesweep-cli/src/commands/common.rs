//! Common arguments and resolution shared across CLI commands.
//!
//! Command line flags override config file values, which override the
//! library defaults.

use clap::Args;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tilesweep::boundary::{load_polygons, KmlBoundaryReader};
use tilesweep::config::ConfigFile;
use tilesweep::pipeline::PipelineConfig;
use tilesweep::provider::{SourcePreset, TileSource, UrlTemplate};
use tilesweep::region::{Polygon, ZoomRange};

use crate::error::CliError;

/// Flags that shape the plan and the fetch.
#[derive(Debug, Clone, Default, Args)]
pub struct PipelineArgs {
    /// Root directory for raw tiles, archives and bundles
    #[arg(long)]
    pub tiles_dir: Option<PathBuf>,

    /// Lowest zoom level fetched
    #[arg(long)]
    pub min_zoom: Option<u8>,

    /// Highest zoom level fetched
    #[arg(long)]
    pub max_zoom: Option<u8>,

    /// Maximum tile requests in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Pause between regions that fetched tiles, in seconds
    #[arg(long)]
    pub cooldown_secs: Option<u64>,

    /// Per-tile timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Built-in imagery source (google-hybrid, google-satellite, bing-hybrid)
    #[arg(long, value_parser = parse_preset)]
    pub preset: Option<SourcePreset>,

    /// Custom URL template with {x} {y} {z} or {quadkey}
    #[arg(long)]
    pub url_template: Option<String>,

    /// Layer substituted for {layer}
    #[arg(long)]
    pub layer: Option<String>,
}

fn parse_preset(s: &str) -> Result<SourcePreset, String> {
    SourcePreset::from_str(s).map_err(|e| e.to_string())
}

/// Tile source from flags, falling back to the `[source]` section.
///
/// A `--preset` on the command line replaces a template from the file.
pub fn resolve_source(args: &PipelineArgs, config: &ConfigFile) -> Result<TileSource, CliError> {
    let template = match (&args.url_template, args.preset) {
        (Some(raw), _) => Some(
            UrlTemplate::parse(raw)
                .map_err(|e| CliError::Config(format!("--url-template: {}", e)))?,
        ),
        (None, Some(_)) => None,
        (None, None) => config.source.url_template.clone(),
    };
    let preset = args.preset.unwrap_or(config.source.preset);
    let layer = args.layer.as_deref().or(config.source.layer.as_deref());
    Ok(TileSource::resolve(preset, template, layer))
}

/// Pipeline configuration from flags over the config file.
pub fn resolve_pipeline_config(
    args: &PipelineArgs,
    config: &ConfigFile,
) -> Result<PipelineConfig, CliError> {
    let file_zooms = config.pipeline.zooms;
    let min = args.min_zoom.unwrap_or(file_zooms.min());
    let max = args.max_zoom.unwrap_or(file_zooms.max());
    let zooms = ZoomRange::new(min, max).map_err(|e| CliError::Config(e.to_string()))?;

    let mut pipeline = config
        .pipeline_config()
        .with_zooms(zooms)
        .with_source(resolve_source(args, config)?);

    if let Some(dir) = &args.tiles_dir {
        pipeline = pipeline.with_tiles_dir(dir);
    }
    if let Some(concurrency) = args.concurrency {
        pipeline = pipeline.with_concurrency(concurrency);
    }
    if let Some(secs) = args.cooldown_secs {
        pipeline = pipeline.with_cooldown(Duration::from_secs(secs));
    }
    if let Some(secs) = args.timeout_secs {
        pipeline = pipeline.with_fetch_timeout(Duration::from_secs(secs));
    }

    pipeline
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(pipeline)
}

/// Every polygon in the `.kml` files of `dir`.
pub fn load_boundaries(dir: &Path) -> Result<Vec<Polygon>, CliError> {
    Ok(load_polygons(&KmlBoundaryReader, dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_uses_config_file() {
        let mut config = ConfigFile::default();
        config.fetch.concurrency = 3;
        config.pipeline.zooms = ZoomRange::new(2, 5).unwrap();

        let pipeline = resolve_pipeline_config(&PipelineArgs::default(), &config).unwrap();
        assert_eq!(pipeline.concurrency(), 3);
        assert_eq!(pipeline.zooms(), ZoomRange::new(2, 5).unwrap());
        assert_eq!(pipeline.source(), &config.tile_source());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut config = ConfigFile::default();
        config.pipeline.zooms = ZoomRange::new(2, 5).unwrap();

        let args = PipelineArgs {
            tiles_dir: Some(PathBuf::from("/data/tiles")),
            max_zoom: Some(9),
            concurrency: Some(20),
            cooldown_secs: Some(0),
            timeout_secs: Some(5),
            ..PipelineArgs::default()
        };
        let pipeline = resolve_pipeline_config(&args, &config).unwrap();

        assert_eq!(pipeline.tiles_dir(), Path::new("/data/tiles"));
        assert_eq!(pipeline.zooms(), ZoomRange::new(2, 9).unwrap());
        assert_eq!(pipeline.concurrency(), 20);
        assert_eq!(pipeline.cooldown(), Duration::ZERO);
        assert_eq!(pipeline.fetch_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_inverted_zoom_flags_rejected() {
        let args = PipelineArgs {
            min_zoom: Some(10),
            max_zoom: Some(4),
            ..PipelineArgs::default()
        };
        let err = resolve_pipeline_config(&args, &ConfigFile::default()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_zero_concurrency_flag_rejected() {
        let args = PipelineArgs {
            concurrency: Some(0),
            ..PipelineArgs::default()
        };
        assert!(resolve_pipeline_config(&args, &ConfigFile::default()).is_err());
    }

    #[test]
    fn test_preset_flag_replaces_config_template() {
        let mut config = ConfigFile::default();
        config.source.url_template = Some(UrlTemplate::parse("https://t/{z}/{x}/{y}").unwrap());

        let args = PipelineArgs {
            preset: Some(SourcePreset::BingHybrid),
            ..PipelineArgs::default()
        };
        let source = resolve_source(&args, &config).unwrap();
        assert_eq!(source, TileSource::preset(SourcePreset::BingHybrid));

        let source = resolve_source(&PipelineArgs::default(), &config).unwrap();
        assert_eq!(source.template().as_str(), "https://t/{z}/{x}/{y}");
        assert!(source.label().starts_with("custom_"));
    }

    #[test]
    fn test_bad_template_flag_rejected() {
        let args = PipelineArgs {
            url_template: Some("https://t/{z}".to_string()),
            ..PipelineArgs::default()
        };
        assert!(resolve_source(&args, &ConfigFile::default()).is_err());
    }

    #[test]
    fn test_parse_preset() {
        assert_eq!(parse_preset("Google_Satellite"), Ok(SourcePreset::GoogleSatellite));
        assert!(parse_preset("osm").is_err());
    }
}
