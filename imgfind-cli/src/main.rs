use clap::Parser;
use imgfind::image::codec;
use imgfind::{Images, MatchConfig, MatchRequest, MatchResult, MaxLevel, Region, ScreenMetrics};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "imgfind CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AutoKeyword {
    Auto,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaxLevelJson {
    Level(usize),
    Keyword(AutoKeyword),
}

impl From<MaxLevelJson> for MaxLevel {
    fn from(value: MaxLevelJson) -> Self {
        match value {
            MaxLevelJson::Level(level) => MaxLevel::Fixed(level),
            MaxLevelJson::Keyword(AutoKeyword::Auto) => MaxLevel::Auto,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegionJson {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct DisplayJson {
    logical_width: u32,
    logical_height: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    refine_radius: usize,
    max_candidates: usize,
    min_var_i: f32,
    parallel: bool,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            refine_radius: cfg.refine_radius,
            max_candidates: cfg.max_candidates,
            min_var_i: cfg.min_var_i,
            parallel: cfg.parallel,
        }
    }
}

impl From<MatchConfigJson> for MatchConfig {
    fn from(value: MatchConfigJson) -> Self {
        Self {
            refine_radius: value.refine_radius,
            max_candidates: value.max_candidates,
            min_var_i: value.min_var_i,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    image_path: String,
    template_path: String,
    output_path: Option<String>,
    weak_threshold: f32,
    strong_threshold: f32,
    region: Option<RegionJson>,
    max_level: MaxLevelJson,
    limit: usize,
    display: Option<DisplayJson>,
    #[serde(rename = "match")]
    match_cfg: MatchConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: String::new(),
            template_path: String::new(),
            output_path: None,
            weak_threshold: 0.7,
            strong_threshold: 0.9,
            region: None,
            max_level: MaxLevelJson::Keyword(AutoKeyword::Auto),
            limit: 1,
            display: None,
            match_cfg: MatchConfigJson::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct MatchRecord {
    x: f64,
    y: f64,
    score: f32,
}

impl From<MatchResult> for MatchRecord {
    fn from(value: MatchResult) -> Self {
        Self {
            x: value.point.x,
            y: value.point.y,
            score: value.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    best: Option<MatchRecord>,
    matches: Vec<MatchRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("imgfind=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_path.is_empty() || config.template_path.is_empty() {
        return Err("image_path and template_path must be set in the config".into());
    }
    if config.limit == 0 {
        return Err("limit must be at least 1".into());
    }

    let image = codec::read(&config.image_path)?;
    let template = codec::read(&config.template_path)?;
    let metrics = match &config.display {
        Some(display) => ScreenMetrics::native(image.width(), image.height())
            .with_logical(display.logical_width, display.logical_height),
        None => ScreenMetrics::native(image.width(), image.height()),
    };

    let mut request = MatchRequest::new(image, template)
        .with_thresholds(config.weak_threshold, config.strong_threshold)
        .with_max_level(config.max_level.into())
        .with_limit(config.limit);
    if let Some(region) = config.region {
        request = request.with_region(Region::new(region.x, region.y, region.width, region.height));
    }

    let images = Images::with_config(metrics, config.match_cfg.into());
    let matches: Vec<MatchRecord> = images
        .match_template(request)?
        .into_iter()
        .map(MatchRecord::from)
        .collect();
    let best = matches.first().cloned();
    let output = Output { best, matches };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
