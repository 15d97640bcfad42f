use log::{debug, info, warn};

use choropleth::figure::{Figure, ViewBox};
use choropleth::legend::{compose_legend, LegendCandidate, LegendSpec, PastResult};
use choropleth::map::{render_map, MapOptions};
use choropleth::projection::Projection;
use choropleth::*;
use snafu::{prelude::*, Snafu};

use std::path::{Path, PathBuf};

use crate::maps::config_reader::*;
use crate::maps::export::*;
use crate::maps::io_common::*;

pub mod config_reader;
pub mod export;
mod io_common;
mod io_csv;
mod io_excel;
mod io_geojson;

/// The families of errors. All of them stop the run.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ErrorKind {
    /// The configuration or one of the auxiliary files is invalid.
    Config,
    /// A row of the results spreadsheet is malformed.
    DataFormat,
    /// The map or the legend cannot be drawn.
    Render,
    /// The image cannot be written.
    Export,
}

#[derive(Debug, Snafu)]
pub enum MapError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid palette"))]
    InvalidPalette { source: ChoroplethErrors },
    #[snafu(display("Invalid view box"))]
    InvalidViewBox { source: ChoroplethErrors },
    #[snafu(display("Feature {index} of {path} has no identifier"))]
    MissingGeoId { index: usize, path: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},

    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Could not find the column {column:?} in the header of {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Line {lineno}: the region identifier is empty"))]
    EmptyRegionId { lineno: usize },
    #[snafu(display("Line {lineno}: column {column:?} should contain a vote count, found {content:?}"))]
    NonNumericVote {
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("Line {lineno}: column {column:?} should contain a number, found {content:?}"))]
    NonNumericField {
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("Line {lineno}: region {id} was already defined"))]
    DuplicateRegion { lineno: usize, id: String },
    #[snafu(display("Could not add up the votes"))]
    VoteTotals { source: ChoroplethErrors },

    #[snafu(display("Could not draw the map"))]
    Rendering { source: ChoroplethErrors },
    #[snafu(display("Could not draw the legend"))]
    Legend { source: ChoroplethErrors },

    #[snafu(display("Error writing file {path}"))]
    WritingImage {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot find the image format of {path}: an extension such as .svg or .png is required"))]
    UnsupportedFormat { path: String },
    #[snafu(display("Could not run {program}, is it installed?"))]
    ToolUnavailable {
        source: std::io::Error,
        program: String,
    },
    #[snafu(display("{program} failed with {status}: {stderr}"))]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[snafu(display("{program} did not produce {path}"))]
    ToolNoOutput { program: String, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

impl MapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapError::OpeningJson { .. }
            | MapError::ParsingJson { .. }
            | MapError::InvalidPalette { .. }
            | MapError::InvalidViewBox { .. }
            | MapError::MissingGeoId { .. }
            | MapError::MissingParentDir { .. }
            | MapError::Whatever { .. } => ErrorKind::Config,
            MapError::OpeningExcel { .. }
            | MapError::EmptyExcel { .. }
            | MapError::CsvOpen { .. }
            | MapError::CsvLineParse { .. }
            | MapError::MissingColumn { .. }
            | MapError::EmptyRegionId { .. }
            | MapError::NonNumericVote { .. }
            | MapError::NonNumericField { .. }
            | MapError::DuplicateRegion { .. }
            | MapError::VoteTotals { .. } => ErrorKind::DataFormat,
            MapError::Rendering { .. } | MapError::Legend { .. } => ErrorKind::Render,
            MapError::WritingImage { .. }
            | MapError::UnsupportedFormat { .. }
            | MapError::ToolUnavailable { .. }
            | MapError::ToolFailed { .. }
            | MapError::ToolNoOutput { .. } => ErrorKind::Export,
        }
    }
}

pub type MapResult<T> = Result<T, MapError>;

/// Settings given on the command line. They take precedence over the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<String>,
    pub boundaries: Option<String>,
    pub out: Option<String>,
    pub no_legend: bool,
}

/// The categories of the default palette: the first two candidates, or the
/// two signs of the result when the regions have no vote counts.
fn default_categories(regions: &[RegionVotes]) -> Vec<String> {
    let candidates: Vec<String> = regions
        .iter()
        .find_map(|r| match &r.data {
            RegionData::Votes(votes) => {
                Some(votes.iter().take(2).map(|(n, _)| n.clone()).collect())
            }
            RegionData::Lean(_) => None,
        })
        .unwrap_or_default();
    if candidates.is_empty() {
        vec!["up".to_string(), "down".to_string()]
    } else {
        candidates
    }
}

fn default_ramps(regions: &[RegionVotes]) -> Vec<PaletteRamp> {
    default_categories(regions)
        .into_iter()
        .zip([COLORS_GREEN, COLORS_ORANGE])
        .map(|(category, colors)| PaletteRamp {
            category,
            colors: colors.to_vec(),
        })
        .collect()
}

fn validate_palette(
    settings: &Option<PaletteSettings>,
    regions: &[RegionVotes],
) -> MapResult<Palette> {
    let default_settings = PaletteSettings::default();
    let settings = settings.as_ref().unwrap_or(&default_settings);

    let ramps: Vec<PaletteRamp> = match &settings.ramps {
        Some(ramps) => {
            let mut res: Vec<PaletteRamp> = Vec::new();
            for r in ramps.iter() {
                let mut colors: Vec<Color> = Vec::new();
                for c in r.colors.iter() {
                    colors.push(Color::parse_hex(c).context(InvalidPaletteSnafu {})?);
                }
                res.push(PaletteRamp {
                    category: r.category.clone(),
                    colors,
                });
            }
            res
        }
        None => default_ramps(regions),
    };
    let metric = match settings.shade_by.as_deref() {
        None | Some("share") => ShadeMetric::WinnerShare,
        Some("margin") => ShadeMetric::Margin,
        Some(x) => whatever!("Unknown shading mode {:?}, expected 'share' or 'margin'", x),
    };
    let parse_color = |c: &Option<String>, default: Color| -> MapResult<Color> {
        match c {
            Some(s) => Color::parse_hex(s).context(InvalidPaletteSnafu {}),
            None => Ok(default),
        }
    };
    Palette::new(
        ramps,
        settings
            .thresholds
            .clone()
            .unwrap_or_else(|| THRESH_SHARE.to_vec()),
        metric,
        parse_color(&settings.color_other, COLOR_OTHER)?,
        parse_color(&settings.color_tie, COLOR_NEUTRAL)?,
    )
    .context(InvalidPaletteSnafu {})
}

fn validate_projection(s: &Option<String>) -> MapResult<Projection> {
    match s.as_deref() {
        None | Some("mercator") => Ok(Projection::Mercator),
        Some("equirectangular") => Ok(Projection::Equirectangular),
        Some(x) => whatever!(
            "Cannot use projection {:?}: expected 'mercator' or 'equirectangular'",
            x
        ),
    }
}

fn build_legend_spec(
    settings: &Option<LegendSettings>,
    regions: &[RegionVotes],
) -> MapResult<LegendSpec> {
    let totals = aggregate_votes(regions).context(VoteTotalsSnafu {})?;
    let computed = LegendCandidate::from_totals(&totals);
    let settings = match settings {
        Some(s) => s.clone(),
        None => {
            return Ok(LegendSpec {
                candidates: computed,
                ..LegendSpec::default()
            })
        }
    };
    let candidates: Vec<LegendCandidate> = match settings.candidates {
        Some(cands) => cands
            .iter()
            .map(|c| {
                let category = c.category.clone().unwrap_or_else(|| c.name.clone());
                let share = c.share.unwrap_or_else(|| {
                    computed
                        .iter()
                        .find(|lc| lc.category == category)
                        .map(|lc| lc.share)
                        .unwrap_or(0.0)
                });
                LegendCandidate {
                    name: c.name.clone(),
                    category,
                    share,
                }
            })
            .collect(),
        None => computed,
    };
    Ok(LegendSpec {
        candidates,
        turnout: settings.turnout,
        past_results: settings
            .past_results
            .unwrap_or_default()
            .iter()
            .map(|p| PastResult {
                year: p.year.clone(),
                category: p.category.clone(),
                share: p.share,
            })
            .collect(),
        column_labels: settings.column_labels.unwrap_or_default(),
    })
}

fn resolve(root: &Path, file: &str) -> String {
    root.join(file).display().to_string()
}

/// Runs the whole pipeline: read the results, color the regions, draw the
/// map and its legend, and export the image.
///
/// Returns the path of the image.
pub fn run_map(config_path: Option<String>, overrides: &Overrides) -> MapResult<PathBuf> {
    let (mut config, root): (MapConfig, PathBuf) = match &config_path {
        Some(p) => {
            let config = read_config(p)?;
            let root = Path::new(p).parent().context(MissingParentDirSnafu {})?;
            (config, root.to_path_buf())
        }
        None => (MapConfig::from_overrides(overrides)?, PathBuf::from(".")),
    };
    config.apply_overrides(overrides)?;
    info!("config: {:?}", config);

    let projection = validate_projection(&config.boundaries.projection)?;

    let data_path = resolve(&root, &config.data_source.file_path);
    info!("Attempting to read results file {:?}", data_path);
    let table = read_table(
        &data_path,
        &config.data_source.provider,
        &config.data_source.excel_worksheet_name,
    )?;
    let regions = read_regions(&table, &config.data_source)?;
    info!("Read {} regions", regions.len());

    let palette = validate_palette(&config.palette, &regions)?;
    let results = color_regions(&regions, &palette).context(VoteTotalsSnafu {})?;

    let boundaries_path = resolve(&root, &config.boundaries.file_path);
    info!("Attempting to read boundaries file {:?}", boundaries_path);
    let boundaries =
        io_geojson::read_boundaries(&boundaries_path, &config.boundaries.id_property())?;

    let mut options = MapOptions::new(
        config.output_settings.width.unwrap_or(1000.0),
        config.output_settings.height.unwrap_or(500.0),
    );
    options.projection = projection;
    if let Some(vb) = &config.output_settings.view_box {
        options.view_box = Some(ViewBox::parse(vb).context(InvalidViewBoxSnafu {})?);
    }
    if let Some(ps) = &config.places_source {
        let places_path = resolve(&root, &ps.file_path);
        info!("Attempting to read places file {:?}", places_path);
        let places_table = read_table(&places_path, &ps.provider, &ps.excel_worksheet_name)?;
        options.places = read_places(&places_table, ps)?;
    }

    let map = render_map(&results, &boundaries, &options).context(RenderingSnafu {})?;
    info!("Map complete");

    let renderer = config.renderer.clone().unwrap_or_else(ExternalTool::default_renderer);
    let converter = config
        .converter
        .clone()
        .unwrap_or_else(ExternalTool::default_converter);

    let figure: Figure = if config.output_settings.draw_legend.unwrap_or(true) {
        let spec = build_legend_spec(&config.legend, &regions)?;
        debug!("legend: {:?}", spec);
        let legend = compose_legend(&spec, &palette).context(LegendSnafu {})?;
        info!("Legend complete");
        if let Some(lp) = &config.output_settings.legend_path {
            let legend_out = resolve(&root, lp);
            export_figure(&legend, Path::new(&legend_out), &renderer, &converter)?;
        }
        Figure::beside(map, legend)
    } else {
        if config.legend.is_some() {
            warn!("The legend settings are ignored because the legend is disabled");
        }
        map
    };

    let out = resolve(&root, &config.output_settings.output_path);
    export_figure(&figure, Path::new(&out), &renderer, &converter)
}
