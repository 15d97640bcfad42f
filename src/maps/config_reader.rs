use crate::maps::export::ExternalTool;
use crate::maps::*;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "mapName")]
    pub map_name: Option<String>,
    /// The image to write. The extension selects the format.
    #[serde(rename = "outputPath")]
    pub output_path: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(rename = "viewBox")]
    pub view_box: Option<String>,
    #[serde(rename = "drawLegend")]
    pub draw_legend: Option<bool>,
    /// Also writes the legend alone to this path.
    #[serde(rename = "legendPath")]
    pub legend_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    /// `xlsx` or `csv`. Guessed from the extension when missing.
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "idColumn")]
    pub id_column: Option<String>,
    /// Pads numeric identifiers with leading zeros up to this width.
    #[serde(rename = "idWidth")]
    pub id_width: Option<usize>,
    #[serde(rename = "nameColumn")]
    pub name_column: Option<String>,
    /// A column with a precomputed result between -100 and 100.
    #[serde(rename = "resultColumn")]
    pub result_column: Option<String>,
    #[serde(rename = "candidateColumns")]
    pub candidate_columns: Option<Vec<String>>,
}

impl DataSource {
    pub fn id_column(&self) -> String {
        self.id_column.clone().unwrap_or_else(|| "id".to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BoundarySource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "idProperty")]
    pub id_property: Option<String>,
    /// `mercator` (default) or `equirectangular`.
    pub projection: Option<String>,
}

impl BoundarySource {
    pub fn id_property(&self) -> String {
        self.id_property
            .clone()
            .unwrap_or_else(|| "GEOID".to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RampSettings {
    pub category: String,
    pub colors: Vec<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaletteSettings {
    /// `share` (default) or `margin`.
    #[serde(rename = "shadeBy")]
    pub shade_by: Option<String>,
    pub thresholds: Option<Vec<f64>>,
    pub ramps: Option<Vec<RampSettings>>,
    #[serde(rename = "colorOther")]
    pub color_other: Option<String>,
    #[serde(rename = "colorTie")]
    pub color_tie: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LegendCandidateSettings {
    pub name: String,
    pub category: Option<String>,
    pub share: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PastResultSettings {
    pub year: String,
    pub category: String,
    pub share: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LegendSettings {
    pub candidates: Option<Vec<LegendCandidateSettings>>,
    pub turnout: Option<f64>,
    #[serde(rename = "pastResults")]
    pub past_results: Option<Vec<PastResultSettings>>,
    #[serde(rename = "columnLabels")]
    pub column_labels: Option<Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PlacesSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "nameColumn")]
    pub name_column: Option<String>,
    #[serde(rename = "latColumn")]
    pub lat_column: Option<String>,
    #[serde(rename = "lonColumn")]
    pub lon_column: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "dataSource")]
    pub data_source: DataSource,
    pub boundaries: BoundarySource,
    pub palette: Option<PaletteSettings>,
    pub legend: Option<LegendSettings>,
    #[serde(rename = "placesSource")]
    pub places_source: Option<PlacesSource>,
    pub renderer: Option<ExternalTool>,
    pub converter: Option<ExternalTool>,
}

impl MapConfig {
    /// A configuration made only of command line arguments.
    pub fn from_overrides(overrides: &Overrides) -> MapResult<MapConfig> {
        let (input, boundaries, out) =
            match (&overrides.input, &overrides.boundaries, &overrides.out) {
                (Some(i), Some(b), Some(o)) => (i.clone(), b.clone(), o.clone()),
                _ => whatever!(
                    "Without a configuration file, the input, the boundaries and the output must be provided"
                ),
            };
        Ok(MapConfig {
            output_settings: OutputSettings {
                map_name: None,
                output_path: out,
                width: None,
                height: None,
                view_box: None,
                draw_legend: None,
                legend_path: None,
            },
            data_source: DataSource {
                provider: None,
                file_path: input,
                excel_worksheet_name: None,
                id_column: None,
                id_width: None,
                name_column: None,
                result_column: None,
                candidate_columns: None,
            },
            boundaries: BoundarySource {
                file_path: boundaries,
                id_property: None,
                projection: None,
            },
            palette: None,
            legend: None,
            places_source: None,
            renderer: None,
            converter: None,
        })
    }

    /// Relative paths given on the command line are relative to the current directory.
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> MapResult<()> {
        if let Some(i) = &overrides.input {
            self.data_source.file_path = from_current_dir(i)?;
        }
        if let Some(b) = &overrides.boundaries {
            self.boundaries.file_path = from_current_dir(b)?;
        }
        if let Some(o) = &overrides.out {
            self.output_settings.output_path = from_current_dir(o)?;
        }
        if overrides.no_legend {
            self.output_settings.draw_legend = Some(false);
        }
        Ok(())
    }
}

fn from_current_dir(p: &str) -> MapResult<String> {
    let path = Path::new(p);
    if path.is_absolute() {
        return Ok(p.to_string());
    }
    let cwd = std::env::current_dir().whatever_context("Cannot read the current directory")?;
    Ok(cwd.join(path).display().to_string())
}

pub fn read_config(path: &str) -> MapResult<MapConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: MapConfig =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu { path })?;
    Ok(config)
}
