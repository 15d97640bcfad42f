use clap::Parser;

/// Draws choropleth maps of election results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the map. Relative paths inside it are
    /// relative to its directory. See the documentation of the choropleth crate for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The results spreadsheet (.xlsx or .csv). Setting this option overrides
    /// the file that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path) The GeoJSON file with the shapes of the regions. Setting this option
    /// overrides the file that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub boundaries: Option<String>,

    /// (file path) The image to write. The extension selects the format (svg, png, or any
    /// format supported by the converter).
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// If passed as an argument, only the map is drawn.
    #[clap(long, takes_value = false)]
    pub no_legend: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
