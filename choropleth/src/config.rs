// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The data recorded for a region in the results spreadsheet.
#[derive(PartialEq, Debug, Clone)]
pub enum RegionData {
    /// Vote counts for each candidate, in the order of the columns.
    Votes(Vec<(String, u64)>),
    /// A precomputed, signed result between -100 and 100.
    ///
    /// Positive values lean to the first category of the palette, negative
    /// values to the second one.
    Lean(f64),
}

#[derive(PartialEq, Debug, Clone)]
pub struct RegionVotes {
    /// The identifier of the region. It must match the identifier of a
    /// boundary shape (for example a 5-digit FIPS code).
    pub id: String,
    pub name: Option<String>,
    pub data: RegionData,
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Winner {
    Candidate(String),
    /// Several candidates share the highest count. No winner is picked.
    Tie(Vec<String>),
    /// No vote was recorded for this region.
    NoVotes,
    /// A result leans to a side that has no color ramp.
    Other,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RegionTally {
    pub winner: Winner,
    pub total: u64,
    /// The votes of the winner, in percent of the total.
    pub winner_share: f64,
    /// The difference between the two highest counts, in percentage points.
    pub margin: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RegionResult {
    pub id: String,
    pub name: Option<String>,
    pub tally: RegionTally,
    pub fill: Color,
}

/// Errors that prevent the map or the legend from being built.
#[derive(PartialEq, Debug, Clone)]
pub enum ChoroplethErrors {
    InvalidColor(String),
    InvalidPalette(String),
    /// A region does not have a matching boundary shape.
    UnknownRegion(String),
    /// Nothing could be drawn on the map.
    EmptyMap,
    /// The boundary of a region has no polygon with at least three points.
    EmptyShape(String),
    /// The sum of the votes of a region or of a candidate does not fit in 64 bits.
    VoteOverflow(String),
    InvalidLegend(String),
    InvalidViewBox(String),
}

impl Error for ChoroplethErrors {}

impl Display for ChoroplethErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChoroplethErrors::InvalidColor(s) => write!(f, "invalid color {:?}", s),
            ChoroplethErrors::InvalidPalette(s) => write!(f, "invalid palette: {}", s),
            ChoroplethErrors::UnknownRegion(id) => {
                write!(f, "region {:?} has no matching boundary shape", id)
            }
            ChoroplethErrors::EmptyMap => write!(f, "no region to draw on the map"),
            ChoroplethErrors::EmptyShape(id) => {
                write!(f, "the boundary of region {:?} has no drawable polygon", id)
            }
            ChoroplethErrors::VoteOverflow(id) => {
                write!(f, "too many votes for {:?}", id)
            }
            ChoroplethErrors::InvalidLegend(s) => write!(f, "invalid legend: {}", s),
            ChoroplethErrors::InvalidViewBox(s) => write!(f, "invalid view box {:?}", s),
        }
    }
}

// ********* Configuration **********

/// An opaque RGB color.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const WHITE: Color = Color(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color(0, 0, 0);

    /// Parses `#RRGGBB` or `#RGB`.
    pub fn parse_hex(s: &str) -> Result<Color, ChoroplethErrors> {
        let err = || ChoroplethErrors::InvalidColor(s.to_string());
        let digits = s.strip_prefix('#').ok_or_else(err)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| err());
        match digits.len() {
            6 => Ok(Color(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                let c = |i: usize| channel(&digits[i..i + 1]).map(|x| x * 17);
                Ok(Color(c(0)?, c(1)?, c(2)?))
            }
            _ => Err(err()),
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// The value that selects the shade of a region within the ramp of its winner.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ShadeMetric {
    /// Percentage of the votes obtained by the winner.
    WinnerShare,
    /// Difference between the winner and the runner-up, in percentage points.
    Margin,
}

/// The shades used for one winning category, from the lightest to the darkest.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PaletteRamp {
    pub category: String,
    pub colors: Vec<Color>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Palette {
    pub(crate) ramps: Vec<PaletteRamp>,
    pub(crate) thresholds: Vec<f64>,
    pub(crate) metric: ShadeMetric,
    pub(crate) color_other: Color,
    pub(crate) color_tie: Color,
}

pub const COLORS_GREEN: [Color; 6] = [
    Color(0xAF, 0xE9, 0xAF),
    Color(0x73, 0xD8, 0x73),
    Color(0x42, 0xCA, 0x42),
    Color(0x30, 0xA6, 0x30),
    Color(0x21, 0x78, 0x21),
    Color(0x16, 0x50, 0x16),
];

pub const COLORS_ORANGE: [Color; 6] = [
    Color(0xFE, 0xE3, 0x91),
    Color(0xFE, 0xD4, 0x63),
    Color(0xFE, 0x99, 0x29),
    Color(0xEC, 0x70, 0x14),
    Color(0xCC, 0x4C, 0x02),
    Color(0x8C, 0x2D, 0x04),
];

pub const THRESH_SHARE: [f64; 7] = [40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];

pub const COLOR_OTHER: Color = Color(0x69, 0x69, 0x69);

/// Background of the result bars, also used for regions without a winner.
pub const COLOR_NEUTRAL: Color = Color(0xEE, 0xEE, 0xEE);

impl Palette {
    /// Checks the consistency of the ramps with the thresholds.
    pub fn new(
        ramps: Vec<PaletteRamp>,
        thresholds: Vec<f64>,
        metric: ShadeMetric,
        color_other: Color,
        color_tie: Color,
    ) -> Result<Palette, ChoroplethErrors> {
        if thresholds.len() < 2 {
            return Err(ChoroplethErrors::InvalidPalette(format!(
                "at least two thresholds are required, got {:?}",
                thresholds
            )));
        }
        if thresholds.iter().any(|t| !t.is_finite())
            || thresholds.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(ChoroplethErrors::InvalidPalette(format!(
                "thresholds must be finite and strictly increasing: {:?}",
                thresholds
            )));
        }
        if ramps.is_empty() {
            return Err(ChoroplethErrors::InvalidPalette(
                "no color ramp provided".to_string(),
            ));
        }
        let num_buckets = thresholds.len() - 1;
        for (idx, ramp) in ramps.iter().enumerate() {
            if ramp.colors.len() != num_buckets {
                return Err(ChoroplethErrors::InvalidPalette(format!(
                    "ramp {:?} has {} colors, {} expected",
                    ramp.category,
                    ramp.colors.len(),
                    num_buckets
                )));
            }
            if ramps[..idx].iter().any(|r| r.category == ramp.category) {
                return Err(ChoroplethErrors::InvalidPalette(format!(
                    "duplicate category {:?}",
                    ramp.category
                )));
            }
        }
        Ok(Palette {
            ramps,
            thresholds,
            metric,
            color_other,
            color_tie,
        })
    }

    /// The green/orange palette on the share of the winner, for two categories.
    pub fn two_party(first: &str, second: &str) -> Palette {
        Palette {
            ramps: vec![
                PaletteRamp {
                    category: first.to_string(),
                    colors: COLORS_GREEN.to_vec(),
                },
                PaletteRamp {
                    category: second.to_string(),
                    colors: COLORS_ORANGE.to_vec(),
                },
            ],
            thresholds: THRESH_SHARE.to_vec(),
            metric: ShadeMetric::WinnerShare,
            color_other: COLOR_OTHER,
            color_tie: COLOR_NEUTRAL,
        }
    }

    pub fn ramps(&self) -> &[PaletteRamp] {
        &self.ramps
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn metric(&self) -> ShadeMetric {
        self.metric
    }

    pub fn color_other(&self) -> Color {
        self.color_other
    }

    pub fn color_tie(&self) -> Color {
        self.color_tie
    }

    pub fn num_buckets(&self) -> usize {
        self.thresholds.len() - 1
    }

    pub fn ramp(&self, category: &str) -> Option<&PaletteRamp> {
        self.ramps.iter().find(|r| r.category == category)
    }
}
