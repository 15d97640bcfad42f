//! Builds the legend that is placed next to the map.
//!
//! From top to bottom, the legend contains:
//! - one block per candidate, with the name and the overall share
//! - a ring with the turnout and the shares of the candidates, next to the
//!   grid of the palette colors
//! - bars with the results of past elections
//!
//! The layout adapts to the number of candidates, palette ramps and past results.

use log::debug;

use crate::config::*;
use crate::figure::{num, Element, Figure, Stroke, TextAnchor, TextStyle};

pub const LEGEND_WIDTH: f64 = 300.0;
pub const LEGEND_HEIGHT: f64 = 500.0;

const MARGIN: f64 = 10.0;
const BLOCK_HEIGHT: f64 = 50.0;
const BLOCK_GAP: f64 = 5.0;
const GRID_LEFT: f64 = 190.0;
const GRID_RIGHT: f64 = 295.0;
const GRID_HEIGHT: f64 = 210.0;
const GRID_BORDER: f64 = 5.0;
const GRID_X_GAP: f64 = 5.0;
const GRID_Y_GAP: f64 = 10.0;
const RING_CENTER_X: f64 = 80.0;
const RING_RADII: [f64; 4] = [66.0, 63.0, 60.0, 30.0];
const BAR_LEFT: f64 = 10.0;
const BAR_RIGHT: f64 = 240.0;
const BAR_HEIGHT: f64 = 30.0;
const BAR_GAP: f64 = 10.0;
// Number of points used to draw an arc.
const ARC_POINTS: usize = 50;

#[derive(PartialEq, Debug, Clone)]
pub struct LegendCandidate {
    /// The name displayed in the block.
    pub name: String,
    /// The palette category that gives the color of the candidate.
    pub category: String,
    /// Percentage of the votes.
    pub share: f64,
}

impl LegendCandidate {
    /// Computes the shares from aggregated vote totals, the largest first.
    pub fn from_totals(totals: &[(String, u64)]) -> Vec<LegendCandidate> {
        let total: f64 = totals.iter().map(|(_, c)| *c as f64).sum();
        let mut res: Vec<LegendCandidate> = totals
            .iter()
            .map(|(name, count)| LegendCandidate {
                name: name.clone(),
                category: name.clone(),
                share: if total == 0.0 {
                    0.0
                } else {
                    (*count as f64) * 100.0 / total
                },
            })
            .collect();
        // Stable: equal shares keep the column order.
        res.sort_by(|a, b| b.share.total_cmp(&a.share));
        res
    }
}

/// The result of a previous election, drawn as a bar.
#[derive(PartialEq, Debug, Clone)]
pub struct PastResult {
    pub year: String,
    pub category: String,
    pub share: f64,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct LegendSpec {
    pub candidates: Vec<LegendCandidate>,
    /// Turnout in percent. The outer ring is not drawn without it.
    pub turnout: Option<f64>,
    pub past_results: Vec<PastResult>,
    /// Labels under the palette columns. The categories are used when empty.
    pub column_labels: Vec<String>,
}

/// Builds the legend figure.
pub fn compose_legend(spec: &LegendSpec, palette: &Palette) -> Result<Figure, ChoroplethErrors> {
    validate(spec)?;

    let blocks_bottom = MARGIN + (spec.candidates.len() as f64) * (BLOCK_HEIGHT + BLOCK_GAP);
    let middle_top = blocks_bottom + BLOCK_GAP;
    let middle_bottom = middle_top + GRID_HEIGHT + 2.0 * MARGIN;
    let num_bars = spec.past_results.len() as f64;
    let bars_height = num_bars * (BAR_HEIGHT + BAR_GAP);
    let height = LEGEND_HEIGHT.max(middle_bottom + bars_height + MARGIN);
    debug!(
        "compose_legend: {} candidates, {} past results, height {}",
        spec.candidates.len(),
        spec.past_results.len(),
        height
    );

    let mut fig = Figure::new(LEGEND_WIDTH, height);
    draw_candidate_blocks(&mut fig, spec, palette);
    draw_ring(
        &mut fig,
        spec,
        palette,
        (RING_CENTER_X, middle_top + GRID_HEIGHT / 2.0),
    );
    draw_palette_grid(&mut fig, spec, palette, middle_top);
    draw_bars(&mut fig, spec, palette, middle_bottom);
    Ok(fig)
}

fn validate(spec: &LegendSpec) -> Result<(), ChoroplethErrors> {
    let total: f64 = spec.candidates.iter().map(|c| c.share).sum();
    if total > 100.0 + 1e-9 {
        return Err(ChoroplethErrors::InvalidLegend(format!(
            "the sum of the results should not be greater than 100, {} > 100",
            total
        )));
    }
    let out_of_range = |x: f64| !(0.0..=100.0).contains(&x);
    if let Some(c) = spec.candidates.iter().find(|c| out_of_range(c.share)) {
        return Err(ChoroplethErrors::InvalidLegend(format!(
            "invalid result for {}: {}",
            c.name, c.share
        )));
    }
    if let Some(p) = spec.past_results.iter().find(|p| out_of_range(p.share)) {
        return Err(ChoroplethErrors::InvalidLegend(format!(
            "invalid result for {}: {}",
            p.year, p.share
        )));
    }
    match spec.turnout {
        Some(t) if out_of_range(t) => Err(ChoroplethErrors::InvalidLegend(format!(
            "the turnout should be between 0 and 100, not {}",
            t
        ))),
        _ => Ok(()),
    }
}

/// The representative color of a category: the second shade of its ramp.
fn category_color(palette: &Palette, category: &str) -> Color {
    palette
        .ramp(category)
        .and_then(|r| r.colors.get(1).or_else(|| r.colors.first()))
        .cloned()
        .unwrap_or(palette.color_other)
}

fn format_percent(x: f64) -> String {
    format!("{:.1}%", x)
}

fn draw_candidate_blocks(fig: &mut Figure, spec: &LegendSpec, palette: &Palette) {
    for (idx, c) in spec.candidates.iter().enumerate() {
        let y = MARGIN + (idx as f64) * (BLOCK_HEIGHT + BLOCK_GAP);
        fig.add_rect(
            MARGIN,
            y,
            LEGEND_WIDTH - 2.0 * MARGIN,
            BLOCK_HEIGHT,
            category_color(palette, &c.category),
        );
        let center = y + BLOCK_HEIGHT / 2.0;
        fig.add_text(
            2.0 * MARGIN,
            center,
            &c.name,
            TextStyle::new(20.0).anchor(TextAnchor::Start),
        );
        fig.add_text(
            LEGEND_WIDTH - 2.0 * MARGIN,
            center,
            &format_percent(c.share),
            TextStyle::new(20.0).anchor(TextAnchor::End),
        );
    }
}

fn draw_ring(fig: &mut Figure, spec: &LegendSpec, palette: &Palette, center: (f64, f64)) {
    let (cx, cy) = center;
    let [outer, gap, inner, hole] = RING_RADII;
    if let Some(turnout) = spec.turnout {
        fig.push(sector(center, outer, 0.0, turnout * 3.6, palette.color_other));
        fig.push(disk(center, gap, Color::WHITE));
    }
    let mut start = 0.0;
    for c in spec.candidates.iter() {
        let end = start + c.share * 3.6;
        fig.push(sector(
            center,
            inner,
            start,
            end,
            category_color(palette, &c.category),
        ));
        start = end;
    }
    fig.push(sector(center, inner, start, 360.0, palette.color_other));
    fig.push(disk(center, hole, Color::WHITE));
    if let Some(turnout) = spec.turnout {
        fig.add_text(cx, cy, &format_percent(turnout), TextStyle::new(15.5));
    }
}

fn disk(center: (f64, f64), r: f64, fill: Color) -> Element {
    Element::Circle {
        cx: center.0,
        cy: center.1,
        r,
        fill: Some(fill),
        stroke: None,
    }
}

/// A pie slice going clockwise from `start` to `end`, in degrees from the top.
fn sector(center: (f64, f64), r: f64, start: f64, end: f64, fill: Color) -> Element {
    if end - start >= 360.0 {
        return disk(center, r, fill);
    }
    let (cx, cy) = center;
    let mut d = format!("M{},{}", num(cx), num(cy));
    for i in 0..ARC_POINTS {
        let angle = (start + (end - start) * (i as f64) / ((ARC_POINTS - 1) as f64)).to_radians();
        let x = cx + r * angle.sin();
        let y = cy - r * angle.cos();
        d.push_str(&format!(" L{},{}", num(x), num(y)));
    }
    d.push_str(" Z");
    Element::Path {
        id: None,
        d,
        fill: Some(fill),
        stroke: None,
    }
}

fn draw_palette_grid(fig: &mut Figure, spec: &LegendSpec, palette: &Palette, top: f64) {
    let num_cols = palette.ramps.len() as f64;
    let num_rows = palette.num_buckets() as f64;
    let block_w =
        ((GRID_RIGHT - GRID_LEFT) - 2.0 * GRID_BORDER - GRID_X_GAP * (num_cols - 1.0)) / num_cols;
    let block_h = (GRID_HEIGHT - 2.0 * GRID_BORDER - GRID_Y_GAP * (num_rows - 1.0)) / num_rows;
    let x0 = GRID_LEFT + GRID_BORDER;
    let y0 = top + GRID_BORDER;

    for (col, ramp) in palette.ramps.iter().enumerate() {
        let x = x0 + (col as f64) * (block_w + GRID_X_GAP);
        for (row, color) in ramp.colors.iter().enumerate() {
            let y = y0 + (row as f64) * (block_h + GRID_Y_GAP);
            fig.add_rect(x, y, block_w, block_h, *color);
        }
        let label = spec
            .column_labels
            .get(col)
            .cloned()
            .unwrap_or_else(|| ramp.category.clone());
        fig.add_text(
            x + block_w / 2.0,
            y0 + GRID_HEIGHT - GRID_BORDER + MARGIN,
            &label,
            TextStyle::new(13.0),
        );
    }
    for (row, t) in palette.thresholds[..palette.num_buckets()].iter().enumerate() {
        let y = y0 + (row as f64) * (block_h + GRID_Y_GAP) + block_h / 2.0;
        fig.add_text(
            GRID_LEFT - GRID_BORDER,
            y,
            &format!(">{}%", num(*t)),
            TextStyle::new(13.5).anchor(TextAnchor::End),
        );
    }
}

fn draw_bars(fig: &mut Figure, spec: &LegendSpec, palette: &Palette, top: f64) {
    if spec.past_results.is_empty() {
        return;
    }
    let bar_width = BAR_RIGHT - BAR_LEFT;
    for (idx, p) in spec.past_results.iter().enumerate() {
        let y = top + (idx as f64) * (BAR_HEIGHT + BAR_GAP);
        fig.add_rect(BAR_LEFT, y, bar_width, BAR_HEIGHT, COLOR_NEUTRAL);
        fig.add_rect(
            BAR_LEFT,
            y,
            bar_width * p.share / 100.0,
            BAR_HEIGHT,
            category_color(palette, &p.category),
        );
        let center = y + BAR_HEIGHT / 2.0;
        fig.add_text(
            BAR_LEFT + 2.0 * BAR_GAP,
            center,
            &format_percent(p.share),
            TextStyle::new(14.0).anchor(TextAnchor::Start),
        );
        fig.add_text(
            (BAR_RIGHT + LEGEND_WIDTH) / 2.0,
            center,
            &p.year,
            TextStyle::new(14.0),
        );
    }
    let middle = (BAR_LEFT + BAR_RIGHT) / 2.0;
    let bottom = top + (spec.past_results.len() as f64) * (BAR_HEIGHT + BAR_GAP) - BAR_GAP;
    fig.push(Element::Line {
        x1: middle,
        y1: top,
        x2: middle,
        y2: bottom,
        stroke: Stroke {
            color: palette.color_other,
            width: 2.0,
            dash: Some((2.0, 2.0)),
        },
    });
}
