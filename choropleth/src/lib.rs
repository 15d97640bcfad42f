mod config;
pub mod figure;
pub mod legend;
pub mod manual;
pub mod map;
pub mod projection;

use log::{debug, info, warn};

use std::collections::HashMap;

pub use crate::config::*;

/// Computes the winner, the share of the winner and the margin of a region.
///
/// Ties are not broken: when several candidates share the highest count,
/// the outcome is a [`Winner::Tie`] between all of them, in column order.
pub fn tally_region(
    region: &RegionVotes,
    palette: &Palette,
) -> Result<RegionTally, ChoroplethErrors> {
    match &region.data {
        RegionData::Votes(votes) => {
            tally_votes(votes).ok_or_else(|| ChoroplethErrors::VoteOverflow(region.id.clone()))
        }
        RegionData::Lean(lean) => Ok(tally_lean(*lean, palette)),
    }
}

// None when the total does not fit in a u64.
fn tally_votes(votes: &[(String, u64)]) -> Option<RegionTally> {
    let total: u64 = votes.iter().try_fold(0_u64, |acc, (_, c)| acc.checked_add(*c))?;
    if total == 0 {
        return Some(RegionTally {
            winner: Winner::NoVotes,
            total,
            winner_share: 0.0,
            margin: 0.0,
        });
    }
    let top = votes.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let leaders: Vec<String> = votes
        .iter()
        .filter(|(_, c)| *c == top)
        .map(|(name, _)| name.clone())
        .collect();
    // The runner-up is the top count again in case of a tie.
    let runner_up = if leaders.len() > 1 {
        top
    } else {
        votes
            .iter()
            .map(|(_, c)| *c)
            .filter(|c| *c < top)
            .max()
            .unwrap_or(0)
    };
    let winner = match leaders.as_slice() {
        [single] => Winner::Candidate(single.clone()),
        _ => Winner::Tie(leaders),
    };
    Some(RegionTally {
        winner,
        total,
        winner_share: percent(top, total),
        margin: percent(top - runner_up, total),
    })
}

fn tally_lean(lean: f64, palette: &Palette) -> RegionTally {
    let category = |idx: usize| palette.ramps.get(idx).map(|r| r.category.clone());
    let winner = if lean > 0.0 {
        category(0).map(Winner::Candidate)
    } else if lean < 0.0 {
        category(1).map(Winner::Candidate)
    } else {
        Some(Winner::Tie(palette.ramps.iter().map(|r| r.category.clone()).collect()))
    };
    RegionTally {
        winner: winner.unwrap_or(Winner::Other),
        total: 0,
        winner_share: lean.abs(),
        margin: lean.abs(),
    }
}

fn percent(count: u64, total: u64) -> f64 {
    (count as f64) * 100.0 / (total as f64)
}

/// The index of the bucket that contains the value.
///
/// With thresholds `t0 < t1 < ... < tn`, the value `v` is in bucket `i` if
/// `t_i < v <= t_{i+1}`. Values below the range go to the first bucket and
/// values above it to the last one.
pub fn bucket_index(thresholds: &[f64], value: f64) -> usize {
    let num_buckets = thresholds.len().saturating_sub(1);
    if num_buckets == 0 {
        return 0;
    }
    thresholds
        .windows(2)
        .position(|w| w[0] < value && value <= w[1])
        .unwrap_or(if value > thresholds[num_buckets] {
            num_buckets - 1
        } else {
            0
        })
}

/// Selects the color of a region from its tally.
pub fn color_for(tally: &RegionTally, palette: &Palette) -> Color {
    match &tally.winner {
        Winner::Candidate(name) => match palette.ramp(name) {
            Some(ramp) => {
                let intensity = match palette.metric {
                    ShadeMetric::WinnerShare => tally.winner_share,
                    ShadeMetric::Margin => tally.margin,
                };
                ramp.colors[bucket_index(&palette.thresholds, intensity)]
            }
            None => palette.color_other,
        },
        Winner::Other => palette.color_other,
        Winner::Tie(_) | Winner::NoVotes => palette.color_tie,
    }
}

/// Runs the color mapper over all the regions, in input order.
pub fn color_regions(
    regions: &[RegionVotes],
    palette: &Palette,
) -> Result<Vec<RegionResult>, ChoroplethErrors> {
    info!(
        "Coloring {:?} regions with {:?} ramps",
        regions.len(),
        palette.ramps.len()
    );
    let mut res: Vec<RegionResult> = Vec::new();
    for region in regions.iter() {
        let tally = tally_region(region, palette)?;
        let fill = color_for(&tally, palette);
        match &tally.winner {
            Winner::Tie(names) => warn!(
                "color_regions: region {}: tie between {:?}, using the tie color",
                region.id, names
            ),
            Winner::NoVotes => warn!("color_regions: region {}: no votes", region.id),
            Winner::Candidate(_) | Winner::Other => {}
        }
        debug!("color_regions: region {}: {:?} -> {}", region.id, tally, fill);
        res.push(RegionResult {
            id: region.id.clone(),
            name: region.name.clone(),
            tally,
            fill,
        });
    }
    Ok(res)
}

/// Sums the votes of each candidate over all the regions.
///
/// Candidates are returned in the order of their first appearance. Regions
/// with a precomputed lean do not contribute.
pub fn aggregate_votes(regions: &[RegionVotes]) -> Result<Vec<(String, u64)>, ChoroplethErrors> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, u64> = HashMap::new();
    for region in regions.iter() {
        if let RegionData::Votes(votes) = &region.data {
            for (name, count) in votes.iter() {
                if !totals.contains_key(name) {
                    order.push(name.clone());
                }
                let total = totals.entry(name.clone()).or_insert(0);
                *total = total
                    .checked_add(*count)
                    .ok_or_else(|| ChoroplethErrors::VoteOverflow(name.clone()))?;
            }
        }
    }
    Ok(order
        .into_iter()
        .map(|name| {
            let count = totals.get(&name).cloned().unwrap_or(0);
            (name, count)
        })
        .collect())
}
