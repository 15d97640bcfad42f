//! Draws the colored regions on their boundary shapes.

use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::config::*;
use crate::figure::{num, Element, Figure, Stroke, TextStyle, ViewBox};
use crate::projection::{Fit, Projection};

/// A closed ring of longitude/latitude pairs.
pub type Ring = Vec<(f64, f64)>;

/// The geographic shape of a region, as a list of polygons.
///
/// Each polygon is an exterior ring followed by its holes.
#[derive(PartialEq, Debug, Clone)]
pub struct Boundary {
    pub id: String,
    pub polygons: Vec<Vec<Ring>>,
}

/// A named point drawn on top of the map, such as a city.
#[derive(PartialEq, Debug, Clone)]
pub struct Place {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MapOptions {
    pub width: f64,
    pub height: f64,
    pub projection: Projection,
    /// Space left around the regions, in figure units.
    pub padding: f64,
    pub outline: Stroke,
    pub view_box: Option<ViewBox>,
    pub places: Vec<Place>,
}

impl MapOptions {
    pub fn new(width: f64, height: f64) -> MapOptions {
        MapOptions {
            width,
            height,
            projection: Projection::Mercator,
            padding: 10.0,
            outline: Stroke::solid(Color::WHITE, 0.25),
            view_box: None,
            places: Vec::new(),
        }
    }
}

/// Renders the choropleth map.
///
/// Every region must have a boundary with at least one polygon. Boundaries
/// without data are not drawn and the view is fitted to the regions that
/// have data.
pub fn render_map(
    regions: &[RegionResult],
    boundaries: &[Boundary],
    options: &MapOptions,
) -> Result<Figure, ChoroplethErrors> {
    if regions.is_empty() {
        return Err(ChoroplethErrors::EmptyMap);
    }
    let shapes: HashMap<&str, &Boundary> =
        boundaries.iter().map(|b| (b.id.as_str(), b)).collect();

    let mut matched: Vec<(&RegionResult, &Boundary)> = Vec::new();
    for r in regions.iter() {
        let b: &Boundary = *shapes
            .get(r.id.as_str())
            .ok_or_else(|| ChoroplethErrors::UnknownRegion(r.id.clone()))?;
        matched.push((r, b));
    }
    let used: HashSet<&str> = matched.iter().map(|(r, _)| r.id.as_str()).collect();
    debug!(
        "render_map: {} boundaries without data are not drawn",
        boundaries.iter().filter(|b| !used.contains(b.id.as_str())).count()
    );

    let all_points = matched
        .iter()
        .flat_map(|(_, b)| b.polygons.iter())
        .flat_map(|p| p.iter())
        .flat_map(|ring| ring.iter().cloned());
    let fit = Fit::new(
        options.projection,
        all_points,
        options.width,
        options.height,
        options.padding,
    )
    .ok_or(ChoroplethErrors::EmptyMap)?;

    let mut fig = Figure::new(options.width, options.height);
    fig.view_box = options.view_box;
    for (r, b) in matched.iter() {
        let d = path_data(&b.polygons, &fit);
        if d.is_empty() {
            return Err(ChoroplethErrors::EmptyShape(r.id.clone()));
        }
        fig.push(Element::Path {
            id: Some(r.id.clone()),
            d,
            fill: Some(r.fill),
            stroke: Some(options.outline),
        });
    }

    for place in options.places.iter() {
        let (x, y) = fit.apply(place.lon, place.lat);
        fig.push(Element::Circle {
            cx: x,
            cy: y,
            r: 2.0,
            fill: None,
            stroke: Some(Stroke::solid(Color::BLACK, 0.5)),
        });
        fig.add_text(x, y + 5.0, &place.name, TextStyle::new(5.0));
    }

    info!(
        "render_map: drew {} regions and {} places",
        matched.len(),
        options.places.len()
    );
    Ok(fig)
}

fn path_data(polygons: &[Vec<Ring>], fit: &Fit) -> String {
    let mut d = String::new();
    for ring in polygons.iter().flat_map(|p| p.iter()) {
        if ring.len() < 3 {
            continue;
        }
        for (idx, (lon, lat)) in ring.iter().enumerate() {
            let (x, y) = fit.apply(*lon, *lat);
            let cmd = if idx == 0 { 'M' } else { 'L' };
            if !d.is_empty() && idx == 0 {
                d.push(' ');
            }
            let _ = write!(d, "{}{},{}", cmd, num(x), num(y));
        }
        d.push('Z');
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: &str, lon: f64, lat: f64) -> Boundary {
        Boundary {
            id: id.to_string(),
            polygons: vec![vec![vec![
                (lon, lat),
                (lon + 1.0, lat),
                (lon + 1.0, lat + 1.0),
                (lon, lat + 1.0),
                (lon, lat),
            ]]],
        }
    }

    fn result(id: &str, fill: Color) -> RegionResult {
        RegionResult {
            id: id.to_string(),
            name: None,
            tally: RegionTally {
                winner: Winner::Candidate("A".to_string()),
                total: 10,
                winner_share: 60.0,
                margin: 20.0,
            },
            fill,
        }
    }

    #[test]
    fn draws_one_path_per_region() {
        let boundaries = vec![
            square("51013", -77.0, 38.0),
            square("51059", -78.0, 38.0),
            square("99999", 10.0, 10.0),
        ];
        let regions = vec![
            result("51013", COLORS_GREEN[0]),
            result("51059", COLORS_ORANGE[5]),
        ];
        let fig = render_map(&regions, &boundaries, &MapOptions::new(1000.0, 500.0)).unwrap();
        let paths: Vec<&Element> = fig
            .elements
            .iter()
            .filter(|e| matches!(e, Element::Path { .. }))
            .collect();
        assert_eq!(paths.len(), 2);
        let svg = fig.to_svg();
        assert!(svg.contains("id=\"51013\""));
        assert!(svg.contains("fill=\"#AFE9AF\""));
        assert!(svg.contains("fill=\"#8C2D04\""));
        assert!(svg.contains("stroke=\"#FFFFFF\""));
        assert!(svg.contains("stroke-width=\"0.25\""));
        // Regions without data are not drawn.
        assert!(!svg.contains("99999"));
    }

    #[test]
    fn unknown_region_is_rejected() {
        let boundaries = vec![square("51013", -77.0, 38.0)];
        let regions = vec![result("51013", COLOR_OTHER), result("00000", COLOR_OTHER)];
        let err = render_map(&regions, &boundaries, &MapOptions::new(100.0, 100.0)).unwrap_err();
        assert_eq!(err, ChoroplethErrors::UnknownRegion("00000".to_string()));
    }

    #[test]
    fn region_without_polygon_is_rejected() {
        let mut degenerate = square("2", 1.0, 0.0);
        degenerate.polygons = vec![];
        let boundaries = vec![square("1", 0.0, 0.0), degenerate];
        let regions = vec![result("1", COLOR_OTHER), result("2", COLOR_OTHER)];
        let err = render_map(&regions, &boundaries, &MapOptions::new(100.0, 100.0)).unwrap_err();
        assert_eq!(err, ChoroplethErrors::EmptyShape("2".to_string()));

        // Rings with less than three points cannot be drawn either.
        let line = Boundary {
            id: "2".to_string(),
            polygons: vec![vec![vec![(1.0, 0.0), (2.0, 1.0)]]],
        };
        let boundaries = vec![square("1", 0.0, 0.0), line];
        let err = render_map(&regions, &boundaries, &MapOptions::new(100.0, 100.0)).unwrap_err();
        assert_eq!(err, ChoroplethErrors::EmptyShape("2".to_string()));
    }

    #[test]
    fn empty_map() {
        let err = render_map(&[], &[], &MapOptions::new(100.0, 100.0)).unwrap_err();
        assert_eq!(err, ChoroplethErrors::EmptyMap);
    }

    #[test]
    fn shapes_stay_inside_the_figure() {
        let boundaries = vec![square("1", 0.0, 0.0), square("2", 1.0, 0.0)];
        let regions = vec![result("1", COLOR_OTHER), result("2", COLOR_OTHER)];
        let opts = MapOptions::new(300.0, 100.0);
        let fig = render_map(&regions, &boundaries, &opts).unwrap();
        for e in fig.elements.iter() {
            if let Element::Path { d, .. } = e {
                for pair in d
                    .split(|c: char| c == 'M' || c == 'L' || c == 'Z' || c == ' ')
                    .filter(|s| !s.is_empty())
                {
                    let xy: Vec<f64> = pair.split(',').map(|v| v.parse().unwrap()).collect();
                    assert!(xy[0] >= 0.0 && xy[0] <= 300.0, "{}", pair);
                    assert!(xy[1] >= 0.0 && xy[1] <= 100.0, "{}", pair);
                }
            }
        }
    }

    #[test]
    fn places_and_view_box() {
        let boundaries = vec![square("1", 0.0, 0.0)];
        let regions = vec![result("1", COLOR_OTHER)];
        let mut opts = MapOptions::new(100.0, 100.0);
        opts.view_box = Some(ViewBox::parse("10 10 50 50").unwrap());
        opts.places = vec![Place {
            name: "Richmond".to_string(),
            lon: 0.5,
            lat: 0.5,
        }];
        let fig = render_map(&regions, &boundaries, &opts).unwrap();
        assert_eq!(fig.texts(), vec!["Richmond"]);
        let svg = fig.to_svg();
        assert!(svg.contains("viewBox=\"10 10 50 50\""));
        assert!(svg.contains("<circle"));
    }
}
