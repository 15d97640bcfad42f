// Reading the boundary shapes from GeoJSON files.

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use std::collections::HashMap;
use std::fs;

use choropleth::map::{Boundary, Ring};

use crate::maps::*;

type Position = Vec<f64>;

#[derive(Deserialize, Debug)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize, Debug)]
struct Feature {
    id: Option<JSValue>,
    properties: Option<JSMap<String, JSValue>>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    #[serde(other)]
    Unsupported,
}

fn id_string(v: &JSValue) -> Option<String> {
    match v {
        JSValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JSValue::Number(n) => Some(
            n.as_i64()
                .map(|x| x.to_string())
                .unwrap_or_else(|| n.to_string()),
        ),
        _ => None,
    }
}

fn ring(positions: &[Position]) -> Ring {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

fn polygon(rings: &[Vec<Position>]) -> Vec<Ring> {
    rings.iter().map(|r| ring(r)).collect()
}

/// Reads the shapes of a feature collection.
///
/// The identifier of a shape is the given property, or the identifier of the
/// feature when the property is missing. Features sharing an identifier are
/// merged in a single boundary.
pub fn read_boundaries(path: &str, id_property: &str) -> MapResult<Vec<Boundary>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let fc: FeatureCollection =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    parse_features(fc, path, id_property)
}

fn parse_features(
    fc: FeatureCollection,
    path: &str,
    id_property: &str,
) -> MapResult<Vec<Boundary>> {
    let mut res: Vec<Boundary> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (index, feature) in fc.features.into_iter().enumerate() {
        let id = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(id_property))
            .and_then(id_string)
            .or_else(|| feature.id.as_ref().and_then(id_string))
            .context(MissingGeoIdSnafu { index, path })?;
        let polygons: Vec<Vec<Ring>> = match &feature.geometry {
            Some(Geometry::Polygon { coordinates }) => vec![polygon(coordinates)],
            Some(Geometry::MultiPolygon { coordinates }) => {
                coordinates.iter().map(|p| polygon(p)).collect()
            }
            Some(Geometry::Unsupported) => {
                warn!(
                    "read_boundaries: feature {} ({}) is not a polygon, skipping its shape",
                    index, id
                );
                Vec::new()
            }
            None => {
                debug!("read_boundaries: feature {} ({}) has no geometry", index, id);
                Vec::new()
            }
        };
        match positions.get(&id) {
            Some(pos) => {
                debug!("read_boundaries: merging the shapes of {}", id);
                res[*pos].polygons.extend(polygons);
            }
            None => {
                positions.insert(id.clone(), res.len());
                res.push(Boundary { id, polygons });
            }
        }
    }
    info!("read_boundaries: read {} boundaries from {}", res.len(), path);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(js: &str, id_property: &str) -> MapResult<Vec<Boundary>> {
        let fc: FeatureCollection = serde_json::from_str(js).unwrap();
        parse_features(fc, "test.geojson", id_property)
    }

    #[test]
    fn polygons_and_multipolygons() {
        let js = r#"{"type": "FeatureCollection", "features": [
          {"type": "Feature", "properties": {"GEOID": "01001"},
           "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]], [[0.2, 0.2], [0.3, 0.2], [0.3, 0.3], [0.2, 0.2]]]}},
          {"type": "Feature", "properties": {"GEOID": 1003},
           "geometry": {"type": "MultiPolygon", "coordinates": [[[[2, 0, 10], [3, 0, 10], [3, 1, 10], [2, 0, 10]]], [[[4, 0], [5, 0], [5, 1], [4, 0]]]]}}
        ]}"#;
        let bs = parse(js, "GEOID").unwrap();
        assert_eq!(bs.len(), 2);
        assert_eq!(bs[0].id, "01001");
        assert_eq!(bs[0].polygons.len(), 1);
        assert_eq!(bs[0].polygons[0].len(), 2);
        assert_eq!(bs[1].id, "1003");
        assert_eq!(bs[1].polygons.len(), 2);
        assert_eq!(bs[1].polygons[0][0][1], (3.0, 0.0));
    }

    #[test]
    fn feature_id_fallback_and_merge() {
        let js = r#"{"type": "FeatureCollection", "features": [
          {"type": "Feature", "id": "VA", "properties": {},
           "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
          {"type": "Feature", "id": "VA", "properties": null,
           "geometry": {"type": "Polygon", "coordinates": [[[2, 0], [3, 0], [3, 1], [2, 0]]]}},
          {"type": "Feature", "id": "DC", "properties": {"NAME": "District"},
           "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]}"#;
        let bs = parse(js, "GEOID").unwrap();
        assert_eq!(bs.len(), 2);
        assert_eq!(bs[0].id, "VA");
        assert_eq!(bs[0].polygons.len(), 2);
        assert_eq!(bs[1].id, "DC");
        assert!(bs[1].polygons.is_empty());
    }

    #[test]
    fn missing_id() {
        let js = r#"{"type": "FeatureCollection", "features": [
          {"type": "Feature", "properties": {"NAME": "Nowhere"}, "geometry": null}
        ]}"#;
        let err = parse(js, "GEOID").unwrap_err();
        assert!(matches!(err, MapError::MissingGeoId { index: 0, .. }));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.geojson");
        fs::write(&path, "{\"type\": \"FeatureCollection\"").unwrap();
        let err = read_boundaries(&path.display().to_string(), "GEOID").unwrap_err();
        assert!(matches!(err, MapError::ParsingJson { .. }));
    }
}
