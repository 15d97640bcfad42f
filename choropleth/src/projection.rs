use std::f64::consts::PI;

// Mercator is undefined at the poles.
const MAX_LATITUDE: f64 = 85.0;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Projection {
    Mercator,
    Equirectangular,
}

impl Projection {
    /// Projects a longitude/latitude pair (in degrees) on the plane.
    ///
    /// The y axis points north.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = lon.to_radians();
        match self {
            Projection::Mercator => {
                let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
                (x, (PI / 4.0 + phi / 2.0).tan().ln())
            }
            Projection::Equirectangular => (x, lat.to_radians()),
        }
    }
}

/// Maps longitude/latitude pairs to figure coordinates so that a set of
/// points fits in the figure, keeping the aspect ratio.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Fit {
    projection: Projection,
    scale: f64,
    min_x: f64,
    max_y: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Fit {
    /// Returns None if there is no point to fit.
    pub fn new<I: IntoIterator<Item = (f64, f64)>>(
        projection: Projection,
        points: I,
        width: f64,
        height: f64,
        padding: f64,
    ) -> Option<Fit> {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for (lon, lat) in points {
            let (x, y) = projection.project(lon, lat);
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        let (min_x, min_y, max_x, max_y) = bounds?;
        let avail_w = (width - 2.0 * padding).max(1.0);
        let avail_h = (height - 2.0 * padding).max(1.0);
        let span_x = max_x - min_x;
        let span_y = max_y - min_y;
        let scale = match (span_x > 0.0, span_y > 0.0) {
            (true, true) => (avail_w / span_x).min(avail_h / span_y),
            (true, false) => avail_w / span_x,
            (false, true) => avail_h / span_y,
            (false, false) => 1.0,
        };
        Some(Fit {
            projection,
            scale,
            min_x,
            max_y,
            offset_x: (width - span_x * scale) / 2.0,
            offset_y: (height - span_y * scale) / 2.0,
        })
    }

    pub fn apply(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = self.projection.project(lon, lat);
        (
            self.offset_x + (x - self.min_x) * self.scale,
            self.offset_y + (self.max_y - y) * self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mercator_equator() {
        let (x, y) = Projection::Mercator.project(0.0, 0.0);
        assert_relative_eq!(x, 0.0);
        assert_relative_eq!(y, 0.0);
        let (_, y_north) = Projection::Mercator.project(0.0, 60.0);
        let (_, y_eq) = Projection::Equirectangular.project(0.0, 60.0);
        // Mercator stretches high latitudes.
        assert!(y_north > y_eq);
    }

    #[test]
    fn mercator_poles_are_finite() {
        let (_, y) = Projection::Mercator.project(10.0, 90.0);
        assert!(y.is_finite());
    }

    #[test]
    fn fit_centers_and_flips() {
        let pts = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)];
        let fit = Fit::new(Projection::Equirectangular, pts, 200.0, 200.0, 0.0).unwrap();
        let (x0, y0) = fit.apply(0.0, 0.0);
        let (x1, y1) = fit.apply(10.0, 5.0);
        // The box is twice as wide as tall: it takes the full width.
        assert_relative_eq!(x0, 0.0, epsilon = 1e-9);
        assert_relative_eq!(x1, 200.0, epsilon = 1e-9);
        // North is up, and the box is centered vertically.
        assert!(y1 < y0);
        assert_relative_eq!(y0, 150.0, epsilon = 1e-9);
        assert_relative_eq!(y1, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn fit_single_point() {
        let fit = Fit::new(Projection::Mercator, vec![(3.0, 4.0)], 100.0, 50.0, 5.0).unwrap();
        let (x, y) = fit.apply(3.0, 4.0);
        assert_relative_eq!(x, 50.0);
        assert_relative_eq!(y, 25.0);
    }

    #[test]
    fn fit_nothing() {
        assert!(Fit::new(Projection::Mercator, Vec::new(), 100.0, 50.0, 5.0).is_none());
    }
}
