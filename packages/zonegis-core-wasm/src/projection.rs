// Local equirectangular tangent plane used for buffering and metrics.
//
// Inputs are WGS84 lng/lat degrees. Around a chosen origin the plane maps
// one degree of latitude to a constant number of kilometres and one degree of
// longitude to that number scaled by cos(origin latitude). Accurate for the
// parcel-sized extents the licensing UI works with, distorts with extent.
use geo::{Coord, MapCoords, MultiPolygon};

use crate::error::{PipelineError, Result};

/// WGS84 mean Earth radius.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0088;

const MIN_COS_LATITUDE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin: Coord<f64>,
    km_per_degree_x: f64,
    km_per_degree_y: f64,
}

impl LocalProjection {
    pub fn new(origin: Coord<f64>) -> Result<Self> {
        let km_per_degree_y = EARTH_MEAN_RADIUS_KM * std::f64::consts::PI / 180.0;
        let cos_lat = origin.y.to_radians().cos();
        if !origin.x.is_finite() || !origin.y.is_finite() || cos_lat < MIN_COS_LATITUDE {
            return Err(PipelineError::DegenerateProjection { latitude: origin.y });
        }
        Ok(LocalProjection {
            origin,
            km_per_degree_x: km_per_degree_y * cos_lat,
            km_per_degree_y,
        })
    }

    /// Plane centred on the bounding-box centre of the exterior rings.
    pub fn centered_on(multi: &MultiPolygon<f64>) -> Result<Self> {
        let mut min = Coord { x: f64::INFINITY, y: f64::INFINITY };
        let mut max = Coord { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY };
        for coord in multi.0.iter().flat_map(|polygon| polygon.exterior().coords()) {
            min.x = min.x.min(coord.x);
            min.y = min.y.min(coord.y);
            max.x = max.x.max(coord.x);
            max.y = max.y.max(coord.y);
        }
        // An empty multipolygon leaves infinities behind and is rejected by new()
        LocalProjection::new(Coord {
            x: (min.x + max.x) / 2.0,
            y: (min.y + max.y) / 2.0,
        })
    }

    pub fn origin(&self) -> Coord<f64> {
        self.origin
    }

    /// Degrees to kilometres.
    pub fn forward(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (coord.x - self.origin.x) * self.km_per_degree_x,
            y: (coord.y - self.origin.y) * self.km_per_degree_y,
        }
    }

    /// Kilometres to degrees.
    pub fn inverse(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.origin.x + coord.x / self.km_per_degree_x,
            y: self.origin.y + coord.y / self.km_per_degree_y,
        }
    }

    pub fn project(&self, multi: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let projection = *self;
        multi.map_coords(move |c| projection.forward(c))
    }

    pub fn unproject(&self, multi: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let projection = *self;
        multi.map_coords(move |c| projection.inverse(c))
    }
}
