//! Field fixtures.

use std::sync::Arc;

use regrid_core::field::Field;
use regrid_core::param::ParamMap;
use regrid_core::repres::{BoundingBox, RegularLatLon, Representation, SphericalHarmonics};

/// A global `ni` by `nj` lat-lon field with ramp values `0, 1, 2, ...`.
pub fn latlon_field(ni: usize, nj: usize) -> Field {
    let grid = RegularLatLon::new(ni, nj, BoundingBox::GLOBAL).unwrap();
    ramp_field(Arc::new(grid))
}

/// A spectral field truncated at `truncation`, with ramp values.
pub fn spectral_field(truncation: usize) -> Field {
    ramp_field(Arc::new(SphericalHarmonics::new(truncation)))
}

/// A field over `representation` with ramp values `0, 1, 2, ...`.
pub fn ramp_field(representation: Arc<dyn Representation>) -> Field {
    let values = (0..representation.point_count()).map(|i| i as f64).collect();
    Field::new(representation, values, ParamMap::new()).unwrap()
}
