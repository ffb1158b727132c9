//! Grid and spectral representations.
//!
//! A [`Representation`] describes *how* a field's values are laid out: a
//! regular lat-lon grid, a Gaussian grid, a triangular spectral truncation.
//! The heavy geometry (point coordinates, neighbour search, transforms)
//! lives behind the interpolation-kernel seam; the types here carry only
//! what planning and caching need: a stable identifier, a point count, and
//! the light index arithmetic for cropping and spectral truncation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::FieldError;

/// Tolerance for deciding whether a grid point sits inside an area.
const DEGREE_EPS: f64 = 1e-9;

// ── BoundingBox ─────────────────────────────────────────────────

/// A north/west/south/east area in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Northern latitude bound.
    pub north: f64,
    /// Western longitude bound.
    pub west: f64,
    /// Southern latitude bound.
    pub south: f64,
    /// Eastern longitude bound.
    pub east: f64,
}

impl BoundingBox {
    /// The whole globe.
    pub const GLOBAL: BoundingBox = BoundingBox {
        north: 90.0,
        west: 0.0,
        south: -90.0,
        east: 360.0,
    };

    /// Validate and construct a bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidBoundingBox`] when latitudes leave
    /// `[-90, 90]`, `north < south`, `east <= west`, or the box spans more
    /// than a full circle of longitude.
    pub fn new(north: f64, west: f64, south: f64, east: f64) -> Result<Self, FieldError> {
        let invalid = |detail: String| FieldError::InvalidBoundingBox { detail };
        if !(-90.0..=90.0).contains(&north) || !(-90.0..=90.0).contains(&south) {
            return Err(invalid(format!("latitudes {north}/{south} outside [-90, 90]")));
        }
        if north < south {
            return Err(invalid(format!("north {north} below south {south}")));
        }
        if east <= west {
            return Err(invalid(format!("east {east} not beyond west {west}")));
        }
        if east - west > 360.0 + DEGREE_EPS {
            return Err(invalid(format!("{west}/{east} spans more than 360 degrees")));
        }
        Ok(Self {
            north,
            west,
            south,
            east,
        })
    }

    /// Whether `other` lies entirely within this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.north <= self.north + DEGREE_EPS
            && other.south >= self.south - DEGREE_EPS
            && other.west >= self.west - DEGREE_EPS
            && other.east <= self.east + DEGREE_EPS
    }

    /// The overlap of two boxes, or `None` if they are disjoint.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let north = self.north.min(other.north);
        let south = self.south.max(other.south);
        let west = self.west.max(other.west);
        let east = self.east.min(other.east);
        if north < south || east <= west {
            return None;
        }
        Some(BoundingBox {
            north,
            west,
            south,
            east,
        })
    }

    /// A filesystem-safe fragment for identifiers: `n90_w0_s-90_e360`.
    pub(crate) fn id_fragment(&self) -> String {
        format!("n{}_w{}_s{}_e{}", self.north, self.west, self.south, self.east)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.north, self.west, self.south, self.east)
    }
}

// ── Representation trait ────────────────────────────────────────

/// How a field's values are laid out.
///
/// Implementations are immutable. [`unique_id`](Representation::unique_id)
/// must be deterministic and filesystem-safe (no path separators): it is
/// the representation's identity in cache keys and cache file names.
pub trait Representation: fmt::Debug + Send + Sync {
    /// Stable, deterministic identifier of this representation.
    fn unique_id(&self) -> String;

    /// Number of values a field with this representation holds.
    fn point_count(&self) -> usize;

    /// Spectral truncation, for spectral representations only.
    fn truncation(&self) -> Option<usize> {
        None
    }

    /// Downcast support for representation-specific operations.
    fn as_any(&self) -> &dyn Any;

    /// Restrict this representation to `area`.
    ///
    /// Returns the cropped representation and, for each of its points, the
    /// index of the source point it takes its value from. `None` when this
    /// representation kind cannot be cropped or no point falls inside.
    fn crop(&self, area: &BoundingBox) -> Option<(Arc<dyn Representation>, Vec<usize>)> {
        let _ = area;
        None
    }

    /// Value equality: same layout, by identifier.
    fn same_as(&self, other: &dyn Representation) -> bool {
        self.unique_id() == other.unique_id()
    }
}

// ── RegularLatLon ───────────────────────────────────────────────

/// A regular latitude/longitude grid.
///
/// Values are stored row-major, north to south, west to east: the value at
/// row `j` (latitude index) and column `i` (longitude index) sits at
/// `j * ni + i`.
#[derive(Clone, Debug, PartialEq)]
pub struct RegularLatLon {
    ni: usize,
    nj: usize,
    area: BoundingBox,
}

impl RegularLatLon {
    /// A grid of `ni` longitudes by `nj` latitudes over `area`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidBoundingBox`] when either extent is
    /// below 2 points.
    pub fn new(ni: usize, nj: usize, area: BoundingBox) -> Result<Self, FieldError> {
        if ni < 2 || nj < 2 {
            return Err(FieldError::InvalidBoundingBox {
                detail: format!("grid extent {ni}x{nj} below 2x2"),
            });
        }
        Ok(Self { ni, nj, area })
    }

    /// A grid over `area` with the given west-east and north-south
    /// increments in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidBoundingBox`] when an increment is not
    /// positive or does not evenly divide the corresponding extent.
    pub fn from_increments(we: f64, ns: f64, area: BoundingBox) -> Result<Self, FieldError> {
        let invalid = |detail: String| FieldError::InvalidBoundingBox { detail };
        if we <= 0.0 || ns <= 0.0 {
            return Err(invalid(format!("increments {we}/{ns} not positive")));
        }
        let spans = |extent: f64, inc: f64| {
            let steps = extent / inc;
            if (steps - steps.round()).abs() > 1e-6 {
                None
            } else {
                Some(steps.round() as usize + 1)
            }
        };
        let ni = spans(area.east - area.west, we)
            .ok_or_else(|| invalid(format!("increment {we} does not divide {area}")))?;
        let nj = spans(area.north - area.south, ns)
            .ok_or_else(|| invalid(format!("increment {ns} does not divide {area}")))?;
        Self::new(ni, nj, area)
    }

    /// Number of longitudes.
    pub fn ni(&self) -> usize {
        self.ni
    }

    /// Number of latitudes.
    pub fn nj(&self) -> usize {
        self.nj
    }

    /// The grid's area.
    pub fn area(&self) -> &BoundingBox {
        &self.area
    }

    /// Latitude of row `j`, counted from the north.
    pub fn latitude(&self, j: usize) -> f64 {
        let step = (self.area.north - self.area.south) / (self.nj - 1) as f64;
        self.area.north - j as f64 * step
    }

    /// Longitude of column `i`, counted from the west.
    pub fn longitude(&self, i: usize) -> f64 {
        let step = (self.area.east - self.area.west) / (self.ni - 1) as f64;
        self.area.west + i as f64 * step
    }
}

impl Representation for RegularLatLon {
    fn unique_id(&self) -> String {
        format!("LL{}x{}-{}", self.ni, self.nj, self.area.id_fragment())
    }

    fn point_count(&self) -> usize {
        self.ni * self.nj
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn crop(&self, area: &BoundingBox) -> Option<(Arc<dyn Representation>, Vec<usize>)> {
        let rows: Vec<usize> = (0..self.nj)
            .filter(|&j| {
                let lat = self.latitude(j);
                lat <= area.north + DEGREE_EPS && lat >= area.south - DEGREE_EPS
            })
            .collect();
        let cols: Vec<usize> = (0..self.ni)
            .filter(|&i| {
                let lon = self.longitude(i);
                lon >= area.west - DEGREE_EPS && lon <= area.east + DEGREE_EPS
            })
            .collect();
        if rows.len() < 2 || cols.len() < 2 {
            return None;
        }

        let cropped_area = BoundingBox {
            north: self.latitude(rows[0]),
            west: self.longitude(cols[0]),
            south: self.latitude(rows[rows.len() - 1]),
            east: self.longitude(cols[cols.len() - 1]),
        };
        let cropped = RegularLatLon {
            ni: cols.len(),
            nj: rows.len(),
            area: cropped_area,
        };

        let mut mapping = Vec::with_capacity(rows.len() * cols.len());
        for &j in &rows {
            for &i in &cols {
                mapping.push(j * self.ni + i);
            }
        }
        Some((Arc::new(cropped), mapping))
    }
}

// ── RegularGaussian ─────────────────────────────────────────────

/// A regular (full) Gaussian grid of resolution `N`.
///
/// `N` is the number of latitude rows between a pole and the equator; the
/// grid has `4N` longitudes by `2N` latitudes. Row placement (the Gaussian
/// latitudes themselves) is the kernels' business.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegularGaussian {
    n: usize,
}

impl RegularGaussian {
    /// A Gaussian grid of resolution `n` (must be positive).
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidBoundingBox`] for `n == 0`.
    pub fn new(n: usize) -> Result<Self, FieldError> {
        if n == 0 {
            return Err(FieldError::InvalidBoundingBox {
                detail: "gaussian resolution 0".to_string(),
            });
        }
        Ok(Self { n })
    }

    /// The grid's resolution.
    pub fn n(&self) -> usize {
        self.n
    }
}

impl Representation for RegularGaussian {
    fn unique_id(&self) -> String {
        format!("F{}", self.n)
    }

    fn point_count(&self) -> usize {
        8 * self.n * self.n
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── SphericalHarmonics ──────────────────────────────────────────

/// A triangularly truncated spherical-harmonic representation.
///
/// Coefficients are stored zonal-wavenumber-major: for each `m` in
/// `0..=T`, for each `n` in `m..=T`, the real then imaginary part. That
/// gives `(T+1)(T+2)` values in total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SphericalHarmonics {
    truncation: usize,
}

impl SphericalHarmonics {
    /// A spectral representation truncated at `truncation`.
    pub fn new(truncation: usize) -> Self {
        Self { truncation }
    }

    /// Map coefficient values onto a lower truncation.
    ///
    /// Walks the coefficient ordering once, keeping every `(m, n)` pair
    /// with both indices at or below `target`. Returns `None` when
    /// `target` is not strictly lower than the current truncation or the
    /// value vector has the wrong length.
    pub fn truncate_values(
        &self,
        values: &[f64],
        target: usize,
    ) -> Option<(SphericalHarmonics, Vec<f64>)> {
        if target >= self.truncation || values.len() != self.coefficient_count() {
            return None;
        }
        let out_repres = SphericalHarmonics::new(target);
        let mut out = Vec::with_capacity(out_repres.coefficient_count());
        let mut idx = 0;
        for m in 0..=self.truncation {
            for n in m..=self.truncation {
                if m <= target && n <= target {
                    out.push(values[idx]);
                    out.push(values[idx + 1]);
                }
                idx += 2;
            }
        }
        Some((out_repres, out))
    }

    fn coefficient_count(&self) -> usize {
        (self.truncation + 1) * (self.truncation + 2)
    }
}

impl Representation for SphericalHarmonics {
    fn unique_id(&self) -> String {
        format!("T{}", self.truncation)
    }

    fn point_count(&self) -> usize {
        self.coefficient_count()
    }

    fn truncation(&self) -> Option<usize> {
        Some(self.truncation)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
