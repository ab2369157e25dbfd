#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate reference systems and reprojection to geographic WGS84.
//!
//! CRS definitions come from an embedded registry keyed by EPSG code (see
//! [`registry`]) or from a raw proj definition string. A [`Reprojector`]
//! is built once per source CRS and applied to every geometry of a set.

pub mod registry;

use geo::{Coord, Geometry, MapCoords};
use koji_map_parcel_models::Crs;
use proj4rs::proj::Proj;

/// EPSG code of geographic WGS84.
pub const WGS84_EPSG: u32 = 4326;

/// Errors that can occur while resolving a CRS or transforming coordinates.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// The dataset does not declare a CRS.
    #[error("Dataset has no coordinate reference system; reprojection to WGS84 is impossible")]
    MissingCrs,

    /// The EPSG code is not in the registry.
    #[error("Unknown EPSG code: {code}")]
    UnknownEpsg {
        /// The requested code.
        code: u32,
    },

    /// The proj definition string could not be parsed.
    #[error("Invalid CRS definition '{definition}': {message}")]
    InvalidDefinition {
        /// The offending definition.
        definition: String,
        /// Parser message.
        message: String,
    },

    /// A coordinate could not be transformed.
    #[error("Coordinate transform failed: {message}")]
    Transform {
        /// Description of the failure.
        message: String,
    },
}

/// Resolves a registered CRS by EPSG code.
///
/// # Errors
///
/// Returns [`ProjectionError::UnknownEpsg`] if the code is not registered.
pub fn crs_from_epsg(code: u32) -> Result<Crs, ProjectionError> {
    let def = registry::find_by_epsg(code).ok_or(ProjectionError::UnknownEpsg { code })?;
    Ok(Crs {
        epsg: Some(def.epsg),
        name: def.name,
        definition: def.proj,
    })
}

/// Wraps a raw proj definition string after checking that it parses.
///
/// # Errors
///
/// Returns [`ProjectionError::InvalidDefinition`] if proj4rs rejects it.
pub fn crs_from_definition(definition: &str) -> Result<Crs, ProjectionError> {
    let definition = definition.trim();
    parse_proj(definition)?;
    Ok(Crs {
        epsg: None,
        name: definition.to_string(),
        definition: definition.to_string(),
    })
}

/// Resolves a user-supplied CRS: a bare EPSG code, an `EPSG:` or OGC URN
/// name, or a raw `+proj=` definition.
///
/// # Errors
///
/// Returns [`ProjectionError`] if the code is unknown or the definition
/// does not parse.
pub fn resolve_crs(input: &str) -> Result<Crs, ProjectionError> {
    let input = input.trim();
    if input.starts_with('+') {
        return crs_from_definition(input);
    }
    let code = input
        .parse::<u32>()
        .ok()
        .or_else(|| parse_epsg_name(input))
        .ok_or_else(|| ProjectionError::InvalidDefinition {
            definition: input.to_string(),
            message: "expected an EPSG code or a +proj definition".to_string(),
        })?;
    crs_from_epsg(code)
}

/// Extracts the EPSG code from a CRS name such as `EPSG:6677` or
/// `urn:ogc:def:crs:EPSG::6677`. `urn:ogc:def:crs:OGC:1.3:CRS84` maps to
/// 4326.
#[must_use]
pub fn parse_epsg_name(name: &str) -> Option<u32> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84") || name == "CRS84" {
        return Some(WGS84_EPSG);
    }

    let upper = name.to_ascii_uppercase();
    let rest = upper
        .strip_prefix("URN:OGC:DEF:CRS:EPSG:")
        .or_else(|| upper.strip_prefix("EPSG:"))?;
    // URNs may carry a version between the colons (`EPSG:9.8.15:6677`).
    rest.rsplit(':').next()?.parse().ok()
}

fn parse_proj(definition: &str) -> Result<Proj, ProjectionError> {
    Proj::from_proj_string(definition).map_err(|e| ProjectionError::InvalidDefinition {
        definition: definition.to_string(),
        message: e.to_string(),
    })
}

fn is_geographic(definition: &str) -> bool {
    definition
        .split_whitespace()
        .any(|token| matches!(token, "+proj=longlat" | "+proj=latlong" | "+proj=lonlat"))
}

/// Transforms coordinates from one source CRS to WGS84 longitude/latitude
/// in degrees.
pub struct Reprojector {
    source: Proj,
    target: Proj,
    source_geographic: bool,
}

impl Reprojector {
    /// Builds a reprojector from `crs` to WGS84.
    ///
    /// The transform is always set up, even when the source is already
    /// geographic.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::MissingCrs`] when `crs` is `None`, or
    /// [`ProjectionError::InvalidDefinition`] when either definition does
    /// not parse.
    pub fn to_wgs84(crs: Option<&Crs>) -> Result<Self, ProjectionError> {
        let crs = crs.ok_or(ProjectionError::MissingCrs)?;
        let target = crs_from_epsg(WGS84_EPSG)?;
        log::debug!("Reprojecting from {crs} to {target}");

        Ok(Self {
            source: parse_proj(&crs.definition)?,
            target: parse_proj(&target.definition)?,
            source_geographic: is_geographic(&crs.definition),
        })
    }

    /// Transforms one coordinate. The result is `(longitude, latitude)` in
    /// degrees.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Transform`] if a geographic latitude lies
    /// outside ±90°, or proj4rs fails or yields a non-finite value.
    pub fn transform_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        if self.source_geographic && !(-90.0..=90.0).contains(&coord.y) {
            return Err(ProjectionError::Transform {
                message: format!("({}, {}): latitude out of range", coord.x, coord.y),
            });
        }

        let mut point = if self.source_geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        proj4rs::transform::transform(&self.source, &self.target, &mut point).map_err(|e| {
            ProjectionError::Transform {
                message: format!("({}, {}): {e}", coord.x, coord.y),
            }
        })?;

        let lon = point.0.to_degrees();
        let lat = point.1.to_degrees();
        if !lon.is_finite() || !lat.is_finite() {
            return Err(ProjectionError::Transform {
                message: format!("({}, {}) produced a non-finite result", coord.x, coord.y),
            });
        }
        Ok(Coord { x: lon, y: lat })
    }

    /// Transforms every coordinate of `geometry`.
    ///
    /// # Errors
    ///
    /// Fails on the first coordinate that cannot be transformed.
    pub fn reproject(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, ProjectionError> {
        geometry.try_map_coords(|coord| self.transform_coord(coord))
    }
}
