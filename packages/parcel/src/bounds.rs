//! Bounding-region builder: the search square around a target centroid.

use geo::{Centroid, ConvexHull, Geometry, MultiPoint, Point, Polygon, point};
use koji_map_parcel_models::ParcelDataset;

use crate::ParcelError;

/// Builds the search square for `targets`.
///
/// Only the first target (in filter order) contributes its centroid, even
/// when several records matched.
///
/// # Errors
///
/// * [`ParcelError::InvalidCriteria`] if `range_m` is not a positive,
///   finite number.
/// * [`ParcelError::InvalidGeometry`] if there is no target, or the first
///   target has a null or empty geometry.
pub fn search_square(targets: &ParcelDataset, range_m: f64) -> Result<Polygon<f64>, ParcelError> {
    validate_range(range_m)?;

    let first = targets
        .records()
        .first()
        .ok_or_else(|| ParcelError::InvalidGeometry {
            message: "no target record to center the search square on".to_string(),
        })?;

    if targets.len() > 1 {
        log::warn!(
            "{} records match; centering search square on the first one",
            targets.len()
        );
    }

    let geometry = first
        .geometry
        .as_ref()
        .ok_or_else(|| ParcelError::InvalidGeometry {
            message: "target record has no geometry".to_string(),
        })?;

    let center = centroid_of(geometry).ok_or_else(|| ParcelError::InvalidGeometry {
        message: "target geometry is empty".to_string(),
    })?;

    log::debug!(
        "Target centroid ({}, {}), half-width {range_m}",
        center.x(),
        center.y()
    );

    Ok(square_around(center, range_m))
}

/// Centroid of a geometry, or `None` if it is empty.
#[must_use]
pub fn centroid_of(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    geometry.centroid()
}

/// The axis-aligned square of half-width `range_m` centered on `center`,
/// built as the convex hull of its four corners.
#[must_use]
pub fn square_around(center: Point<f64>, range_m: f64) -> Polygon<f64> {
    let (x, y) = (center.x(), center.y());
    let corners = MultiPoint::new(vec![
        point! { x: x + range_m, y: y + range_m },
        point! { x: x - range_m, y: y - range_m },
        point! { x: x + range_m, y: y - range_m },
        point! { x: x - range_m, y: y + range_m },
    ]);
    corners.convex_hull()
}

pub(crate) fn validate_range(range_m: f64) -> Result<(), ParcelError> {
    if range_m.is_finite() && range_m > 0.0 {
        Ok(())
    } else {
        Err(ParcelError::InvalidCriteria {
            message: format!("search half-width must be positive, got {range_m}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, BoundingRect, MultiPolygon, Rect, coord};
    use koji_map_parcel_models::{ColumnNames, DatasetSchema, ParcelRecord};

    fn targets(geometries: Vec<Option<Geometry<f64>>>) -> ParcelDataset {
        let schema = DatasetSchema::new(vec!["地番".to_string()], ColumnNames::default());
        ParcelDataset::new(
            schema,
            None,
            geometries
                .into_iter()
                .map(|geometry| ParcelRecord {
                    values: vec![Some("1".into())],
                    geometry,
                })
                .collect(),
        )
    }

    fn unit_square(cx: f64, cy: f64) -> Geometry<f64> {
        Geometry::Polygon(
            Rect::new(
                coord! { x: cx - 0.5, y: cy - 0.5 },
                coord! { x: cx + 0.5, y: cy + 0.5 },
            )
            .to_polygon(),
        )
    }

    #[test]
    fn square_spans_twice_the_range() {
        let square = search_square(&targets(vec![Some(unit_square(1000.0, 1000.0))]), 61.0)
            .unwrap();
        let rect = square.bounding_rect().unwrap();
        assert!((rect.min().x - 939.0).abs() < 1e-9);
        assert!((rect.min().y - 939.0).abs() < 1e-9);
        assert!((rect.max().x - 1061.0).abs() < 1e-9);
        assert!((rect.max().y - 1061.0).abs() < 1e-9);
        assert!((square.unsigned_area() - 122.0 * 122.0).abs() < 1e-6);
    }

    #[test]
    fn hull_is_a_closed_four_corner_ring() {
        let square = square_around(point! { x: 0.0, y: 0.0 }, 5.0);
        let ring = square.exterior();
        assert!(ring.is_closed());
        assert_eq!(ring.0.len(), 5, "four corners plus closing point");
        assert!(square.interiors().is_empty());
    }

    #[test]
    fn uses_first_target_when_several_match() {
        let square = search_square(
            &targets(vec![
                Some(unit_square(0.0, 0.0)),
                Some(unit_square(500.0, 500.0)),
            ]),
            10.0,
        )
        .unwrap();
        let center = square.centroid().unwrap();
        assert!(center.x().abs() < 1e-9);
        assert!(center.y().abs() < 1e-9);
    }

    #[test]
    fn multipolygon_uses_area_weighted_centroid() {
        let Geometry::Polygon(a) = unit_square(0.0, 0.0) else {
            unreachable!()
        };
        let Geometry::Polygon(b) = unit_square(10.0, 0.0) else {
            unreachable!()
        };
        let geometry = Geometry::MultiPolygon(MultiPolygon::new(vec![a, b]));
        let square = search_square(&targets(vec![Some(geometry)]), 1.0).unwrap();
        let center = square.centroid().unwrap();
        assert!((center.x() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn point_target_centers_on_the_point() {
        let square = search_square(
            &targets(vec![Some(Geometry::Point(point! { x: 3.0, y: 4.0 }))]),
            2.0,
        )
        .unwrap();
        let rect = square.bounding_rect().unwrap();
        assert!((rect.min().x - 1.0).abs() < 1e-9);
        assert!((rect.max().y - 6.0).abs() < 1e-9);
    }

    #[test]
    fn null_geometry_is_invalid() {
        let err = search_square(&targets(vec![None]), 61.0).unwrap_err();
        assert!(matches!(err, ParcelError::InvalidGeometry { .. }));
    }

    #[test]
    fn empty_geometry_is_invalid() {
        let empty = Geometry::MultiPolygon(MultiPolygon::<f64>::new(vec![]));
        let err = search_square(&targets(vec![Some(empty)]), 61.0).unwrap_err();
        assert!(matches!(err, ParcelError::InvalidGeometry { .. }));
    }

    #[test]
    fn no_targets_is_invalid() {
        let err = search_square(&targets(vec![]), 61.0).unwrap_err();
        assert!(matches!(err, ParcelError::InvalidGeometry { .. }));
    }

    #[test]
    fn rejects_non_positive_range() {
        let data = targets(vec![Some(unit_square(0.0, 0.0))]);
        assert!(matches!(
            search_square(&data, 0.0),
            Err(ParcelError::InvalidCriteria { .. })
        ));
        assert!(matches!(
            search_square(&data, f64::NAN),
            Err(ParcelError::InvalidCriteria { .. })
        ));
    }
}
