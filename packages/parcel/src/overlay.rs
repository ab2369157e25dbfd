//! Overlay engine: clips every valid parcel against the search square.
//!
//! Candidate parcels are held in an R-tree keyed by bounding box so only
//! parcels whose envelope touches the square are intersected exactly.
//! A [`ParcelIndex`] borrows its dataset and can be built once and reused
//! across queries.

use geo::{Area, BooleanOps, BoundingRect, Geometry, MultiPolygon, Polygon};
use koji_map_parcel_models::{ColumnRole, ParcelDataset, ParcelRecord};
use rstar::{AABB, RTree, RTreeObject};

/// A candidate parcel stored in the R-tree.
struct CandidateEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for CandidateEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over the overlay candidates of one dataset.
///
/// Candidates are records with a non-null parcel number and a non-empty
/// polygonal geometry.
pub struct ParcelIndex<'a> {
    dataset: &'a ParcelDataset,
    tree: RTree<CandidateEntry>,
}

impl<'a> ParcelIndex<'a> {
    /// Builds the index. Records with a null parcel number, a null
    /// geometry, or a point geometry are left out.
    #[must_use]
    pub fn new(dataset: &'a ParcelDataset) -> Self {
        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for (index, record) in dataset.records().iter().enumerate() {
            match candidate_polygon(dataset, record) {
                Some(polygon) => {
                    let Some(envelope) = compute_envelope(&polygon) else {
                        skipped += 1;
                        continue;
                    };
                    entries.push(CandidateEntry {
                        index,
                        envelope,
                        polygon,
                    });
                }
                None => skipped += 1,
            }
        }

        if entries.is_empty() {
            log::warn!("Dataset has no valid overlay candidates");
        }
        log::debug!(
            "Indexed {} overlay candidates ({skipped} skipped)",
            entries.len()
        );

        Self {
            dataset,
            tree: RTree::bulk_load(entries),
        }
    }

    /// The dataset this index borrows.
    #[must_use]
    pub const fn dataset(&self) -> &'a ParcelDataset {
        self.dataset
    }

    /// Number of indexed candidates.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.tree.size()
    }

    /// Returns every candidate intersecting `square`, with geometry
    /// replaced by the intersection, in dataset order.
    ///
    /// Intersections with zero area (shared edges or corners only) are
    /// dropped.
    #[must_use]
    pub fn overlay(&self, square: &Polygon<f64>) -> ParcelDataset {
        let Some(query_env) = compute_envelope(&MultiPolygon::new(vec![square.clone()])) else {
            return self.dataset.subset(Vec::new());
        };

        let mut hits: Vec<&CandidateEntry> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .collect();
        hits.sort_unstable_by_key(|entry| entry.index);

        let records: Vec<ParcelRecord> = hits
            .into_iter()
            .filter_map(|entry| {
                let clipped = square.intersection(&entry.polygon);
                if clipped.0.is_empty() || clipped.unsigned_area() <= 0.0 {
                    return None;
                }
                Some(ParcelRecord {
                    values: self.dataset.records()[entry.index].values.clone(),
                    geometry: Some(simplify_collection(clipped)),
                })
            })
            .collect();

        log::debug!(
            "Overlay kept {} of {} candidates",
            records.len(),
            self.candidate_count()
        );

        self.dataset.subset(records)
    }
}

/// Clips `dataset` against `square` without keeping an index around.
#[must_use]
pub fn overlay_intersection(square: &Polygon<f64>, dataset: &ParcelDataset) -> ParcelDataset {
    ParcelIndex::new(dataset).overlay(square)
}

/// Polygonal geometry of an overlay candidate.
fn candidate_polygon(dataset: &ParcelDataset, record: &ParcelRecord) -> Option<MultiPolygon<f64>> {
    dataset.value(record, ColumnRole::ParcelNumber)?;
    match record.geometry.as_ref()? {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) if !mp.0.is_empty() => Some(mp.clone()),
        _ => None,
    }
}

/// A single-part result is stored as a plain polygon.
fn simplify_collection(mut clipped: MultiPolygon<f64>) -> Geometry<f64> {
    if clipped.0.len() == 1 {
        Geometry::Polygon(clipped.0.remove(0))
    } else {
        Geometry::MultiPolygon(clipped)
    }
}

fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
