//! Geometry encoding: `Polygon`/`MultiPolygon` as `LinearRing` sets under
//! one `MultiGeometry`, `Point` as a single coordinate.

use std::io::Write;

use geo::{Coord, Geometry, LineString, Polygon};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::{KmlError, write_text_element};

/// Writes the geometry element(s) of one placemark. Geometry kinds KML
/// placemarks here do not carry are skipped with a warning.
pub(crate) fn write_geometry<W: Write>(
    writer: &mut Writer<W>,
    geometry: &Geometry<f64>,
) -> Result<(), KmlError> {
    match geometry {
        Geometry::Polygon(polygon) => {
            writer.write_event(Event::Start(BytesStart::new("MultiGeometry")))?;
            write_polygon(writer, polygon)?;
            writer.write_event(Event::End(BytesEnd::new("MultiGeometry")))?;
        }
        Geometry::MultiPolygon(multi) => {
            writer.write_event(Event::Start(BytesStart::new("MultiGeometry")))?;
            for polygon in multi {
                write_polygon(writer, polygon)?;
            }
            writer.write_event(Event::End(BytesEnd::new("MultiGeometry")))?;
        }
        Geometry::Point(point) => {
            writer.write_event(Event::Start(BytesStart::new("Point")))?;
            write_text_element(writer, "coordinates", &format_coord(point.0))?;
            writer.write_event(Event::End(BytesEnd::new("Point")))?;
        }
        _ => log::warn!("Skipping non-polygonal geometry in KML output"),
    }
    Ok(())
}

fn write_polygon<W: Write>(writer: &mut Writer<W>, polygon: &Polygon<f64>) -> Result<(), KmlError> {
    writer.write_event(Event::Start(BytesStart::new("Polygon")))?;
    write_ring(writer, "outerBoundaryIs", polygon.exterior())?;
    for interior in polygon.interiors() {
        write_ring(writer, "innerBoundaryIs", interior)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Polygon")))?;
    Ok(())
}

fn write_ring<W: Write>(
    writer: &mut Writer<W>,
    boundary: &str,
    ring: &LineString<f64>,
) -> Result<(), KmlError> {
    writer.write_event(Event::Start(BytesStart::new(boundary)))?;
    writer.write_event(Event::Start(BytesStart::new("LinearRing")))?;
    write_text_element(writer, "coordinates", &format_ring(ring))?;
    writer.write_event(Event::End(BytesEnd::new("LinearRing")))?;
    writer.write_event(Event::End(BytesEnd::new(boundary)))?;
    Ok(())
}

/// `lon,lat,0` tuples separated by single spaces, in ring order.
fn format_ring(ring: &LineString<f64>) -> String {
    ring.coords()
        .map(|c| format_coord(*c))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_coord(coord: Coord<f64>) -> String {
    format!("{},{},0", coord.x, coord.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, line_string};

    #[test]
    fn formats_rings_in_order() {
        let ring = line_string![
            (x: 139.5, y: 35.0),
            (x: 139.6, y: 35.0),
            (x: 139.6, y: 35.1),
            (x: 139.5, y: 35.0),
        ];
        assert_eq!(
            format_ring(&ring),
            "139.5,35,0 139.6,35,0 139.6,35.1,0 139.5,35,0"
        );
    }

    #[test]
    fn formats_single_coordinate() {
        assert_eq!(format_coord(coord! { x: -0.25, y: 1.0 }), "-0.25,1,0");
    }
}
