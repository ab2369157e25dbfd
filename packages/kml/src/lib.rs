#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! KML document writer.
//!
//! Serializes a [`ParcelDataset`] into a KML 2.2 document with one
//! `Placemark` per record that has a geometry. Every geometry is
//! reprojected to WGS84 before anything is written, so a reprojection
//! failure yields no document at all.

mod geometry;

use std::io::Write;

use geo::Geometry;
use koji_map_parcel_models::{ColumnRole, ParcelDataset};
use koji_map_projection::{ProjectionError, Reprojector};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};

/// KML 2.2 namespace.
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Errors that can occur while writing a KML document.
#[derive(Debug, thiserror::Error)]
pub enum KmlError {
    /// Geometry could not be reprojected to WGS84.
    #[error("Reprojection error: {0}")]
    Reprojection(#[from] ProjectionError),

    /// XML writer error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error from the underlying buffer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The written document was not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Presentation constants of the shared placemark style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct KmlStyle {
    /// `Style` element id referenced by every placemark.
    pub id: String,
    /// Outline colour, KML `aabbggrr`.
    pub line_color: String,
    /// Outline width in pixels.
    pub line_width: u32,
    /// Fill colour, KML `aabbggrr`.
    pub poly_color: String,
}

impl Default for KmlStyle {
    fn default() -> Self {
        Self {
            id: "PolygonStyle".to_string(),
            line_color: "ff0000ff".to_string(),
            line_width: 2,
            poly_color: "3300ff00".to_string(),
        }
    }
}

/// Writes `dataset` as a KML document named `name`.
///
/// Placemarks are named after the record's parcel number, or
/// `{parcel column}_{index}` when it is null or the column is absent.
/// Records without geometry are left out.
///
/// # Errors
///
/// Returns [`KmlError::Reprojection`] if the dataset has no CRS or any
/// coordinate fails to transform, or an XML/I/O error from the writer.
pub fn write_kml(dataset: &ParcelDataset, name: &str, style: &KmlStyle) -> Result<String, KmlError> {
    let reprojector = Reprojector::to_wgs84(dataset.crs())?;

    let mut placemarks = Vec::with_capacity(dataset.len());
    for (idx, record) in dataset.records().iter().enumerate() {
        let Some(geometry) = record.geometry.as_ref() else {
            continue;
        };
        placemarks.push((idx, record, reprojector.reproject(geometry)?));
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut kml = BytesStart::new("kml");
    kml.push_attribute(("xmlns", KML_NAMESPACE));
    writer.write_event(Event::Start(kml))?;
    writer.write_event(Event::Start(BytesStart::new("Document")))?;
    write_text_element(&mut writer, "name", name)?;
    write_style(&mut writer, style)?;

    let style_url = format!("#{}", style.id);
    for (idx, record, geometry) in &placemarks {
        let placemark_name = dataset
            .text(record, ColumnRole::ParcelNumber)
            .map_or_else(
                || format!("{}_{idx}", dataset.schema().label(ColumnRole::ParcelNumber)),
                |s| s.into_owned(),
            );
        let description: String = dataset
            .schema()
            .columns()
            .iter()
            .zip(&record.values)
            .map(|(column, value)| {
                let value = value.as_ref().map(ToString::to_string).unwrap_or_default();
                format!("{column}: {value}<br/>")
            })
            .collect();

        write_placemark(&mut writer, &placemark_name, &description, &style_url, geometry)?;
    }

    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    writer.write_event(Event::End(BytesEnd::new("kml")))?;

    log::debug!("Wrote KML document '{name}' with {} placemarks", placemarks.len());

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_style<W: Write>(writer: &mut Writer<W>, style: &KmlStyle) -> Result<(), KmlError> {
    let mut start = BytesStart::new("Style");
    start.push_attribute(("id", style.id.as_str()));
    writer.write_event(Event::Start(start))?;

    writer.write_event(Event::Start(BytesStart::new("LineStyle")))?;
    write_text_element(writer, "color", &style.line_color)?;
    write_text_element(writer, "width", &style.line_width.to_string())?;
    writer.write_event(Event::End(BytesEnd::new("LineStyle")))?;

    writer.write_event(Event::Start(BytesStart::new("PolyStyle")))?;
    write_text_element(writer, "color", &style.poly_color)?;
    writer.write_event(Event::End(BytesEnd::new("PolyStyle")))?;

    writer.write_event(Event::End(BytesEnd::new("Style")))?;
    Ok(())
}

fn write_placemark<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    description: &str,
    style_url: &str,
    geometry: &Geometry<f64>,
) -> Result<(), KmlError> {
    writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
    write_text_element(writer, "name", name)?;
    write_text_element(writer, "description", description)?;
    write_text_element(writer, "styleUrl", style_url)?;
    geometry::write_geometry(writer, geometry)?;
    writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
    Ok(())
}

/// `<tag>text</tag>` with `text` escaped.
pub(crate) fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), KmlError> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
