//! KML polygon extraction.

use super::{BoundaryError, BoundaryReader};
use crate::region::{Polygon, Vertex};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

/// Reads the outer ring of every `Polygon` in a KML document.
///
/// Placemarks may sit directly in the document, in a `Document`, or in
/// nested `Folder`s; only the element path
/// `Polygon/outerBoundaryIs/LinearRing/coordinates` matters. Inner rings
/// (holes) are ignored since planning only uses the bounding box.
#[derive(Debug, Clone, Copy, Default)]
pub struct KmlBoundaryReader;

impl KmlBoundaryReader {
    /// Parses KML text. `path` is only used in error messages.
    pub fn parse_str(&self, xml: &str, path: &Path) -> Result<Vec<Polygon>, BoundaryError> {
        let malformed = |reason: String| BoundaryError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut ring_text = String::new();
        let mut polygons = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if name == "coordinates" {
                        ring_text.clear();
                    }
                    stack.push(name);
                }
                Ok(Event::Text(ref e)) => {
                    if in_outer_ring(&stack) {
                        let text = e.unescape().map_err(|e| malformed(e.to_string()))?;
                        ring_text.push_str(&text);
                        ring_text.push(' ');
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if in_outer_ring(&stack) {
                        ring_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                        ring_text.push(' ');
                    }
                }
                Ok(Event::End(_)) => {
                    if in_outer_ring(&stack) {
                        let vertices = parse_coordinates(&ring_text).map_err(malformed)?;
                        let polygon =
                            Polygon::new(vertices).map_err(|source| BoundaryError::InvalidPolygon {
                                path: path.to_path_buf(),
                                source,
                            })?;
                        polygons.push(polygon);
                    }
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(malformed(format!(
                        "XML error at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(polygons)
    }
}

impl BoundaryReader for KmlBoundaryReader {
    fn read(&self, path: &Path) -> Result<Vec<Polygon>, BoundaryError> {
        let xml = std::fs::read_to_string(path).map_err(|source| BoundaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&xml, path)
    }
}

/// True while inside `Polygon/outerBoundaryIs/LinearRing/coordinates`.
fn in_outer_ring(stack: &[String]) -> bool {
    const RING: [&str; 4] = ["Polygon", "outerBoundaryIs", "LinearRing", "coordinates"];
    stack.len() >= RING.len()
        && stack[stack.len() - RING.len()..]
            .iter()
            .zip(RING)
            .all(|(have, want)| have == want)
}

/// Parses whitespace-separated `lon,lat[,alt]` tuples.
fn parse_coordinates(text: &str) -> Result<Vec<Vertex>, String> {
    text.split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',');
            let lon = parts.next().and_then(|s| s.trim().parse::<f64>().ok());
            let lat = parts.next().and_then(|s| s.trim().parse::<f64>().ok());
            match (lon, lat) {
                (Some(lon), Some(lat)) => Ok(Vertex::new(lon, lat)),
                _ => Err(format!("bad coordinate tuple '{}'", tuple)),
            }
        })
        .collect()
}
