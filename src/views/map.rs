//! World map with conflicts as circles.
//!
//! Country outlines come from the world-atlas TopoJSON. When it cannot be
//! fetched or decoded the map falls back to six coarse continent outlines
//! and logs a warning; the map never fails.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::time::Duration;

use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Circle, Line as CanvasLine};
use serde::Deserialize;
use thiserror::Error;

use crate::data::ConflictRecord;
use crate::filters::{highlight_opacity, FilterState};
use crate::scales::SqrtScale;

use super::{frame, shade, ChartView};

/// Virtual drawing surface the projection maps onto.
pub const MAP_WIDTH: f64 = 960.0;
pub const MAP_HEIGHT: f64 = 600.0;

const LAND_COLOR: (u8, u8, u8) = (0xb0, 0xc4, 0xde);

/// A closed outline as (longitude, latitude) pairs.
pub type Ring = Vec<(f64, f64)>;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Http(u16),
    #[error("malformed topology: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("topology has no object named {0:?}")]
    MissingObject(String),
}

/// Mercator projection centred on 40N.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mercator {
    pub scale: f64,
    pub width: f64,
    pub height: f64,
    center_y: f64,
}

impl Mercator {
    pub fn new(width: f64, height: f64) -> Self {
        Self { scale: width / 6.5, width, height, center_y: mercator_y(40.0) }
    }

    /// Screen position with y growing downwards.
    pub fn project(&self, longitude: f64, latitude: f64) -> (f64, f64) {
        let x = self.width / 2.0 + self.scale * longitude.to_radians();
        let y = self.height / 2.0 - self.scale * (mercator_y(latitude) - self.center_y);
        (x, y)
    }
}

fn mercator_y(latitude: f64) -> f64 {
    // Clamp short of the poles, where the projection diverges.
    let phi = latitude.clamp(-85.0, 85.0).to_radians();
    (PI / 4.0 + phi / 2.0).tan().ln()
}

#[derive(Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<TopoTransform>,
    objects: HashMap<String, TopoGeometry>,
    arcs: Vec<Vec<[f64; 2]>>,
}

#[derive(Deserialize)]
struct TopoTransform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum TopoGeometry {
    GeometryCollection { geometries: Vec<TopoGeometry> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
    #[serde(other)]
    Other,
}

/// Decode the rings of one TopoJSON object into longitude/latitude outlines.
pub fn decode_topojson(json: &str, object: &str) -> Result<Vec<Ring>, GeometryError> {
    let topology: Topology = serde_json::from_str(json)?;
    let geometry = topology
        .objects
        .get(object)
        .ok_or_else(|| GeometryError::MissingObject(object.to_string()))?;

    let arcs = decode_arcs(&topology.arcs, topology.transform.as_ref());
    let mut rings = Vec::new();
    collect_rings(geometry, &arcs, &mut rings);
    Ok(rings)
}

/// Undo delta encoding and quantization of every arc.
fn decode_arcs(raw: &[Vec<[f64; 2]>], transform: Option<&TopoTransform>) -> Vec<Ring> {
    raw.iter()
        .map(|arc| match transform {
            Some(t) => {
                let (mut x, mut y) = (0.0, 0.0);
                arc.iter()
                    .map(|[dx, dy]| {
                        x += dx;
                        y += dy;
                        (x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                    })
                    .collect()
            }
            None => arc.iter().map(|[x, y]| (*x, *y)).collect(),
        })
        .collect()
}

fn collect_rings(geometry: &TopoGeometry, arcs: &[Ring], out: &mut Vec<Ring>) {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_rings(g, arcs, out);
            }
        }
        TopoGeometry::Polygon { arcs: rings } => {
            out.extend(rings.iter().map(|r| stitch_ring(r, arcs)));
        }
        TopoGeometry::MultiPolygon { arcs: polygons } => {
            for rings in polygons {
                out.extend(rings.iter().map(|r| stitch_ring(r, arcs)));
            }
        }
        TopoGeometry::Other => {}
    }
}

/// Join arcs into a ring. A negative index `i` means arc `!i` reversed;
/// consecutive arcs share an endpoint, which is kept once.
fn stitch_ring(indices: &[i64], arcs: &[Ring]) -> Ring {
    let mut ring: Ring = Vec::new();
    for &index in indices {
        let (arc_index, reversed) = if index < 0 { (!index as usize, true) } else { (index as usize, false) };
        let Some(arc) = arcs.get(arc_index) else { continue };
        let mut points = arc.clone();
        if reversed {
            points.reverse();
        }
        if !ring.is_empty() {
            points.remove(0);
        }
        ring.extend(points);
    }
    ring
}

/// Fetch and decode the world boundaries.
pub fn fetch_world_geometry(url: &str) -> Result<Vec<Ring>, GeometryError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(GeometryError::Http(response.status().as_u16()));
    }
    let text = response.text()?;
    decode_topojson(&text, "countries")
}

/// Coarse continent outlines used when the world atlas is unavailable.
pub fn fallback_continents() -> Vec<(&'static str, Ring)> {
    vec![
        ("North America", vec![(-165.0, 65.0), (-140.0, 70.0), (-95.0, 72.0), (-60.0, 60.0), (-55.0, 48.0),
            (-80.0, 25.0), (-97.0, 18.0), (-85.0, 10.0), (-105.0, 22.0), (-125.0, 40.0), (-135.0, 58.0)]),
        ("South America", vec![(-80.0, 10.0), (-60.0, 10.0), (-35.0, -7.0), (-40.0, -22.0), (-58.0, -38.0),
            (-70.0, -55.0), (-75.0, -40.0), (-72.0, -18.0), (-81.0, -5.0)]),
        ("Europe", vec![(-10.0, 36.0), (-9.0, 43.0), (-2.0, 48.0), (5.0, 58.0), (25.0, 71.0), (40.0, 67.0),
            (45.0, 45.0), (28.0, 41.0), (15.0, 38.0)]),
        ("Africa", vec![(-17.0, 15.0), (-6.0, 36.0), (10.0, 37.0), (32.0, 31.0), (43.0, 12.0), (51.0, 11.0),
            (40.0, -15.0), (20.0, -35.0), (12.0, -18.0), (9.0, 4.0), (-8.0, 4.0)]),
        ("Asia", vec![(45.0, 45.0), (40.0, 67.0), (70.0, 73.0), (140.0, 72.0), (180.0, 66.0), (142.0, 45.0),
            (122.0, 30.0), (108.0, 10.0), (80.0, 8.0), (57.0, 24.0), (35.0, 30.0)]),
        ("Oceania", vec![(114.0, -22.0), (130.0, -12.0), (142.0, -11.0), (153.0, -28.0), (146.0, -39.0),
            (130.0, -32.0), (115.0, -34.0)]),
    ]
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapCircle {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: (u8, u8, u8),
    pub opacity: f64,
}

#[derive(Clone, Debug)]
pub struct MapView {
    projection: Mercator,
    /// Land outlines already projected to screen space
    land: Vec<Vec<(f64, f64)>>,
    using_fallback: bool,
    circles: Vec<MapCircle>,
}

impl MapView {
    /// A map over the given outlines, or the fallback continents if `None`.
    pub fn new(outlines: Option<Vec<Ring>>) -> Self {
        let projection = Mercator::new(MAP_WIDTH, MAP_HEIGHT);
        let using_fallback = outlines.is_none();
        let rings = outlines.unwrap_or_else(|| fallback_continents().into_iter().map(|(_, ring)| ring).collect());
        let land = rings
            .iter()
            .map(|ring| {
                let mut points: Vec<(f64, f64)> = ring.iter().map(|&(lon, lat)| projection.project(lon, lat)).collect();
                if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
                    if first != last {
                        points.push(first);
                    }
                }
                points
            })
            .collect();
        Self { projection, land, using_fallback, circles: Vec::new() }
    }

    /// Build the map, fetching world boundaries from `url` when given.
    pub fn load(url: Option<&str>) -> Self {
        let Some(url) = url else {
            return Self::new(None);
        };
        match fetch_world_geometry(url) {
            Ok(rings) => {
                tracing::info!(rings = rings.len(), "loaded world geometry");
                Self::new(Some(rings))
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not load world map, using simplified continents");
                Self::new(None)
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.using_fallback
    }

    pub fn circles(&self) -> &[MapCircle] {
        &self.circles
    }
}

impl ChartView for MapView {
    fn name(&self) -> &'static str {
        "Map"
    }

    fn update(&mut self, data: &[ConflictRecord], state: &FilterState) {
        let max_deaths = data.iter().map(|r| r.total_deaths).max().filter(|m| *m > 0).unwrap_or(1_000_000);
        let size = SqrtScale::new((0.0, max_deaths as f64), (3.0, 40.0));
        let selected = state.selected_conflict.as_deref();

        self.circles = data
            .iter()
            .map(|r| {
                let (x, y) = self.projection.project(r.longitude, r.latitude);
                MapCircle {
                    name: r.name.clone(),
                    x,
                    y,
                    radius: size.map(r.total_deaths as f64),
                    color: r.conflict_type.color(),
                    opacity: 0.5 * highlight_opacity(selected, &r.name),
                }
            })
            .collect();
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let title = if self.using_fallback { "Map (simplified)" } else { "Map" };
        let inner = frame(area, buf, title);
        let land = shade(LAND_COLOR, 0.6);

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, MAP_WIDTH])
            .y_bounds([0.0, MAP_HEIGHT])
            .paint(|ctx| {
                for ring in &self.land {
                    for pair in ring.windows(2) {
                        let ((x1, y1), (x2, y2)) = (pair[0], pair[1]);
                        // Skip segments that wrap around the antimeridian.
                        if (x2 - x1).abs() > MAP_WIDTH / 2.0 {
                            continue;
                        }
                        ctx.draw(&CanvasLine { x1, y1: MAP_HEIGHT - y1, x2, y2: MAP_HEIGHT - y2, color: land });
                    }
                }
                ctx.layer();
                for c in &self.circles {
                    ctx.draw(&Circle { x: c.x, y: MAP_HEIGHT - c.y, radius: c.radius, color: shade(c.color, c.opacity.max(0.3)) });
                }
            })
            .render(inner, buf);
    }
}
