//! Flow of deaths from conflict types to military and civilian casualties.

use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};

use crate::data::queries::{sankey_data, SankeyData, SankeyNodeKind, CIVILIAN_NODE};
use crate::data::{format_number, ConflictRecord, ConflictType};
use crate::filters::FilterState;

use super::{frame, shade, ChartView};

/// Layout surface, in the same units as the node sizes below.
const LAYOUT_WIDTH: f64 = 400.0;
const LAYOUT_HEIGHT: f64 = 300.0;
const NODE_WIDTH: f64 = 20.0;
const NODE_PADDING: f64 = 40.0;

const MILITARY_COLOR: (u8, u8, u8) = (0x27, 0xae, 0x60);
const CIVILIAN_COLOR: (u8, u8, u8) = (0xf3, 0x9c, 0x12);

#[derive(Clone, Debug, PartialEq)]
pub struct NodeBox {
    pub name: String,
    pub kind: SankeyNodeKind,
    pub value: u64,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkBand {
    pub source: usize,
    pub target: usize,
    pub value: u64,
    pub width: f64,
    /// Centre of the band where it leaves the source node
    pub y_source: f64,
    /// Centre of the band where it enters the target node
    pub y_target: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SankeyLayout {
    pub nodes: Vec<NodeBox>,
    pub links: Vec<LinkBand>,
}

/// Two-column layout: node heights proportional to value with a common
/// scale, each column stacked with padding and centred vertically.
pub fn layout_sankey(data: &SankeyData, width: f64, height: f64, node_width: f64, padding: f64) -> SankeyLayout {
    let columns = [SankeyNodeKind::Conflict, SankeyNodeKind::Casualty];
    let members = |kind: SankeyNodeKind| -> Vec<usize> {
        (0..data.nodes.len()).filter(|i| data.nodes[*i].kind == kind).collect()
    };

    // One scale for every column, limited by the most crowded one.
    let ky = columns
        .iter()
        .filter_map(|kind| {
            let nodes = members(*kind);
            let total: u64 = nodes.iter().map(|i| data.node_value(*i)).sum();
            if total == 0 {
                return None;
            }
            let room = height - padding * nodes.len().saturating_sub(1) as f64;
            Some(room.max(0.0) / total as f64)
        })
        .fold(f64::INFINITY, f64::min);
    if !ky.is_finite() {
        return SankeyLayout::default();
    }

    let mut boxes: Vec<Option<NodeBox>> = vec![None; data.nodes.len()];
    for kind in columns {
        let nodes = members(kind);
        let x0 = match kind {
            SankeyNodeKind::Conflict => 0.0,
            SankeyNodeKind::Casualty => width - node_width,
        };
        let used: f64 = nodes.iter().map(|i| data.node_value(*i) as f64 * ky).sum::<f64>()
            + padding * nodes.len().saturating_sub(1) as f64;
        let mut y = ((height - used) / 2.0).max(0.0);
        for i in nodes {
            let value = data.node_value(i);
            let h = value as f64 * ky;
            boxes[i] = Some(NodeBox {
                name: data.nodes[i].name.clone(),
                kind,
                value,
                x0,
                x1: x0 + node_width,
                y0: y,
                y1: y + h,
            });
            y += h + padding;
        }
    }
    let nodes: Vec<NodeBox> = boxes.into_iter().flatten().collect();

    let mut out_offset = vec![0.0; nodes.len()];
    let mut in_offset = vec![0.0; nodes.len()];
    let links = data
        .links
        .iter()
        .map(|link| {
            let w = link.value as f64 * ky;
            let y_source = nodes[link.source].y0 + out_offset[link.source] + w / 2.0;
            let y_target = nodes[link.target].y0 + in_offset[link.target] + w / 2.0;
            out_offset[link.source] += w;
            in_offset[link.target] += w;
            LinkBand { source: link.source, target: link.target, value: link.value, width: w, y_source, y_target }
        })
        .collect();

    SankeyLayout { nodes, links }
}

#[derive(Clone, Debug, Default)]
pub struct SankeyView {
    data: SankeyData,
    layout: SankeyLayout,
}

impl SankeyView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &SankeyData {
        &self.data
    }

    pub fn layout(&self) -> &SankeyLayout {
        &self.layout
    }
}

impl ChartView for SankeyView {
    fn name(&self) -> &'static str {
        "Deaths by type"
    }

    fn update(&mut self, data: &[ConflictRecord], _state: &FilterState) {
        self.data = sankey_data(data);
        self.layout = layout_sankey(&self.data, LAYOUT_WIDTH, LAYOUT_HEIGHT, NODE_WIDTH, NODE_PADDING);
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let inner = frame(area, buf, self.name());
        if self.layout.nodes.is_empty() {
            buf.set_string(inner.x, inner.y, "No casualties in selection", Style::default().fg(Color::DarkGray));
            return;
        }
        let flip = |y: f64| LAYOUT_HEIGHT - y;

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, LAYOUT_WIDTH])
            .y_bounds([0.0, LAYOUT_HEIGHT])
            .paint(|ctx| {
                for link in &self.layout.links {
                    let (source, target) = (&self.layout.nodes[link.source], &self.layout.nodes[link.target]);
                    let tint = if target.name == CIVILIAN_NODE { CIVILIAN_COLOR } else { MILITARY_COLOR };
                    let color = shade(tint, 0.4);
                    // Thick bands become a fan of parallel strokes.
                    let strokes = (link.width / 3.0).ceil().max(1.0) as usize;
                    for s in 0..strokes {
                        let offset = (s as f64 + 0.5) / strokes as f64 * link.width - link.width / 2.0;
                        ctx.draw(&CanvasLine {
                            x1: source.x1,
                            y1: flip(link.y_source + offset),
                            x2: target.x0,
                            y2: flip(link.y_target + offset),
                            color,
                        });
                    }
                }
                ctx.layer();
                for node in &self.layout.nodes {
                    let rgb = match node.kind {
                        SankeyNodeKind::Conflict => ConflictType::from(node.name.as_str()).color(),
                        SankeyNodeKind::Casualty if node.name == CIVILIAN_NODE => CIVILIAN_COLOR,
                        SankeyNodeKind::Casualty => MILITARY_COLOR,
                    };
                    let color = shade(rgb, 1.0);
                    let mut y = node.y0;
                    while y <= node.y1 {
                        ctx.draw(&CanvasLine { x1: node.x0, y1: flip(y), x2: node.x1, y2: flip(y), color });
                        y += 1.0;
                    }
                    let label = format!("{} {}", node.name, format_number(node.value as f64));
                    let x = match node.kind {
                        SankeyNodeKind::Conflict => node.x1 + 4.0,
                        SankeyNodeKind::Casualty => node.x0 - 4.0 - label.chars().count() as f64 * 6.0,
                    };
                    ctx.print(x, flip((node.y0 + node.y1) / 2.0), label.white());
                }
            })
            .render(inner, buf);
    }
}
