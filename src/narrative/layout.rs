//! Circle packing by iterative relaxation.
//!
//! A fixed number of passes of weak mutual repulsion, a pull toward the
//! centre, collision resolution and boundary containment. The iteration
//! count is fixed so a given seed always yields the same layout.

/// A circle being laid out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutNode {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    vx: f64,
    vy: f64,
}

impl LayoutNode {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius, vx: 0.0, vy: 0.0 }
    }
}

/// Tuning of the relaxation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    pub iterations: usize,
    /// Gap kept between neighbouring circles
    pub padding: f64,
    /// Strength of the per-axis pull toward the centre
    pub pull: f64,
    /// Strength of pairwise repulsion
    pub repulsion: f64,
    /// Fraction of velocity lost each pass
    pub velocity_decay: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            iterations: 300,
            padding: 3.0,
            pull: 0.05,
            repulsion: 5.0,
            velocity_decay: 0.4,
        }
    }
}

/// Relax `nodes` around `center`, keeping them inside `bounds` (width, height).
pub fn relax_layout(nodes: &mut [LayoutNode], center: (f64, f64), bounds: (f64, f64), params: &LayoutParams) {
    if nodes.is_empty() {
        return;
    }

    let alpha_min: f64 = 0.001;
    let alpha_decay = 1.0 - alpha_min.powf(1.0 / params.iterations.max(1) as f64);
    let mut alpha = 1.0;

    for _ in 0..params.iterations {
        alpha += (0.0 - alpha) * alpha_decay;

        // Repulsion, falling off with distance.
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let dx = nodes[j].x - nodes[i].x;
                let dy = nodes[j].y - nodes[i].y;
                let dist2 = (dx * dx + dy * dy).max(1.0);
                let force = params.repulsion * alpha / dist2;
                nodes[i].vx -= dx * force;
                nodes[i].vy -= dy * force;
                nodes[j].vx += dx * force;
                nodes[j].vy += dy * force;
            }
        }

        for node in nodes.iter_mut() {
            node.vx += (center.0 - node.x) * params.pull * alpha;
            node.vy += (center.1 - node.y) * params.pull * alpha;
        }

        for node in nodes.iter_mut() {
            node.vx *= 1.0 - params.velocity_decay;
            node.vy *= 1.0 - params.velocity_decay;
            node.x += node.vx;
            node.y += node.vy;
        }

        recenter(nodes, center);
        resolve_collisions(nodes, params.padding);
        contain(nodes, bounds);
    }
}

/// Shift every node so the centroid sits on `center`.
fn recenter(nodes: &mut [LayoutNode], center: (f64, f64)) {
    let n = nodes.len() as f64;
    let (sx, sy) = nodes.iter().fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
    let (dx, dy) = (center.0 - sx / n, center.1 - sy / n);
    for node in nodes.iter_mut() {
        node.x += dx;
        node.y += dy;
    }
}

/// Push overlapping pairs apart, the smaller circle moving further.
fn resolve_collisions(nodes: &mut [LayoutNode], padding: f64) {
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let min_dist = nodes[i].radius + nodes[j].radius + 2.0 * padding;
            let mut dx = nodes[j].x - nodes[i].x;
            let mut dy = nodes[j].y - nodes[i].y;
            let mut dist = (dx * dx + dy * dy).sqrt();
            if dist >= min_dist {
                continue;
            }
            if dist < 1e-6 {
                // Coincident centres: separate along a deterministic angle.
                let angle = (i * 7 + j * 13) as f64 * 2.399_963;
                dx = angle.cos();
                dy = angle.sin();
                dist = 1.0;
            }
            let overlap = (min_dist - dist) / dist;
            let wi = nodes[i].radius * nodes[i].radius;
            let wj = nodes[j].radius * nodes[j].radius;
            let share_j = if wi + wj > 0.0 { wi / (wi + wj) } else { 0.5 };
            let share_i = 1.0 - share_j;
            nodes[i].x -= dx * overlap * share_i;
            nodes[i].y -= dy * overlap * share_i;
            nodes[j].x += dx * overlap * share_j;
            nodes[j].y += dy * overlap * share_j;
        }
    }
}

fn contain(nodes: &mut [LayoutNode], bounds: (f64, f64)) {
    for node in nodes.iter_mut() {
        let r = node.radius.min(bounds.0 / 2.0).min(bounds.1 / 2.0);
        node.x = node.x.clamp(r, bounds.0 - r);
        node.y = node.y.clamp(r, bounds.1 - r);
    }
}
