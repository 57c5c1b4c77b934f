//! Death particles.
//!
//! When the story breaks the conflicts apart, each one becomes a handful of
//! small particles standing for a slice of its death toll. Particles are
//! then classified military or civilian by a weighted draw on the
//! conflict's military share and gathered into two clusters.

use rand::Rng;

use crate::scales::SqrtScale;

/// Which side of the split a particle fell on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleKind {
    Military,
    Civilian,
}

/// A particle waiting to be spawned on the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Dataset index of the originating conflict
    pub conflict: usize,
    /// Position of the conflict on the timeline
    pub start: (f64, f64),
    /// Where the particle settles after bursting out
    pub target: (f64, f64),
    /// Index within its conflict
    pub index: usize,
}

/// Input for one conflict being broken apart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Burst {
    pub conflict: usize,
    pub center: (f64, f64),
    pub total_deaths: u64,
    pub count: usize,
}

/// Scatter particles around each burst centre. The scatter radius grows
/// with the square root of the death toll (20 to 120 units).
pub fn scatter_particles<R: Rng>(bursts: &[Burst], rng: &mut R) -> Vec<Particle> {
    let max_deaths = bursts.iter().map(|b| b.total_deaths).max().unwrap_or(0) as f64;
    let spread_scale = SqrtScale::new((0.0, max_deaths), (20.0, 120.0));

    let mut particles = Vec::with_capacity(bursts.iter().map(|b| b.count).sum());
    for burst in bursts {
        let spread = spread_scale.map(burst.total_deaths as f64);
        for index in 0..burst.count {
            let y_offset = (rng.gen::<f64>() - 0.5) * 2.0 * spread;
            let x_jitter = (rng.gen::<f64>() - 0.5) * spread * 0.8;
            particles.push(Particle {
                conflict: burst.conflict,
                start: burst.center,
                target: (burst.center.0 + x_jitter, burst.center.1 + y_offset),
                index,
            });
        }
    }
    particles
}

/// Stagger delay for the burst animation: particles go out in waves of 50.
pub fn stagger_delay(position: usize) -> f64 {
    (position % 50) as f64 * 10.0
}

/// Bernoulli draw: military with probability `military_pct`.
pub fn classify<R: Rng>(military_pct: f64, rng: &mut R) -> ParticleKind {
    if rng.gen::<f64>() < military_pct {
        ParticleKind::Military
    } else {
        ParticleKind::Civilian
    }
}

/// Radius of a cluster holding `count` particles.
pub fn cluster_radius(count: usize) -> f64 {
    (count as f64).sqrt() * 5.0
}

/// A random spot in a cluster of `count` particles around `center`.
pub fn cluster_position<R: Rng>(center: (f64, f64), count: usize, rng: &mut R) -> (f64, f64) {
    let spread = cluster_radius(count) * 1.5;
    (
        center.0 + (rng.gen::<f64>() - 0.5) * spread,
        center.1 + (rng.gen::<f64>() - 0.5) * spread,
    )
}
