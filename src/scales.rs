//! Continuous scales mapping data values to screen positions and sizes.

/// Linear interpolation from a domain to a range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Evenly spaced round values across the domain, at most `count + 1`.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = (self.domain.0.min(self.domain.1), self.domain.0.max(self.domain.1));
        if count == 0 || hi <= lo {
            return vec![lo];
        }
        let raw = (hi - lo) / count as f64;
        let magnitude = 10f64.powf(raw.log10().floor());
        let step = [1.0, 2.0, 5.0, 10.0]
            .iter()
            .map(|m| m * magnitude)
            .find(|s| *s >= raw)
            .unwrap_or(10.0 * magnitude);
        let mut ticks = Vec::new();
        let mut t = (lo / step).ceil() * step;
        while t <= hi + step * 1e-9 {
            ticks.push(t);
            t += step;
        }
        ticks
    }
}

/// Area-proportional size scale: output grows with the square root of the
/// input, so a mark's area tracks the value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SqrtScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl SqrtScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let linear = LinearScale::new(
            (self.domain.0.max(0.0).sqrt(), self.domain.1.max(0.0).sqrt()),
            self.range,
        );
        linear.map(value.max(0.0).sqrt())
    }
}

/// Base-10 logarithmic scale, clamped to its domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LogScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let (lo, hi) = (self.domain.0.min(self.domain.1), self.domain.0.max(self.domain.1));
        let clamped = value.clamp(lo, hi).max(f64::MIN_POSITIVE);
        let linear = LinearScale::new((self.domain.0.log10(), self.domain.1.log10()), self.range);
        linear.map(clamped.log10())
    }
}

/// Either a linear or a log value axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValueScale {
    Linear(LinearScale),
    Log(LogScale),
}

impl ValueScale {
    pub fn map(&self, value: f64) -> f64 {
        match self {
            ValueScale::Linear(s) => s.map(value),
            ValueScale::Log(s) => s.map(value),
        }
    }

    pub fn is_log(&self) -> bool {
        matches!(self, ValueScale::Log(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        let s = LinearScale::new((700.0, 2025.0), (100.0, 1100.0));
        assert_eq!(s.map(700.0), 100.0);
        assert_eq!(s.map(2025.0), 1100.0);
        assert_eq!(s.map(1362.5), 600.0);
    }

    #[test]
    fn test_sqrt_is_area_proportional() {
        let s = SqrtScale::new((0.0, 100.0), (0.0, 10.0));
        assert_eq!(s.map(25.0), 5.0);
        assert_eq!(s.map(100.0), 10.0);
    }

    #[test]
    fn test_log_clamps() {
        let s = LogScale::new((1000.0, 1_000_000.0), (0.0, 3.0));
        assert!((s.map(10_000.0) - 1.0).abs() < 1e-9);
        assert_eq!(s.map(1.0), 0.0);
        assert!((s.map(1e9) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_ticks_are_round() {
        let s = LinearScale::new((700.0, 2025.0), (0.0, 1.0));
        let ticks = s.ticks(10);
        assert_eq!(ticks.first(), Some(&800.0));
        assert!(ticks.iter().all(|t| t % 100.0 == 0.0));
    }
}
