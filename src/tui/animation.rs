//! Smoothed progress bar fill

/// Share of the remaining distance covered per tick
pub const SMOOTHING: f64 = 0.15;

/// Distance at which the fill snaps onto its target
const SNAP_DISTANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressAnimation {
    shown: f64,
}

impl ProgressAnimation {
    /// Fill currently drawn, in `0.0..=1.0`
    pub fn shown(&self) -> f64 {
        self.shown
    }

    /// Move one tick toward `target`; false once the fill has arrived
    pub fn step(&mut self, target: f64) -> bool {
        let target = target.clamp(0.0, 1.0);
        let distance = target - self.shown;

        if distance.abs() <= SNAP_DISTANCE {
            self.shown = target;
            return false;
        }

        self.shown += distance * SMOOTHING;
        true
    }

    pub fn reset(&mut self) {
        self.shown = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_approaches_target_monotonically() {
        let mut bar = ProgressAnimation::default();
        let mut previous = bar.shown();

        assert!(bar.step(0.5));
        assert!((bar.shown() - 0.075).abs() < 1e-9);

        let mut ticks = 0;
        while bar.step(0.5) {
            assert!(bar.shown() > previous && bar.shown() < 0.5);
            previous = bar.shown();
            ticks += 1;
            assert!(ticks < 1000, "animation never settled");
        }
        assert_eq!(bar.shown(), 0.5);
    }

    #[test]
    fn test_step_clamps_target() {
        let mut bar = ProgressAnimation::default();
        while bar.step(7.0) {}
        assert_eq!(bar.shown(), 1.0);
        assert!(!bar.step(1.0));
    }

    #[test]
    fn test_reset() {
        let mut bar = ProgressAnimation::default();
        bar.step(1.0);
        bar.reset();
        assert_eq!(bar.shown(), 0.0);
    }
}
