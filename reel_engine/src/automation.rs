//! Position automation for a transport engine.
//!
//! The tape position is an a-rate parameter: every block it is sampled once per
//! output frame. It can be set, linearly ramped toward a target over a number of
//! frames, or have its ramp cancelled. All timing is in frames of the engine's
//! own clock, which only advances while blocks are rendered.

/// Per-sample positions for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionBlock<'a> {
    /// Same tape time for every frame of the block
    Constant(f64),
    Curve(&'a [f64]),
}

impl PositionBlock<'_> {
    #[inline]
    pub fn at(&self, frame: usize) -> f64 {
        match self {
            PositionBlock::Constant(v) => *v,
            PositionBlock::Curve(curve) => curve[frame],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LinearRamp {
    from: f64,
    to: f64,
    start_frame: u64,
    end_frame: u64,
}

impl LinearRamp {
    #[inline]
    fn value_at(&self, frame: u64) -> f64 {
        if frame >= self.end_frame {
            return self.to;
        }
        let span = (self.end_frame - self.start_frame) as f64;
        let progress = frame.saturating_sub(self.start_frame) as f64 / span;
        self.from + (self.to - self.from) * progress
    }
}

pub struct PositionAutomation {
    value: f64,
    ramp: Option<LinearRamp>,
    clock: u64,
    curve: Vec<f64>,
}

impl PositionAutomation {
    pub fn new(initial: f64, max_block_size: usize) -> Self {
        Self {
            value: initial,
            ramp: None,
            clock: 0,
            curve: vec![initial; max_block_size.max(1)],
        }
    }

    /// Current value at the engine clock
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }

    /// Frames rendered so far
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Jump to `value`, dropping any ramp in progress
    pub fn set_value(&mut self, value: f64) {
        self.ramp = None;
        self.value = value;
    }

    /// Freeze at whatever the ramp has reached so far
    pub fn cancel_ramps(&mut self) {
        self.ramp = None;
    }

    pub fn cancel_and_hold(&mut self, value: f64) {
        self.cancel_ramps();
        self.value = value;
    }

    /// Ramp linearly from the current value to `target`, reaching it after
    /// `duration_frames` rendered frames. Replaces any ramp in progress.
    pub fn ramp_to(&mut self, target: f64, duration_frames: u64) {
        if duration_frames == 0 {
            self.set_value(target);
            return;
        }
        self.ramp = Some(LinearRamp {
            from: self.value,
            to: target,
            start_frame: self.clock,
            end_frame: self.clock + duration_frames,
        });
    }

    /// Sample the parameter for the next `frames` frames and advance the clock
    pub fn render(&mut self, frames: usize) -> PositionBlock<'_> {
        let start = self.clock;
        self.clock += frames as u64;

        let Some(ramp) = self.ramp else {
            return PositionBlock::Constant(self.value);
        };

        if self.curve.len() < frames {
            // Only reachable if a caller exceeds the configured block size
            self.curve.resize(frames, self.value);
        }
        for (i, slot) in self.curve[..frames].iter_mut().enumerate() {
            *slot = ramp.value_at(start + i as u64);
        }

        self.value = ramp.value_at(self.clock);
        if self.clock >= ramp.end_frame {
            self.ramp = None;
        }
        PositionBlock::Curve(&self.curve[..frames])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_when_idle() {
        let mut auto = PositionAutomation::new(2.5, 64);
        assert_eq!(auto.render(64), PositionBlock::Constant(2.5));
        assert_eq!(auto.clock(), 64);
    }

    #[test]
    fn test_ramp_is_sample_accurate() {
        let mut auto = PositionAutomation::new(0.0, 4);
        auto.ramp_to(8.0, 8);
        match auto.render(4) {
            PositionBlock::Curve(c) => assert_eq!(c, &[0.0, 1.0, 2.0, 3.0]),
            other => panic!("expected curve, got {:?}", other),
        }
        assert_relative_eq!(auto.value(), 4.0);
        match auto.render(4) {
            PositionBlock::Curve(c) => assert_eq!(c, &[4.0, 5.0, 6.0, 7.0]),
            other => panic!("expected curve, got {:?}", other),
        }
        assert_relative_eq!(auto.value(), 8.0);
        assert!(!auto.is_ramping());
        assert_eq!(auto.render(4), PositionBlock::Constant(8.0));
    }

    #[test]
    fn test_ramp_ending_mid_block_holds_target() {
        let mut auto = PositionAutomation::new(1.0, 4);
        auto.ramp_to(2.0, 2);
        let block = auto.render(4);
        assert_eq!(block.at(0), 1.0);
        assert_eq!(block.at(1), 1.5);
        assert_eq!(block.at(2), 2.0);
        assert_eq!(block.at(3), 2.0);
    }

    #[test]
    fn test_cancel_freezes_mid_ramp() {
        let mut auto = PositionAutomation::new(0.0, 10);
        auto.ramp_to(100.0, 100);
        auto.render(10);
        auto.cancel_ramps();
        assert_relative_eq!(auto.value(), 10.0);
        assert_eq!(auto.render(10), PositionBlock::Constant(10.0));
    }

    #[test]
    fn test_new_ramp_starts_from_current_value() {
        let mut auto = PositionAutomation::new(0.0, 10);
        auto.ramp_to(100.0, 100);
        auto.render(10);
        auto.ramp_to(0.0, 10);
        let block = auto.render(10);
        assert_relative_eq!(block.at(0), 10.0);
        assert_relative_eq!(auto.value(), 0.0);
    }

    #[test]
    fn test_zero_duration_ramp_sets_immediately() {
        let mut auto = PositionAutomation::new(0.0, 8);
        auto.ramp_to(3.0, 0);
        assert!(!auto.is_ramping());
        assert_eq!(auto.render(8), PositionBlock::Constant(3.0));
    }
}
