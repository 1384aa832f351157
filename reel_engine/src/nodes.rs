use std::f32::consts::{FRAC_PI_2, PI};

use reel_shared::EffectKind;

/// An effect chain processing interleaved stereo in place.
pub trait AudioNode: Send {
    /// Process a block of audio.
    /// buffer: interleaved stereo (LRLR...), frames = buffer.len() / 2.
    fn process(&mut self, buffer: &mut [f32]);

    /// Drop any filter memory (e.g. after the source feeding this node changed)
    fn reset(&mut self) {}
}

pub fn build_effect(kind: EffectKind, sample_rate: f32) -> Box<dyn AudioNode> {
    match kind {
        EffectKind::Nop => Box::new(GainNode::new(1.0)),
        EffectKind::Pan { pan } => Box::new(PanNode::new(pan)),
        EffectKind::LowPass { cutoff_hz } => {
            Box::new(BiquadNode::new(BiquadKind::LowPass, cutoff_hz, sample_rate))
        }
        EffectKind::HighPass { cutoff_hz } => {
            Box::new(BiquadNode::new(BiquadKind::HighPass, cutoff_hz, sample_rate))
        }
    }
}

pub struct GainNode {
    pub gain: f32,
}

impl GainNode {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }
}

impl AudioNode for GainNode {
    fn process(&mut self, buffer: &mut [f32]) {
        if self.gain == 1.0 {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample *= self.gain;
        }
    }
}

/// Equal-power panner. Sources are mono on both channels, so the input is
/// folded to mono before it is placed.
pub struct PanNode {
    left_gain: f32,
    right_gain: f32,
}

impl PanNode {
    pub fn new(pan: f32) -> Self {
        let x = (pan.clamp(-1.0, 1.0) + 1.0) * 0.5;
        Self {
            left_gain: (x * FRAC_PI_2).cos(),
            right_gain: (x * FRAC_PI_2).sin(),
        }
    }
}

impl AudioNode for PanNode {
    fn process(&mut self, buffer: &mut [f32]) {
        for frame in buffer.chunks_exact_mut(2) {
            let mono = (frame[0] + frame[1]) * 0.5;
            frame[0] = mono * self.left_gain;
            frame[1] = mono * self.right_gain;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadKind {
    LowPass,
    HighPass,
}

/// RBJ cookbook biquad, Butterworth Q, one state per channel
pub struct BiquadNode {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    // x1, x2, y1, y2 for left and right
    state: [[f32; 4]; 2],
}

impl BiquadNode {
    pub fn new(kind: BiquadKind, cutoff_hz: f32, sample_rate: f32) -> Self {
        let nyquist = sample_rate * 0.5;
        let f0 = cutoff_hz.clamp(1.0, nyquist * 0.99);
        let q = std::f32::consts::FRAC_1_SQRT_2;
        let w0 = 2.0 * PI * f0 / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2) = match kind {
            BiquadKind::LowPass => {
                let b1 = 1.0 - cos_w0;
                (b1 * 0.5, b1, b1 * 0.5)
            }
            BiquadKind::HighPass => {
                let b1 = -(1.0 + cos_w0);
                (-b1 * 0.5, b1, -b1 * 0.5)
            }
        };
        let a0 = 1.0 + alpha;
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
            state: [[0.0; 4]; 2],
        }
    }
}

impl AudioNode for BiquadNode {
    fn process(&mut self, buffer: &mut [f32]) {
        for frame in buffer.chunks_exact_mut(2) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let [x1, x2, y1, y2] = self.state[ch];
                let x0 = *sample;
                let y0 = self.b0 * x0 + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
                self.state[ch] = [x0, x1, y0, y1];
                *sample = y0;
            }
        }
    }

    fn reset(&mut self) {
        self.state = [[0.0; 4]; 2];
    }
}
