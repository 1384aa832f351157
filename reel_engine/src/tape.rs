/// Fixed-capacity, time-indexed sample store for one track.
///
/// Addressing rounds a tape time (seconds) to the nearest frame. Reads clamp to
/// the tape ends, writes below zero land on frame 0 and writes past the end are
/// dropped. Nothing here can fail.
pub struct TapeBuffer {
    samples: Vec<f32>,
    sample_rate: f64,
}

impl TapeBuffer {
    pub fn new(sample_rate: f64, max_duration_seconds: f64) -> Self {
        let len = (sample_rate * max_duration_seconds).max(1.0) as usize;
        Self {
            samples: vec![0.0; len],
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Nearest frame for a tape time, unclamped (may be negative or past the end)
    #[inline]
    pub fn frame_at(&self, tape_time: f64) -> i64 {
        (tape_time * self.sample_rate).round() as i64
    }

    #[inline]
    pub fn read_frame(&self, frame: i64) -> f32 {
        let last = self.samples.len() as i64 - 1;
        self.samples[frame.clamp(0, last) as usize]
    }

    #[inline]
    pub fn read(&self, tape_time: f64) -> f32 {
        self.read_frame(self.frame_at(tape_time))
    }

    /// Overwrites (never mixes) the sample at `frame`
    #[inline]
    pub fn write_frame(&mut self, frame: i64, sample: f32) {
        let idx = frame.max(0) as usize;
        if let Some(slot) = self.samples.get_mut(idx) {
            *slot = sample;
        }
    }

    #[inline]
    pub fn write(&mut self, tape_time: f64, sample: f32) {
        self.write_frame(self.frame_at(tape_time), sample);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_same_time() {
        let mut tape = TapeBuffer::new(48_000.0, 10.0);
        tape.write(5.0, 1.0);
        assert_eq!(tape.as_slice()[240_000], 1.0);
        assert_eq!(tape.read(5.0), 1.0);
        // Within half a frame still addresses the same sample
        assert_eq!(tape.read(5.0 + 0.4 / 48_000.0), 1.0);
    }

    #[test]
    fn test_out_of_range_reads_clamp() {
        let mut tape = TapeBuffer::new(1000.0, 1.0);
        tape.write_frame(0, 0.25);
        tape.write_frame(999, 0.75);
        assert_eq!(tape.read(-3.0), 0.25);
        assert_eq!(tape.read(50.0), 0.75);
        assert_eq!(tape.read(f64::NAN), 0.25);
    }

    #[test]
    fn test_out_of_range_writes_stay_inside() {
        let mut tape = TapeBuffer::new(1000.0, 1.0);
        tape.write(-2.0, 0.5);
        tape.write(1.0, 0.9); // frame 1000, one past the end
        tape.write(400.0, 0.9);
        assert_eq!(tape.len(), 1000);
        assert_eq!(tape.as_slice()[0], 0.5);
        assert!(tape.as_slice()[1..].iter().all(|&s| s == 0.0));
    }
}
