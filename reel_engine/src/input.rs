//! Acquisition path: capture callback -> ring -> playback callback.
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

pub fn input_ring(capacity: usize, channels: usize) -> (InputFeed, InputCapture) {
    let rb = HeapRb::<f32>::new(capacity.max(1));
    let (prod, cons) = rb.split();
    (
        InputFeed {
            producer: prod,
            channels: channels.max(1),
        },
        InputCapture { consumer: cons },
    )
}

/// Producer half, lives in the device input callback
pub struct InputFeed {
    producer: HeapProd<f32>,
    channels: usize,
}

impl InputFeed {
    /// Push the first channel of an interleaved device buffer.
    /// Returns how many frames did not fit.
    pub fn push_interleaved(&mut self, data: &[f32]) -> usize {
        let mut dropped = 0;
        for frame in data.chunks(self.channels) {
            if self.producer.try_push(frame[0]).is_err() {
                dropped += 1;
            }
        }
        dropped
    }
}

/// Consumer half, lives with the deck processor
pub struct InputCapture {
    consumer: HeapCons<f32>,
}

impl InputCapture {
    /// Fill `block` with captured samples, zero-filling on underrun.
    /// Returns how many samples were real.
    pub fn fill(&mut self, block: &mut [f32]) -> usize {
        let got = self.consumer.pop_slice(block);
        block[got..].fill(0.0);
        got
    }

    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }
}
