use reel_shared::CHANNEL_COUNT;

use crate::router::RoutingTable;

/// Block buffers for the data plane. Sized once, never reallocated on the
/// audio thread.
pub struct AudioBuffers {
    /// Mono acquisition signal for the current block
    pub input: Vec<f32>,
    /// Interleaved stereo output of each track, by track id
    pub track_bufs: Vec<Vec<f32>>,
    /// Interleaved stereo input of each effect chain
    pub effect_bufs: Vec<Vec<f32>>,
    pub master_mix: Vec<f32>,
}

impl AudioBuffers {
    pub fn new(track_count: usize, effect_count: usize, block_size: usize) -> Self {
        let stereo = block_size * CHANNEL_COUNT;
        Self {
            input: vec![0.0; block_size],
            track_bufs: vec![vec![0.0; stereo]; track_count],
            effect_bufs: vec![vec![0.0; stereo]; effect_count],
            master_mix: vec![0.0; stereo],
        }
    }

    /// Static method to route tracks into effect inputs to avoid borrow
    /// checker conflicts with `self`. Unrouted tracks are silent.
    pub fn route_to_effects(track_bufs: &[Vec<f32>], effect_bufs: &mut [Vec<f32>], table: &RoutingTable) {
        for buf in effect_bufs.iter_mut() {
            buf.fill(0.0);
        }
        for (track, effect) in table.routes() {
            let (Some(src), Some(dst)) = (track_bufs.get(track), effect_bufs.get_mut(effect)) else {
                continue;
            };
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += *s;
            }
        }
    }

    pub fn mix_to_master(effect_bufs: &[Vec<f32>], master_mix: &mut [f32]) {
        master_mix.fill(0.0);
        for buf in effect_bufs {
            for (m, s) in master_mix.iter_mut().zip(buf.iter()) {
                *m += *s;
            }
        }
    }

    /// Copy `frames` stereo master frames starting at `offset` into an
    /// interleaved device buffer with `channels` channels.
    pub fn write_interleaved(master_mix: &[f32], offset: usize, data: &mut [f32], channels: usize) {
        for (i, out) in data.chunks_exact_mut(channels).enumerate() {
            let left = master_mix[(offset + i) * 2];
            let right = master_mix[(offset + i) * 2 + 1];
            if channels == 1 {
                out[0] = (left + right) * 0.5;
            } else {
                out[0] = left;
                out[1] = right;
                for extra in out[2..].iter_mut() {
                    *extra = 0.0;
                }
            }
        }
    }
}
