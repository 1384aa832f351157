use crate::deck;
use crate::input::input_ring;
use crate::synchronizer::TrackManager;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use reel_shared::{DeckConfig, DeckEvent};

/// Owns the device streams. The deck keeps running as long as this lives.
pub struct AudioEngine {
    _stream: cpal::Stream,
    _input_stream: Option<cpal::Stream>,
    pub sample_rate: u32,
    pub channels: usize,
}

fn err_fn(err: cpal::StreamError) {
    let s = err.to_string();
    // Suppress common buffer under/overrun messages to avoid console spam
    if !s.contains("underrun") && !s.contains("overrun") {
        log::error!("[AudioEngine] Stream error: {}", s);
    }
}

impl AudioEngine {
    /// Open the default devices and start the deck.
    ///
    /// The device sample rate overrides `config.sample_rate`. Returns the
    /// engine together with the control-side track manager.
    pub fn new(config: &DeckConfig, events: Sender<DeckEvent>) -> Result<(Self, TrackManager), anyhow::Error> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(anyhow::anyhow!("No output device available"))?;
        let supported = device.default_output_config()?;

        let sample_rate = supported.sample_rate();
        let channels = supported.channels() as usize;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(anyhow::anyhow!(
                "Unsupported sample format {:?}",
                supported.sample_format()
            ));
        }

        if let cpal::SupportedBufferSize::Range { min, max } = supported.buffer_size() {
            log::debug!("[AudioEngine] Device Buffer Range: {}-{}", min, max);
        }
        let stream_config: cpal::StreamConfig = supported.into();
        log::info!("[AudioEngine] Using Config: {:?}", stream_config);

        let mut config = config.clone();
        config.sample_rate = sample_rate;
        config.validate()?;

        let (manager, mut processor) = deck::build(&config, events);

        let input_stream = match Self::open_input(&host, &config) {
            Ok(Some((stream, capture))) => {
                processor.attach_input(capture);
                Some(stream)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("[AudioEngine] Input unavailable, recording silence: {}", e);
                None
            }
        };

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                processor.render(data, channels);
            },
            err_fn,
            None,
        )?;

        if let Some(input) = &input_stream {
            input.play()?;
        }
        stream.play()?;
        log::info!(
            "[AudioEngine] Running at {} Hz, {} output channels, input {}",
            sample_rate,
            channels,
            if input_stream.is_some() { "on" } else { "off" }
        );

        Ok((
            Self {
                _stream: stream,
                _input_stream: input_stream,
                sample_rate,
                channels,
            },
            manager,
        ))
    }

    /// Default input device feeding an input ring. `None` when there is no
    /// usable input device.
    fn open_input(
        host: &cpal::Host,
        config: &DeckConfig,
    ) -> Result<Option<(cpal::Stream, crate::input::InputCapture)>, anyhow::Error> {
        let Some(device) = host.default_input_device() else {
            log::warn!("[AudioEngine] No input device, recording silence");
            return Ok(None);
        };
        let supported = device.default_input_config()?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            log::warn!(
                "[AudioEngine] Input format {:?} unsupported, recording silence",
                supported.sample_format()
            );
            return Ok(None);
        }
        if supported.sample_rate() != config.sample_rate {
            log::warn!(
                "[AudioEngine] Input runs at {} Hz, output at {} Hz, recording silence",
                supported.sample_rate(),
                config.sample_rate
            );
            return Ok(None);
        }

        let channels = supported.channels() as usize;
        let capacity = (config.input_buffer_seconds * config.sample_rate as f64).ceil() as usize;
        let (mut feed, capture) = input_ring(capacity, channels);
        let stream_config: cpal::StreamConfig = supported.into();

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = feed.push_interleaved(data);
            },
            err_fn,
            None,
        )?;
        Ok(Some((stream, capture)))
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
