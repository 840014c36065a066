use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use dotboy_core::audio_queue::AudioConsumer;

/// Start audio playback using `cpal`, draining mono samples produced by
/// the core's APU. The core mixes at a fixed 44.1 kHz; devices running at
/// another rate play slightly off-pitch, which is acceptable for this
/// simplified audio path.
///
/// Returns the active [`cpal::Stream`] if successful.
pub fn start_stream(samples: AudioConsumer) -> Option<cpal::Stream> {
    let host = cpal::default_host();
    let device = host.default_output_device()?;
    let supported = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("no supported output config: {e}");
            return None;
        }
    };
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    let err_fn = |err| eprintln!("cpal stream error: {err}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.pop().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                err_fn,
                None,
            )
            .ok()?,
        cpal::SampleFormat::I16 => device
            .build_output_stream(
                &config,
                move |data: &mut [i16], _| {
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.pop().unwrap_or(0.0);
                        frame.fill((sample.clamp(-1.0, 1.0) * 32767.0) as i16);
                    }
                },
                err_fn,
                None,
            )
            .ok()?,
        cpal::SampleFormat::U16 => device
            .build_output_stream(
                &config,
                move |data: &mut [u16], _| {
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.pop().unwrap_or(0.0);
                        let scaled = (sample.clamp(-1.0, 1.0) * 32767.0) as i32 + 32768;
                        frame.fill(scaled as u16);
                    }
                },
                err_fn,
                None,
            )
            .ok()?,
        _ => {
            eprintln!("unsupported sample format: {sample_format:?}");
            return None;
        }
    };

    match stream.play() {
        Ok(()) => Some(stream),
        Err(e) => {
            eprintln!("failed to start audio stream: {e}");
            None
        }
    }
}
