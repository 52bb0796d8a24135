/// Sound engine: procedural 8-bit style movement cues via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::domain::events::ControllerEvent;
use crate::sim::event::SceneEvent;

/// Which sound an event plays.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Jump,
    AirJump,
    WallJump,
    Land,
    Dash,
    Action,
    LedgeGrab,
    Respawn,
}

/// Only the player's events make noise.
pub fn cue_for(event: &SceneEvent) -> Option<Cue> {
    match *event {
        SceneEvent::Character { body: 0, event } => match event {
            ControllerEvent::NormalJump | ControllerEvent::LadderJump | ControllerEvent::LedgeJump => Some(Cue::Jump),
            ControllerEvent::AirJump => Some(Cue::AirJump),
            ControllerEvent::WallJump(_) => Some(Cue::WallJump),
            ControllerEvent::Landed => Some(Cue::Land),
            ControllerEvent::DashStart(_) => Some(Cue::Dash),
            ControllerEvent::ActionStart(_) => Some(Cue::Action),
            ControllerEvent::LedgeGrabStart(_) => Some(Cue::LedgeGrab),
            _ => None,
        },
        SceneEvent::Respawned { body: 0 } => Some(Cue::Respawn),
        _ => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    /// Pre-generated WAV buffers for each cue.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_jump: Arc<Vec<u8>>,
        sfx_air_jump: Arc<Vec<u8>>,
        sfx_wall_jump: Arc<Vec<u8>>,
        sfx_land: Arc<Vec<u8>>,
        sfx_dash: Arc<Vec<u8>>,
        sfx_action: Arc<Vec<u8>>,
        sfx_ledge: Arc<Vec<u8>>,
        sfx_respawn: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output, sound disabled");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_jump: Arc::new(make_wav(&gen_sweep(320.0, 720.0, 0.09, 0.22))),
                sfx_air_jump: Arc::new(make_wav(&gen_air_jump())),
                sfx_wall_jump: Arc::new(make_wav(&gen_wall_jump())),
                sfx_land: Arc::new(make_wav(&gen_land())),
                sfx_dash: Arc::new(make_wav(&gen_dash())),
                sfx_action: Arc::new(make_wav(&gen_action())),
                sfx_ledge: Arc::new(make_wav(&gen_blip(880.0, 0.04, 0.2))),
                sfx_respawn: Arc::new(make_wav(&gen_respawn())),
            })
        }

        pub fn play(&self, cue: Cue) {
            let buf = match cue {
                Cue::Jump => &self.sfx_jump,
                Cue::AirJump => &self.sfx_air_jump,
                Cue::WallJump => &self.sfx_wall_jump,
                Cue::Land => &self.sfx_land,
                Cue::Dash => &self.sfx_dash,
                Cue::Action => &self.sfx_action,
                Cue::LedgeGrab => &self.sfx_ledge,
                Cue::Respawn => &self.sfx_respawn,
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn sample_count(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Simple sine blip at given frequency and duration
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = sample_count(duration);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Square-ish pitch sweep. Phase is accumulated so the sweep stays clean.
    fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = sample_count(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase = (phase + freq / SAMPLE_RATE as f32).fract();
                let wave = (phase * TAU).sin() * 0.7 + (phase * 3.0 * TAU).sin() * 0.3;
                wave * (1.0 - t).powf(0.7) * volume
            })
            .collect()
    }

    /// LCG white noise in [-1, 1].
    fn noise(seed: u32) -> impl FnMut() -> f32 {
        let mut rng = seed;
        move || {
            rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
            (rng as f32 / u32::MAX as f32) * 2.0 - 1.0
        }
    }

    /// Air jump: two quick rising chirps, higher than the ground jump
    fn gen_air_jump() -> Vec<f32> {
        let mut samples = gen_sweep(520.0, 900.0, 0.05, 0.2);
        samples.extend(gen_sweep(700.0, 1200.0, 0.06, 0.2));
        samples
    }

    /// Wall jump: rising sweep over a scrape of noise
    fn gen_wall_jump() -> Vec<f32> {
        let mut rand = noise(777);
        let n = sample_count(0.03);
        gen_sweep(400.0, 950.0, 0.11, 0.2)
            .into_iter()
            .enumerate()
            .map(|(i, s)| if i < n { s + rand() * 0.15 * (1.0 - i as f32 / n as f32) } else { s })
            .collect()
    }

    /// Landing: short low thump
    fn gen_land() -> Vec<f32> {
        let n = sample_count(0.06);
        let mut rand = noise(4242);
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * (140.0 - t * 60.0) * TAU).sin();
                (tone * 0.6 + rand() * 0.4) * (1.0 - t).powf(2.0) * 0.3
            })
            .collect()
    }

    /// Dash: descending noise whoosh
    fn gen_dash() -> Vec<f32> {
        let n = sample_count(0.14);
        let mut rand = noise(12345);
        let mut smooth = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                // One-pole low-pass; the cutoff falls over the cue.
                let k = 0.6 - t * 0.5;
                smooth += (rand() - smooth) * k;
                let env = (t * 8.0).min(1.0) * (1.0 - t);
                smooth * env * 0.45
            })
            .collect()
    }

    /// Action: quick ascending arpeggio C5→E5→G5
    fn gen_action() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0];
        let mut samples = Vec::new();
        for &freq in &notes {
            samples.extend(gen_blip(freq, 0.04, 0.22));
        }
        samples
    }

    /// Respawn: descending tone A4→F#4→Eb4
    fn gen_respawn() -> Vec<f32> {
        let notes = [440.0_f32, 370.0, 311.0];
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = sample_count(0.09);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                samples.push((t * freq * TAU).sin() * env * 0.25);
            }
        }
        let fade_len = samples.len() / 4;
        let total = samples.len();
        for (k, s) in samples[total - fade_len..].iter_mut().enumerate() {
            *s *= 1.0 - k as f32 / fade_len as f32;
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_payload() {
            let samples = gen_land();
            let wav = make_wav(&samples);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + samples.len() * 2);
            let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
            assert_eq!(data_size as usize, samples.len() * 2);
        }

        #[test]
        fn generators_stay_in_range() {
            for s in [gen_air_jump(), gen_wall_jump(), gen_dash(), gen_action(), gen_respawn()] {
                assert!(!s.is_empty());
                assert!(s.iter().all(|v| v.abs() <= 1.0));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: Cue) {}
}
