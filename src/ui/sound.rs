/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

/// Every effect the game can play.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Jump,
    Gem,
    Killed,
    Fall,
    Fire,
    FireRejected,
    EnemyShot,
    Exit,
    LevelStart,
}

impl Sfx {
    pub const ALL: [Sfx; 9] = [
        Sfx::Jump,
        Sfx::Gem,
        Sfx::Killed,
        Sfx::Fall,
        Sfx::Fire,
        Sfx::FireRejected,
        Sfx::EnemyShot,
        Sfx::Exit,
        Sfx::LevelStart,
    ];

    /// Effect for a simulation event, if it has one.
    pub fn for_event(event: &GameEvent) -> Option<Sfx> {
        match event {
            GameEvent::JumpStarted => Some(Sfx::Jump),
            GameEvent::GemCollected { .. } => Some(Sfx::Gem),
            GameEvent::PlayerKilled { by_enemy: true } => Some(Sfx::Killed),
            GameEvent::PlayerKilled { by_enemy: false } => Some(Sfx::Fall),
            GameEvent::BulletFired => Some(Sfx::Fire),
            GameEvent::FireRejected => Some(Sfx::FireRejected),
            GameEvent::EnemyShot => Some(Sfx::EnemyShot),
            GameEvent::ExitReached => Some(Sfx::Exit),
            GameEvent::CheckpointReached { .. } | GameEvent::SkinChanged { .. } => Some(Sfx::Gem),
            GameEvent::TimeUp { .. } => None,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::f32::consts::TAU;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        /// One WAV buffer per `Sfx`, in `Sfx::ALL` order.
        buffers: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("no audio output, running silent: {e}");
                    return None;
                }
            };

            let buffers = Sfx::ALL.iter().map(|&s| Arc::new(make_wav(&generate(s)))).collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some(buf) = self.buffers.get(sfx as usize) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn generate(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Jump => sweep(320.0, 720.0, 0.09, 0.22),
            Sfx::Gem => notes(&[(1319.0, 0.04), (1760.0, 0.07)], 0.25),
            Sfx::Killed => notes(&[(440.0, 0.1), (370.0, 0.1), (311.0, 0.1), (220.0, 0.22)], 0.3),
            Sfx::Fall => sweep(700.0, 120.0, 0.45, 0.25),
            Sfx::Fire => noise_burst(0.06, 900.0, 0.2),
            Sfx::FireRejected => notes(&[(140.0, 0.05), (0.0, 0.03), (140.0, 0.05)], 0.3),
            Sfx::EnemyShot => noise_burst(0.14, 260.0, 0.3),
            Sfx::Exit => notes(&[(523.0, 0.09), (659.0, 0.09), (784.0, 0.09), (1047.0, 0.3)], 0.3),
            Sfx::LevelStart => notes(&[(392.0, 0.08), (523.0, 0.14)], 0.25),
        }
    }

    /// Square-ish notes in sequence. A frequency of 0 is a rest.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Pitch glide from `from` to `to` Hz.
    fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - t).powf(0.6) * volume
            })
            .collect()
    }

    /// Noise mixed with a low tone, for shots and hits.
    fn noise_burst(duration: f32, freq: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 0x9e37_79b9;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let tone = (i as f32 / SAMPLE_RATE as f32 * freq * TAU).sin();
                rng = rng.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                (tone * 0.5 + noise * 0.5) * (1.0 - t).powf(0.8) * volume
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit mono PCM
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let block_align: u16 = bits_per_sample / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_size = samples.len() as u32 * block_align as u32;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

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
        fn wav_header_sizes() {
            let wav = make_wav(&[0.0, 0.5, -0.5]);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(wav.len(), 44 + 6);
            assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 6);
        }

        #[test]
        fn every_effect_has_samples() {
            for sfx in Sfx::ALL {
                let s = generate(sfx);
                assert!(!s.is_empty(), "{sfx:?}");
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
    pub fn play(&self, _sfx: Sfx) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_discriminant_order() {
        for (i, sfx) in Sfx::ALL.iter().enumerate() {
            assert_eq!(*sfx as usize, i);
        }
    }

    #[test]
    fn rejection_and_deaths_have_distinct_cues() {
        assert_eq!(Sfx::for_event(&GameEvent::FireRejected), Some(Sfx::FireRejected));
        assert_eq!(Sfx::for_event(&GameEvent::PlayerKilled { by_enemy: true }), Some(Sfx::Killed));
        assert_eq!(Sfx::for_event(&GameEvent::PlayerKilled { by_enemy: false }), Some(Sfx::Fall));
        assert_eq!(Sfx::for_event(&GameEvent::TimeUp { won: true }), None);
    }
}
