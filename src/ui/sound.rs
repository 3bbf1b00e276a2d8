/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// Every `SoundEffect` the engine can emit maps to a `Voice`, a small
/// recipe (tone, sweep, noise burst or arpeggio) rendered into an
/// in-memory WAV buffer the first time it plays. Playback is fire-and-forget via
/// rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely (the
/// stub SoundEngine does nothing).

use crate::sim::event::{GameEvent, SoundEffect};

const SAMPLE_RATE: u32 = 22050;

/// Recipe for one effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Voice {
    /// Sine tone with linear fade: freq, seconds.
    Tone(f32, f32),
    /// Frequency glide: from, to, seconds.
    Sweep(f32, f32, f32),
    /// Noise over a falling tone: base freq, seconds.
    Burst(f32, f32),
    /// Notes of equal length: freqs, seconds per note.
    Arpeggio(&'static [f32], f32),
}

pub fn voice_for(effect: SoundEffect) -> Voice {
    use SoundEffect::*;
    match effect {
        Move => Voice::Tone(180.0, 0.03),
        Turn => Voice::Tone(240.0, 0.025),
        BumpHead => Voice::Tone(90.0, 0.06),
        Fire => Voice::Sweep(1400.0, 700.0, 0.08),
        AntiFire => Voice::Sweep(900.0, 400.0, 0.1),
        Missile => Voice::Sweep(300.0, 1200.0, 0.15),
        Stunner => Voice::Sweep(2000.0, 1500.0, 0.1),
        Disruptor => Voice::Sweep(500.0, 1500.0, 0.12),
        Reflect => Voice::Tone(1800.0, 0.03),
        LaserDie => Voice::Tone(600.0, 0.02),
        PushBox | PushMirror | PushAnti => Voice::Burst(160.0, 0.06),
        Crush => Voice::Burst(120.0, 0.12),
        Barrel => Voice::Burst(80.0, 0.3),
        WoodBurn => Voice::Burst(250.0, 0.2),
        Melt | Defrost | CoolOff => Voice::Sweep(800.0, 300.0, 0.18),
        Frozen | Stun => Voice::Sweep(1600.0, 2400.0, 0.12),
        StunOff => Voice::Sweep(1200.0, 600.0, 0.1),
        Sink => Voice::Sweep(400.0, 80.0, 0.25),
        Disrupted => Voice::Burst(900.0, 0.1),
        DisruptEnd => Voice::Tone(700.0, 0.08),
        Button => Voice::Tone(1000.0, 0.04),
        DoorOpens => Voice::Arpeggio(&[392.0, 523.0], 0.06),
        DoorCloses => Voice::Arpeggio(&[523.0, 392.0], 0.06),
        Unlock => Voice::Arpeggio(&[659.0, 784.0, 1047.0], 0.05),
        Grab => Voice::Arpeggio(&[1047.0, 1319.0, 1568.0], 0.045),
        Teleport => Voice::Sweep(200.0, 2000.0, 0.2),
        Jumping => Voice::Sweep(300.0, 900.0, 0.1),
        AntiDie => Voice::Arpeggio(&[660.0, 440.0, 220.0], 0.06),
        Die => Voice::Arpeggio(&[440.0, 370.0, 311.0, 261.0], 0.12),
    }
}

// ════════════════════════════════════════════════════════════
//  Waveform rendering: Voice -> mono f32 samples
// ════════════════════════════════════════════════════════════

const TAU: f32 = std::f32::consts::PI * 2.0;

fn sample_count(seconds: f32) -> usize {
    (SAMPLE_RATE as f32 * seconds) as usize
}

pub fn render(voice: Voice) -> Vec<f32> {
    match voice {
        Voice::Tone(freq, dur) => {
            let n = sample_count(dur);
            (0..n)
                .map(|i| {
                    let t = i as f32 / SAMPLE_RATE as f32;
                    let env = 1.0 - i as f32 / n as f32;
                    (t * freq * TAU).sin() * env * 0.25
                })
                .collect()
        }
        Voice::Sweep(from, to, dur) => {
            let n = sample_count(dur);
            let mut phase = 0.0_f32;
            (0..n)
                .map(|i| {
                    let p = i as f32 / n as f32;
                    phase += (from + (to - from) * p) / SAMPLE_RATE as f32;
                    let env = (1.0 - p).powf(0.6);
                    (phase * TAU).sin() * env * 0.25
                })
                .collect()
        }
        Voice::Burst(freq, dur) => {
            let n = sample_count(dur);
            let mut rng: u32 = 12345;
            (0..n)
                .map(|i| {
                    let p = i as f32 / n as f32;
                    let t = i as f32 / SAMPLE_RATE as f32;
                    let tone = (t * freq * (2.0 - p) * TAU).sin();
                    rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                    let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                    (tone * 0.4 + noise * 0.6) * (1.0 - p).powf(0.8) * 0.3
                })
                .collect()
        }
        Voice::Arpeggio(notes, note_dur) => {
            let n = sample_count(note_dur);
            notes
                .iter()
                .flat_map(|&freq| {
                    (0..n).map(move |i| {
                        let t = i as f32 / SAMPLE_RATE as f32;
                        let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                        let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                        wave * env * 0.25
                    })
                })
                .collect()
        }
    }
}

/// Wrap mono f32 samples into a 16-bit PCM WAV buffer.
pub fn make_wav(samples: &[f32]) -> Vec<u8> {
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let data_size = samples.len() as u32 * 2;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&num_channels.to_le_bytes());
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

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use crate::sim::event::SoundEffect;
    use super::{make_wav, render, voice_for};

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<SoundEffect, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output: {}", e);
                    return None;
                }
            };
            Some(SoundEngine { _stream: stream, handle, buffers: HashMap::new() })
        }

        pub fn play(&mut self, effect: SoundEffect) {
            let buf = self
                .buffers
                .entry(effect)
                .or_insert_with(|| Arc::new(make_wav(&render(voice_for(effect)))))
                .clone();
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
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
    pub fn play(&mut self, _effect: SoundEffect) {}
}

/// Play the sound cues of one step, each effect at most once.
pub fn process_sound_events(sound: &mut Option<SoundEngine>, events: &[GameEvent]) {
    let Some(engine) = sound else { return };
    let mut played: Vec<SoundEffect> = Vec::with_capacity(4);
    for event in events {
        if let GameEvent::Sound(effect) = event {
            if !played.contains(effect) {
                engine.play(*effect);
                played.push(*effect);
            }
        }
    }
}
