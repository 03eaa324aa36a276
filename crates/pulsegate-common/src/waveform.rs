//! Waveform pulse patterns
//!
//! A waveform is an ordered list of 100ms frames. Each frame carries four
//! frequency bytes and four intensity bytes (one per 25ms slot) and is sent
//! to the device as a 16-digit upper-case hex string.

use std::fmt::Write;

/// Duration covered by one frame in milliseconds
pub const FRAME_DURATION_MS: u64 = 100;

/// Highest per-slot intensity the device accepts inside a frame
pub const MAX_FRAME_INTENSITY: u8 = 100;

/// Lowest and highest encoded per-slot frequency values
pub const MIN_FRAME_FREQUENCY: u8 = 10;
pub const MAX_FRAME_FREQUENCY: u8 = 240;

/// A single 100ms waveform frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseFrame {
    pub frequency: [u8; 4],
    pub intensity: [u8; 4],
}

impl PulseFrame {
    /// Frame with the same frequency and intensity in every slot.
    ///
    /// Values are clamped to the ranges the device accepts.
    pub fn uniform(frequency: u8, intensity: u8) -> Self {
        let frequency = frequency.clamp(MIN_FRAME_FREQUENCY, MAX_FRAME_FREQUENCY);
        let intensity = intensity.min(MAX_FRAME_INTENSITY);
        Self {
            frequency: [frequency; 4],
            intensity: [intensity; 4],
        }
    }

    /// Encode as the 16-digit hex string used on the wire
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(16);
        for byte in self.frequency.iter().chain(self.intensity.iter()) {
            // Writing into a String cannot fail
            let _ = write!(out, "{:02X}", byte);
        }
        out
    }
}

/// A named sequence of pulse frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    pub name: String,
    pub frames: Vec<PulseFrame>,
}

impl Waveform {
    pub fn new(name: impl Into<String>, frames: Vec<PulseFrame>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }

    /// Slow swell to full intensity followed by a rest, repeating every 1.2s
    pub fn breath() -> Self {
        let frames = [0, 20, 40, 60, 80, 100, 100, 100, 0, 0, 0, 0]
            .into_iter()
            .map(|intensity| PulseFrame::uniform(10, intensity))
            .collect();
        Self::new("breath", frames)
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "breath" => Some(Self::breath()),
            _ => None,
        }
    }

    /// Wire encoding of every frame, in order
    pub fn hex_frames(&self) -> Vec<String> {
        self.frames.iter().map(PulseFrame::to_hex).collect()
    }

    /// Length of a single pass through the pattern in milliseconds
    pub fn period_ms(&self) -> u64 {
        self.frames.len() as u64 * FRAME_DURATION_MS
    }
}
