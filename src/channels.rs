/*
 *  channels.rs
 *
 *  osdcast - pixels over datagrams
 *  (c) 2024-26 the osdcast authors
 *
 *  TODO:
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
use arrayvec::ArrayString;

/// Channels 0-7 are writable from the network.
pub const EXTERNAL_CHANNELS: usize = 8;
/// Channels 8-15 belong to the local metric provider.
pub const CHANNEL_COUNT: usize = 16;
/// Hard cap on one text channel, in bytes.
pub const MAX_TEXT_BYTES: usize = 96;

/// System slot layout (channels 8-15). Slots 12-15 are reserved.
pub const SLOT_TEMP: usize = 8;
pub const SLOT_CPU: usize = 9;
pub const SLOT_ENC_FPS: usize = 10;
pub const SLOT_BITRATE: usize = 11;

/// Seed descriptors for the system text slots, overwritten only by the
/// metric provider.
const SYSTEM_SLOT_LABELS: [&str; 8] = [
    "temp", "cpu", "enc fps", "bitrate", "sys4", "sys5", "sys6", "sys7",
];

pub type ChannelText = ArrayString<MAX_TEXT_BYTES>;

/// Copies `input` into a fixed 96-byte buffer, truncating on a char boundary.
pub fn clamp_text(input: &str) -> ChannelText {
    let mut out = ChannelText::new();
    for ch in input.chars() {
        if out.try_push(ch).is_err() {
            break;
        }
    }
    out
}

/// Storage for the 16 numeric and 16 text channels consumed by assets.
///
/// Created once at startup and owned by the engine loop for the lifetime of
/// the process; no locking, single writer.
#[derive(Debug, Clone)]
pub struct ChannelBank {
    values: [f64; CHANNEL_COUNT],
    texts: [ChannelText; CHANNEL_COUNT],
}

impl ChannelBank {
    pub fn new() -> Self {
        let mut bank = ChannelBank {
            values: [0.0; CHANNEL_COUNT],
            texts: [ChannelText::new(); CHANNEL_COUNT],
        };
        for (i, label) in SYSTEM_SLOT_LABELS.iter().enumerate() {
            bank.texts[EXTERNAL_CHANNELS + i] = clamp_text(label);
        }
        bank
    }

    /// Out-of-range indices clamp into [0,15] rather than reject.
    fn slot(idx: usize) -> usize {
        idx.min(CHANNEL_COUNT - 1)
    }

    pub fn value(&self, idx: usize) -> f64 {
        self.values[Self::slot(idx)]
    }

    pub fn set_value(&mut self, idx: usize, v: f64) {
        self.values[Self::slot(idx)] = v;
    }

    /// Wire `""` entry: numeric slot cleared to 0.
    pub fn clear_value(&mut self, idx: usize) {
        self.values[Self::slot(idx)] = 0.0;
    }

    pub fn text(&self, idx: usize) -> &str {
        self.texts[Self::slot(idx)].as_str()
    }

    pub fn set_text(&mut self, idx: usize, s: &str) {
        self.texts[Self::slot(idx)] = clamp_text(s);
    }

    /// Wire `""` entry: text slot cleared; assets fall back to their label.
    pub fn clear_text(&mut self, idx: usize) {
        self.texts[Self::slot(idx)].clear();
    }
}

impl Default for ChannelBank {
    fn default() -> Self {
        Self::new()
    }
}
