/*
 *  ingest.rs
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
//! Wire decoder: one UDP datagram in, one structured [`Delta`] out.
//!
//! The partial-update law of the protocol: `null` leaves a slot unchanged,
//! `""` clears it, omitted trailing entries keep previous content, and asset
//! patch fields apply only when present and syntactically valid. Decoding is
//! best-effort per field; a bad field never sinks its siblings.

use serde_json::Value;
use thiserror::Error;

use crate::assets::{AssetKind, Orientation, MAX_TEXT_INDICES};
use crate::channels::{CHANNEL_COUNT, EXTERNAL_CHANNELS};

/// Byte ceiling for one datagram; anything larger is discarded whole.
pub const MAX_PAYLOAD: usize = 1280;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("datagram of {0} bytes exceeds the {MAX_PAYLOAD}-byte ceiling")]
    PayloadTooLarge(usize),
    #[error("datagram is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("datagram root is not a JSON object")]
    NotAnObject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueWrite {
    Set(f64),
    /// Wire `""`: clear the numeric slot to 0.
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextWrite {
    Set(String),
    /// Wire `""`: clear the text slot (label takes over at render time).
    Clear,
}

/// Partial field set targeting one asset id. `None` means "not in this
/// patch"; values are already clamped into their legal ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPatch {
    pub id: i32,
    pub enabled: Option<bool>,
    pub kind: Option<AssetKind>,
    pub value_index: Option<usize>,
    pub text_index: Option<i32>,
    pub text_indices: Option<Vec<usize>>,
    pub text_inline: Option<bool>,
    pub label: Option<String>,
    pub orientation: Option<Orientation>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub bar_color: Option<u32>,
    pub text_color: Option<u32>,
    pub background: Option<i32>,
    pub background_opacity: Option<i32>,
    pub segments: Option<u32>,
    pub rounded_outline: Option<bool>,
}

/// The fully decoded effect of one datagram.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    pub value_writes: Vec<(usize, ValueWrite)>,
    pub text_writes: Vec<(usize, TextWrite)>,
    pub asset_patches: Vec<AssetPatch>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.value_writes.is_empty()
            && self.text_writes.is_empty()
            && self.asset_patches.is_empty()
    }
}

fn get_i64(obj: &serde_json::Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_i64)
}

fn get_i32(obj: &serde_json::Map<String, Value>, key: &str) -> Option<i32> {
    get_i64(obj, key).map(|v| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

fn get_f64(obj: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

fn get_bool(obj: &serde_json::Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

fn get_str<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Extracts the recognized patch fields from one JSON object, clamping each
/// into range. Unknown fields and malformed values are skipped one by one.
/// The `id` field is left to the caller (the wire requires it, the config
/// array defaults it to the array index).
pub fn patch_from_object(obj: &serde_json::Map<String, Value>) -> AssetPatch {
    let channel_max = CHANNEL_COUNT as i64 - 1;
    AssetPatch {
        id: 0,
        enabled: get_bool(obj, "enabled").or_else(|| get_bool(obj, "enable")),
        kind: get_str(obj, "type").and_then(AssetKind::parse),
        value_index: get_i64(obj, "value_index").map(|v| v.clamp(0, channel_max) as usize),
        text_index: get_i64(obj, "text_index").map(|v| v.clamp(-1, channel_max) as i32),
        text_indices: obj.get("text_indices").and_then(Value::as_array).map(|arr| {
            arr.iter()
                .filter_map(Value::as_i64)
                .map(|v| v.clamp(0, channel_max) as usize)
                .take(MAX_TEXT_INDICES)
                .collect()
        }),
        text_inline: get_bool(obj, "text_inline"),
        label: get_str(obj, "label").map(str::to_string),
        orientation: get_str(obj, "orientation").and_then(Orientation::parse),
        x: get_i32(obj, "x"),
        y: get_i32(obj, "y"),
        width: get_i32(obj, "width"),
        height: get_i32(obj, "height"),
        min: get_f64(obj, "min"),
        max: get_f64(obj, "max"),
        bar_color: get_i64(obj, "bar_color").map(|v| v as u32),
        text_color: get_i64(obj, "text_color").map(|v| v as u32),
        background: get_i64(obj, "background").map(|v| v.clamp(-1, 10) as i32),
        background_opacity: get_i64(obj, "background_opacity")
            .map(|v| v.clamp(-1, 100) as i32),
        segments: get_i64(obj, "segments").map(|v| v.clamp(0, 64) as u32),
        rounded_outline: get_bool(obj, "rounded_outline"),
    }
}

/// Decodes datagrams against the configured payload ceiling.
#[derive(Debug, Clone)]
pub struct Decoder {
    max_payload: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder { max_payload: MAX_PAYLOAD }
    }

    pub fn decode(&self, datagram: &[u8]) -> Result<Delta, DecodeError> {
        if datagram.len() > self.max_payload {
            return Err(DecodeError::PayloadTooLarge(datagram.len()));
        }

        let root: Value = serde_json::from_slice(datagram)?;
        let obj = root.as_object().ok_or(DecodeError::NotAnObject)?;

        let mut delta = Delta::default();

        if let Some(values) = obj.get("values").and_then(Value::as_array) {
            for (idx, entry) in values.iter().take(EXTERNAL_CHANNELS).enumerate() {
                match entry {
                    Value::Null => {}
                    Value::Number(n) => {
                        if let Some(v) = n.as_f64() {
                            delta.value_writes.push((idx, ValueWrite::Set(v)));
                        }
                    }
                    Value::String(s) if s.is_empty() => {
                        delta.value_writes.push((idx, ValueWrite::Clear));
                    }
                    _ => {} // anything else: entry skipped, slot unchanged
                }
            }
        }

        if let Some(texts) = obj.get("texts").and_then(Value::as_array) {
            for (idx, entry) in texts.iter().take(EXTERNAL_CHANNELS).enumerate() {
                match entry {
                    Value::Null => {}
                    Value::String(s) if s.is_empty() => {
                        delta.text_writes.push((idx, TextWrite::Clear));
                    }
                    Value::String(s) => {
                        delta.text_writes.push((idx, TextWrite::Set(s.clone())));
                    }
                    _ => {}
                }
            }
        }

        if let Some(updates) = obj.get("asset_updates").and_then(Value::as_array) {
            for entry in updates {
                let Some(patch_obj) = entry.as_object() else { continue };
                // id is the one mandatory field of a patch
                let Some(id) = get_i64(patch_obj, "id") else { continue };
                if id < 0 || id > i32::MAX as i64 {
                    continue;
                }
                let mut patch = patch_from_object(patch_obj);
                patch.id = id as i32;
                delta.asset_patches.push(patch);
            }
        }

        Ok(delta)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
