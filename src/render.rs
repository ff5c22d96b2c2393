//! Render-state derivation helpers: channel fan-in to display text, and the
//! container geometry pushed to the draw surface.

use crate::assets::{AssetConfig, AssetKind, Orientation};
use crate::channels::{ChannelBank, CHANNEL_COUNT};

/// Canvas-space rectangle pushed with `set_geometry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Effective track width for a bar; zero/unset falls back to the engine
/// default sized for the outline style.
pub fn bar_width(cfg: &AssetConfig) -> i32 {
    if cfg.width > 0 {
        cfg.width
    } else if cfg.rounded_outline {
        200
    } else {
        320
    }
}

pub fn bar_height(cfg: &AssetConfig) -> i32 {
    if cfg.height > 0 {
        cfg.height
    } else if cfg.rounded_outline {
        20
    } else {
        32
    }
}

/// Canvas placement for an asset. A left-growing bar anchors `x` at its
/// right edge, so the container is mirrored back by its own width.
pub fn container_rect(cfg: &AssetConfig) -> Rect {
    let (w, h) = match cfg.kind {
        AssetKind::Bar => (bar_width(cfg), bar_height(cfg)),
        AssetKind::Text => (cfg.width.max(0), cfg.height.max(0)),
    };
    let x = if cfg.kind == AssetKind::Bar && cfg.orientation == Orientation::Left {
        cfg.x - w
    } else {
        cfg.x
    };
    Rect { x, y: cfg.y, w, h }
}

fn channel_text<'a>(bank: &'a ChannelBank, idx: i32) -> &'a str {
    if idx >= 0 {
        bank.text(idx as usize)
    } else {
        ""
    }
}

/// Composes the display string for an asset from its channels.
///
/// Text assets fan in `text_indices` (joined by space when inline, newline
/// otherwise), then fall back to `text_index`, then to the static label.
/// Bars resolve their attached label from `text_index` with the same label
/// fallback.
pub fn compose_text(cfg: &AssetConfig, bank: &ChannelBank) -> String {
    if cfg.kind == AssetKind::Text {
        let mut out = String::new();
        let sep = if cfg.text_inline { ' ' } else { '\n' };
        for &idx in &cfg.text_indices {
            let t = bank.text(idx.min(CHANNEL_COUNT - 1));
            if t.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(sep);
            }
            out.push_str(t);
        }
        if out.is_empty() {
            out.push_str(channel_text(bank, cfg.text_index));
        }
        if out.is_empty() {
            out.push_str(&cfg.label);
        }
        return out;
    }

    let t = channel_text(bank, cfg.text_index);
    if !t.is_empty() {
        t.to_string()
    } else {
        cfg.label.clone()
    }
}
