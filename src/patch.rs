/*
 *  patch.rs
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
//! Applies decoded deltas to the channel bank and asset registry, diffing
//! each patched field against current state to derive the minimal set of
//! side effects. A field that matches the current value changes nothing,
//! which is what keeps idempotent re-sends from churning the display.

use crate::assets::{AssetKind, AssetRegistry, AssetState};
use crate::channels::ChannelBank;
use crate::ingest::{AssetPatch, Delta, TextWrite, ValueWrite};
use crate::render::container_rect;
use crate::surface::{DrawSurface, Style};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    pub recreate: bool,
    pub relayout: bool,
    pub restyle: bool,
    pub rerange: bool,
    pub text_change: bool,
}

/// Applies one decoded delta in order: channel writes first, then each asset
/// patch. Within one drain cycle deltas are applied strictly in arrival
/// order, so the last write to a slot or field wins.
pub fn apply_delta(
    delta: &Delta,
    bank: &mut ChannelBank,
    registry: &mut AssetRegistry,
    surface: &mut dyn DrawSurface,
) {
    for (idx, write) in &delta.value_writes {
        match write {
            ValueWrite::Set(v) => bank.set_value(*idx, *v),
            ValueWrite::Clear => bank.clear_value(*idx),
        }
    }
    for (idx, write) in &delta.text_writes {
        match write {
            TextWrite::Set(s) => bank.set_text(*idx, s),
            TextWrite::Clear => bank.clear_text(*idx),
        }
    }
    for patch in &delta.asset_patches {
        apply_patch(patch, registry, surface);
    }
}

/// Diffs the patched fields into [`DirtyFlags`]. Only fields both present
/// and different from the current value take effect.
fn diff_fields(patch: &AssetPatch, asset: &mut AssetState) -> DirtyFlags {
    let cfg = &mut asset.cfg;
    let mut flags = DirtyFlags::default();

    if let Some(kind) = patch.kind {
        if kind != cfg.kind {
            cfg.kind = kind;
            flags.recreate = true;
        }
    }

    // Rebinding the value channel needs no flag: the next refresh reads the
    // new channel and the percentage dedup decides whether to push.
    if let Some(idx) = patch.value_index {
        cfg.value_index = idx;
    }

    if let Some(idx) = patch.text_index {
        if idx != cfg.text_index {
            cfg.text_index = idx;
            flags.text_change = true;
        }
    }

    if let Some(indices) = &patch.text_indices {
        if *indices != cfg.text_indices {
            cfg.text_indices = indices.clone();
            flags.text_change = true;
        }
    }

    if let Some(inline) = patch.text_inline {
        if inline != cfg.text_inline {
            cfg.text_inline = inline;
            flags.text_change = true;
        }
    }

    if let Some(outline) = patch.rounded_outline {
        if outline != cfg.rounded_outline {
            cfg.rounded_outline = outline;
            flags.recreate = true;
        }
    }

    if let Some(label) = &patch.label {
        if *label != cfg.label {
            cfg.label = label.clone();
            flags.text_change = true;
        }
    }

    if let Some(orientation) = patch.orientation {
        if orientation != cfg.orientation {
            cfg.orientation = orientation;
            flags.relayout = true;
        }
    }

    if let Some(color) = patch.bar_color {
        if cfg.kind != AssetKind::Text && color != cfg.bar_color {
            cfg.bar_color = color;
            flags.restyle = true;
        }
    }

    if let Some(color) = patch.text_color {
        if color != cfg.text_color {
            cfg.text_color = color;
            flags.restyle = true;
            flags.text_change = true;
        }
    }

    if let Some(bg) = patch.background {
        if bg != cfg.background {
            cfg.background = bg;
            flags.restyle = true;
        }
    }

    if let Some(opa) = patch.background_opacity {
        if opa != cfg.background_opacity {
            cfg.background_opacity = opa;
            flags.restyle = true;
        }
    }

    if let Some(segments) = patch.segments {
        if segments != cfg.segments {
            cfg.segments = segments;
            // No recreate: just invalidate the cached fill so the next draw
            // recomputes the segment plan.
            asset.last_rendered_pct = None;
        }
    }

    if let Some(x) = patch.x {
        if x != cfg.x {
            cfg.x = x;
            flags.relayout = true;
        }
    }
    if let Some(y) = patch.y {
        if y != cfg.y {
            cfg.y = y;
            flags.relayout = true;
        }
    }
    if let Some(w) = patch.width {
        if w != cfg.width {
            cfg.width = w;
            flags.relayout = true;
            // Text layout reflows at creation time only.
            if cfg.kind == AssetKind::Text {
                flags.recreate = true;
            }
        }
    }
    if let Some(h) = patch.height {
        if h != cfg.height {
            cfg.height = h;
            flags.relayout = true;
            if cfg.kind == AssetKind::Text {
                flags.recreate = true;
            }
        }
    }

    if let Some(min) = patch.min {
        if min != cfg.min {
            cfg.min = min;
            flags.rerange = true;
        }
    }
    if let Some(max) = patch.max {
        if max != cfg.max {
            cfg.max = max;
            flags.rerange = true;
        }
    }

    flags
}

fn apply_patch(patch: &AssetPatch, registry: &mut AssetRegistry, surface: &mut dyn DrawSurface) {
    let mut remove_record = false;

    {
        // Registry full and id unknown: the whole patch silently no-ops.
        let Some(asset) = registry.upsert_patch(patch.id) else {
            return;
        };

        let was_enabled = asset.cfg.enabled;
        let had_visual = asset.visual;

        let mut flags = diff_fields(patch, asset);

        let enabled = patch.enabled.unwrap_or(asset.cfg.enabled);
        let enabled_change = enabled != asset.cfg.enabled;
        asset.cfg.enabled = enabled;

        if !enabled {
            // Tear down the visual and skip all other flag processing.
            if had_visual {
                surface.destroy(asset.cfg.id);
                asset.visual = false;
            }
            asset.reset_render_cache();
            // A live asset switched off releases its registry slot; a
            // patch-created record that never enabled stays parked.
            remove_record = was_enabled;
        } else {
            if !had_visual || flags.recreate || enabled_change {
                // The create step positions and ranges the widget itself.
                asset.visual = true;
                asset.reset_render_cache();
                surface.create(&asset.cfg);
                flags.restyle = true;
                flags.relayout = false;
                flags.text_change = true;
            } else {
                if flags.relayout {
                    surface.set_geometry(
                        asset.cfg.id,
                        container_rect(&asset.cfg),
                        asset.cfg.orientation,
                    );
                }
                if flags.rerange {
                    asset.last_rendered_pct = None;
                }
            }

            if flags.restyle {
                surface.set_style(asset.cfg.id, &Style::of(&asset.cfg));
            }
            if flags.text_change {
                asset.last_rendered_text = None;
            }
        }
    }

    if remove_record {
        registry.remove(patch.id);
    }
}

// ---------- tests ----------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetConfig, Orientation};
    use crate::surface::{RecordingSurface, SurfaceEvent};

    fn live_registry(ids: &[i32]) -> AssetRegistry {
        let mut reg = AssetRegistry::new();
        let defs: Vec<AssetConfig> = ids.iter().map(|&id| AssetConfig::defaults(id)).collect();
        reg.rebuild(&defs);
        for asset in reg.iter_mut() {
            asset.visual = true;
        }
        reg
    }

    fn patch(id: i32) -> AssetPatch {
        AssetPatch { id, ..AssetPatch::default() }
    }

    fn apply(p: &AssetPatch, reg: &mut AssetRegistry, surface: &mut RecordingSurface) {
        let delta = Delta { asset_patches: vec![p.clone()], ..Delta::default() };
        let mut bank = ChannelBank::new();
        apply_delta(&delta, &mut bank, reg, surface);
    }

    #[test]
    fn channel_writes_hit_the_bank() {
        let mut bank = ChannelBank::new();
        bank.set_value(0, 42.0);
        bank.set_text(1, "stale");
        let delta = Delta {
            value_writes: vec![(0, ValueWrite::Clear), (2, ValueWrite::Set(0.9))],
            text_writes: vec![(1, TextWrite::Clear), (3, TextWrite::Set("new".into()))],
            asset_patches: vec![],
        };
        let mut reg = AssetRegistry::new();
        let mut surface = RecordingSurface::new();
        apply_delta(&delta, &mut bank, &mut reg, &mut surface);
        assert_eq!(bank.value(0), 0.0);
        assert_eq!(bank.value(2), 0.9);
        assert_eq!(bank.text(1), "");
        assert_eq!(bank.text(3), "new");
    }

    #[test]
    fn identical_patch_is_a_no_op() {
        let mut reg = live_registry(&[0]);
        let mut surface = RecordingSurface::new();
        let mut p = patch(0);
        p.x = Some(99);
        p.bar_color = Some(0xFF0000);

        apply(&p, &mut reg, &mut surface);
        let first_round = surface.events.len();
        assert!(first_round > 0);

        // Same field values again: nothing differs, nothing is pushed.
        apply(&p, &mut reg, &mut surface);
        assert_eq!(surface.events.len(), first_round);
    }

    #[test]
    fn geometry_change_on_bar_relayouts_without_recreate() {
        let mut reg = live_registry(&[0]);
        let mut surface = RecordingSurface::new();
        let mut p = patch(0);
        p.x = Some(500);

        apply(&p, &mut reg, &mut surface);
        assert_eq!(surface.events.len(), 1);
        match &surface.events[0] {
            SurfaceEvent::Geometry { id: 0, rect, .. } => assert_eq!(rect.x, 500),
            other => panic!("expected geometry push, got {:?}", other),
        }
    }

    #[test]
    fn size_change_on_text_asset_recreates() {
        let mut reg = live_registry(&[0]);
        reg.find(0).unwrap().cfg.kind = AssetKind::Text;
        let mut surface = RecordingSurface::new();
        let mut p = patch(0);
        p.width = Some(640);

        apply(&p, &mut reg, &mut surface);
        assert!(surface.events.iter().any(|e| matches!(e, SurfaceEvent::Create(0))));
        // recreate swallows the relayout
        assert!(!surface.events.iter().any(|e| matches!(e, SurfaceEvent::Geometry { .. })));
    }

    #[test]
    fn left_orientation_mirrors_pushed_geometry() {
        let mut reg = live_registry(&[0]);
        {
            let cfg = &mut reg.find(0).unwrap().cfg;
            cfg.x = 300;
            cfg.width = 200;
        }
        let mut surface = RecordingSurface::new();
        let mut p = patch(0);
        p.orientation = Some(Orientation::Left);

        apply(&p, &mut reg, &mut surface);
        match &surface.events[0] {
            SurfaceEvent::Geometry { rect, orientation, .. } => {
                assert_eq!(rect.x + rect.w, 300);
                assert_eq!(*orientation, Orientation::Left);
            }
            other => panic!("expected geometry push, got {:?}", other),
        }
    }

    #[test]
    fn disable_tears_down_and_frees_the_slot() {
        let mut reg = live_registry(&[0, 1]);
        let mut surface = RecordingSurface::new();
        let mut p = patch(1);
        p.enabled = Some(false);
        // other fields riding along are skipped once the asset disables
        p.x = Some(123);

        apply(&p, &mut reg, &mut surface);
        assert_eq!(surface.events, vec![SurfaceEvent::Destroy(1)]);
        assert!(reg.get(1).is_none());
    }

    #[test]
    fn enable_creates_and_forces_restyle() {
        let mut reg = AssetRegistry::new();
        let mut surface = RecordingSurface::new();
        let mut p = patch(5);
        p.enabled = Some(true);
        p.bar_color = Some(0x00FF00);

        apply(&p, &mut reg, &mut surface);
        assert!(matches!(surface.events[0], SurfaceEvent::Create(5)));
        assert!(surface.events.iter().any(|e| matches!(
            e,
            SurfaceEvent::Style { id: 5, style } if style.bar_color == 0x00FF00
        )));
        assert!(reg.get(5).unwrap().cfg.enabled);
    }

    #[test]
    fn patch_without_enable_leaves_new_record_parked() {
        let mut reg = AssetRegistry::new();
        let mut surface = RecordingSurface::new();
        let mut p = patch(3);
        p.x = Some(10);

        apply(&p, &mut reg, &mut surface);
        assert!(surface.events.is_empty());
        let asset = reg.get(3).unwrap();
        assert!(!asset.cfg.enabled);
        assert_eq!(asset.cfg.x, 10);
    }

    #[test]
    fn full_registry_silently_drops_patch() {
        let mut reg = live_registry(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let mut surface = RecordingSurface::new();
        let mut p = patch(8);
        p.enabled = Some(true);

        apply(&p, &mut reg, &mut surface);
        assert!(surface.events.is_empty());
        assert_eq!(reg.len(), 8);
    }

    #[test]
    fn segments_change_invalidates_fill_without_pushes() {
        let mut reg = live_registry(&[0]);
        reg.find(0).unwrap().last_rendered_pct = Some(40);
        let mut surface = RecordingSurface::new();
        let mut p = patch(0);
        p.segments = Some(4);

        apply(&p, &mut reg, &mut surface);
        assert!(surface.events.is_empty());
        assert_eq!(reg.get(0).unwrap().last_rendered_pct, None);
    }

    #[test]
    fn range_change_invalidates_cached_percent() {
        let mut reg = live_registry(&[0]);
        reg.find(0).unwrap().last_rendered_pct = Some(40);
        let mut surface = RecordingSurface::new();
        let mut p = patch(0);
        p.max = Some(200.0);

        apply(&p, &mut reg, &mut surface);
        assert!(surface.events.is_empty());
        assert_eq!(reg.get(0).unwrap().last_rendered_pct, None);
    }

    #[test]
    fn text_color_restyles_and_marks_text() {
        let mut reg = live_registry(&[0]);
        reg.find(0).unwrap().last_rendered_text = Some("old".into());
        let mut surface = RecordingSurface::new();
        let mut p = patch(0);
        p.text_color = Some(0x123456);

        apply(&p, &mut reg, &mut surface);
        assert!(surface.events.iter().any(|e| matches!(e, SurfaceEvent::Style { .. })));
        assert_eq!(reg.get(0).unwrap().last_rendered_text, None);
    }

    #[test]
    fn bar_color_is_ignored_on_text_assets() {
        let mut reg = live_registry(&[0]);
        reg.find(0).unwrap().cfg.kind = AssetKind::Text;
        let mut surface = RecordingSurface::new();
        let mut p = patch(0);
        p.bar_color = Some(0xABCDEF);

        apply(&p, &mut reg, &mut surface);
        assert!(surface.events.is_empty());
        assert_ne!(reg.get(0).unwrap().cfg.bar_color, 0xABCDEF);
    }
}
