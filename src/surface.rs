/*
 *  surface.rs
 *
 *  osdcast - pixels over datagrams
 *  (c) 2024-26 the osdcast authors
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
//! The boundary between the channel/asset runtime and whatever actually
//! paints pixels. The engine only calls these methods when its dirty-flag
//! analysis says a visual property really changed.

use log::debug;

use crate::assets::{AssetConfig, Orientation};
use crate::render::Rect;
use crate::segment::RenderPlan;

/// Style bundle pushed on restyle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub bar_color: u32,
    pub text_color: u32,
    pub background: i32,
    pub background_opacity: i32,
    pub rounded_outline: bool,
}

impl Style {
    pub fn of(cfg: &AssetConfig) -> Self {
        Style {
            bar_color: cfg.bar_color,
            text_color: cfg.text_color,
            background: cfg.background,
            background_opacity: cfg.background_opacity,
            rounded_outline: cfg.rounded_outline,
        }
    }
}

pub trait DrawSurface {
    fn create(&mut self, cfg: &AssetConfig);
    fn destroy(&mut self, id: i32);
    fn set_fill_percent(&mut self, id: i32, pct: i32, plan: &RenderPlan);
    fn set_text(&mut self, id: i32, text: &str);
    fn set_style(&mut self, id: i32, style: &Style);
    fn set_geometry(&mut self, id: i32, rect: Rect, orientation: Orientation);
}

/// Surface used by the binary when no real compositor is attached: every
/// push becomes a debug log line, which doubles as protocol tracing.
#[derive(Debug, Default)]
pub struct LogSurface;

impl DrawSurface for LogSurface {
    fn create(&mut self, cfg: &AssetConfig) {
        debug!("surface: create asset {} ({:?})", cfg.id, cfg.kind);
    }

    fn destroy(&mut self, id: i32) {
        debug!("surface: destroy asset {}", id);
    }

    fn set_fill_percent(&mut self, id: i32, pct: i32, _plan: &RenderPlan) {
        debug!("surface: asset {} fill {}%", id, pct);
    }

    fn set_text(&mut self, id: i32, text: &str) {
        debug!("surface: asset {} text {:?}", id, text);
    }

    fn set_style(&mut self, id: i32, style: &Style) {
        debug!("surface: asset {} style {:?}", id, style);
    }

    fn set_geometry(&mut self, id: i32, rect: Rect, orientation: Orientation) {
        debug!("surface: asset {} geometry {:?} {:?}", id, rect, orientation);
    }
}

/// Records every push for assertions in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Create(i32),
    Destroy(i32),
    Fill { id: i32, pct: i32 },
    Text { id: i32, text: String },
    Style { id: i32, style: Style },
    Geometry { id: i32, rect: Rect, orientation: Orientation },
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn fills_for(&self, id: i32) -> Vec<i32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Fill { id: i, pct } if *i == id => Some(*pct),
                _ => None,
            })
            .collect()
    }

    pub fn texts_for(&self, id: i32) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Text { id: i, text } if *i == id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn create(&mut self, cfg: &AssetConfig) {
        self.events.push(SurfaceEvent::Create(cfg.id));
    }

    fn destroy(&mut self, id: i32) {
        self.events.push(SurfaceEvent::Destroy(id));
    }

    fn set_fill_percent(&mut self, id: i32, pct: i32, _plan: &RenderPlan) {
        self.events.push(SurfaceEvent::Fill { id, pct });
    }

    fn set_text(&mut self, id: i32, text: &str) {
        self.events.push(SurfaceEvent::Text { id, text: text.to_string() });
    }

    fn set_style(&mut self, id: i32, style: &Style) {
        self.events.push(SurfaceEvent::Style { id, style: *style });
    }

    fn set_geometry(&mut self, id: i32, rect: Rect, orientation: Orientation) {
        self.events.push(SurfaceEvent::Geometry { id, rect, orientation });
    }
}
