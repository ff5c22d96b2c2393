/*
 *  engine.rs
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
//! The channel/asset runtime. One `Engine` owns the channel bank, the asset
//! registry and the refresh scheduler; the surrounding loop feeds it
//! datagrams and wakes it on its wait budget. Everything here runs on a
//! single thread between wakeups.

use std::time::Instant;

use log::{info, warn};

use crate::assets::{AssetKind, AssetRegistry};
use crate::channels::ChannelBank;
use crate::config::AppConfig;
use crate::ingest::Decoder;
use crate::patch;
use crate::render;
use crate::scheduler::UpdateScheduler;
use crate::segment;
use crate::stats::StatsTracker;
use crate::surface::{DrawSurface, Style};

pub struct Engine {
    cfg: AppConfig,
    bank: ChannelBank,
    registry: AssetRegistry,
    decoder: Decoder,
    scheduler: UpdateScheduler,
    stats: StatsTracker,
}

impl Engine {
    pub fn new(cfg: AppConfig) -> Self {
        let mut registry = AssetRegistry::new();
        registry.rebuild(&cfg.assets);
        Engine {
            scheduler: UpdateScheduler::new(cfg.idle_ms),
            stats: StatsTracker::new(Instant::now()),
            bank: ChannelBank::new(),
            decoder: Decoder::new(),
            registry,
            cfg,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn bank(&self) -> &ChannelBank {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut ChannelBank {
        &mut self.bank
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn stats_mut(&mut self) -> &mut StatsTracker {
        &mut self.stats
    }

    /// Creates the visuals for all enabled assets and pushes their initial
    /// render state. Called at startup and after a reload.
    pub fn install(&mut self, surface: &mut dyn DrawSurface) {
        for asset in self.registry.iter_mut() {
            if asset.cfg.enabled {
                asset.visual = true;
                asset.reset_render_cache();
                surface.create(&asset.cfg);
                surface.set_style(asset.cfg.id, &Style::of(&asset.cfg));
            }
        }
        self.refresh(surface);
    }

    /// Decodes and applies one datagram. Decode failures drop the datagram
    /// whole and are never fatal. Returns true when a delta was applied.
    pub fn ingest(&mut self, datagram: &[u8], surface: &mut dyn DrawSurface) -> bool {
        match self.decoder.decode(datagram) {
            Ok(delta) => {
                patch::apply_delta(&delta, &mut self.bank, &mut self.registry, surface);
                self.scheduler.note_pending();
                true
            }
            Err(e) => {
                warn!("dropping datagram: {}", e);
                false
            }
        }
    }

    /// The metric provider wrote new system slot values.
    pub fn note_system_update(&mut self) {
        self.scheduler.note_pending();
    }

    pub fn wait_budget(&self, now: Instant) -> std::time::Duration {
        self.scheduler.wait_budget(now)
    }

    /// Runs a visual refresh when one is owed and the throttle window has
    /// passed. Returns true when a refresh happened.
    pub fn maybe_refresh(&mut self, now: Instant, surface: &mut dyn DrawSurface) -> bool {
        if !self.scheduler.take_refresh(now) {
            return false;
        }
        self.refresh(surface);
        true
    }

    /// Re-derives render state from the bank and registry and pushes what
    /// changed: fill percentages for bars, composed strings for text assets
    /// and bar labels. Unchanged values are never re-pushed.
    fn refresh(&mut self, surface: &mut dyn DrawSurface) {
        for asset in self.registry.iter_mut() {
            if !asset.cfg.enabled || !asset.visual {
                continue;
            }
            let cfg = &asset.cfg;
            match cfg.kind {
                AssetKind::Bar => {
                    let value = self.bank.value(cfg.value_index);
                    let plan = segment::plan(
                        value,
                        cfg.min,
                        cfg.max,
                        cfg.segments,
                        cfg.orientation,
                        render::bar_width(cfg),
                    );
                    if asset.last_rendered_pct != Some(plan.pct) {
                        surface.set_fill_percent(cfg.id, plan.pct, &plan);
                        asset.last_rendered_pct = Some(plan.pct);
                    }
                    if cfg.wants_label() {
                        let text = render::compose_text(cfg, &self.bank);
                        if asset.last_rendered_text.as_deref() != Some(text.as_str()) {
                            surface.set_text(cfg.id, &text);
                            asset.last_rendered_text = Some(text);
                        }
                    }
                }
                AssetKind::Text => {
                    let text = render::compose_text(cfg, &self.bank);
                    if asset.last_rendered_text.as_deref() != Some(text.as_str()) {
                        surface.set_text(cfg.id, &text);
                        asset.last_rendered_text = Some(text);
                    }
                }
            }
        }
        self.stats.note_refresh();
    }

    /// Full configuration reload: all visuals are torn down, the registry is
    /// rebuilt from the new definitions, and global settings refresh. The
    /// channel bank is left untouched.
    pub fn reload(&mut self, new_cfg: AppConfig, surface: &mut dyn DrawSurface) {
        info!("reloading configuration ({} assets)", new_cfg.assets.len());
        for asset in self.registry.iter_mut() {
            if asset.visual {
                surface.destroy(asset.cfg.id);
                asset.visual = false;
            }
        }
        self.registry.rebuild(&new_cfg.assets);
        self.scheduler.set_idle_cap(new_cfg.idle_ms);
        self.cfg = new_cfg;
        self.install(surface);
        self.stats.restart_rate_window(Instant::now());
    }

    /// Recomposes the stats overlay at its own cadence when enabled.
    pub fn tick_stats(&mut self, now: Instant) -> Option<String> {
        if !self.cfg.show_stats || !self.stats.due(now) {
            return None;
        }
        Some(self.stats.overlay(now, &self.cfg, &self.bank, &self.registry))
    }
}
