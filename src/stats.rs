/*
 *  stats.rs
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
//! Runtime counters and the stats overlay text: refresh rate, loop timings,
//! and optionally a dump of the external channels.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use crate::assets::AssetRegistry;
use crate::channels::{ChannelBank, EXTERNAL_CHANNELS};
use crate::config::AppConfig;

/// Overlay recompose cadence (~4 Hz).
const REPORT_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct StatsTracker {
    started: Instant,
    frames: u32,
    window_start: Option<Instant>,
    rate: u32,
    last_report: Option<Instant>,
    pub last_drain_ms: u32,
    pub last_loop_ms: u32,
    pub idle_applied_ms: u32,
}

impl StatsTracker {
    pub fn new(now: Instant) -> Self {
        StatsTracker {
            started: now,
            frames: 0,
            window_start: None,
            rate: 0,
            last_report: None,
            last_drain_ms: 0,
            last_loop_ms: 0,
            idle_applied_ms: 0,
        }
    }

    /// Counts one visual refresh.
    pub fn note_refresh(&mut self) {
        self.frames += 1;
    }

    pub fn restart_rate_window(&mut self, now: Instant) {
        self.window_start = Some(now);
        self.frames = 0;
    }

    /// True at most once per report interval.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last_report {
            Some(last) if now.saturating_duration_since(last) < REPORT_INTERVAL => false,
            _ => {
                self.last_report = Some(now);
                true
            }
        }
    }

    fn roll_rate(&mut self, now: Instant) {
        let start = self.window_start.unwrap_or(self.started);
        let elapsed = now.saturating_duration_since(start);
        if !elapsed.is_zero() {
            self.rate = ((self.frames as u64 * 1000) / elapsed.as_millis().max(1) as u64) as u32;
            self.frames = 0;
            self.window_start = Some(now);
        }
    }

    /// Composes the overlay block shown when `show_stats` is on.
    pub fn overlay(
        &mut self,
        now: Instant,
        cfg: &AppConfig,
        bank: &ChannelBank,
        registry: &AssetRegistry,
    ) -> String {
        self.roll_rate(now);

        let active = registry.iter().filter(|a| a.cfg.enabled).count();
        let mut out = String::with_capacity(256);
        let _ = write!(
            out,
            "OSD {}x{}\nAssets {}/{}\nRefresh {}/s | drain {}ms | loop {}ms | idle {}ms",
            cfg.width,
            cfg.height,
            active,
            registry.len(),
            self.rate,
            self.last_drain_ms,
            self.last_loop_ms,
            self.idle_applied_ms,
        );

        if cfg.udp_stats {
            out.push_str("\nUDP values:");
            for i in 0..EXTERNAL_CHANNELS {
                let _ = write!(out, "\n v{}={:.2}", i, bank.value(i));
            }
            out.push_str("\nUDP texts:");
            for i in 0..EXTERNAL_CHANNELS {
                let t = bank.text(i);
                let _ = write!(out, "\n t{}={}", i, if t.is_empty() { "-" } else { t });
            }
        }

        out
    }
}

// ---------- tests ----------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetConfig;

    #[test]
    fn due_fires_at_most_every_interval() {
        let t0 = Instant::now();
        let mut stats = StatsTracker::new(t0);
        assert!(stats.due(t0));
        assert!(!stats.due(t0 + Duration::from_millis(100)));
        assert!(stats.due(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn overlay_reports_assets_and_channels() {
        let t0 = Instant::now();
        let mut stats = StatsTracker::new(t0);
        let mut cfg = AppConfig::default();
        cfg.udp_stats = true;
        let mut bank = ChannelBank::new();
        bank.set_value(0, 1.5);
        bank.set_text(1, "hello");
        let mut registry = AssetRegistry::new();
        registry.rebuild(&[AssetConfig::defaults(0)]);

        let text = stats.overlay(t0 + Duration::from_millis(500), &cfg, &bank, &registry);
        assert!(text.starts_with("OSD 1280x720"));
        assert!(text.contains("Assets 1/1"));
        assert!(text.contains("v0=1.50"));
        assert!(text.contains("t1=hello"));
        assert!(text.contains("t0=-"));
    }

    #[test]
    fn rate_counts_refreshes_per_second() {
        let t0 = Instant::now();
        let mut stats = StatsTracker::new(t0);
        stats.restart_rate_window(t0);
        for _ in 0..30 {
            stats.note_refresh();
        }
        let cfg = AppConfig::default();
        let bank = ChannelBank::new();
        let registry = AssetRegistry::new();
        let text = stats.overlay(t0 + Duration::from_secs(1), &cfg, &bank, &registry);
        assert!(text.contains("Refresh 30/s"), "got: {}", text);
    }
}
