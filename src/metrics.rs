/*
 *  metrics.rs
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
//! Local metric acquisition for the system channel slots (8-15). Gathered
//! from /proc and /sys; polled from the main loop on its own cadence, never
//! a separate thread.

use std::fs;
use std::io;
use std::time::{Duration, Instant};

use crate::channels::{ChannelBank, SLOT_BITRATE, SLOT_CPU, SLOT_ENC_FPS, SLOT_TEMP};

/// Fills the system channel slots when due. Returns true when any slot
/// changed, which counts as a pending visual change for the scheduler.
pub trait MetricProvider {
    fn refresh_if_due(&mut self, now: Instant, bank: &mut ChannelBank) -> bool;
}

/// /proc- and /sys-backed provider: CPU load and temperature. Encoder fps
/// and bitrate stay 0 until an encoder stat source is wired in; slots 12-15
/// are reserved and never touched.
#[derive(Debug)]
pub struct ProcMetricProvider {
    interval: Duration,
    last_refresh: Option<Instant>,
}

/// Reads the first whitespace-delimited float from a file.
fn read_first_float(path: &str) -> io::Result<f64> {
    let content = fs::read_to_string(path)?;
    let first_word = content.split_whitespace().next().unwrap_or("0.0");
    first_word
        .parse::<f64>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// 1-minute load average as a percentage; 0.0 on error.
fn cpu_load() -> f64 {
    match read_first_float("/proc/loadavg") {
        Ok(loadavg) => 100.0 * loadavg,
        Err(_) => 0.0,
    }
}

/// CPU temperature in Celsius from the first thermal zone; 0.0 on error.
fn cpu_temp() -> f64 {
    match read_first_float("/sys/class/thermal/thermal_zone0/temp") {
        Ok(millideg) => millideg / 1000.0,
        Err(_) => 0.0,
    }
}

impl ProcMetricProvider {
    pub fn new(interval_ms: u64) -> Self {
        ProcMetricProvider {
            interval: Duration::from_millis(interval_ms),
            last_refresh: None,
        }
    }

    pub fn set_interval(&mut self, interval_ms: u64) {
        self.interval = Duration::from_millis(interval_ms);
    }

    fn due(&self, now: Instant) -> bool {
        match self.last_refresh {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }
}

impl MetricProvider for ProcMetricProvider {
    fn refresh_if_due(&mut self, now: Instant, bank: &mut ChannelBank) -> bool {
        if !self.due(now) {
            return false;
        }
        self.last_refresh = Some(now);

        let readings = [
            (SLOT_TEMP, cpu_temp()),
            (SLOT_CPU, cpu_load()),
            (SLOT_ENC_FPS, 0.0),
            (SLOT_BITRATE, 0.0),
        ];

        let mut changed = false;
        for (slot, value) in readings {
            if bank.value(slot) != value {
                bank.set_value(slot, value);
                changed = true;
            }
        }
        changed
    }
}
