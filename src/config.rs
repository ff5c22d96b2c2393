use serde::Deserialize;
use serde_json::Value;
use dirs_next::home_dir;
use std::io;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::assets::{AssetConfig, MAX_ASSETS, MAX_ASSET_ID};
use crate::ingest::{patch_from_object, AssetPatch};
use crate::scheduler::clamp_idle_ms;

pub const DEFAULT_SCREEN_WIDTH: i32 = 1280;
pub const DEFAULT_SCREEN_HEIGHT: i32 = 720;
pub const DEFAULT_PORT: u16 = 7777;
pub const DEFAULT_IDLE_MS: u64 = 100;
pub const DEFAULT_SYSTEM_REFRESH_MS: u64 = 1000;
pub const CONFIG_FILE: &str = "config.json";

pub fn clamp_system_refresh_ms(ms: u64) -> u64 {
    ms.clamp(100, 60_000)
}

/// Error type for config loading. A missing file is not an error (defaults
/// apply); an unreadable or unparsable one is, and the caller decides what
/// to fall back to.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Raw configuration document. All fields are Options layered over the
/// built-in defaults; unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigDoc {
    width: Option<i64>,
    height: Option<i64>,
    pos_x: Option<i64>,
    pos_y: Option<i64>,
    show_stats: Option<bool>,
    udp_stats: Option<bool>,
    idle_ms: Option<i64>,
    /// Legacy name for `idle_ms`, kept for older configs.
    refresh_ms: Option<i64>,
    system_refresh_ms: Option<i64>,
    // Backwards-compatible single bar fields, honored when no assets array
    // overrides asset 0.
    bar_x: Option<i64>,
    bar_y: Option<i64>,
    bar_width: Option<i64>,
    bar_height: Option<i64>,
    bar_min: Option<f64>,
    bar_max: Option<f64>,
    bar_color: Option<i64>,
    assets: Option<Vec<Value>>,
}

/// Effective global settings plus the initial asset definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub width: i32,
    pub height: i32,
    pub pos_x: i32,
    pub pos_y: i32,
    pub show_stats: bool,
    pub udp_stats: bool,
    pub idle_ms: u64,
    pub system_refresh_ms: u64,
    pub assets: Vec<AssetConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            width: DEFAULT_SCREEN_WIDTH,
            height: DEFAULT_SCREEN_HEIGHT,
            pos_x: 0,
            pos_y: 0,
            show_stats: true,
            udp_stats: false,
            idle_ms: DEFAULT_IDLE_MS,
            system_refresh_ms: DEFAULT_SYSTEM_REFRESH_MS,
            assets: vec![AssetConfig::defaults(0)],
        }
    }
}

/// Applies every present patch field onto a definition. Used to materialize
/// config entries; runtime patches go through the diffing engine instead.
fn overlay(cfg: &mut AssetConfig, patch: &AssetPatch) {
    if let Some(v) = patch.enabled { cfg.enabled = v; }
    if let Some(v) = patch.kind { cfg.kind = v; }
    if let Some(v) = patch.value_index { cfg.value_index = v; }
    if let Some(v) = patch.text_index { cfg.text_index = v; }
    if let Some(v) = &patch.text_indices { cfg.text_indices = v.clone(); }
    if let Some(v) = patch.text_inline { cfg.text_inline = v; }
    if let Some(v) = &patch.label { cfg.label = v.clone(); }
    if let Some(v) = patch.orientation { cfg.orientation = v; }
    if let Some(v) = patch.x { cfg.x = v; }
    if let Some(v) = patch.y { cfg.y = v; }
    if let Some(v) = patch.width { cfg.width = v; }
    if let Some(v) = patch.height { cfg.height = v; }
    if let Some(v) = patch.min { cfg.min = v; }
    if let Some(v) = patch.max { cfg.max = v; }
    if let Some(v) = patch.bar_color { cfg.bar_color = v; }
    if let Some(v) = patch.text_color { cfg.text_color = v; }
    if let Some(v) = patch.background { cfg.background = v; }
    if let Some(v) = patch.background_opacity { cfg.background_opacity = v; }
    if let Some(v) = patch.segments { cfg.segments = v; }
    if let Some(v) = patch.rounded_outline { cfg.rounded_outline = v; }
}

impl AppConfig {
    /// Loads and materializes a configuration document. A missing file
    /// yields the built-in defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let doc: ConfigDoc = serde_json::from_str(&raw)?;
        Ok(Self::from_doc(doc))
    }

    fn from_doc(doc: ConfigDoc) -> Self {
        let mut cfg = AppConfig::default();

        if let Some(v) = doc.width { cfg.width = v as i32; }
        if let Some(v) = doc.height { cfg.height = v as i32; }
        if let Some(v) = doc.pos_x { cfg.pos_x = v as i32; }
        if let Some(v) = doc.pos_y { cfg.pos_y = v as i32; }
        if let Some(v) = doc.show_stats { cfg.show_stats = v; }
        if let Some(v) = doc.udp_stats { cfg.udp_stats = v; }
        if let Some(v) = doc.idle_ms.or(doc.refresh_ms) {
            cfg.idle_ms = clamp_idle_ms(v.max(0) as u64);
        }
        if let Some(v) = doc.system_refresh_ms {
            cfg.system_refresh_ms = clamp_system_refresh_ms(v.max(0) as u64);
        }

        let mut bar0 = AssetConfig::defaults(0);
        if let Some(v) = doc.bar_x { bar0.x = v as i32; }
        if let Some(v) = doc.bar_y { bar0.y = v as i32; }
        if let Some(v) = doc.bar_width { bar0.width = v as i32; }
        if let Some(v) = doc.bar_height { bar0.height = v as i32; }
        if let Some(v) = doc.bar_min { bar0.min = v; }
        if let Some(v) = doc.bar_max { bar0.max = v; }
        if let Some(v) = doc.bar_color { bar0.bar_color = v as u32; }
        cfg.assets = vec![bar0];

        // Preferred structured assets list
        if let Some(entries) = &doc.assets {
            let mut assets = Vec::new();
            for (i, entry) in entries.iter().enumerate() {
                if assets.len() >= MAX_ASSETS {
                    break;
                }
                let Some(obj) = entry.as_object() else { continue };
                let patch = patch_from_object(obj);
                // Assets without an id get their array position.
                let id = obj
                    .get("id")
                    .and_then(Value::as_i64)
                    .map(|v| v.clamp(0, MAX_ASSET_ID as i64) as i32)
                    .unwrap_or(i as i32);
                let mut asset = AssetConfig::defaults(id);
                overlay(&mut asset, &patch);
                assets.push(asset);
            }
            if !assets.is_empty() {
                cfg.assets = assets;
            }
        }

        cfg
    }
}

/// Try common locations in order (first hit wins): working directory, then
/// the user config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = home_dir() {
        let p = home.join(".config/osdcast/config.json");
        if p.exists() {
            return Some(p);
        }
        let p = home.join(".config/osdcast.json");
        if p.exists() {
            return Some(p);
        }
    }
    None
}
