//! Asset model and the bounded registry of live overlay widgets.

use crate::channels::CHANNEL_COUNT;

/// Hard cap on live assets; patches addressing further ids are dropped.
pub const MAX_ASSETS: usize = 8;

/// Highest asset id accepted from configuration documents.
pub const MAX_ASSET_ID: i32 = 63;

/// Cap on the `text_indices` fan-in list of a text asset.
pub const MAX_TEXT_INDICES: usize = 8;

/// Background palette addressed by the `background` field (0..=10).
/// Entries are (rgb, opacity percent); -1 selects fully transparent.
pub const BACKGROUND_STYLES: [(u32, u8); 11] = [
    (0x000000, 0), // fully transparent baseline
    (0x000000, 50),
    (0xFFFFFF, 50),
    (0x111111, 70),
    (0x222222, 90),
    (0x2266CC, 60),
    (0x009688, 60),
    (0x4CAF50, 60),
    (0xFF9800, 70),
    (0xE91E63, 60),
    (0x9C27B0, 70),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Bar,
    Text,
}

impl AssetKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bar" => Some(AssetKind::Bar),
            "text" => Some(AssetKind::Text),
            _ => None,
        }
    }
}

/// Growth/alignment direction. Bars grow Right or Left; text blocks may also
/// align Center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Right,
    Left,
    Center,
}

impl Orientation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "right" => Some(Orientation::Right),
            "left" => Some(Orientation::Left),
            "center" => Some(Orientation::Center),
            _ => None,
        }
    }
}

/// Full definition of one overlay asset. Shared between the configuration
/// document and the runtime state; the wire protocol patches subsets of it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    pub id: i32,
    pub kind: AssetKind,
    pub enabled: bool,
    pub value_index: usize,
    pub text_index: i32,
    pub text_indices: Vec<usize>,
    pub text_inline: bool,
    pub label: String,
    pub orientation: Orientation,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub min: f64,
    pub max: f64,
    pub bar_color: u32,
    pub text_color: u32,
    pub background: i32,
    pub background_opacity: i32,
    pub segments: u32,
    pub rounded_outline: bool,
}

impl AssetConfig {
    /// Engine defaults: a right-growing bar bound to the channel matching its
    /// id, stacked vertically down the canvas.
    pub fn defaults(id: i32) -> Self {
        AssetConfig {
            id,
            kind: AssetKind::Bar,
            enabled: true,
            value_index: id.clamp(0, CHANNEL_COUNT as i32 - 1) as usize,
            text_index: -1,
            text_indices: Vec::new(),
            text_inline: false,
            label: String::new(),
            orientation: Orientation::Right,
            x: 40,
            y: 60 + id * 60,
            width: 320,
            height: 32,
            min: 0.0,
            max: 1.0,
            bar_color: 0x2266CC,
            text_color: 0xFFFFFF,
            background: -1,
            background_opacity: -1,
            segments: 0,
            rounded_outline: false,
        }
    }

    /// True when a bar asset carries an attached label widget.
    pub fn wants_label(&self) -> bool {
        !self.label.is_empty() || self.text_index >= 0
    }
}

/// One live registry record: the definition plus ephemeral render state used
/// only to de-duplicate pushes to the draw surface.
#[derive(Debug, Clone)]
pub struct AssetState {
    pub cfg: AssetConfig,
    /// Whether a visual currently exists on the draw surface.
    pub visual: bool,
    pub last_rendered_pct: Option<i32>,
    pub last_rendered_text: Option<String>,
}

impl AssetState {
    pub fn new(cfg: AssetConfig) -> Self {
        AssetState {
            cfg,
            visual: false,
            last_rendered_pct: None,
            last_rendered_text: None,
        }
    }

    pub fn id(&self) -> i32 {
        self.cfg.id
    }

    /// Forget everything pushed so far; the next refresh re-pushes.
    pub fn reset_render_cache(&mut self) {
        self.last_rendered_pct = None;
        self.last_rendered_text = None;
    }
}

/// Owns up to [`MAX_ASSETS`] records keyed by a stable integer id.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: Vec<AssetState>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        AssetRegistry { assets: Vec::with_capacity(MAX_ASSETS) }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.assets.len() >= MAX_ASSETS
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetState> {
        self.assets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AssetState> {
        self.assets.iter_mut()
    }

    pub fn find(&mut self, id: i32) -> Option<&mut AssetState> {
        self.assets.iter_mut().find(|a| a.cfg.id == id)
    }

    pub fn get(&self, id: i32) -> Option<&AssetState> {
        self.assets.iter().find(|a| a.cfg.id == id)
    }

    /// Resolves the target of a patch: an existing record is returned for
    /// in-place mutation; an unknown id creates a fresh record with engine
    /// defaults, disabled until the patch says otherwise. Returns `None` when
    /// the registry is full, which makes the whole patch a silent no-op.
    pub fn upsert_patch(&mut self, id: i32) -> Option<&mut AssetState> {
        if let Some(pos) = self.assets.iter().position(|a| a.cfg.id == id) {
            return Some(&mut self.assets[pos]);
        }
        if self.is_full() {
            return None;
        }
        let mut cfg = AssetConfig::defaults(id);
        cfg.enabled = false;
        self.assets.push(AssetState::new(cfg));
        self.assets.last_mut()
    }

    /// Drops the record for `id`; later patches may re-create it.
    pub fn remove(&mut self, id: i32) {
        self.assets.retain(|a| a.cfg.id != id);
    }

    /// Destroys all current records and creates one per definition in order,
    /// truncating at the 8-asset cap. Used on startup and config reload.
    pub fn rebuild(&mut self, definitions: &[AssetConfig]) {
        self.assets.clear();
        for cfg in definitions.iter().take(MAX_ASSETS) {
            self.assets.push(AssetState::new(cfg.clone()));
        }
    }
}

// ---------- tests ----------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_creates_disabled_defaults() {
        let mut reg = AssetRegistry::new();
        let asset = reg.upsert_patch(3).unwrap();
        assert_eq!(asset.cfg.id, 3);
        assert!(!asset.cfg.enabled);
        assert_eq!(asset.cfg.kind, AssetKind::Bar);
        assert_eq!(asset.cfg.value_index, 3);
        assert_eq!(asset.cfg.y, 60 + 3 * 60);
    }

    #[test]
    fn upsert_returns_existing_record() {
        let mut reg = AssetRegistry::new();
        reg.upsert_patch(1).unwrap().cfg.x = 500;
        let again = reg.upsert_patch(1).unwrap();
        assert_eq!(again.cfg.x, 500);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn registry_caps_at_eight() {
        let mut reg = AssetRegistry::new();
        for id in 0..8 {
            assert!(reg.upsert_patch(id).is_some());
        }
        assert!(reg.upsert_patch(8).is_none());
        assert_eq!(reg.len(), 8);
    }

    #[test]
    fn rebuild_replaces_and_truncates() {
        let mut reg = AssetRegistry::new();
        reg.upsert_patch(42).unwrap();

        let defs: Vec<AssetConfig> = (0..10).map(AssetConfig::defaults).collect();
        reg.rebuild(&defs);
        assert_eq!(reg.len(), 8);
        assert!(reg.get(42).is_none());
        assert!(reg.get(7).is_some());
    }

    #[test]
    fn remove_frees_a_slot() {
        let mut reg = AssetRegistry::new();
        for id in 0..8 {
            reg.upsert_patch(id).unwrap();
        }
        reg.remove(4);
        assert_eq!(reg.len(), 7);
        assert!(reg.upsert_patch(9).is_some());
    }
}
