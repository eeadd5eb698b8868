// src/assets/loader.rs
// Opens an asset container, reads its manifest and installs emojis, icons,
// layout and font into a session

use log::{debug, info, log};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::cache::CacheKind;
use super::constants::MANIFEST_FILENAME;
use super::container::{AssetSource, Container};
use super::manifest::{EmojiEntry, IconEntry, LayoutEntry, Manifest, decode_entry, entry_label};
use super::partition::PartitionTable;
use super::store::{AssetData, EmojiRecord, EmojiStore, IconRecord, IconStore};
use crate::events::EmoteEvent;
use crate::exceptions::{EmoteError, Result};
use crate::logger::skip_level;
use crate::scene::engine::{Engine, FontRef};
use crate::scene::layout::apply_layout;
use crate::scene::objects::Element;
use crate::session::Session;

/// Manifest section an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Emoji,
    Icon,
    Layout,
    Font,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Emoji => "emoji_collection",
            Section::Icon => "icon_collection",
            Section::Layout => "layout",
            Section::Font => "text_font",
        })
    }
}

/// An entry that was logged and left out of the load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub section: Section,
    pub name: String,
    pub reason: String,
}

/// Outcome of a successful load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub emojis: usize,
    pub icons: usize,
    pub layouts_applied: usize,
    pub font_loaded: bool,
    pub skipped: Vec<SkippedEntry>,
}

impl LoadReport {
    fn skip(&mut self, section: Section, name: String, error: &EmoteError) {
        log!(skip_level(), "⏭️ Skipping {section} entry '{name}': {error}");
        self.skipped.push(SkippedEntry {
            section,
            name,
            reason: error.to_string(),
        });
    }
}

/// Open and fully check a container, and make sure it carries a manifest.
/// Nothing is retained on failure.
pub fn open_asset_container(
    source: &AssetSource,
    partitions: &PartitionTable,
) -> Result<Arc<Container>> {
    let container = Container::open(source, partitions)?;
    if container.find(MANIFEST_FILENAME).is_none() {
        return Err(EmoteError::AssetNotFound(format!(
            "{MANIFEST_FILENAME} in {source}"
        )));
    }
    Ok(Arc::new(container))
}

fn read_manifest(container: &Container) -> Result<Manifest> {
    let bytes = container.read_entry(MANIFEST_FILENAME)?;
    Manifest::parse(&bytes)
}

fn resolve(container: &Arc<Container>, file: &str) -> Result<AssetData> {
    let reference = container.resolve(file)?;
    Ok(AssetData::new(Arc::clone(container), reference))
}

fn build_emoji_store(
    container: &Arc<Container>,
    entries: &[Value],
    report: &mut LoadReport,
) -> Result<EmojiStore> {
    let mut store = EmojiStore::new("emoji");
    for raw in entries {
        let record = decode_entry::<EmojiEntry>(raw).and_then(|entry| {
            let eaf = entry.eaf.unwrap_or_default();
            let data = resolve(container, &entry.file)?;
            Ok((entry.name, EmojiRecord { data, fps: eaf.fps, looping: eaf.looping }))
        });
        match record {
            Ok((name, record)) => {
                store.set(&name, record)?;
            }
            Err(e) => report.skip(Section::Emoji, entry_label(raw), &e),
        }
    }
    Ok(store)
}

fn build_icon_store(
    container: &Arc<Container>,
    entries: &[Value],
    report: &mut LoadReport,
) -> Result<IconStore> {
    let mut store = IconStore::new("icon");
    for raw in entries {
        let record = decode_entry::<IconEntry>(raw).and_then(|entry| {
            let data = resolve(container, &entry.file)?;
            Ok((entry.name, IconRecord { data }))
        });
        match record {
            Ok((name, record)) => {
                store.set(&name, record)?;
            }
            Err(e) => report.skip(Section::Icon, entry_label(raw), &e),
        }
    }
    Ok(store)
}

impl<E: Engine> Session<E> {
    /// Install an opened container. Only a missing or unreadable manifest,
    /// or allocation failure, fails the load; bad entries are skipped.
    pub(crate) fn install_assets(&mut self, container: Arc<Container>) -> Result<LoadReport> {
        let manifest = read_manifest(&container)?;
        let mut report = LoadReport::default();

        let emoji = build_emoji_store(&container, &manifest.emoji_collection, &mut report)?;
        let icons = build_icon_store(&container, &manifest.icon_collection, &mut report)?;
        report.emojis = emoji.len();
        report.icons = icons.len();
        self.emoji = emoji;
        self.icons = icons;

        for raw in &manifest.layout {
            let applied = decode_entry::<LayoutEntry>(raw)
                .and_then(|entry| apply_layout(&mut self.engine, &mut self.objects, &entry));
            match applied {
                Ok(element) => {
                    debug!("📐 Laid out {element}");
                    report.layouts_applied += 1;
                }
                Err(e) => report.skip(Section::Layout, entry_label(raw), &e),
            }
        }

        if let Some(file) = manifest.text_font.as_deref() {
            match self.load_font(&container, file) {
                Ok(()) => report.font_loaded = true,
                Err(e) => report.skip(Section::Font, file.to_string(), &e),
            }
        }

        self.assets = Some(container);
        self.finish_boot();
        info!(
            "📦 Assets loaded: {} emojis, {} icons, {} layout entries, {} skipped",
            report.emojis,
            report.icons,
            report.layouts_applied,
            report.skipped.len()
        );
        Ok(report)
    }

    fn load_font(&mut self, container: &Arc<Container>, file: &str) -> Result<()> {
        let data = resolve(container, file)?;
        let buffer = self.caches.acquire(CacheKind::Font, &data)?;
        let font = self.engine.font_load(buffer)?;
        if let Some(previous) = self.font.replace(font) {
            self.engine.font_delete(previous);
        }
        if let Some(toast) = self.objects.object(Element::ToastLabel) {
            self.engine.label_set_font(toast, FontRef::Loaded(font));
        }
        debug!("🔤 Font '{file}' loaded");
        Ok(())
    }

    /// Replace the boot animation with the steady-state UI
    fn finish_boot(&mut self) {
        if self.objects.delete(&mut self.engine, Element::BootAnim) {
            debug!("🚀 Boot animation removed");
        }
        self.caches.release(CacheKind::BootAnim);
        self.boot = None;
        self.boot_done.fire();

        if let Some(message) = self.boot_message.clone() {
            if let Err(e) = self.dispatch(EmoteEvent::Sys, Some(&message)) {
                log!(skip_level(), "⚠️ Boot message not shown: {e}");
            }
        }
    }
}

/// Open `source` and install it into `session`
pub fn load_assets<E: Engine>(
    session: &mut Session<E>,
    source: &AssetSource,
    partitions: &PartitionTable,
) -> Result<LoadReport> {
    let container = open_asset_container(source, partitions)?;
    session.install_assets(container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::writer::ContainerBuilder;
    use crate::scene::engine::{GfxConfig, ImageHeader};
    use crate::scene::headless::HeadlessEngine;
    use serde_json::json;
    use tempfile::TempDir;

    fn session() -> Session<HeadlessEngine> {
        let mut engine = HeadlessEngine::new();
        engine
            .init(&GfxConfig { h_res: 360, v_res: 360, fps: 30, buf_pixels: 360, swap: false, double_buffer: false, buff_dma: false })
            .unwrap();
        Session::new(engine, Some("Hi".into()))
    }

    fn icon() -> Vec<u8> {
        let mut bytes = ImageHeader { width: 2, height: 2, ..ImageHeader::default() }.pack().to_vec();
        bytes.extend_from_slice(&[0; 8]);
        bytes
    }

    fn package(manifest: Value) -> ContainerBuilder {
        let mut builder = ContainerBuilder::new();
        builder
            .add(MANIFEST_FILENAME, serde_json::to_vec(&manifest).unwrap())
            .unwrap();
        builder.add("happy.eaf", vec![1; 40]).unwrap();
        builder.add("icon_tips.bin", icon()).unwrap();
        builder.add("font.bin", vec![9; 24]).unwrap();
        builder
    }

    #[test]
    fn test_load_from_file() {
        let manifest = json!({
            "emoji_collection": [
                {"name": "happy", "file": "happy.eaf", "eaf": {"loop": true, "fps": 24}},
                {"name": "ghost", "file": "ghost.eaf"}
            ],
            "icon_collection": [{"name": "icon_tips", "file": "icon_tips.bin"}],
            "layout": [
                {"type": "label", "name": "toast_label", "align": "GFX_ALIGN_TOP_MID", "x": 0, "y": 40},
                {"type": "image", "name": "status_icon", "x": 0, "y": 10},
                {"type": "anim", "name": "eye_anim", "align": "GFX_ALIGN_CENTER", "x": 0, "y": 0}
            ],
            "text_font": "font.bin"
        });
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assets.bin");
        package(manifest).write_to(&path).unwrap();

        let mut session = session();
        let report = load_assets(&mut session, &AssetSource::Path(path), &PartitionTable::new()).unwrap();

        assert_eq!(report.emojis, 1);
        assert_eq!(report.icons, 1);
        assert_eq!(report.layouts_applied, 2);
        assert!(report.font_loaded);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].section, Section::Emoji);
        assert_eq!(report.skipped[1].name, "status_icon");

        let record = session.emoji.get("happy").unwrap();
        assert_eq!((record.fps, record.looping), (24, true));

        // boot hand-off shows the boot message in the toast
        let toast = session.objects.object(Element::ToastLabel).unwrap();
        let state = session.engine.object(toast).unwrap();
        assert_eq!(state.label.text, "Hi");
        assert!(matches!(state.label.font, Some(FontRef::Loaded(_))));
        assert!(session.caches.slot(CacheKind::Font).is_occupied());
    }

    #[test]
    fn test_missing_manifest() {
        let mut builder = ContainerBuilder::new();
        builder.add("happy.eaf", vec![1; 8]).unwrap();
        let partitions = PartitionTable::new();
        partitions.register("assets", builder.build().unwrap());

        let mut session = session();
        let err = load_assets(&mut session, &AssetSource::Partition("assets".into()), &partitions)
            .unwrap_err();
        assert!(matches!(err, EmoteError::AssetNotFound(_)));
        assert!(session.assets.is_none());
        assert_eq!(session.engine.object_count(), 0);
    }

    #[test]
    fn test_malformed_manifest() {
        let mut builder = ContainerBuilder::new();
        builder.add(MANIFEST_FILENAME, b"{\"layout\": [".to_vec()).unwrap();
        let partitions = PartitionTable::new();
        partitions.register("assets", builder.build().unwrap());

        let mut session = session();
        let err = load_assets(&mut session, &AssetSource::Partition("assets".into()), &partitions)
            .unwrap_err();
        assert!(matches!(err, EmoteError::Parse(_)));
        assert!(session.emoji.is_empty());
    }

    #[test]
    fn test_mistyped_optional_fields_keep_entries() {
        let manifest = json!({
            "emoji_collection": [{"name": "happy", "file": "happy.eaf", "eaf": {"loop": 1}}],
            "layout": [{
                "type": "label", "name": "toast_label", "align": "GFX_ALIGN_TOP_MID", "x": 0, "y": 40,
                "width": -1, "label": {"color": "white"}
            }],
            "text_font": 5
        });
        let partitions = PartitionTable::new();
        partitions.register("assets", package(manifest).build().unwrap());

        let mut session = session();
        let report =
            load_assets(&mut session, &AssetSource::Partition("assets".into()), &partitions).unwrap();
        assert_eq!(report.emojis, 1);
        assert_eq!(report.layouts_applied, 1);
        assert!(!report.font_loaded);
        assert!(report.skipped.is_empty());
        assert!(!session.emoji.get("happy").unwrap().looping);
        let toast = session.objects.object(Element::ToastLabel).unwrap();
        assert_eq!(
            session.engine.object(toast).unwrap().label.color,
            crate::scene::engine::Color::hex(crate::assets::defaults::DEFAULT_FONT_COLOR)
        );
        assert_eq!(session.engine.font_count(), 0);
    }

    #[test]
    fn test_missing_font_is_skipped() {
        let manifest = json!({"text_font": "nope.bin"});
        let partitions = PartitionTable::new();
        partitions.register("assets", package(manifest).build().unwrap());

        let mut session = session();
        let report =
            load_assets(&mut session, &AssetSource::Partition("assets".into()), &partitions).unwrap();
        assert!(!report.font_loaded);
        assert_eq!(report.skipped[0].section, Section::Font);
        assert_eq!(session.engine.font_count(), 0);
    }
}
