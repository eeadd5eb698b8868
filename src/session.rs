// src/session.rs
// State guarded by the engine lock: engine, scene slots, asset stores, cache slots

use log::{debug, info};
use std::sync::Arc;

use crate::assets::cache::{CacheKind, CacheSlots};
use crate::assets::container::Container;
use crate::assets::store::{EmojiStore, IconStore};
use crate::dialog::DialogTimer;
use crate::events::RuntimeStatus;
use crate::scene::engine::{Engine, FontId};
use crate::scene::objects::{Element, SceneObjects};
use crate::signal::Completion;

/// Everything one `Emote` owns behind its lock
#[derive(Debug)]
pub struct Session<E: Engine> {
    pub(crate) engine: E,
    pub(crate) objects: SceneObjects,
    pub(crate) emoji: EmojiStore,
    pub(crate) icons: IconStore,
    pub(crate) caches: CacheSlots,
    pub(crate) assets: Option<Arc<Container>>,
    pub(crate) boot: Option<Arc<Container>>,
    pub(crate) font: Option<FontId>,
    pub(crate) status: RuntimeStatus,
    pub(crate) dialog: DialogTimer,
    pub(crate) boot_done: Arc<Completion>,
    pub(crate) dialog_done: Arc<Completion>,
    pub(crate) boot_message: Option<String>,
    initialized: bool,
}

impl<E: Engine> Session<E> {
    /// Wrap an engine that has already been initialized
    pub(crate) fn new(engine: E, boot_message: Option<String>) -> Self {
        Session {
            engine,
            objects: SceneObjects::new(),
            emoji: EmojiStore::new("emoji"),
            icons: IconStore::new("icon"),
            caches: CacheSlots::new(),
            assets: None,
            boot: None,
            font: None,
            status: RuntimeStatus::default(),
            dialog: DialogTimer::default(),
            boot_done: Arc::new(Completion::new()),
            dialog_done: Arc::new(Completion::new()),
            boot_message,
            initialized: true,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn objects(&self) -> &SceneObjects {
        &self.objects
    }

    pub fn emoji(&self) -> &EmojiStore {
        &self.emoji
    }

    pub fn icons(&self) -> &IconStore {
        &self.icons
    }

    pub fn caches(&self) -> &CacheSlots {
        &self.caches
    }

    pub fn status(&self) -> RuntimeStatus {
        self.status
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drop the loaded asset package: dialog, non-boot scene objects, cache
    /// buffers (boot excepted), font, stores and container
    pub(crate) fn unload_assets(&mut self) {
        self.stop_dialog();
        let deleted = self
            .objects
            .delete_all_except(&mut self.engine, &[Element::BootAnim]);
        let released = self.caches.release_all_except(CacheKind::BootAnim);
        if let Some(font) = self.font.take() {
            self.engine.font_delete(font);
        }
        self.emoji = EmojiStore::new("emoji");
        self.icons = IconStore::new("icon");
        self.assets = None;
        debug!("🧹 Unloaded assets: {deleted} objects deleted, {released} buffers released");
    }

    /// Ordered release of every resource; safe to call more than once
    pub(crate) fn teardown(&mut self) {
        if !self.initialized {
            return;
        }
        self.stop_dialog();
        self.dialog_done.disarm();
        self.boot_done.disarm();

        let deleted = self.objects.delete_all(&mut self.engine);
        self.engine.deinit();

        let released = self.caches.release_all();
        if let Some(font) = self.font.take() {
            self.engine.font_delete(font);
        }
        self.emoji = EmojiStore::new("emoji");
        self.icons = IconStore::new("icon");
        self.assets = None;
        self.boot = None;
        self.initialized = false;
        info!("👋 Emote torn down ({deleted} objects, {released} buffers)");
    }
}
