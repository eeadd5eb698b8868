// src/emote.rs
// Session handle: lifecycle, public operations and the render loop

use log::{debug, error, info, trace, warn};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::assets::cache::CacheKind;
use crate::assets::container::{AssetSource, Container};
use crate::assets::defaults::{BOOT_BG_COLOR, DEFAULT_ANIM_FPS, ANIM_SEGMENT_END};
use crate::assets::loader::{LoadReport, open_asset_container};
use crate::assets::partition::PartitionTable;
use crate::assets::store::AssetData;
use crate::config::EmoteConfig;
use crate::events::{EmoteEvent, RuntimeStatus};
use crate::exceptions::{EmoteError, Result};
use crate::scene::engine::{
    Align, AnimSegment, Area, Color, Engine, EngineEvent, GfxConfig, ObjectId, ObjectKind,
};
use crate::scene::objects::Element;
use crate::session::Session;
use crate::signal::{Completion, DialogWait};

/// A region the engine finished composing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushRegion {
    pub area: Area,
    pub data: Vec<u8>,
}

/// Notifications delivered through the update callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEvent {
    /// A non-looping animation in `element` played its last frame
    AllFramesDone(Element),
    BootAnimationDone,
    /// The dialog timer expired and the dialog was taken down
    DialogExpired,
}

/// Handed to the flush callback; acknowledging lets the engine compose the
/// next frame. Safe to call from inside the callback.
#[derive(Debug, Clone)]
pub struct FlushNotifier {
    ready: Arc<AtomicBool>,
}

impl FlushNotifier {
    pub fn notify(&self) {
        self.ready.store(true, Ordering::Release);
    }
}

pub type FlushCallback = Box<dyn Fn(&FlushRegion, &FlushNotifier) + Send + Sync>;
pub type UpdateCallback = Box<dyn Fn(UpdateEvent) + Send + Sync>;

/// Caller hooks. Both run outside the engine lock.
#[derive(Default)]
pub struct Callbacks {
    pub flush: Option<FlushCallback>,
    pub update: Option<UpdateCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_flush(
        mut self,
        f: impl Fn(&FlushRegion, &FlushNotifier) + Send + Sync + 'static,
    ) -> Self {
        self.flush = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(UpdateEvent) + Send + Sync + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("flush", &self.flush.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}

// Host threads need more room than the configured device task stack
const MIN_RENDER_STACK: usize = 256 * 1024;

fn gfx_config(config: &EmoteConfig) -> GfxConfig {
    GfxConfig {
        h_res: config.display.h_res,
        v_res: config.display.v_res,
        fps: config.display.fps,
        buf_pixels: config.buffers.buf_pixels,
        swap: config.flags.swap,
        double_buffer: config.flags.double_buffer,
        buff_dma: config.flags.buff_dma,
    }
}

struct Shared<E: Engine> {
    session: Mutex<Session<E>>,
    callbacks: Callbacks,
    partitions: PartitionTable,
    flush_ready: Arc<AtomicBool>,
    render_running: AtomicBool,
    config: EmoteConfig,
}

impl<E: Engine> Shared<E> {
    fn lock(&self) -> Result<MutexGuard<'_, Session<E>>> {
        let session = self.session.lock();
        if !session.is_initialized() {
            return Err(EmoteError::NotInitialized);
        }
        Ok(session)
    }

    /// Advance the engine, route its events, then run callbacks unlocked
    fn tick(&self, elapsed: Duration) -> Result<()> {
        let (flushes, updates) = {
            let mut session = self.lock()?;
            if self.flush_ready.swap(false, Ordering::AcqRel) {
                session.engine.flush_ready();
            }
            let events = session.engine.advance(elapsed);
            session.route_engine_events(events)
        };

        let notifier = FlushNotifier {
            ready: Arc::clone(&self.flush_ready),
        };
        for region in &flushes {
            match &self.callbacks.flush {
                Some(flush) => flush(region, &notifier),
                None => notifier.notify(),
            }
        }
        if let Some(update) = &self.callbacks.update {
            for event in updates {
                update(event);
            }
        }
        Ok(())
    }
}

impl<E: Engine> Session<E> {
    fn route_engine_events(&mut self, events: Vec<EngineEvent>) -> (Vec<FlushRegion>, Vec<UpdateEvent>) {
        let mut flushes = Vec::new();
        let mut updates = Vec::new();
        for event in events {
            match event {
                EngineEvent::TimerFired(timer) => {
                    if self.on_dialog_timer(timer) {
                        updates.push(UpdateEvent::DialogExpired);
                    } else if self.objects.timer(Element::StatusTimer) == Some(timer) {
                        self.refresh_status();
                    }
                }
                EngineEvent::AllFramesDone(id) => {
                    let Some(element) = self.objects.element_of(id) else {
                        continue;
                    };
                    match element {
                        Element::BootAnim => {
                            self.boot_done.fire();
                            updates.push(UpdateEvent::BootAnimationDone);
                        }
                        Element::EmergencyDialog => {
                            self.dialog_done.fire();
                        }
                        _ => {}
                    }
                    updates.push(UpdateEvent::AllFramesDone(element));
                }
                EngineEvent::Flush { area, data } => flushes.push(FlushRegion { area, data }),
            }
        }
        (flushes, updates)
    }

    fn refresh_status(&mut self) {
        trace!("🕒 Status refresh");
        if let Err(e) = self.set_label_clock() {
            debug!("⚠️ Clock refresh failed: {e}");
        }
        if let Err(e) = self.set_bat_status() {
            debug!("⚠️ Battery refresh failed: {e}");
        }
    }

    fn play_boot_anim(&mut self, container: Arc<Container>) -> Result<()> {
        let entry = container
            .entries()
            .first()
            .ok_or_else(|| EmoteError::AssetNotFound(format!("boot animation in {}", container.source())))?;
        if entry.size == 0 {
            return Err(EmoteError::AssetNotFound(format!(
                "boot animation '{}' is empty",
                entry.name
            )));
        }
        let data = AssetData::new(Arc::clone(&container), container.asset_ref(entry));
        let name = entry.name.clone();

        let buffer = self.caches.acquire(CacheKind::BootAnim, &data)?;
        let id = self.object_for(Element::BootAnim)?;
        self.engine.set_bg_color(Color::hex(BOOT_BG_COLOR));
        self.engine.align(id, Align::Center, 0, 0);
        self.engine.anim_set_src(id, buffer);
        self.engine.anim_set_segment(
            id,
            AnimSegment {
                start: 0,
                end: ANIM_SEGMENT_END,
                fps: DEFAULT_ANIM_FPS,
                looping: false,
            },
        );
        self.engine.anim_start(id);
        self.engine.set_visible(id, true);

        self.boot = Some(container);
        self.boot_done.arm();
        info!("🚀 Boot animation '{name}' started");
        Ok(())
    }

    fn delete_boot_anim(&mut self) {
        self.objects.delete(&mut self.engine, Element::BootAnim);
        self.caches.release(CacheKind::BootAnim);
        self.boot = None;
        debug!("🗑️ Boot animation deleted");
    }
}

/// An initialized emote session. Clones of the inner state are held by the
/// render task; everything is released on `deinit` or drop.
pub struct Emote<E: Engine> {
    shared: Arc<Shared<E>>,
}

impl<E: Engine> fmt::Debug for Emote<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emote")
            .field("config", &self.shared.config)
            .field("callbacks", &self.shared.callbacks)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Emote<E> {
    /// Validate `config`, bring the engine up, and wrap it in a session.
    /// Nothing is kept when any step fails.
    pub fn init(config: EmoteConfig, mut engine: E, callbacks: Callbacks) -> Result<Self> {
        config.validate()?;
        engine.init(&gfx_config(&config))?;
        info!(
            "✨ Emote initialized: {}x{} @ {} fps",
            config.display.h_res, config.display.v_res, config.display.fps
        );
        let session = Session::new(engine, config.boot_message.clone());
        Ok(Emote {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                callbacks,
                partitions: PartitionTable::new(),
                flush_ready: Arc::new(AtomicBool::new(false)),
                render_running: AtomicBool::new(false),
                config,
            }),
        })
    }

    pub fn config(&self) -> &EmoteConfig {
        &self.shared.config
    }

    /// Storage regions addressable through `AssetSource::Partition`
    pub fn partitions(&self) -> &PartitionTable {
        &self.shared.partitions
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.session.lock().is_initialized()
    }

    /// Ordered teardown. Later calls and operations report `NotInitialized`.
    pub fn deinit(&self) {
        self.shared.session.lock().teardown();
    }

    // =================================
    // Boot animation
    // =================================

    /// Play the first entry of `source` as the boot animation
    pub fn load_boot_anim_from_source(&self, source: &AssetSource) -> Result<()> {
        let container = Arc::new(Container::open(source, &self.shared.partitions)?);
        self.shared.lock()?.play_boot_anim(container)
    }

    /// Block until the boot animation has played through
    pub fn wait_boot_anim_stop(&self, delete: bool) -> Result<()> {
        self.wait_boot(None, delete).map(|_| ())
    }

    /// Like `wait_boot_anim_stop`; returns false when `timeout` elapsed first
    pub fn wait_boot_anim_stop_timeout(&self, timeout: Duration, delete: bool) -> Result<bool> {
        self.wait_boot(Some(timeout), delete)
    }

    fn wait_boot(&self, timeout: Option<Duration>, delete: bool) -> Result<bool> {
        let signal: Arc<Completion> = Arc::clone(&self.shared.lock()?.boot_done);
        match signal.wait(timeout) {
            DialogWait::Done => {
                if delete {
                    self.shared.lock()?.delete_boot_anim();
                }
                Ok(true)
            }
            DialogWait::TimedOut => Ok(false),
            DialogWait::NotArmed => Err(EmoteError::AssetNotFound("no boot animation loaded".into())),
        }
    }

    // =================================
    // Assets
    // =================================

    /// Load an asset package. The container is opened and checked before
    /// the engine lock is taken.
    pub fn load_assets_from_source(&self, source: &AssetSource) -> Result<LoadReport> {
        let container = open_asset_container(source, &self.shared.partitions)?;
        self.shared.lock()?.install_assets(container)
    }

    pub fn unload_assets(&self) -> Result<()> {
        self.shared.lock()?.unload_assets();
        Ok(())
    }

    // =================================
    // Scene operations
    // =================================

    /// Mood animation in the eye slot
    pub fn set_anim_emoji(&self, name: &str) -> Result<()> {
        self.shared
            .lock()?
            .set_emoji_animation(Element::EyeAnim, CacheKind::MoodAnim, name, false)
    }

    /// Dialog animation without a timer; hides the eye
    pub fn set_dialog_anim(&self, name: &str) -> Result<()> {
        self.shared
            .lock()?
            .set_emoji_animation(Element::EmergencyDialog, CacheKind::DialogAnim, name, true)
    }

    pub fn set_qrcode_data(&self, text: &str) -> Result<()> {
        self.shared.lock()?.set_qrcode_data(text)
    }

    pub fn insert_anim_dialog(&self, name: &str, duration: Duration) -> Result<()> {
        self.shared.lock()?.insert_dialog(name, duration)
    }

    pub fn stop_anim_dialog(&self) -> Result<()> {
        self.shared.lock()?.stop_dialog();
        Ok(())
    }

    /// Wait for the dialog animation to play through. `NotArmed` when no
    /// dialog has been inserted since the last completion was consumed.
    pub fn wait_dialog_done(&self, timeout: Duration) -> Result<DialogWait> {
        let signal: Arc<Completion> = Arc::clone(&self.shared.lock()?.dialog_done);
        Ok(signal.wait(Some(timeout)))
    }

    pub fn set_event(&self, event: EmoteEvent, message: Option<&str>) -> Result<()> {
        self.shared.lock()?.dispatch(event, message)
    }

    /// Dispatch by event name (`evt_idle`, `evt_bat`, ...)
    pub fn set_event_msg(&self, name: &str, message: Option<&str>) -> Result<()> {
        self.shared.lock()?.dispatch_named(name, message)
    }

    pub fn battery_status(&self) -> Result<RuntimeStatus> {
        Ok(self.shared.lock()?.status())
    }

    pub fn create_custom_object(&self, name: &str, kind: ObjectKind) -> Result<ObjectId> {
        let mut session = self.shared.lock()?;
        let session = &mut *session;
        session.objects.create_custom(&mut session.engine, name, kind)
    }

    /// Run `f` on a built-in or custom object under the engine lock
    pub fn with_object<R>(&self, name: &str, f: impl FnOnce(&mut E, ObjectId) -> R) -> Result<R> {
        let mut session = self.shared.lock()?;
        let id = session
            .objects
            .object_by_name(name)
            .ok_or_else(|| EmoteError::AssetNotFound(format!("object '{name}'")))?;
        Ok(f(&mut session.engine, id))
    }

    /// Read-only access to the session under the engine lock
    pub fn inspect<R>(&self, f: impl FnOnce(&Session<E>) -> R) -> Result<R> {
        let session = self.shared.lock()?;
        Ok(f(&session))
    }

    // =================================
    // Rendering
    // =================================

    /// Acknowledge the last flush region
    pub fn notify_flush_finished(&self) -> Result<()> {
        self.shared.lock()?.engine.flush_ready();
        Ok(())
    }

    /// Advance the engine by `elapsed`, delivering timer, frame and flush events
    pub fn tick(&self, elapsed: Duration) -> Result<()> {
        self.shared.tick(elapsed)
    }
}

impl<E: Engine + 'static> Emote<E> {
    /// Spawn a thread that ticks the engine at the configured frame rate.
    /// Only one render task runs per session.
    pub fn start_render_task(&self) -> Result<RenderTask> {
        if self
            .shared
            .render_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EmoteError::InvalidArgument("render task already running".into()));
        }

        let period = Duration::from_millis(1000 / u64::from(self.shared.config.display.fps.max(1)));
        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&self.shared);
        let stopping = Arc::clone(&stop);

        let spawned = thread::Builder::new()
            .name("emote-render".into())
            .stack_size(self.shared.config.task.stack.max(MIN_RENDER_STACK))
            .spawn(move || {
                debug!("🎬 Render task running every {period:?}");
                while !stopping.load(Ordering::Acquire) {
                    let started = Instant::now();
                    match shared.tick(period) {
                        Ok(()) => {}
                        Err(EmoteError::NotInitialized) => break,
                        Err(e) => warn!("⚠️ Render tick failed: {e}"),
                    }
                    thread::sleep(period.saturating_sub(started.elapsed()));
                }
                shared.render_running.store(false, Ordering::Release);
                debug!("🎬 Render task stopped");
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.render_running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        Ok(RenderTask {
            stop,
            handle: Some(handle),
        })
    }
}

impl<E: Engine> Drop for Emote<E> {
    fn drop(&mut self) {
        self.deinit();
    }
}

/// Background render loop; stopped and joined on drop
#[derive(Debug)]
pub struct RenderTask {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RenderTask {
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("❌ Render task panicked");
            }
        }
    }
}

impl Drop for RenderTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
