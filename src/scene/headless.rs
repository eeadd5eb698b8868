// src/scene/headless.rs
// In-memory engine: keeps every object's state, runs timers and animations on advance()

use log::{debug, trace};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use super::engine::{
    Align, AnimSegment, Area, Color, Engine, EngineEvent, FontId, FontRef, GfxConfig,
    ImageDescriptor, ImageHeader, LongMode, ObjectId, ObjectKind, Repeat, TextAlign, TimerId,
};
use crate::assets::cache::AssetBuffer;
use crate::exceptions::{EmoteError, Result};

/// Frames assumed per animation when nothing else is known
pub const DEFAULT_HEADLESS_FRAMES: u32 = 30;

#[derive(Debug, Clone, Default)]
pub struct AnimState {
    pub src_len: usize,
    pub segment: Option<AnimSegment>,
    pub playing: bool,
    pub auto_mirror: bool,
    elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct LabelState {
    pub text: String,
    pub color: Color,
    pub text_align: TextAlign,
    pub long_mode: LongMode,
    pub scroll_speed: u32,
    pub scroll_loop: bool,
    pub snap_loop: bool,
    pub snap_interval: u32,
    pub font: Option<FontRef>,
}

/// Snapshot of one engine object
#[derive(Debug, Clone)]
pub struct ObjectState {
    pub kind: ObjectKind,
    pub visible: bool,
    pub align: Option<(Align, i32, i32)>,
    pub pos: (i32, i32),
    pub size: Option<(u32, u32)>,
    pub anim: AnimState,
    pub label: LabelState,
    pub image: Option<ImageHeader>,
    pub qrcode_data: Option<String>,
    pub qrcode_size: Option<u32>,
}

impl ObjectState {
    fn new(kind: ObjectKind) -> Self {
        ObjectState {
            kind,
            visible: true,
            align: None,
            pos: (0, 0),
            size: None,
            anim: AnimState::default(),
            label: LabelState::default(),
            image: None,
            qrcode_data: None,
            qrcode_size: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimerState {
    pub period_ms: u32,
    pub repeat: Repeat,
    pub running: bool,
    pub fired: u64,
    elapsed: Duration,
}

/// Engine implementation without a display, for tests and host simulation
#[derive(Debug)]
pub struct HeadlessEngine {
    config: Option<GfxConfig>,
    objects: BTreeMap<ObjectId, ObjectState>,
    timers: BTreeMap<TimerId, TimerState>,
    fonts: HashSet<FontId>,
    next_id: u32,
    bg_color: Color,
    frames_per_anim: u32,
    supports_qrcode: bool,
    fail_init: bool,
    dirty: bool,
    awaiting_flush: bool,
    flushes: u64,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    pub fn new() -> Self {
        HeadlessEngine {
            config: None,
            objects: BTreeMap::new(),
            timers: BTreeMap::new(),
            fonts: HashSet::new(),
            next_id: 1,
            bg_color: Color::BLACK,
            frames_per_anim: DEFAULT_HEADLESS_FRAMES,
            supports_qrcode: true,
            fail_init: false,
            dirty: false,
            awaiting_flush: false,
            flushes: 0,
        }
    }

    /// Frames a non-looping animation plays before completing
    pub fn with_frames_per_anim(mut self, frames: u32) -> Self {
        self.frames_per_anim = frames.max(1);
        self
    }

    /// Simulate an engine without QR code rendering
    pub fn without_qrcode(mut self) -> Self {
        self.supports_qrcode = false;
        self
    }

    /// Make `init` fail, as a refusing engine would
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn object(&self, id: ObjectId) -> Option<&ObjectState> {
        self.objects.get(&id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn timer(&self, id: TimerId) -> Option<&TimerState> {
        self.timers.get(&id)
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn bg_color(&self) -> Color {
        self.bg_color
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    fn next_handle(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn with_object(&mut self, id: ObjectId, f: impl FnOnce(&mut ObjectState)) {
        if let Some(object) = self.objects.get_mut(&id) {
            f(object);
            self.dirty = true;
        } else {
            trace!("👻 Ignoring update to unknown object {:?}", id);
        }
    }

    fn with_timer(&mut self, id: TimerId, f: impl FnOnce(&mut TimerState)) {
        if let Some(timer) = self.timers.get_mut(&id) {
            f(timer);
        }
    }

    fn full_area(&self) -> Area {
        let (w, h) = self
            .config
            .map(|c| (c.h_res as i32, c.v_res as i32))
            .unwrap_or((0, 0));
        Area {
            x1: 0,
            y1: 0,
            x2: w - 1,
            y2: h - 1,
        }
    }

    fn advance_timers(&mut self, elapsed: Duration, events: &mut Vec<EngineEvent>) {
        for (id, timer) in &mut self.timers {
            if !timer.running || timer.period_ms == 0 {
                continue;
            }
            let period = Duration::from_millis(u64::from(timer.period_ms));
            timer.elapsed += elapsed;
            while timer.running && timer.elapsed >= period {
                timer.elapsed -= period;
                timer.fired += 1;
                events.push(EngineEvent::TimerFired(*id));
                if let Repeat::Times(left) = timer.repeat {
                    let left = left.saturating_sub(1);
                    timer.repeat = Repeat::Times(left);
                    if left == 0 {
                        timer.running = false;
                    }
                }
            }
        }
    }

    fn advance_animations(&mut self, elapsed: Duration, events: &mut Vec<EngineEvent>) {
        let frames = u64::from(self.frames_per_anim);
        for (id, object) in &mut self.objects {
            let anim = &mut object.anim;
            let Some(segment) = anim.segment else { continue };
            if !anim.playing || segment.looping || !object.visible {
                continue;
            }
            let fps = u64::from(segment.fps.max(1));
            let duration = Duration::from_millis(frames * 1000 / fps);
            anim.elapsed += elapsed;
            if anim.elapsed >= duration {
                anim.playing = false;
                events.push(EngineEvent::AllFramesDone(*id));
            }
            self.dirty = true;
        }
    }
}

impl Engine for HeadlessEngine {
    fn init(&mut self, config: &GfxConfig) -> Result<()> {
        if self.fail_init {
            return Err(EmoteError::Engine("headless engine configured to refuse init".into()));
        }
        debug!("🖥️ Headless engine {}x{} @ {} fps", config.h_res, config.v_res, config.fps);
        self.config = Some(*config);
        Ok(())
    }

    fn deinit(&mut self) {
        debug!(
            "🖥️ Headless engine deinit ({} objects, {} timers left)",
            self.objects.len(),
            self.timers.len()
        );
        self.objects.clear();
        self.timers.clear();
        self.config = None;
    }

    fn create_object(&mut self, kind: ObjectKind) -> Result<Option<ObjectId>> {
        if self.config.is_none() {
            return Err(EmoteError::Engine("engine not initialized".into()));
        }
        if kind == ObjectKind::QrCode && !self.supports_qrcode {
            return Ok(None);
        }
        let id = ObjectId(self.next_handle());
        self.objects.insert(id, ObjectState::new(kind));
        self.dirty = true;
        Ok(Some(id))
    }

    fn delete_object(&mut self, id: ObjectId) {
        if self.objects.remove(&id).is_some() {
            self.dirty = true;
        }
    }

    fn set_visible(&mut self, id: ObjectId, visible: bool) {
        self.with_object(id, |o| o.visible = visible);
    }

    fn is_visible(&self, id: ObjectId) -> bool {
        self.objects.get(&id).is_some_and(|o| o.visible)
    }

    fn set_pos(&mut self, id: ObjectId, x: i32, y: i32) {
        self.with_object(id, |o| o.pos = (x, y));
    }

    fn align(&mut self, id: ObjectId, align: Align, x: i32, y: i32) {
        self.with_object(id, |o| o.align = Some((align, x, y)));
    }

    fn set_size(&mut self, id: ObjectId, width: u32, height: u32) {
        self.with_object(id, |o| o.size = Some((width, height)));
    }

    fn set_bg_color(&mut self, color: Color) {
        self.bg_color = color;
        self.dirty = true;
    }

    fn anim_set_src(&mut self, id: ObjectId, data: AssetBuffer) {
        self.with_object(id, |o| {
            o.anim.src_len = data.len();
            o.anim.playing = false;
            o.anim.elapsed = Duration::ZERO;
        });
    }

    fn anim_set_segment(&mut self, id: ObjectId, segment: AnimSegment) {
        self.with_object(id, |o| o.anim.segment = Some(segment));
    }

    fn anim_start(&mut self, id: ObjectId) {
        self.with_object(id, |o| {
            o.anim.playing = true;
            o.anim.elapsed = Duration::ZERO;
        });
    }

    fn anim_set_auto_mirror(&mut self, id: ObjectId, enabled: bool) {
        self.with_object(id, |o| o.anim.auto_mirror = enabled);
    }

    fn img_set_src(&mut self, id: ObjectId, image: ImageDescriptor) {
        self.with_object(id, |o| o.image = Some(image.header));
    }

    fn label_set_text(&mut self, id: ObjectId, text: &str) {
        self.with_object(id, |o| o.label.text = text.to_string());
    }

    fn label_set_color(&mut self, id: ObjectId, color: Color) {
        self.with_object(id, |o| o.label.color = color);
    }

    fn label_set_text_align(&mut self, id: ObjectId, align: TextAlign) {
        self.with_object(id, |o| o.label.text_align = align);
    }

    fn label_set_long_mode(&mut self, id: ObjectId, mode: LongMode) {
        self.with_object(id, |o| o.label.long_mode = mode);
    }

    fn label_set_scroll_speed(&mut self, id: ObjectId, speed: u32) {
        self.with_object(id, |o| o.label.scroll_speed = speed);
    }

    fn label_set_scroll_loop(&mut self, id: ObjectId, looping: bool) {
        self.with_object(id, |o| o.label.scroll_loop = looping);
    }

    fn label_set_snap_loop(&mut self, id: ObjectId, looping: bool) {
        self.with_object(id, |o| o.label.snap_loop = looping);
    }

    fn label_set_snap_interval(&mut self, id: ObjectId, interval_ms: u32) {
        self.with_object(id, |o| o.label.snap_interval = interval_ms);
    }

    fn label_set_font(&mut self, id: ObjectId, font: FontRef) {
        self.with_object(id, |o| o.label.font = Some(font));
    }

    fn qrcode_set_data(&mut self, id: ObjectId, text: &str) {
        self.with_object(id, |o| o.qrcode_data = Some(text.to_string()));
    }

    fn qrcode_set_size(&mut self, id: ObjectId, size: u32) {
        self.with_object(id, |o| o.qrcode_size = Some(size));
    }

    fn font_load(&mut self, data: AssetBuffer) -> Result<FontId> {
        if data.is_empty() {
            return Err(EmoteError::Engine("empty font data".into()));
        }
        let id = FontId(self.next_handle());
        self.fonts.insert(id);
        Ok(id)
    }

    fn font_delete(&mut self, font: FontId) {
        self.fonts.remove(&font);
    }

    fn timer_create(&mut self, period_ms: u32) -> Result<TimerId> {
        if self.config.is_none() {
            return Err(EmoteError::Engine("engine not initialized".into()));
        }
        let id = TimerId(self.next_handle());
        self.timers.insert(
            id,
            TimerState {
                period_ms,
                repeat: Repeat::Indefinite,
                running: true,
                fired: 0,
                elapsed: Duration::ZERO,
            },
        );
        Ok(id)
    }

    fn timer_delete(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }

    fn timer_pause(&mut self, timer: TimerId) {
        self.with_timer(timer, |t| t.running = false);
    }

    fn timer_resume(&mut self, timer: TimerId) {
        self.with_timer(timer, |t| {
            if t.repeat != Repeat::Times(0) {
                t.running = true;
            }
        });
    }

    fn timer_is_running(&self, timer: TimerId) -> bool {
        self.timers.get(&timer).is_some_and(|t| t.running)
    }

    fn timer_set_period(&mut self, timer: TimerId, period_ms: u32) {
        self.with_timer(timer, |t| {
            t.period_ms = period_ms;
            t.elapsed = Duration::ZERO;
        });
    }

    fn timer_set_repeat(&mut self, timer: TimerId, repeat: Repeat) {
        self.with_timer(timer, |t| t.repeat = repeat);
    }

    fn flush_ready(&mut self) {
        self.awaiting_flush = false;
    }

    fn advance(&mut self, elapsed: Duration) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.config.is_none() {
            return events;
        }
        self.advance_timers(elapsed, &mut events);
        self.advance_animations(elapsed, &mut events);

        if self.dirty && !self.awaiting_flush {
            self.dirty = false;
            self.awaiting_flush = true;
            self.flushes += 1;
            events.push(EngineEvent::Flush {
                area: self.full_area(),
                data: Vec::new(),
            });
        }
        events
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> HeadlessEngine {
        let mut engine = HeadlessEngine::new().with_frames_per_anim(10);
        engine
            .init(&GfxConfig {
                h_res: 100,
                v_res: 50,
                fps: 10,
                buf_pixels: 100,
                swap: false,
                double_buffer: false,
                buff_dma: false,
            })
            .unwrap();
        engine
    }

    #[test]
    fn test_one_shot_timer_fires_once() {
        let mut engine = engine();
        let timer = engine.timer_create(500).unwrap();
        engine.timer_set_repeat(timer, Repeat::Times(1));

        let events = engine.advance(Duration::from_millis(1600));
        let fired = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::TimerFired(_)))
            .count();
        assert_eq!(fired, 1);
        assert!(!engine.timer_is_running(timer));
        assert_eq!(engine.timer(timer).map(|t| t.fired), Some(1));
    }

    #[test]
    fn test_paused_timer_is_silent() {
        let mut engine = engine();
        let timer = engine.timer_create(100).unwrap();
        engine.timer_pause(timer);
        assert!(engine.advance(Duration::from_secs(1)).iter().all(|e| !matches!(e, EngineEvent::TimerFired(_))));
        engine.timer_resume(timer);
        assert!(engine.advance(Duration::from_millis(250)).contains(&EngineEvent::TimerFired(timer)));
    }

    #[test]
    fn test_animation_completes_and_flush_waits() {
        let mut engine = engine();
        let id = engine.create_object(ObjectKind::Animation).unwrap().unwrap();
        engine.anim_set_src(id, AssetBuffer::owned(vec![0; 8]));
        engine.anim_set_segment(id, AnimSegment { start: 0, end: 0xFFFF, fps: 10, looping: false });
        engine.anim_start(id);

        let events = engine.advance(Duration::from_millis(500));
        assert!(!events.contains(&EngineEvent::AllFramesDone(id)));
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Flush { .. })));

        // No second flush until the first is acknowledged
        let events = engine.advance(Duration::from_millis(600));
        assert!(events.contains(&EngineEvent::AllFramesDone(id)));
        assert!(!events.iter().any(|e| matches!(e, EngineEvent::Flush { .. })));

        engine.flush_ready();
        engine.set_visible(id, false);
        assert!(engine.advance(Duration::from_millis(10)).iter().any(|e| matches!(e, EngineEvent::Flush { .. })));
        assert_eq!(engine.flush_count(), 2);
    }

    #[test]
    fn test_qrcode_unsupported() {
        let mut engine = HeadlessEngine::new().without_qrcode();
        engine
            .init(&GfxConfig { h_res: 1, v_res: 1, fps: 1, buf_pixels: 1, swap: false, double_buffer: false, buff_dma: false })
            .unwrap();
        assert_eq!(engine.create_object(ObjectKind::QrCode).unwrap(), None);
        assert!(engine.create_object(ObjectKind::Label).unwrap().is_some());
    }
}
