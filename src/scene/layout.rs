// src/scene/layout.rs
// Applies manifest layout entries to scene slots

use log::{debug, trace};

use super::engine::{Align, Color, Engine, LongMode, ObjectId, ObjectKind, Repeat, TextAlign};
use super::objects::{Element, SceneObjects, SlotKind};
use crate::assets::defaults::{
    DEFAULT_FONT_COLOR, DEFAULT_QRCODE_SIZE, DEFAULT_SCROLL_SPEED, DEFAULT_SNAP_INTERVAL_MS,
    DEFAULT_TIMER_PERIOD_MS, DEFAULT_TIMER_REPEAT, QRCODE_EYE_OFFSET_Y,
};
use crate::assets::manifest::{LayoutEntry, LayoutKind};
use crate::exceptions::{EmoteError, Result};

/// Resolved position of a layout entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub align: Align,
    pub x: i32,
    pub y: i32,
}

impl Placement {
    /// `align`, `x` and `y` are all required
    pub fn from_entry(entry: &LayoutEntry) -> Result<Self> {
        let missing = |field: &str| {
            EmoteError::InvalidArgument(format!("{}: missing {field}", entry.name))
        };
        let align = entry.align.as_deref().ok_or_else(|| missing("align"))?;
        let x = entry.x.ok_or_else(|| missing("x"))?;
        let y = entry.y.ok_or_else(|| missing("y"))?;
        Ok(Placement {
            align: Align::from_keyword(align),
            x,
            y,
        })
    }

    fn apply<E: Engine + ?Sized>(&self, engine: &mut E, id: ObjectId) {
        engine.align(id, self.align, self.x, self.y);
    }
}

fn expected_slot(kind: LayoutKind) -> SlotKind {
    match kind {
        LayoutKind::Anim => SlotKind::Object(ObjectKind::Animation),
        LayoutKind::Image => SlotKind::Object(ObjectKind::Image),
        LayoutKind::Label => SlotKind::Object(ObjectKind::Label),
        LayoutKind::Qrcode => SlotKind::Object(ObjectKind::QrCode),
        LayoutKind::Timer => SlotKind::Timer,
    }
}

fn require_object<E: Engine + ?Sized>(
    engine: &mut E,
    objects: &mut SceneObjects,
    element: Element,
) -> Result<ObjectId> {
    objects
        .ensure_object(engine, element)?
        .ok_or_else(|| EmoteError::Engine(format!("failed to create {element}")))
}

/// Apply one layout entry. Fails only this entry; the slot's object is
/// created (or reused) and left hidden.
pub fn apply_layout<E: Engine + ?Sized>(
    engine: &mut E,
    objects: &mut SceneObjects,
    entry: &LayoutEntry,
) -> Result<Element> {
    let element = Element::from_name(&entry.name).ok_or_else(|| {
        EmoteError::InvalidArgument(format!("unknown element '{}'", entry.name))
    })?;
    if element.slot_kind() != expected_slot(entry.kind) {
        return Err(EmoteError::InvalidArgument(format!(
            "{element} cannot take a {:?} layout",
            entry.kind
        )));
    }

    trace!("📐 Applying {:?} layout to {element}", entry.kind);
    match entry.kind {
        LayoutKind::Anim => apply_anim(engine, objects, element, entry)?,
        LayoutKind::Image => apply_image(engine, objects, element, entry)?,
        LayoutKind::Label => apply_label(engine, objects, element, entry)?,
        LayoutKind::Timer => apply_timer(engine, objects, element, entry)?,
        LayoutKind::Qrcode => apply_qrcode(engine, objects, element, entry)?,
    }
    Ok(element)
}

fn apply_anim<E: Engine + ?Sized>(
    engine: &mut E,
    objects: &mut SceneObjects,
    element: Element,
    entry: &LayoutEntry,
) -> Result<()> {
    let placement = Placement::from_entry(entry)?;
    let auto_mirror = entry.anim.as_ref().is_some_and(|anim| anim.auto_mirror());

    let id = require_object(engine, objects, element)?;
    placement.apply(engine, id);
    if auto_mirror {
        engine.anim_set_auto_mirror(id, true);
    }
    engine.set_visible(id, false);

    // The QR code sits over the eye area
    if element == Element::EyeAnim {
        if let Some(qrcode) = objects.ensure_object(engine, Element::QrCode)? {
            engine.align(qrcode, Align::Center, 0, QRCODE_EYE_OFFSET_Y);
            engine.set_visible(qrcode, false);
        }
    }
    Ok(())
}

fn apply_image<E: Engine + ?Sized>(
    engine: &mut E,
    objects: &mut SceneObjects,
    element: Element,
    entry: &LayoutEntry,
) -> Result<()> {
    let placement = Placement::from_entry(entry)?;
    let id = require_object(engine, objects, element)?;
    placement.apply(engine, id);
    engine.set_visible(id, false);
    Ok(())
}

fn apply_label<E: Engine + ?Sized>(
    engine: &mut E,
    objects: &mut SceneObjects,
    element: Element,
    entry: &LayoutEntry,
) -> Result<()> {
    let placement = Placement::from_entry(entry)?;
    let options = entry.label.clone().unwrap_or_default();
    let long_mode_options = options.long_mode.unwrap_or_default();

    let color = Color::hex(options.color.unwrap_or(DEFAULT_FONT_COLOR));
    let text_align = options
        .text_align
        .as_deref()
        .map_or(TextAlign::Center, TextAlign::from_keyword);
    let long_mode = long_mode_options
        .mode
        .as_deref()
        .map_or(LongMode::Clip, LongMode::from_keyword);
    let looping = long_mode_options.looping.unwrap_or(false);

    let id = require_object(engine, objects, element)?;
    placement.apply(engine, id);
    if let (Some(width), Some(height)) = (entry.width, entry.height) {
        if width > 0 && height > 0 {
            engine.set_size(id, width, height);
        }
    }
    engine.label_set_color(id, color);
    engine.label_set_text_align(id, text_align);
    engine.label_set_long_mode(id, long_mode);
    match long_mode {
        LongMode::Scroll => {
            engine.label_set_scroll_speed(id, long_mode_options.speed.unwrap_or(DEFAULT_SCROLL_SPEED));
            engine.label_set_scroll_loop(id, looping);
        }
        LongMode::Snap => {
            engine.label_set_snap_loop(id, looping);
            engine.label_set_snap_interval(
                id,
                long_mode_options.snap_interval.unwrap_or(DEFAULT_SNAP_INTERVAL_MS),
            );
        }
        LongMode::Wrap | LongMode::Clip => {}
    }
    engine.set_visible(id, false);
    Ok(())
}

fn apply_timer<E: Engine + ?Sized>(
    engine: &mut E,
    objects: &mut SceneObjects,
    element: Element,
    entry: &LayoutEntry,
) -> Result<()> {
    let options = entry.timer.ok_or_else(|| {
        EmoteError::InvalidArgument(format!("{}: missing timer object", entry.name))
    })?;
    let period = options.period.unwrap_or(DEFAULT_TIMER_PERIOD_MS);
    let repeat = Repeat::from_count(options.repeat_count.unwrap_or(DEFAULT_TIMER_REPEAT));

    objects.ensure(engine, element)?;
    let timer = objects
        .timer(element)
        .ok_or_else(|| EmoteError::Engine(format!("failed to create {element}")))?;
    engine.timer_set_repeat(timer, repeat);
    engine.timer_set_period(timer, period);
    engine.timer_pause(timer);
    Ok(())
}

fn apply_qrcode<E: Engine + ?Sized>(
    engine: &mut E,
    objects: &mut SceneObjects,
    element: Element,
    entry: &LayoutEntry,
) -> Result<()> {
    let placement = Placement::from_entry(entry)?;
    let Some(id) = objects.ensure_object(engine, element)? else {
        debug!("⚠️ QR code rendering unavailable, {} layout is a no-op", entry.name);
        return Ok(());
    };
    placement.apply(engine, id);
    engine.qrcode_set_size(id, DEFAULT_QRCODE_SIZE);
    engine.set_visible(id, false);
    Ok(())
}
