// src/scene/objects.rs
// Fixed scene slots, their engine objects, and per-slot creation defaults

use log::{debug, trace};
use std::collections::BTreeMap;
use std::fmt;

use super::engine::{
    Align, BuiltinFont, Color, Engine, FontRef, LongMode, ObjectId, ObjectKind, Repeat, TextAlign,
    TimerId,
};
use crate::assets::defaults::{
    DEFAULT_FONT_COLOR, DEFAULT_LABEL_HEIGHT, DEFAULT_LABEL_WIDTH, DEFAULT_LABEL_Y_OFFSET,
    DEFAULT_QRCODE_SIZE, DEFAULT_SCROLL_SPEED, DEFAULT_TIMER_PERIOD_MS,
};
use crate::exceptions::{EmoteError, Result};

/// The fixed set of named scene slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    BootAnim,
    EyeAnim,
    ListenAnim,
    EmergencyDialog,
    StatusIcon,
    ChargeIcon,
    ToastLabel,
    ClockLabel,
    BatteryLabel,
    QrCode,
    StatusTimer,
}

/// What backs a slot on the engine side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Object(ObjectKind),
    Timer,
}

impl Element {
    pub const ALL: [Element; 11] = [
        Element::BootAnim,
        Element::EyeAnim,
        Element::ListenAnim,
        Element::EmergencyDialog,
        Element::StatusIcon,
        Element::ChargeIcon,
        Element::ToastLabel,
        Element::ClockLabel,
        Element::BatteryLabel,
        Element::QrCode,
        Element::StatusTimer,
    ];

    /// Transient elements hidden before most events are handled
    pub const TRANSIENT: [Element; 7] = [
        Element::ListenAnim,
        Element::ClockLabel,
        Element::ToastLabel,
        Element::BatteryLabel,
        Element::ChargeIcon,
        Element::StatusIcon,
        Element::QrCode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Element::BootAnim => "boot_anim",
            Element::EyeAnim => "eye_anim",
            Element::ListenAnim => "listen_anim",
            Element::EmergencyDialog => "emerg_dlg",
            Element::StatusIcon => "status_icon",
            Element::ChargeIcon => "charge_icon",
            Element::ToastLabel => "toast_label",
            Element::ClockLabel => "clock_label",
            Element::BatteryLabel => "battery_label",
            Element::QrCode => "qrcode",
            Element::StatusTimer => "clock_timer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Element::ALL.into_iter().find(|element| element.name() == name)
    }

    pub fn slot_kind(self) -> SlotKind {
        match self {
            Element::BootAnim
            | Element::EyeAnim
            | Element::ListenAnim
            | Element::EmergencyDialog => SlotKind::Object(ObjectKind::Animation),
            Element::StatusIcon | Element::ChargeIcon => SlotKind::Object(ObjectKind::Image),
            Element::ToastLabel | Element::ClockLabel | Element::BatteryLabel => {
                SlotKind::Object(ObjectKind::Label)
            }
            Element::QrCode => SlotKind::Object(ObjectKind::QrCode),
            Element::StatusTimer => SlotKind::Timer,
        }
    }

    fn index(self) -> usize {
        match self {
            Element::BootAnim => 0,
            Element::EyeAnim => 1,
            Element::ListenAnim => 2,
            Element::EmergencyDialog => 3,
            Element::StatusIcon => 4,
            Element::ChargeIcon => 5,
            Element::ToastLabel => 6,
            Element::ClockLabel => 7,
            Element::BatteryLabel => 8,
            Element::QrCode => 9,
            Element::StatusTimer => 10,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine handle held by a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Object(ObjectId),
    Timer(TimerId),
}

/// Defaults applied to a label the first time it is created
fn configure_label<E: Engine + ?Sized>(engine: &mut E, id: ObjectId, font: BuiltinFont) {
    engine.align(id, Align::TopMid, 0, DEFAULT_LABEL_Y_OFFSET);
    engine.set_size(id, DEFAULT_LABEL_WIDTH, DEFAULT_LABEL_HEIGHT);
    engine.label_set_text(id, "");
    engine.label_set_color(id, Color::hex(DEFAULT_FONT_COLOR));
    engine.label_set_text_align(id, TextAlign::Center);
    engine.label_set_long_mode(id, LongMode::Scroll);
    engine.label_set_scroll_speed(id, DEFAULT_SCROLL_SPEED);
    engine.label_set_scroll_loop(id, true);
    engine.label_set_font(id, FontRef::Builtin(font));
    engine.set_visible(id, true);
}

/// Create an object of `kind` with the defaults used for built-in slots of
/// that kind. `label_font` only matters for labels.
fn create_configured<E: Engine + ?Sized>(
    engine: &mut E,
    kind: ObjectKind,
    label_font: BuiltinFont,
) -> Result<Option<ObjectId>> {
    let Some(id) = engine.create_object(kind)? else {
        return Ok(None);
    };
    match kind {
        ObjectKind::Animation => engine.set_pos(id, 0, 0),
        ObjectKind::Image => engine.set_visible(id, false),
        ObjectKind::Label => configure_label(engine, id, label_font),
        ObjectKind::QrCode => {
            engine.qrcode_set_size(id, DEFAULT_QRCODE_SIZE);
            engine.set_visible(id, false);
        }
    }
    Ok(Some(id))
}

/// Slot table: at most one live engine object per element, plus
/// caller-named custom objects
#[derive(Debug, Default)]
pub struct SceneObjects {
    slots: [Option<Handle>; 11],
    custom: BTreeMap<String, ObjectId>,
}

impl SceneObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, element: Element) -> Option<Handle> {
        self.slots[element.index()]
    }

    pub fn object(&self, element: Element) -> Option<ObjectId> {
        match self.get(element) {
            Some(Handle::Object(id)) => Some(id),
            _ => None,
        }
    }

    pub fn timer(&self, element: Element) -> Option<TimerId> {
        match self.get(element) {
            Some(Handle::Timer(id)) => Some(id),
            _ => None,
        }
    }

    pub fn contains(&self, element: Element) -> bool {
        self.get(element).is_some()
    }

    /// Which slot, if any, holds engine object `id`
    pub fn element_of(&self, id: ObjectId) -> Option<Element> {
        Element::ALL
            .into_iter()
            .find(|element| self.object(*element) == Some(id))
    }

    /// Return the slot's handle, creating and configuring it on first use.
    /// `Ok(None)` when the engine has no primitive for the slot.
    pub fn ensure<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        element: Element,
    ) -> Result<Option<Handle>> {
        if let Some(handle) = self.get(element) {
            trace!("♻️ Reusing {element}");
            return Ok(Some(handle));
        }

        let handle = match element.slot_kind() {
            SlotKind::Timer => {
                let timer = engine.timer_create(DEFAULT_TIMER_PERIOD_MS)?;
                engine.timer_set_repeat(timer, Repeat::Indefinite);
                Some(Handle::Timer(timer))
            }
            SlotKind::Object(kind) => {
                let font = if element == Element::BatteryLabel {
                    BuiltinFont::Book12
                } else {
                    BuiltinFont::Book26
                };
                create_configured(engine, kind, font)?.map(Handle::Object)
            }
        };

        match handle {
            Some(handle) => {
                debug!("✨ Created {element} ({handle:?})");
                self.slots[element.index()] = Some(handle);
            }
            None => debug!("⚠️ Engine has no primitive for {element}, skipping"),
        }
        Ok(handle)
    }

    /// Like `ensure`, but the slot must be backed by an object
    pub fn ensure_object<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        element: Element,
    ) -> Result<Option<ObjectId>> {
        match self.ensure(engine, element)? {
            Some(Handle::Object(id)) => Ok(Some(id)),
            Some(Handle::Timer(_)) => Err(EmoteError::InvalidArgument(format!(
                "{element} is a timer, not an object"
            ))),
            None => Ok(None),
        }
    }

    /// Remove the slot's handle from the table without touching the engine
    pub fn take(&mut self, element: Element) -> Option<Handle> {
        self.slots[element.index()].take()
    }

    /// Delete the slot's engine object or timer, if present
    pub fn delete<E: Engine + ?Sized>(&mut self, engine: &mut E, element: Element) -> bool {
        match self.take(element) {
            Some(Handle::Object(id)) => {
                engine.delete_object(id);
                true
            }
            Some(Handle::Timer(id)) => {
                engine.timer_delete(id);
                true
            }
            None => false,
        }
    }

    pub fn create_custom<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        name: &str,
        kind: ObjectKind,
    ) -> Result<ObjectId> {
        if name.is_empty() || Element::from_name(name).is_some() {
            return Err(EmoteError::InvalidArgument(format!(
                "'{name}' is empty or reserved for a built-in element"
            )));
        }
        if let Some(id) = self.custom.get(name) {
            return Ok(*id);
        }
        let id = create_configured(engine, kind, BuiltinFont::Book26)?.ok_or_else(|| {
            EmoteError::Engine(format!("engine cannot create {kind:?} objects"))
        })?;
        debug!("✨ Created custom object '{name}' ({id:?})");
        self.custom.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a built-in element by name, then the custom objects
    pub fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        match Element::from_name(name) {
            Some(element) => self.object(element),
            None => self.custom.get(name).copied(),
        }
    }

    /// Delete every object and timer, custom ones included; returns how many
    pub fn delete_all<E: Engine + ?Sized>(&mut self, engine: &mut E) -> usize {
        self.delete_all_except(engine, &[])
    }

    /// `delete_all`, leaving the listed built-in elements in place
    pub fn delete_all_except<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        keep: &[Element],
    ) -> usize {
        let mut deleted = 0;
        for element in Element::ALL {
            if keep.contains(&element) {
                continue;
            }
            if self.delete(engine, element) {
                deleted += 1;
            }
        }
        for (_, id) in std::mem::take(&mut self.custom) {
            engine.delete_object(id);
            deleted += 1;
        }
        deleted
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count() + self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::engine::GfxConfig;
    use crate::scene::headless::HeadlessEngine;

    fn engine() -> HeadlessEngine {
        let mut engine = HeadlessEngine::new();
        engine
            .init(&GfxConfig { h_res: 360, v_res: 360, fps: 30, buf_pixels: 360, swap: false, double_buffer: false, buff_dma: false })
            .unwrap();
        engine
    }

    #[test]
    fn test_names_round_trip_exhaustively() {
        for element in Element::ALL {
            assert_eq!(Element::from_name(element.name()), Some(element));
        }
        assert_eq!(Element::from_name("tail_anim"), None);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let mut engine = engine();
        let mut objects = SceneObjects::new();

        let first = objects.ensure(&mut engine, Element::ToastLabel).unwrap();
        let second = objects.ensure(&mut engine, Element::ToastLabel).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.object_count(), 1);

        let id = objects.object(Element::ToastLabel).unwrap();
        let state = engine.object(id).unwrap();
        assert!(state.visible);
        assert_eq!(state.label.long_mode, LongMode::Scroll);
        assert_eq!(state.label.font, Some(FontRef::Builtin(BuiltinFont::Book26)));
    }

    #[test]
    fn test_slot_defaults() {
        let mut engine = engine();
        let mut objects = SceneObjects::new();

        let battery = objects.ensure_object(&mut engine, Element::BatteryLabel).unwrap().unwrap();
        assert_eq!(
            engine.object(battery).unwrap().label.font,
            Some(FontRef::Builtin(BuiltinFont::Book12))
        );

        let icon = objects.ensure_object(&mut engine, Element::StatusIcon).unwrap().unwrap();
        assert!(!engine.is_visible(icon));

        let timer = objects.timer(Element::StatusTimer);
        assert_eq!(timer, None);
        objects.ensure(&mut engine, Element::StatusTimer).unwrap();
        let timer = objects.timer(Element::StatusTimer).unwrap();
        assert_eq!(engine.timer(timer).unwrap().period_ms, DEFAULT_TIMER_PERIOD_MS);
        assert!(objects.ensure_object(&mut engine, Element::StatusTimer).is_err());
    }

    #[test]
    fn test_custom_objects_and_delete_all() {
        let mut engine = engine();
        let mut objects = SceneObjects::new();

        let id = objects.create_custom(&mut engine, "custom_label_1", ObjectKind::Label).unwrap();
        assert_eq!(objects.object_by_name("custom_label_1"), Some(id));
        assert!(objects.create_custom(&mut engine, "toast_label", ObjectKind::Label).is_err());

        objects.ensure(&mut engine, Element::EyeAnim).unwrap();
        objects.ensure(&mut engine, Element::StatusTimer).unwrap();
        assert_eq!(objects.len(), 3);
        assert_eq!(objects.element_of(objects.object(Element::EyeAnim).unwrap()), Some(Element::EyeAnim));

        assert_eq!(objects.delete_all(&mut engine), 3);
        assert_eq!(engine.object_count(), 0);
        assert_eq!(engine.timer_count(), 0);
        assert!(objects.is_empty());
    }
}
