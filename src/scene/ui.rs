// src/scene/ui.rs
// Scene operations used by the event router, the dialog timer and the public API

use chrono::Local;
use log::{debug, trace};

use super::engine::{AnimSegment, Engine, ImageDescriptor, ObjectId};
use super::objects::Element;
use crate::assets::cache::CacheKind;
use crate::assets::defaults::{
    ANIM_SEGMENT_END, CLOCK_FORMAT, DEFAULT_ANIM_FPS, ICON_BATTERY_BG, ICON_BATTERY_CHARGE,
    ICON_LISTEN, LISTEN_ANIM_FPS,
};
use crate::exceptions::{EmoteError, Result};
use crate::session::Session;

impl<E: Engine> Session<E> {
    /// Object for `element`, created with its defaults on first use
    pub(crate) fn object_for(&mut self, element: Element) -> Result<ObjectId> {
        self.objects
            .ensure_object(&mut self.engine, element)?
            .ok_or_else(|| EmoteError::Engine(format!("engine cannot create {element}")))
    }

    pub(crate) fn set_visible(&mut self, element: Element, visible: bool) {
        if let Some(id) = self.objects.object(element) {
            self.engine.set_visible(id, visible);
        }
    }

    /// Hide the transient elements and pause the status timer
    pub(crate) fn hide_transient(&mut self) {
        for element in Element::TRANSIENT {
            self.set_visible(element, false);
        }
        if let Some(timer) = self.objects.timer(Element::StatusTimer) {
            self.engine.timer_pause(timer);
        }
    }

    /// Play emoji `name` in `element`, materialized through `cache`
    pub(crate) fn set_emoji_animation(
        &mut self,
        element: Element,
        cache: CacheKind,
        name: &str,
        hide_eye: bool,
    ) -> Result<()> {
        let record = self
            .emoji
            .get(name)
            .cloned()
            .ok_or_else(|| EmoteError::AssetNotFound(format!("emoji '{name}'")))?;
        let id = self.object_for(element)?;
        let buffer = self.caches.acquire(cache, &record.data)?;

        let fps = if record.fps > 0 { record.fps } else { DEFAULT_ANIM_FPS };
        self.engine.anim_set_src(id, buffer);
        self.engine.anim_set_segment(
            id,
            AnimSegment {
                start: 0,
                end: ANIM_SEGMENT_END,
                fps,
                looping: record.looping,
            },
        );
        self.engine.anim_start(id);
        self.engine.set_visible(id, true);
        if hide_eye {
            self.set_visible(Element::EyeAnim, false);
        }
        debug!("🎞️ {element} <- '{name}' @ {fps} fps (loop={})", record.looping);
        Ok(())
    }

    /// Show icon `icon` in an image element
    pub(crate) fn set_icon_image(
        &mut self,
        element: Element,
        cache: CacheKind,
        icon: &str,
        visible: bool,
    ) -> Result<()> {
        let record = self
            .icons
            .get(icon)
            .cloned()
            .ok_or_else(|| EmoteError::AssetNotFound(format!("icon '{icon}'")))?;
        let id = self.object_for(element)?;
        let buffer = self.caches.acquire(cache, &record.data)?;
        let image = ImageDescriptor::from_buffer(&buffer)?;
        trace!(
            "🖼️ {element} <- '{icon}' ({}x{})",
            image.header.width, image.header.height
        );
        self.engine.img_set_src(id, image);
        self.engine.set_visible(id, visible);
        Ok(())
    }

    /// Listening indicator: the `listen` icon played as a looping animation
    pub(crate) fn show_listen_animation(&mut self) -> Result<()> {
        let record = self
            .icons
            .get(ICON_LISTEN)
            .cloned()
            .ok_or_else(|| EmoteError::AssetNotFound(format!("icon '{ICON_LISTEN}'")))?;
        let id = self.object_for(Element::ListenAnim)?;
        let buffer = self.caches.acquire(CacheKind::ListenAnim, &record.data)?;
        self.engine.anim_set_src(id, buffer);
        self.engine.anim_set_segment(
            id,
            AnimSegment {
                start: 0,
                end: ANIM_SEGMENT_END,
                fps: LISTEN_ANIM_FPS,
                looping: true,
            },
        );
        self.engine.anim_start(id);
        self.engine.set_visible(id, true);
        Ok(())
    }

    /// Set a label's text (empty when `None`) and show it
    pub(crate) fn set_label_text(&mut self, element: Element, text: Option<&str>) -> Result<()> {
        let id = self.object_for(element)?;
        self.engine.label_set_text(id, text.unwrap_or(""));
        self.engine.set_visible(id, true);
        Ok(())
    }

    /// Battery icon, percentage and charge indicator; nothing until a
    /// percentage has been reported
    pub(crate) fn set_bat_status(&mut self) -> Result<()> {
        let Some(percent) = self.status.battery_percent else {
            trace!("🔋 No battery reading yet");
            return Ok(());
        };
        let charging = self.status.charging;
        self.set_icon_image(Element::StatusIcon, CacheKind::TipsIcon, ICON_BATTERY_BG, true)?;
        self.set_label_text(Element::BatteryLabel, Some(&percent.to_string()))?;
        self.set_icon_image(Element::ChargeIcon, CacheKind::ChargeIcon, ICON_BATTERY_CHARGE, charging)?;
        Ok(())
    }

    /// Local `HH:MM` in the clock label, and keep the status timer running
    pub(crate) fn set_label_clock(&mut self) -> Result<()> {
        let label = self
            .objects
            .object(Element::ClockLabel)
            .ok_or_else(|| EmoteError::AssetNotFound(Element::ClockLabel.to_string()))?;
        let timer = self
            .objects
            .timer(Element::StatusTimer)
            .ok_or_else(|| EmoteError::AssetNotFound(Element::StatusTimer.to_string()))?;

        let now = Local::now().format(CLOCK_FORMAT).to_string();
        self.engine.label_set_text(label, &now);
        self.engine.set_visible(label, true);
        if !self.engine.timer_is_running(timer) {
            self.engine.timer_resume(timer);
        }
        Ok(())
    }

    pub(crate) fn set_qrcode_data(&mut self, text: &str) -> Result<()> {
        let id = self
            .objects
            .object(Element::QrCode)
            .ok_or_else(|| EmoteError::AssetNotFound(Element::QrCode.to_string()))?;
        self.engine.qrcode_set_data(id, text);
        self.engine.set_visible(id, true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::container::{AssetSource, Container};
    use crate::assets::partition::PartitionTable;
    use crate::assets::store::{AssetData, EmojiRecord, IconRecord};
    use crate::assets::writer::ContainerBuilder;
    use crate::scene::engine::{GfxConfig, ImageHeader};
    use crate::scene::headless::HeadlessEngine;
    use std::sync::Arc;

    fn icon_bytes() -> Vec<u8> {
        let header = ImageHeader {
            magic: 0x19,
            width: 4,
            height: 2,
            stride: 8,
            ..ImageHeader::default()
        };
        let mut bytes = header.pack().to_vec();
        bytes.extend_from_slice(&[0xAB; 16]);
        bytes
    }

    fn session() -> Session<HeadlessEngine> {
        let mut builder = ContainerBuilder::new();
        builder.add("happy.eaf", vec![1; 64]).unwrap();
        builder.add("battery_bg.bin", icon_bytes()).unwrap();
        builder.add("battery_charge.bin", icon_bytes()).unwrap();
        builder.add("tiny.bin", vec![1, 2, 3]).unwrap();
        let partitions = PartitionTable::new();
        partitions.register("assets", builder.build().unwrap());
        let container =
            Arc::new(Container::open(&AssetSource::Partition("assets".into()), &partitions).unwrap());

        let mut engine = HeadlessEngine::new();
        engine
            .init(&GfxConfig { h_res: 360, v_res: 360, fps: 30, buf_pixels: 360, swap: false, double_buffer: false, buff_dma: false })
            .unwrap();
        let mut session = Session::new(engine, None);
        let data = |name: &str| AssetData::new(Arc::clone(&container), container.resolve(name).unwrap());
        session
            .emoji
            .set("happy", EmojiRecord { data: data("happy.eaf"), fps: 0, looping: true })
            .unwrap();
        session.icons.set("battery_bg", IconRecord { data: data("battery_bg.bin") }).unwrap();
        session.icons.set("battery_charge", IconRecord { data: data("battery_charge.bin") }).unwrap();
        session.icons.set("tiny", IconRecord { data: data("tiny.bin") }).unwrap();
        session
    }

    #[test]
    fn test_emoji_animation_uses_default_fps() {
        let mut session = session();
        session
            .set_emoji_animation(Element::EyeAnim, CacheKind::MoodAnim, "happy", false)
            .unwrap();
        let id = session.objects.object(Element::EyeAnim).unwrap();
        let anim = &session.engine.object(id).unwrap().anim;
        assert_eq!(anim.src_len, 64);
        assert!(anim.playing);
        let segment = anim.segment.unwrap();
        assert_eq!(segment.fps, DEFAULT_ANIM_FPS);
        assert_eq!(segment.end, ANIM_SEGMENT_END);
        assert!(segment.looping);
    }

    #[test]
    fn test_unknown_emoji_creates_nothing() {
        let mut session = session();
        let err = session
            .set_emoji_animation(Element::EyeAnim, CacheKind::MoodAnim, "sad", false)
            .unwrap_err();
        assert!(matches!(err, EmoteError::AssetNotFound(_)));
        assert_eq!(session.engine.object_count(), 0);
    }

    #[test]
    fn test_short_icon_fails() {
        let mut session = session();
        assert!(
            session
                .set_icon_image(Element::StatusIcon, CacheKind::TipsIcon, "tiny", true)
                .is_err()
        );
    }

    #[test]
    fn test_battery_status_needs_a_reading() {
        let mut session = session();
        session.set_bat_status().unwrap();
        assert_eq!(session.engine.object_count(), 0);

        session.status.battery_percent = Some(42);
        session.status.charging = false;
        session.set_bat_status().unwrap();

        let label = session.objects.object(Element::BatteryLabel).unwrap();
        assert_eq!(session.engine.object(label).unwrap().label.text, "42");
        let charge = session.objects.object(Element::ChargeIcon).unwrap();
        assert!(!session.engine.is_visible(charge));
        let icon = session.objects.object(Element::StatusIcon).unwrap();
        assert!(session.engine.is_visible(icon));
        assert_eq!(session.engine.object(icon).unwrap().image.unwrap().width, 4);
    }

    #[test]
    fn test_clock_requires_label_and_timer() {
        let mut session = session();
        assert!(session.set_label_clock().is_err());

        session.object_for(Element::ClockLabel).unwrap();
        session.objects.ensure(&mut session.engine, Element::StatusTimer).unwrap();
        let timer = session.objects.timer(Element::StatusTimer).unwrap();
        session.engine.timer_pause(timer);

        session.set_label_clock().unwrap();
        let label = session.objects.object(Element::ClockLabel).unwrap();
        assert_eq!(session.engine.object(label).unwrap().label.text.len(), 5);
        assert!(session.engine.timer_is_running(timer));
    }

    #[test]
    fn test_hide_transient_pauses_status_timer() {
        let mut session = session();
        session.set_label_text(Element::ToastLabel, Some("hi")).unwrap();
        session.objects.ensure(&mut session.engine, Element::StatusTimer).unwrap();

        session.hide_transient();
        let toast = session.objects.object(Element::ToastLabel).unwrap();
        assert!(!session.engine.is_visible(toast));
        let timer = session.objects.timer(Element::StatusTimer).unwrap();
        assert!(!session.engine.timer_is_running(timer));
    }
}
