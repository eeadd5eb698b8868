// src/events.rs
// Named runtime events and the router that applies them to the scene

use log::{debug, warn};
use std::fmt;
use std::str::FromStr;

use crate::assets::cache::CacheKind;
use crate::assets::defaults::{ICON_MIC, ICON_SPEAKER, ICON_TIPS};
use crate::exceptions::{EmoteError, Result};
use crate::scene::engine::Engine;
use crate::scene::objects::Element;
use crate::session::Session;
use crate::utils::parse_leading_int;

/// Events accepted by `set_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmoteEvent {
    Idle,
    Listen,
    Speak,
    Sys,
    Set,
    QrCode,
    Battery,
}

impl EmoteEvent {
    pub const ALL: [EmoteEvent; 7] = [
        EmoteEvent::Idle,
        EmoteEvent::Listen,
        EmoteEvent::Speak,
        EmoteEvent::Sys,
        EmoteEvent::Set,
        EmoteEvent::QrCode,
        EmoteEvent::Battery,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EmoteEvent::Idle => "evt_idle",
            EmoteEvent::Listen => "evt_listen",
            EmoteEvent::Speak => "evt_speak",
            EmoteEvent::Sys => "evt_sys",
            EmoteEvent::Set => "evt_set",
            EmoteEvent::QrCode => "evt_qrcode",
            EmoteEvent::Battery => "evt_bat",
        }
    }

    /// Battery reports update state only and leave the scene alone
    pub fn skip_hide(self) -> bool {
        matches!(self, EmoteEvent::Battery)
    }
}

impl FromStr for EmoteEvent {
    type Err = EmoteError;

    fn from_str(s: &str) -> Result<Self> {
        EmoteEvent::ALL
            .into_iter()
            .find(|event| event.name() == s)
            .ok_or_else(|| EmoteError::UnknownEvent(s.to_string()))
    }
}

impl fmt::Display for EmoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Charging state and battery level reported through `evt_bat`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStatus {
    pub charging: bool,
    pub battery_percent: Option<u8>,
}

impl RuntimeStatus {
    /// Parse `"<0|1>,<percent>"`; the percentage is clamped to 0..=100
    pub fn parse_battery(message: &str) -> Result<Self> {
        let (flag, percent) = message.split_once(',').ok_or_else(|| {
            EmoteError::InvalidArgument(format!("battery message '{message}' has no separator"))
        })?;
        let percent = parse_leading_int(percent).clamp(0, 100);
        Ok(RuntimeStatus {
            charging: flag.starts_with('1'),
            battery_percent: Some(percent as u8),
        })
    }
}

impl<E: Engine> Session<E> {
    /// Route a named event. Unknown names change nothing.
    pub(crate) fn dispatch_named(&mut self, name: &str, message: Option<&str>) -> Result<()> {
        let event = name.parse::<EmoteEvent>()?;
        self.dispatch(event, message)
    }

    pub(crate) fn dispatch(&mut self, event: EmoteEvent, message: Option<&str>) -> Result<()> {
        debug!("📣 {event} {:?}", message.unwrap_or(""));
        if !event.skip_hide() {
            self.hide_transient();
        }
        match event {
            EmoteEvent::Idle => {
                best_effort(event, self.set_bat_status());
                best_effort(event, self.set_label_clock());
            }
            EmoteEvent::Listen => {
                best_effort(event, self.show_listen_animation());
                best_effort(event, self.show_tips(ICON_MIC));
            }
            EmoteEvent::Speak => self.show_toast(event, message, ICON_SPEAKER, false),
            EmoteEvent::Sys | EmoteEvent::Set => self.show_toast(event, message, ICON_TIPS, true),
            EmoteEvent::QrCode => {
                self.show_toast(event, message, ICON_TIPS, true);
                self.set_visible(Element::EyeAnim, false);
            }
            EmoteEvent::Battery => {
                let message = message.ok_or_else(|| {
                    EmoteError::InvalidArgument("evt_bat needs a message".into())
                })?;
                self.status = RuntimeStatus::parse_battery(message)?;
                debug!(
                    "🔋 charging={} percent={:?}",
                    self.status.charging, self.status.battery_percent
                );
            }
        }
        Ok(())
    }

    fn show_tips(&mut self, icon: &str) -> Result<()> {
        self.set_icon_image(Element::StatusIcon, CacheKind::TipsIcon, icon, true)
    }

    fn show_toast(&mut self, event: EmoteEvent, message: Option<&str>, icon: &str, snap_loop: bool) {
        best_effort(event, self.set_label_text(Element::ToastLabel, message));
        if let Some(id) = self.objects.object(Element::ToastLabel) {
            self.engine.label_set_snap_loop(id, snap_loop);
        }
        best_effort(event, self.show_tips(icon));
    }
}

fn best_effort(event: EmoteEvent, result: Result<()>) {
    if let Err(e) = result {
        warn!("⚠️ {event}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::engine::GfxConfig;
    use crate::scene::headless::HeadlessEngine;

    fn session() -> Session<HeadlessEngine> {
        let mut engine = HeadlessEngine::new();
        engine
            .init(&GfxConfig { h_res: 360, v_res: 360, fps: 30, buf_pixels: 360, swap: false, double_buffer: false, buff_dma: false })
            .unwrap();
        Session::new(engine, None)
    }

    #[test]
    fn test_event_names() {
        for event in EmoteEvent::ALL {
            assert_eq!(event.name().parse::<EmoteEvent>().unwrap(), event);
        }
        assert!(matches!(
            "evt_dance".parse::<EmoteEvent>(),
            Err(EmoteError::UnknownEvent(_))
        ));
        assert!(EmoteEvent::Battery.skip_hide());
        assert!(!EmoteEvent::Idle.skip_hide());
    }

    #[test]
    fn test_battery_parsing() {
        let status = RuntimeStatus::parse_battery("1,150").unwrap();
        assert!(status.charging);
        assert_eq!(status.battery_percent, Some(100));

        let status = RuntimeStatus::parse_battery("0,-5").unwrap();
        assert!(!status.charging);
        assert_eq!(status.battery_percent, Some(0));

        let status = RuntimeStatus::parse_battery("1,42%").unwrap();
        assert_eq!(status.battery_percent, Some(42));

        assert!(RuntimeStatus::parse_battery("150").is_err());
    }

    #[test]
    fn test_bad_battery_message_keeps_state() {
        let mut session = session();
        session.dispatch_named("evt_bat", Some("1,80")).unwrap();
        assert!(session.dispatch_named("evt_bat", Some("garbage")).is_err());
        assert!(session.dispatch_named("evt_bat", None).is_err());
        assert_eq!(
            session.status,
            RuntimeStatus { charging: true, battery_percent: Some(80) }
        );
    }

    #[test]
    fn test_unknown_event_leaves_scene_alone() {
        let mut session = session();
        session.set_label_text(Element::ToastLabel, Some("hello")).unwrap();
        assert!(session.dispatch_named("evt_unknown", Some("x")).is_err());
        let toast = session.objects.object(Element::ToastLabel).unwrap();
        assert!(session.engine.is_visible(toast));
    }

    #[test]
    fn test_speak_shows_toast_without_snap_loop() {
        let mut session = session();
        // icons are missing; the toast still shows
        session.dispatch_named("evt_speak", Some("hello there")).unwrap();
        let toast = session.objects.object(Element::ToastLabel).unwrap();
        let state = session.engine.object(toast).unwrap();
        assert!(state.visible);
        assert_eq!(state.label.text, "hello there");
        assert!(!state.label.snap_loop);

        session.dispatch_named("evt_sys", Some("booting")).unwrap();
        assert!(session.engine.object(toast).unwrap().label.snap_loop);
    }

    #[test]
    fn test_battery_event_does_not_hide() {
        let mut session = session();
        session.set_label_text(Element::ToastLabel, Some("hi")).unwrap();
        session.dispatch(EmoteEvent::Battery, Some("0,50")).unwrap();
        let toast = session.objects.object(Element::ToastLabel).unwrap();
        assert!(session.engine.is_visible(toast));

        session.dispatch(EmoteEvent::Idle, None).unwrap();
        assert!(!session.engine.is_visible(toast));
    }
}
