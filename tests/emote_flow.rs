//! End-to-end flows against the headless engine

use emote::assets::ContainerBuilder;
use emote::assets::loader::Section;
use emote::scene::engine::ImageHeader;
use emote::{
    AssetSource, Callbacks, DialogWait, Element, Emote, EmoteConfig, EmoteError, Engine,
    HeadlessEngine, UpdateEvent,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn icon() -> Vec<u8> {
    let mut bytes = ImageHeader {
        width: 8,
        height: 8,
        stride: 16,
        ..ImageHeader::default()
    }
    .pack()
    .to_vec();
    bytes.extend_from_slice(&[0x11; 128]);
    bytes
}

fn full_manifest() -> Value {
    json!({
        "emoji_collection": [
            {"name": "idle", "file": "idle.eaf", "eaf": {"loop": true, "fps": 20}},
            {"name": "angry", "file": "angry.eaf", "eaf": {"loop": true}},
            {"name": "pop", "file": "pop.eaf", "eaf": {"loop": false, "fps": 30}}
        ],
        "icon_collection": [
            {"name": "icon_tips", "file": "icon_tips.bin"},
            {"name": "icon_speaker", "file": "icon_speaker.bin"},
            {"name": "icon_mic", "file": "icon_mic.bin"},
            {"name": "battery_bg", "file": "battery_bg.bin"},
            {"name": "battery_charge", "file": "battery_charge.bin"},
            {"name": "listen", "file": "listen.eaf"}
        ],
        "layout": [
            {"type": "anim", "name": "eye_anim", "align": "GFX_ALIGN_CENTER", "x": 0, "y": 0, "anim": {"mirror": "auto"}},
            {"type": "anim", "name": "emerg_dlg", "align": "GFX_ALIGN_CENTER", "x": 0, "y": 0},
            {"type": "anim", "name": "listen_anim", "align": "GFX_ALIGN_TOP_MID", "x": 0, "y": 10},
            {"type": "image", "name": "status_icon", "align": "GFX_ALIGN_TOP_LEFT", "x": 10, "y": 10},
            {"type": "image", "name": "charge_icon", "align": "GFX_ALIGN_TOP_RIGHT", "x": -10, "y": 10},
            {"type": "label", "name": "toast_label", "align": "GFX_ALIGN_TOP_MID", "x": 0, "y": 20,
             "width": 200, "height": 40, "label": {"color": 16777215, "long_mode": {"type": "snap", "loop": true}}},
            {"type": "label", "name": "clock_label", "align": "GFX_ALIGN_TOP_MID", "x": 0, "y": 20},
            {"type": "label", "name": "battery_label", "align": "GFX_ALIGN_TOP_RIGHT", "x": -30, "y": 10},
            {"type": "timer", "name": "clock_timer", "timer": {"period": 1000, "repeat_count": -1}}
        ]
    })
}

fn package(manifest: &Value) -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder
        .add("index.json", serde_json::to_vec(manifest).unwrap())
        .unwrap();
    for (name, fill) in [("idle.eaf", 1u8), ("angry.eaf", 2), ("pop.eaf", 3), ("listen.eaf", 4)] {
        builder.add(name, vec![fill; 256]).unwrap();
    }
    for name in ["icon_tips.bin", "icon_speaker.bin", "icon_mic.bin", "battery_bg.bin", "battery_charge.bin"] {
        builder.add_image(name, icon(), 8, 8).unwrap();
    }
    builder
}

struct Harness {
    emote: Emote<HeadlessEngine>,
    updates: Arc<Mutex<Vec<UpdateEvent>>>,
}

impl Harness {
    fn new(config: EmoteConfig) -> Self {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let emote = Emote::init(
            config,
            HeadlessEngine::new(),
            Callbacks::new().on_update(move |event| sink.lock().unwrap().push(event)),
        )
        .unwrap();
        Harness { emote, updates }
    }

    fn loaded(manifest: &Value) -> Self {
        let harness = Harness::new(EmoteConfig::default());
        harness
            .emote
            .partitions()
            .register("anim_icon", package(manifest).build().unwrap());
        harness
            .emote
            .load_assets_from_source(&AssetSource::Partition("anim_icon".into()))
            .unwrap();
        harness
    }

    fn visible(&self, element: Element) -> bool {
        self.emote
            .inspect(|s| {
                s.objects()
                    .object(element)
                    .is_some_and(|id| s.engine().is_visible(id))
            })
            .unwrap()
    }

    fn expiries(&self) -> usize {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|event| **event == UpdateEvent::DialogExpired)
            .count()
    }
}

#[test]
fn unknown_event_leaves_visibility_unchanged() {
    let harness = Harness::loaded(&full_manifest());
    harness.emote.set_anim_emoji("idle").unwrap();
    harness.emote.set_event_msg("evt_speak", Some("hello")).unwrap();

    let before: Vec<bool> = Element::ALL.iter().map(|e| harness.visible(*e)).collect();
    let err = harness.emote.set_event_msg("evt_dance", Some("x")).unwrap_err();
    assert!(matches!(err, EmoteError::UnknownEvent(_)));
    let after: Vec<bool> = Element::ALL.iter().map(|e| harness.visible(*e)).collect();
    assert_eq!(before, after);
    assert!(harness.visible(Element::ToastLabel));
}

#[test]
fn battery_message_is_clamped() {
    let harness = Harness::loaded(&full_manifest());

    harness.emote.set_event_msg("evt_bat", Some("1,150")).unwrap();
    let status = harness.emote.battery_status().unwrap();
    assert!(status.charging);
    assert_eq!(status.battery_percent, Some(100));

    harness.emote.set_event_msg("evt_bat", Some("0,-5")).unwrap();
    let status = harness.emote.battery_status().unwrap();
    assert!(!status.charging);
    assert_eq!(status.battery_percent, Some(0));

    assert!(harness.emote.set_event_msg("evt_bat", Some("no separator")).is_err());
    assert_eq!(harness.emote.battery_status().unwrap().battery_percent, Some(0));
}

#[test]
fn idle_shows_battery_and_clock() {
    let harness = Harness::loaded(&full_manifest());
    harness.emote.set_event_msg("evt_bat", Some("1,64")).unwrap();
    harness.emote.set_event_msg("evt_idle", None).unwrap();

    assert!(harness.visible(Element::ClockLabel));
    assert!(harness.visible(Element::BatteryLabel));
    assert!(harness.visible(Element::ChargeIcon));
    let (battery, timer_running) = harness
        .emote
        .inspect(|s| {
            let label = s.objects().object(Element::BatteryLabel).unwrap();
            let timer = s.objects().timer(Element::StatusTimer).unwrap();
            (
                s.engine().object(label).unwrap().label.text.clone(),
                s.engine().timer_is_running(timer),
            )
        })
        .unwrap();
    assert_eq!(battery, "64");
    assert!(timer_running);

    // any other event pauses the status timer again
    harness.emote.set_event_msg("evt_listen", None).unwrap();
    assert!(harness.visible(Element::ListenAnim));
    assert!(!harness.visible(Element::ClockLabel));
    let running = harness
        .emote
        .inspect(|s| {
            let timer = s.objects().timer(Element::StatusTimer).unwrap();
            s.engine().timer_is_running(timer)
        })
        .unwrap();
    assert!(!running);
}

#[test]
fn dialog_expires_once() {
    let harness = Harness::loaded(&full_manifest());
    harness.emote.set_anim_emoji("idle").unwrap();
    harness
        .emote
        .insert_anim_dialog("angry", Duration::from_millis(5000))
        .unwrap();
    assert!(harness.visible(Element::EmergencyDialog));
    assert!(!harness.visible(Element::EyeAnim));

    harness.emote.tick(Duration::from_millis(5100)).unwrap();
    assert!(!harness.visible(Element::EmergencyDialog));
    assert!(harness.visible(Element::EyeAnim));
    assert_eq!(harness.expiries(), 1);

    harness.emote.tick(Duration::from_millis(10_000)).unwrap();
    assert_eq!(harness.expiries(), 1);
}

#[test]
fn rearming_dialog_restarts_countdown() {
    let harness = Harness::loaded(&full_manifest());
    let emote = &harness.emote;
    emote.insert_anim_dialog("angry", Duration::from_millis(5000)).unwrap();
    emote.tick(Duration::from_millis(3000)).unwrap();
    emote.insert_anim_dialog("angry", Duration::from_millis(5000)).unwrap();

    emote.tick(Duration::from_millis(3000)).unwrap();
    assert_eq!(harness.expiries(), 0);
    assert!(harness.visible(Element::EmergencyDialog));

    emote.tick(Duration::from_millis(2100)).unwrap();
    assert_eq!(harness.expiries(), 1);
    assert_eq!(emote.inspect(|s| s.engine().timer_count()).unwrap(), 1);
}

#[test]
fn dialog_wait_outcomes() {
    let harness = Harness::loaded(&full_manifest());
    let emote = &harness.emote;
    assert_eq!(
        emote.wait_dialog_done(Duration::from_millis(10)).unwrap(),
        DialogWait::NotArmed
    );

    // 30 frames at 30 fps
    emote.insert_anim_dialog("pop", Duration::from_secs(5)).unwrap();
    assert_eq!(
        emote.wait_dialog_done(Duration::from_millis(10)).unwrap(),
        DialogWait::TimedOut
    );
    emote.tick(Duration::from_millis(1000)).unwrap();
    assert_eq!(
        emote.wait_dialog_done(Duration::from_millis(10)).unwrap(),
        DialogWait::Done
    );
    assert_eq!(
        emote.wait_dialog_done(Duration::from_millis(10)).unwrap(),
        DialogWait::NotArmed
    );
    assert!(
        harness
            .updates
            .lock()
            .unwrap()
            .contains(&UpdateEvent::AllFramesDone(Element::EmergencyDialog))
    );
}

#[test]
fn layout_entry_without_align_is_skipped() {
    let manifest = json!({
        "layout": [
            {"type": "label", "name": "toast_label", "align": "GFX_ALIGN_TOP_MID", "x": 0, "y": 20},
            {"type": "image", "name": "status_icon", "x": 0, "y": 0},
            {"type": "label", "name": "clock_label", "align": "GFX_ALIGN_TOP_MID", "x": 0, "y": 20}
        ]
    });
    let config = EmoteConfig {
        boot_message: None,
        ..EmoteConfig::default()
    };
    let harness = Harness::new(config);
    harness
        .emote
        .partitions()
        .register("anim_icon", package(&manifest).build().unwrap());

    let report = harness
        .emote
        .load_assets_from_source(&AssetSource::Partition("anim_icon".into()))
        .unwrap();
    assert_eq!(report.layouts_applied, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].section, Section::Layout);
    assert_eq!(report.skipped[0].name, "status_icon");
    assert_eq!(harness.emote.inspect(|s| s.engine().object_count()).unwrap(), 2);
}

#[test]
fn boot_animation_hands_off_to_assets() {
    let dir = TempDir::new().unwrap();
    let boot_path = dir.path().join("boot.bin");
    let mut boot = ContainerBuilder::new();
    boot.add("boot.eaf", vec![9; 512]).unwrap();
    boot.write_to(&boot_path).unwrap();
    let assets_path = dir.path().join("assets.bin");
    package(&full_manifest()).write_to(&assets_path).unwrap();

    let harness = Harness::new(EmoteConfig::default());
    harness
        .emote
        .load_boot_anim_from_source(&AssetSource::Path(boot_path))
        .unwrap();
    assert!(harness.visible(Element::BootAnim));

    harness.emote.tick(Duration::from_millis(1000)).unwrap();
    assert!(
        harness
            .emote
            .wait_boot_anim_stop_timeout(Duration::from_secs(1), false)
            .unwrap()
    );
    assert!(harness.updates.lock().unwrap().contains(&UpdateEvent::BootAnimationDone));

    harness
        .emote
        .load_assets_from_source(&AssetSource::Path(assets_path))
        .unwrap();
    let (boot_present, toast) = harness
        .emote
        .inspect(|s| {
            let toast = s.objects().object(Element::ToastLabel).unwrap();
            (
                s.objects().contains(Element::BootAnim),
                s.engine().object(toast).unwrap().label.text.clone(),
            )
        })
        .unwrap();
    assert!(!boot_present);
    assert_eq!(toast, "Starting...");
}

#[test]
fn corrupt_container_keeps_previous_state() {
    let harness = Harness::loaded(&full_manifest());
    let mut bytes = package(&full_manifest()).build().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    harness.emote.partitions().register("broken", bytes);

    let err = harness
        .emote
        .load_assets_from_source(&AssetSource::Partition("broken".into()))
        .unwrap_err();
    assert!(matches!(err, EmoteError::ContainerIntegrity(_)));
    assert_eq!(harness.emote.inspect(|s| s.emoji().len()).unwrap(), 3);
    harness.emote.set_anim_emoji("idle").unwrap();
}

#[test]
fn unload_then_deinit() {
    let harness = Harness::loaded(&full_manifest());
    harness.emote.insert_anim_dialog("angry", Duration::from_secs(5)).unwrap();
    harness.emote.unload_assets().unwrap();
    let (objects, emojis) = harness
        .emote
        .inspect(|s| (s.engine().object_count(), s.emoji().len()))
        .unwrap();
    assert_eq!((objects, emojis), (0, 0));
    assert!(matches!(
        harness.emote.set_anim_emoji("idle"),
        Err(EmoteError::AssetNotFound(_))
    ));

    harness.emote.deinit();
    assert!(!harness.emote.is_initialized());
    assert!(matches!(
        harness.emote.tick(Duration::from_millis(10)),
        Err(EmoteError::NotInitialized)
    ));
}
