// src/assets/defaults.rs
// Runtime defaults applied when the manifest or the caller leaves a value out

// =================================
// Labels
// =================================
pub const DEFAULT_LABEL_WIDTH: u32 = 100;
pub const DEFAULT_LABEL_HEIGHT: u32 = 25;
pub const DEFAULT_LABEL_Y_OFFSET: i32 = 20;
pub const DEFAULT_SCROLL_SPEED: u32 = 10;
pub const DEFAULT_SNAP_INTERVAL_MS: u32 = 1500;
pub const DEFAULT_FONT_COLOR: u32 = 0xFFFFFF;

// =================================
// Animations
// =================================
pub const DEFAULT_ANIM_FPS: u32 = 30;
pub const LISTEN_ANIM_FPS: u32 = 15;
// Segment end meaning "through the last frame"
pub const ANIM_SEGMENT_END: u32 = 0xFFFF;

// =================================
// Timers
// =================================
pub const DEFAULT_TIMER_PERIOD_MS: u32 = 1000;
pub const DEFAULT_TIMER_REPEAT: i32 = -1; // -1 = indefinite

// =================================
// QR code and boot screen
// =================================
pub const DEFAULT_QRCODE_SIZE: u32 = 150;
pub const QRCODE_EYE_OFFSET_Y: i32 = 30;
pub const BOOT_BG_COLOR: u32 = 0x000000;

// =================================
// Icon names referenced by event handlers
// =================================
pub const ICON_MIC: &str = "icon_mic";
pub const ICON_SPEAKER: &str = "icon_speaker";
pub const ICON_TIPS: &str = "icon_tips";
pub const ICON_LISTEN: &str = "listen";
pub const ICON_BATTERY_BG: &str = "battery_bg";
pub const ICON_BATTERY_CHARGE: &str = "battery_charge";

// Clock label format (local time)
pub const CLOCK_FORMAT: &str = "%H:%M";
