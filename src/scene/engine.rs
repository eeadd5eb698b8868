// src/scene/engine.rs
// Rendering engine surface: the operations emote drives and the events it receives back

use log::warn;
use std::fmt;
use std::time::Duration;

use crate::assets::cache::AssetBuffer;
use crate::assets::constants::IMAGE_HEADER_SIZE;
use crate::exceptions::{EmoteError, Result};

/// Engine-side object handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Engine-side timer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

/// Engine-side font handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(pub u32);

/// Drawable object kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Animation,
    Image,
    Label,
    QrCode,
}

impl std::str::FromStr for ObjectKind {
    type Err = EmoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "anim" => Ok(ObjectKind::Animation),
            "image" => Ok(ObjectKind::Image),
            "label" => Ok(ObjectKind::Label),
            "qrcode" => Ok(ObjectKind::QrCode),
            other => Err(EmoteError::InvalidArgument(format!("unknown object type '{other}'"))),
        }
    }
}

/// Strip a `PREFIX_` keyword prefix and lowercase the rest, so that
/// `GFX_ALIGN_TOP_MID` and `top_mid` read the same
fn normalize_keyword<'a>(keyword: &'a str, prefix: &str) -> std::borrow::Cow<'a, str> {
    let trimmed = keyword.trim();
    let bare = trimmed.strip_prefix(prefix).unwrap_or(trimmed);
    if bare.bytes().any(|b| b.is_ascii_uppercase()) {
        std::borrow::Cow::Owned(bare.to_ascii_lowercase())
    } else {
        std::borrow::Cow::Borrowed(bare)
    }
}

/// Object alignment relative to the screen or to another object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Default,
    TopLeft,
    TopMid,
    TopRight,
    LeftMid,
    Center,
    RightMid,
    BottomLeft,
    BottomMid,
    BottomRight,
    OutTopLeft,
    OutTopMid,
    OutTopRight,
    OutBottomLeft,
    OutBottomMid,
    OutBottomRight,
    OutLeftTop,
    OutLeftMid,
    OutLeftBottom,
    OutRightTop,
    OutRightMid,
    OutRightBottom,
}

impl Align {
    /// Parse an alignment keyword; unknown keywords fall back to `Default`
    pub fn from_keyword(keyword: &str) -> Self {
        match normalize_keyword(keyword, "GFX_ALIGN_").as_ref() {
            "default" => Align::Default,
            "top_left" => Align::TopLeft,
            "top_mid" => Align::TopMid,
            "top_right" => Align::TopRight,
            "left_mid" => Align::LeftMid,
            "center" => Align::Center,
            "right_mid" => Align::RightMid,
            "bottom_left" => Align::BottomLeft,
            "bottom_mid" => Align::BottomMid,
            "bottom_right" => Align::BottomRight,
            "out_top_left" => Align::OutTopLeft,
            "out_top_mid" => Align::OutTopMid,
            "out_top_right" => Align::OutTopRight,
            "out_bottom_left" => Align::OutBottomLeft,
            "out_bottom_mid" => Align::OutBottomMid,
            "out_bottom_right" => Align::OutBottomRight,
            "out_left_top" => Align::OutLeftTop,
            "out_left_mid" => Align::OutLeftMid,
            "out_left_bottom" => Align::OutLeftBottom,
            "out_right_top" => Align::OutRightTop,
            "out_right_mid" => Align::OutRightMid,
            "out_right_bottom" => Align::OutRightBottom,
            _ => {
                warn!("⚠️ Unknown align keyword '{keyword}', using default");
                Align::Default
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Auto,
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    /// Unknown keywords fall back to `Center`
    pub fn from_keyword(keyword: &str) -> Self {
        match normalize_keyword(keyword, "GFX_TEXT_ALIGN_").as_ref() {
            "auto" => TextAlign::Auto,
            "left" => TextAlign::Left,
            "center" => TextAlign::Center,
            "right" => TextAlign::Right,
            _ => {
                warn!("⚠️ Unknown text align '{keyword}', using center");
                TextAlign::Center
            }
        }
    }
}

/// Label overflow behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongMode {
    Wrap,
    Scroll,
    #[default]
    Clip,
    Snap,
}

impl LongMode {
    /// Unknown keywords fall back to `Clip`
    pub fn from_keyword(keyword: &str) -> Self {
        match normalize_keyword(keyword, "GFX_LABEL_LONG_").as_ref() {
            "wrap" => LongMode::Wrap,
            "scroll" => LongMode::Scroll,
            "clip" => LongMode::Clip,
            "snap" => LongMode::Snap,
            _ => {
                warn!("⚠️ Unknown long mode '{keyword}', using clip");
                LongMode::Clip
            }
        }
    }
}

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);
    pub const WHITE: Color = Color(0xFFFFFF);

    pub fn hex(value: u32) -> Self {
        Color(value & 0x00FF_FFFF)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Fonts compiled into the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFont {
    /// 12px, used by the battery label
    Book12,
    /// 26px default label font
    Book26,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRef {
    Builtin(BuiltinFont),
    Loaded(FontId),
}

/// Timer repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Indefinite,
    Times(u32),
}

impl Repeat {
    /// Negative counts repeat indefinitely
    pub fn from_count(count: i32) -> Self {
        u32::try_from(count).map_or(Repeat::Indefinite, Repeat::Times)
    }
}

/// Frame range and playback of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimSegment {
    pub start: u32,
    pub end: u32,
    pub fps: u32,
    pub looping: bool,
}

/// Header at the start of every icon asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageHeader {
    pub magic: u8,
    pub color_format: u8,
    pub flags: u16,
    pub width: u16,
    pub height: u16,
    pub stride: u16,
    pub reserved: u16,
}

impl ImageHeader {
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < IMAGE_HEADER_SIZE {
            return Err(EmoteError::Parse(format!(
                "image needs a {IMAGE_HEADER_SIZE}-byte header, got {} bytes",
                bytes.len()
            )));
        }
        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        Ok(ImageHeader {
            magic: bytes[0],
            color_format: bytes[1],
            flags: u16_at(2),
            width: u16_at(4),
            height: u16_at(6),
            stride: u16_at(8),
            reserved: u16_at(10),
        })
    }

    pub fn pack(&self) -> [u8; IMAGE_HEADER_SIZE] {
        let mut out = [0u8; IMAGE_HEADER_SIZE];
        out[0] = self.magic;
        out[1] = self.color_format;
        out[2..4].copy_from_slice(&self.flags.to_le_bytes());
        out[4..6].copy_from_slice(&self.width.to_le_bytes());
        out[6..8].copy_from_slice(&self.height.to_le_bytes());
        out[8..10].copy_from_slice(&self.stride.to_le_bytes());
        out[10..12].copy_from_slice(&self.reserved.to_le_bytes());
        out
    }
}

/// Image source: parsed header plus pixel data following it
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    pub header: ImageHeader,
    pub data: AssetBuffer,
}

impl ImageDescriptor {
    pub fn from_buffer(buffer: &AssetBuffer) -> Result<Self> {
        Ok(ImageDescriptor {
            header: ImageHeader::unpack(buffer.as_slice())?,
            data: buffer.tail(IMAGE_HEADER_SIZE)?,
        })
    }
}

/// Inclusive screen region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Parameters the engine is initialized with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxConfig {
    pub h_res: u32,
    pub v_res: u32,
    pub fps: u32,
    pub buf_pixels: u32,
    pub swap: bool,
    pub double_buffer: bool,
    pub buff_dma: bool,
}

/// Notifications produced while the engine advances
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    TimerFired(TimerId),
    /// A non-looping animation played its last frame
    AllFramesDone(ObjectId),
    /// A region is ready to present; the engine waits for `flush_ready`
    Flush { area: Area, data: Vec<u8> },
}

/// The rendering engine emote drives. Setters on unknown handles are ignored
/// by the engine; only creation and loading can fail.
pub trait Engine: Send {
    fn init(&mut self, config: &GfxConfig) -> Result<()>;
    fn deinit(&mut self);

    /// `Ok(None)` when the engine has no primitive for `kind`
    fn create_object(&mut self, kind: ObjectKind) -> Result<Option<ObjectId>>;
    fn delete_object(&mut self, id: ObjectId);
    fn set_visible(&mut self, id: ObjectId, visible: bool);
    fn is_visible(&self, id: ObjectId) -> bool;
    fn set_pos(&mut self, id: ObjectId, x: i32, y: i32);
    fn align(&mut self, id: ObjectId, align: Align, x: i32, y: i32);
    fn set_size(&mut self, id: ObjectId, width: u32, height: u32);
    fn set_bg_color(&mut self, color: Color);

    fn anim_set_src(&mut self, id: ObjectId, data: AssetBuffer);
    fn anim_set_segment(&mut self, id: ObjectId, segment: AnimSegment);
    fn anim_start(&mut self, id: ObjectId);
    fn anim_set_auto_mirror(&mut self, id: ObjectId, enabled: bool);

    fn img_set_src(&mut self, id: ObjectId, image: ImageDescriptor);

    fn label_set_text(&mut self, id: ObjectId, text: &str);
    fn label_set_color(&mut self, id: ObjectId, color: Color);
    fn label_set_text_align(&mut self, id: ObjectId, align: TextAlign);
    fn label_set_long_mode(&mut self, id: ObjectId, mode: LongMode);
    fn label_set_scroll_speed(&mut self, id: ObjectId, speed: u32);
    fn label_set_scroll_loop(&mut self, id: ObjectId, looping: bool);
    fn label_set_snap_loop(&mut self, id: ObjectId, looping: bool);
    fn label_set_snap_interval(&mut self, id: ObjectId, interval_ms: u32);
    fn label_set_font(&mut self, id: ObjectId, font: FontRef);

    fn qrcode_set_data(&mut self, id: ObjectId, text: &str);
    fn qrcode_set_size(&mut self, id: ObjectId, size: u32);

    fn font_load(&mut self, data: AssetBuffer) -> Result<FontId>;
    fn font_delete(&mut self, font: FontId);

    fn timer_create(&mut self, period_ms: u32) -> Result<TimerId>;
    fn timer_delete(&mut self, timer: TimerId);
    fn timer_pause(&mut self, timer: TimerId);
    fn timer_resume(&mut self, timer: TimerId);
    fn timer_is_running(&self, timer: TimerId) -> bool;
    fn timer_set_period(&mut self, timer: TimerId, period_ms: u32);
    fn timer_set_repeat(&mut self, timer: TimerId, repeat: Repeat);

    /// The caller finished presenting the last flushed region
    fn flush_ready(&mut self);

    /// Run timers and animations forward by `elapsed`
    fn advance(&mut self, elapsed: Duration) -> Vec<EngineEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_keywords() {
        assert_eq!(Align::from_keyword("GFX_ALIGN_TOP_MID"), Align::TopMid);
        assert_eq!(Align::from_keyword("bottom_right"), Align::BottomRight);
        assert_eq!(Align::from_keyword("GFX_ALIGN_OUT_RIGHT_BOTTOM"), Align::OutRightBottom);
        assert_eq!(Align::from_keyword("sideways"), Align::Default);
    }

    #[test]
    fn test_label_keywords() {
        assert_eq!(TextAlign::from_keyword("GFX_TEXT_ALIGN_LEFT"), TextAlign::Left);
        assert_eq!(TextAlign::from_keyword("center"), TextAlign::Center);
        assert_eq!(TextAlign::from_keyword("justify"), TextAlign::Center);
        assert_eq!(LongMode::from_keyword("GFX_LABEL_LONG_SCROLL"), LongMode::Scroll);
        assert_eq!(LongMode::from_keyword("GFX_LABEL_LONG_SNAP"), LongMode::Snap);
        assert_eq!(LongMode::from_keyword("clip"), LongMode::Clip);
        assert_eq!(LongMode::from_keyword("marquee"), LongMode::Clip);
    }

    #[test]
    fn test_repeat_from_count() {
        assert_eq!(Repeat::from_count(-1), Repeat::Indefinite);
        assert_eq!(Repeat::from_count(1), Repeat::Times(1));
    }

    #[test]
    fn test_image_descriptor_splits_header() {
        let header = ImageHeader { magic: 0x19, color_format: 0x12, width: 2, height: 1, stride: 4, ..Default::default() };
        let mut bytes = header.pack().to_vec();
        bytes.extend_from_slice(&[1, 2, 3, 4]);

        let image = ImageDescriptor::from_buffer(&AssetBuffer::owned(bytes)).unwrap();
        assert_eq!(image.header, header);
        assert_eq!(image.data.as_slice(), &[1, 2, 3, 4]);
        assert!(ImageDescriptor::from_buffer(&AssetBuffer::owned(vec![0; 4])).is_err());
    }
}
