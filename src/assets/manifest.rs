// src/assets/manifest.rs
// Manifest (index.json) document model
//
// Sections are kept as raw JSON values so that one malformed entry can be
// skipped without rejecting the whole document. Optional values of the wrong
// type are treated as absent.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::exceptions::{EmoteError, Result};

/// Decode an optional value, falling back to its default on a type mismatch
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(&value).unwrap_or_else(|e| {
        warn!("⚠️ Ignoring manifest value {value}: {e}");
        T::default()
    }))
}

/// Parsed manifest; transient, dropped after the load pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, deserialize_with = "lenient")]
    pub emoji_collection: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub icon_collection: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub layout: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub text_font: Option<String>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| EmoteError::Parse(format!("manifest: {e}")))
    }
}

/// Playback options attached to an emoji entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EafOptions {
    #[serde(default, rename = "loop", deserialize_with = "lenient")]
    pub looping: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub fps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiEntry {
    pub name: String,
    pub file: String,
    #[serde(default, deserialize_with = "lenient")]
    pub eaf: Option<EafOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconEntry {
    pub name: String,
    pub file: String,
}

/// Closed set of layout entry types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Anim,
    Image,
    Label,
    Timer,
    Qrcode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimOptions {
    /// "auto" or "true" enables mirrored rendering
    #[serde(default, deserialize_with = "lenient")]
    pub mirror: Option<String>,
}

impl AnimOptions {
    pub fn auto_mirror(&self) -> bool {
        matches!(self.mirror.as_deref(), Some("auto") | Some("true"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongModeOptions {
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub mode: Option<String>,
    #[serde(default, rename = "loop", deserialize_with = "lenient")]
    pub looping: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub speed: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub snap_interval: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOptions {
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub text_align: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub long_mode: Option<LongModeOptions>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerOptions {
    #[serde(default, deserialize_with = "lenient")]
    pub period: Option<u32>,
    /// Negative means repeat indefinitely
    #[serde(default, deserialize_with = "lenient")]
    pub repeat_count: Option<i32>,
}

/// One `layout` entry. Placement fields are optional at this level so that
/// their absence is reported per entry by the layout engine; a placement of
/// the wrong type still rejects the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    #[serde(rename = "type")]
    pub kind: LayoutKind,
    pub name: String,
    #[serde(default)]
    pub align: Option<String>,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub anim: Option<AnimOptions>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<LabelOptions>,
    #[serde(default, deserialize_with = "lenient")]
    pub timer: Option<TimerOptions>,
}

/// Decode one raw section entry
pub fn decode_entry<T: for<'de> Deserialize<'de>>(value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| EmoteError::Parse(e.to_string()))
}

/// Best-effort display name of a raw entry, for skip reports
pub fn entry_label(value: &Value) -> String {
    value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string()
}
