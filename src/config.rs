//! Session configuration: display geometry, frame rate, buffering flags and
//! render task parameters.
//!
//! Values come from `Default`, an optional JSON file, then `EMOTE_*`
//! environment overrides, in that order.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::exceptions::{EmoteError, Result};
use crate::utils::{env_parse, is_env_true};

/// Highest frame rate accepted by `validate`
pub const MAX_FPS: u32 = 120;

/// Buffering and orientation flags handed to the rendering engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferFlags {
    /// Swap byte order of 16-bit pixels
    pub swap: bool,
    pub double_buffer: bool,
    pub buff_dma: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub h_res: u32,
    pub v_res: u32,
    pub fps: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            h_res: 360,
            v_res: 360,
            fps: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Pixels per draw buffer
    pub buf_pixels: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buf_pixels: 360 * 16,
        }
    }
}

/// Render task scheduling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub priority: u32,
    /// Stack size in bytes; 0 keeps the platform default
    pub stack: usize,
    /// Preferred core, -1 for no preference
    pub affinity: i32,
    pub stack_in_ext: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            priority: 5,
            stack: 16 * 1024,
            affinity: -1,
            stack_in_ext: false,
        }
    }
}

/// Top level configuration for an `Emote` session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmoteConfig {
    pub flags: BufferFlags,
    pub display: DisplayConfig,
    pub buffers: BufferConfig,
    pub task: TaskConfig,
    /// Toast shown through `evt_sys` once assets replace the boot animation
    pub boot_message: Option<String>,
}

impl Default for EmoteConfig {
    fn default() -> Self {
        Self {
            flags: BufferFlags::default(),
            display: DisplayConfig::default(),
            buffers: BufferConfig::default(),
            task: TaskConfig::default(),
            boot_message: Some("Starting...".to_string()),
        }
    }
}

impl EmoteConfig {
    /// Read a JSON config file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: EmoteConfig = serde_json::from_str(&raw)?;
        debug!("📋 Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `EMOTE_FPS`, `EMOTE_H_RES`, `EMOTE_V_RES` and `EMOTE_DOUBLE_BUFFER`
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(fps) = env_parse("EMOTE_FPS") {
            self.display.fps = fps;
        }
        if let Some(h_res) = env_parse("EMOTE_H_RES") {
            self.display.h_res = h_res;
        }
        if let Some(v_res) = env_parse("EMOTE_V_RES") {
            self.display.v_res = v_res;
        }
        if is_env_true("EMOTE_DOUBLE_BUFFER") {
            self.flags.double_buffer = true;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.h_res == 0 || self.display.v_res == 0 {
            return Err(EmoteError::InvalidArgument(format!(
                "display geometry must be non-zero, got {}x{}",
                self.display.h_res, self.display.v_res
            )));
        }
        if self.display.fps == 0 || self.display.fps > MAX_FPS {
            return Err(EmoteError::InvalidArgument(format!(
                "fps must be within 1..={MAX_FPS}, got {}",
                self.display.fps
            )));
        }
        if self.buffers.buf_pixels == 0 {
            return Err(EmoteError::InvalidArgument(
                "buf_pixels must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
