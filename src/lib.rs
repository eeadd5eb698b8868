//! Emote - asset-driven expression display runtime
//!
//! This crate loads expression assets (animations, icons, a font and a
//! layout manifest) from a checksummed container, builds the scene on a
//! rendering engine, and routes runtime events and timed dialogs to it.

// Enforce strict code quality and reliability
#![deny(
    // Safety
    unsafe_code,

    // Correctness
    missing_debug_implementations,

    // Future compatibility
    future_incompatible,

    // Rust 2018 idioms
    rust_2018_idioms,
)]
#![warn(
    // Error handling best practices
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_enum_variant,

    // Code clarity and maintainability
    clippy::cognitive_complexity,
    clippy::type_complexity,

    // Best practices
    clippy::clone_on_ref_ptr,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::if_not_else,
    clippy::needless_continue,
    clippy::explicit_iter_loop,
    clippy::explicit_into_iter_loop,
)]
#![allow(missing_docs, clippy::too_many_arguments)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod assets;
pub mod config;
pub mod dialog;
pub mod emote;
pub mod events;
pub mod exceptions;
pub mod exit_codes;
pub mod logger;
pub mod scene;
pub mod session;
pub mod signal;
pub mod utils;
pub mod version;

// Re-export the session API
pub use assets::{AssetSource, LoadReport, PartitionTable};
pub use config::EmoteConfig;
pub use emote::{Callbacks, Emote, FlushNotifier, FlushRegion, RenderTask, UpdateEvent};
pub use events::{EmoteEvent, RuntimeStatus};
pub use exceptions::{EmoteError, Result};
pub use scene::{Element, Engine, HeadlessEngine, ObjectKind};
pub use signal::DialogWait;
