//! Scene objects and the rendering engine they live in

pub mod engine;
pub mod headless;
pub mod layout;
pub mod objects;
mod ui;

pub use engine::{Engine, EngineEvent, GfxConfig, ObjectId, ObjectKind, TimerId};
pub use headless::HeadlessEngine;
pub use layout::apply_layout;
pub use objects::{Element, SceneObjects};
