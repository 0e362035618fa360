//! Core modules for the HOD room viewer.
//!
//! The crate probes the host for two runtime capabilities, selects which
//! model assets to load based on the verdict, and exposes the loading,
//! scene and rendering building blocks the viewer binary composes.
//! Everything except the windowed renderer is usable headless, which keeps
//! the decision logic easy to test.

pub mod app;
pub mod assets;
pub mod camera;
pub mod capability;
pub mod glb;
pub mod loader;
pub mod render;
pub mod scene;

pub use assets::AssetCatalog;
pub use camera::OrbitCamera;
pub use capability::{probe, CapabilityVerdict, EMPTY_MODULE_PREAMBLE};
pub use glb::{decode_glb, DecodeError, MeshData};
pub use loader::{LoadError, LoadEvent, Model, ModelLoader};
pub use render::{CameraParams, LightParams, Renderer};
pub use scene::SceneGraph;
