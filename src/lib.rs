//! Minimal real-time viewer for textured OBJ models.
//!
//! The crate splits into a CPU side and a GPU side: [`loader`] imports
//! OBJ/MTL geometry into plain data, [`model`] uploads it into owned GPU
//! handles, and [`render`] drives the per-frame pipeline. [`app`] wires the
//! window event loop, [`camera`] and [`input`] together. Everything except
//! the GPU upload path is testable headlessly.

pub mod app;
pub mod camera;
pub mod config;
pub mod input;
pub mod loader;
pub mod model;
pub mod render;
pub mod texture;

pub use app::{advance_camera, App, FrameClock};
pub use camera::Camera;
pub use config::{Bindings, ViewerConfig};
pub use input::{InputState, KeyCode, MouseButton, NamedKey};
pub use loader::{load_obj, MaterialData, MeshData, ModelData, Vertex};
pub use model::{Material, Mesh, Model, ResourceError};
pub use render::{load_shader, CameraParams, LightParams, RenderError, Renderer, DEFAULT_SHADER};
pub use texture::{Texture, TextureKind};
