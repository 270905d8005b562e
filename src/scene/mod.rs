//! Visual surface interface
//!
//! Every simulated body the game tracks has a visual proxy on a
//! [`VisualSurface`]; the frame loop copies body transforms onto proxies.
//! [`HeadlessSurface`] records everything in memory (native builds, tests),
//! `CanvasSurface` draws to a browser canvas.

pub mod camera;
#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod headless;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

pub use camera::OrbitCamera;
#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;
pub use headless::HeadlessSurface;

/// Identity of a visual proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProxyHandle(pub u32);

/// Geometry of a proxy, in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProxyShape {
    Box { size: Vec3 },
    Sphere { radius: f32 },
    Plane { width: f32, depth: f32 },
}

/// Surface appearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Material {
    /// Matcap-shaded wall brick
    Brick,
    /// The launched ball
    Projectile,
    /// Hidden fill sphere tinted with the round color
    Fill { rgb: [f32; 3] },
    Floor,
}

impl Material {
    /// Flat fallback color for simple renderers
    pub fn base_rgb(&self) -> [f32; 3] {
        match self {
            Material::Brick => [0.78, 0.55, 0.42],
            Material::Projectile => [0.9, 0.9, 0.92],
            Material::Fill { rgb } => *rgb,
            Material::Floor => [0.93, 0.96, 1.0],
        }
    }
}

/// Rendering collaborator
pub trait VisualSurface {
    /// Create a proxy. It is not drawn until [`VisualSurface::add_to_scene`].
    fn create_proxy(&mut self, shape: ProxyShape, material: Material) -> ProxyHandle;

    fn set_position(&mut self, proxy: ProxyHandle, position: Vec3);

    fn set_orientation(&mut self, proxy: ProxyHandle, orientation: Quat);

    fn add_to_scene(&mut self, proxy: ProxyHandle);

    /// Remove and forget a proxy. No-op for unknown handles.
    fn remove_from_scene(&mut self, proxy: ProxyHandle);

    /// Show or hide collider outlines
    fn update_debug_overlay(&mut self, visible: bool);

    /// Advance camera controls (damping, orbit)
    fn update_controls(&mut self, dt: f32);

    /// Viewport size changed
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self);
}
