//! In-memory visual surface
//!
//! Keeps every proxy's transform and scene membership so native runs and
//! tests can inspect what would have been drawn.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use super::{Material, OrbitCamera, ProxyHandle, ProxyShape, VisualSurface};

/// Recorded state of one proxy
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRecord {
    pub shape: ProxyShape,
    pub material: Material,
    pub position: Vec3,
    pub orientation: Quat,
    pub in_scene: bool,
}

#[derive(Debug, Default)]
pub struct HeadlessSurface {
    proxies: BTreeMap<ProxyHandle, ProxyRecord>,
    next_id: u32,
    pub camera: OrbitCamera,
    pub debug_overlay: bool,
    pub frames_rendered: u64,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxy(&self, handle: ProxyHandle) -> Option<&ProxyRecord> {
        self.proxies.get(&handle)
    }

    /// Proxies currently in the scene
    pub fn scene_count(&self) -> usize {
        self.proxies.values().filter(|p| p.in_scene).count()
    }

    /// Proxies created and not yet removed
    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }
}

impl VisualSurface for HeadlessSurface {
    fn create_proxy(&mut self, shape: ProxyShape, material: Material) -> ProxyHandle {
        self.next_id += 1;
        let handle = ProxyHandle(self.next_id);
        self.proxies.insert(
            handle,
            ProxyRecord {
                shape,
                material,
                position: Vec3::ZERO,
                orientation: Quat::IDENTITY,
                in_scene: false,
            },
        );
        handle
    }

    fn set_position(&mut self, proxy: ProxyHandle, position: Vec3) {
        if let Some(p) = self.proxies.get_mut(&proxy) {
            p.position = position;
        }
    }

    fn set_orientation(&mut self, proxy: ProxyHandle, orientation: Quat) {
        if let Some(p) = self.proxies.get_mut(&proxy) {
            p.orientation = orientation;
        }
    }

    fn add_to_scene(&mut self, proxy: ProxyHandle) {
        if let Some(p) = self.proxies.get_mut(&proxy) {
            p.in_scene = true;
        }
    }

    fn remove_from_scene(&mut self, proxy: ProxyHandle) {
        self.proxies.remove(&proxy);
    }

    fn update_debug_overlay(&mut self, visible: bool) {
        self.debug_overlay = visible;
    }

    fn update_controls(&mut self, dt: f32) {
        self.camera.update(dt);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
    }

    fn render(&mut self) {
        self.frames_rendered += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_lifecycle() {
        let mut surface = HeadlessSurface::new();
        let p = surface.create_proxy(ProxyShape::Sphere { radius: 0.15 }, Material::Projectile);
        assert_eq!(surface.scene_count(), 0);

        surface.set_position(p, Vec3::new(1.0, 2.0, 3.0));
        surface.add_to_scene(p);
        assert_eq!(surface.scene_count(), 1);
        assert_eq!(surface.proxy(p).unwrap().position, Vec3::new(1.0, 2.0, 3.0));

        surface.remove_from_scene(p);
        surface.remove_from_scene(p);
        assert_eq!(surface.proxy_count(), 0);
    }
}
