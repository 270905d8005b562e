//! Browser canvas surface
//!
//! Painter's-algorithm renderer on a 2D canvas context: proxies are sorted
//! far to near, boxes draw their camera-facing faces with simple diffuse
//! shading, spheres draw as discs.

use std::collections::BTreeMap;

use glam::{Quat, Vec2, Vec3};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::{Material, OrbitCamera, ProxyHandle, ProxyShape, VisualSurface};

const CLEAR_COLOR: &str = "#edf5ff";
const LIGHT_DIR: Vec3 = Vec3::new(0.4, 0.8, 0.45);

struct CanvasProxy {
    shape: ProxyShape,
    material: Material,
    position: Vec3,
    orientation: Quat,
    in_scene: bool,
}

pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
    width: f32,
    height: f32,
    proxies: BTreeMap<ProxyHandle, CanvasProxy>,
    next_id: u32,
    pub camera: OrbitCamera,
    debug_overlay: bool,
}

impl CanvasSurface {
    /// Wrap a canvas; `None` if a 2D context is unavailable
    pub fn new(canvas: &HtmlCanvasElement) -> Option<Self> {
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        let width = canvas.width();
        let height = canvas.height();
        let mut camera = OrbitCamera::default();
        camera.set_viewport(width, height);
        Some(Self {
            ctx,
            width: width as f32,
            height: height as f32,
            proxies: BTreeMap::new(),
            next_id: 0,
            camera,
            debug_overlay: false,
        })
    }

    fn to_pixels(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        )
    }

    fn project(&self, point: Vec3) -> Option<Vec2> {
        self.camera.project(point).map(|(ndc, _)| self.to_pixels(ndc))
    }

    fn fill_polygon(&self, points: &[Vec2], rgb: [f32; 3], shade: f32) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.ctx.begin_path();
        self.ctx.move_to(first.x as f64, first.y as f64);
        for p in rest {
            self.ctx.line_to(p.x as f64, p.y as f64);
        }
        self.ctx.close_path();
        self.ctx.set_fill_style_str(&css_rgb(rgb, shade));
        self.ctx.fill();
        if self.debug_overlay {
            self.ctx.set_stroke_style_str("#00ff00");
            self.ctx.stroke();
        }
    }

    fn draw_box(&self, proxy: &CanvasProxy, size: Vec3) {
        let half = size * 0.5;
        let eye = self.camera.eye();
        let rgb = proxy.material.base_rgb();

        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            for sign in [-1.0f32, 1.0] {
                let normal = proxy.orientation * (axis * sign);
                let face_center = proxy.position + normal * half.dot(axis);
                if normal.dot(eye - face_center) <= 0.0 {
                    continue;
                }
                let (u, v) = face_axes(axis);
                let corners: Option<Vec<Vec2>> = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                    .iter()
                    .map(|(su, sv)| {
                        let local = axis * sign * half + u * half * *su + v * half * *sv;
                        self.project(proxy.position + proxy.orientation * local)
                    })
                    .collect();
                if let Some(corners) = corners {
                    let shade = 0.45 + 0.55 * normal.dot(LIGHT_DIR.normalize()).max(0.0);
                    self.fill_polygon(&corners, rgb, shade);
                }
            }
        }
    }

    fn draw_sphere(&self, proxy: &CanvasProxy, radius: f32) {
        let Some((ndc, depth)) = self.camera.project(proxy.position) else {
            return;
        };
        let center = self.to_pixels(ndc);
        let f = 1.0 / (self.camera.fov_y * 0.5).tan();
        let px_radius = radius * f / depth * self.height * 0.5;

        self.ctx.begin_path();
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            px_radius.max(0.5) as f64,
            0.0,
            std::f64::consts::TAU,
        );
        self.ctx.set_fill_style_str(&css_rgb(proxy.material.base_rgb(), 1.0));
        self.ctx.fill();
        if self.debug_overlay {
            self.ctx.set_stroke_style_str("#00ff00");
            self.ctx.stroke();
        }
    }

    fn draw_plane(&self, proxy: &CanvasProxy, width: f32, depth: f32) {
        let hw = width * 0.5;
        let hd = depth * 0.5;
        let corners: Option<Vec<Vec2>> = [(-hw, -hd), (hw, -hd), (hw, hd), (-hw, hd)]
            .iter()
            .map(|(x, z)| self.project(proxy.position + proxy.orientation * Vec3::new(*x, 0.0, *z)))
            .collect();
        if let Some(corners) = corners {
            self.fill_polygon(&corners, proxy.material.base_rgb(), 0.9);
        }
    }
}

/// The two in-face axes for a face whose normal is `axis`
fn face_axes(axis: Vec3) -> (Vec3, Vec3) {
    if axis == Vec3::X {
        (Vec3::Y, Vec3::Z)
    } else if axis == Vec3::Y {
        (Vec3::X, Vec3::Z)
    } else {
        (Vec3::X, Vec3::Y)
    }
}

fn css_rgb(rgb: [f32; 3], shade: f32) -> String {
    let c = |v: f32| ((v * shade).clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("rgb({},{},{})", c(rgb[0]), c(rgb[1]), c(rgb[2]))
}

impl VisualSurface for CanvasSurface {
    fn create_proxy(&mut self, shape: ProxyShape, material: Material) -> ProxyHandle {
        self.next_id += 1;
        let handle = ProxyHandle(self.next_id);
        self.proxies.insert(
            handle,
            CanvasProxy {
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
        self.width = width as f32;
        self.height = height as f32;
        self.camera.set_viewport(width, height);
    }

    fn render(&mut self) {
        self.ctx.set_fill_style_str(CLEAR_COLOR);
        self.ctx
            .fill_rect(0.0, 0.0, self.width as f64, self.height as f64);

        let eye = self.camera.eye();
        let mut order: Vec<(&CanvasProxy, f32)> = self
            .proxies
            .values()
            .filter(|p| p.in_scene)
            .map(|p| {
                // Floor always first, everything else far to near
                let depth = match p.shape {
                    ProxyShape::Plane { .. } => f32::INFINITY,
                    _ => (p.position - eye).length(),
                };
                (p, depth)
            })
            .collect();
        order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        for (proxy, _) in order {
            match proxy.shape {
                ProxyShape::Box { size } => self.draw_box(proxy, size),
                ProxyShape::Sphere { radius } => self.draw_sphere(proxy, radius),
                ProxyShape::Plane { width, depth } => self.draw_plane(proxy, width, depth),
            }
        }
    }
}
