//! Paired body/proxy creation and removal
//!
//! Every entity the game tracks is a simulated body plus the visual proxy
//! mirroring it. This module creates them from layout data and releases
//! them again; the reveal coordinator decides when.

use glam::Vec3;

use super::layout::LayoutCell;
use super::state::PairedEntity;
use crate::physics::{BodyDesc, Shape, Simulation};
use crate::scene::{Material, ProxyShape, VisualSurface};
use crate::tuning::FillTuning;

/// Create a body and its proxy at `desc.position`; neither is added yet
pub fn spawn(
    sim: &mut dyn Simulation,
    surface: &mut dyn VisualSurface,
    desc: BodyDesc,
    material: Material,
) -> PairedEntity {
    let shape = match desc.shape {
        Shape::Sphere { radius } => ProxyShape::Sphere { radius },
        Shape::Cuboid { half_extents } => ProxyShape::Box {
            size: half_extents * 2.0,
        },
    };
    let body = sim.create_body(desc);
    let proxy = surface.create_proxy(shape, material);
    surface.set_position(proxy, desc.position);
    PairedEntity::new(proxy, body)
}

/// Make an entity physically and visually present
pub fn activate(sim: &mut dyn Simulation, surface: &mut dyn VisualSurface, entity: &PairedEntity) {
    sim.add_body(entity.body);
    surface.add_to_scene(entity.proxy);
}

/// Detach an entity's listener and remove it from both worlds
pub fn release(sim: &mut dyn Simulation, surface: &mut dyn VisualSurface, entity: &PairedEntity) {
    if let Some(listener) = entity.listener {
        sim.off_collide(listener);
    }
    sim.remove_body(entity.body);
    surface.remove_from_scene(entity.proxy);
}

/// One dynamic brick per layout cell, in layout order
///
/// Creates `min(count, layout.len())` bricks; running out of layout is a
/// defined truncation, not an error.
pub fn instantiate_boxes(
    sim: &mut dyn Simulation,
    surface: &mut dyn VisualSurface,
    layout: &[LayoutCell],
    count: usize,
    size: Vec3,
    mass: f32,
) -> Vec<PairedEntity> {
    if count > layout.len() {
        log::debug!(
            "Requested {} bricks but layout has {} cells; truncating",
            count,
            layout.len()
        );
    }

    layout
        .iter()
        .take(count)
        .map(|cell| {
            let entity = spawn(
                sim,
                surface,
                BodyDesc {
                    mass,
                    position: cell.position(),
                    shape: Shape::Cuboid {
                        half_extents: size * 0.5,
                    },
                },
                Material::Brick,
            );
            activate(sim, surface, &entity);
            entity
        })
        .collect()
}

/// Grid centres of the fill spheres, x fastest, then y, then z
pub fn fill_positions(fill: &FillTuning) -> Vec<Vec3> {
    let [nx, ny, _] = fill.counts.map(|c| c as usize);
    let layer = nx * ny;
    let r = fill.radius;
    let d = 2.0 * r;
    let shift_x = d - nx as f32 * r;

    (0..fill.total())
        .map(|i| {
            let ix = i % nx;
            let iy = (i % layer) / nx;
            let iz = i / layer;
            Vec3::new(
                -r + ix as f32 * d + shift_x,
                r + iy as f32 * d,
                -r + iz as f32 * d + fill.shift_z,
            )
        })
        .collect()
}

/// Hidden fill spheres tinted `rgb`
///
/// Bodies and proxies are created but neither is added; the reveal makes
/// them present. Every `sound_every`-th sphere gets a collision listener
/// for drop sounds.
pub fn instantiate_fill_spheres(
    sim: &mut dyn Simulation,
    surface: &mut dyn VisualSurface,
    fill: &FillTuning,
    rgb: [f32; 3],
) -> Vec<PairedEntity> {
    fill_positions(fill)
        .into_iter()
        .enumerate()
        .map(|(i, position)| {
            let mut entity = spawn(
                sim,
                surface,
                BodyDesc {
                    mass: fill.mass,
                    position,
                    shape: Shape::Sphere {
                        radius: fill.radius,
                    },
                },
                Material::Fill { rgb },
            );
            if fill.sound_every > 0 && i % fill.sound_every as usize == 0 {
                entity.listener = Some(sim.on_collide(entity.body));
            }
            entity
        })
        .collect()
}

/// Release every brick and sphere and clear both collections
///
/// Safe on empty collections and when called repeatedly.
pub fn release_all(
    sim: &mut dyn Simulation,
    surface: &mut dyn VisualSurface,
    boxes: &mut Vec<PairedEntity>,
    spheres: &mut Vec<PairedEntity>,
) {
    for entity in boxes.drain(..).chain(spheres.drain(..)) {
        release(sim, surface, &entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::World;
    use crate::scene::HeadlessSurface;
    use crate::sim::layout::generate_wall_layout;

    #[test]
    fn test_boxes_follow_layout_and_truncate() {
        let mut world = World::default();
        let mut surface = HeadlessSurface::new();
        let layout = generate_wall_layout(2, 3, Vec3::ZERO, Vec3::splat(0.5));

        let boxes = instantiate_boxes(&mut world, &mut surface, &layout, 10, Vec3::splat(0.5), 1.0);
        assert_eq!(boxes.len(), 6);
        assert_eq!(world.body_count(), 6);
        assert_eq!(surface.scene_count(), 6);
        for (entity, cell) in boxes.iter().zip(&layout) {
            assert_eq!(world.body_state(entity.body).unwrap().position, cell.position());
            assert_eq!(surface.proxy(entity.proxy).unwrap().position, cell.position());
        }

        let fewer = instantiate_boxes(&mut world, &mut surface, &layout, 4, Vec3::splat(0.5), 1.0);
        assert_eq!(fewer.len(), 4);
    }

    #[test]
    fn test_fill_grid_matches_original_layout() {
        let fill = FillTuning::default();
        let positions = fill_positions(&fill);
        assert_eq!(positions.len(), 90);

        let first = positions[0];
        assert!((first - Vec3::new(-0.6, 0.15, -1.05)).length() < 1e-5);
        // Sixth sphere starts the second row up
        assert!((positions[5] - Vec3::new(-0.6, 0.45, -1.05)).length() < 1e-5);
        // Thirty-first starts the second layer back
        assert!((positions[30] - Vec3::new(-0.6, 0.15, -0.75)).length() < 1e-5);
        assert!((positions[4].x - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_fill_spheres_start_hidden() {
        let mut world = World::default();
        let mut surface = HeadlessSurface::new();
        let spheres =
            instantiate_fill_spheres(&mut world, &mut surface, &FillTuning::default(), [0.0, 0.5, 1.0]);

        assert_eq!(spheres.len(), 90);
        assert_eq!(world.body_count(), 0);
        assert_eq!(surface.scene_count(), 0);
        assert_eq!(surface.proxy_count(), 90);
        assert_eq!(spheres.iter().filter(|s| s.listener.is_some()).count(), 18);
        assert!(spheres[0].listener.is_some());
        assert!(spheres[1].listener.is_none());
    }

    #[test]
    fn test_release_all_is_idempotent() {
        let mut world = World::default();
        let mut surface = HeadlessSurface::new();
        let layout = generate_wall_layout(2, 2, Vec3::ZERO, Vec3::splat(0.5));
        let mut boxes = instantiate_boxes(&mut world, &mut surface, &layout, 4, Vec3::splat(0.5), 1.0);
        let mut spheres =
            instantiate_fill_spheres(&mut world, &mut surface, &FillTuning::default(), [1.0; 3]);

        release_all(&mut world, &mut surface, &mut boxes, &mut spheres);
        assert!(boxes.is_empty() && spheres.is_empty());
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.collide_subscription_count(), 0);
        assert_eq!(surface.proxy_count(), 0);

        release_all(&mut world, &mut surface, &mut boxes, &mut spheres);
        assert!(boxes.is_empty() && spheres.is_empty());
    }
}
