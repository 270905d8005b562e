//! Narrow-phase contact generation
//!
//! Supported pairs: sphere–sphere, sphere–cuboid (closest point in the box
//! frame) and cuboid–cuboid (separating axes with face clipping). Contact
//! normals always point from the first body toward the second.

use glam::{Quat, Vec3};

use super::{RigidBody, Shape};

/// Single contact point between two bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World-space contact point
    pub point: Vec3,
    /// Unit normal pointing from body A toward body B
    pub normal: Vec3,
    /// Overlap depth along the normal (> 0)
    pub penetration: f32,
}

impl Contact {
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// All contacts between `a` and `b` (empty when they do not touch)
pub fn find_contacts(a: &RigidBody, b: &RigidBody) -> Vec<Contact> {
    // Cheap bounding-sphere rejection first
    let reach = a.shape.bounding_radius() + b.shape.bounding_radius();
    if (b.position - a.position).length_squared() > reach * reach {
        return Vec::new();
    }

    match (a.shape, b.shape) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            sphere_sphere(a.position, ra, b.position, rb)
                .into_iter()
                .collect()
        }
        (Shape::Sphere { radius }, Shape::Cuboid { half_extents }) => {
            // Box→sphere normal is B→A here, so flip it
            sphere_cuboid(a.position, radius, b.position, b.orientation, half_extents)
                .map(Contact::flipped)
                .into_iter()
                .collect()
        }
        (Shape::Cuboid { half_extents }, Shape::Sphere { radius }) => {
            sphere_cuboid(b.position, radius, a.position, a.orientation, half_extents)
                .into_iter()
                .collect()
        }
        (Shape::Cuboid { half_extents: ha }, Shape::Cuboid { half_extents: hb }) => {
            cuboid_cuboid(
                &Obb::new(a.position, a.orientation, ha),
                &Obb::new(b.position, b.orientation, hb),
            )
        }
    }
}

fn sphere_sphere(pa: Vec3, ra: f32, pb: Vec3, rb: f32) -> Option<Contact> {
    let delta = pb - pa;
    let dist = delta.length();
    let penetration = ra + rb - dist;
    if penetration <= 0.0 {
        return None;
    }
    // Coincident centres: pick an arbitrary separating axis
    let normal = if dist > 1e-6 { delta / dist } else { Vec3::Y };
    Some(Contact {
        point: pa + normal * (ra - penetration * 0.5),
        normal,
        penetration,
    })
}

/// Contact between a sphere and a box, normal pointing from the box to the sphere
fn sphere_cuboid(
    center: Vec3,
    radius: f32,
    box_pos: Vec3,
    box_rot: Quat,
    half: Vec3,
) -> Option<Contact> {
    let local = box_rot.inverse() * (center - box_pos);
    let clamped = local.clamp(-half, half);
    let diff = local - clamped;
    let dist_sq = diff.length_squared();

    if dist_sq > 1e-12 {
        // Centre outside the box
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        return Some(Contact {
            point: box_pos + box_rot * clamped,
            normal: box_rot * (diff / dist),
            penetration: radius - dist,
        });
    }

    // Centre inside the box: push out through the nearest face
    let (axis, depth) = nearest_face(local, half);
    let normal_local = axis * local.dot(axis).signum();
    let surface_local = local + normal_local * depth;
    Some(Contact {
        point: box_pos + box_rot * surface_local,
        normal: box_rot * normal_local,
        penetration: radius + depth,
    })
}

/// Separating-axis test over the 15 candidate axes, then contact points
///
/// Face axes produce a clipped contact patch; edge axes a single point.
/// Face axes win ties so resting stacks keep a flat patch.
fn cuboid_cuboid(a: &Obb, b: &Obb) -> Vec<Contact> {
    let d = b.center - a.center;
    // Overlap along `axis`, with the axis turned to point from A to B
    let overlap_along = |axis: Vec3| {
        let n = if axis.dot(d) < 0.0 { -axis } else { axis };
        (a.radius_along(n) + b.radius_along(n) - d.dot(n), n)
    };

    let mut face_a = (f32::INFINITY, Vec3::Y, 0);
    let mut face_b = (f32::INFINITY, Vec3::Y, 0);
    for i in 0..3 {
        let (overlap, n) = overlap_along(a.axes[i]);
        if overlap <= 0.0 {
            return Vec::new();
        }
        if overlap < face_a.0 {
            face_a = (overlap, n, i);
        }
        let (overlap, n) = overlap_along(b.axes[i]);
        if overlap <= 0.0 {
            return Vec::new();
        }
        if overlap < face_b.0 {
            face_b = (overlap, n, i);
        }
    }

    let mut edge: Option<(f32, Vec3, usize, usize)> = None;
    for i in 0..3 {
        for j in 0..3 {
            let cross = a.axes[i].cross(b.axes[j]);
            let len = cross.length();
            if len < PARALLEL_EPSILON {
                continue;
            }
            let (overlap, n) = overlap_along(cross / len);
            if overlap <= 0.0 {
                return Vec::new();
            }
            if edge.is_none_or(|(best, ..)| overlap < best) {
                edge = Some((overlap, n, i, j));
            }
        }
    }

    // Contact normal is always the A→B axis; B as reference clips against -n
    let (overlap, normal, points) = if clearly_less(face_b.0, face_a.0) {
        (face_b.0, face_b.1, clip_faces(b, face_b.2, -face_b.1, a))
    } else {
        (face_a.0, face_a.1, clip_faces(a, face_a.2, face_a.1, b))
    };

    if let Some((edge_overlap, edge_normal, i, j)) = edge {
        if clearly_less(edge_overlap, overlap) || points.is_empty() {
            return vec![edge_contact(a, i, b, j, edge_normal, edge_overlap)];
        }
    }

    if points.is_empty() {
        return vec![Contact {
            point: (a.center + b.center) * 0.5,
            normal,
            penetration: overlap,
        }];
    }

    points
        .into_iter()
        .map(|(point, penetration)| Contact {
            point,
            normal,
            penetration,
        })
        .collect()
}

/// Cross products shorter than this come from (nearly) parallel edges
const PARALLEL_EPSILON: f32 = 1e-3;
/// A later axis must beat the current one by this factor and margin
const RELATIVE_TOLERANCE: f32 = 0.98;
const ABSOLUTE_TOLERANCE: f32 = 1e-3;

fn clearly_less(candidate: f32, current: f32) -> bool {
    candidate < current * RELATIVE_TOLERANCE - ABSOLUTE_TOLERANCE
}

/// Oriented box in world space
#[derive(Debug, Clone, Copy)]
struct Obb {
    center: Vec3,
    axes: [Vec3; 3],
    half: [f32; 3],
}

impl Obb {
    fn new(center: Vec3, rotation: Quat, half: Vec3) -> Self {
        Self {
            center,
            axes: [rotation * Vec3::X, rotation * Vec3::Y, rotation * Vec3::Z],
            half: half.to_array(),
        }
    }

    /// Half-length of the box's shadow on `axis`
    fn radius_along(&self, axis: Vec3) -> f32 {
        (0..3).map(|i| self.half[i] * self.axes[i].dot(axis).abs()).sum()
    }

    /// Index of the axis most parallel (or anti-parallel) to `dir`
    fn most_aligned(&self, dir: Vec3) -> usize {
        let alignment = |i: usize| self.axes[i].dot(dir).abs();
        (1..3).fold(0, |best, i| if alignment(i) > alignment(best) { i } else { best })
    }
}

/// Clip the incident box's most opposed face against the reference face
///
/// `normal` is the reference face's outward normal, pointing at the
/// incident box. Returns points midway between the two surfaces and their
/// depth; points in front of the reference face are dropped.
fn clip_faces(reference: &Obb, face: usize, normal: Vec3, incident: &Obb) -> Vec<(Vec3, f32)> {
    let face_center = reference.center + normal * reference.half[face];

    let m = incident.most_aligned(normal);
    let side = if incident.axes[m].dot(normal) > 0.0 { -1.0 } else { 1.0 };
    let incident_center = incident.center + incident.axes[m] * (side * incident.half[m]);
    let (iu, iv) = ((m + 1) % 3, (m + 2) % 3);
    let eu = incident.axes[iu] * incident.half[iu];
    let ev = incident.axes[iv] * incident.half[iv];
    let mut polygon = vec![
        incident_center + eu + ev,
        incident_center - eu + ev,
        incident_center - eu - ev,
        incident_center + eu - ev,
    ];

    for k in [(face + 1) % 3, (face + 2) % 3] {
        let axis = reference.axes[k];
        let offset = axis.dot(face_center);
        polygon = clip(&polygon, axis, offset + reference.half[k]);
        polygon = clip(&polygon, -axis, -offset + reference.half[k]);
    }

    polygon
        .into_iter()
        .filter_map(|p| {
            let separation = normal.dot(p - face_center);
            (separation < 0.0).then(|| (p - normal * (separation * 0.5), -separation))
        })
        .collect()
}

/// Sutherland–Hodgman step: keep the part of `polygon` where `plane · p <= offset`
fn clip(polygon: &[Vec3], plane: Vec3, offset: f32) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let da = plane.dot(a) - offset;
        let db = plane.dot(b) - offset;
        if da <= 0.0 {
            out.push(a);
        }
        if (da < 0.0 && db > 0.0) || (da > 0.0 && db < 0.0) {
            out.push(a + (b - a) * (da / (da - db)));
        }
    }
    out
}

/// Closest points between A's edge along axis `i` and B's edge along axis `j`
fn edge_contact(a: &Obb, i: usize, b: &Obb, j: usize, normal: Vec3, penetration: f32) -> Contact {
    // The edge of A furthest along the normal meets the edge of B furthest against it
    let mut on_a = a.center;
    let mut on_b = b.center;
    for k in 0..3 {
        if k != i {
            on_a += a.axes[k] * (a.half[k] * sign(a.axes[k].dot(normal)));
        }
        if k != j {
            on_b -= b.axes[k] * (b.half[k] * sign(b.axes[k].dot(normal)));
        }
    }

    let (da, db) = (a.axes[i], b.axes[j]);
    let r = on_a - on_b;
    let cos = da.dot(db);
    let denom = 1.0 - cos * cos;
    let (s, t) = if denom > 1e-6 {
        let (ra, rb) = (da.dot(r), db.dot(r));
        ((cos * rb - ra) / denom, (rb - cos * ra) / denom)
    } else {
        (0.0, 0.0)
    };
    let s = s.clamp(-a.half[i], a.half[i]);
    let t = t.clamp(-b.half[j], b.half[j]);

    Contact {
        point: (on_a + da * s + on_b + db * t) * 0.5,
        normal,
        penetration,
    }
}

#[inline]
fn sign(x: f32) -> f32 {
    if x < 0.0 { -1.0 } else { 1.0 }
}

/// Axis of the face closest to a point inside the box, and the distance to it
fn nearest_face(local: Vec3, half: Vec3) -> (Vec3, f32) {
    let depth = half - local.abs();
    if depth.x <= depth.y && depth.x <= depth.z {
        (Vec3::X, depth.x)
    } else if depth.y <= depth.z {
        (Vec3::Y, depth.y)
    } else {
        (Vec3::Z, depth.z)
    }
}
