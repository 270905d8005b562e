//! Rigid body state and integration

use glam::{Mat3, Quat, Vec3};

use super::{BodyDesc, BodyState, Shape};

/// Angular velocity damping per step (keeps resting stacks from spinning up)
const ANGULAR_DAMPING: f32 = 0.01;

/// Rigid Body - moves as a single unit
#[derive(Debug, Clone)]
pub struct RigidBody {
    // === Physics State ===
    /// World position (center of mass)
    pub position: Vec3,
    pub orientation: Quat,
    /// Linear velocity (m/s)
    pub velocity: Vec3,
    /// Angular velocity (rad/s, world axes)
    pub angular_velocity: Vec3,
    /// Force accumulated since the last step
    pub force: Vec3,

    // === Mass Properties ===
    pub mass: f32,
    pub inv_mass: f32,
    /// Inverse principal moments of inertia (body axes)
    pub inv_inertia: Vec3,

    pub shape: Shape,
    /// Part of the simulated world?
    pub in_world: bool,
}

impl RigidBody {
    pub fn new(desc: &BodyDesc) -> Self {
        let mass = desc.mass.max(0.0);
        let inv_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };

        let inertia = match desc.shape {
            // Solid sphere: I = 2/5 m r²
            Shape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            // Solid cuboid with half extents h: I_x = m/3 (h_y² + h_z²)
            Shape::Cuboid { half_extents: h } => Vec3::new(
                mass / 3.0 * (h.y * h.y + h.z * h.z),
                mass / 3.0 * (h.x * h.x + h.z * h.z),
                mass / 3.0 * (h.x * h.x + h.y * h.y),
            ),
        };
        let inv_inertia = Vec3::new(
            if inertia.x > 0.0 { 1.0 / inertia.x } else { 0.0 },
            if inertia.y > 0.0 { 1.0 / inertia.y } else { 0.0 },
            if inertia.z > 0.0 { 1.0 / inertia.z } else { 0.0 },
        );

        Self {
            position: desc.position,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            mass,
            inv_mass,
            inv_inertia,
            shape: desc.shape,
            in_world: false,
        }
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }

    /// Inverse inertia tensor in world axes: R · I⁻¹ · Rᵀ
    pub fn inv_inertia_world(&self) -> Mat3 {
        let r = Mat3::from_quat(self.orientation);
        r * Mat3::from_diagonal(self.inv_inertia) * r.transpose()
    }

    /// Velocity of a point at `offset` from the centre of mass
    #[inline]
    pub fn velocity_at(&self, offset: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(offset)
    }

    /// Apply a world-space impulse at `offset` from the centre of mass
    pub fn apply_impulse(&mut self, impulse: Vec3, offset: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world() * offset.cross(impulse);
    }

    /// Semi-implicit Euler, velocity half
    pub fn integrate_velocity(&mut self, gravity: Vec3, dt: f32) {
        if self.is_static() {
            return;
        }
        self.velocity += (gravity + self.force * self.inv_mass) * dt;
        self.angular_velocity *= 1.0 - ANGULAR_DAMPING;
    }

    /// Semi-implicit Euler, position half
    pub fn integrate_position(&mut self, dt: f32) {
        if self.is_static() {
            return;
        }
        self.position += self.velocity * dt;
        let spin = Quat::from_scaled_axis(self.angular_velocity * dt);
        self.orientation = (spin * self.orientation).normalize();
    }

    pub fn state(&self) -> BodyState {
        BodyState {
            position: self.position,
            orientation: self.orientation,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(mass: f32) -> RigidBody {
        RigidBody::new(&BodyDesc {
            mass,
            position: Vec3::ZERO,
            shape: Shape::Sphere { radius: 0.5 },
        })
    }

    #[test]
    fn test_static_body_ignores_impulses() {
        let mut body = sphere(0.0);
        assert!(body.is_static());
        body.apply_impulse(Vec3::X * 10.0, Vec3::ZERO);
        body.integrate_velocity(Vec3::NEG_Y * 9.82, 0.1);
        body.integrate_position(0.1);
        assert_eq!(body.velocity, Vec3::ZERO);
        assert_eq!(body.position, Vec3::ZERO);
    }

    #[test]
    fn test_central_impulse_has_no_spin() {
        let mut body = sphere(2.0);
        body.apply_impulse(Vec3::new(0.0, 0.0, -4.0), Vec3::ZERO);
        assert_eq!(body.velocity, Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_offset_impulse_spins() {
        let mut body = sphere(1.0);
        body.apply_impulse(Vec3::X, Vec3::Y * 0.5);
        assert!(body.angular_velocity.length() > 0.0);
    }

    #[test]
    fn test_gravity_and_force_integration() {
        let mut body = sphere(2.0);
        body.force = Vec3::new(4.0, 0.0, 0.0);
        body.integrate_velocity(Vec3::new(0.0, -10.0, 0.0), 0.5);
        assert!((body.velocity - Vec3::new(1.0, -5.0, 0.0)).length() < 1e-6);
        body.integrate_position(0.5);
        assert!((body.position - Vec3::new(0.5, -2.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_cuboid_inertia() {
        let body = RigidBody::new(&BodyDesc {
            mass: 1.0,
            position: Vec3::ZERO,
            shape: Shape::Cuboid {
                half_extents: Vec3::splat(0.25),
            },
        });
        // m/6 · s² for a cube of side s = 0.5
        let expected = 1.0 / (1.0 / 6.0 * 0.25);
        assert!((body.inv_inertia.x - expected).abs() < 1e-3);
    }
}
