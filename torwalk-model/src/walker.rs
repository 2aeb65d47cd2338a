use std::cell::Cell;
use std::f32::consts::TAU;
use std::sync::Arc;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix3, Rotation2, Vector2, Vector3};

use crate::mesh::TorusMesh;

/// Parameter-space distance covered by one discrete forward step, before
/// slope compensation.
const STEP_SIZE: f32 = 0.01;

/// Slope compensation never shrinks a step below this fraction of it.
const MIN_STEP_FACTOR: f32 = 0.1;

/// Probe distance for the finite-difference forward vector. Small enough to
/// stay near the current triangle, large enough to stand clear of float
/// noise in the interpolation.
const FORWARD_PROBE: f32 = 1e-3;

/// Outward normal of the ideal torus at flat position `(u, v)`, from the
/// parametrization alone. The tube circle lies in the plane spanned by the
/// y axis and the centre ring direction `(-cos 2πu, 0, -sin 2πu)`.
pub fn torus_normal(flat: Vector2<f32>) -> Vector3<f32> {
    let u = flat.x * TAU;
    let v = flat.y * TAU;
    Vector3::new(-u.cos() * v.cos(), v.sin(), -u.sin() * v.cos())
}

fn wrap_unit(v: f32) -> f32 {
    let w = v - v.floor();
    // tiny negative inputs round up to exactly 1.0, which is out of range
    if w >= 1. {
        0.
    } else {
        w
    }
}

fn wrap_flat(flat: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(wrap_unit(flat.x), wrap_unit(flat.y))
}

/// Walks an entity across the surface of a toroidal landscape mesh.
///
/// State is a position and heading in the flat `[0,1)²` parameter domain
/// plus a cached index of the triangle containing the position. The cache is
/// a locality hint, revalidated against the barycentric containment test
/// before every use; world-space position, up, and forward all come from
/// barycentric interpolation of the containing triangle's vertex attributes.
pub struct SurfaceWalker {
    mesh: Arc<TorusMesh>,

    flat_pos: Vector2<f32>,
    flat_dir: Vector2<f32>,
    current_face: Cell<usize>,

    speed: f32,
}

impl SurfaceWalker {
    /// Starts at flat `(0, 0)` heading along the tube axis. Triangle 0 need
    /// not contain the origin, so the face hint is validated immediately.
    pub fn new(mesh: Arc<TorusMesh>) -> Self {
        let walker = Self {
            mesh,
            flat_pos: Vector2::new(0., 0.),
            flat_dir: Vector2::new(0., 1.),
            current_face: Cell::new(0),
            speed: STEP_SIZE,
        };
        walker.validated_face();
        walker
    }

    pub fn mesh(&self) -> &Arc<TorusMesh> {
        &self.mesh
    }

    pub fn flat_pos(&self) -> Vector2<f32> {
        self.flat_pos
    }

    pub fn flat_dir(&self) -> Vector2<f32> {
        self.flat_dir
    }

    /// Index of the triangle containing the current position.
    pub fn current_face(&self) -> usize {
        self.validated_face()
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Returns the face hint, re-locating first if the position has left it.
    fn validated_face(&self) -> usize {
        let face = self.current_face.get();
        if self.mesh.face_contains(face, self.flat_pos) {
            return face;
        }
        let found = self.mesh.locate_face(self.flat_pos);
        trace!(
            "face hint {face} stale at ({:.4}, {:.4}), moved to {found}",
            self.flat_pos.x,
            self.flat_pos.y
        );
        self.current_face.set(found);
        found
    }

    fn interpolate(&self, face: usize, offset: usize, flat: Vector2<f32>) -> Vector3<f32> {
        self.mesh.face_matrix(face, offset) * self.mesh.barycentric(face, flat)
    }

    /// World-space position, interpolated from the mesh.
    pub fn position(&self) -> Vector3<f32> {
        let face = self.validated_face();
        self.interpolate(face, self.mesh.layout().position, self.flat_pos)
    }

    /// Surface normal interpolated from the mesh, so it reflects whatever
    /// height perturbation the generator baked in. Distinct from
    /// [`Self::torus_normal`] by design.
    pub fn up(&self) -> Vector3<f32> {
        let face = self.validated_face();
        self.interpolate(face, self.mesh.layout().normal, self.flat_pos)
            .normalize()
    }

    /// World-space direction of travel, finite-differenced: the position a
    /// small probe along the heading, minus the position here, rescaled by
    /// the probe length. The probe point is located in its own triangle,
    /// which may differ from the current one. Not normalized.
    pub fn forward(&self) -> Vector3<f32> {
        let here = self.validated_face();
        let probe = wrap_flat(self.flat_pos + self.flat_dir * FORWARD_PROBE);
        let there = if self.mesh.face_contains(here, probe) {
            here
        } else {
            self.mesh.locate_face(probe)
        };

        let from = self.interpolate(here, self.mesh.layout().position, self.flat_pos);
        let to = self.interpolate(there, self.mesh.layout().position, probe);
        (to - from) / FORWARD_PROBE
    }

    /// Outward normal of the ideal torus at the current flat position,
    /// independent of the mesh. See [`torus_normal`].
    pub fn torus_normal(&self) -> Vector3<f32> {
        torus_normal(self.flat_pos)
    }

    /// Basis for orienting a rider at the contact point: columns are right,
    /// mesh up, and forward flattened into the surface plane.
    pub fn surface_frame(&self) -> Matrix3<f32> {
        let forward = self.forward().normalize();
        let up = self.up();
        let right = forward.cross(&up).normalize();
        Matrix3::from_columns(&[right, up, forward - up * up.dot(&forward)])
    }

    /// Takes `|steps|` discrete steps along the heading, backwards when
    /// `steps` is negative. Each step is scaled by a slope factor, the sine
    /// of the angle between the travel direction and the ideal torus normal,
    /// so a constant flat-space step size stays roughly constant in world
    /// space on slanted terrain.
    pub fn step_forward(&mut self, steps: i32) {
        let dir_mod = if steps < 0 { -1f32 } else { 1f32 };

        for _ in 0..steps.unsigned_abs() {
            let slope = self
                .forward()
                .normalize()
                .cross(&self.torus_normal())
                .norm();
            let factor = slope.max(MIN_STEP_FACTOR);

            self.flat_pos += self.flat_dir * (dir_mod * self.speed * factor);
            self.flat_pos = wrap_flat(self.flat_pos);
            self.validated_face();
        }
    }

    /// Turns the heading by `alpha` radians. The two parametric axes span
    /// circumferences of `2πR` and `2πr`, so the heading is stretched to
    /// that metric, rotated, squeezed back, and renormalized; the turn rate
    /// then looks uniform regardless of the torus's aspect ratio.
    pub fn rotate(&mut self, alpha: f32) {
        let scaled = Vector2::new(
            self.flat_dir.x * self.mesh.major(),
            self.flat_dir.y * self.mesh.minor(),
        );
        let turned = Rotation2::new(alpha) * scaled;
        self.flat_dir = Vector2::new(
            turned.x / self.mesh.major(),
            turned.y / self.mesh.minor(),
        )
        .normalize();
    }
}

/// Unperturbed torus grid built the same way the landscape generator emits
/// it: x-major cells, lower then upper triangle per cell.
#[cfg(test)]
pub(crate) fn test_torus_grid(
    x_frag: usize,
    y_frag: usize,
    minor: f32,
    major: f32,
) -> Arc<TorusMesh> {
    use crate::mesh::{PackedVertex, XMajorGrid};

    let vertex = |u: f32, v: f32| {
        let norm = torus_normal(Vector2::new(u, v));
        let ring = Vector3::new(-(u * TAU).cos(), 0., -(u * TAU).sin());
        let pos = ring * major + norm * minor;
        PackedVertex {
            pos: pos.into(),
            norm: norm.into(),
            flat: [u, v],
            height: 0.,
        }
    };
    let mut verts = Vec::with_capacity(x_frag * y_frag * 6);
    for xi in 0..x_frag {
        for yi in 0..y_frag {
            let xf = xi as f32 / x_frag as f32;
            let yf = yi as f32 / y_frag as f32;
            let xt = (xi + 1) as f32 / x_frag as f32;
            let yt = (yi + 1) as f32 / y_frag as f32;
            for [u, v] in [
                [xf, yf],
                [xf, yt],
                [xt, yt],
                [xf, yf],
                [xt, yt],
                [xt, yf],
            ] {
                verts.push(vertex(u, v));
            }
        }
    }
    Arc::new(
        TorusMesh::from_packed(
            &verts,
            minor,
            major,
            Box::new(XMajorGrid { x_frag, y_frag }),
        )
        .unwrap(),
    )
}
