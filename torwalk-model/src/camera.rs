use std::f32::consts::{FRAC_PI_2, PI};

use na::{Matrix4, Point3, Rotation3, Unit, Vector3};

use crate::walker::SurfaceWalker;

/// Third-person camera that trails a [`SurfaceWalker`].
///
/// Each [`follow`](Self::follow) computes a desired eye offset, look target,
/// and up vector from the walker's queries, then eases the actual values
/// toward them so terrain bumps and face transitions don't jolt the view.
/// The up vector blends the mesh normal with the ideal torus normal, which
/// keeps the horizon steady over height-perturbed ground.
#[derive(Debug, Clone)]
pub struct FollowCamera {
    near_plane_dist: f32,
    far_plane_dist: f32,
    fov: f32,
    aspect: f32,
    zoom: f32,
    smoothing: f32,

    offset: Vector3<f32>,
    center: Vector3<f32>,
    up: Vector3<f32>,
    anchor: Vector3<f32>,
    primed: bool,

    _p_cache: Matrix4<f32>,
    _v_cache: Matrix4<f32>,
}

impl FollowCamera {
    pub fn v_mat(&self) -> Matrix4<f32> {
        self._v_cache
    }

    pub fn p_mat(&self) -> Matrix4<f32> {
        self._p_cache
    }

    pub fn vp_mat(&self) -> Matrix4<f32> {
        self.p_mat() * self.v_mat()
    }

    pub fn pos(&self) -> Vector3<f32> {
        self.anchor + self.offset
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.calc_p_mat();
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.calc_p_mat();
    }

    /// Multiplier on the eye offset; 1 is the stock framing.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    /// Re-aims at the walker. `pitch` swings the eye between behind the
    /// walker and overhead; the first call snaps, later calls ease.
    pub fn follow(&mut self, walker: &SurfaceWalker, pitch: f32) {
        let anchor = walker.position();
        let forward = walker.forward().normalize();
        let up_desired = (walker.up() + walker.torus_normal()).normalize();

        let swing_axis = Unit::new_normalize(forward.cross(&up_desired));
        let swing = Rotation3::from_axis_angle(&swing_axis, (0.5 - pitch) * PI);
        let offset_desired =
            (up_desired * 0.3 + forward * 0.2 + swing * (up_desired * 0.4)) * self.zoom;
        let center_desired = anchor + forward * 0.3;

        if self.primed {
            self.offset = offset_desired.lerp(&self.offset, self.smoothing);
            self.center = center_desired.lerp(&self.center, self.smoothing);
            self.up = up_desired.lerp(&self.up, self.smoothing);
        } else {
            self.offset = offset_desired;
            self.center = center_desired;
            self.up = up_desired;
            self.primed = true;
        }
        self.anchor = anchor;
        self.calc_v_mat();
    }

    fn calc_p_mat(&mut self) {
        self._p_cache = Matrix4::new_perspective(
            self.aspect,
            self.fov,
            self.near_plane_dist,
            self.far_plane_dist,
        );
    }

    fn calc_v_mat(&mut self) {
        self._v_cache = Matrix4::look_at_rh(
            &Point3::from(self.pos()),
            &Point3::from(self.center),
            &self.up,
        );
    }
}

impl Default for FollowCamera {
    fn default() -> Self {
        let mut cam = FollowCamera {
            near_plane_dist: 0.1f32,
            far_plane_dist: 100.0f32,
            fov: FRAC_PI_2,
            aspect: 1.0f32,
            zoom: 1.0f32,
            smoothing: 0.95f32,
            offset: Vector3::zeros(),
            center: Vector3::zeros(),
            up: Vector3::y(),
            anchor: Vector3::zeros(),
            primed: false,
            _p_cache: Matrix4::zeros(),
            _v_cache: Matrix4::identity(),
        };
        cam.calc_p_mat();
        cam
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::test_torus_grid;
    use approx::assert_relative_eq;

    fn walker() -> SurfaceWalker {
        SurfaceWalker::new(test_torus_grid(10, 10, 1., 5.))
    }

    #[test]
    fn follow_is_a_fixed_point_when_the_walker_is_still() {
        let w = walker();
        let mut cam = FollowCamera::default();
        cam.follow(&w, 0.2);
        let first = cam.v_mat();
        cam.follow(&w, 0.2);
        assert_relative_eq!(cam.v_mat(), first, epsilon = 1e-5);
    }

    #[test]
    fn zoom_scales_the_eye_offset() {
        let w = walker();

        let mut near = FollowCamera::default();
        near.follow(&w, 0.2);
        let mut far = FollowCamera::default();
        far.set_zoom(2.);
        far.follow(&w, 0.2);

        let near_dist = (near.pos() - w.position()).norm();
        let far_dist = (far.pos() - w.position()).norm();
        assert_relative_eq!(far_dist, near_dist * 2., epsilon = 1e-4);
    }

    #[test]
    fn eased_offset_covers_a_sliver_of_the_gap() {
        let mut w = walker();
        let mut eased = FollowCamera::default();
        eased.follow(&w, 0.2);
        let offset_before = eased.pos() - w.position();

        w.step_forward(20);

        // a fresh camera snaps, giving the desired offset at the new spot
        let mut snapped = FollowCamera::default();
        snapped.follow(&w, 0.2);
        let offset_desired = snapped.pos() - w.position();

        eased.follow(&w, 0.2);
        let offset_after = eased.pos() - w.position();
        assert_relative_eq!(
            offset_after,
            offset_before.lerp(&offset_desired, 0.05),
            epsilon = 1e-4
        );
    }

    #[test]
    fn vp_is_projection_times_view() {
        let w = walker();
        let mut cam = FollowCamera::default();
        cam.set_aspect(16. / 9.);
        cam.follow(&w, 0.2);
        assert_relative_eq!(cam.vp_mat(), cam.p_mat() * cam.v_mat(), epsilon = 1e-6);
    }
}
