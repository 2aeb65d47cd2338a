//! Generates the toroidal landscape the walker moves on: a regular grid of
//! triangles over the flat `[0,1)²` domain, projected onto a torus and
//! displaced by a pluggable height field. The output is an interleaved
//! vertex buffer in the layout `torwalk-model` expects, two triangles per
//! grid cell in x-major order, matching [`XMajorGrid`]'s point-location
//! arithmetic.

pub mod height;

pub use height::{Flat, HeightField, HeightMap, HeightMapError};

use std::f32::consts::TAU;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Vector2, Vector3};

use model::{torus_normal, MeshError, PackedVertex, TorusMesh, XMajorGrid};

/// Configures and emits one landscape.
///
/// `x_frag` counts cells along the longitude (around the hole), `y_frag`
/// along the latitude (around the tube). Heights are scaled by
/// `height_mult` and floored at `bedrock`, so a zero height field on a
/// non-zero bedrock still produces a uniformly thickened tube.
pub struct LandscapeBuilder<H: HeightField = Flat> {
    x_frag: usize,
    y_frag: usize,
    minor: f32,
    major: f32,
    height_mult: f32,
    bedrock: f32,
    flat_shading: bool,
    height_field: H,
}

impl LandscapeBuilder<Flat> {
    pub fn new(x_frag: usize, y_frag: usize, minor: f32, major: f32) -> Self {
        Self {
            x_frag,
            y_frag,
            minor,
            major,
            height_mult: 1.0,
            bedrock: 0.0,
            flat_shading: false,
            height_field: Flat,
        }
    }
}

impl<H: HeightField> LandscapeBuilder<H> {
    pub fn height_field<G: HeightField>(self, height_field: G) -> LandscapeBuilder<G> {
        LandscapeBuilder {
            x_frag: self.x_frag,
            y_frag: self.y_frag,
            minor: self.minor,
            major: self.major,
            height_mult: self.height_mult,
            bedrock: self.bedrock,
            flat_shading: self.flat_shading,
            height_field,
        }
    }

    pub fn height_mult(mut self, height_mult: f32) -> Self {
        self.height_mult = height_mult;
        self
    }

    pub fn bedrock(mut self, bedrock: f32) -> Self {
        self.bedrock = bedrock;
        self
    }

    /// Replace the analytic per-vertex normals with per-face geometric ones.
    pub fn flat_shading(mut self, flat_shading: bool) -> Self {
        self.flat_shading = flat_shading;
        self
    }

    fn vertex(&self, u: f32, v: f32) -> PackedVertex {
        let height = (self.height_field.sample(u, v) * self.height_mult).max(self.bedrock);
        let norm = torus_normal(Vector2::new(u, v));
        let ring = Vector3::new(-(u * TAU).cos(), 0., -(u * TAU).sin());
        let pos = ring * self.major + norm * (self.minor + height);
        PackedVertex {
            pos: pos.into(),
            norm: norm.into(),
            flat: [u, v],
            height,
        }
    }

    /// The interleaved vertex records, three per triangle, two triangles per
    /// cell (lower then upper), cells in x-major order.
    pub fn vertices(&self) -> Vec<PackedVertex> {
        let mut verts = Vec::with_capacity(self.x_frag * self.y_frag * 6);
        for xi in 0..self.x_frag {
            for yi in 0..self.y_frag {
                let xf = xi as f32 / self.x_frag as f32;
                let yf = yi as f32 / self.y_frag as f32;
                let xt = (xi + 1) as f32 / self.x_frag as f32;
                let yt = (yi + 1) as f32 / self.y_frag as f32;
                for [u, v] in [
                    [xf, yf],
                    [xf, yt],
                    [xt, yt],
                    [xf, yf],
                    [xt, yt],
                    [xt, yf],
                ] {
                    verts.push(self.vertex(u, v));
                }
            }
        }
        if self.flat_shading {
            flat_shade(&mut verts);
        }
        info!(
            "generated {} landscape triangles ({}x{} cells)",
            verts.len() / 3,
            self.x_frag,
            self.y_frag
        );
        verts
    }

    /// Generates the mesh and wraps it for the walker, paired with the
    /// matching grid indexer.
    pub fn build(&self) -> Result<TorusMesh, MeshError> {
        TorusMesh::from_packed(
            &self.vertices(),
            self.minor,
            self.major,
            Box::new(XMajorGrid {
                x_frag: self.x_frag,
                y_frag: self.y_frag,
            }),
        )
    }
}

/// Overwrites each triangle's vertex normals with its outward geometric
/// normal.
fn flat_shade(verts: &mut [PackedVertex]) {
    for tri in verts.chunks_exact_mut(3) {
        let p0 = Vector3::from(tri[0].pos);
        let p1 = Vector3::from(tri[1].pos);
        let p2 = Vector3::from(tri[2].pos);
        let norm: [f32; 3] = (p1 - p0).cross(&(p2 - p0)).normalize().into();
        for v in tri {
            v.norm = norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use model::{CellIndexer, SurfaceWalker, VertexLayout};
    use std::sync::Arc;

    #[test]
    fn emits_the_expected_counts() {
        let verts = LandscapeBuilder::new(12, 5, 1., 4.).vertices();
        assert_eq!(verts.len(), 12 * 5 * 6);
        let mesh = LandscapeBuilder::new(12, 5, 1., 4.).build().unwrap();
        assert_eq!(mesh.face_count(), 12 * 5 * 2);
        assert_eq!(mesh.raw().len(), 12 * 5 * 6 * VertexLayout::packed().stride);
    }

    #[test]
    fn flat_positions_tile_the_unit_square() {
        let x_frag = 6;
        let y_frag = 4;
        let verts = LandscapeBuilder::new(x_frag, y_frag, 1., 4.).vertices();
        for (i, v) in verts.iter().enumerate() {
            let [u, vv] = v.flat;
            assert!((0. ..=1.).contains(&u), "vertex {i} has u = {u}");
            assert!((0. ..=1.).contains(&vv), "vertex {i} has v = {vv}");
        }
        // each cell's lower triangle starts at its own corner
        for xi in 0..x_frag {
            for yi in 0..y_frag {
                let first = (xi * y_frag + yi) * 6;
                let [u, v] = verts[first].flat;
                assert_relative_eq!(u, xi as f32 / x_frag as f32);
                assert_relative_eq!(v, yi as f32 / y_frag as f32);
            }
        }
    }

    #[test]
    fn analytic_normals_are_unit_and_outward() {
        let verts = LandscapeBuilder::new(8, 8, 1., 4.).vertices();
        for v in &verts {
            let norm = Vector3::from(v.norm);
            assert_relative_eq!(norm.norm(), 1., epsilon = 1e-5);
            // outward means pointing away from the centre ring
            let pos = Vector3::from(v.pos);
            let ring = Vector3::new(pos.x, 0., pos.z).normalize() * 4.;
            assert!(norm.dot(&(pos - ring)) > 0.);
        }
    }

    #[test]
    fn flat_shading_agrees_with_the_analytic_direction() {
        let smooth = LandscapeBuilder::new(10, 10, 1., 4.).vertices();
        let faceted = LandscapeBuilder::new(10, 10, 1., 4.)
            .flat_shading(true)
            .vertices();
        for (s, f) in smooth.iter().zip(&faceted) {
            let analytic = Vector3::from(s.norm);
            let geometric = Vector3::from(f.norm);
            assert_relative_eq!(geometric.norm(), 1., epsilon = 1e-5);
            assert!(
                analytic.dot(&geometric) > 0.8,
                "flat normal {geometric:?} strays from {analytic:?}"
            );
        }
    }

    #[test]
    fn heights_ride_on_the_bedrock_floor() {
        let field = |u: f32, _v: f32| u;
        let verts = LandscapeBuilder::new(4, 4, 1., 4.)
            .height_field(field)
            .height_mult(2.)
            .bedrock(0.5)
            .vertices();
        for v in &verts {
            let [u, _] = v.flat;
            let height = v.height;
            assert_relative_eq!(height, (u * 2.).max(0.5), epsilon = 1e-6);
        }
    }

    #[test]
    fn grid_indexer_matches_the_emission_order() {
        let x_frag = 5;
        let y_frag = 7;
        let mesh = LandscapeBuilder::new(x_frag, y_frag, 1., 4.).build().unwrap();
        let grid = XMajorGrid { x_frag, y_frag };

        for xi in 0..x_frag {
            for yi in 0..y_frag {
                // a point above the cell diagonal, so the first candidate contains it
                let flat = Vector2::new(
                    (xi as f32 + 0.1) / x_frag as f32,
                    (yi as f32 + 0.6) / y_frag as f32,
                );
                let candidates = grid.candidate_faces(flat);
                let found = mesh.locate_face(flat);
                assert!(
                    candidates.contains(&found),
                    "cell ({xi}, {yi}): located {found}, candidates {candidates:?}"
                );
                assert!(mesh.face_contains(found, flat));
            }
        }
    }

    #[test]
    fn walker_rides_a_generated_landscape() {
        let field = |u: f32, v: f32| ((u * 3. * TAU).sin() * (v * 2. * TAU).cos()).abs();
        let mesh = LandscapeBuilder::new(24, 12, 0.7, 5.)
            .height_field(field)
            .height_mult(0.8)
            .bedrock(0.3)
            .build()
            .unwrap();
        let mut walker = SurfaceWalker::new(Arc::new(mesh));
        walker.rotate(0.4);
        walker.step_forward(120);

        let p = walker.position();
        let ring_distance = (p.x * p.x + p.z * p.z).sqrt();
        // 0.3 bedrock to 0.8 peaks on top of the 0.7 tube
        let tube_distance =
            ((ring_distance - 5.) * (ring_distance - 5.) + p.y * p.y).sqrt();
        assert!(
            tube_distance > 0.6 && tube_distance < 1.7,
            "rider left the landscape shell: {tube_distance}"
        );
        assert_relative_eq!(walker.up().norm(), 1., epsilon = 1e-4);
    }
}
