use std::fmt::Debug;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix3, Vector2, Vector3};
use thiserror::Error;

/// Tolerance for the barycentric containment test. Shared edges of adjacent
/// triangles disagree by float noise, so "inside" means all coordinates at
/// least `-BARY_EPS`.
pub(crate) const BARY_EPS: f32 = 1e-5;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("torus radii must be positive, got R = {major}, r = {minor}")]
    BadRadii { minor: f32, major: f32 },
    #[error("vertex layout overruns its stride ({stride} floats, fields end at {fields_end})")]
    LayoutOverrun { stride: usize, fields_end: usize },
    #[error("buffer of {len} floats is not a whole number of triangles at {stride} floats per vertex")]
    RaggedBuffer { len: usize, stride: usize },
    #[error("buffer holds no triangles")]
    Empty,
    #[error("grid promises {expected} triangles but the buffer holds {actual}")]
    GridMismatch { expected: usize, actual: usize },
}

/// Field offsets, counted in floats, into one interleaved vertex record.
#[derive(Debug, Copy, Clone)]
pub struct VertexLayout {
    /// Floats per vertex.
    pub stride: usize,
    /// Offset of the 3-float world position.
    pub position: usize,
    /// Offset of the 3-float surface normal.
    pub normal: usize,
    /// Offset of the 2-float flat (parameter-space) position.
    pub flat_pos: usize,
    /// Offset of the 1-float height value. Auxiliary; carried for the
    /// renderer, never read by the walker.
    pub height: usize,
}

impl VertexLayout {
    /// The layout of [`PackedVertex`].
    pub fn packed() -> Self {
        Self {
            stride: 9,
            position: 0,
            normal: 3,
            flat_pos: 6,
            height: 8,
        }
    }

    fn fields_end(&self) -> usize {
        (self.position + 3)
            .max(self.normal + 3)
            .max(self.flat_pos + 2)
            .max(self.height + 1)
    }
}

/// One interleaved vertex record as the landscape generator emits it, ready
/// for direct upload.
#[derive(Debug, Copy, Clone, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct PackedVertex {
    pub pos: [f32; 3],
    pub norm: [f32; 3],
    pub flat: [f32; 2],
    pub height: f32,
}

unsafe impl bytemuck::Pod for PackedVertex {}

/// Maps a flat-space point to the triangles that could contain it.
///
/// The grid arithmetic encodes the generator's triangle emission order, so it
/// lives behind a trait instead of being hardcoded into point-location; a
/// mesh from a differently ordered generator supplies its own indexer.
pub trait CellIndexer: Debug + Send + Sync {
    /// Indices of the candidate triangles for `flat`, best guess first.
    fn candidate_faces(&self, flat: Vector2<f32>) -> [usize; 2];

    /// Total triangle count the grid expects the buffer to hold.
    fn face_count(&self) -> usize;
}

/// Cells stored x-major, two triangles per cell: the lower triangle of cell
/// `(x_i, y_i)` is at `x_i * y_frag * 2 + y_i * 2`, the upper right after it.
#[derive(Debug, Copy, Clone)]
pub struct XMajorGrid {
    pub x_frag: usize,
    pub y_frag: usize,
}

impl CellIndexer for XMajorGrid {
    fn candidate_faces(&self, flat: Vector2<f32>) -> [usize; 2] {
        let x_i = ((flat.x * self.x_frag as f32) as usize).min(self.x_frag - 1);
        let y_i = ((flat.y * self.y_frag as f32) as usize).min(self.y_frag - 1);
        let first = x_i * self.y_frag * 2 + y_i * 2;
        [first, first + 1]
    }

    fn face_count(&self) -> usize {
        self.x_frag * self.y_frag * 2
    }
}

/// Triangle soup over the unwrapped `[0,1)²` torus domain: a flat float
/// buffer of interleaved vertex records, three consecutive vertices per
/// triangle, plus the radii the buffer was generated with and the grid
/// topology used for point-location.
#[derive(Debug)]
pub struct TorusMesh {
    data: Vec<f32>,
    layout: VertexLayout,
    minor: f32,
    major: f32,
    cells: Box<dyn CellIndexer>,
}

impl TorusMesh {
    pub fn new(
        data: Vec<f32>,
        minor: f32,
        major: f32,
        layout: VertexLayout,
        cells: Box<dyn CellIndexer>,
    ) -> Result<Self, MeshError> {
        if minor <= 0. || major <= 0. {
            return Err(MeshError::BadRadii { minor, major });
        }
        if layout.stride < layout.fields_end() {
            return Err(MeshError::LayoutOverrun {
                stride: layout.stride,
                fields_end: layout.fields_end(),
            });
        }
        if data.len() % (layout.stride * 3) != 0 {
            return Err(MeshError::RaggedBuffer {
                len: data.len(),
                stride: layout.stride,
            });
        }
        let actual = data.len() / (layout.stride * 3);
        if actual == 0 {
            return Err(MeshError::Empty);
        }
        if cells.face_count() != actual {
            return Err(MeshError::GridMismatch {
                expected: cells.face_count(),
                actual,
            });
        }
        debug!("torus mesh: {} triangles, R = {major}, r = {minor}", actual);
        Ok(Self {
            data,
            layout,
            minor,
            major,
            cells,
        })
    }

    /// Wraps a generator's packed output.
    pub fn from_packed(
        verts: &[PackedVertex],
        minor: f32,
        major: f32,
        cells: Box<dyn CellIndexer>,
    ) -> Result<Self, MeshError> {
        let data = bytemuck::cast_slice::<PackedVertex, f32>(verts).to_vec();
        Self::new(data, minor, major, VertexLayout::packed(), cells)
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn minor(&self) -> f32 {
        self.minor
    }

    pub fn major(&self) -> f32 {
        self.major
    }

    pub fn face_count(&self) -> usize {
        self.data.len() / (self.layout.stride * 3)
    }

    /// The raw interleaved buffer, as handed to a VBO upload.
    pub fn raw(&self) -> &[f32] {
        &self.data
    }

    fn extract2(&self, start: usize) -> Vector2<f32> {
        Vector2::new(self.data[start], self.data[start + 1])
    }

    fn extract3(&self, start: usize) -> Vector3<f32> {
        Vector3::new(self.data[start], self.data[start + 1], self.data[start + 2])
    }

    pub fn vertex_flat_pos(&self, face: usize, vertex: usize) -> Vector2<f32> {
        self.extract2((face * 3 + vertex) * self.layout.stride + self.layout.flat_pos)
    }

    /// Columns are the three vertices' values of the 3-float field at
    /// `offset`; multiplying by a barycentric coordinate vector interpolates
    /// the field across the triangle.
    pub fn face_matrix(&self, face: usize, offset: usize) -> Matrix3<f32> {
        Matrix3::from_columns(&[
            self.extract3((face * 3) * self.layout.stride + offset),
            self.extract3((face * 3 + 1) * self.layout.stride + offset),
            self.extract3((face * 3 + 2) * self.layout.stride + offset),
        ])
    }

    /// Barycentric coordinates of `flat` in `face`, one per vertex. Each is
    /// the point's normalized distance ratio along the perpendicular of the
    /// opposite edge, so the three sum to one and a coordinate goes negative
    /// exactly when the point is beyond that vertex's opposite edge.
    pub fn barycentric(&self, face: usize, flat: Vector2<f32>) -> Vector3<f32> {
        let mut coord = [0f32; 3];
        for n0 in 0..3 {
            let n1 = (n0 + 1) % 3;
            let n2 = (n0 + 2) % 3;

            let edge = self.vertex_flat_pos(face, n2) - self.vertex_flat_pos(face, n1);
            let perp = Vector2::new(edge.y, -edge.x).normalize();

            let from_coord = perp.dot(&self.vertex_flat_pos(face, n1));
            let this_coord = perp.dot(&flat);
            let to_coord = perp.dot(&self.vertex_flat_pos(face, n0));
            coord[n0] = (this_coord - from_coord) / (to_coord - from_coord);
        }
        Vector3::new(coord[0], coord[1], coord[2])
    }

    pub fn face_contains(&self, face: usize, flat: Vector2<f32>) -> bool {
        let vc = self.barycentric(face, flat);
        vc.x >= -BARY_EPS && vc.y >= -BARY_EPS && vc.z >= -BARY_EPS
    }

    /// Point-location. Checks the two candidates the grid names for `flat`;
    /// if float noise at a grid line rejects both, the first candidate wins
    /// rather than escalating, since an off-by-one triangle at an edge is
    /// harmless and a full scan is not.
    pub fn locate_face(&self, flat: Vector2<f32>) -> usize {
        let candidates = self.cells.candidate_faces(flat);
        for face in candidates {
            if self.face_contains(face, flat) {
                return face;
            }
        }
        trace!("no candidate of {candidates:?} contains {flat:?}, keeping first");
        candidates[0]
    }
}
