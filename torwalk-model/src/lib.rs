//! Surface-relative movement over a procedurally generated toroidal
//! landscape: the mesh buffer the landscape generator hands over, a walker
//! locked to its surface, and the camera/input pieces that frame it.

pub mod camera;
pub mod control;
pub mod mesh;
pub mod walker;

pub use camera::FollowCamera;
pub use control::WalkerController;
pub use mesh::{CellIndexer, MeshError, PackedVertex, TorusMesh, VertexLayout, XMajorGrid};
pub use walker::{torus_normal, SurfaceWalker};
