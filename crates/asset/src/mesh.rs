//! CPU-side mesh representation: the parser's accumulator and the assembled buffers.

use corelib::{DVec2, DVec3};

use crate::error::LoadError;

/// Texture coordinate used for vertices without a `vt` record in their slot.
pub const DEFAULT_TEXCOORD: DVec2 = DVec2::ZERO;
/// Normal used for vertices without a `vn` record in their slot.
pub const DEFAULT_NORMAL: DVec3 = DVec3::Z;

/// Attribute lists as read from the source, before reconciliation.
///
/// `indices` holds flattened triangles of 0-based position indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawGeometry {
    pub positions: Vec<DVec3>,
    pub texcoords: Vec<DVec2>,
    pub normals: Vec<DVec3>,
    pub indices: Vec<i32>,
}

impl RawGeometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Indexed triangle mesh with one texcoord and one normal per position.
///
/// Texcoords are stored with `x` = u and `y` = v.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    positions: Vec<DVec3>,
    texcoords: Vec<DVec2>,
    normals: Vec<DVec3>,
    indices: Vec<u32>,
}

impl MeshBuffers {
    /// Reconcile attribute lengths against the position count and validate indices.
    ///
    /// Texcoords and normals are matched to vertices by slot: vertex `i` takes
    /// `texcoords[i]` / `normals[i]` when present, the defaults otherwise. The
    /// per-corner attribute indices of face records are not consulted.
    ///
    /// An index outside `0..positions.len()` means the accumulator is broken and
    /// is reported as [`LoadError::FatalInvariant`].
    pub fn assemble(raw: RawGeometry) -> Result<Self, LoadError> {
        let RawGeometry {
            positions,
            texcoords,
            normals,
            indices,
        } = raw;

        if indices.len() % 3 != 0 {
            return Err(invariant(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }

        let vertex_count = positions.len();
        let indices = indices
            .into_iter()
            .map(|i| match u32::try_from(i) {
                Ok(idx) if (idx as usize) < vertex_count => Ok(idx),
                _ => Err(invariant(format!(
                    "index {i} out of range for {vertex_count} positions"
                ))),
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let texcoords = (0..vertex_count)
            .map(|i| texcoords.get(i).copied().unwrap_or(DEFAULT_TEXCOORD))
            .collect();
        let normals = (0..vertex_count)
            .map(|i| normals.get(i).copied().unwrap_or(DEFAULT_NORMAL))
            .collect();

        Ok(Self {
            positions,
            texcoords,
            normals,
            indices,
        })
    }

    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn texcoords(&self) -> &[DVec2] {
        &self.texcoords
    }

    pub fn normals(&self) -> &[DVec3] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.positions.is_empty() && !self.indices.is_empty()
    }

    /// Split into `(positions, texcoords, normals, indices)`.
    pub fn into_parts(self) -> (Vec<DVec3>, Vec<DVec2>, Vec<DVec3>, Vec<u32>) {
        (self.positions, self.texcoords, self.normals, self.indices)
    }
}

fn invariant(msg: String) -> LoadError {
    log::error!("Mesh assembly rejected geometry: {msg}");
    LoadError::FatalInvariant(msg)
}

/// Consumer that turns assembled buffers into a renderable object.
///
/// Implementations own the buffers after `build` and may derive whatever
/// they need from them (bounds, smoothed normals, materials).
pub trait MeshBuilder {
    type Handle;

    fn build(&mut self, name: &str, mesh: MeshBuffers) -> Self::Handle;
}
