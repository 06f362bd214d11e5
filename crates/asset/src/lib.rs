//! Asset loading: OBJ geometry parsing, mesh assembly and concurrent load coordination.

pub mod error;
pub mod loader;
pub mod mesh;
pub mod obj;
pub mod source;

pub use error::{ErrorKind, LoadError};
pub use loader::{
    BatchHandle, CancelToken, LoadHandle, LoadRequest, LoadResult, LoadState, Loader,
    LoaderConfig, Pipeline,
};
pub use mesh::{MeshBuffers, MeshBuilder, RawGeometry};
pub use source::{FsProvider, MemoryProvider, SourceId, SourceProvider};
