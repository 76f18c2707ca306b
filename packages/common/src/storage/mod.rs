mod allocator;
mod error;
mod traits;

pub mod filesystem;

pub use allocator::{DEFAULT_EXTENSION, PathAllocator, extension_hint};
pub use error::StorageError;
pub use traits::{BlobStore, BoxReader};
