//! InsightForge artifact storage infrastructure.
//!
//! Implements [`pipeline::ArtifactStore`] twice:
//!
//! - [`FileArtifactStore`]: one file per key under a root directory. This is
//!   what the CLI uses; the front-end reads `final-blog-post.md` and
//!   `social-media-kit.md` straight from the output directory.
//! - [`MemoryArtifactStore`]: a process-local map, used by tests and by
//!   embedders that do not want files.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File-system layout and atomic-write mechanics live
//! here; the [`pipeline`] crate sees only [`pipeline::ArtifactStore`].

mod file;
mod memory;

pub use file::FileArtifactStore;
pub use memory::MemoryArtifactStore;
