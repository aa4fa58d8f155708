//! Concrete collaborators for `braid-core`: git, the working copy and the
//! markdown task format.

pub mod fs_store;
pub mod git;
pub mod markdown;

pub use fs_store::FsTaskStore;
pub use git::GitCli;
pub use markdown::MarkdownDecoder;
