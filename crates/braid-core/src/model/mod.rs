//! Domain types shared by every stage of resolution.

pub mod location;
pub mod task;
pub mod task_id;

pub use location::{
    BranchKind, BranchRef, LocationKind, LocationObservation, ResolvedLocation, ResolvedTask,
    WORKING_COPY,
};
pub use task::{InvalidPriority, Priority, ProvenanceRecord, Source, TaskRecord};
pub use task_id::{InvalidTaskId, TaskId, parse_task_file_name, task_id_from_path};
