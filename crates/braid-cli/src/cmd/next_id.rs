//! `braid next-id`: the next free task ID across every branch.

use std::io::Write;

use braid_core::model::TaskId;
use braid_core::pipeline::allocate_id;
use braid_core::scan::ScanWarning;
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use crate::cmd::core_failure;
use crate::output::{OutputMode, render_mode, report_warnings};
use crate::project::Project;

/// Arguments for `braid next-id`.
#[derive(Args, Debug, Default)]
pub struct NextIdArgs {
    /// Allocate a subtask ID under this task.
    #[arg(long)]
    pub parent: Option<TaskId>,
}

#[derive(Debug, Serialize)]
struct NextIdOutput {
    id: TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<TaskId>,
    /// Allocation only sees branches that could be scanned.
    advisory: bool,
    warnings: Vec<ScanWarning>,
}

/// Execute `braid next-id`.
pub async fn run_next_id(
    args: &NextIdArgs,
    output: OutputMode,
    project: &Project,
) -> anyhow::Result<()> {
    let store = project.store();
    let (id, warnings) = allocate_id(
        project.provider(),
        &store,
        &project.config,
        args.parent.as_ref(),
        Utc::now(),
    )
    .await
    .map_err(|err| core_failure(output, err))?;

    let report = NextIdOutput {
        id,
        parent: args.parent.clone(),
        advisory: true,
        warnings,
    };
    report_warnings(output, &report.warnings)?;
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}", r.id),
        |r, w| {
            writeln!(w, "{}", r.id)?;
            if !r.warnings.is_empty() {
                writeln!(w, "(some branches could not be scanned; the ID may already be taken)")?;
            }
            Ok(())
        },
    )
}
