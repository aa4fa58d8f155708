//! `braid locate`: resolved-location diagnostics.
//!
//! Shows which copy of a task won and why it is (or is not) on the board.

use std::io::Write;

use braid_core::error::ErrorCode;
use braid_core::model::{LocationKind, LocationObservation, Source, TaskId};
use braid_core::pipeline::{LocationReport, locate_tasks};
use braid_core::scan::ScanWarning;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use crate::cmd::core_failure;
use crate::output::{
    CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode, report_warnings,
};
use crate::project::Project;

/// Arguments for `braid locate`.
#[derive(Args, Debug, Default)]
pub struct LocateArgs {
    /// Task to inspect (`task-12`, `12`). All tasks when omitted.
    pub id: Option<TaskId>,
}

#[derive(Debug, Serialize)]
struct CopyRow {
    branch: String,
    source: Source,
    kind: LocationKind,
    path: String,
    timestamp: DateTime<Utc>,
}

impl From<&LocationObservation> for CopyRow {
    fn from(observation: &LocationObservation) -> Self {
        Self {
            branch: observation.branch.clone(),
            source: observation.source,
            kind: observation.kind,
            path: observation.path.clone(),
            timestamp: observation.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
struct LocationRow {
    id: TaskId,
    live: bool,
    current: CopyRow,
    copies: Vec<CopyRow>,
}

#[derive(Debug, Serialize)]
struct LocateOutput {
    tasks: Vec<LocationRow>,
    warnings: Vec<ScanWarning>,
}

impl LocateOutput {
    fn build(report: &LocationReport, only: Option<&TaskId>) -> Self {
        let tasks = report
            .locations
            .iter()
            .filter(|(id, _)| only.is_none_or(|wanted| wanted == *id))
            .map(|(id, location)| LocationRow {
                id: id.clone(),
                live: location.is_live(),
                current: CopyRow::from(&location.winner),
                copies: report
                    .observations
                    .iter()
                    .filter(|observation| &observation.task_id == id)
                    .map(CopyRow::from)
                    .collect(),
            })
            .collect();
        Self {
            tasks,
            warnings: report.warnings.clone(),
        }
    }
}

/// Execute `braid locate`.
pub async fn run_locate(
    args: &LocateArgs,
    output: OutputMode,
    project: &Project,
) -> anyhow::Result<()> {
    let store = project.store();
    let report = locate_tasks(project.provider(), &store, &project.config, Utc::now())
        .await
        .map_err(|err| core_failure(output, err))?;

    let located = LocateOutput::build(&report, args.id.as_ref());
    report_warnings(output, &located.warnings)?;

    if let Some(id) = &args.id
        && located.tasks.is_empty()
    {
        render_error(
            output,
            &CliError::coded(format!("{id} was not found on any branch"), ErrorCode::InvalidTaskId),
        )?;
        anyhow::bail!("{id} not found");
    }

    render_mode(output, &located, render_locate_text, render_locate_pretty)
}

fn render_locate_text(report: &LocateOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for task in &report.tasks {
        writeln!(
            w,
            "{}  {}  {}  {}  copies={}",
            task.id,
            task.current.kind,
            task.current.branch,
            task.current.path,
            task.copies.len()
        )?;
    }
    Ok(())
}

fn render_locate_pretty(report: &LocateOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for task in &report.tasks {
        let state = if task.live { "on board" } else { "hidden" };
        pretty_section(w, &format!("{}  ({state})", task.id))?;
        pretty_kv(w, "current", format!("{} on {}", task.current.kind, task.current.branch))?;
        pretty_kv(w, "path", &task.current.path)?;
        pretty_kv(w, "updated", task.current.timestamp.to_rfc3339())?;
        if task.copies.len() > 1 {
            writeln!(w, "copies:")?;
            for copy in &task.copies {
                writeln!(
                    w,
                    "  {:<9} {:<24} {}",
                    copy.kind.as_str(),
                    copy.branch,
                    copy.timestamp.to_rfc3339()
                )?;
            }
        }
        writeln!(w)?;
    }
    if report.tasks.is_empty() {
        writeln!(w, "No task files found.")?;
    }
    Ok(())
}
