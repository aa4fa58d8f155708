//! `braid board`: live tasks from every branch, grouped by status.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use braid_core::conflict::ConflictStrategy;
use braid_core::model::{LocationKind, Priority, ResolvedTask, Source, TaskId};
use braid_core::pipeline::{BoardView, Collaborators, query_board};
use braid_core::scan::ScanWarning;
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use crate::adapters::MarkdownDecoder;
use crate::cmd::core_failure;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode, report_warnings};
use crate::project::Project;

/// Arguments for `braid board`.
#[derive(Args, Debug, Default)]
pub struct BoardArgs {
    /// Also list tasks whose current copy is a draft or archived.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct TaskRow {
    id: TaskId,
    title: String,
    status: String,
    source: Source,
    branch: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    assignee: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
}

impl TaskRow {
    fn new(task: &ResolvedTask) -> Self {
        let record = &task.record.record;
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            status: record.status.clone(),
            source: task.record.source,
            branch: task.record.origin_branch.clone(),
            assignee: record.assignee.clone(),
            priority: record.priority,
        }
    }
}

#[derive(Debug, Serialize)]
struct GroupOutput {
    status: String,
    configured: bool,
    tasks: Vec<TaskRow>,
}

#[derive(Debug, Serialize)]
struct HiddenTask {
    id: TaskId,
    kind: LocationKind,
    branch: String,
}

#[derive(Debug, Serialize)]
struct BoardOutput {
    strategy: ConflictStrategy,
    groups: Vec<GroupOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hidden: Vec<HiddenTask>,
    warnings: Vec<ScanWarning>,
}

impl BoardOutput {
    fn build(view: &BoardView, strategy: ConflictStrategy, include_hidden: bool) -> Self {
        let by_id: BTreeMap<&TaskId, &ResolvedTask> =
            view.tasks.iter().map(|task| (&task.record.record.id, task)).collect();

        let groups = view
            .board
            .groups
            .iter()
            .map(|group| GroupOutput {
                status: group.status.clone(),
                configured: group.configured,
                tasks: group
                    .tasks
                    .iter()
                    .filter_map(|record| by_id.get(&record.id))
                    .map(|task| TaskRow::new(task))
                    .collect(),
            })
            .collect();

        let hidden = if include_hidden {
            view.locations
                .iter()
                .filter(|(_, location)| !location.is_live())
                .map(|(id, location)| HiddenTask {
                    id: id.clone(),
                    kind: location.kind(),
                    branch: location.winner.branch.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            strategy,
            groups,
            hidden,
            warnings: view.warnings.clone(),
        }
    }

    fn task_count(&self) -> usize {
        self.groups.iter().map(|group| group.tasks.len()).sum()
    }
}

/// Execute `braid board`.
pub async fn run_board(
    args: &BoardArgs,
    output: OutputMode,
    project: &Project,
) -> anyhow::Result<()> {
    let strategy = project.config.strategy()?;
    let store = project.store();
    let collaborators = Collaborators {
        provider: project.provider(),
        store: &store,
        decoder: &MarkdownDecoder,
    };
    let view = query_board(collaborators, &project.config, Utc::now())
        .await
        .map_err(|err| core_failure(output, err))?;

    let report = BoardOutput::build(&view, strategy, args.all);
    report_warnings(output, &report.warnings)?;
    render_mode(output, &report, render_board_text, render_board_pretty)
}

fn render_board_text(report: &BoardOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for group in &report.groups {
        writeln!(w, "{} ({})", group.status, group.tasks.len())?;
        for task in &group.tasks {
            writeln!(w, "  {}  {}  [{}]", task.id, task.title, task.branch)?;
        }
    }
    for task in &report.hidden {
        writeln!(w, "hidden  {}  {}  [{}]", task.id, task.kind, task.branch)?;
    }
    Ok(())
}

fn render_board_pretty(report: &BoardOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for group in &report.groups {
        let marker = if group.configured { "" } else { " (not configured)" };
        pretty_section(w, &format!("{}{marker}  {}", group.status, group.tasks.len()))?;
        if group.tasks.is_empty() {
            writeln!(w, "  (empty)")?;
        }
        for task in &group.tasks {
            let priority = task.priority.map(|p| format!(" !{p}")).unwrap_or_default();
            let owners = if task.assignee.is_empty() {
                String::new()
            } else {
                format!("  @{}", task.assignee.iter().cloned().collect::<Vec<_>>().join(","))
            };
            writeln!(w, "  {:<10} {}{priority}{owners}", task.id.to_string(), task.title)?;
            if task.source == Source::Remote {
                writeln!(w, "  {:<10} from {}", "", task.branch)?;
            }
        }
        writeln!(w)?;
    }

    if !report.hidden.is_empty() {
        pretty_section(w, "Not on board")?;
        for task in &report.hidden {
            writeln!(w, "  {:<10} {} on {}", task.id.to_string(), task.kind, task.branch)?;
        }
        writeln!(w)?;
    }

    pretty_rule(w)?;
    pretty_kv(w, "tasks", report.task_count().to_string())?;
    pretty_kv(w, "strategy", report.strategy.as_str())?;
    if !report.warnings.is_empty() {
        pretty_kv(w, "warnings", report.warnings.len().to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::board::assemble;
    use braid_core::model::{
        LocationObservation, ProvenanceRecord, ResolvedLocation, TaskRecord, WORKING_COPY,
    };
    use chrono::{NaiveDate, TimeZone};

    fn resolved(id: &str, status: &str, kind: LocationKind, branch: &str) -> ResolvedTask {
        let created = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let record = TaskRecord::new(id.parse().unwrap(), format!("title {id}"), status, created);
        let source = if branch == WORKING_COPY { Source::Local } else { Source::Remote };
        ResolvedTask {
            location: ResolvedLocation {
                winner: LocationObservation {
                    task_id: record.id.clone(),
                    branch: branch.to_string(),
                    source,
                    kind,
                    path: format!("backlog/{}/{id} - x.md", kind.subdir()),
                    timestamp: Utc.timestamp_opt(0, 0).unwrap(),
                },
                copies: 1,
            },
            record: ProvenanceRecord {
                record,
                source,
                origin_branch: branch.to_string(),
                last_modified: None,
            },
        }
    }

    fn view() -> BoardView {
        let tasks = vec![
            resolved("task-1", "To Do", LocationKind::Active, WORKING_COPY),
            resolved("task-2", "Done", LocationKind::Active, "origin/feature"),
            resolved("task-3", "To Do", LocationKind::Archived, "origin/cleanup"),
        ];
        let statuses = vec!["To Do".to_string(), "In Progress".to_string(), "Done".to_string()];
        BoardView {
            board: assemble(&tasks, &statuses),
            locations: tasks
                .iter()
                .map(|t| (t.record.record.id.clone(), t.location.clone()))
                .collect(),
            tasks,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn output_carries_branch_of_each_task() {
        let report = BoardOutput::build(&view(), ConflictStrategy::MostProgressed, false);
        assert_eq!(report.task_count(), 2);
        assert_eq!(report.groups[2].tasks[0].branch, "origin/feature");
        assert!(report.hidden.is_empty());
    }

    #[test]
    fn hidden_tasks_listed_on_request() {
        let report = BoardOutput::build(&view(), ConflictStrategy::MostProgressed, true);
        assert_eq!(report.hidden.len(), 1);
        assert_eq!(report.hidden[0].kind, LocationKind::Archived);
    }

    #[test]
    fn text_rendering_lists_every_column() {
        let report = BoardOutput::build(&view(), ConflictStrategy::MostRecent, false);
        let mut buf = Vec::new();
        render_board_text(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("To Do (1)\n  task-1  title task-1  [(working copy)]"));
        assert!(text.contains("In Progress (0)"));
        assert!(text.contains("Done (1)"));
    }

    #[test]
    fn json_shape_is_stable() {
        let report = BoardOutput::build(&view(), ConflictStrategy::MostProgressed, false);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["strategy"], "most_progressed");
        assert_eq!(value["groups"][0]["status"], "To Do");
        assert_eq!(value["groups"][0]["tasks"][0]["id"], "task-1");
        assert_eq!(value["groups"][2]["tasks"][0]["source"], "remote");
        assert!(value.get("hidden").is_none());
    }
}
