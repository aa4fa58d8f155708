#![forbid(unsafe_code)]

mod adapters;
mod cmd;
mod output;
mod project;

use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "braid: one task board across every git branch",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Project directory (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Show the task board",
        long_about = "Resolve every task across the working copy and all branches, then group live tasks by status.",
        after_help = "EXAMPLES:\n    # Show the board\n    braid board\n\n    # Include tasks whose latest copy is a draft or archived\n    braid board --all\n\n    # Emit machine-readable output\n    braid board --json"
    )]
    Board(cmd::board::BoardArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show where task copies live",
        long_about = "List every copy of a task on every branch and which copy was judged current.",
        after_help = "EXAMPLES:\n    # All tasks\n    braid locate\n\n    # One task\n    braid locate task-12\n\n    # Emit machine-readable output\n    braid locate task-12 --json"
    )]
    Locate(cmd::locate::LocateArgs),

    #[command(
        next_help_heading = "Write Support",
        about = "Print the next free task ID",
        long_about = "Compute the next task ID from every ID visible locally and on any branch. The result is advisory: unmerged branches can allocate the same ID concurrently.",
        after_help = "EXAMPLES:\n    # Next top-level ID\n    braid next-id\n\n    # Next subtask of task-4\n    braid next-id --parent task-4"
    )]
    NextId(cmd::next_id::NextIdArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    braid completions bash\n\n    # Generate zsh completions\n    braid completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BRAID_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "braid=debug,info"
        } else {
            "braid=info,warn"
        })
    });

    let format = env::var("BRAID_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    let start = match &cli.root {
        Some(root) => root.clone(),
        None => env::current_dir()?,
    };
    debug!(start = %start.display(), ?output, "starting");

    match cli.command {
        Commands::Board(ref args) => {
            let project = cmd::open_project(&start, output)?;
            cmd::board::run_board(args, output, &project).await
        }
        Commands::Locate(ref args) => {
            let project = cmd::open_project(&start, output)?;
            cmd::locate::run_locate(args, output, &project).await
        }
        Commands::NextId(ref args) => {
            let project = cmd::open_project(&start, output)?;
            cmd::next_id::run_next_id(args, output, &project).await
        }
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
