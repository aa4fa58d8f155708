pub mod board;
pub mod completions;
pub mod locate;
pub mod next_id;

use braid_core::CoreError;
use braid_core::config::ConfigError;
use std::path::Path;

use crate::output::{CliError, OutputMode, render_error};
use crate::project::Project;

/// Open the project, reporting a failure in the requested output mode.
pub fn open_project(start: &Path, output: OutputMode) -> anyhow::Result<Project> {
    Project::open(start).or_else(|err| {
        let message = format!("{err:#}");
        let cli_error = err
            .downcast_ref::<ConfigError>()
            .map_or_else(|| CliError::new(&message), |e| CliError::coded(&message, e.code()));
        render_error(output, &cli_error)?;
        Err(err)
    })
}

/// Report a core failure in the requested output mode and hand it back.
pub fn core_failure(output: OutputMode, err: CoreError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(&err)) {
        return render_err;
    }
    err.into()
}
