// src/cli/permission_commands.rs
use crate::cli::args::PermissionAction;
use crate::cli::error::{CliError, CliResult};
use crate::infrastructure::di::ServiceContainer;
use crossterm::style::Stylize;
use itertools::Itertools;
use tracing::instrument;

#[instrument(skip(services))]
pub fn permissions(action: PermissionAction, services: &ServiceContainer) -> CliResult<()> {
    let origins = &services.permitted_origins;
    let gate = &services.permission_gate;
    let listed = origins.iter().join(", ");

    match action {
        PermissionAction::Status => {
            if gate.contains(origins)? {
                eprintln!("{}: {}", "Granted".green(), listed);
            } else {
                eprintln!("{}: {}", "Not granted".red(), listed);
                return Err(CliError::PermissionDenied(listed));
            }
        }
        PermissionAction::Grant => {
            if gate.request(origins)? {
                eprintln!("{}: {}", "Granted".green(), listed);
            } else {
                return Err(CliError::PermissionDenied(listed));
            }
        }
        PermissionAction::Revoke => {
            if gate.revoke(origins)? {
                eprintln!("{}: {}", "Revoked".yellow(), listed);
            } else {
                eprintln!("Nothing to revoke for {}", listed);
            }
        }
    }
    Ok(())
}
