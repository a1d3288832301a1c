// src/cli/mod.rs
use crate::cli::args::{Cli, Commands};
use crate::cli::error::CliResult;
use crate::config::Settings;
use crate::infrastructure::di::ServiceContainer;
use termcolor::StandardStream;

pub mod args;
pub mod error;
pub mod page_commands;
pub mod permission_commands;
pub mod tag_commands;

pub fn execute_command_with_services(
    stderr: StandardStream,
    cli: Cli,
    services: ServiceContainer,
    settings: &Settings,
) -> CliResult<()> {
    match cli.command {
        Some(Commands::Block { tags }) => tag_commands::block(&tags, &services),
        Some(Commands::Unblock { tags }) => tag_commands::unblock(&tags, &services),
        Some(Commands::List { is_json }) => tag_commands::list(is_json, &services),
        Some(Commands::Clear) => tag_commands::clear(&services),
        Some(Commands::Apply { file, url, output }) => page_commands::apply(
            stderr,
            &file,
            url.as_deref(),
            output.as_deref(),
            &services,
            settings,
        ),
        Some(Commands::Permissions { action }) => {
            permission_commands::permissions(action, &services)
        }
        None => Ok(()),
    }
}
