// src/cli/tag_commands.rs
use crate::cli::error::{CliError, CliResult};
use crate::domain::command::Command;
use crate::domain::tag::BlockedTag;
use crate::infrastructure::di::ServiceContainer;
use crossterm::style::Stylize;
use itertools::Itertools;
use tracing::instrument;

#[instrument(skip(services))]
pub fn block(tags: &[String], services: &ServiceContainer) -> CliResult<()> {
    run_commands(tags, Command::Block, services)
}

#[instrument(skip(services))]
pub fn unblock(tags: &[String], services: &ServiceContainer) -> CliResult<()> {
    run_commands(tags, Command::Unblock, services)
}

fn run_commands(
    raw_tags: &[String],
    make: fn(BlockedTag) -> Command,
    services: &ServiceContainer,
) -> CliResult<()> {
    let tags = parse_tags(raw_tags)?;
    let mut store = services.blocked_set_store();

    for tag in tags {
        let command = make(tag);
        let changed = store
            .execute(&command)
            .map_err(|e| CliError::from(e).context(format!("Failed to {}", command)))?;

        match (&command, changed) {
            (Command::Block(tag), true) => eprintln!("Blocked: {}", tag.value().red()),
            (Command::Block(tag), false) => eprintln!("Already blocked: {}", tag.value()),
            (Command::Unblock(tag), true) => eprintln!("Unblocked: {}", tag.value().green()),
            (Command::Unblock(tag), false) => eprintln!("Not blocked: {}", tag.value()),
        }
    }
    Ok(())
}

/// Normalizes and de-duplicates command line tags; a list without usable tags
/// is an input error
fn parse_tags(raw_tags: &[String]) -> CliResult<Vec<BlockedTag>> {
    let tags = BlockedTag::parse_list(raw_tags.iter().map(String::as_str));
    if tags.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "no usable tag in {:?}",
            raw_tags
        )));
    }
    Ok(tags)
}

#[instrument(skip(services))]
pub fn list(is_json: bool, services: &ServiceContainer) -> CliResult<()> {
    let store = services.blocked_set_store();

    if is_json {
        let tags = store.all();
        let values: Vec<&str> = tags.iter().map(|t| t.value()).collect();
        let json = serde_json::to_string_pretty(&values)
            .map_err(|e| CliError::CommandFailed(format!("Cannot render json: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    if store.is_empty() {
        eprintln!("No blocked tags");
        return Ok(());
    }
    eprintln!("Blocked tags:");
    println!("{}", store.all().iter().map(|t| format!("  {}", t.value())).join("\n"));
    Ok(())
}

#[instrument(skip(services))]
pub fn clear(services: &ServiceContainer) -> CliResult<()> {
    let mut store = services.blocked_set_store();
    let count = store.len();
    if store.clear()? {
        eprintln!("Removed {} blocked tags", count.to_string().yellow());
    } else {
        eprintln!("No blocked tags");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_blank_tags_when_parse_then_invalid_input() {
        let raw = vec!["  ".to_string(), "".to_string()];
        assert!(matches!(parse_tags(&raw), Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn given_mixed_case_duplicates_when_parse_then_normalized_once() {
        let raw = vec!["Cats".to_string(), " cats ".to_string(), "WTF".to_string()];
        let values: Vec<String> = parse_tags(&raw)
            .unwrap()
            .iter()
            .map(|t| t.value().to_string())
            .collect();
        assert_eq!(values, vec!["cats", "wtf"]);
    }
}
