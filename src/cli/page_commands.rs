// src/cli/page_commands.rs
use crate::cli::error::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::services::permission::OriginPattern;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::dom::HtmlDocument;
use itertools::Itertools;
use std::io::Write;
use std::path::Path;
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};
use tracing::{debug, instrument};
use url::Url;

/// Run the engine over a saved page and write the filtered HTML.
///
/// The engine only runs where the site permission is granted and, when the
/// page address is known, only on pages covered by the permitted origins.
#[instrument(skip(stderr, services, settings))]
pub fn apply(
    mut stderr: StandardStream,
    file: &Path,
    url: Option<&str>,
    output: Option<&Path>,
    services: &ServiceContainer,
    settings: &Settings,
) -> CliResult<()> {
    check_permission(services, url)?;

    let html = std::fs::read_to_string(file)
        .map_err(|e| CliError::InvalidInput(format!("Cannot read {}: {}", file.display(), e)))?;
    let document = HtmlDocument::parse(&html, settings.layout.clone());

    let mut blocker = services.tag_blocker(document)?;
    let report = blocker.initialize()?;
    let (document, store) = blocker.into_parts();

    let rendered = document.to_html();
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .map_err(|e| CliError::from(e).context(format!("Writing {}", path.display())))?;
            debug!("Wrote filtered page to {:?}", path);
        }
        None => println!("{}", rendered),
    }

    stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    write!(
        &mut stderr,
        "{} of {} items hidden",
        report.filter.blocked, report.filter.scanned
    )?;
    stderr.set_color(ColorSpec::new().set_fg(Some(Color::White)))?;
    if store.is_empty() {
        writeln!(&mut stderr, " (no blocked tags)")?;
    } else {
        writeln!(
            &mut stderr,
            " [{}]",
            store.all().iter().map(|t| t.value()).join(", ")
        )?;
    }
    if !report.panel_rendered {
        stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        writeln!(
            &mut stderr,
            "Heading '{}' not found, no summary panel placed",
            settings.layout.anchor_heading
        )?;
    }
    stderr.reset()?;
    Ok(())
}

fn check_permission(services: &ServiceContainer, url: Option<&str>) -> CliResult<()> {
    let origins = &services.permitted_origins;
    if !services.permission_gate.contains(origins)? {
        return Err(CliError::PermissionDenied(format!(
            "{} not granted, run `tagblock permissions grant`",
            origins.iter().join(", ")
        )));
    }

    if let Some(raw) = url {
        let url = Url::parse(raw)
            .map_err(|e| CliError::InvalidInput(format!("Invalid url '{}': {}", raw, e)))?;
        if !origins.iter().any(|o: &OriginPattern| o.matches(&url)) {
            return Err(CliError::PermissionDenied(format!(
                "{} is outside the permitted origins",
                url
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{memory_storage, test_settings};

    fn services() -> ServiceContainer {
        ServiceContainer::with_storage(&test_settings(), memory_storage()).unwrap()
    }

    #[test]
    fn given_no_grant_when_check_permission_then_denied() {
        let result = check_permission(&services(), None);
        assert!(matches!(result, Err(CliError::PermissionDenied(_))));
    }

    #[test]
    fn given_grant_when_url_outside_origins_then_denied() {
        let services = services();
        services
            .permission_gate
            .request(&services.permitted_origins)
            .unwrap();

        assert!(check_permission(&services, Some("https://9gag.com/hot")).is_ok());
        assert!(matches!(
            check_permission(&services, Some("https://example.com/")),
            Err(CliError::PermissionDenied(_))
        ));
        assert!(matches!(
            check_permission(&services, Some("not a url")),
            Err(CliError::InvalidInput(_))
        ));
    }
}
