//! Interactive project id prompt

use crate::types::ProjectId;
use anyhow::{Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

/// Ask until a non-blank project id is entered
pub fn prompt_project_id() -> Result<ProjectId> {
    let theme = ColorfulTheme::default();

    let raw: String = Input::with_theme(&theme)
        .with_prompt("Enter your GCP Project ID")
        .validate_with(|input: &String| validate(input))
        .interact_text()
        .context("Failed to read project ID (pass --project-id when not running in a terminal)")?;

    Ok(ProjectId::parse(&raw)?)
}

fn validate(input: &str) -> Result<(), String> {
    ProjectId::parse(input).map(|_| ()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(validate("binge-plus-prod").is_ok());
        assert_eq!(
            validate("  ").unwrap_err(),
            "Invalid project ID: project ID must not be empty"
        );
    }
}
