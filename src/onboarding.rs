//! Interactive onboarding wizard for first-time configuration.

use std::path::PathBuf;

use inquire::{Password, Text, validator::Validation};
use secrecy::SecretString;

use crate::app_config::{Config, DriveConfig, OrganiserConfig};

/// Error type for onboarding wizard failures.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// An error occurred while prompting the user.
    #[error("Prompt error: {0}")]
    Prompt(#[from] inquire::InquireError),
}

/// Runs the interactive onboarding wizard.
///
/// Returns the config with the real access token (since Config serialization masks it).
///
/// # Errors
///
/// Returns `OnboardingError::Prompt` on inquire errors.
pub fn run_wizard() -> Result<Config, OnboardingError> {
    println!("Welcome to docsort! Let's set up your configuration.\n");

    let defaults = Config::default();

    let access_token = Password::new("Drive access token:")
        .with_help_message("An OAuth access token with the drive scope.")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                return Ok(Validation::Invalid("The access token cannot be empty.".into()));
            }
            Ok(Validation::Valid)
        })
        .without_confirmation()
        .prompt()?;

    let root_folder = Text::new("Which top-level Drive folder should statements go into?")
        .with_default(&defaults.organiser.root_folder)
        .with_validator(|input: &str| {
            if input.trim().is_empty() || input.contains('/') {
                return Ok(Validation::Invalid(
                    "Enter a single folder name without '/'.".into(),
                ));
            }
            Ok(Validation::Valid)
        })
        .prompt()?;

    let downloads_dir = Text::new("Where are new statements downloaded to?")
        .with_default(&defaults.organiser.downloads_dir.display().to_string())
        .prompt()?;

    let archive_dir = Text::new("Where should uploaded statements be archived locally?")
        .with_default(&defaults.organiser.archive_dir.display().to_string())
        .prompt()?;

    Ok(Config {
        drive: DriveConfig {
            access_token: SecretString::from(access_token),
            ..defaults.drive
        },
        organiser: OrganiserConfig {
            root_folder: root_folder.trim().to_owned(),
            downloads_dir: PathBuf::from(downloads_dir),
            archive_dir: PathBuf::from(archive_dir),
            ..defaults.organiser
        },
        cache: defaults.cache,
    })
}
