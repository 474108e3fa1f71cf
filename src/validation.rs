use colored::Colorize;
use inquire::Text;
use validator::ValidateEmail;

use crate::{error::AppError, identity::Identity};

/// Menu entry for returning to the previous screen, so never a valid alias
pub const BACK_OPTION: &str = "back";

/// Maximum length for identity alias
const MAX_ALIAS_LENGTH: usize = 30;
/// Maximum length for Git author name
const MAX_NAME_LENGTH: usize = 100;
/// Maximum length for Git email address
const MAX_EMAIL_LENGTH: usize = 100;
/// Maximum length for GitHub account names
const MAX_GITHUB_USER_LENGTH: usize = 39;

/// Prompts user for input until valid input is provided
pub fn prompt_until_valid<F>(prompt_message: &str, input_validation: F) -> Result<String, AppError>
where
    F: Fn(&str) -> Result<(), AppError>,
{
    loop {
        let input: String = Text::new(prompt_message).prompt()?.trim().to_string();
        match input_validation(&input) {
            Ok(_) => break Ok(input),
            Err(AppError::Validation(msg)) => println!("{}", msg.red()),
            Err(conflict @ AppError::AliasConflict(_)) => {
                println!("{}", conflict.to_string().red())
            }
            Err(e) => return Err(e),
        }
    }
}

// Validate input helper functions

/// Validates an alias input; it becomes part of an SSH host alias
pub fn validate_input_alias(alias: &str, existing: &[Identity]) -> Result<(), AppError> {
    if alias.is_empty() {
        Err(AppError::Validation("Alias cannot be empty".to_string()))
    } else if alias.len() > MAX_ALIAS_LENGTH {
        Err(AppError::Validation(format!(
            "Alias too long (max {MAX_ALIAS_LENGTH} characters)"
        )))
    } else if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        Err(AppError::Validation(
            "Alias may only contain letters, digits, '-', '_' and '.'".to_string(),
        ))
    } else if alias == BACK_OPTION {
        Err(AppError::Validation(format!("Alias cannot be '{BACK_OPTION}'")))
    } else if existing.iter().any(|identity| identity.alias == alias) {
        Err(AppError::AliasConflict(alias.to_string()))
    } else {
        Ok(())
    }
}

/// Validates author name input
pub fn validate_input_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        Err(AppError::Validation("Name cannot be empty".to_string()))
    } else if name.len() > MAX_NAME_LENGTH {
        Err(AppError::Validation(format!(
            "Name too long (max {MAX_NAME_LENGTH} characters)"
        )))
    } else {
        Ok(())
    }
}

/// Validates email input
pub fn validate_input_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() {
        Err(AppError::Validation("Email cannot be empty".to_string()))
    } else if email.len() > MAX_EMAIL_LENGTH {
        Err(AppError::Validation(format!(
            "Email too long (max {MAX_EMAIL_LENGTH} characters)"
        )))
    } else if !email.validate_email() {
        Err(AppError::Validation("Invalid email format".to_string()))
    } else {
        Ok(())
    }
}

/// Validates GitHub account name input
pub fn validate_input_github_user(user: &str) -> Result<(), AppError> {
    if user.is_empty() {
        Err(AppError::Validation("GitHub username cannot be empty".to_string()))
    } else if user.len() > MAX_GITHUB_USER_LENGTH {
        Err(AppError::Validation(format!(
            "GitHub username too long (max {MAX_GITHUB_USER_LENGTH} characters)"
        )))
    } else if !user.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        Err(AppError::Validation(
            "GitHub username may only contain letters, digits and '-'".to_string(),
        ))
    } else {
        Ok(())
    }
}
