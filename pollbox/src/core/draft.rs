//! Validation for poll drafts entered through the presentation layer.
//!
//! The store itself only insists on two or more options; title, blank and
//! duplicate option checks belong to whoever collects the input.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// Raw input for a new poll, as typed by an administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDraft {
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Validate a draft and return it with title, description and options trimmed.
///
/// Errors carry the message to show to the user.
pub fn validate_draft(draft: &PollDraft, now: DateTime<Utc>) -> Result<PollDraft, String> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err("Please enter a title".to_string());
    }
    if draft.options.len() < 2 {
        return Err("Please provide at least 2 options".to_string());
    }

    let options: Vec<String> = draft
        .options
        .iter()
        .map(|option| option.trim().to_string())
        .collect();
    if options.iter().any(String::is_empty) {
        return Err("Please fill in all options".to_string());
    }
    let unique: HashSet<&str> = options.iter().map(String::as_str).collect();
    if unique.len() != options.len() {
        return Err("Options must be unique".to_string());
    }

    if let Some(end) = draft.end_date
        && end <= now
    {
        return Err("End date must be in the future".to_string());
    }

    Ok(PollDraft {
        title: title.to_string(),
        description: draft.description.trim().to_string(),
        options,
        end_date: draft.end_date,
    })
}
