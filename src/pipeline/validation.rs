//! Plan validation.
//!
//! Checks a plan, and each file's options against the decoded table, before any
//! stage runs, so a bad selection is reported up front instead of halfway
//! through a file.

use super::plan::{PLAN_VERSION, PipelinePlan, SessionOptions};
use crate::table::detect_format;
use std::collections::HashSet;

/// Validation error with the file it concerns, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub file: Option<String>,
    pub message: String,
}

impl ValidationError {
    fn new(file: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            file: file.map(str::to_owned),
            message: message.into(),
        }
    }

    fn plan(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}: {}", self.message)
        } else {
            write!(f, "Plan: {}", self.message)
        }
    }
}

/// Validate one file's options against the columns its table actually has.
pub fn validate_session(options: &SessionOptions, available: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_repeated_columns(None, options, &mut errors);

    let available: HashSet<&str> = available.iter().map(String::as_str).collect();
    for name in options.columns.iter().flatten() {
        if !available.contains(name.as_str()) {
            errors.push(ValidationError::plan(format!(
                "Selected column '{name}' not found in input"
            )));
        }
    }
    errors
}

/// Validate the parts of a plan that do not depend on any table.
pub fn validate_plan(plan: &PipelinePlan) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if plan.version != PLAN_VERSION {
        errors.push(ValidationError::plan(format!(
            "Unsupported plan version '{}', expected '{PLAN_VERSION}'",
            plan.version
        )));
    }

    check_repeated_columns(None, &plan.defaults, &mut errors);

    for (name, options) in &plan.files {
        if let Err(e) = detect_format(name) {
            errors.push(ValidationError::new(Some(name.as_str()), e.to_string()));
        }
        check_repeated_columns(Some(name.as_str()), options, &mut errors);
    }

    errors
}

fn check_repeated_columns(
    file: Option<&str>,
    options: &SessionOptions,
    errors: &mut Vec<ValidationError>,
) {
    let Some(selection) = &options.columns else {
        return;
    };
    let mut seen = HashSet::new();
    for name in selection {
        if !seen.insert(name.as_str()) {
            errors.push(ValidationError::new(
                file,
                format!("Column '{name}' is selected more than once"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    fn selecting(names: &[&str]) -> SessionOptions {
        SessionOptions {
            columns: Some(columns(names)),
            ..SessionOptions::default()
        }
    }

    #[test]
    fn test_session_without_selection_is_valid() {
        let errors = validate_session(&SessionOptions::default(), &columns(&["a"]));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_session_rejects_unknown_and_repeated_columns() {
        let available = columns(&["id", "score"]);

        assert!(validate_session(&selecting(&["score", "id"]), &available).is_empty());
        assert!(validate_session(&selecting(&[]), &available).is_empty());

        let errors = validate_session(&selecting(&["id", "nope", "id"]), &available);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.message.contains("'nope' not found")));
        assert!(errors.iter().any(|e| e.message.contains("more than once")));
    }

    #[test]
    fn test_plan_version_and_file_names() {
        let mut plan = PipelinePlan::new("p");
        assert!(validate_plan(&plan).is_empty());

        plan.version = "9.9".to_owned();
        plan.files.insert("notes.txt".to_owned(), selecting(&["a", "a"]));

        let errors = validate_plan(&plan);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.to_string().starts_with("Plan: Unsupported plan version")));
        assert!(errors.iter().any(|e| e.to_string().contains(".txt")));
        assert!(
            errors
                .iter()
                .any(|e| e.file.as_deref() == Some("notes.txt") && e.message.contains("'a'"))
        );
    }
}
