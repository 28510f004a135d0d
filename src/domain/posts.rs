//! Post and comment submission rules plus the canonical feed ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use time::{format_description::FormatItem, macros::format_description};

use crate::domain::entities::PostRecord;
use crate::domain::types::GroupId;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year] [hour]:[minute]");

const MAX_IMAGE_REFERENCE_LEN: usize = 255;

pub const REQUIRED_FIELD: &str = "This field is required.";

/// Reported when the submitted group is not one of the existing groups.
pub const INVALID_GROUP_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field-level validation messages collected for a single submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// User-submitted post content before it is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<String>,
}

impl PostDraft {
    /// Check the shape of the draft. Group existence is checked by the caller
    /// since it needs the store.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.text.trim().is_empty() {
            errors.push("text", REQUIRED_FIELD);
        }

        if let Some(image) = self.image.as_deref() {
            if let Err(message) = validate_image_reference(image) {
                errors.push("image", message);
            }
        }

        errors.into_result()
    }
}

pub fn validate_comment_text(text: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if text.trim().is_empty() {
        errors.push("text", REQUIRED_FIELD);
    }
    errors.into_result()
}

fn validate_image_reference(image: &str) -> Result<(), &'static str> {
    if image.is_empty() {
        return Err("Image reference must not be empty.");
    }
    if image.len() > MAX_IMAGE_REFERENCE_LEN {
        return Err("Image reference is too long.");
    }
    if image.starts_with('/') || image.contains('\\') {
        return Err("Image reference must be a relative path.");
    }
    if image.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return Err("Image reference contains an invalid path segment.");
    }
    Ok(())
}

/// Feed order: newest first, ties broken by descending id.
pub fn newest_first(a: &PostRecord, b: &PostRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::types::{PostId, UserId};

    fn post(id: i64, created_at: time::OffsetDateTime) -> PostRecord {
        PostRecord {
            id: PostId(id),
            text: format!("post {id}"),
            created_at,
            author_id: UserId(1),
            author_username: "author".to_string(),
            group: None,
            image: None,
        }
    }

    #[test]
    fn blank_text_is_rejected() {
        let draft = PostDraft {
            text: "   \n".to_string(),
            ..Default::default()
        };
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors.for_field("text"), Some("This field is required."));
    }

    #[test]
    fn image_reference_must_stay_relative() {
        for image in ["/etc/passwd", "posts/../secret.png", "posts//a.png", "a\\b.png"] {
            let draft = PostDraft {
                text: "hello".to_string(),
                image: Some(image.to_string()),
                ..Default::default()
            };
            assert!(draft.validate().is_err(), "accepted `{image}`");
        }

        let draft = PostDraft {
            text: "hello".to_string(),
            image: Some("posts/cat.gif".to_string()),
            ..Default::default()
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn comment_requires_text() {
        assert!(validate_comment_text("").is_err());
        assert!(validate_comment_text("nice").is_ok());
    }

    #[test]
    fn equal_timestamps_fall_back_to_descending_id() {
        let at = datetime!(2024-01-01 12:00 UTC);
        let mut posts = vec![
            post(1, at),
            post(3, at),
            post(2, datetime!(2024-01-02 0:00 UTC)),
        ];
        posts.sort_by(newest_first);
        let ids: Vec<i64> = posts.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn field_errors_display_joins_messages() {
        let mut errors = FieldErrors::new();
        errors.push("text", "required");
        errors.push("group", "unknown");
        assert_eq!(errors.to_string(), "text: required; group: unknown");
    }
}
