use serde::Deserialize;

use crate::application::pagination::PageNumber;
use crate::domain::posts::{FieldErrors, INVALID_GROUP_CHOICE, PostDraft};
use crate::domain::types::GroupId;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub fn page_number(&self) -> PageNumber {
        PageNumber::from_query(self.page.as_deref())
    }
}

/// Raw post form fields as submitted. Empty strings stand for "not set".
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    pub image: String,
}

impl PostForm {
    pub fn selected_group(&self) -> Option<i64> {
        self.group.trim().parse().ok()
    }

    pub fn into_draft(self) -> Result<PostDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let group = match self.group.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) => Some(GroupId(id)),
                Err(_) => {
                    errors.push("group", INVALID_GROUP_CHOICE);
                    None
                }
            },
        };

        let image = self.image.trim();
        let draft = PostDraft {
            text: self.text,
            group,
            image: (!image.is_empty()).then(|| image.to_string()),
        };

        if errors.is_empty() {
            return Ok(draft);
        }
        if let Err(shape) = draft.validate() {
            for error in shape.iter() {
                errors.push(error.field, error.message.clone());
            }
        }
        Err(errors)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}
