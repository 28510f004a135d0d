//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::{CommentId, GroupId, PostId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Group reference carried on a post read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostGroup {
    pub id: GroupId,
    pub slug: String,
    pub title: String,
}

/// A post joined with the author username and group summary it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub author_id: UserId,
    pub author_username: String,
    pub group: Option<PostGroup>,
    pub image: Option<String>,
}

impl PostRecord {
    pub fn group_id(&self) -> Option<GroupId> {
        self.group.as_ref().map(|group| group.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub author_username: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowEdge {
    pub follower: UserId,
    pub following: UserId,
}
