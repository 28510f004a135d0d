//! Application services: feeds, follow graph, posts and directory lookups.

pub mod error;
pub mod feed;
pub mod follow;
pub mod groups;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod users;
