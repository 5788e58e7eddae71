pub mod categories;
pub mod comments;
pub mod posts;
pub mod reactions;
pub mod sessions;
pub mod users;
