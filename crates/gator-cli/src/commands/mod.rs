pub mod agg;
pub mod browse;
pub mod feeds;
pub mod follows;
pub mod users;

use gator_core::feed::User;
use gator_core::storage::{Database, UserRepository};
use gator_core::{Config, Error};

/// Resolve the logged-in user from the config
pub(crate) async fn require_user(db: &Database, config: &Config) -> gator_core::Result<User> {
    let name = config
        .current_user_name
        .as_deref()
        .ok_or(Error::NotLoggedIn)?;

    UserRepository::new(db)
        .find_by_name(name)
        .await?
        .ok_or_else(|| Error::UserNotFound(name.to_string()))
}
