use crate::db::repo::UserRepo;
use crate::error::AppResult;
use crate::models::user::User;
use std::sync::Arc;

/// Identity lookups for the `/user` endpoint. The connection gate never consults this.
pub struct UserService {
    repo: Arc<dyn UserRepo>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepo>) -> Self {
        Self { repo }
    }

    pub async fn find(&self, username: &str) -> AppResult<Option<User>> {
        if username.is_empty() {
            return Ok(None);
        }

        Ok(self.repo.get_by_username(username).await?)
    }
}
