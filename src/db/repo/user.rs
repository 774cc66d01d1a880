use crate::db::DbResult;
use crate::models::user::User;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_username(&self, username: &str) -> DbResult<Option<User>>;
}
