use crate::db::repo::UserRepo;
use crate::db::{Db, DbResult, map_row_opt};
use crate::models::user::User;
use std::sync::Arc;

pub struct UserRepository {
    db: Arc<Db>,
}

impl UserRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl UserRepo for UserRepository {
    async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT username, created_at FROM users WHERE username = $1")
            .await?;

        let row_opt = client.query_opt(&stmt, &[&username]).await?;
        map_row_opt(
            row_opt,
            User::try_from_row,
            &format!("UserRepo::get_by_username username={}", username),
        )
    }
}
