use crate::db::DbResult;
use crate::db::repo::UserRepo;
use crate::models::user::User;
use async_trait::async_trait;
use dashmap::DashMap;

/// Ephemeral identity store, used when running without PostgreSQL.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<String, User>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self { users: DashMap::new() }
    }

    pub fn with_users<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repo = Self::new();
        for name in usernames {
            repo.insert(User::new(name));
        }
        repo
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.username.clone(), user);
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepository {
    async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        Ok(self.users.get(username).map(|u| u.value().clone()))
    }
}
