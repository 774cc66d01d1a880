use crate::db::DbResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Row;

/// A record in the identity store. Only the username is exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            created_at: Utc::now(),
        }
    }

    pub fn try_from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            username: row.try_get("username")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_only_the_username() {
        let user = User::new("alice");
        assert_eq!(serde_json::to_string(&user).unwrap(), r#"{"username":"alice"}"#);
    }
}
