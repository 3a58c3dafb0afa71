use serde::{Deserialize, Serialize};

/// Placeholder credential handed out on every login; never verified.
pub const MOCK_TOKEN: &str = "mock-token";

/// A registered account. The password is stored and compared in plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl Session {
    pub fn for_user(user: User) -> Self {
        Self {
            user,
            token: MOCK_TOKEN.to_string(),
        }
    }
}
