use serde::{Deserialize, Serialize};

use crate::auth::identity::Identity;

/// Legacy role label given to accounts that do not ask for one.
pub const DEFAULT_ROLE_LABEL: &str = "user";

/// Internal user row. Carries the password hash and is never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub status: bool,
    pub real_name: String,
    pub phone: String,
    pub avatar: String,
    pub department: String,
    pub position: String,
    pub bio: String,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}

/// Free-text profile fields owned by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub bio: String,
}

/// Outward-facing user, without the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub status: bool,
    #[serde(flatten)]
    pub profile: ProfileFields,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        UserProfile {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            status: u.status,
            profile: ProfileFields {
                real_name: u.real_name,
                phone: u.phone,
                avatar: u.avatar,
                department: u.department,
                position: u.position,
                bio: u.bio,
            },
            last_login: u.last_login,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// New user data for creation. `password` is already hashed.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub status: bool,
    pub profile: ProfileFields,
}

/// Admin-side update. `password` is a replacement hash, `None` keeps the current one.
pub struct UserUpdate {
    pub email: String,
    pub role: String,
    pub status: bool,
    pub profile: ProfileFields,
    pub password: Option<String>,
}
