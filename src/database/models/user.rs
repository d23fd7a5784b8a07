use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::RoleSet;

/// Stored account row. Never serialized directly; see [`UserView`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub program_studi_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role_set(&self) -> RoleSet {
        RoleSet::from_stored(&self.roles)
    }
}

/// Client-facing account shape without the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub roles: RoleSet,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub program_studi_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        let roles = user.role_set();
        let permissions = roles.permissions();
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            roles,
            permissions,
            is_active: user.is_active,
            program_studi_id: user.program_studi_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserInput {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(alias = "roleIds")]
    pub roles: Option<Vec<String>>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
    #[serde(alias = "programStudiId")]
    pub program_studi_id: Option<Uuid>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(alias = "roleIds")]
    pub roles: Option<Vec<String>>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
    /// Absent keeps the binding, `null` clears it
    #[serde(default, alias = "programStudiId", deserialize_with = "present")]
    pub program_studi_id: Option<Option<Uuid>>,
}

/// Wraps any present value, `null` included, in `Some`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_drops_hash_and_unknown_roles() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "dosen@example.ac.id".into(),
            password_hash: "$argon2id$secret".into(),
            full_name: None,
            roles: vec!["lecturer".into(), "ghost".into()],
            is_active: true,
            program_studi_id: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(UserView::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["roles"], serde_json::json!(["dosen"]));
        assert!(json["permissions"].as_array().map(|p| !p.is_empty()).unwrap_or(false));
    }

    #[test]
    fn accepts_camel_case_aliases() {
        let input: CreateUserInput = serde_json::from_value(serde_json::json!({
            "email": "a@b.c",
            "fullName": "A",
            "isActive": false,
            "roleIds": ["prodi"]
        }))
        .unwrap();
        assert_eq!(input.full_name.as_deref(), Some("A"));
        assert_eq!(input.is_active, Some(false));
        assert_eq!(input.roles, Some(vec!["prodi".to_string()]));
    }

    #[test]
    fn update_distinguishes_absent_and_null_program_studi() {
        let absent: UpdateUserInput = serde_json::from_value(serde_json::json!({ "full_name": "X" })).unwrap();
        assert_eq!(absent.program_studi_id, None);

        let cleared: UpdateUserInput = serde_json::from_value(serde_json::json!({ "program_studi_id": null })).unwrap();
        assert_eq!(cleared.program_studi_id, Some(None));

        let id = Uuid::new_v4();
        let set: UpdateUserInput = serde_json::from_value(serde_json::json!({ "programStudiId": id })).unwrap();
        assert_eq!(set.program_studi_id, Some(Some(id)));
    }
}
