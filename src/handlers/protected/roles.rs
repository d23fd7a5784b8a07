// handlers/protected/roles.rs - GET /api/roles

use serde::Serialize;

use crate::auth::Role;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct RoleInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: &'static [&'static str],
}

pub fn role_catalog() -> Vec<RoleInfo> {
    Role::ALL
        .iter()
        .map(|role| RoleInfo {
            name: role.as_str(),
            description: role.description(),
            permissions: role.permissions(),
        })
        .collect()
}

/// GET /api/roles - Every role with its description and permissions
pub async fn list() -> ApiResult<Vec<RoleInfo>> {
    Ok(ApiResponse::success(role_catalog()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_role() {
        let names: Vec<&str> = role_catalog().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["admin", "prodi", "dosen", "student"]);
    }
}
