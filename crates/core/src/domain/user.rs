use serde::{Deserialize, Serialize};

const ACTIVE_USER_STATUS: i32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub last_name: String,
    pub mail: String,
    pub status: i32,
    pub role: UserRole,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub role_name: String,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_USER_STATUS
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.last_name)
    }

    pub fn role_name(&self) -> &str {
        &self.role.role_name
    }
}
