//! Wire types shared by the HTTP surface and its clients.

use serde::{Deserialize, Serialize};

use crate::gate::AdminConfig;
use crate::orchestrator::RequestedState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(error),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn ok() -> Self {
        Self {
            status: "success".to_string(),
            data: None,
            error: None,
        }
    }
}

/// Body of the create-user request. Absent fields deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub email: String,
    pub groups: Vec<String>,
}

/// Body of the modify-user request: the complete desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifyUserRequest {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub groups: Vec<String>,
}

impl ModifyUserRequest {
    pub fn requested_state(&self) -> RequestedState {
        RequestedState {
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            groups: self.groups.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteUserRequest {
    pub username: String,
}

/// Administration settings visible to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfigResponse {
    pub enabled: bool,
    pub admin_group: String,
    pub allow_admins_to_add_admins: bool,
}

impl From<&AdminConfig> for AdminConfigResponse {
    fn from(config: &AdminConfig) -> Self {
        Self {
            enabled: config.enabled,
            admin_group: config.admin_group.clone(),
            allow_admins_to_add_admins: config.allow_admins_to_add_admins,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstFactorRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokenResponse {
    pub token: String,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_shapes() {
        let ok = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(ok, json!({"status": "success"}));

        let err = serde_json::to_value(ApiResponse::<()>::error("password_weak".into())).unwrap();
        assert_eq!(err, json!({"status": "error", "error": "password_weak"}));
    }

    #[test]
    fn missing_create_fields_default_to_empty() {
        let request: CreateUserRequest =
            serde_json::from_value(json!({"username": "bob"})).unwrap();
        assert_eq!(request.username, "bob");
        assert!(request.password.is_empty());
        assert!(request.groups.is_empty());
    }
}
