use serde::{Deserialize, Serialize};

/// Body of `POST /login`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub device_id: String,
}

/// Body of `POST /check-device`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCheckRequest {
    pub device_id: String,
}

/// Body of `POST /ganti-password`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub user: String,
    pub old_password: String,
    pub new_password: String,
}

/// Body of `POST /register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    #[serde(rename = "nama")]
    pub name: String,
    pub password: String,
    #[serde(rename = "jabatan")]
    pub position: String,
    #[serde(rename = "cabang")]
    pub branch: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

/// Positions the server accepts at registration
pub const POSITIONS: [&str; 2] = ["MANAGER", "SALES"];

/// Branches the server accepts at registration
pub const BRANCHES: [&str; 4] = ["PUSAT", "JATIM", "JATENG", "JAKARTA"];

/// Salesperson profile returned by a successful login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesUser {
    pub id: i64,
    #[serde(rename = "nama")]
    pub name: String,
    #[serde(rename = "jabatan", default)]
    pub position: String,
    #[serde(rename = "cabang", default)]
    pub branch: String,
    #[serde(default)]
    pub kode: Option<String>,
    #[serde(default)]
    pub sal_kode: Option<String>,
    #[serde(default)]
    pub kode_sales: Option<String>,
}

/// Generic `{ success, message, ... }` answer of the field API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<SalesUser>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Logged-in salesperson. Created by login, consumed by logout.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub base_url: String,
    pub user: SalesUser,
    pub token: Option<String>,
}

impl Session {
    /// Name the API expects in the `user` field of records
    pub fn user_name(&self) -> &str {
        &self.user.name
    }

    /// Ends the session; the value cannot be used afterwards
    pub fn logout(self) {
        log::info!("User {} logged out", self.user.name);
    }
}
