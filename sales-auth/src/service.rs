use crate::models::{
    ApiResponse, ChangePasswordRequest, DeviceCheckRequest, LoginRequest, RegisterRequest,
    Session, BRANCHES, POSITIONS,
};
use serde::Serialize;
use std::time::Duration;

const CONNECTION_FAILED: &str = "Could not connect to server";

/// Error type for authentication operations
#[derive(Debug)]
pub enum AuthError {
    /// Rejected locally before any request was made
    Validation(String),
    NetworkError(String),
    JsonError(String),
    /// Server answered with `success: false` or an error status
    Rejected(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AuthError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            AuthError::JsonError(msg) => write!(f, "JSON error: {}", msg),
            AuthError::Rejected(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// Text suitable for showing to the salesperson
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(msg) | AuthError::Rejected(msg) => msg.clone(),
            AuthError::NetworkError(_) | AuthError::JsonError(_) => CONNECTION_FAILED.to_string(),
        }
    }
}

/// Turns a raw answer into the API envelope.
///
/// Non-2xx statuses and `success: false` become [`AuthError::Rejected`],
/// preferring the server's message over `fallback`.
pub fn interpret_response(status: u16, body: &str, fallback: &str) -> Result<ApiResponse, AuthError> {
    let parsed: Option<ApiResponse> = serde_json::from_str(body).ok();
    let status_ok = (200..300).contains(&status);

    match parsed {
        Some(response) if status_ok && response.success => Ok(response),
        Some(response) => Err(AuthError::Rejected(
            response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
        )),
        None if status_ok => Err(AuthError::JsonError(format!(
            "Failed to parse response: {:?}",
            body
        ))),
        None => Err(AuthError::Rejected(fallback.to_string())),
    }
}

/// Login and account operations against the field API
pub struct AuthService {
    base_url: String,
    client: reqwest::Client,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("FieldVisit/0.1.0")
            .build()
            .map_err(|e| AuthError::NetworkError(format!("Client build failed: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
        fallback: &str,
    ) -> Result<ApiResponse, AuthError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("Request failed: {}", e)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::NetworkError(format!("Reading response failed: {}", e)))?;

        log::debug!("POST {} -> {}", url, status);
        interpret_response(status, &text, fallback)
    }

    /// Returns the username bound to this device, if the server knows one
    pub async fn check_device(&self, device_id: &str) -> Result<Option<String>, AuthError> {
        let body = DeviceCheckRequest {
            device_id: device_id.to_string(),
        };
        match self
            .post("/check-device", &body, None, "Device check failed")
            .await
        {
            Ok(response) => Ok(response.username.filter(|u| !u.trim().is_empty())),
            Err(AuthError::Rejected(msg)) => {
                log::debug!("Device {} not registered: {}", device_id, msg);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Logs in and creates the session every other call is made with
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        device_id: &str,
    ) -> Result<Session, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            device_id: device_id.to_string(),
        };
        let response = self.post("/login", &body, None, "Login failed").await?;

        let user = response.user.ok_or_else(|| {
            AuthError::JsonError("Login response is missing the user".to_string())
        })?;
        log::info!("Logged in as {} ({})", user.name, user.branch);

        Ok(Session {
            base_url: self.base_url.clone(),
            user,
            token: response.token,
        })
    }

    /// Registers a new salesperson bound to `device_id`.
    ///
    /// `position` and `branch` are matched case-insensitively against
    /// [`POSITIONS`] and [`BRANCHES`]. Returns the server's confirmation text.
    pub async fn register(
        &self,
        name: &str,
        password: &str,
        position: &str,
        branch: &str,
        device_id: &str,
    ) -> Result<String, AuthError> {
        let request = validate_registration(name, password, position, branch, device_id)?;
        let response = self
            .post("/register", &request, None, "Registration failed")
            .await?;

        log::info!("Registered {} ({}, {})", request.name, request.position, request.branch);
        Ok(response
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Registration successful".to_string()))
    }

    /// Changes the password of the logged-in user
    pub async fn change_password(
        &self,
        session: &Session,
        old_password: &str,
        new_password: &str,
    ) -> Result<String, AuthError> {
        validate_password_change(old_password, new_password)?;

        let body = ChangePasswordRequest {
            user: session.user.name.clone(),
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        let response = self
            .post(
                "/ganti-password",
                &body,
                session.token.as_deref(),
                "Failed to change password",
            )
            .await?;

        Ok(response
            .message
            .unwrap_or_else(|| "Password changed".to_string()))
    }
}

fn validate_registration(
    name: &str,
    password: &str,
    position: &str,
    branch: &str,
    device_id: &str,
) -> Result<RegisterRequest, AuthError> {
    let name = name.trim();
    if name.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "Name and password are required".to_string(),
        ));
    }
    if password.chars().count() < 3 {
        return Err(AuthError::Validation(
            "Password must be at least 3 characters".to_string(),
        ));
    }
    let position = position.trim().to_ascii_uppercase();
    if !POSITIONS.contains(&position.as_str()) {
        return Err(AuthError::Validation(format!(
            "Position must be one of {}",
            POSITIONS.join(", ")
        )));
    }
    let branch = branch.trim().to_ascii_uppercase();
    if !BRANCHES.contains(&branch.as_str()) {
        return Err(AuthError::Validation(format!(
            "Branch must be one of {}",
            BRANCHES.join(", ")
        )));
    }

    Ok(RegisterRequest {
        name: name.to_string(),
        password: password.to_string(),
        position,
        branch,
        device_id: device_id.to_string(),
    })
}

fn validate_password_change(old_password: &str, new_password: &str) -> Result<(), AuthError> {
    if old_password.chars().count() < 3 || new_password.chars().count() < 3 {
        return Err(AuthError::Validation(
            "Password must be at least 3 characters".to_string(),
        ));
    }
    Ok(())
}
