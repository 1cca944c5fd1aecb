use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// App settings, stored as TOML next to the app data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    /// Where compressed photos are written before upload
    pub cache_dir: PathBuf,
    /// Directory the camera writes captures into
    pub camera_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data = get_app_data_dir();
        Self {
            api_base_url: "http://192.168.1.87:3001/api".to_string(),
            request_timeout_secs: 30,
            upload_timeout_secs: 60,
            cache_dir: data.join("photo-cache"),
            camera_dir: data.join("camera"),
            device_id: None,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Parses TOML; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        let mut config: AppConfig = toml::from_str(content)?;
        config.normalize()?;
        Ok(config)
    }

    /// Loads the config file, or defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            let mut config = Self::default();
            config.normalize()?;
            return Ok(config);
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("TOML serialize failed: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the device id, generating and persisting one when missing
    pub fn ensure_device_id(&mut self, path: &Path) -> Result<String, AppError> {
        if let Some(id) = &self.device_id {
            return Ok(id.clone());
        }
        let new_id = uuid::Uuid::new_v4().to_string();
        self.device_id = Some(new_id.clone());
        self.save(path)?;
        log::info!("Generated device id {}", new_id);
        Ok(new_id)
    }

    fn normalize(&mut self) -> Result<(), AppError> {
        let trimmed = self.api_base_url.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(AppError::Config("api_base_url must not be empty".to_string()));
        }
        self.api_base_url = trimmed;
        if self.request_timeout_secs == 0 || self.upload_timeout_secs == 0 {
            return Err(AppError::Config("timeouts must be at least one second".to_string()));
        }
        Ok(())
    }
}

/// Get the app data directory for the current platform
pub fn get_app_data_dir() -> PathBuf {
    #[cfg(target_os = "android")]
    {
        PathBuf::from("/data/data/id.fieldvisit.app/files")
    }

    #[cfg(not(target_os = "android"))]
    {
        PathBuf::from("./data")
    }
}

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    get_app_data_dir().join("field-visit.toml")
}
