//! # Sales Auth
//!
//! Login session lifecycle for the field sales API.
//!
//! This crate provides:
//! - Device check (pre-fills the username bound to a device)
//! - Registration of a new salesperson for a device
//! - Login producing an explicit [`Session`]
//! - Password change for the logged-in user
//! - Logout by consuming the session
//!
//! ## Separation of Concerns
//!
//! There is no global "current user". The application holds the [`Session`]
//! and passes it to whatever needs the user name or the bearer token.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use sales_auth::AuthService;
//!
//! let service = AuthService::new("http://192.168.1.87:3001/api", Duration::from_secs(30))?;
//! let session = service.login("budi", "secret", &device_id).await?;
//! // ... submit visits with &session ...
//! session.logout();
//! ```

pub mod models;
pub mod service;

pub use models::{ApiResponse, SalesUser, Session, BRANCHES, POSITIONS};
pub use service::{interpret_response, AuthError, AuthService};
