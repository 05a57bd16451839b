pub mod config;
pub mod error;
pub mod host;
pub mod migration;
pub mod models;
pub mod services;

pub use error::{AppError, AppResult};
pub use host::{DatasetControl, HostDirectory, Mailer, PermissionChecker, Role};
