//! Interfaces to the host catalog application.
//!
//! The host owns users, datasets and organizations; this crate only ever
//! reaches them through the traits below. Implementations live in the host
//! (and in `tests/common` for the test suite).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AppResult;

/// Organization capacity, ordered so "at least editor" is a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Editor,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub title: String,
    pub organization_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDisplay {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrgMember {
    pub user_id: String,
    pub capacity: Role,
    pub notify: bool,
}

/// Read-only lookups into the host's catalog.
#[async_trait]
pub trait HostDirectory: Send + Sync {
    async fn dataset(&self, dataset_id: &str) -> AppResult<Option<DatasetInfo>>;

    async fn user_display(&self, user_id: &str) -> AppResult<Option<UserDisplay>>;

    async fn organization_members(&self, org_id: &str) -> AppResult<Vec<OrgMember>>;

    /// Transitive child organizations, not including `org_id` itself.
    async fn organization_descendants(&self, org_id: &str) -> AppResult<Vec<String>>;

    /// Ids of all datasets owned by any of the given organizations.
    async fn organization_datasets(&self, org_ids: &[String]) -> AppResult<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdateDataset,
    UpdateOrganization,
}

/// Authorization oracle backed by the host's permission system.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn can(&self, user_id: &str, action: Action, object_id: &str) -> bool;
}

/// Privacy toggle used by the review gate.
#[async_trait]
pub trait DatasetControl: Send + Sync {
    async fn set_private(&self, dataset_id: &str, private: bool) -> AppResult<()>;
}

/// Best-effort outbound mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to_name: &str,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> anyhow::Result<()>;
}
