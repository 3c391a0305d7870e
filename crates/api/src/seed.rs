//! Startup seeding of the catalog and the user directory.
//!
//! The seed file is JSON:
//!
//! ```json
//! {
//!   "spaces":   [{ "id": "...", "name": "Room 101", "kind": "classroom",
//!                  "capacity": 20, "location": "Block A" }],
//!   "elements": [{ "id": "...", "name": "Projector", "category": "technology",
//!                  "stock_total": 3 }],
//!   "users":    [{ "id": "...", "role": "coordinator" }]
//! }
//! ```

use std::path::Path;

use common::UserId;
use domain::{Element, Role, Space};
use engine::InMemoryRoleDirectory;
use reservation_store::{CatalogStore, StoreError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to store seed record: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub spaces: Vec<Space>,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub users: Vec<UserSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    pub id: UserId,
    pub role: Role,
}

/// Counts of seeded records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub spaces: usize,
    pub elements: usize,
    pub users: usize,
}

impl SeedFile {
    pub async fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Upserts every record. Seeding the same file twice is harmless.
    pub async fn apply<C: CatalogStore>(
        &self,
        catalog: &C,
        directory: &InMemoryRoleDirectory,
    ) -> Result<SeedSummary, SeedError> {
        for space in &self.spaces {
            catalog.put_space(space.clone()).await?;
        }
        for element in &self.elements {
            catalog.put_element(element.clone()).await?;
        }
        for user in &self.users {
            directory.assign(user.id, user.role).await;
        }

        let summary = SeedSummary {
            spaces: self.spaces.len(),
            elements: self.elements.len(),
            users: self.users.len(),
        };
        tracing::info!(
            spaces = summary.spaces,
            elements = summary.elements,
            users = summary.users,
            "seed applied"
        );
        Ok(summary)
    }
}
