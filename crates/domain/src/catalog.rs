//! Catalog records: spaces and borrowable elements.
//!
//! The catalog is maintained by administrators. The reservation core only
//! reads status, capacity and stock from these records.

use common::{ElementId, SpaceId};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::text_enum::text_enum;

/// What kind of venue a space is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    Classroom,
    Lab,
    Auditorium,
    Outdoor,
    Other,
}

text_enum!(SpaceKind, "space kind" {
    Classroom => "classroom",
    Lab => "lab",
    Auditorium => "auditorium",
    Outdoor => "outdoor",
    Other => "other",
});

/// Operational status of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceStatus {
    #[default]
    Available,
    Maintenance,
    Blocked,
}

text_enum!(SpaceStatus, "space status" {
    Available => "available",
    Maintenance => "maintenance",
    Blocked => "blocked",
});

impl SpaceStatus {
    /// Only available spaces accept new submissions or approvals.
    pub fn accepts_reservations(&self) -> bool {
        matches!(self, SpaceStatus::Available)
    }
}

/// A reservable physical room or venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub kind: SpaceKind,
    /// Number of people the space holds.
    pub capacity: u32,
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: SpaceStatus,
}

impl Space {
    /// Creates an available space with a fresh identifier.
    pub fn new(
        name: impl Into<String>,
        kind: SpaceKind,
        capacity: u32,
        location: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let space = Self {
            id: SpaceId::new(),
            name: name.into(),
            kind,
            capacity,
            location: location.into(),
            description: None,
            status: SpaceStatus::Available,
        };
        space.validate()?;
        Ok(space)
    }

    /// Returns the space with another status.
    pub fn with_status(mut self, status: SpaceStatus) -> Self {
        self.status = status;
        self
    }

    /// Checks the record invariants enforced on every catalog write.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if self.capacity == 0 {
            return Err(CatalogError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

/// Category of a borrowable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    Furniture,
    Technology,
    Decoration,
    Audio,
    Lighting,
    Other,
}

text_enum!(ElementCategory, "element category" {
    Furniture => "furniture",
    Technology => "technology",
    Decoration => "decoration",
    Audio => "audio",
    Lighting => "lighting",
    Other => "other",
});

/// Operational status of an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementStatus {
    #[default]
    Available,
    Maintenance,
    Decommissioned,
}

text_enum!(ElementStatus, "element status" {
    Available => "available",
    Maintenance => "maintenance",
    Decommissioned => "decommissioned",
});

impl ElementStatus {
    /// Only available elements can be lent out.
    pub fn is_lendable(&self) -> bool {
        matches!(self, ElementStatus::Available)
    }
}

/// A borrowable item with finite stock (projector, microphone, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    pub category: ElementCategory,
    /// Total units owned by the institution.
    pub stock_total: u32,
    #[serde(default)]
    pub status: ElementStatus,
}

impl Element {
    /// Creates an available element with a fresh identifier.
    pub fn new(
        name: impl Into<String>,
        category: ElementCategory,
        stock_total: u32,
    ) -> Result<Self, CatalogError> {
        let element = Self {
            id: ElementId::new(),
            name: name.into(),
            category,
            stock_total,
            status: ElementStatus::Available,
        };
        element.validate()?;
        Ok(element)
    }

    /// Returns the element with another status.
    pub fn with_status(mut self, status: ElementStatus) -> Self {
        self.status = status;
        self
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_requires_positive_capacity() {
        let err = Space::new("Room", SpaceKind::Classroom, 0, "Block A").unwrap_err();
        assert_eq!(err, CatalogError::InvalidCapacity(0));
    }

    #[test]
    fn space_requires_name() {
        let err = Space::new("  ", SpaceKind::Lab, 10, "Block A").unwrap_err();
        assert_eq!(err, CatalogError::EmptyName);
    }

    #[test]
    fn only_available_spaces_accept_reservations() {
        assert!(SpaceStatus::Available.accepts_reservations());
        assert!(!SpaceStatus::Maintenance.accepts_reservations());
        assert!(!SpaceStatus::Blocked.accepts_reservations());
    }

    #[test]
    fn only_available_elements_are_lendable() {
        assert!(ElementStatus::Available.is_lendable());
        assert!(!ElementStatus::Maintenance.is_lendable());
        assert!(!ElementStatus::Decommissioned.is_lendable());
    }

    #[test]
    fn enum_text_matches_wire_format() {
        assert_eq!(SpaceKind::Auditorium.as_str(), "auditorium");
        assert_eq!("blocked".parse::<SpaceStatus>().unwrap(), SpaceStatus::Blocked);
        assert!("broken".parse::<ElementStatus>().is_err());

        let json = serde_json::to_string(&ElementCategory::Lighting).unwrap();
        assert_eq!(json, "\"lighting\"");
    }

    #[test]
    fn element_defaults_to_available() {
        let element = Element::new("Projector", ElementCategory::Technology, 3).unwrap();
        assert_eq!(element.status, ElementStatus::Available);
        assert_eq!(element.stock_total, 3);
    }
}
