//! Difference data structure.

use serde::{Deserialize, Serialize};

/// A detected change for one project.
///
/// Field names on the wire match the `differences` collection layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DifferenceRecord {
    pub id: String,

    pub project: String,

    /// `None` when the project was not tracked before
    #[serde(rename = "existing_updatedDate")]
    pub existing_updated_date: Option<String>,

    #[serde(rename = "new_updatedDate")]
    pub new_updated_date: String,

    /// Links present in the new fetch but absent from the stored list
    #[serde(default)]
    pub link_diff: Vec<String>,
}

impl DifferenceRecord {
    /// Whether this records a project seen for the first time.
    pub fn is_new_project(&self) -> bool {
        self.existing_updated_date.is_none()
    }

    /// Whether the update timestamp moved.
    pub fn date_changed(&self) -> bool {
        self.existing_updated_date.as_deref() != Some(self.new_updated_date.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let diff = DifferenceRecord {
            id: "1".into(),
            project: "Foo".into(),
            existing_updated_date: Some("2024-01-01T00:00:00Z".into()),
            new_updated_date: "2024-02-01T00:00:00Z".into(),
            link_diff: vec![],
        };
        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(value["existing_updatedDate"], "2024-01-01T00:00:00Z");
        assert_eq!(value["new_updatedDate"], "2024-02-01T00:00:00Z");
        assert!(diff.date_changed());
        assert!(!diff.is_new_project());
    }
}
