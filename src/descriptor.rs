//! Root entry descriptor
//!
//! The traversal never discovers its starting point: the root container is
//! identified out-of-band (typically harvested from the web client's own
//! traffic) and handed in as a [`RootDescriptor`].

use crate::fetcher::share_parser::deserialize_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Addressing information for the container a traversal starts from.
///
/// JSON files may use either the descriptive key names below or the keys
/// the web client uses (`fs_id`, `msg_id`, `uk`, `group_id`,
/// `server_filename`). Identifiers may be numbers or strings.
///
/// # Examples
///
/// ```
/// use share_tree_exporter::descriptor::RootDescriptor;
///
/// let json = r#"{"fs_id": 1234, "msg_id": "5678", "uk": 42, "group_id": 9001,
///                "server_filename": "Course material"}"#;
/// let root = RootDescriptor::from_json(json).unwrap();
/// assert_eq!(root.external_id, "1234");
/// assert_eq!(root.owner_id, "42");
/// assert_eq!(root.display_name, "Course material");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDescriptor {
    /// Identifier of the root container itself
    #[serde(alias = "fs_id", deserialize_with = "deserialize_id")]
    pub external_id: String,
    /// Identifier of the share message the container belongs to
    #[serde(alias = "msg_id", deserialize_with = "deserialize_id")]
    pub parent_collection_id: String,
    /// Identifier of the sharing user
    #[serde(alias = "uk", alias = "from_uk", deserialize_with = "deserialize_id")]
    pub owner_id: String,
    /// Identifier of the group conversation the share was posted in
    #[serde(alias = "group_id", alias = "gid", deserialize_with = "deserialize_id")]
    pub conversation_id: String,
    /// Name shown for the root in reports
    #[serde(alias = "server_filename", alias = "title", default)]
    pub display_name: String,
}

impl RootDescriptor {
    /// Build a descriptor from its parts.
    pub fn new(
        external_id: impl Into<String>,
        parent_collection_id: impl Into<String>,
        owner_id: impl Into<String>,
        conversation_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            parent_collection_id: parent_collection_id.into(),
            owner_id: owner_id.into(),
            conversation_id: conversation_id.into(),
            display_name: display_name.into(),
        }
    }

    /// Parse and validate a descriptor from JSON text.
    ///
    /// An empty display name falls back to the external identifier.
    pub fn from_json(json: &str) -> Result<Self, DescriptorError> {
        let mut descriptor: RootDescriptor = serde_json::from_str(json)
            .map_err(|e| DescriptorError::InvalidJson(e.to_string()))?;
        descriptor.display_name = descriptor.display_name.trim().to_string();
        if descriptor.display_name.is_empty() {
            descriptor.display_name = descriptor.external_id.clone();
        }
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Load and validate a descriptor file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DescriptorError::IoError(format!("{}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// Check that every identifier is present.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let fields = [
            ("externalId", &self.external_id),
            ("parentCollectionId", &self.parent_collection_id),
            ("ownerId", &self.owner_id),
            ("conversationId", &self.conversation_id),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(DescriptorError::MissingField(name.to_string()));
            }
        }

        Ok(())
    }
}

impl fmt::Display for RootDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (fs_id={}, msg_id={}, uk={}, gid={})",
            self.display_name,
            self.external_id,
            self.parent_collection_id,
            self.owner_id,
            self.conversation_id
        )
    }
}

/// Errors that can occur while loading a root descriptor
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// A required identifier is empty
    #[error("descriptor field '{0}' cannot be empty")]
    MissingField(String),

    /// Descriptor file could not be read
    #[error("IO error: {0}")]
    IoError(String),

    /// Descriptor JSON is malformed
    #[error("invalid descriptor JSON: {0}")]
    InvalidJson(String),
}
