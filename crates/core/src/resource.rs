//! Resource and file-record model.
//!
//! A [`Resource`] and its [`FileRecord`]s mirror the database rows the checker reads. The
//! rows carry three nullable legacy name columns; [`FileRecord::file_name`] folds them into
//! the [`FileName`] variant at the boundary so the inference engine can match exhaustively
//! instead of re-deriving absence and precedence rules.

use crate::constants::{ABSENT_NAME_SENTINEL, DEFAULT_RESOURCE_TYPE};
use gridcheck_types::{FederationPath, ShortId};
use serde::{Deserialize, Deserializer, Serialize};

/// A top-level container of files, as recorded in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique, immutable identifier; also the name of the resource's root collection.
    pub short_id: ShortId,

    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(default)]
    pub title: String,

    /// Federation prefix. Absent or empty in the database means the resource is local.
    #[serde(
        default,
        deserialize_with = "deserialize_federation_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub federation_path: Option<FederationPath>,

    #[serde(default)]
    pub files: Vec<FileRecord>,
}

fn default_resource_type() -> String {
    DEFAULT_RESOURCE_TYPE.to_owned()
}

fn deserialize_federation_path<'de, D>(deserializer: D) -> Result<Option<FederationPath>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) if !value.trim().is_empty() => FederationPath::new(&value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

impl Resource {
    pub fn new(short_id: ShortId) -> Self {
        Self {
            short_id,
            resource_type: default_resource_type(),
            title: String::new(),
            federation_path: None,
            files: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_federation_path(mut self, federation_path: FederationPath) -> Self {
        self.federation_path = Some(federation_path);
        self
    }

    #[must_use]
    pub fn with_file(mut self, record: FileRecord) -> Self {
        self.files.push(record);
        self
    }

    #[must_use]
    pub fn with_title(mut self, resource_type: &str, title: &str) -> Self {
        self.resource_type = resource_type.to_owned();
        self.title = title.to_owned();
        self
    }

    pub fn is_federated(&self) -> bool {
        self.federation_path.is_some()
    }
}

/// The database's record of one file, with its legacy path encodings.
///
/// At most one of the three name columns should be present. That is checked by
/// [`FileRecord::file_name`], never assumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Name relative to an unfederated resource.
    #[serde(default)]
    pub local_name: Option<String>,

    /// Name relative to a federated resource's storage root.
    #[serde(default)]
    pub federated_name: Option<String>,

    /// Loose hybrid column accepting either qualification style.
    #[serde(default)]
    pub federated_name_or_path: Option<String>,

    /// Folder the record claims the file lives in. May be stale.
    #[serde(default)]
    pub folder: Option<String>,
}

impl FileRecord {
    pub fn local(name: &str) -> Self {
        Self {
            local_name: Some(name.to_owned()),
            ..Self::default()
        }
    }

    pub fn federated(name: &str) -> Self {
        Self {
            federated_name: Some(name.to_owned()),
            ..Self::default()
        }
    }

    pub fn federated_or_path(name: &str) -> Self {
        Self {
            federated_name_or_path: Some(name.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_folder(mut self, folder: &str) -> Self {
        self.folder = Some(folder.to_owned());
        self
    }

    /// The recorded folder, with an empty value treated as absent.
    pub fn recorded_folder(&self) -> Option<&str> {
        self.folder.as_deref().filter(|folder| !folder.is_empty())
    }

    /// Folds the three legacy name columns into a single [`FileName`].
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguousName`] carrying every present name when more than one column is
    /// present after sentinel normalisation.
    pub fn file_name(&self) -> Result<FileName, AmbiguousName> {
        let local = normalise_name(self.local_name.as_deref());
        let federated = normalise_name(self.federated_name.as_deref());
        let or_path = normalise_name(self.federated_name_or_path.as_deref());

        match (local, federated, or_path) {
            (None, None, None) => Ok(FileName::Absent),
            (Some(name), None, None) => Ok(FileName::Local(name.to_owned())),
            (None, Some(name), None) => Ok(FileName::Federated(name.to_owned())),
            (None, None, Some(name)) => Ok(FileName::FederatedOrPath(name.to_owned())),
            _ => Err(AmbiguousName {
                names: [local, federated, or_path]
                    .into_iter()
                    .flatten()
                    .map(str::to_owned)
                    .collect(),
            }),
        }
    }
}

/// Treats the empty string and the literal `"None"` as an absent name.
pub fn normalise_name(raw: Option<&str>) -> Option<&str> {
    raw.filter(|name| !name.is_empty() && *name != ABSENT_NAME_SENTINEL)
}

/// The single recorded name of a file, tagged by the column it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileName {
    Local(String),
    Federated(String),
    FederatedOrPath(String),
    Absent,
}

impl FileName {
    /// The name exactly as recorded, if any.
    pub fn raw(&self) -> Option<&str> {
        match self {
            FileName::Local(name) | FileName::Federated(name) | FileName::FederatedOrPath(name) => {
                Some(name.as_str())
            }
            FileName::Absent => None,
        }
    }
}

/// More than one legacy name column is present on a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("more than one name for file: {}", .names.join(", "))]
pub struct AmbiguousName {
    pub names: Vec<String>,
}
