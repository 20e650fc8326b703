//! Resource catalog loaded from a database export.
//!
//! The catalog stands in for the relational database: it is a YAML or JSON document listing
//! resources and their file records, either as a bare list or under a `resources:` key.
//!
//! ```yaml
//! resources:
//!   - short_id: abc123
//!     resource_type: CompositeResource
//!     title: Rivers
//!     files:
//!       - local_name: a.txt
//!       - federated_name_or_path: data/contents/x/b.csv
//!         folder: x
//! ```

use crate::resource::Resource;
use crate::{CheckError, CheckResult};
use gridcheck_types::ShortId;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Wrapped { resources: Vec<Resource> },
    Bare(Vec<Resource>),
}

impl CatalogDocument {
    fn into_resources(self) -> Vec<Resource> {
        match self {
            CatalogDocument::Wrapped { resources } | CatalogDocument::Bare(resources) => {
                resources
            }
        }
    }
}

/// The resources known to the database, in export order.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    resources: Vec<Resource>,
}

impl ResourceCatalog {
    /// Builds a catalog, rejecting duplicate short ids.
    pub fn new(resources: Vec<Resource>) -> CheckResult<Self> {
        let mut seen = HashSet::new();
        for resource in &resources {
            if !seen.insert(&resource.short_id) {
                return Err(CheckError::InvalidInput(format!(
                    "duplicate resource short id {} in catalog",
                    resource.short_id
                )));
            }
        }
        Ok(Self { resources })
    }

    /// Loads a catalog file. `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> CheckResult<Self> {
        let contents = fs::read_to_string(path).map_err(CheckError::FileRead)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let catalog = if is_json {
            Self::from_json_str(&contents)?
        } else {
            Self::from_yaml_str(&contents)?
        };

        tracing::debug!(
            "loaded {} resources from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_yaml_str(contents: &str) -> CheckResult<Self> {
        let document: CatalogDocument =
            serde_yaml::from_str(contents).map_err(CheckError::YamlDeserialization)?;
        Self::new(document.into_resources())
    }

    pub fn from_json_str(contents: &str) -> CheckResult<Self> {
        let document: CatalogDocument =
            serde_json::from_str(contents).map_err(CheckError::Deserialization)?;
        Self::new(document.into_resources())
    }

    pub fn get(&self, short_id: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|resource| resource.short_id.as_str() == short_id)
    }

    /// Like [`ResourceCatalog::get`], with a missing resource as an error.
    pub fn require(&self, short_id: &str) -> CheckResult<&Resource> {
        self.get(short_id)
            .ok_or_else(|| CheckError::ResourceNotFound(short_id.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn short_ids(&self) -> impl Iterator<Item = &ShortId> {
        self.resources.iter().map(|resource| &resource.short_id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
