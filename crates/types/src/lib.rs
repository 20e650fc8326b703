//! Validated identifier types shared by the gridcheck crates.
//!
//! Values read from the database export are untrusted. These wrappers guarantee, once
//! constructed, that an identifier can be embedded in a data-grid path without changing the
//! meaning of that path.

/// Errors that can occur when constructing validated identifiers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The resource identifier was empty, contained whitespace, or contained a separator
    #[error("invalid resource short id {0:?}")]
    InvalidShortId(String),

    /// The federation prefix was not an absolute data-grid path
    #[error("invalid federation path {0:?}: {1}")]
    InvalidFederationPath(String, &'static str),
}

/// The short identifier of a resource.
///
/// Short ids name the top-level collection of a resource in the data grid, so they must be a
/// single path segment: non-empty, free of whitespace and free of `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortId(String);

impl ShortId {
    /// Validates `input` as a resource short id.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidShortId`] if the input is empty, contains whitespace,
    /// contains `/`, or is one of the relative segments `.` and `..`.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let input = input.as_ref();
        let ok = !input.is_empty()
            && input != "."
            && input != ".."
            && !input.chars().any(|c| c.is_whitespace() || c == '/');
        if !ok {
            return Err(TypesError::InvalidShortId(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for ShortId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ShortId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ShortId::new(&s).map_err(serde::de::Error::custom)
    }
}

/// The data-grid prefix under which a federated resource's collection lives.
///
/// Always absolute (`/zone/home/proxy`), never ends with `/`, and never contains `..`
/// segments. Surrounding whitespace is trimmed during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FederationPath(String);

impl FederationPath {
    /// Validates `input` as a federation prefix.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidFederationPath`] if the trimmed input is not absolute,
    /// names the grid root itself, or contains a `..` segment.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let raw = input.as_ref();
        let trimmed = raw.trim();
        if !trimmed.starts_with('/') {
            return Err(TypesError::InvalidFederationPath(
                raw.to_owned(),
                "must be an absolute path",
            ));
        }

        let trimmed = trimmed.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(TypesError::InvalidFederationPath(
                raw.to_owned(),
                "must name a collection below the grid root",
            ));
        }

        if trimmed.split('/').any(|segment| segment == "..") {
            return Err(TypesError::InvalidFederationPath(
                raw.to_owned(),
                "must not contain '..' segments",
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FederationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FederationPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for FederationPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for FederationPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FederationPath::new(&s).map_err(serde::de::Error::custom)
    }
}
