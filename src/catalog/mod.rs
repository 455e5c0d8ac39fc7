//! Service catalog driving the generated resource types.
//!
//! Each [`ServiceDefinition`] describes one orchestrated service: the
//! resource type name exposed to configuration, the backend service
//! identifier, its parameters, and which computed endpoints it reports. The
//! builtin catalog is embedded at compile time; additional catalog files can
//! be merged at runtime.

use std::collections::BTreeSet;
use std::sync::Arc;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use thiserror::Error;

use crate::framework::AttributeType;

/// Embedded builtin catalog.
const BUILTIN_CATALOG: &str = include_str!("services.json");

/// Prefix every resource type name must carry.
pub const RESOURCE_TYPE_PREFIX: &str = "osc_";

/// Attribute holding the instance name.
pub const NAME_ATTRIBUTE: &str = "name";
/// Computed attribute holding the instance endpoint.
pub const INSTANCE_URL_ATTRIBUTE: &str = "instance_url";
/// Computed attribute holding the external IP of the first port mapping.
pub const EXTERNAL_IP_ATTRIBUTE: &str = "external_ip";
/// Computed attribute holding the external port of the first port mapping.
pub const EXTERNAL_PORT_ATTRIBUTE: &str = "external_port";

const RESERVED_ATTRIBUTES: [&str; 4] = [
    NAME_ATTRIBUTE,
    INSTANCE_URL_ATTRIBUTE,
    EXTERNAL_IP_ATTRIBUTE,
    EXTERNAL_PORT_ATTRIBUTE,
];

/// One service-specific parameter.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct AttributeSpec {
    /// Attribute name in configuration (snake case).
    pub name: String,
    /// Key sent to the backend in the create call.
    pub remote_key: String,
    /// Value type.
    pub kind: AttributeType,
    /// Whether configuration must supply the value.
    #[serde(default)]
    pub required: bool,
    /// Whether the value is hidden from plan output.
    #[serde(default)]
    pub sensitive: bool,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

const fn default_immutable() -> bool {
    true
}

/// Declarative description of one orchestrated service.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ServiceDefinition {
    /// Resource type name, for example `osc_valkey_instance`.
    pub resource_type: String,
    /// Backend service identifier, for example `valkey-io-valkey`.
    pub service_id: String,
    /// Human-readable description of the resource.
    #[serde(default)]
    pub description: String,
    /// Service-specific parameters.
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
    /// The create response carries an instance URL.
    #[serde(default)]
    pub exposes_url: bool,
    /// The service exposes port mappings via the ports lookup.
    #[serde(default)]
    pub has_ports: bool,
    /// Instances cannot be modified in place.
    #[serde(default = "default_immutable")]
    pub immutable: bool,
}

impl ServiceDefinition {
    /// Looks up a parameter by attribute name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Checks naming rules for the definition and its attributes.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] describing the first rule violation.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let suffix = self.resource_type.strip_prefix(RESOURCE_TYPE_PREFIX);
        if !suffix.is_some_and(is_snake_case) {
            return Err(CatalogError::InvalidResourceType {
                resource_type: self.resource_type.clone(),
            });
        }
        if self.service_id.trim().is_empty() {
            return Err(CatalogError::MissingServiceId {
                resource_type: self.resource_type.clone(),
            });
        }

        let mut names = BTreeSet::new();
        let mut remote_keys = BTreeSet::from([NAME_ATTRIBUTE]);
        for attr in &self.attributes {
            if RESERVED_ATTRIBUTES.contains(&attr.name.as_str()) {
                return Err(CatalogError::ReservedAttribute {
                    resource_type: self.resource_type.clone(),
                    attribute: attr.name.clone(),
                });
            }
            if !is_snake_case(&attr.name) {
                return Err(CatalogError::InvalidAttributeName {
                    resource_type: self.resource_type.clone(),
                    attribute: attr.name.clone(),
                });
            }
            if !names.insert(attr.name.as_str()) {
                return Err(CatalogError::DuplicateAttribute {
                    resource_type: self.resource_type.clone(),
                    attribute: attr.name.clone(),
                });
            }
            if attr.remote_key.trim().is_empty() || !remote_keys.insert(attr.remote_key.as_str()) {
                return Err(CatalogError::DuplicateRemoteKey {
                    resource_type: self.resource_type.clone(),
                    remote_key: attr.remote_key.clone(),
                });
            }
        }
        Ok(())
    }
}

fn is_snake_case(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some_and(|ch| ch.is_ascii_lowercase())
        && chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    services: Vec<ServiceDefinition>,
}

/// Errors raised while loading or validating a catalog.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CatalogError {
    /// Raised when a catalog file cannot be read.
    #[error("failed to read catalog {path}: {message}")]
    Io {
        /// Path of the catalog file.
        path: String,
        /// Underlying I/O error message.
        message: String,
    },
    /// Raised when catalog JSON cannot be parsed.
    #[error("failed to parse catalog {source_name}: {message}")]
    Parse {
        /// Where the catalog came from.
        source_name: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when two definitions share a resource type name.
    #[error("duplicate resource type {resource_type}")]
    DuplicateResourceType {
        /// Offending resource type.
        resource_type: String,
    },
    /// Raised when a resource type lacks the provider prefix or is not snake case.
    #[error("invalid resource type {resource_type}: expected osc_<snake_case>")]
    InvalidResourceType {
        /// Offending resource type.
        resource_type: String,
    },
    /// Raised when a definition has no service identifier.
    #[error("resource type {resource_type} has no service_id")]
    MissingServiceId {
        /// Offending resource type.
        resource_type: String,
    },
    /// Raised when an attribute name is not snake case.
    #[error("resource type {resource_type}: attribute {attribute} is not snake case")]
    InvalidAttributeName {
        /// Resource type declaring the attribute.
        resource_type: String,
        /// Offending attribute.
        attribute: String,
    },
    /// Raised when an attribute shadows a provider-managed attribute.
    #[error("resource type {resource_type}: attribute {attribute} is reserved")]
    ReservedAttribute {
        /// Resource type declaring the attribute.
        resource_type: String,
        /// Offending attribute.
        attribute: String,
    },
    /// Raised when an attribute name is declared twice.
    #[error("resource type {resource_type}: attribute {attribute} declared twice")]
    DuplicateAttribute {
        /// Resource type declaring the attribute.
        resource_type: String,
        /// Offending attribute.
        attribute: String,
    },
    /// Raised when a remote key is empty or mapped twice.
    #[error("resource type {resource_type}: remote key '{remote_key}' is empty or mapped twice")]
    DuplicateRemoteKey {
        /// Resource type declaring the key.
        resource_type: String,
        /// Offending remote key.
        remote_key: String,
    },
}

/// Validated, ordered set of service definitions.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    services: Vec<Arc<ServiceDefinition>>,
}

impl Catalog {
    /// Loads the catalog embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the embedded catalog is invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json("builtin", BUILTIN_CATALOG)
    }

    /// Parses and validates catalog JSON. `source_name` labels errors.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for invalid JSON and a validation
    /// variant for rule violations.
    pub fn from_json(source_name: &str, content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(content).map_err(|err| CatalogError::Parse {
                source_name: source_name.to_owned(),
                message: err.to_string(),
            })?;
        let mut catalog = Self::default();
        for definition in file.services {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    /// Loads a catalog file and merges it into this catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] when the file cannot be read, or any
    /// parse/validation error including duplicates against this catalog.
    pub fn with_file(mut self, path: &Utf8Path) -> Result<Self, CatalogError> {
        let content = read_to_string_ambient(path).map_err(|message| CatalogError::Io {
            path: path.to_string(),
            message,
        })?;
        let extra = Self::from_json(path.as_str(), &content)?;
        self.merge(extra)?;
        Ok(self)
    }

    /// Appends every definition of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateResourceType`] when a resource type is
    /// already present.
    pub fn merge(&mut self, other: Self) -> Result<(), CatalogError> {
        for definition in other.services {
            if self.get(&definition.resource_type).is_some() {
                return Err(CatalogError::DuplicateResourceType {
                    resource_type: definition.resource_type.clone(),
                });
            }
            self.services.push(definition);
        }
        Ok(())
    }

    /// Validates and appends a single definition.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when validation fails or the resource type is
    /// already present.
    pub fn insert(&mut self, definition: ServiceDefinition) -> Result<(), CatalogError> {
        definition.validate()?;
        if self.get(&definition.resource_type).is_some() {
            return Err(CatalogError::DuplicateResourceType {
                resource_type: definition.resource_type,
            });
        }
        self.services.push(Arc::new(definition));
        Ok(())
    }

    /// Looks up a definition by resource type name.
    #[must_use]
    pub fn get(&self, resource_type: &str) -> Option<&Arc<ServiceDefinition>> {
        self.services
            .iter()
            .find(|definition| definition.resource_type == resource_type)
    }

    /// Looks up a definition by backend service identifier.
    #[must_use]
    pub fn find_by_service_id(&self, service_id: &str) -> Option<&Arc<ServiceDefinition>> {
        self.services
            .iter()
            .find(|definition| definition.service_id == service_id)
    }

    /// Iterates over definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ServiceDefinition>> {
        self.services.iter()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` when the catalog has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

fn read_to_string_ambient(path: &Utf8Path) -> Result<String, String> {
    let (dir_path, file_path) = if path.is_absolute() {
        let parent = path
            .parent()
            .ok_or_else(|| format!("path has no parent directory: {path}"))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| format!("path has no file name: {path}"))?;
        (parent, Utf8Path::new(file_name))
    } else {
        (Utf8Path::new("."), path)
    };

    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    dir.read_to_string(file_path).map_err(|err| err.to_string())
}
