//! Host-facing resource contract.
//!
//! These types model the narrow slice of the plugin framework that resources
//! interact with: attribute schemas, attribute values, diagnostics, opaque
//! provider data, and the four lifecycle calls. Operations follow the
//! convention of reporting failures through [`Diagnostics`] and returning
//! `None`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Severity of a [`Diagnostic`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The operation failed.
    Error,
    /// The operation succeeded but the user should be told something.
    Warning,
}

/// A user-visible message returned to the host.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// One-line summary.
    pub summary: String,
    /// Longer explanation, usually carrying the underlying error.
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.detail.is_empty() {
            write!(f, "{label}: {}", self.summary)
        } else {
            write!(f, "{label}: {}: {}", self.summary, self.detail)
        }
    }
}

/// Accumulates diagnostics for a single host call.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error diagnostic.
    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.items.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    /// Records a warning diagnostic.
    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.items.push(Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    /// Returns `true` when at least one error was recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.items
            .iter()
            .any(|diag| diag.severity == Severity::Error)
    }

    /// Iterates over recorded error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|diag| diag.severity == Severity::Error)
    }

    /// Iterates over all recorded diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Number of recorded diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Value type of a schema attribute.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// UTF-8 string.
    String,
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int32,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int32 => "int32",
        })
    }
}

/// One attribute of a resource or provider schema.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SchemaAttribute {
    /// Attribute name as written in configuration.
    pub name: String,
    /// Value type.
    #[serde(rename = "type")]
    pub kind: AttributeType,
    /// Must be set in configuration.
    pub required: bool,
    /// May be set in configuration.
    pub optional: bool,
    /// Assigned by the provider.
    pub computed: bool,
    /// Hidden from plan output.
    pub sensitive: bool,
    /// A change forces destroy-and-recreate.
    pub requires_replace: bool,
    /// Human-readable description.
    pub description: String,
}

impl SchemaAttribute {
    /// A configuration-supplied attribute that must be set.
    #[must_use]
    pub fn required(name: &str, kind: AttributeType, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            required: true,
            optional: false,
            computed: false,
            sensitive: false,
            requires_replace: false,
            description: description.to_owned(),
        }
    }

    /// A configuration-supplied attribute that may be omitted.
    #[must_use]
    pub fn optional(name: &str, kind: AttributeType, description: &str) -> Self {
        Self {
            required: false,
            optional: true,
            ..Self::required(name, kind, description)
        }
    }

    /// An attribute assigned by the provider after creation.
    #[must_use]
    pub fn computed(name: &str, kind: AttributeType, description: &str) -> Self {
        Self {
            required: false,
            computed: true,
            ..Self::required(name, kind, description)
        }
    }

    /// Marks the attribute as sensitive.
    #[must_use]
    pub const fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// Marks the attribute as forcing replacement on change.
    #[must_use]
    pub const fn requires_replace(mut self, requires_replace: bool) -> Self {
        self.requires_replace = requires_replace;
        self
    }
}

/// Schema of a resource or provider block.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Schema {
    /// Human-readable description of the block.
    pub description: String,
    /// Attributes in declaration order.
    pub attributes: Vec<SchemaAttribute>,
}

impl Schema {
    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

/// Value of a single attribute in a plan or state.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Unset.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Number(i64),
    /// String value.
    String(String),
}

impl AttrValue {
    /// Returns `true` for [`AttrValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Type label used in error messages.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// Planned configuration or persisted state of one resource instance.
pub type ResourceState = BTreeMap<String, AttrValue>;

/// Opaque value handed from the provider's configure step to resources.
pub type ProviderData = Arc<dyn Any + Send + Sync>;

/// Future returned by resource lifecycle calls.
pub type ResourceFuture<'a, T> = Pin<Box<dyn Future<Output = Option<T>> + Send + 'a>>;

/// Lifecycle contract every resource type implements.
pub trait Resource: Send + Sync {
    /// Full resource type name, for example `osc_valkey_instance`.
    fn type_name(&self) -> &str;

    /// Attribute schema of the resource.
    fn schema(&self) -> Schema;

    /// Receives provider data produced by the provider's configure step.
    fn configure(&mut self, diags: &mut Diagnostics, data: Option<ProviderData>);

    /// Creates the remote object and returns the state to persist.
    fn create<'a>(
        &'a self,
        diags: &'a mut Diagnostics,
        planned: ResourceState,
    ) -> ResourceFuture<'a, ResourceState>;

    /// Refreshes the persisted state.
    fn read<'a>(
        &'a self,
        diags: &'a mut Diagnostics,
        state: ResourceState,
    ) -> ResourceFuture<'a, ResourceState>;

    /// Applies a planned change to an existing object.
    fn update<'a>(
        &'a self,
        diags: &'a mut Diagnostics,
        planned: ResourceState,
        prior: ResourceState,
    ) -> ResourceFuture<'a, ResourceState>;

    /// Deletes the remote object. `Some(())` means the state may be dropped.
    fn delete<'a>(
        &'a self,
        diags: &'a mut Diagnostics,
        state: ResourceState,
    ) -> ResourceFuture<'a, ()>;
}
