//! Translation between declared resource state and backend parameters.

use serde_json::Value;
use thiserror::Error;

use crate::catalog::{
    EXTERNAL_IP_ATTRIBUTE, EXTERNAL_PORT_ATTRIBUTE, INSTANCE_URL_ATTRIBUTE, NAME_ATTRIBUTE,
    ServiceDefinition,
};
use crate::client::{DecodeError, InstanceParams, InstanceRecord, PortMapping};
use crate::framework::{AttrValue, AttributeType, ResourceState};

/// Errors raised while validating a plan against a service definition.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PlanError {
    /// Raised when a required attribute is null or absent.
    #[error("attribute {attribute} is required")]
    MissingAttribute {
        /// Attribute name.
        attribute: String,
    },
    /// Raised when a value does not match the declared type.
    #[error("attribute {attribute} expects a {expected} value, got {actual}")]
    TypeMismatch {
        /// Attribute name.
        attribute: String,
        /// Declared type.
        expected: AttributeType,
        /// Type of the supplied value.
        actual: String,
    },
    /// Raised when an integer does not fit the declared width.
    #[error("attribute {attribute} value {value} does not fit in int32")]
    OutOfRange {
        /// Attribute name.
        attribute: String,
        /// Supplied value.
        value: i64,
    },
    /// Raised when the plan carries an attribute the schema does not declare.
    #[error("attribute {attribute} is not supported by {resource_type}")]
    UnknownAttribute {
        /// Attribute name.
        attribute: String,
        /// Resource type being planned.
        resource_type: String,
    },
}

/// Reads the instance name from a plan or state.
///
/// # Errors
///
/// Returns [`PlanError::MissingAttribute`] when `name` is absent, null, or
/// blank and [`PlanError::TypeMismatch`] when it is not a string.
pub fn instance_name(state: &ResourceState) -> Result<&str, PlanError> {
    match state.get(NAME_ATTRIBUTE) {
        None | Some(AttrValue::Null) => Err(PlanError::MissingAttribute {
            attribute: NAME_ATTRIBUTE.to_owned(),
        }),
        Some(AttrValue::String(name)) if name.trim().is_empty() => {
            Err(PlanError::MissingAttribute {
                attribute: NAME_ATTRIBUTE.to_owned(),
            })
        }
        Some(AttrValue::String(name)) => Ok(name),
        Some(other) => Err(PlanError::TypeMismatch {
            attribute: NAME_ATTRIBUTE.to_owned(),
            expected: AttributeType::String,
            actual: other.type_label().to_owned(),
        }),
    }
}

fn is_computed(definition: &ServiceDefinition, attribute: &str) -> bool {
    (definition.exposes_url && attribute == INSTANCE_URL_ATTRIBUTE)
        || (definition.has_ports
            && (attribute == EXTERNAL_IP_ATTRIBUTE || attribute == EXTERNAL_PORT_ATTRIBUTE))
}

fn to_json(attribute: &str, kind: AttributeType, value: &AttrValue) -> Result<Value, PlanError> {
    let mismatch = || PlanError::TypeMismatch {
        attribute: attribute.to_owned(),
        expected: kind,
        actual: value.type_label().to_owned(),
    };
    match (kind, value) {
        (AttributeType::String, AttrValue::String(text)) => Ok(Value::from(text.as_str())),
        (AttributeType::Bool, AttrValue::Bool(flag)) => Ok(Value::from(*flag)),
        (AttributeType::Int32, AttrValue::Number(number)) => i32::try_from(*number)
            .map(Value::from)
            .map_err(|_| PlanError::OutOfRange {
                attribute: attribute.to_owned(),
                value: *number,
            }),
        _ => Err(mismatch()),
    }
}

/// Builds the create-call parameter map from a plan.
///
/// `name` is always sent under the `name` key; declared attributes are sent
/// under their catalog `remote_key`, and null optional attributes are omitted.
///
/// # Errors
///
/// Returns [`PlanError`] when the plan does not satisfy the definition.
pub fn request_params(
    definition: &ServiceDefinition,
    planned: &ResourceState,
) -> Result<InstanceParams, PlanError> {
    if let Some(unknown) = planned.keys().find(|key| {
        key.as_str() != NAME_ATTRIBUTE
            && definition.attribute(key).is_none()
            && !is_computed(definition, key)
    }) {
        return Err(PlanError::UnknownAttribute {
            attribute: unknown.clone(),
            resource_type: definition.resource_type.clone(),
        });
    }

    let mut params = InstanceParams::new();
    params.insert(
        NAME_ATTRIBUTE.to_owned(),
        Value::from(instance_name(planned)?),
    );

    for attr in &definition.attributes {
        match planned.get(&attr.name) {
            None | Some(AttrValue::Null) if attr.required => {
                return Err(PlanError::MissingAttribute {
                    attribute: attr.name.clone(),
                });
            }
            None | Some(AttrValue::Null) => {}
            Some(value) => {
                params.insert(attr.remote_key.clone(), to_json(&attr.name, attr.kind, value)?);
            }
        }
    }
    Ok(params)
}

/// Assembles the state persisted after a successful create.
///
/// `ports` is only consulted for definitions with port mappings; an empty
/// list yields an empty IP and port `0`.
///
/// # Errors
///
/// Returns [`DecodeError::MalformedResponse`] when the definition exposes a
/// URL but the create response carried none.
pub fn created_state(
    definition: &ServiceDefinition,
    planned: &ResourceState,
    record: &InstanceRecord,
    ports: &[PortMapping],
) -> Result<ResourceState, DecodeError> {
    let mut state = ResourceState::new();
    state.insert(
        NAME_ATTRIBUTE.to_owned(),
        planned
            .get(NAME_ATTRIBUTE)
            .cloned()
            .unwrap_or_else(|| AttrValue::from(record.name.as_str())),
    );
    for attr in &definition.attributes {
        state.insert(
            attr.name.clone(),
            planned.get(&attr.name).cloned().unwrap_or(AttrValue::Null),
        );
    }

    if definition.exposes_url {
        let url = record
            .url
            .as_deref()
            .ok_or_else(|| DecodeError::MalformedResponse {
                what: String::from("instance"),
                message: format!("instance {} has no url", record.name),
            })?;
        state.insert(INSTANCE_URL_ATTRIBUTE.to_owned(), AttrValue::from(url));
    }

    if definition.has_ports {
        let (ip, port) = ports.first().map_or_else(
            || (String::new(), 0),
            |mapping| (mapping.external_ip.clone(), i64::from(mapping.external_port)),
        );
        state.insert(EXTERNAL_IP_ATTRIBUTE.to_owned(), AttrValue::String(ip));
        state.insert(EXTERNAL_PORT_ATTRIBUTE.to_owned(), AttrValue::Number(port));
    }
    Ok(state)
}

/// Names of declared (non-computed) attributes whose values differ.
#[must_use]
pub fn changed_inputs(
    definition: &ServiceDefinition,
    planned: &ResourceState,
    prior: &ResourceState,
) -> Vec<String> {
    std::iter::once(NAME_ATTRIBUTE)
        .chain(definition.attributes.iter().map(|attr| attr.name.as_str()))
        .filter(|name| {
            let before = prior.get(*name).unwrap_or(&AttrValue::Null);
            let after = planned.get(*name).unwrap_or(&AttrValue::Null);
            before != after
        })
        .map(str::to_owned)
        .collect()
}
