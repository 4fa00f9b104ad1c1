//! Node attributes and ports.
//!
//! An [`Attribute`] is a named value stored on a node. Connectable
//! attributes are ports: they have a direction and a connection limit, and
//! edges attach to them by name.

use scenegraph_core::{AttrType, Value};
use scenegraph_template::{AttributeRecord, ConnectionType};
use serde::{Deserialize, Serialize};

/// Connection limit used when neither the caller nor the template sets one.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1;

/// Field names owned by the node itself; attributes may not use them.
pub const RESERVED_NAMES: &[&str] = &[
    "name",
    "node_type",
    "id",
    "color",
    "docstring",
    "width",
    "base_height",
    "force_expand",
    "pos",
    "enabled",
    "orientation",
    "style",
];

/// Returns whether `name` collides with a built-in node field.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// Attribute
// ============================================================================

/// A named, typed value stored on a node.
///
/// Attributes are only reachable through their owning node; nodes hand out
/// shared references, so every change goes through the node (and, for
/// nodes inside a graph, through the graph).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, unique within the node.
    pub name: String,
    /// Current value.
    #[serde(default)]
    pub value: Value,
    /// Declared type; `None` accepts any value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr_type: Option<AttrType>,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Hidden from end users entirely.
    #[serde(default, skip_serializing_if = "is_false")]
    pub private: bool,
    /// Not shown in attribute editors.
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Cannot be modified.
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    /// Must be set before evaluation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Added by a user rather than by the node type.
    #[serde(default)]
    pub user: bool,
    /// Whether this attribute is a port.
    #[serde(default, skip_serializing_if = "is_false")]
    pub connectable: bool,
    /// Port direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<ConnectionType>,
    /// Maximum edges on this port; 0 means unbounded.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Data type tag carried by the port (e.g. `file`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Value the attribute resets to.
    #[serde(default)]
    pub default_value: Value,
}

impl Attribute {
    /// Creates an attribute from a value and properties.
    ///
    /// When no type is given it is inferred from the value (falling back to
    /// the default value).
    pub fn new(name: impl Into<String>, value: Value, props: AttributeProps) -> Self {
        let default_value = props.default_value.unwrap_or_else(|| value.clone());
        let attr_type = props
            .attr_type
            .or_else(|| AttrType::infer(&value))
            .or_else(|| AttrType::infer(&default_value));
        let value = match &attr_type {
            Some(t) if t.accepts(&value) => t.coerce(value),
            _ => value,
        };
        let connectable = props.connectable.unwrap_or(props.connection_type.is_some());
        Self {
            name: name.into(),
            value,
            attr_type,
            label: props.label,
            desc: props.desc,
            private: props.private.unwrap_or(false),
            hidden: props.hidden.unwrap_or(false),
            locked: props.locked.unwrap_or(false),
            required: props.required.unwrap_or(false),
            user: props.user.unwrap_or(true),
            connectable,
            connection_type: if connectable { props.connection_type } else { None },
            max_connections: props.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            data_type: props.data_type,
            default_value,
        }
    }

    /// Returns whether this attribute is an input port.
    pub fn is_input(&self) -> bool {
        self.connectable && self.connection_type == Some(ConnectionType::Input)
    }

    /// Returns whether this attribute is an output port.
    pub fn is_output(&self) -> bool {
        self.connectable && self.connection_type == Some(ConnectionType::Output)
    }

    /// Returns whether the port accepts any number of edges.
    pub fn is_unbounded(&self) -> bool {
        self.max_connections == 0
    }

    /// Returns whether `value` fits the declared type. Untyped attributes
    /// take anything finite.
    pub fn accepts(&self, value: &Value) -> bool {
        match &self.attr_type {
            Some(t) => t.accepts(value),
            None => value.is_finite(),
        }
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &str {
        self.attr_type.as_ref().map(AttrType::name).unwrap_or("any")
    }
}

// ============================================================================
// AttributeProps
// ============================================================================

/// Optional properties for a new attribute.
///
/// Every field left as `None` is filled from the node type's template
/// record of the same name, then from built-in defaults.
///
/// # Example
///
/// ```rust
/// use scenegraph_core::AttrType;
/// use scenegraph_graph::AttributeProps;
///
/// let props = AttributeProps::new()
///     .with_type(AttrType::Float)
///     .with_label("Gain")
///     .locked(true);
/// assert_eq!(props.label.as_deref(), Some("Gain"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeProps {
    /// Declared type.
    pub attr_type: Option<AttrType>,
    /// Display label.
    pub label: Option<String>,
    /// Longer description.
    pub desc: Option<String>,
    /// Private flag.
    pub private: Option<bool>,
    /// Hidden flag.
    pub hidden: Option<bool>,
    /// Locked flag.
    pub locked: Option<bool>,
    /// Required flag.
    pub required: Option<bool>,
    /// User-defined flag.
    pub user: Option<bool>,
    /// Port flag.
    pub connectable: Option<bool>,
    /// Port direction.
    pub connection_type: Option<ConnectionType>,
    /// Connection limit.
    pub max_connections: Option<usize>,
    /// Port data type tag.
    pub data_type: Option<String>,
    /// Default value.
    pub default_value: Option<Value>,
}

impl AttributeProps {
    /// Creates empty properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties declared by a template record.
    pub fn from_record(record: &AttributeRecord) -> Self {
        Self {
            attr_type: record.attr_type(),
            label: record.label().map(str::to_string),
            desc: record.description().map(str::to_string),
            private: record.flag("private"),
            hidden: record.flag("hidden"),
            locked: record.flag("locked"),
            required: record.flag("required"),
            user: Some(false),
            connectable: record.connectable.then_some(true),
            connection_type: record.connection_type,
            max_connections: record.max_connections(),
            data_type: record.data_type().map(str::to_string),
            default_value: record.default_value().cloned(),
        }
    }

    /// Fills every unset field from `base`.
    pub fn or(self, base: AttributeProps) -> Self {
        Self {
            attr_type: self.attr_type.or(base.attr_type),
            label: self.label.or(base.label),
            desc: self.desc.or(base.desc),
            private: self.private.or(base.private),
            hidden: self.hidden.or(base.hidden),
            locked: self.locked.or(base.locked),
            required: self.required.or(base.required),
            user: self.user.or(base.user),
            connectable: self.connectable.or(base.connectable),
            connection_type: self.connection_type.or(base.connection_type),
            max_connections: self.max_connections.or(base.max_connections),
            data_type: self.data_type.or(base.data_type),
            default_value: self.default_value.or(base.default_value),
        }
    }

    /// Returns whether these properties describe a port.
    pub fn is_connectable(&self) -> bool {
        self.connectable
            .unwrap_or(self.connection_type.is_some())
    }

    /// Sets the declared type.
    pub fn with_type(mut self, attr_type: AttrType) -> Self {
        self.attr_type = Some(attr_type);
        self
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the description.
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Marks the attribute as an input port.
    pub fn input(mut self) -> Self {
        self.connectable = Some(true);
        self.connection_type = Some(ConnectionType::Input);
        self
    }

    /// Marks the attribute as an output port.
    pub fn output(mut self) -> Self {
        self.connectable = Some(true);
        self.connection_type = Some(ConnectionType::Output);
        self
    }

    /// Sets the connection limit (0 = unbounded).
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Sets the locked flag.
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    /// Sets the hidden flag.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Sets the private flag.
    pub fn private(mut self, private: bool) -> Self {
        self.private = Some(private);
        self
    }

    /// Sets the required flag.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }
}
