//! Parsed attribute templates.
//!
//! A [`Template`] describes the attributes a node type carries: their
//! default values, labels, flags, and whether they are connectable ports.
//! Attributes declared before any `[group ...]` header live in the root
//! section; the rest are grouped by section name. Every map keeps its
//! declaration order.

use indexmap::IndexMap;
use scenegraph_core::{AttrType, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;
use std::str::FromStr;

/// Property type tag for booleans.
pub const TYPE_BOOL: &str = "BOOL";
/// Property type tag marking an input data type.
pub const TYPE_INPUT: &str = "INPUT";
/// Property type tag marking an output data type.
pub const TYPE_OUTPUT: &str = "OUTPUT";

// ============================================================================
// ConnectionType
// ============================================================================

/// Direction of a connectable attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Receives edges.
    Input,
    /// Emits edges.
    Output,
}

impl ConnectionType {
    /// Returns the lowercase tag used in templates and snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Input => "input",
            ConnectionType::Output => "output",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(ConnectionType::Input),
            "output" => Ok(ConnectionType::Output),
            other => Err(format!("unknown connection type: {other}")),
        }
    }
}

// ============================================================================
// Property / AttributeRecord
// ============================================================================

/// A single `name TYPE value` line from a template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Type tag as written in the template (e.g. `STRING`, `FLOAT3`).
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Parsed value.
    pub value: Value,
}

impl Property {
    /// Creates a property.
    pub fn new(type_tag: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            type_tag: type_tag.into(),
            value: value.into(),
        }
    }
}

/// Properties declared for one attribute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeRecord {
    /// Whether the attribute is a port.
    pub connectable: bool,
    /// Port direction, set for `[input ...]` / `[output ...]` records.
    pub connection_type: Option<ConnectionType>,
    /// Properties in declaration order.
    pub properties: IndexMap<String, Property>,
}

impl AttributeRecord {
    /// Creates a plain (non-connectable) record.
    pub fn attribute() -> Self {
        Self::default()
    }

    /// Creates a connection record.
    pub fn connection(connection_type: ConnectionType) -> Self {
        Self {
            connectable: true,
            connection_type: Some(connection_type),
            properties: IndexMap::new(),
        }
    }

    /// Adds or replaces a property.
    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Looks up a property.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Looks up a property value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).map(|p| &p.value)
    }

    /// Value of the `default` property.
    pub fn default_value(&self) -> Option<&Value> {
        self.value("default")
    }

    /// Declared attribute type, taken from the `default` property's tag.
    pub fn attr_type(&self) -> Option<AttrType> {
        self.property("default")
            .map(|p| AttrType::from(p.type_tag.as_str()))
    }

    /// Text of the `label` property.
    pub fn label(&self) -> Option<&str> {
        self.value("label").and_then(Value::as_str)
    }

    /// Text of the `desc` property.
    pub fn description(&self) -> Option<&str> {
        self.value("desc").and_then(Value::as_str)
    }

    /// Boolean flag property (`private`, `hidden`, `required`, ...).
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(Value::as_bool)
    }

    /// Connection limit from the `max_connections` property.
    pub fn max_connections(&self) -> Option<usize> {
        self.value("max_connections")
            .and_then(Value::as_i64)
            .and_then(|n| usize::try_from(n).ok())
    }

    /// Data type tag from the first `INPUT`/`OUTPUT` property.
    pub fn data_type(&self) -> Option<&str> {
        self.properties
            .values()
            .find(|p| p.type_tag == TYPE_INPUT || p.type_tag == TYPE_OUTPUT)
            .and_then(|p| p.value.as_str())
    }

    /// Returns whether this record describes an input port.
    pub fn is_input(&self) -> bool {
        self.connectable && self.connection_type == Some(ConnectionType::Input)
    }

    /// Returns whether this record describes an output port.
    pub fn is_output(&self) -> bool {
        self.connectable && self.connection_type == Some(ConnectionType::Output)
    }

    /// Merges `other` into this record; values in `other` win.
    pub fn merge(&mut self, other: &AttributeRecord) {
        if other.connectable {
            self.connectable = true;
            self.connection_type = other.connection_type;
        }
        for (name, property) in &other.properties {
            self.properties.insert(name.clone(), property.clone());
        }
    }

    /// Renders the record as a JSON object.
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        if self.connectable {
            map.insert("connectable".to_string(), Json::Bool(true));
        }
        if let Some(ct) = self.connection_type {
            map.insert(
                "connection_type".to_string(),
                Json::String(ct.as_str().to_string()),
            );
        }
        for (name, property) in &self.properties {
            let mut entry = Map::new();
            entry.insert("type".to_string(), Json::String(property.type_tag.clone()));
            entry.insert("value".to_string(), value_to_json(&property.value));
            map.insert(name.clone(), Json::Object(entry));
        }
        Json::Object(map)
    }
}

fn value_to_json(value: &Value) -> Json {
    serde_json::to_value(value).unwrap_or(Json::Null)
}

// ============================================================================
// Section / Template
// ============================================================================

/// Attribute records of one section, in declaration order.
pub type Section = IndexMap<String, AttributeRecord>;

/// A parsed node-type template.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Template {
    root: Section,
    groups: IndexMap<String, Section>,
}

impl Template {
    /// Creates an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when no attribute is declared anywhere.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.groups.values().all(IndexMap::is_empty)
    }

    /// Attributes declared outside any group.
    pub fn root(&self) -> &Section {
        &self.root
    }

    /// Mutable access to a section; `None` means the root section.
    /// Groups are created on first access.
    pub fn section_mut(&mut self, group: Option<&str>) -> &mut Section {
        match group {
            None => &mut self.root,
            Some(name) => self.groups.entry(name.to_string()).or_default(),
        }
    }

    /// Group names in declaration order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Attributes of a section; `None` means the root section.
    pub fn attributes(&self, group: Option<&str>) -> Option<&Section> {
        match group {
            None => Some(&self.root),
            Some(name) => self.groups.get(name),
        }
    }

    /// Looks up a record within a section.
    pub fn record(&self, group: Option<&str>, attr: &str) -> Option<&AttributeRecord> {
        self.attributes(group)?.get(attr)
    }

    /// Inserts a record, replacing any previous record of the same name in
    /// that section.
    pub fn insert(&mut self, group: Option<&str>, name: impl Into<String>, record: AttributeRecord) {
        self.section_mut(group).insert(name.into(), record);
    }

    /// Iterates every record, root section first, then groups in order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &AttributeRecord)> {
        self.root
            .iter()
            .chain(self.groups.values().flat_map(|s| s.iter()))
            .map(|(name, record)| (name.as_str(), record))
    }

    /// Finds an attribute by name in any section. When several sections
    /// declare it, the last declaration wins.
    pub fn find(&self, attr: &str) -> Option<&AttributeRecord> {
        self.records()
            .filter(|(name, _)| *name == attr)
            .map(|(_, record)| record)
            .last()
    }

    /// Names of input ports in declaration order.
    pub fn inputs(&self) -> Vec<&str> {
        self.unique_names(AttributeRecord::is_input)
    }

    /// Names of output ports in declaration order.
    pub fn outputs(&self) -> Vec<&str> {
        self.unique_names(AttributeRecord::is_output)
    }

    /// Default value for every attribute that declares one.
    pub fn defaults(&self) -> IndexMap<&str, &Value> {
        let mut out = IndexMap::new();
        for (name, record) in self.records() {
            if let Some(value) = record.default_value() {
                out.insert(name, value);
            }
        }
        out
    }

    fn unique_names(&self, pred: impl Fn(&AttributeRecord) -> bool) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in self.records() {
            if self.find(name).is_some_and(&pred) && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Merges `other` into this template section by section. Records
    /// present in both are merged property-wise with `other` winning.
    pub fn merge(&mut self, other: &Template) {
        merge_section(&mut self.root, &other.root);
        for (group, section) in &other.groups {
            merge_section(self.groups.entry(group.clone()).or_default(), section);
        }
    }

    /// Renders the template as nested JSON: root attributes at the top
    /// level, groups as objects of attributes.
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        for (name, record) in &self.root {
            map.insert(name.clone(), record.to_json());
        }
        for (group, section) in &self.groups {
            let attrs: Map<String, Json> = section
                .iter()
                .map(|(name, record)| (name.clone(), record.to_json()))
                .collect();
            map.insert(group.clone(), Json::Object(attrs));
        }
        Json::Object(map)
    }
}

fn merge_section(target: &mut Section, source: &Section) {
    for (name, record) in source {
        match target.get_mut(name) {
            Some(existing) => existing.merge(record),
            None => {
                target.insert(name.clone(), record.clone());
            }
        }
    }
}
