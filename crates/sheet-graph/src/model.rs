//! Core data types for the sheet graph
//!
//! Defines:
//! - Node kinds (closed variant set) and their kind-specific rules
//! - Ports and socket tags
//! - Nodes, connections and sheets
//! - Calculation results returned by the evaluator

use crate::graph::Graph;
use crate::ids::{ConnectionId, FolderId, NodeId, SheetId, VersionId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Node kind tag
///
/// Kind-specific behavior is dispatched by `match` on this enum; there is no
/// per-kind node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Locally edited value
    Constant,
    /// Externally driven value, part of the sheet's calling signature
    Input,
    /// Computed value, part of the sheet's calling signature
    Output,
    /// User code
    Function,
    /// Lookup table
    Lut,
    /// Markdown annotation
    Comment,
    /// Reference to another sheet, called as a function
    Sheet,
}

impl NodeKind {
    /// All kinds in palette order
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Constant,
        NodeKind::Input,
        NodeKind::Output,
        NodeKind::Function,
        NodeKind::Lut,
        NodeKind::Comment,
        NodeKind::Sheet,
    ];

    /// Label given to a freshly created node
    #[must_use]
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::Input => "Input",
            Self::Output => "Output",
            Self::Function => "Function",
            Self::Lut => "Lookup",
            Self::Comment => "Comment",
            Self::Sheet => "Sheet",
        }
    }

    /// Whether labels of this kind must be unique within a graph
    ///
    /// Input and output labels are the external calling convention of a sheet
    /// referenced as a nested function.
    #[inline]
    #[must_use]
    pub fn requires_unique_label(self) -> bool {
        matches!(self, Self::Input | Self::Output)
    }

    /// Whether a colliding label is auto-suffixed on creation
    #[inline]
    #[must_use]
    pub fn suffixes_duplicate_labels(self) -> bool {
        matches!(self, Self::Input | Self::Output | Self::Constant)
    }

    /// Whether output ports of this kind carry values
    #[inline]
    #[must_use]
    pub fn produces_values(self) -> bool {
        matches!(
            self,
            Self::Constant | Self::Input | Self::Function | Self::Lut | Self::Sheet
        )
    }

    /// Whether input ports of this kind accept values
    #[inline]
    #[must_use]
    pub fn consumes_values(self) -> bool {
        matches!(self, Self::Output | Self::Function | Self::Lut | Self::Sheet)
    }

    /// Whether nodes of this kind are exposed as outputs of a nested sheet
    ///
    /// Constants are exposed as read-only outputs.
    #[inline]
    #[must_use]
    pub fn exposed_as_nested_output(self) -> bool {
        matches!(self, Self::Output | Self::Constant)
    }

    /// How the value control of this kind behaves
    #[must_use]
    pub fn control_mode(self) -> ControlMode {
        match self {
            Self::Constant => ControlMode::Local,
            Self::Input => ControlMode::External,
            Self::Output => ControlMode::Computed,
            Self::Function | Self::Lut | Self::Comment | Self::Sheet => ControlMode::None,
        }
    }

    /// Ports a freshly created node of this kind starts with
    #[must_use]
    pub fn default_ports(self) -> (Vec<Port>, Vec<Port>) {
        match self {
            Self::Constant | Self::Input => (Vec::new(), vec![Port::generic("value")]),
            Self::Output => (vec![Port::generic("value")], Vec::new()),
            Self::Function | Self::Lut => {
                (vec![Port::generic("x")], vec![Port::generic("result")])
            }
            Self::Comment | Self::Sheet => (Vec::new(), Vec::new()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constant => "constant",
            Self::Input => "input",
            Self::Output => "output",
            Self::Function => "function",
            Self::Lut => "lut",
            Self::Comment => "comment",
            Self::Sheet => "sheet",
        };
        f.write_str(name)
    }
}

/// Value control behavior of a node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Edited in place, stored in the node
    Local,
    /// Driven by a pending input override or a parent sheet
    External,
    /// Written from evaluator results
    Computed,
    /// No value control
    None,
}

/// Socket compatibility tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketKind {
    /// Any value
    #[default]
    Generic,
    /// Input port of a sheet-reference node
    SheetIn,
    /// Output port of a sheet-reference node
    SheetOut,
}

/// Named connection point on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique within its side of the node
    pub name: String,
    /// Compatibility tag
    #[serde(default)]
    pub socket: SocketKind,
}

impl Port {
    /// Create a port
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, socket: SocketKind) -> Self {
        Self {
            name: name.into(),
            socket,
        }
    }

    /// Create a generic port
    #[inline]
    #[must_use]
    pub fn generic(name: impl Into<String>) -> Self {
        Self::new(name, SocketKind::Generic)
    }
}

/// Ordered port map (name → port)
///
/// Serialized as an array so the order survives persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Port>", into = "Vec<Port>")]
pub struct Ports(IndexMap<String, Port>);

impl Ports {
    /// Create empty port map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a port by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Port> {
        self.0.get(name)
    }

    /// Check if a port exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Port names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Ports in order
    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.0.values()
    }

    /// Number of ports
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ports as an ordered vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<Port> {
        self.0.values().cloned().collect()
    }

    pub(crate) fn insert(&mut self, port: Port) {
        self.0.insert(port.name.clone(), port);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Port> {
        self.0.shift_remove(name)
    }

    /// Reorder to match `order`; names not in `order` keep their relative order at the end
    pub(crate) fn reorder(&mut self, order: &[&str]) {
        let mut rest = std::mem::take(&mut self.0);
        for name in order {
            if let Some(port) = rest.shift_remove(*name) {
                self.0.insert(port.name.clone(), port);
            }
        }
        self.0.extend(rest);
    }
}

impl From<Vec<Port>> for Ports {
    fn from(ports: Vec<Port>) -> Self {
        let mut map = IndexMap::with_capacity(ports.len());
        for port in ports {
            // Last one wins on duplicate names
            map.insert(port.name.clone(), port);
        }
        Self(map)
    }
}

impl From<Ports> for Vec<Port> {
    fn from(ports: Ports) -> Self {
        ports.0.into_values().collect()
    }
}

impl FromIterator<Port> for Ports {
    fn from_iter<I: IntoIterator<Item = Port>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

/// Which side of a node a port lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortSide {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// 2D canvas position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal
    pub x: f64,
    /// Vertical
    pub y: f64,
}

impl Position {
    /// Create a position
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by an offset
    #[inline]
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Typed node in a sheet graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable id
    pub id: NodeId,
    /// Kind tag
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Display label
    pub label: String,
    /// Ordered input ports
    #[serde(default)]
    pub inputs: Ports,
    /// Ordered output ports
    #[serde(default)]
    pub outputs: Ports,
    /// Kind-specific payload
    #[serde(default)]
    pub data: Value,
    /// Canvas position, unknown for freshly imported nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Last evaluation error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Live control value, newer than `data.value` until saved
    #[serde(skip)]
    pub control: Option<Value>,
}

impl Node {
    /// Create a node with default ports for its kind
    #[must_use]
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        let (inputs, outputs) = kind.default_ports();
        Self {
            id: NodeId::new(),
            kind,
            label: label.into(),
            inputs: inputs.into(),
            outputs: outputs.into(),
            data: Value::Null,
            position: None,
            error: None,
            control: None,
        }
    }

    /// Ports on one side
    #[inline]
    #[must_use]
    pub fn ports(&self, side: PortSide) -> &Ports {
        match side {
            PortSide::Input => &self.inputs,
            PortSide::Output => &self.outputs,
        }
    }

    pub(crate) fn ports_mut(&mut self, side: PortSide) -> &mut Ports {
        match side {
            PortSide::Input => &mut self.inputs,
            PortSide::Output => &mut self.outputs,
        }
    }

    /// Stored value (`data.value`)
    #[must_use]
    pub fn stored_value(&self) -> Option<&Value> {
        self.data.get("value").filter(|v| !v.is_null())
    }

    /// Current control value, falling back to the stored value
    #[must_use]
    pub fn current_value(&self) -> Option<&Value> {
        self.control.as_ref().or_else(|| self.stored_value())
    }

    /// Referenced sheet id for sheet-reference nodes
    #[must_use]
    pub fn referenced_sheet(&self) -> Option<SheetId> {
        if self.kind != NodeKind::Sheet {
            return None;
        }
        self.data
            .get("sheetId")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Write `value` into `data.value`, keeping other data fields
    pub(crate) fn store_value(&mut self, value: Value) {
        match &mut self.data {
            Value::Object(map) => {
                map.insert("value".to_string(), value);
            }
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), value);
                *other = Value::Object(map);
            }
        }
    }
}

/// Edge from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Connection id
    pub id: ConnectionId,
    /// Source node
    pub source: NodeId,
    /// Output port on the source
    #[serde(rename = "sourceOutput")]
    pub source_port: String,
    /// Target node
    pub target: NodeId,
    /// Input port on the target
    #[serde(rename = "targetInput")]
    pub target_port: String,
}

impl Connection {
    /// Create connection with a fresh id
    #[must_use]
    pub fn new(
        source: NodeId,
        source_port: impl Into<String>,
        target: NodeId,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            source,
            source_port: source_port.into(),
            target,
            target_port: target_port.into(),
        }
    }

    /// Whether this connection touches `node`
    #[inline]
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }

    /// Whether this connection is bound to the given port
    #[must_use]
    pub fn uses_port(&self, node: NodeId, side: PortSide, port: &str) -> bool {
        match side {
            PortSide::Output => self.source == node && self.source_port == port,
            PortSide::Input => self.target == node && self.target_port == port,
        }
    }
}

/// Saved sheet: metadata plus graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// Sheet id
    pub id: SheetId,
    /// Display name
    pub name: String,
    /// Containing folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
    /// Default immutable version used when referenced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version_id: Option<VersionId>,
    /// Nodes and connections
    #[serde(flatten)]
    pub graph: Graph,
}

impl Sheet {
    /// Create an empty sheet
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SheetId::new(),
            name: name.into(),
            folder_id: None,
            default_version_id: None,
            graph: Graph::new(),
        }
    }
}

/// Evaluation outcome for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    /// Whether evaluation succeeded
    #[serde(default = "default_valid")]
    pub valid: bool,
    /// Error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Input values used
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    /// Output values produced
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
}

fn default_valid() -> bool {
    true
}

impl Default for NodeResult {
    fn default() -> Self {
        Self {
            valid: true,
            error: None,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}

impl NodeResult {
    /// Error to display on the node, if any
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_deref() {
            Some(e) if !e.is_empty() => Some(e.to_string()),
            _ if !self.valid => Some("invalid result".to_string()),
            _ => None,
        }
    }
}

/// Evaluator response: per node results
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Results keyed by node id
    #[serde(default)]
    pub results: HashMap<NodeId, NodeResult>,
}

impl CalculationResult {
    /// Result for one node
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeResult> {
        self.results.get(&id)
    }

    /// Output value of one node port
    #[must_use]
    pub fn output(&self, id: NodeId, port: &str) -> Option<&Value> {
        self.results.get(&id).and_then(|r| r.outputs.get(port))
    }
}
