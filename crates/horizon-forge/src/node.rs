//! The parsed document tree the engine builds from.
//!
//! A document parser produces one [`Node`] per element: a type name, an
//! ordered property map and ordered children. The engine never sees document
//! text.
//!
//! Two type names are reserved for passes that run after the object tree is
//! built: [`BIND_NODE`] (data binding) and [`VALIDATE_NODE`] (validation
//! rules). They are only legal as direct children of the root.
//!
//! # Example
//!
//! ```
//! use horizon_forge::node::{Node, Value};
//!
//! let tree = Node::new("JFrame")
//!     .with("title", "Login")
//!     .child(Node::new("JButton").with("name", "btnOk").with("onAction", "save"))
//!     .child(Node::new("validate").with(
//!         "txtUser.text",
//!         Value::map([("mandatory", Value::Bool(true)), ("label", Value::from("User"))]),
//!     ));
//!
//! assert_eq!(tree.children().len(), 2);
//! assert_eq!(tree.children()[0].name(), Some("btnOk"));
//! ```

use std::fmt;

use indexmap::IndexMap;

/// Property that assigns a node's build name.
pub const NAME_PROPERTY: &str = "name";

/// Reserved type name of the data-binding node.
pub const BIND_NODE: &str = "bind";

/// Reserved type name of the validation-rule node.
pub const VALIDATE_NODE: &str = "validate";

/// A property value as produced by the document parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string scalar.
    Str(String),
    /// An integer scalar.
    Int(i64),
    /// A floating point scalar.
    Float(f64),
    /// A boolean scalar.
    Bool(bool),
    /// A symbolic reference, such as an unquoted handler name.
    Reference(String),
    /// An ordered list.
    List(Vec<Value>),
    /// An ordered nested mapping.
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Build a [`Value::Map`] from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The variant name, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Reference(_) => "reference",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// String content of `Str` and `Reference` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Reference(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content of `Int` values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric content of `Int` and `Float` values.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean content of `Bool` values.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Items of `List` values.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of `Map` values.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// The value rendered as text, the way validators see it.
    ///
    /// Lists and maps render empty when they have no entries.
    pub fn to_text(&self) -> String {
        match self {
            Self::Str(s) | Self::Reference(s) => s.clone(),
            Self::List(items) if items.is_empty() => String::new(),
            Self::Map(entries) if entries.is_empty() => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Reference(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// One element of the parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    type_name: String,
    properties: IndexMap<String, Value>,
    children: Vec<Node>,
}

impl Node {
    /// Create a node without properties or children.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Add a property, keeping declaration order.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Append a child node.
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// The declared type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// All properties in declaration order.
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    /// A property by exact name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// The children in declaration order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// The build name assigned through the `name` property.
    pub fn name(&self) -> Option<&str> {
        self.property(NAME_PROPERTY).and_then(Value::as_str)
    }

    /// Whether this is a `bind` or `validate` node.
    pub fn is_reserved(&self) -> bool {
        self.type_name == BIND_NODE || self.type_name == VALIDATE_NODE
    }
}

/// Location of a node in the tree, used in error messages.
///
/// Renders as `JFrame/JPanel[0]/JButton(btnOk)`: type names joined by `/`,
/// with the build name in parentheses or the child index in brackets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// The path of a root node.
    pub fn root(node: &Node) -> Self {
        Self {
            segments: vec![Self::segment(node, None)],
        }
    }

    /// The path of the `index`-th child `node` below this path.
    pub fn child(&self, node: &Node, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Self::segment(node, Some(index)));
        Self { segments }
    }

    /// Nesting depth, 1 for the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    fn segment(node: &Node, index: Option<usize>) -> String {
        match (node.name(), index) {
            (Some(name), _) => format!("{}({name})", node.type_name()),
            (None, Some(index)) => format!("{}[{index}]", node.type_name()),
            (None, None) => node.type_name().to_string(),
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_keep_declaration_order() {
        let node = Node::new("JButton")
            .with("text", "OK")
            .with("name", "btnOk")
            .with("enabled", true);

        let keys: Vec<_> = node.properties().keys().map(String::as_str).collect();
        assert_eq!(keys, ["text", "name", "enabled"]);
        assert_eq!(node.name(), Some("btnOk"));
    }

    #[test]
    fn test_reserved_nodes() {
        assert!(Node::new("bind").is_reserved());
        assert!(Node::new("validate").is_reserved());
        assert!(!Node::new("JPanel").is_reserved());
    }

    #[test]
    fn test_node_path_rendering() {
        let root = Node::new("JFrame");
        let panel = Node::new("JPanel");
        let button = Node::new("JButton").with("name", "btnOk");

        let path = NodePath::root(&root).child(&panel, 0).child(&button, 2);
        assert_eq!(path.to_string(), "JFrame/JPanel[0]/JButton(btnOk)");
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn test_value_text_and_display() {
        assert_eq!(Value::from("abc").to_text(), "abc");
        assert_eq!(Value::Int(5).to_text(), "5");
        assert_eq!(Value::List(vec![]).to_text(), "");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::Float(2.5).as_float(), Some(2.5));
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
    }
}
