//! Debug output for node trees.
//!
//! Use [`NodeTreeDebug`] to print the document a build ran from:
//!
//! ```
//! use horizon_forge::logging::{NodeTreeDebug, TreeFormatOptions};
//! use horizon_forge::node::Node;
//!
//! let tree = Node::new("JFrame")
//!     .with("name", "frmMain")
//!     .child(Node::new("JButton").with("name", "btnOk").with("text", "OK"));
//!
//! let text = NodeTreeDebug::with_options(TreeFormatOptions::detailed()).format(&tree);
//! assert!(text.contains("btnOk (JButton)"));
//! assert!(text.contains(".text = \"OK\""));
//! ```
//!
//! Log targets for filtering live in [`horizon_forge_core::logging::targets`].

use std::fmt;

use crate::node::{NAME_PROPERTY, Node};

/// Connector characters used between tree levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// `|` and `+--`.
    Ascii,
    /// Box drawing characters.
    #[default]
    Unicode,
    /// Dashes only.
    Compact,
}

/// Options for [`NodeTreeDebug`].
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The connector style.
    pub style: TreeStyle,
    /// Whether to show type names.
    pub show_types: bool,
    /// Whether to list each node's properties.
    pub show_properties: bool,
    /// Maximum depth to print (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_types: true,
            show_properties: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, properties included.
    pub fn detailed() -> Self {
        Self {
            show_properties: true,
            ..Default::default()
        }
    }

    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_types: false,
            show_properties: false,
            ..Default::default()
        }
    }
}

/// Formats a node tree for debugging.
#[derive(Debug, Clone, Default)]
pub struct NodeTreeDebug {
    options: TreeFormatOptions,
}

impl NodeTreeDebug {
    /// A formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// A formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Render `root` and its children.
    pub fn format(&self, root: &Node) -> String {
        Rendered { debug: self, root }.to_string()
    }

    fn write_node(&self, out: &mut fmt::Formatter<'_>, node: &Node, depth: usize, is_last: bool) -> fmt::Result {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        out.write_str(&self.prefix(depth, is_last))?;
        out.write_str(node.name().unwrap_or("(unnamed)"))?;
        if self.options.show_types {
            write!(out, " ({})", node.type_name())?;
        }
        out.write_str("\n")?;

        if self.options.show_properties {
            let indent = self.property_prefix(depth);
            for (key, value) in node.properties().iter().filter(|(key, _)| key.as_str() != NAME_PROPERTY) {
                writeln!(out, "{indent}  .{key} = {value}")?;
            }
        }

        let count = node.children().len();
        for (i, child) in node.children().iter().enumerate() {
            self.write_node(out, child, depth + 1, i + 1 == count)?;
        }
        Ok(())
    }

    fn prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..depth - 1 {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix.push(' ');
        prefix
    }

    fn property_prefix(&self, depth: usize) -> String {
        let branch = match self.options.style {
            TreeStyle::Ascii => "|",
            TreeStyle::Unicode => "\u{2502}",
            TreeStyle::Compact => "",
        };
        let mut prefix = String::new();
        for _ in 0..depth {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix
    }
}

struct Rendered<'a> {
    debug: &'a NodeTreeDebug,
    root: &'a Node,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug.write_node(f, self.root, 0, true)
    }
}
