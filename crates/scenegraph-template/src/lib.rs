//! Attribute templates for SceneGraph node types.
//!
//! Each node type describes its attributes in a small `.mtd` text file:
//! which attributes exist, their default values and labels, and which of
//! them are input or output ports. This crate parses those files into a
//! [`Template`].
//!
//! # Example
//!
//! ```rust
//! use scenegraph_template::{parse_str, Property};
//!
//! let report = parse_str("[attr foo]\nlabel STRING \"Foo\"\n");
//! let foo = report.template.find("foo").unwrap();
//! assert_eq!(foo.property("label"), Some(&Property::new("STRING", "Foo")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod literal;
pub mod parser;
pub mod template;

pub use literal::{LiteralError, parse_literal};
pub use parser::{
    ParseReport, ParseWarning, TemplateParser, UnparsedValuePolicy, parse_file, parse_str,
};
pub use template::{AttributeRecord, ConnectionType, Property, Section, Template};
