//! This is a Rust library with the building blocks for looking inside BER
//! and DER encoded ASN.1 values: a tag-length-value decoder producing a tree
//! of [DecodedNode]s, lazy rendering of primitive content, and the [Schema]
//! symbol table of [TypeDef]s used to label that tree.
//!
//! ```
//! use pe2pkcs7_schema::*;
//!
//! let node = decode(&[0x30, 0x03, 0x02, 0x01, 0x05], 0).unwrap();
//! assert_eq!(node.type_name(), "SEQUENCE");
//!
//! let integer = &node.children()[0];
//! let value = Primitive::parse(integer.tag_number(), integer.content());
//! assert_eq!(value.to_string(), "5");
//!
//! let schema = Schema::new(vec![
//!     Def::new("Version", TypeDef::primitive("INTEGER")),
//! ]);
//! let version = TypeDef::reference("Version");
//! assert_eq!(schema.resolve(Some(&version)).unwrap().name, "INTEGER");
//! ```

pub mod bb;
pub mod content;
pub mod error;
pub mod node;
pub mod oid;
pub mod schema;
pub mod tag;

pub use bb::*;
pub use content::*;
pub use error::*;
pub use node::*;
pub use oid::*;
pub use schema::*;
pub use tag::*;
