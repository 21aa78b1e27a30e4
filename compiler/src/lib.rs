//! pe2pkcs7-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for the ASN.1 module subset used by PKCS#7, X.509 and Authenticode,
//!  2) A schema verifier (duplicate names, missing types, alias cycles),
//!  3) Lowering of the parsed modules to the `TypeDef` symbol table, and its JSON form,
//!  4) The bundled Authenticode module,
//!  5) The shared error type (`Pe2Pkcs7Error`).

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod verifier;
pub mod compiler;
pub mod builtin;

pub use builtin::{builtin_schema, AUTHENTICODE, DEFAULT_ROOT};
pub use compiler::{compile_modules, compile_schema, schema_from_json, schema_to_json};
pub use error::Pe2Pkcs7Error;
