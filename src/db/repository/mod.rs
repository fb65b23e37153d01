//! Repository layer: read and delete operations against the sample store.
//!
//! Every function takes a connection plus the resolved [`SchemaMapping`];
//! no table or column name is written literally here.
//!
//! [`SchemaMapping`]: crate::mapping::SchemaMapping

mod analyte;
mod audit_info;
mod delete;
mod sample;

pub use analyte::*;
pub use audit_info::*;
pub use delete::*;
pub use sample::*;
