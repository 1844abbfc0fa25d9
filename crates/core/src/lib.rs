//! Domain logic shared by the turntable render tools.
//!
//! Everything here is synchronous and file-based: loading the model
//! metadata table, generating the command batch, and repairing material
//! files. Process execution lives in `turntable-dispatch`.

pub mod command_builder;
pub mod error;
pub mod material;
pub mod metadata;
pub mod number;
