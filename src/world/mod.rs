//! World description files

pub mod manifest;

pub use manifest::WorldManifest;
