//! Workspace placeholder crate.
//!
//! Host applications can depend on `catalog-workspace` to pull in the catalog
//! service façade without wiring `core-service`, `core-catalog` and
//! `core-runtime` individually.

pub use core_service::*;
