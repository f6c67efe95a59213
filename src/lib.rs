//! Workspace placeholder crate.
//!
//! Exposes the `desktop-shims` feature so host applications can depend on
//! `gdrv-workspace` and get the Drive service façade (`core-service`) wired to
//! the desktop HTTP bridge without listing each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;
