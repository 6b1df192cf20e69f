//! Software definitions.
//!
//! A definition is an immutable recipe: a name, a pinned version, a source
//! archive with its SHA-256, dependencies, a license tag, and an ordered list
//! of shell commands. Definitions are written in TOML and resolved against a
//! target platform and install directory before they are built.
//!
//! # Submodules
//!
//! - [`template`] - `%{var}` substitution used in definition strings
//! - [`resolve`] - platform resolution into [`ResolvedSoftware`]
//! - [`catalog`] - definitions shipped with the library

pub mod catalog;
pub mod resolve;
pub mod template;
mod types;

pub use resolve::{BuildContext, ResolveError, ResolvedSoftware, ResolvedSource, ResolvedStep, resolve};
pub use types::*;
