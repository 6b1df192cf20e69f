//! softdef-lib: software definitions and the engine that builds them
//!
//! This crate provides:
//! - `SoftwareDef`: a declarative recipe for one piece of software
//! - `Registry`: known definitions and their dependency order
//! - `execute`: fetching, verifying, extracting and building definitions
//! - `licensing`: license records shipped into the install directory

pub mod config;
pub mod consts;
pub mod execute;
pub mod licensing;
pub mod platform;
pub mod registry;
pub mod software;
pub mod util;
