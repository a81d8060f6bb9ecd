//! Nullability inference for imported C / Objective-C declarations, and
//! optional-type checking of host code that calls them.
//!
//! The pipeline runs leaves first: [`decl`] loads a module manifest,
//! [`resolve`] gives every slot a nullability verdict, [`project`] maps slots
//! to host types, [`typeck`] checks host source against those types and
//! [`diag`] renders the resulting diagnostics. [`session::Session`] ties the
//! stages together for one module.

pub mod config;
pub mod decl;
pub mod diag;
pub mod error;
pub mod fixit;
pub mod project;
pub mod resolve;
pub mod session;
pub mod span;
pub mod syntax;
pub mod typeck;

pub use config::NullcheckConfig;
pub use diag::{Diagnostic, Emitter};
pub use error::{ConfigError, ImportError, SessionError};
pub use project::ImportedModule;
pub use session::{Session, SourceReport};
