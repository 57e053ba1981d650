//! Config CUE Generator
//!
//! Generates a CUE document per service describing the shape of the
//! configuration the service loads with `config.Load[T]()`.
//!
//! ## Features
//!
//! - **Hoisting**: Named types referenced more than once become `#Definition`s
//! - **Field Merging**: Several config loads in one service converge on one document
//! - **Annotations**: `cue:"..."` struct tags refine field values, `opt` marks fields optional
//! - **Deterministic Output**: Unchanged input regenerates byte-identical files
//!
//! ## Architecture
//!
//! ```text
//! meta.json ──▶ schema (registry, resolve, walk)
//!                  │
//!                  ▼
//!              gen (usage ─▶ fields/translate ─▶ service)
//!                  │
//!                  ▼
//!              cue (ast, printer) ──▶ output ──▶ <dir>/<service>/encore.gen.cue
//! ```

pub mod config;
pub mod cue;
pub mod error;
pub mod gen;
pub mod output;
pub mod schema;

pub use config::{CuegenConfig, GeneratorConfig, OutputConfig};
pub use error::{CuegenError, Result};
pub use gen::{GeneratedDocument, Generator, ServiceOutcome};
pub use output::{OutputWriter, StaleFile, WriteOutcome};
pub use schema::{Decl, DeclRegistry, Meta, Service, Type};
