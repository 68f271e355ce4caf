//! daogen core library.
//!
//! Synthesizes Go data-access code from per-field metadata: `where` clause
//! construction, insert and update value lists, and row scanning. Code is
//! produced through an [`IrBuilder`] backend, so the same synthesis drives
//! both inspectable syntax trees and Go source text.
//!
//! ```ignore
//! use daogen::{BuilderOptions, GoSourceBuilder, Record, SynthConfig, Synthesizer};
//!
//! #[derive(Record)]
//! #[daogen(table = "users")]
//! struct User {
//!     id: i64,
//!     #[daogen(op = "like", case_insensitive)]
//!     email: String,
//! }
//!
//! let config = SynthConfig::new();
//! let builder = GoSourceBuilder::new();
//! let filter = Synthesizer::new(&builder, &config)
//!     .synthesize_filter(&User::fields(), "opts", "FindUserOptions", &BuilderOptions::find())?;
//! ```

extern crate self as daogen;

pub mod errors;
pub mod execution;
pub mod filter;
pub mod input;
pub mod ir;
pub mod naming;
pub mod operator;
pub mod options;
pub mod registry;
pub mod schema;
pub mod synth;
pub mod types;

pub use errors::{Result, SchemaError, SynthError};
pub use execution::{FindAll, FindOne, ScanScope, ScanWrapper};
pub use filter::FilterOutput;
pub use input::InputOutput;
pub use ir::model::ModelBuilder;
pub use ir::source::GoSourceBuilder;
pub use ir::{CallDescriptor, IrBuilder, TypeRef};
pub use operator::{CompareOperator, OperatorTemplate, TemplateShape};
pub use options::{BuilderOptions, ExecutionOptions, PlaceholderStyle, ValueSource};
pub use registry::{EncryptionHook, FunctionRegistry, GeneratorRegistration, SynthConfig};
pub use schema::{DaoFunction, DaoModel, Schema};
pub use synth::Synthesizer;
pub use types::{FieldDescriptor, LeafField, Record, SourceSql};

pub use daogen_macros::Record;

// Re-export inventory so generators can be submitted without a direct dependency
pub use inventory;
