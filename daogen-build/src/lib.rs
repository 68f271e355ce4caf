//! Build-time generator for Go data-access files.
//!
//! This crate loads record schemas (TOML or JSON), synthesizes find, insert,
//! update and delete functions for each of them through `daogen`, and writes
//! one Go file per table.
//!
//! # Example
//!
//! In your `build.rs`:
//!
//! ```ignore
//! fn main() {
//!     daogen_build::generate_dao()
//!         .schema_path("schemas/")
//!         .output_dir("go/dao/")
//!         .run()
//!         .expect("Failed to generate data-access code");
//!
//!     println!("cargo:rerun-if-changed=schemas/");
//! }
//! ```

mod generator;
mod render;
mod scanner;

pub use generator::DaoGenerator;
pub use render::{HEADER, render_model, render_schema};
pub use scanner::SchemaFile;

/// Create a new generator with default settings.
///
/// # Example
///
/// ```ignore
/// daogen_build::generate_dao()
///     .schema_path("schemas/users.toml")
///     .package("store")
///     .run()
///     .expect("Failed to generate data-access code");
/// ```
pub fn generate_dao() -> DaoGenerator {
    DaoGenerator::new()
}
