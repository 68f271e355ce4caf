//! Writes one Go file per schema.

use crate::render::render_schema;
use crate::scanner::scan_directory;
use anyhow::{Context, Result, bail};
use log::debug;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Builder for configuring and running the data-access generator.
pub struct DaoGenerator {
    schema_paths: Vec<PathBuf>,
    output_dir: PathBuf,
    package: Option<String>,
}

impl DaoGenerator {
    /// Create a new generator with default settings.
    pub fn new() -> Self {
        Self {
            schema_paths: Vec::new(),
            output_dir: PathBuf::from("dao/"),
            package: None,
        }
    }

    /// Add a schema file or a directory to scan for schemas.
    ///
    /// Can be called multiple times.
    pub fn schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_paths.push(path.into());
        self
    }

    /// Set the directory generated files are written to.
    ///
    /// Default: `dao/`
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Override the Go package declared by every schema.
    pub fn package(mut self, name: impl Into<String>) -> Self {
        self.package = Some(name.into());
        self
    }

    /// Run the generator.
    ///
    /// Returns the files that were written. Files whose content is already
    /// up to date are left untouched and not returned.
    pub fn run(self) -> Result<Vec<PathBuf>> {
        let schema_paths = if self.schema_paths.is_empty() {
            vec![PathBuf::from("schemas/")]
        } else {
            self.schema_paths
        };

        let mut files = Vec::new();
        for path in &schema_paths {
            let found = scan_directory(path).with_context(|| format!("Failed to scan {}", path.display()))?;
            files.extend(found);
        }

        let mut tables = HashSet::new();
        for file in &files {
            if !tables.insert(file.schema.record.table.clone()) {
                bail!(
                    "table `{}` is declared by more than one schema ({})",
                    file.schema.record.table,
                    file.path.display()
                );
            }
        }

        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create directory {}", self.output_dir.display()))?;

        let mut written = Vec::new();
        for mut file in files {
            if let Some(package) = &self.package {
                file.schema.package = package.clone();
            }
            let code = render_schema(&file.schema).with_context(|| format!("Failed to render {}", file.path.display()))?;
            let out = self.output_dir.join(format!("{}.go", file.schema.record.table));

            // Only write if content has changed
            let should_write = match fs::read_to_string(&out) {
                Ok(existing) => existing != code,
                Err(_) => true,
            };
            if should_write {
                fs::write(&out, &code).with_context(|| format!("Failed to write {}", out.display()))?;
                eprintln!(
                    "daogen-build: Generated {} with {} functions",
                    out.display(),
                    file.schema.find.len()
                        + file.schema.insert.iter().count()
                        + file.schema.update.len()
                        + file.schema.delete.len()
                );
                written.push(out);
            } else {
                debug!("{} is up to date", out.display());
            }
        }

        Ok(written)
    }
}

impl Default for DaoGenerator {
    fn default() -> Self {
        Self::new()
    }
}
