//! Schema file discovery.

use anyhow::{Context, Result};
use daogen::Schema;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A schema together with the file it was loaded from.
#[derive(Debug, Clone)]
pub struct SchemaFile {
    pub path: PathBuf,
    pub schema: Schema,
}

/// Loads every `.toml` and `.json` schema under `path`.
///
/// `path` may also name a single schema file. Files are returned in path
/// order so output is deterministic.
pub fn scan_directory(path: &Path) -> Result<Vec<SchemaFile>> {
    let mut paths: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_schema_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let schema = Schema::load(&path).with_context(|| format!("Failed to load {}", path.display()))?;
            Ok(SchemaFile { path, schema })
        })
        .collect()
}

fn is_schema_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml" || ext == "json")
        && !path.to_string_lossy().contains("/target/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCHEMA: &str = r#"
[record]
name = "Tag"
table = "tags"
fields = [{ name = "Id", type = "int64" }]
"#;

    #[test]
    fn finds_schemas_recursively_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.toml"), SCHEMA).unwrap();
        fs::write(dir.path().join("a.toml"), SCHEMA.replace("tags", "labels")).unwrap();
        fs::write(dir.path().join("notes.md"), "not a schema").unwrap();

        let found = scan_directory(dir.path()).unwrap();
        let tables: Vec<_> = found.iter().map(|f| f.schema.record.table.as_str()).collect();
        assert_eq!(tables, vec!["labels", "tags"]);
    }

    #[test]
    fn reports_the_failing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.toml"), "[record]\nname = 1").unwrap();

        let err = scan_directory(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }
}
