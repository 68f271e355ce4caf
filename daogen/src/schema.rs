//! Declarative description of a record and its data-access functions.
//!
//! Schemas are read from TOML or JSON:
//!
//! ```toml
//! package = "dao"
//!
//! [record]
//! name = "User"
//! table = "users"
//! fields = [
//!     { name = "Id", type = "int64" },
//!     { name = "Email", type = "string" },
//!     { name = "CreatedAt", type = "time.Time", generate = "now" },
//! ]
//!
//! [[find]]
//! name = "FindUsers"
//! filters = [
//!     { name = "Email", op = "like", case_insensitive = true },
//!     { group = [{ name = "Id" }, { name = "Ids", type = "[]int64", column = "id", op = "in" }] },
//! ]
//! ```
//!
//! Filter and update fields that share a name with a record field inherit
//! its type and column. Packages other than `context`, `database/sql`,
//! `fmt`, `strings` and `time` are declared under `[imports]`, keyed by the
//! qualifier the types use: `uuid = "github.com/google/uuid"`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use heck::ToSnakeCase;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::SchemaError;
use crate::ir::{CallDescriptor, TypeRef};
use crate::naming::is_identifier;
use crate::operator::CompareOperator;
use crate::types::{FieldDescriptor, LeafField, Record, SourceSql};

pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

fn default_package() -> String {
    "dao".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    #[serde(default = "default_package")]
    pub package: String,
    /// Function applied to fields marked `encrypt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_function: Option<String>,
    /// Import path per package qualifier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub imports: BTreeMap<String, String>,
    pub record: RecordSchema,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub find: Vec<FindSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<InsertSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update: Vec<UpdateSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<DeleteSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordSchema {
    pub name: String,
    pub table: String,
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub maybe: bool,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSchema {
    Group { group: Vec<FilterSchema> },
    Field(FieldSchema),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindSchema {
    pub name: String,
    /// Return the first matching row instead of all of them.
    #[serde(default)]
    pub one: bool,
    #[serde(default)]
    pub filters: Vec<FilterSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsertSchema {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSchema {
    pub name: String,
    pub set: Vec<FieldSchema>,
    /// Make every set field optional so callers can change a subset.
    #[serde(default)]
    pub partial: bool,
    #[serde(default)]
    pub filters: Vec<FilterSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteSchema {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<FilterSchema>,
}

impl Schema {
    pub fn from_toml_str(source: &str) -> SchemaResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Reads a `.toml` or `.json` schema file.
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        debug!("loading schema {}", path.display());
        let source = fs::read_to_string(path)?;
        match extension.as_str() {
            "toml" => Self::from_toml_str(&source),
            "json" => Self::from_json_str(&source),
            _ => Err(SchemaError::UnsupportedFormat { extension }),
        }
    }

    /// Resolves field references and checks names.
    pub fn to_model(&self) -> SchemaResult<DaoModel> {
        require_identifier("package", &self.package)?;
        require_identifier("record name", &self.record.name)?;
        if self.record.table.trim().is_empty() {
            return Err(SchemaError::invalid(format!(
                "record `{}` has an empty table name",
                self.record.name
            )));
        }

        for qualifier in self.imports.keys() {
            require_identifier("import qualifier", qualifier)?;
        }

        let record = &self.record.fields;
        let mut fields = Vec::with_capacity(record.len());
        for field in record {
            fields.push(FieldDescriptor::Leaf(field.resolve(None)?));
        }

        let mut model = DaoModel {
            package: self.package.clone(),
            record: self.record.name.clone(),
            table: self.record.table.clone(),
            fields,
            encryption: self
                .encrypt_function
                .as_ref()
                .map(|function| CallDescriptor::new(function.clone(), 1, false)),
            imports: self.imports.clone(),
            functions: Vec::new(),
        };

        for find in &self.find {
            model.functions.push(DaoFunction::Find {
                name: find.name.clone(),
                one: find.one,
                filters: resolve_filters(&find.filters, record)?,
            });
        }
        if let Some(insert) = &self.insert {
            model.functions.push(DaoFunction::Insert {
                name: insert.name.clone(),
            });
        }
        for update in &self.update {
            let mut set = Vec::with_capacity(update.set.len());
            for field in &update.set {
                let mut leaf = field.resolve(lookup(record, &field.name))?;
                if update.partial && !leaf.ty.is_pointer() && !leaf.maybe {
                    leaf.ty = TypeRef::pointer(leaf.ty);
                }
                set.push(FieldDescriptor::Leaf(leaf));
            }
            model.functions.push(DaoFunction::Update {
                name: update.name.clone(),
                set,
                filters: resolve_filters(&update.filters, record)?,
            });
        }
        for delete in &self.delete {
            model.functions.push(DaoFunction::Delete {
                name: delete.name.clone(),
                filters: resolve_filters(&delete.filters, record)?,
            });
        }

        model.validate()?;
        Ok(model)
    }
}

impl FieldSchema {
    fn resolve(&self, base: Option<&FieldSchema>) -> SchemaResult<LeafField> {
        require_identifier("field name", &self.name)?;
        let ty = self
            .ty
            .as_ref()
            .or_else(|| base.and_then(|base| base.ty.as_ref()))
            .ok_or_else(|| SchemaError::invalid(format!("field `{}` has no type", self.name)))?;

        let mut leaf = LeafField::new(self.name.clone(), ty.parse::<TypeRef>()?);
        leaf.source = self
            .source()
            .or_else(|| base.and_then(FieldSchema::source))
            .unwrap_or_else(|| SourceSql::Column(self.name.to_snake_case()));
        leaf.operator = self.op.as_deref().unwrap_or_default().parse::<CompareOperator>()?;
        leaf.case_insensitive = self.case_insensitive;
        leaf.maybe = self.maybe || base.is_some_and(|base| base.maybe);
        leaf.custom = self.custom || base.is_some_and(|base| base.custom);
        leaf.encrypted = self.encrypt || base.is_some_and(|base| base.encrypt);
        leaf.constant = self.constant.clone();
        leaf.generator = self.generate.clone();
        Ok(leaf)
    }

    fn source(&self) -> Option<SourceSql> {
        if let Some(columns) = &self.any_of {
            return Some(SourceSql::AnyOf(columns.clone()));
        }
        if let Some(expr) = &self.expr {
            return Some(SourceSql::Expression(expr.clone()));
        }
        self.column.clone().map(SourceSql::Column)
    }
}

fn lookup<'r>(record: &'r [FieldSchema], name: &str) -> Option<&'r FieldSchema> {
    record.iter().find(|field| field.name == name)
}

fn resolve_filters(filters: &[FilterSchema], record: &[FieldSchema]) -> SchemaResult<Vec<FieldDescriptor>> {
    filters
        .iter()
        .map(|filter| match filter {
            FilterSchema::Group { group } => Ok(FieldDescriptor::Group(resolve_filters(group, record)?)),
            FilterSchema::Field(field) => Ok(FieldDescriptor::Leaf(field.resolve(lookup(record, &field.name))?)),
        })
        .collect()
}

fn require_identifier(what: &str, name: &str) -> SchemaResult<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::invalid(format!("{what} `{name}` is not a valid identifier")))
    }
}

/// A data-access function to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaoFunction {
    Find {
        name: String,
        one: bool,
        filters: Vec<FieldDescriptor>,
    },
    /// Inserts the record fields.
    Insert { name: String },
    Update {
        name: String,
        set: Vec<FieldDescriptor>,
        filters: Vec<FieldDescriptor>,
    },
    Delete {
        name: String,
        filters: Vec<FieldDescriptor>,
    },
}

impl DaoFunction {
    pub fn name(&self) -> &str {
        match self {
            DaoFunction::Find { name, .. }
            | DaoFunction::Insert { name }
            | DaoFunction::Update { name, .. }
            | DaoFunction::Delete { name, .. } => name,
        }
    }
}

/// Everything needed to render one data-access file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaoModel {
    pub package: String,
    pub record: String,
    pub table: String,
    pub fields: Vec<FieldDescriptor>,
    pub encryption: Option<CallDescriptor>,
    /// Import path per package qualifier, for packages outside the defaults.
    pub imports: BTreeMap<String, String>,
    pub functions: Vec<DaoFunction>,
}

impl DaoModel {
    /// Model for a derived [`Record`], without any function yet.
    pub fn for_record<R: Record>(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            record: R::NAME.to_string(),
            table: R::TABLE.to_string(),
            fields: R::fields(),
            encryption: None,
            imports: BTreeMap::new(),
            functions: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: DaoFunction) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_encryption(mut self, descriptor: CallDescriptor) -> Self {
        self.encryption = Some(descriptor);
        self
    }

    /// Declares the import path of package `qualifier`.
    pub fn with_import(mut self, qualifier: impl Into<String>, path: impl Into<String>) -> Self {
        self.imports.insert(qualifier.into(), path.into());
        self
    }

    /// Record fields must each map to one column. Function names must be
    /// unique identifiers and must not shadow the record.
    pub fn validate(&self) -> SchemaResult<()> {
        for field in &self.fields {
            match field {
                FieldDescriptor::Leaf(leaf) if leaf.source.union_columns().is_some() => {
                    return Err(SchemaError::invalid(format!(
                        "record field `{}` cannot use `any_of`, it must map to one column",
                        leaf.first_name()
                    )));
                }
                FieldDescriptor::Leaf(_) => {}
                FieldDescriptor::Group(_) => {
                    return Err(SchemaError::invalid(format!(
                        "record `{}` cannot contain a field group",
                        self.record
                    )));
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        seen.insert(self.record.as_str());
        for function in &self.functions {
            let name = function.name();
            require_identifier("function name", name)?;
            if !seen.insert(name) {
                return Err(SchemaError::invalid(format!("name `{name}` is declared more than once")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = r#"
package = "store"
encrypt_function = "hashPassword"

[record]
name = "User"
table = "users"
fields = [
    { name = "Id", type = "int64" },
    { name = "Email", type = "string", column = "email_address" },
    { name = "Password", type = "string", encrypt = true },
]

[[find]]
name = "FindUsers"
filters = [
    { name = "Email", op = "like", case_insensitive = true },
    { group = [{ name = "Id" }, { name = "Ids", type = "[]int64", column = "id", op = "in" }] },
]

[[update]]
name = "UpdateEmail"
partial = true
set = [{ name = "Email" }]
filters = [{ name = "Id" }]
"#;

    #[test]
    fn resolves_fields_against_the_record() {
        let model = Schema::from_toml_str(USERS).unwrap().to_model().unwrap();
        assert_eq!(model.package, "store");
        assert_eq!(model.encryption, Some(CallDescriptor::new("hashPassword", 1, false)));

        let DaoFunction::Find { filters, .. } = &model.functions[0] else {
            panic!("expected a find function");
        };
        let email = filters[0].as_leaf().unwrap();
        assert_eq!(email.source, SourceSql::Column("email_address".into()));
        assert_eq!(email.operator, CompareOperator::Like);
        let FieldDescriptor::Group(members) = &filters[1] else {
            panic!("expected a group");
        };
        assert_eq!(members[1].as_leaf().unwrap().ty, TypeRef::slice(TypeRef::named("int64")));

        let DaoFunction::Update { set, .. } = &model.functions[1] else {
            panic!("expected an update function");
        };
        assert_eq!(set[0].as_leaf().unwrap().ty, TypeRef::pointer(TypeRef::named("string")));
    }

    #[test]
    fn json_schemas_are_accepted() {
        let source = r#"{
            "record": { "name": "Tag", "table": "tags", "fields": [{ "name": "Label", "type": "string" }] },
            "delete": [{ "name": "DeleteTag", "filters": [{ "name": "Label" }] }]
        }"#;
        let model = Schema::from_json_str(source).unwrap().to_model().unwrap();
        assert_eq!(model.package, "dao");
        assert_eq!(model.functions[0].name(), "DeleteTag");
    }

    #[test]
    fn rejects_inconsistent_schemas() {
        let unknown_op = USERS.replace("op = \"like\"", "op = \"between\"");
        let err = Schema::from_toml_str(&unknown_op).unwrap().to_model().unwrap_err();
        assert!(matches!(err, SchemaError::Synth(crate::SynthError::UnknownOperator(_))));

        let missing_type = USERS.replace("{ name = \"Id\" }, { name = \"Ids\"", "{ name = \"Nope\" }, { name = \"Ids\"");
        let err = Schema::from_toml_str(&missing_type).unwrap().to_model().unwrap_err();
        assert_eq!(err.to_string(), "invalid schema: field `Nope` has no type");

        let duplicate = USERS.replace("UpdateEmail", "FindUsers");
        assert!(Schema::from_toml_str(&duplicate).unwrap().to_model().is_err());
    }

    #[test]
    fn imports_are_carried_into_the_model() {
        let source = format!("{USERS}\n[imports]\nuuid = \"github.com/google/uuid\"\n");
        let model = Schema::from_toml_str(&source).unwrap().to_model().unwrap();
        assert_eq!(model.imports["uuid"], "github.com/google/uuid");

        let bad = format!("{USERS}\n[imports]\n\"go-uuid\" = \"github.com/google/uuid\"\n");
        assert!(Schema::from_toml_str(&bad).unwrap().to_model().is_err());
    }

    #[test]
    fn record_fields_map_to_one_column() {
        let union = USERS.replace(
            "{ name = \"Email\", type = \"string\", column = \"email_address\" }",
            "{ name = \"Email\", type = \"string\", any_of = [\"email\", \"login\"] }",
        );
        let err = Schema::from_toml_str(&union).unwrap().to_model().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid schema: record field `Email` cannot use `any_of`, it must map to one column"
        );

        let mut model = Schema::from_toml_str(USERS).unwrap().to_model().unwrap();
        model.fields.push(FieldDescriptor::Group(vec![
            LeafField::new("A", TypeRef::named("string")).into(),
            LeafField::new("B", TypeRef::named("string")).into(),
        ]));
        assert!(model.validate().is_err());
    }

    #[test]
    fn unknown_extension_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.yaml");
        fs::write(&path, "record: {}").unwrap();
        let err = Schema::load(&path).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedFormat { extension } if extension == "yaml"));
    }
}
