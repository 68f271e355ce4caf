//! Renders a complete Go data-access file from a [`DaoModel`].

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, bail};
use daogen::ir::functions::{DB_EXEC, LEN, STRINGS_JOIN};
use daogen::ir::source::{GoExpr, GoField};
use daogen::ir::{AssignOp, BinaryOp};
use daogen::{
    BuilderOptions, DaoFunction, DaoModel, ExecutionOptions, FieldDescriptor, FindAll, FindOne, GoSourceBuilder,
    IrBuilder, Schema, ScanWrapper, SourceSql, SynthConfig, Synthesizer, TypeRef,
};
use indexmap::IndexMap;
use log::debug;

pub const HEADER: &str = "// Code generated by daogen. DO NOT EDIT.";

/// Names bound inside generated functions. Dotted calls on them are method
/// calls, not package references.
const LOCALS: &[&str] = &["db", "rows", "row", "opts", "changes"];

/// Packages usable without declaring an import path.
const STANDARD_IMPORTS: &[(&str, &str)] = &[
    ("context", "context"),
    ("fmt", "fmt"),
    ("sql", "database/sql"),
    ("strings", "strings"),
    ("time", "time"),
];

/// Renders the Go file described by `schema`.
pub fn render_schema(schema: &Schema) -> Result<String> {
    let model = schema
        .to_model()
        .with_context(|| format!("invalid schema for record `{}`", schema.record.name))?;
    render_model(&model)
}

/// Renders the Go file for `model`.
pub fn render_model(model: &DaoModel) -> Result<String> {
    model
        .validate()
        .with_context(|| format!("invalid model for record `{}`", model.record))?;
    let mut config = SynthConfig::new();
    if let Some(encryption) = &model.encryption {
        config.encryption.register(encryption.clone())?;
    }
    let builder = GoSourceBuilder::new();
    let mut renderer = Renderer {
        b: &builder,
        synth: Synthesizer::new(&builder, &config),
        model,
        shapes: IndexMap::new(),
        functions: Vec::new(),
    };
    for function in &model.functions {
        renderer
            .function(function)
            .with_context(|| format!("failed to render `{}`", function.name()))?;
    }

    let mut decls = vec![renderer.record_type()?];
    decls.extend(renderer.shapes.into_values().map(|spec| builder.type_decl(spec)));
    decls.extend(renderer.functions);
    let body = decls.join("\n\n");

    let mut out = format!("{HEADER}\n\npackage {}\n\n", model.package);
    let imports = imports(model, builder.qualifiers())?;
    if !imports.is_empty() {
        out.push_str("import (\n");
        for spec in imports.values() {
            out.push_str(&format!("\t{spec}\n"));
        }
        out.push_str(")\n\n");
    }
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}

/// Import specs for the package qualifiers the code uses, keyed by path.
fn imports(model: &DaoModel, qualifiers: BTreeSet<String>) -> Result<BTreeMap<String, String>> {
    let mut specs = BTreeMap::new();
    for qualifier in qualifiers {
        if LOCALS.contains(&qualifier.as_str()) {
            continue;
        }
        let path = match model.imports.get(&qualifier) {
            Some(path) => path.clone(),
            None => match STANDARD_IMPORTS.iter().find(|(name, _)| *name == qualifier) {
                Some((_, path)) => path.to_string(),
                None => bail!("package `{qualifier}` is used but has no import path, declare it under `imports`"),
            },
        };
        let spec = if path.rsplit('/').next() == Some(qualifier.as_str()) {
            format!("\"{path}\"")
        } else {
            format!("{qualifier} \"{path}\"")
        };
        debug!("importing `{path}` for `{qualifier}`");
        specs.insert(path, spec);
    }
    Ok(specs)
}

struct Renderer<'a> {
    b: &'a GoSourceBuilder,
    synth: Synthesizer<'a, GoSourceBuilder>,
    model: &'a DaoModel,
    shapes: IndexMap<String, String>,
    functions: Vec<String>,
}

impl Renderer<'_> {
    fn record_type(&self) -> Result<String> {
        let mut fields = Vec::with_capacity(self.model.fields.len());
        for field in &self.model.fields {
            let FieldDescriptor::Leaf(leaf) = field else {
                bail!("record `{}` cannot contain field groups", self.model.record);
            };
            fields.push(self.b.field(&leaf.names, self.b.resolve_type(&leaf.ty), None));
        }
        Ok(self.b.type_decl(self.b.struct_spec(&self.model.record, fields)))
    }

    fn function(&mut self, function: &DaoFunction) -> Result<()> {
        let decl = match function {
            DaoFunction::Find { name, one, filters } => self.find(name, *one, filters)?,
            DaoFunction::Insert { name } => self.insert(name)?,
            DaoFunction::Update { name, set, filters } => self.update(name, set, filters)?,
            DaoFunction::Delete { name, filters } => self.delete(name, filters)?,
        };
        self.functions.push(decl);
        Ok(())
    }

    fn find(&mut self, name: &str, one: bool, filters: &[FieldDescriptor]) -> Result<String> {
        let b = self.b;
        let filter = self
            .synth
            .synthesize_filter(filters, "opts", &format!("{name}Options"), &BuilderOptions::find())?;
        self.shapes.extend(filter.shapes);

        let (refs, columns) = self.synth.extract_destination_fields("row", &self.model.fields)?;
        let select = format!("select {} from {}", columns.join(", "), self.model.table);

        let mut body = vec![self.string_slice("filters"), self.any_slice("args")];
        body.extend(filter.statements);
        body.push(b.assign(vec![b.ident("sqlText")], AssignOp::Define, vec![b.string_lit(&select)]));
        body.push(self.where_clause()?);
        body.push(b.var_stmt("rows", Some(b.pointer_type(b.named_type("sql.Rows"))), None));

        let wrapper: &dyn ScanWrapper<GoSourceBuilder> = if one { &FindOne } else { &FindAll };
        let execution = ExecutionOptions::new(self.model.record.as_str(), "sqlText");
        body.extend(self.synth.synthesize_execution_block(wrapper, refs, &execution)?);
        body.push(b.return_stmt(Vec::new()));

        let record = TypeRef::named(self.model.record.as_str());
        let result = if one { TypeRef::pointer(record) } else { TypeRef::slice(record) };
        let results = vec![b.field(&["result".to_string()], b.resolve_type(&result), None)];
        Ok(self
            .synth
            .api_function(name, vec![self.db_param(), filter.param], results, body)?)
    }

    fn insert(&mut self, name: &str) -> Result<String> {
        let b = self.b;
        let fields = writable(&self.model.fields);
        let input = self
            .synth
            .synthesize_input_values(&fields, "opts", &format!("{name}Options"), &BuilderOptions::insert())?;
        self.shapes.extend(input.shapes);

        let mut body = vec![
            self.string_slice("fields"),
            self.string_slice("values"),
            self.any_slice("args"),
        ];
        body.extend(input.statements);
        let sql = self.concat(vec![
            b.string_lit(&format!("insert into {} (", self.model.table)),
            self.join("fields", ", ")?,
            b.string_lit(") values ("),
            self.join("values", ", ")?,
            b.string_lit(")"),
        ]);
        body.push(b.assign(vec![b.ident("sqlText")], AssignOp::Define, vec![sql]));
        body.push(self.exec()?);
        body.push(b.return_stmt(Vec::new()));

        let mut params = vec![self.db_param()];
        params.extend(input.param);
        Ok(self.synth.api_function(name, params, Vec::new(), body)?)
    }

    fn update(&mut self, name: &str, set: &[FieldDescriptor], filters: &[FieldDescriptor]) -> Result<String> {
        let b = self.b;
        let input = self
            .synth
            .synthesize_input_values(set, "changes", &format!("{name}Changes"), &BuilderOptions::update())?;
        self.shapes.extend(input.shapes);
        let filter = self
            .synth
            .synthesize_filter(filters, "opts", &format!("{name}Options"), &BuilderOptions::find())?;
        self.shapes.extend(filter.shapes);

        let mut body = vec![self.string_slice("fields"), self.any_slice("args")];
        body.extend(input.statements);
        let nothing_to_set = b.binary(BinaryOp::Eq, b.call(&LEN, vec![b.ident("fields")])?, b.int_lit(0));
        body.push(b.if_stmt(None, nothing_to_set, vec![b.return_stmt(Vec::new())]));
        body.push(self.string_slice("filters"));
        body.extend(filter.statements);
        let sql = self.concat(vec![
            b.string_lit(&format!("update {} set ", self.model.table)),
            self.join("fields", ", ")?,
        ]);
        body.push(b.assign(vec![b.ident("sqlText")], AssignOp::Define, vec![sql]));
        body.push(self.where_clause()?);
        body.push(self.exec()?);
        body.push(b.return_stmt(Vec::new()));

        let mut params = vec![self.db_param()];
        params.extend(input.param);
        params.push(filter.param);
        Ok(self.synth.api_function(name, params, Vec::new(), body)?)
    }

    fn delete(&mut self, name: &str, filters: &[FieldDescriptor]) -> Result<String> {
        let b = self.b;
        let filter = self
            .synth
            .synthesize_filter(filters, "opts", &format!("{name}Options"), &BuilderOptions::delete())?;
        self.shapes.extend(filter.shapes);

        let mut body = vec![self.string_slice("filters"), self.any_slice("args")];
        body.extend(filter.statements);
        let sql = b.string_lit(&format!("delete from {}", self.model.table));
        body.push(b.assign(vec![b.ident("sqlText")], AssignOp::Define, vec![sql]));
        body.push(self.where_clause()?);
        body.push(self.exec()?);
        body.push(b.return_stmt(Vec::new()));

        Ok(self
            .synth
            .api_function(name, vec![self.db_param(), filter.param], Vec::new(), body)?)
    }

    fn db_param(&self) -> GoField {
        self.b.field(
            &["db".to_string()],
            self.b.pointer_type(self.b.named_type("sql.DB")),
            None,
        )
    }

    fn string_slice(&self, name: &str) -> String {
        self.b.var_stmt(name, Some(self.b.slice_type(self.b.named_type("string"))), None)
    }

    fn any_slice(&self, name: &str) -> String {
        self.b.var_stmt(name, Some(self.b.slice_type(self.b.named_type("any"))), None)
    }

    fn join(&self, var: &str, separator: &str) -> Result<GoExpr> {
        Ok(self
            .b
            .call(&STRINGS_JOIN, vec![self.b.ident(var), self.b.string_lit(separator)])?)
    }

    fn concat(&self, parts: Vec<GoExpr>) -> GoExpr {
        let mut parts = parts.into_iter();
        let first = parts.next().unwrap_or_else(|| self.b.string_lit(""));
        parts.fold(first, |left, right| self.b.binary(BinaryOp::Add, left, right))
    }

    /// `if len(filters) > 0 { sqlText += " where " + strings.Join(filters, " and ") }`
    fn where_clause(&self) -> Result<String> {
        let b = self.b;
        let cond = b.binary(BinaryOp::Greater, b.call(&LEN, vec![b.ident("filters")])?, b.int_lit(0));
        let clause = b.binary(BinaryOp::Add, b.string_lit(" where "), self.join("filters", " and ")?);
        let append = b.assign(vec![b.ident("sqlText")], AssignOp::AddAssign, vec![clause]);
        Ok(b.if_stmt(None, cond, vec![append]))
    }

    /// `if _, err = db.Exec(sqlText, args...); err != nil { return }`
    fn exec(&self) -> Result<String> {
        let b = self.b;
        let call = b.call_spread(&DB_EXEC, vec![b.ident("sqlText"), b.ident("args")])?;
        Ok(b.call_with_err_check(Some("_"), call))
    }
}

/// Record fields that map to a real column.
fn writable(fields: &[FieldDescriptor]) -> Vec<FieldDescriptor> {
    fields
        .iter()
        .filter(|field| !matches!(field.as_leaf(), Some(leaf) if matches!(leaf.source, SourceSql::Expression(_))))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const USERS: &str = r#"
[record]
name = "User"
table = "users"
fields = [
    { name = "Id", type = "int64" },
    { name = "Email", type = "string" },
    { name = "Posts", type = "int64", expr = "(select count(*) from posts p where p.user_id = users.id)" },
]
"#;

    fn render(functions: &str) -> String {
        render_schema(&Schema::from_toml_str(&format!("{USERS}{functions}")).unwrap()).unwrap()
    }

    #[test]
    fn renders_a_complete_delete_file() {
        let code = render("[[delete]]\nname = \"DeleteUser\"\nfilters = [{ name = \"Id\" }]\n");
        assert_eq!(
            code,
            r#"// Code generated by daogen. DO NOT EDIT.

package dao

import (
	"context"
	"database/sql"
	"fmt"
	"strings"
)

type User struct {
	Id    int64
	Email string
	Posts int64
}

type DeleteUserOptions struct {
	Id int64
}

func DeleteUser(ctx context.Context, db *sql.DB, opts DeleteUserOptions) (err error) {
	var filters []string
	var args []any
	filters = append(filters, fmt.Sprintf("id = $%d", len(args)+1))
	args = append(args, opts.Id)
	sqlText := "delete from users"
	if len(filters) > 0 {
		sqlText += " where " + strings.Join(filters, " and ")
	}
	if _, err = db.Exec(sqlText, args...); err != nil {
		return
	}
	return
}
"#
        );
    }

    #[test]
    fn find_selects_every_record_column() {
        let code = render("[[find]]\nname = \"FindUser\"\none = true\nfilters = [{ name = \"Email\", op = \"like\" }]\n");
        assert!(code.contains(
            "sqlText := \"select id, email, (select count(*) from posts p where p.user_id = users.id) from users\""
        ));
        assert!(code.contains("func FindUser(ctx context.Context, db *sql.DB, opts FindUserOptions) (result *User, err error) {"));
        assert!(code.contains("\tif rows.Next() {\n"));
        assert!(code.contains("rows.Scan(&row.Id, &row.Email, &row.Posts)"));
        assert!(code.contains("email like '%%' || $%d || '%%'"));
    }

    #[test]
    fn insert_skips_expression_columns() {
        let code = render("[insert]\nname = \"InsertUser\"\n");
        assert!(code.contains("type InsertUserOptions struct {\n\tId    int64\n\tEmail string\n}"));
        assert!(!code.contains("opts.Posts"));
        assert!(code.contains(
            "sqlText := \"insert into users (\" + strings.Join(fields, \", \") + \") values (\" + strings.Join(values, \", \") + \")\""
        ));
    }

    #[test]
    fn update_returns_early_without_changes() {
        let code = render(
            "[[update]]\nname = \"RenameUser\"\npartial = true\nset = [{ name = \"Email\" }]\nfilters = [{ name = \"Id\" }]\n",
        );
        assert!(code.contains("func RenameUser(ctx context.Context, db *sql.DB, changes RenameUserChanges, opts RenameUserOptions) (err error) {"));
        assert!(code.contains("\tif len(fields) == 0 {\n\t\treturn\n\t}\n"));
        assert!(code.contains("if changes.Email != nil {"));
        assert!(code.contains("sqlText := \"update users set \" + strings.Join(fields, \", \")"));
    }

    const EVENTS: &str = r#"
[record]
name = "Event"
table = "events"
fields = [
    { name = "Id", type = "uuid.UUID" },
    { name = "Zone", type = "string", expr = "time.zone" },
]

[[find]]
name = "FindEvents"
filters = [{ name = "Id" }]

[imports]
uuid = "github.com/google/uuid"
"#;

    #[allow(dead_code)]
    #[derive(daogen::Record)]
    #[daogen(table = "accounts")]
    struct Account {
        id: i64,
        #[daogen(any_of("email", "username"))]
        login: String,
    }

    #[test]
    fn imports_follow_emitted_types_and_calls() {
        let code = render_schema(&Schema::from_toml_str(EVENTS).unwrap()).unwrap();
        assert!(code.contains(
            "import (\n\t\"context\"\n\t\"database/sql\"\n\t\"fmt\"\n\t\"github.com/google/uuid\"\n\t\"strings\"\n)\n"
        ));
        assert!(code.contains("time.zone from events"));
        assert!(!code.contains("\"time\""));

        let undeclared = EVENTS.replace("uuid = \"github.com/google/uuid\"", "");
        let err = render_schema(&Schema::from_toml_str(&undeclared).unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "package `uuid` is used but has no import path, declare it under `imports`"
        );
    }

    #[test]
    fn aliases_qualifiers_that_differ_from_the_path() {
        let model = DaoModel::for_record::<Account>("dao").with_import("guuid", "github.com/google/uuid");
        let qualifiers = ["db", "guuid", "sql"].map(String::from).into_iter().collect();
        let specs: Vec<_> = imports(&model, qualifiers).unwrap().into_values().collect();
        assert_eq!(specs, vec!["\"database/sql\"", "guuid \"github.com/google/uuid\""]);
    }

    #[test]
    fn record_unions_are_rejected_before_rendering() {
        let model = DaoModel::for_record::<Account>("dao")
            .with_function(DaoFunction::Find {
                name: "FindAccount".into(),
                one: true,
                filters: Vec::new(),
            })
            .with_function(DaoFunction::Insert {
                name: "InsertAccount".into(),
            });
        let err = render_model(&model).unwrap_err();
        assert!(format!("{err:#}").contains("record field `Login` cannot use `any_of`, it must map to one column"));
    }

    #[test]
    fn expression_fields_are_not_written() {
        let fields = vec![
            daogen::LeafField::new("Id", TypeRef::named("int64")).into(),
            daogen::LeafField::new("Total", TypeRef::named("int64"))
                .expression("count(*)")
                .into(),
        ];
        assert_eq!(writable(&fields).len(), 1);
    }
}
