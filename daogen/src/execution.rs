//! Query execution and row scanning.
//!
//! The block always runs the query, defers closing the rows and scans into
//! a fresh row value. How rows are iterated and where they end up is left
//! to a [`ScanWrapper`].

use log::{debug, trace};

use crate::errors::{Result, SynthError};
use crate::ir::functions::{APPEND, DB_QUERY, ROWS_CLOSE, ROWS_ERR, ROWS_NEXT, ROWS_SCAN};
use crate::ir::{AssignOp, IrBuilder};
use crate::naming::ensure_identifier;
use crate::options::{ExecutionOptions, ValueSource};
use crate::synth::Synthesizer;
use crate::types::FieldDescriptor;

/// Names a scan wrapper can refer to.
#[derive(Debug, Clone, Copy)]
pub struct ScanScope<'s> {
    pub row: &'s str,
    pub result: &'s str,
}

/// Strategy for iterating result rows.
pub trait ScanWrapper<B: IrBuilder> {
    /// Wraps `body`, which declares the row and scans into it.
    fn wrap(&self, b: &B, scope: &ScanScope<'_>, body: Vec<B::Stmt>) -> Result<Vec<B::Stmt>>;
}

/// Reads at most one row into `result = &row`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOne;

impl<B: IrBuilder> ScanWrapper<B> for FindOne {
    fn wrap(&self, b: &B, scope: &ScanScope<'_>, mut body: Vec<B::Stmt>) -> Result<Vec<B::Stmt>> {
        body.push(b.assign(
            vec![b.ident(scope.result)],
            AssignOp::Assign,
            vec![b.address_of(b.ident(scope.row))],
        ));
        Ok(vec![b.if_stmt(None, b.call(&ROWS_NEXT, Vec::new())?, body)])
    }
}

/// Appends every row to `result`, then reports iteration errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindAll;

impl<B: IrBuilder> ScanWrapper<B> for FindAll {
    fn wrap(&self, b: &B, scope: &ScanScope<'_>, mut body: Vec<B::Stmt>) -> Result<Vec<B::Stmt>> {
        let append = b.call(&APPEND, vec![b.ident(scope.result), b.ident(scope.row)])?;
        body.push(b.assign(vec![b.ident(scope.result)], AssignOp::Assign, vec![append]));
        Ok(vec![
            b.while_stmt(b.call(&ROWS_NEXT, Vec::new())?, body),
            b.call_with_err_check(None, b.call(&ROWS_ERR, Vec::new())?),
        ])
    }
}

impl<B: IrBuilder> Synthesizer<'_, B> {
    /// Runs the query and scans rows through `wrapper`:
    ///
    /// ```text
    /// if rows, err = db.Query(sqlText, args...); err != nil {
    ///     return
    /// }
    /// defer rows.Close()
    /// <wrapper around>
    ///     var row T
    ///     if err = rows.Scan(&row.A, &row.B); err != nil {
    ///         return
    ///     }
    /// ```
    pub fn synthesize_execution_block(
        &self,
        wrapper: &dyn ScanWrapper<B>,
        destination_refs: Vec<B::Expr>,
        options: &ExecutionOptions,
    ) -> Result<Vec<B::Stmt>> {
        debug!(
            "synthesizing execution block for `{}` scanning {} column(s)",
            options.row_type,
            destination_refs.len()
        );
        ensure_identifier(&options.row_var)?;
        ensure_identifier(&options.result_var)?;

        let b = self.b;
        let query = b.call_spread(
            &DB_QUERY,
            vec![self.value_source(&options.sql_text)?, self.value_source(&options.arguments)?],
        )?;
        let mut stmts = vec![
            b.call_with_err_check(Some("rows"), query),
            b.defer_call(&ROWS_CLOSE, Vec::new())?,
        ];

        let scan = b.call(&ROWS_SCAN, destination_refs)?;
        let body = vec![
            b.var_stmt(&options.row_var, Some(b.named_type(&options.row_type)), None),
            b.call_with_err_check(None, scan),
        ];
        let scope = ScanScope {
            row: &options.row_var,
            result: &options.result_var,
        };
        stmts.extend(wrapper.wrap(b, &scope, body)?);
        Ok(stmts)
    }

    /// One `&row.Name` reference per declared name, with the SQL source of
    /// each field alongside.
    pub fn extract_destination_fields(
        &self,
        row_var: &str,
        fields: &[FieldDescriptor],
    ) -> Result<(Vec<B::Expr>, Vec<String>)> {
        let mut refs = Vec::new();
        let mut columns = Vec::new();
        for field in fields {
            let FieldDescriptor::Leaf(leaf) = field else {
                return Err(SynthError::UnexpectedGroup {
                    context: "destination fields",
                });
            };
            let column = leaf.source.sql_expr();
            for name in &leaf.names {
                trace!("scanning `{column}` into `{row_var}.{name}`");
                refs.push(self.b.address_of(self.carrier_field(row_var, name)));
                columns.push(column.clone());
            }
        }
        Ok((refs, columns))
    }

    /// `func name(ctx context.Context, params...) (results..., err error)`
    pub fn api_function(
        &self,
        name: &str,
        params: Vec<B::Field>,
        results: Vec<B::Field>,
        body: Vec<B::Stmt>,
    ) -> Result<B::Decl> {
        ensure_identifier(name)?;
        let b = self.b;
        let mut all_params = Vec::with_capacity(params.len() + 1);
        all_params.push(b.field(&["ctx".to_string()], b.named_type("context.Context"), None));
        all_params.extend(params);
        let mut all_results = results;
        all_results.push(b.field(&["err".to_string()], b.named_type("error"), None));
        Ok(b.func_decl(name, all_params, all_results, body))
    }

    fn value_source(&self, source: &ValueSource) -> Result<B::Expr> {
        match source {
            ValueSource::Variable(name) => Ok(self.b.path(name)),
            ValueSource::Wrapped { name, wrapper } => self.b.call(wrapper, vec![self.b.path(name)]),
        }
    }
}
