use crate::ir::CallDescriptor;

/// How bound arguments are referenced from SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... numbered from the current argument count.
    #[default]
    Numbered,
    /// `?`, one per bound argument.
    Question,
}

/// Variable names and formatting shared by every field of one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Accumulates bound argument values.
    pub values_var: String,
    /// Accumulates SQL fragments.
    pub fragments_var: String,
    /// Accumulates column names, for insert statements.
    pub columns_var: Option<String>,
    /// Template for one value fragment, with `{column}` and `{placeholder}`
    /// markers. Empty means arguments only.
    pub value_format: String,
    pub placeholder: PlaceholderStyle,
}

impl BuilderOptions {
    pub fn find() -> Self {
        Self {
            values_var: "args".into(),
            fragments_var: "filters".into(),
            columns_var: None,
            value_format: "{column} = {placeholder}".into(),
            placeholder: PlaceholderStyle::Numbered,
        }
    }

    pub fn insert() -> Self {
        Self {
            values_var: "args".into(),
            fragments_var: "values".into(),
            columns_var: Some("fields".into()),
            value_format: "/* {column} */ {placeholder}".into(),
            placeholder: PlaceholderStyle::Numbered,
        }
    }

    pub fn update() -> Self {
        Self {
            values_var: "args".into(),
            fragments_var: "fields".into(),
            columns_var: None,
            value_format: "{column} = {placeholder}".into(),
            placeholder: PlaceholderStyle::Numbered,
        }
    }

    pub fn delete() -> Self {
        Self {
            values_var: "args".into(),
            fragments_var: "filters".into(),
            columns_var: None,
            value_format: "{column} = {placeholder}".into(),
            placeholder: PlaceholderStyle::Numbered,
        }
    }

    /// Collects caller values into `args` without any SQL text.
    pub fn incoming_arguments() -> Self {
        Self {
            values_var: "args".into(),
            fragments_var: "fields".into(),
            columns_var: None,
            value_format: String::new(),
            placeholder: PlaceholderStyle::Numbered,
        }
    }

    pub fn with_fragments_var(mut self, name: impl Into<String>) -> Self {
        self.fragments_var = name.into();
        self
    }

    pub fn with_values_var(mut self, name: impl Into<String>) -> Self {
        self.values_var = name.into();
        self
    }

    pub fn with_placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder = style;
        self
    }
}

/// Where the execution block reads a value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    Variable(String),
    /// `wrapper(name)`
    Wrapped { name: String, wrapper: CallDescriptor },
}

impl ValueSource {
    pub fn variable(name: impl Into<String>) -> Self {
        ValueSource::Variable(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            ValueSource::Variable(name) | ValueSource::Wrapped { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Scan destination declared inside the row loop.
    pub row_var: String,
    pub row_type: String,
    pub sql_text: ValueSource,
    pub arguments: ValueSource,
    /// Variable the scan wrapper stores rows into.
    pub result_var: String,
}

impl ExecutionOptions {
    pub fn new(row_type: impl Into<String>, sql_var: impl Into<String>) -> Self {
        Self {
            row_var: "row".into(),
            row_type: row_type.into(),
            sql_text: ValueSource::variable(sql_var),
            arguments: ValueSource::variable("args"),
            result_var: "result".into(),
        }
    }

    pub fn with_arguments(mut self, source: ValueSource) -> Self {
        self.arguments = source;
        self
    }

    pub fn with_sql_text(mut self, source: ValueSource) -> Self {
        self.sql_text = source;
        self
    }

    pub fn with_result_var(mut self, name: impl Into<String>) -> Self {
        self.result_var = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_preset_collects_columns() {
        let options = BuilderOptions::insert();
        assert_eq!(options.columns_var.as_deref(), Some("fields"));
        assert!(options.value_format.starts_with("/* {column} */"));
    }

    #[test]
    fn builder_methods_override_presets() {
        let options = BuilderOptions::find()
            .with_fragments_var("where_parts")
            .with_placeholder_style(PlaceholderStyle::Question);
        assert_eq!(options.fragments_var, "where_parts");
        assert_eq!(options.placeholder, PlaceholderStyle::Question);
        assert_eq!(BuilderOptions::incoming_arguments().value_format, "");
    }
}
