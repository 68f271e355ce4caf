use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Result, SynthError};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"));

static TYPE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*\.)?[A-Za-z_][A-Za-z0-9_]*$").expect("type name pattern compiles")
});

/// Words that cannot name a variable, field or type in generated code.
const RESERVED: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for", "func", "go",
    "goto", "if", "import", "interface", "map", "package", "range", "return", "select", "struct", "switch", "type",
    "var",
];

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !RESERVED.contains(&name)
}

pub fn ensure_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SynthError::InvalidIdentifier(name.to_string()))
    }
}

/// Accepts a plain or package-qualified type name such as `sql.NullString`.
pub fn ensure_type_name(name: &str) -> Result<()> {
    let reserved = name.split('.').any(|part| RESERVED.contains(&part));
    if TYPE_NAME.is_match(name) && !reserved {
        Ok(())
    } else {
        Err(SynthError::InvalidIdentifier(name.to_string()))
    }
}
