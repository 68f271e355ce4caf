//! Call descriptors for the functions generated code relies on.

use super::CallDescriptor;

pub const APPEND: CallDescriptor = CallDescriptor::variadic("append", 1);
pub const LEN: CallDescriptor = CallDescriptor::fixed("len", 1);
pub const STRINGS_JOIN: CallDescriptor = CallDescriptor::fixed("strings.Join", 2);
pub const FMT_SPRINTF: CallDescriptor = CallDescriptor::variadic("fmt.Sprintf", 1);
pub const TIME_NOW: CallDescriptor = CallDescriptor::fixed("time.Now", 0);

pub const DB_QUERY: CallDescriptor = CallDescriptor::variadic("db.Query", 1);
pub const DB_EXEC: CallDescriptor = CallDescriptor::variadic("db.Exec", 1);
pub const ROWS_NEXT: CallDescriptor = CallDescriptor::fixed("rows.Next", 0);
pub const ROWS_ERR: CallDescriptor = CallDescriptor::fixed("rows.Err", 0);
pub const ROWS_SCAN: CallDescriptor = CallDescriptor::variadic("rows.Scan", 1);
pub const ROWS_CLOSE: CallDescriptor = CallDescriptor::fixed("rows.Close", 0);

/// Default encryption call used when no custom function is registered.
pub const ENCRYPT_PASSWORD: CallDescriptor = CallDescriptor::fixed("encryptPassword", 1);

/// Method on optional-wrapper values reporting that nothing was supplied.
pub const IS_OMITTED: CallDescriptor = CallDescriptor::fixed("IsOmitted", 0);

/// Field holding the wrapped value of an optional-wrapper.
pub const WRAPPED_VALUE_FIELD: &str = "Value";
