//! Derive support for daogen records.
//!
//! `#[derive(Record)]` turns a Rust struct into the field metadata the
//! synthesizer consumes:
//!
//! ```text
//! #[derive(Record)]
//! #[daogen(table = "users")]
//! struct User {
//!     id: i64,
//!     #[daogen(any_of("email", "username"), case_insensitive)]
//!     login: String,
//!     #[daogen(encrypt, custom, go_type = "Password")]
//!     password: String,
//!     #[daogen(generate = "now")]
//!     created_at: Option<SystemTime>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

use record::ParsedRecord;

#[proc_macro_derive(Record, attributes(daogen))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedRecord::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
