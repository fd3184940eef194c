//! Format-specific readers producing an untyped [`Table`](crate::types::Table).

pub mod csv_table;
pub mod xlsx_table;
