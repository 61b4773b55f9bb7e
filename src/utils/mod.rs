pub mod date;

pub use date::{format_due_date, parse_due_input};
