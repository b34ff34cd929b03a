//! File output and console preview helpers.

use std::path::Path;

use anyhow::{Context, Result};
use tabled::{settings::Style, Table, Tabled};

/// Whole-file write of the rendered document, replacing any existing file.
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Print up to `max_rows` rows as a markdown table on stdout.
pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
