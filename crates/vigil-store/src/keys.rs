//! Composite row keys.
//!
//! Columns are joined with the ASCII unit separator so that identifiers
//! containing `/` or `:` cannot bleed into a neighbouring partition.

const SEP: char = '\u{1f}';

/// Full row key from partition and clustering columns.
pub fn row_key(columns: &[&str]) -> String {
    let mut key = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            key.push(SEP);
        }
        key.push_str(col);
    }
    key
}

/// Prefix matching every row whose leading columns equal `columns`.
pub fn partition(columns: &[&str]) -> String {
    let mut prefix = row_key(columns);
    prefix.push(SEP);
    prefix
}
