use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;

use super::graph::{ResultRow, RowValue};

/// Load a result set exported from a driver session.
///
/// Accepts an array of row objects, an array of `{keys, _fields}` records, or
/// either of those wrapped in `{"rows": [...]}`.
pub fn load_rows_from_path(path: &Path) -> Result<Vec<ResultRow>> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    parse_rows(&buf).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_rows(text: &str) -> Result<Vec<ResultRow>> {
    let doc: Value = serde_json::from_str(text)?;
    let rows = match doc {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => match obj.remove("rows") {
            Some(Value::Array(rows)) => rows,
            _ => bail!("expected a JSON array of rows or an object with a \"rows\" array"),
        },
        _ => bail!("expected a JSON array of rows"),
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| parse_row(row).map_err(|e| anyhow!("row {}: {}", i, e)))
        .collect()
}

fn parse_row(row: Value) -> Result<ResultRow> {
    let Value::Object(obj) = row else {
        bail!("row is not an object");
    };

    // Driver record shape: parallel keys/_fields arrays
    if let (Some(Value::Array(keys)), Some(Value::Array(fields))) = (obj.get("keys"), obj.get("_fields")) {
        if keys.len() != fields.len() {
            bail!("record has {} keys but {} fields", keys.len(), fields.len());
        }
        let mut out = ResultRow::new();
        for (key, field) in keys.iter().zip(fields) {
            let key = key.as_str().ok_or_else(|| anyhow!("record key is not a string"))?;
            out.push(key, RowValue::classify(field.clone()));
        }
        return Ok(out);
    }

    let mut out = ResultRow::new();
    for (key, value) in obj {
        out.push(key, RowValue::classify(value));
    }
    Ok(out)
}
