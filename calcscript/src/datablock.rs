//! Data-table blocks.
//!
//! A data block declares one table: header keys (`name:`, `primaryKey:`,
//! optional `sortBy:`, `source:`/`format:`/`hash:`), an indented `columns:`
//! map, a `---` separator, then inline rows as one JSON object per line.
//! Tables with an external `source:` carry no inline rows; their rows are
//! fetched, hash-checked and handed in by the embedding application, and
//! get the same shape validation as inline rows on the way in.
//!
//! Row failures reject single rows; header failures reject the table.

use std::collections::HashSet;

use calcscript_core::{codes, CalcError, Diagnostic, InputType, KeyRepr, Record, Value, RESERVED_KEYS};

use crate::input::{coerce_value, valid_name};

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub ty: InputType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone)]
pub struct ExternalSource {
    pub uri: String,
    pub format: SourceFormat,
    /// `sha256:<64 hex>`; the embedder checks fetched bytes against it.
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct DataTable {
    pub name: String,
    pub primary_key: String,
    /// Declared order; also the key order of every validated row.
    pub columns: Vec<ColumnDef>,
    /// Validated inline rows. Empty when `source` is set.
    pub rows: Vec<Record>,
    pub source: Option<ExternalSource>,
    /// Presentation hint for renderers; binding order stays as declared.
    pub sort_by: Option<String>,
    /// 1-based line of the `name:` header within the block.
    pub line: u32,
}

/// Raw header fields as scanned, before validation.
#[derive(Default)]
struct Header {
    name: Option<(String, u32)>,
    primary_key: Option<String>,
    sort_by: Option<String>,
    source_uri: Option<String>,
    format: Option<String>,
    hash: Option<String>,
}

pub fn parse_block(block_source: &str) -> (Option<DataTable>, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let mut header = Header::default();
    let mut columns: Vec<ColumnDef> = Vec::new();
    let mut in_columns = false;
    let mut in_rows = false;
    let mut row_lines: Vec<(u32, &str)> = Vec::new();

    for (i, raw) in block_source.lines().enumerate() {
        let line = i as u32 + 1;
        if in_rows {
            if !raw.trim().is_empty() {
                row_lines.push((line, raw));
            }
            continue;
        }
        let trimmed = raw.trim();
        if trimmed == "---" {
            in_rows = true;
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indented = raw.starts_with([' ', '\t']);
        if in_columns && indented {
            match parse_column(trimmed) {
                Ok(col) => {
                    if columns.iter().any(|c| c.name == col.name) {
                        diags.push(
                            Diagnostic::error(
                                codes::DUPLICATE_NAME,
                                format!("column '{}' declared twice", col.name),
                            )
                            .at_line(line),
                        );
                    } else {
                        columns.push(col);
                    }
                }
                Err((code, msg)) => diags.push(Diagnostic::error(code, msg).at_line(line)),
            }
            continue;
        }
        in_columns = false;
        if trimmed == "columns:" {
            in_columns = true;
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            diags.push(
                Diagnostic::error(
                    codes::PARSE_ERROR,
                    format!("header line must look like 'key: value', got '{}'", trimmed),
                )
                .at_line(line),
            );
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "name" => {
                if header.name.is_none() {
                    header.name = Some((value, line));
                } else {
                    diags.push(
                        Diagnostic::warning(
                            codes::DUPLICATE_NAME,
                            "header key 'name' repeated; keeping the first",
                        )
                        .at_line(line),
                    );
                }
            }
            "primaryKey" => set_or_warn(&mut header.primary_key, value, "primaryKey", line, &mut diags),
            "sortBy" => set_or_warn(&mut header.sort_by, value, "sortBy", line, &mut diags),
            "source" => set_or_warn(&mut header.source_uri, value, "source", line, &mut diags),
            "format" => set_or_warn(&mut header.format, value, "format", line, &mut diags),
            "hash" => set_or_warn(&mut header.hash, value, "hash", line, &mut diags),
            other => {
                diags.push(
                    Diagnostic::warning(
                        codes::PARSE_ERROR,
                        format!("unknown header key '{}'", other),
                    )
                    .at_line(line),
                );
            }
        }
    }

    finish_block(header, columns, row_lines, diags)
}

fn set_or_warn(
    slot: &mut Option<String>,
    value: String,
    key: &str,
    line: u32,
    diags: &mut Vec<Diagnostic>,
) {
    if slot.is_none() {
        *slot = Some(value);
    } else {
        diags.push(
            Diagnostic::warning(
                codes::DUPLICATE_NAME,
                format!("header key '{}' repeated; keeping the first", key),
            )
            .at_line(line),
        );
    }
}

fn finish_block(
    header: Header,
    columns: Vec<ColumnDef>,
    row_lines: Vec<(u32, &str)>,
    mut diags: Vec<Diagnostic>,
) -> (Option<DataTable>, Vec<Diagnostic>) {
    let missing = |what: &str| {
        Diagnostic::error(
            codes::MISSING_REQUIRED_KEY,
            format!("data block is missing '{}'", what),
        )
    };
    if header.name.is_none() {
        diags.push(missing("name:"));
    }
    if header.primary_key.is_none() {
        diags.push(missing("primaryKey:"));
    }
    if columns.is_empty() {
        diags.push(missing("columns:"));
    }
    let (Some((name, line)), Some(primary_key), false) =
        (header.name, header.primary_key, columns.is_empty())
    else {
        return (None, diags);
    };
    let mut sort_by = header.sort_by;
    if !valid_name(&name) {
        diags.push(
            Diagnostic::error(codes::PARSE_ERROR, format!("invalid table name '{}'", name))
                .at_line(line),
        );
        return (None, diags);
    }
    if !columns.iter().any(|c| c.name == primary_key) {
        diags.push(
            Diagnostic::error(
                codes::UNKNOWN_COLUMN,
                format!(
                    "primaryKey '{}' is not a declared column of '{}'",
                    primary_key, name
                ),
            )
            .at_line(line),
        );
        return (None, diags);
    }
    if let Some(sb) = &sort_by {
        if !columns.iter().any(|c| &c.name == sb) {
            diags.push(
                Diagnostic::warning(
                    codes::UNKNOWN_COLUMN,
                    format!("sortBy '{}' is not a declared column of '{}'", sb, name),
                )
                .at_line(line),
            );
            sort_by = None;
        }
    }

    let source = match header.source_uri {
        None => {
            for (slot, key) in [(&header.format, "format"), (&header.hash, "hash")] {
                if slot.is_some() {
                    diags.push(
                        Diagnostic::warning(
                            codes::INVALID_SOURCE,
                            format!("'{}:' has no effect without 'source:'", key),
                        )
                        .at_line(line),
                    );
                }
            }
            None
        }
        Some(uri) => {
            let invalid = |msg: String| Diagnostic::error(codes::INVALID_SOURCE, msg).at_line(line);
            let format = match header.format.as_deref() {
                Some("csv") => SourceFormat::Csv,
                Some("json") => SourceFormat::Json,
                Some(other) => {
                    diags.push(invalid(format!("format must be csv or json, got '{}'", other)));
                    return (None, diags);
                }
                None => {
                    diags.push(invalid("'source:' requires 'format:'".to_string()));
                    return (None, diags);
                }
            };
            let hash = match header.hash {
                Some(h) if is_sha256(&h) => h,
                Some(h) => {
                    diags.push(invalid(format!(
                        "hash '{}' must look like sha256:<64 hex digits>",
                        h
                    )));
                    return (None, diags);
                }
                None => {
                    diags.push(invalid("'source:' requires 'hash:'".to_string()));
                    return (None, diags);
                }
            };
            if !row_lines.is_empty() {
                diags.push(invalid(
                    "inline rows and 'source:' are mutually exclusive".to_string(),
                ));
                return (None, diags);
            }
            Some(ExternalSource { uri, format, hash })
        }
    };

    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    for (row_line, text) in row_lines {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => match build_row(&columns, &primary_key, &json, &mut seen) {
                Ok(rec) => rows.push(rec),
                Err((code, msg)) => diags.push(Diagnostic::error(code, msg).at_line(row_line)),
            },
            Err(err) => diags.push(
                Diagnostic::error(codes::INVALID_ROW, format!("row is not valid JSON: {}", err))
                    .at_line(row_line),
            ),
        }
    }

    let table = DataTable {
        name,
        primary_key,
        columns,
        rows,
        source,
        sort_by,
        line,
    };
    (Some(table), diags)
}

/// Shape-check externally fetched rows for a `source:` table, with the
/// same per-row rules as inline rows.
pub fn validate_external_rows(
    table: &DataTable,
    raw: &[serde_json::Value],
) -> (Vec<Record>, Vec<Diagnostic>) {
    let mut rows = Vec::new();
    let mut diags = Vec::new();
    let mut seen = HashSet::new();
    for (i, json) in raw.iter().enumerate() {
        match build_row(&table.columns, &table.primary_key, json, &mut seen) {
            Ok(rec) => rows.push(rec),
            Err((code, msg)) => diags.push(Diagnostic::error(
                code,
                format!("table '{}' row {}: {}", table.name, i, msg),
            )),
        }
    }
    (rows, diags)
}

fn parse_column(line: &str) -> Result<ColumnDef, (&'static str, String)> {
    let Some((name, ty)) = line.split_once(':') else {
        return Err((
            codes::PARSE_ERROR,
            format!("column line must look like 'name: type', got '{}'", line),
        ));
    };
    let name = name.trim();
    if !valid_name(name) {
        return Err((codes::PARSE_ERROR, format!("invalid column name '{}'", name)));
    }
    if RESERVED_KEYS.contains(&name) {
        return Err((
            codes::RESERVED_KEY,
            format!("column name '{}' is reserved", name),
        ));
    }
    let ty = InputType::parse(ty)
        .map_err(|err| (codes::INVALID_TYPE, format!("column '{}': {}", name, err)))?;
    Ok(ColumnDef {
        name: name.to_string(),
        ty,
    })
}

fn is_sha256(hash: &str) -> bool {
    hash.strip_prefix("sha256:")
        .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// One JSON row into a [`Record`]: declared columns only, cells coerced to
/// their column types, primary key present, keyable and unseen.
fn build_row(
    columns: &[ColumnDef],
    primary_key: &str,
    json: &serde_json::Value,
    seen: &mut HashSet<KeyRepr>,
) -> Result<Record, (&'static str, String)> {
    let Some(obj) = json.as_object() else {
        return Err((codes::INVALID_ROW, "row is not a JSON object".to_string()));
    };
    for key in obj.keys() {
        if !columns.iter().any(|c| &c.name == key) {
            return Err((codes::INVALID_ROW, format!("undeclared column '{}'", key)));
        }
    }
    let mut rec = Record::new();
    for col in columns {
        let Some(cell) = obj.get(&col.name) else {
            continue;
        };
        let value = json_to_value(cell)
            .and_then(|v| {
                if v.is_null() {
                    Ok(v)
                } else {
                    coerce_value(&col.ty, &v)
                }
            })
            .map_err(|e| {
                (
                    codes::INVALID_ROW,
                    format!("column '{}': {}", col.name, e.message),
                )
            })?;
        rec.insert(col.name.clone(), value).map_err(|e| {
            (
                codes::INVALID_ROW,
                format!("column '{}': {}", col.name, e.message),
            )
        })?;
    }
    let key = match rec.get(primary_key) {
        Some(cell) if !cell.is_null() => KeyRepr::from_value(cell).map_err(|e| {
            (
                codes::INVALID_ROW,
                format!("primary key '{}': {}", primary_key, e.message),
            )
        })?,
        _ => {
            return Err((
                codes::INVALID_ROW,
                format!("row has no usable '{}' primary key", primary_key),
            ))
        }
    };
    if !seen.insert(key.clone()) {
        return Err((
            codes::DUPLICATE_PRIMARY_KEY,
            format!("duplicate primary key {}", key),
        ));
    }
    Ok(rec)
}

/// JSON into runtime values. Numbers must be finite; nested objects obey
/// the reserved-key rule.
pub fn json_to_value(json: &serde_json::Value) -> Result<Value, CalcError> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            let f = n
                .as_f64()
                .filter(|f| f.is_finite())
                .ok_or_else(|| CalcError::not_finite("number"))?;
            Value::Number(f)
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::List(
            items
                .iter()
                .map(json_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_json::Value::Object(map) => {
            let mut rec = Record::new();
            for (k, v) in map {
                rec.insert(k.clone(), json_to_value(v)?)?;
            }
            Value::Record(rec)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PRODUCTS: &str = "\
name: products
primaryKey: sku
sortBy: price
columns:
  sku: string
  price: currency(USD)
  added: date
---
{\"sku\": \"A1\", \"price\": 9.5, \"added\": \"2024-01-10\"}
{\"sku\": \"B2\", \"price\": 12.0}
";

    #[test]
    fn test_parses_full_block() {
        let (table, diags) = parse_block(PRODUCTS);
        assert!(diags.is_empty(), "{:?}", diags);
        let table = table.unwrap();
        assert_eq!(table.name, "products");
        assert_eq!(table.primary_key, "sku");
        assert_eq!(table.sort_by.as_deref(), Some("price"));
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.rows.len(), 2);

        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(table.rows[0].get("added"), Some(&Value::Date(day)));
        assert_eq!(table.rows[1].get("added"), None);
    }

    #[test]
    fn test_missing_required_keys() {
        let (table, diags) = parse_block("sortBy: x\n---\n");
        assert!(table.is_none());
        let missing = diags
            .iter()
            .filter(|d| d.code == codes::MISSING_REQUIRED_KEY)
            .count();
        assert_eq!(missing, 3);
    }

    #[test]
    fn test_unknown_primary_key_rejects_table() {
        let source = "name: t\nprimaryKey: nope\ncolumns:\n  id: number\n---\n";
        let (table, diags) = parse_block(source);
        assert!(table.is_none());
        assert_eq!(diags[0].code, codes::UNKNOWN_COLUMN);
    }

    #[test]
    fn test_unknown_sort_by_warns_and_drops() {
        let source = "name: t\nprimaryKey: id\nsortBy: nope\ncolumns:\n  id: number\n---\n";
        let (table, diags) = parse_block(source);
        let table = table.unwrap();
        assert_eq!(table.sort_by, None);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, codes::UNKNOWN_COLUMN);
        assert_eq!(diags[0].severity, calcscript_core::Severity::Warning);
    }

    #[test]
    fn test_bad_rows_keep_siblings() {
        let source = "name: t\nprimaryKey: id\ncolumns:\n  id: number\n---\n\
                      {\"id\": 1}\nnot json at all\n{\"id\": 2, \"extra\": 0}\n{\"id\": 3}\n";
        let (table, diags) = parse_block(source);
        let table = table.unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.code == codes::INVALID_ROW));
        assert_eq!(diags[0].line, Some(7));
        assert!(diags[1].message.contains("undeclared column 'extra'"));
    }

    #[test]
    fn test_duplicate_primary_key_keeps_first() {
        let source = "name: t\nprimaryKey: id\ncolumns:\n  id: number\n  v: number\n---\n\
                      {\"id\": 1, \"v\": 10}\n{\"id\": 1, \"v\": 20}\n";
        let (table, diags) = parse_block(source);
        let table = table.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("v"), Some(&Value::Number(10.0)));
        assert_eq!(diags[0].code, codes::DUPLICATE_PRIMARY_KEY);
    }

    #[test]
    fn test_numeric_and_text_keys_stay_distinct() {
        let source = "name: t\nprimaryKey: id\ncolumns:\n  id: string\n---\n\
                      {\"id\": \"1\"}\n";
        let (table, diags) = parse_block(source);
        assert!(diags.is_empty());
        assert_eq!(table.unwrap().rows.len(), 1);
    }

    #[test]
    fn test_cell_type_mismatch_rejects_row() {
        let source = "name: t\nprimaryKey: id\ncolumns:\n  id: number\n  qty: number\n---\n\
                      {\"id\": 1, \"qty\": \"many\"}\n{\"id\": 2, \"qty\": null}\n";
        let (table, diags) = parse_block(source);
        let table = table.unwrap();
        // null cells pass; mistyped cells reject the row
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("qty"), Some(&Value::Null));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("column 'qty'"));
    }

    #[test]
    fn test_source_block_validation() {
        let good = "name: t\nprimaryKey: id\nsource: https://example.com/rows.json\n\
                    format: json\nhash: sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\n\
                    columns:\n  id: number\n---\n";
        let (table, diags) = parse_block(good);
        assert!(diags.is_empty(), "{:?}", diags);
        let table = table.unwrap();
        let source = table.source.unwrap();
        assert_eq!(source.format, SourceFormat::Json);
        assert!(table.rows.is_empty());

        let bad_hash = good.replace("sha256:", "md5:");
        let (table, diags) = parse_block(&bad_hash);
        assert!(table.is_none());
        assert_eq!(diags[0].code, codes::INVALID_SOURCE);

        let with_rows = format!("{}{}", good, "{\"id\": 1}\n");
        let (table, diags) = parse_block(&with_rows);
        assert!(table.is_none());
        assert!(diags[0].message.contains("mutually exclusive"));
    }

    #[test]
    fn test_external_rows_validated_like_inline() {
        let source = "name: t\nprimaryKey: id\nsource: https://example.com/r.json\nformat: json\n\
                      hash: sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\n\
                      columns:\n  id: number\n---\n";
        let (table, _) = parse_block(source);
        let table = table.unwrap();
        let raw = vec![
            serde_json::json!({"id": 1}),
            serde_json::json!({"id": 1}),
            serde_json::json!({"id": "x"}),
            serde_json::json!({"id": 2}),
        ];
        let (rows, diags) = validate_external_rows(&table, &raw);
        assert_eq!(rows.len(), 2);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].code, codes::DUPLICATE_PRIMARY_KEY);
        assert!(diags[1].message.contains("row 2"));
    }
}
