use std::{collections::HashMap, fmt, io};

use crate::errors::Result;

/// Column order of the gradient-boosting feature table.
pub const FEATURE_COLUMNS: [&str; 22] = [
    // identifiers
    "changeset_id",
    "obj_id",
    // meta
    "object_type",
    "version_count",
    "is_delete",
    "is_create",
    "is_modify",
    "last_modified_time",
    "created_time",
    // tags
    "tag_count",
    "tag_add_count",
    "tag_remove_count",
    "tag_modify_count",
    "name_changed",
    // geometry
    "length_change_ratio",
    "area_change_ratio",
    "node_count_change",
    "centroid_shift",
    // changeset context
    "changeset_size",
    "user_edit_count",
    "user_object_diversity",
    "time_gap_prev",
];

/// A feature as computed, before sanitization.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl FeatureValue {
    fn to_numeric(&self) -> Option<Numeric> {
        match self {
            FeatureValue::Int(value) => Some(Numeric::Int(*value)),
            FeatureValue::Float(value) => Some(Numeric::Float(*value)),
            FeatureValue::Text(text) => {
                let text = text.trim();
                text.parse::<i64>()
                    .map(Numeric::Int)
                    .or_else(|_| text.parse::<f64>().map(Numeric::Float))
                    .ok()
            }
            FeatureValue::Missing => None,
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Int(value)
    }
}

impl From<u64> for FeatureValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(FeatureValue::Missing, FeatureValue::Int)
    }
}

impl From<usize> for FeatureValue {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(FeatureValue::Missing, FeatureValue::Int)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Int(i64::from(value))
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Float(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

/// A sanitized cell. Always finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    pub fn as_f64(&self) -> f64 {
        match self {
            Numeric::Int(value) => *value as f64,
            Numeric::Float(value) => *value,
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Int(value) => write!(f, "{}", value),
            Numeric::Float(value) => write!(f, "{}", value),
        }
    }
}

/// Named features of one record. Columns may be missing or hold garbage until sanitized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    values: HashMap<String, FeatureValue>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, value: impl Into<FeatureValue>) {
        self.values.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.values.get(column)
    }

    /// Projects the row onto `columns`. Absent, non-numeric and non-finite values all become 0.
    pub fn sanitize(&self, columns: &[&str]) -> Vec<Numeric> {
        columns
            .iter()
            .map(|column| {
                match self.values.get(*column).and_then(FeatureValue::to_numeric) {
                    Some(Numeric::Float(value)) if !value.is_finite() => Numeric::Int(0),
                    Some(numeric) => numeric,
                    None => Numeric::Int(0),
                }
            })
            .collect()
    }
}

/// A fixed-column, fully numeric table.
#[derive(Debug, Clone)]
pub struct Table {
    columns: &'static [&'static str],
    rows: Vec<Vec<Numeric>>,
}

impl Table {
    pub fn new(columns: &'static [&'static str]) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: &FeatureRow) {
        self.rows.push(row.sanitize(self.columns));
    }

    pub fn columns(&self) -> &[&'static str] {
        self.columns
    }

    pub fn rows(&self) -> &[Vec<Numeric>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<Numeric> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|values| values[idx])
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|value| value.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 4] = ["a", "b", "c", "d"];

    #[test]
    fn every_bad_column_becomes_zero() {
        let mut row = FeatureRow::new();
        row.set("a", "not a number");
        row.set("b", f64::INFINITY);
        row.set("d", f64::NEG_INFINITY);
        // "c" is missing entirely

        let sanitized = row.sanitize(&COLUMNS);
        assert_eq!(sanitized, vec![Numeric::Int(0); 4]);
    }

    #[test]
    fn nan_missing_and_text_become_zero() {
        let mut row = FeatureRow::new();
        row.set("a", f64::NAN);
        row.set("b", FeatureValue::Missing);
        row.set("c", "nan");
        row.set("d", "cs-7");

        assert_eq!(row.sanitize(&COLUMNS), vec![Numeric::Int(0); 4]);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let mut row = FeatureRow::new();
        row.set("a", "12");
        row.set("b", " 2.5 ");
        row.set("c", 7_i64);
        row.set("d", 1.1e8);

        assert_eq!(
            row.sanitize(&COLUMNS),
            vec![Numeric::Int(12), Numeric::Float(2.5), Numeric::Int(7), Numeric::Float(1.1e8)]
        );
    }

    #[test]
    fn csv_has_header_and_fixed_order() {
        let mut table = Table::new(&COLUMNS);
        let mut row = FeatureRow::new();
        row.set("d", 4_i64);
        row.set("a", 1_i64);
        row.set("b", 0.5);
        table.push(&row);

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b,c,d\n1,0.5,0,4\n");
    }
}
