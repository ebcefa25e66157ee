use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::SqlScopeError;
use crate::types::RowValues;

pub(crate) type ColumnIndex = Arc<HashMap<String, usize>>;

pub(crate) fn build_column_index(column_names: &[String]) -> ColumnIndex {
    Arc::new(
        column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>(),
    )
}

/// A row keyed by column name, in column order.
///
/// Rows produced by one query share their column names and lookup index, so cloning
/// a `Record` or collecting many of them does not copy the header.
///
/// Two lookups are offered. [`Record::field`] distinguishes "no such field" (an
/// error) from "field present but NULL" (`Ok(&RowValues::Null)`); [`Record::get`] is
/// the plain `Option` form.
#[derive(Debug, Clone, Default)]
pub struct Record {
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    column_index: ColumnIndex,
}

impl Record {
    /// Create a record from column names and values.
    ///
    /// Names and values are paired up positionally; extra entries on either side are
    /// dropped.
    #[must_use]
    pub fn new(mut column_names: Arc<Vec<String>>, mut values: Vec<RowValues>) -> Self {
        if values.len() > column_names.len() {
            values.truncate(column_names.len());
        } else if values.len() < column_names.len() {
            Arc::make_mut(&mut column_names).truncate(values.len());
        }
        let column_index = build_column_index(&column_names);
        Self {
            column_names,
            values,
            column_index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: ColumnIndex,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Build a record from `(name, value)` pairs. A repeated name keeps its first
    /// position and its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RowValues>,
    {
        let mut record = Record::default();
        for (name, value) in pairs {
            record.set(name, value);
        }
        record
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index.get(column_name) {
            return Some(idx);
        }

        // Fall back to linear search
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Look up a field by name.
    ///
    /// # Errors
    /// Returns [`SqlScopeError::FieldNotFound`] when the record has no such column.
    /// A column holding NULL is `Ok(&RowValues::Null)`.
    pub fn field(&self, column_name: &str) -> Result<&RowValues, SqlScopeError> {
        self.get(column_name)
            .ok_or_else(|| SqlScopeError::FieldNotFound(column_name.to_string()))
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Set a field. An existing field keeps its position; a new one is appended.
    pub fn set(&mut self, column_name: impl Into<String>, value: impl Into<RowValues>) {
        let column_name = column_name.into();
        let value = value.into();
        if let Some(idx) = self.column_index(&column_name) {
            self.values[idx] = value;
            return;
        }
        Arc::make_mut(&mut self.column_names).push(column_name.clone());
        Arc::make_mut(&mut self.column_index).insert(column_name, self.values.len());
        self.values.push(value);
    }

    #[must_use]
    pub fn contains(&self, column_name: &str) -> bool {
        self.column_index(column_name).is_some()
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Build a [`Record`] from `name => value` pairs.
///
/// ```rust
/// use sql_scope::record;
///
/// let user = record! { "id" => 1, "name" => "Alice" };
/// assert_eq!(user.columns(), ["id", "name"]);
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::default()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::default();
        $(record.set($name, $value);)+
        record
    }};
}
