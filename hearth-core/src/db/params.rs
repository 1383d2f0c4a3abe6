//! Bound statement parameters
//!
//! Statement text and bound values are produced together: the only way to
//! obtain a `$n` placeholder is to hand over the value it stands for.

use chrono::NaiveDate;
use sqlx::postgres::PgArguments;
use sqlx::Arguments;
use uuid::Uuid;

/// A value bound to a positional placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i32),
    Float(f64),
    Date(NaiveDate),
    Uuid(Uuid),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

/// Ordered parameter list handing out matching placeholders
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    values: Vec<SqlValue>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` and return its placeholder.
    pub fn push(&mut self, value: impl Into<SqlValue>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// Encode values, in order, into driver arguments.
pub fn to_arguments(values: &[SqlValue]) -> Result<PgArguments, sqlx::Error> {
    let mut args = PgArguments::default();
    for value in values {
        let added = match value {
            SqlValue::Text(v) => Arguments::add(&mut args, v.clone()),
            SqlValue::Int(v) => Arguments::add(&mut args, *v),
            SqlValue::Float(v) => Arguments::add(&mut args, *v),
            SqlValue::Date(v) => Arguments::add(&mut args, *v),
            SqlValue::Uuid(v) => Arguments::add(&mut args, *v),
        };
        added.map_err(sqlx::Error::Encode)?;
    }
    Ok(args)
}

/// `SET` list of an `UPDATE` holding only the columns actually supplied.
#[derive(Debug, Default)]
pub struct SetClause {
    bindings: Bindings,
    assignments: Vec<String>,
}

impl SetClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `column = $n` when `value` is present; absent values are skipped.
    pub fn set<V: Into<SqlValue>>(&mut self, column: &'static str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            let placeholder = self.bindings.push(value);
            self.assignments.push(format!("{} = {}", column, placeholder));
        }
        self
    }

    /// Columns that will be written, in the order they were set.
    pub fn columns(&self) -> Vec<&str> {
        self.assignments
            .iter()
            .filter_map(|a| a.split(" = ").next())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Render `UPDATE <table> SET ..., updated_at = NOW() WHERE id = $n`.
    ///
    /// `updated_at` is always refreshed, so an empty clause still touches the row.
    pub fn into_update(mut self, table: &str, id: Uuid, returning: &str) -> (String, Vec<SqlValue>) {
        self.assignments.push("updated_at = NOW()".to_owned());
        let id_placeholder = self.bindings.push(id);
        let sql = format!(
            "UPDATE {} SET {} WHERE id = {} RETURNING {}",
            table,
            self.assignments.join(", "),
            id_placeholder,
            returning
        );
        (sql, self.bindings.into_values())
    }
}
