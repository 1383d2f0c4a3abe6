//! Search/filter predicate construction for property listings
//!
//! Each present filter contributes exactly one `AND <column> <op> $n` clause
//! plus its bound value; absent filters contribute nothing. Clauses are
//! emitted in field declaration order so text and parameters stay aligned.

use serde::{Deserialize, Serialize};

use super::params::{Bindings, SqlValue};
use crate::models::{status, ValidationError};

/// Filters as received from a query string: every value is raw text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyFilterParams {
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "minPrice", alias = "min_price")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice", alias = "max_price")]
    pub max_price: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub city: Option<String>,
}

/// Typed, validated filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilters {
    pub property_type: Option<String>,
    pub status: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<i32>,
    pub min_bathrooms: Option<f64>,
    /// Case-insensitive substring of the city
    pub city: Option<String>,
    pub owner_email: Option<String>,
}

impl TryFrom<PropertyFilterParams> for PropertyFilters {
    type Error = ValidationError;

    fn try_from(params: PropertyFilterParams) -> Result<Self, Self::Error> {
        Ok(Self {
            property_type: text(params.property_type),
            status: text(params.status),
            min_price: number("minPrice", params.min_price)?,
            max_price: number("maxPrice", params.max_price)?,
            min_bedrooms: number("bedrooms", params.bedrooms)?,
            min_bathrooms: number("bathrooms", params.bathrooms)?,
            city: text(params.city),
            owner_email: None,
        })
    }
}

fn text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn number<T: std::str::FromStr>(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ValidationError> {
    match text(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::NotNumeric { field, value: raw }),
    }
}

impl PropertyFilters {
    pub fn published() -> Self {
        Self {
            status: Some(status::PUBLISHED.to_owned()),
            ..Self::default()
        }
    }

    pub fn owned_by(email: impl Into<String>) -> Self {
        Self {
            owner_email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Render the `WHERE` predicate for the `properties p` alias.
    pub fn predicate(&self) -> Predicate {
        FilterBuilder::new()
            .eq("p.property_type", self.property_type.clone())
            .eq("p.status", self.status.clone())
            .gte("p.price", self.min_price)
            .lte("p.price", self.max_price)
            .gte("p.bedrooms", self.min_bedrooms)
            .gte("p.bathrooms", self.min_bathrooms)
            .contains("p.city", self.city.as_deref())
            .eq_ignore_case("p.owner_email", self.owner_email.clone())
            .build()
    }
}

/// Accumulates `(clause, bound value)` pairs and renders them in one pass.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    bindings: Bindings,
    clauses: Vec<String>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push<V: Into<SqlValue>>(mut self, column: &'static str, op: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            let placeholder = self.bindings.push(value);
            self.clauses
                .push(format!("AND {} {} {}", column, op, placeholder));
        }
        self
    }

    pub fn eq<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        self.push(column, "=", value)
    }

    pub fn gte<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        self.push(column, ">=", value)
    }

    pub fn lte<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        self.push(column, "<=", value)
    }

    /// Case-insensitive substring match; LIKE wildcards in the input are escaped.
    pub fn contains(self, column: &'static str, value: Option<&str>) -> Self {
        let pattern = value.map(|v| format!("%{}%", escape_like(v)));
        self.push(column, "ILIKE", pattern)
    }

    pub fn eq_ignore_case(mut self, column: &'static str, value: Option<String>) -> Self {
        if let Some(value) = value {
            let placeholder = self.bindings.push(value);
            self.clauses
                .push(format!("AND LOWER({}) = LOWER({})", column, placeholder));
        }
        self
    }

    pub fn build(self) -> Predicate {
        let mut sql = String::from("WHERE 1=1");
        for clause in &self.clauses {
            sql.push(' ');
            sql.push_str(clause);
        }
        Predicate {
            sql,
            params: self.bindings.into_values(),
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Rendered predicate and its parameters, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    sql: String,
    params: Vec<SqlValue>,
}

impl Predicate {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}
