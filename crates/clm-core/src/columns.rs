//! Writable contract columns and typed patch values.
//!
//! Update and filter SQL is assembled only from `ContractColumn` names, never
//! from caller-supplied keys. A patch is parsed against this allowlist before
//! any store sees it.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ClmError;

/// SQL type family of a writable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Date,
    Decimal,
    TextArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractColumn {
    ContractNumber,
    Title,
    Description,
    CounterpartyName,
    CounterpartyEmail,
    CounterpartyAddress,
    OwnerUserId,
    OwnerDepartment,
    Status,
    Type,
    Category,
    EffectiveDate,
    ExpirationDate,
    ContractValue,
    Currency,
    PaymentTerms,
    Tags,
}

impl ContractColumn {
    pub const WRITABLE: [ContractColumn; 17] = [
        Self::ContractNumber,
        Self::Title,
        Self::Description,
        Self::CounterpartyName,
        Self::CounterpartyEmail,
        Self::CounterpartyAddress,
        Self::OwnerUserId,
        Self::OwnerDepartment,
        Self::Status,
        Self::Type,
        Self::Category,
        Self::EffectiveDate,
        Self::ExpirationDate,
        Self::ContractValue,
        Self::Currency,
        Self::PaymentTerms,
        Self::Tags,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContractNumber => "contract_number",
            Self::Title => "title",
            Self::Description => "description",
            Self::CounterpartyName => "counterparty_name",
            Self::CounterpartyEmail => "counterparty_email",
            Self::CounterpartyAddress => "counterparty_address",
            Self::OwnerUserId => "owner_user_id",
            Self::OwnerDepartment => "owner_department",
            Self::Status => "status",
            Self::Type => "type",
            Self::Category => "category",
            Self::EffectiveDate => "effective_date",
            Self::ExpirationDate => "expiration_date",
            Self::ContractValue => "contract_value",
            Self::Currency => "currency",
            Self::PaymentTerms => "payment_terms",
            Self::Tags => "tags",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::WRITABLE.into_iter().find(|c| c.as_str() == key)
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Self::EffectiveDate | Self::ExpirationDate => ColumnKind::Date,
            Self::ContractValue => ColumnKind::Decimal,
            Self::Tags => ColumnKind::TextArray,
            _ => ColumnKind::Text,
        }
    }

    /// Columns declared NOT NULL in the schema.
    pub fn required(self) -> bool {
        matches!(
            self,
            Self::Title
                | Self::CounterpartyName
                | Self::OwnerUserId
                | Self::Status
                | Self::Type
                | Self::Currency
        )
    }
}

impl std::fmt::Display for ContractColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed value destined for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Decimal(Option<Decimal>),
    TextArray(Vec<String>),
}

/// A validated partial update: one entry per allowlisted column present in
/// the request body, in column-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractPatch {
    changes: Vec<(ContractColumn, FieldValue)>,
}

impl ContractPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: ContractColumn, value: FieldValue) -> Self {
        self.changes.retain(|(c, _)| *c != column);
        self.changes.push((column, value));
        self
    }

    /// Parse a JSON object body. `id` is ignored; any other key outside the
    /// allowlist, or a value of the wrong shape, is rejected.
    pub fn from_json(body: &Value) -> Result<Self, ClmError> {
        let object = body.as_object().ok_or_else(|| {
            ClmError::InvalidInput("Request body must be a JSON object".to_string())
        })?;
        Self::from_map(object)
    }

    pub fn from_map(object: &Map<String, Value>) -> Result<Self, ClmError> {
        let mut changes = Vec::with_capacity(object.len());
        let mut problems = Vec::new();

        for (key, value) in object {
            if key == "id" {
                continue;
            }
            let Some(column) = ContractColumn::from_key(key) else {
                problems.push(format!("Unknown field '{key}'"));
                continue;
            };
            match parse_value(column, value) {
                Ok(v) => changes.push((column, v)),
                Err(msg) => problems.push(msg),
            }
        }

        if !problems.is_empty() {
            return Err(ClmError::InvalidInput(problems.join("; ")));
        }
        Ok(Self { changes })
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[(ContractColumn, FieldValue)] {
        &self.changes
    }

    /// JSON form recorded in the UPDATE audit entry. Amounts are written
    /// as JSON numbers, matching the request body.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (column, value) in &self.changes {
            let json = match value {
                FieldValue::Decimal(Some(d)) => decimal_to_json(d),
                other => serde_json::to_value(other).unwrap_or(Value::Null),
            };
            map.insert(column.as_str().to_string(), json);
        }
        Value::Object(map)
    }
}

fn decimal_to_json(value: &Decimal) -> Value {
    serde_json::from_str::<serde_json::Number>(&value.to_string())
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(value.to_string()))
}

fn parse_value(column: ContractColumn, value: &Value) -> Result<FieldValue, String> {
    if value.is_null() && column.required() {
        return Err(format!("'{column}' cannot be null"));
    }

    match column.kind() {
        ColumnKind::Text => match value {
            Value::Null => Ok(FieldValue::Text(None)),
            Value::String(s) if column.required() && s.trim().is_empty() => {
                Err(format!("'{column}' cannot be empty"))
            }
            Value::String(s) => Ok(FieldValue::Text(Some(s.clone()))),
            _ => Err(format!("'{column}' must be a string")),
        },
        ColumnKind::Date => match value {
            Value::Null => Ok(FieldValue::Date(None)),
            Value::String(s) => parse_date(s)
                .map(|d| FieldValue::Date(Some(d)))
                .ok_or_else(|| format!("Invalid {}", column.as_str().replace('_', " "))),
            _ => Err(format!("Invalid {}", column.as_str().replace('_', " "))),
        },
        ColumnKind::Decimal => match value {
            Value::Null => Ok(FieldValue::Decimal(None)),
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .map(|d| FieldValue::Decimal(Some(d)))
                .map_err(|_| format!("'{column}' must be a number")),
            Value::String(s) => Decimal::from_str(s.trim())
                .map(|d| FieldValue::Decimal(Some(d)))
                .map_err(|_| format!("'{column}' must be a number")),
            _ => Err(format!("'{column}' must be a number")),
        },
        ColumnKind::TextArray => match value {
            Value::Null => Ok(FieldValue::TextArray(Vec::new())),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| format!("'{column}' must be an array of strings"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::TextArray),
            _ => Err(format!("'{column}' must be an array of strings")),
        },
    }
}

/// Accepts `YYYY-MM-DD`, and full RFC 3339 timestamps truncated to the date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.date_naive())
    })
}
