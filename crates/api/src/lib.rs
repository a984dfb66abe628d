//! Serde-friendly request/response types for embedding a [`Session`] behind
//! a network or CLI boundary.
//!
//! This crate adds no new behavior over `packagevars-engine` — every
//! function here is a thin conversion layer between this crate's DTOs and
//! the callable surface's native types, following the same desugar-to-one-
//! call discipline the teacher's facade layer uses.

#![warn(missing_docs)]
#![warn(clippy::all)]

use packagevars_core::{type_ids, KeyArray, PgVarsError, Result, Row, TypeId, Value};
use packagevars_engine::Session;
use serde::{Deserialize, Serialize};

/// Wire-friendly mirror of [`Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ValueDto {
    /// A typed null. `type_id` defaults to [`type_ids::UNKNOWN`] if omitted.
    Null {
        /// Declared type of the null.
        #[serde(default = "default_unknown_type")]
        type_id: TypeId,
    },
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

fn default_unknown_type() -> TypeId {
    type_ids::UNKNOWN
}

impl From<Value> for ValueDto {
    fn from(v: Value) -> Self {
        match v {
            Value::Null(type_id) => ValueDto::Null { type_id },
            Value::Bool(b) => ValueDto::Bool(b),
            Value::Int(i) => ValueDto::Int(i),
            Value::Float(f) => ValueDto::Float(f),
            Value::Text(s) => ValueDto::Text(s),
            Value::Bytes(b) => ValueDto::Bytes(b),
        }
    }
}

impl From<ValueDto> for Value {
    fn from(v: ValueDto) -> Self {
        match v {
            ValueDto::Null { type_id } => Value::Null(type_id),
            ValueDto::Bool(b) => Value::Bool(b),
            ValueDto::Int(i) => Value::Int(i),
            ValueDto::Float(f) => Value::Float(f),
            ValueDto::Text(s) => Value::Text(s),
            ValueDto::Bytes(b) => Value::Bytes(b),
        }
    }
}

/// Wire-friendly mirror of [`Row`]: the first element is the row's key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDto {
    /// Column values, in order.
    pub values: Vec<ValueDto>,
}

impl From<Row> for RowDto {
    fn from(row: Row) -> Self {
        RowDto {
            values: row.values.into_iter().map(ValueDto::from).collect(),
        }
    }
}

impl From<RowDto> for Row {
    fn from(dto: RowDto) -> Self {
        Row::new(dto.values.into_iter().map(Value::from).collect())
    }
}

/// Request body for `set scalar`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetScalarRequest {
    /// Owning package name, created on first use.
    pub package: String,
    /// Variable name.
    pub name: String,
    /// New value; omitted means an untyped null.
    pub value: Option<ValueDto>,
    /// Whether the variable obeys commit/rollback semantics.
    #[serde(default)]
    pub is_transactional: bool,
}

/// Request body for `get scalar`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetScalarRequest {
    /// Owning package name.
    pub package: String,
    /// Variable name.
    pub name: String,
    /// Fail rather than return `None` if the variable does not exist.
    #[serde(default)]
    pub strict: bool,
}

/// Response body for `get scalar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetScalarResponse {
    /// The stored value, or `None` if not found and not `strict`.
    pub value: Option<ValueDto>,
}

/// Request body for `insert row` / `update row`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRequest {
    /// Owning package name.
    pub package: String,
    /// Variable name.
    pub name: String,
    /// The row to insert or update.
    pub row: RowDto,
    /// Whether the variable obeys commit/rollback semantics. Ignored by
    /// `update row`, which never creates the variable.
    #[serde(default)]
    pub is_transactional: bool,
}

/// Request body for `delete row`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRowRequest {
    /// Owning package name.
    pub package: String,
    /// Variable name.
    pub name: String,
    /// Key of the row to delete; `None` deletes the row keyed by null.
    pub key: Option<ValueDto>,
}

/// Request body for `select row by key` / `select rows by keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectByKeyRequest {
    /// Owning package name.
    pub package: String,
    /// Variable name.
    pub name: String,
    /// Lookup key(s).
    pub keys: Vec<ValueDto>,
}

/// One variable's summary entry, mirroring `packagevars_store::VariableSummary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSummaryDto {
    /// Variable name.
    pub name: String,
    /// True if the variable holds a keyed row set.
    pub is_record: bool,
    /// True if the variable is transactional.
    pub is_transactional: bool,
}

/// One package's summary entry, mirroring `packagevars_store::PackageSummary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSummaryDto {
    /// Package name.
    pub name: String,
    /// Its live variables.
    pub variables: Vec<VariableSummaryDto>,
}

impl From<packagevars_store::PackageSummary> for PackageSummaryDto {
    fn from(p: packagevars_store::PackageSummary) -> Self {
        PackageSummaryDto {
            name: p.name,
            variables: p
                .variables
                .into_iter()
                .map(|v| VariableSummaryDto {
                    name: v.name,
                    is_record: v.is_record,
                    is_transactional: v.is_transactional,
                })
                .collect(),
        }
    }
}

/// Apply a [`SetScalarRequest`] to a session.
pub fn set_scalar(session: &mut Session, req: SetScalarRequest) -> Result<()> {
    session.set_scalar(&req.package, &req.name, req.value.map(Value::from), req.is_transactional)
}

/// Apply a [`GetScalarRequest`] to a session.
pub fn get_scalar(session: &Session, req: GetScalarRequest) -> Result<GetScalarResponse> {
    let value = session.get_scalar(&req.package, &req.name, None, req.strict)?;
    Ok(GetScalarResponse { value: value.map(ValueDto::from) })
}

/// Apply a [`RowRequest`] to a session's `insert row`.
pub fn insert_row(session: &mut Session, req: RowRequest) -> Result<()> {
    session.insert_row(&req.package, &req.name, Row::from(req.row), req.is_transactional)
}

/// Apply a [`RowRequest`] to a session's `update row`.
pub fn update_row(session: &mut Session, req: RowRequest) -> Result<bool> {
    session.update_row(&req.package, &req.name, Row::from(req.row))
}

/// Apply a [`DeleteRowRequest`] to a session.
pub fn delete_row(session: &mut Session, req: DeleteRowRequest) -> Result<bool> {
    session.delete_row(&req.package, &req.name, req.key.map(Value::from))
}

/// Apply a [`SelectByKeyRequest`] to a session's `select row by key`.
/// Only the first key is considered.
pub fn select_row_by_key(session: &Session, req: SelectByKeyRequest) -> Result<Option<RowDto>> {
    let key = req
        .keys
        .into_iter()
        .next()
        .map(Value::from)
        .ok_or_else(|| PgVarsError::InvalidParameter("select row by key requires exactly one key".to_string()))?;
    Ok(session.select_row_by_key(&req.package, &req.name, &key)?.map(RowDto::from))
}

/// Apply a [`SelectByKeyRequest`] to a session's `select rows by keys`,
/// eagerly collecting the lazy cursor into a `Vec` for the wire.
pub fn select_rows_by_keys(session: &mut Session, req: SelectByKeyRequest) -> Result<Vec<RowDto>> {
    let keys = KeyArray::Flat(req.keys.into_iter().map(Value::from).collect());
    let cursor = session.select_rows_by_keys(&req.package, &req.name, keys)?;
    Ok(cursor.map(RowDto::from).collect())
}

/// List every package and its live variables.
pub fn list_packages_and_variables(session: &mut Session) -> Vec<PackageSummaryDto> {
    session.list_packages_and_variables().into_iter().map(PackageSummaryDto::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use packagevars_store::StoreConfig;

    #[test]
    fn set_then_get_scalar_round_trips_through_dtos() {
        let mut session = Session::new(StoreConfig::default());
        set_scalar(
            &mut session,
            SetScalarRequest {
                package: "p".into(),
                name: "x".into(),
                value: Some(ValueDto::Int(5)),
                is_transactional: true,
            },
        )
        .unwrap();
        let resp = get_scalar(
            &session,
            GetScalarRequest {
                package: "p".into(),
                name: "x".into(),
                strict: true,
            },
        )
        .unwrap();
        assert_eq!(resp.value, Some(ValueDto::Int(5)));
    }

    #[test]
    fn insert_then_select_row_by_key_round_trips() {
        let mut session = Session::new(StoreConfig::default());
        insert_row(
            &mut session,
            RowRequest {
                package: "p".into(),
                name: "t".into(),
                row: RowDto {
                    values: vec![ValueDto::Int(1), ValueDto::Text("a".into())],
                },
                is_transactional: true,
            },
        )
        .unwrap();
        let row = select_row_by_key(
            &session,
            SelectByKeyRequest {
                package: "p".into(),
                name: "t".into(),
                keys: vec![ValueDto::Int(1)],
            },
        )
        .unwrap();
        assert_eq!(row, Some(RowDto { values: vec![ValueDto::Int(1), ValueDto::Text("a".into())] }));
    }
}
