//! Flat attribute snapshot exchanged between entities and storage.

use super::entity::EntityId;
use crate::error::{PersistenceError, RepoResult};
use rusqlite::types::Value;
use std::collections::BTreeMap;

/// Identity, column values and collection members of one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    id: Option<EntityId>,
    values: BTreeMap<String, Value>,
    collections: BTreeMap<String, Vec<EntityId>>,
}

impl Record {
    pub fn new(id: Option<EntityId>) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Builder form of `set`.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.values.insert(column.to_string(), value.into());
    }

    /// Builder form of `set_collection`.
    pub fn with_collection(mut self, association: &str, ids: &[EntityId]) -> Self {
        self.set_collection(association, ids.to_vec());
        self
    }

    pub fn set_collection(&mut self, association: &str, ids: Vec<EntityId>) {
        self.collections.insert(association.to_string(), ids);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn collections(&self) -> impl Iterator<Item = (&str, &[EntityId])> {
        self.collections
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    /// Members of a collection. Missing collections read as empty.
    pub fn collection(&self, association: &str) -> Vec<EntityId> {
        self.collections
            .get(association)
            .cloned()
            .unwrap_or_default()
    }

    pub fn text(&self, column: &str) -> RepoResult<String> {
        match self.required(column)? {
            Value::Text(value) => Ok(value.clone()),
            other => Err(self.mismatch(column, "text", other)),
        }
    }

    pub fn integer(&self, column: &str) -> RepoResult<i64> {
        match self.required(column)? {
            Value::Integer(value) => Ok(*value),
            other => Err(self.mismatch(column, "integer", other)),
        }
    }

    /// Reads a nullable integer; absent and `NULL` both map to `None`.
    pub fn optional_integer(&self, column: &str) -> RepoResult<Option<i64>> {
        match self.values.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Integer(value)) => Ok(Some(*value)),
            Some(other) => Err(self.mismatch(column, "integer", other)),
        }
    }

    pub fn optional_text(&self, column: &str) -> RepoResult<Option<String>> {
        match self.values.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(value)) => Ok(Some(value.clone())),
            Some(other) => Err(self.mismatch(column, "text", other)),
        }
    }

    /// Reads a real; integer storage is widened.
    pub fn real(&self, column: &str) -> RepoResult<f64> {
        match self.required(column)? {
            Value::Real(value) => Ok(*value),
            Value::Integer(value) => Ok(*value as f64),
            other => Err(self.mismatch(column, "real", other)),
        }
    }

    fn required(&self, column: &str) -> RepoResult<&Value> {
        match self.values.get(column) {
            Some(Value::Null) | None => Err(PersistenceError::InvalidData(format!(
                "record has no value for `{column}`"
            ))
            .into()),
            Some(value) => Ok(value),
        }
    }

    fn mismatch(&self, column: &str, expected: &str, actual: &Value) -> crate::error::RepoError {
        PersistenceError::InvalidData(format!(
            "`{column}` holds {:?}, expected {expected}",
            actual.data_type()
        ))
        .into()
    }
}
