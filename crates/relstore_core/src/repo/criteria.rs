//! Equality criteria with association aliases.
//!
//! # Responsibility
//! - Collect a conjunction of equality restrictions over an entity's own
//!   attributes or over aliased associations (`alias.attribute`).
//! - Compile the criteria against a descriptor into one SELECT statement.
//!
//! # Invariants
//! - Compilation validates every alias and attribute; unknown names are
//!   `ConfigurationError`s, never empty results.
//! - Compiled SQL only interpolates validated identifiers; values are bound.
//! - Nothing is cached: each call compiles afresh.

use crate::error::{ConfigurationError, RepoResult};
use crate::model::descriptor::ensure_identifier;
use crate::model::{AssociationKind, AttributeLocation, EntityDescriptor};
use rusqlite::types::Value;
use std::collections::BTreeMap;

const ROOT_ALIAS: &str = "e0";

/// Conjunction of equality restrictions, built fluently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    aliases: Vec<AliasSpec>,
    restrictions: Vec<Restriction>,
    max_results: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
struct AliasSpec {
    association: String,
    alias: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Restriction {
    path: String,
    value: Value,
}

/// SELECT statement plus its bound values and selected attribute order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<Value>,
    /// Attribute names in select order; the identity is always first.
    pub selection: Vec<&'static str>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins `association` under `alias` so restrictions can use
    /// `alias.attribute` paths.
    pub fn create_alias(mut self, association: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.push(AliasSpec {
            association: association.into(),
            alias: alias.into(),
        });
        self
    }

    /// Adds `path = value`. A `NULL` value compiles to `IS NULL`.
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.restrictions.push(Restriction {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn max_results(mut self, limit: u32) -> Self {
        self.max_results = Some(limit);
        self
    }

    pub(crate) fn compile(&self, descriptor: &'static EntityDescriptor) -> RepoResult<CompiledQuery> {
        descriptor.validate()?;

        let (select_list, selection) = select_list(descriptor, ROOT_ALIAS);
        let mut sql = format!(
            "SELECT {}{} FROM {} {ROOT_ALIAS}",
            if self.aliases.is_empty() { "" } else { "DISTINCT " },
            select_list.join(", "),
            descriptor.mapping,
        );
        if let Some(shared) = descriptor.shared {
            sql.push_str(&format!(
                " INNER JOIN {} {ROOT_ALIAS}_s ON {ROOT_ALIAS}_s.{} = {ROOT_ALIAS}.{}",
                shared.mapping, shared.identity, descriptor.identity
            ));
        }

        // Alias names never reach the SQL; joined tables are numbered.
        let mut joined: BTreeMap<&str, (String, &'static EntityDescriptor)> = BTreeMap::new();
        for (index, spec) in self.aliases.iter().enumerate() {
            ensure_identifier(&spec.alias)?;
            let association = descriptor.association(&spec.association)?;
            let related = association.related_descriptor();
            ensure_identifier(related.mapping)?;
            ensure_identifier(related.identity)?;
            let table = format!("a{}", index + 1);
            if joined
                .insert(spec.alias.as_str(), (table.clone(), related))
                .is_some()
            {
                return Err(ConfigurationError::DuplicateAlias(spec.alias.clone()).into());
            }

            match association.kind {
                AssociationKind::ManyToOne { foreign_key }
                | AssociationKind::OneToOne { foreign_key } => sql.push_str(&format!(
                    " INNER JOIN {} {table} ON {table}.{} = {ROOT_ALIAS}.{foreign_key}",
                    related.mapping, related.identity
                )),
                AssociationKind::OneToMany { foreign_key } => sql.push_str(&format!(
                    " INNER JOIN {} {table} ON {table}.{foreign_key} = {ROOT_ALIAS}.{}",
                    related.mapping, descriptor.identity
                )),
                AssociationKind::ManyToMany {
                    join_table,
                    owner_column,
                    related_column,
                } => sql.push_str(&format!(
                    " INNER JOIN {join_table} {table}_link ON {table}_link.{owner_column} = {ROOT_ALIAS}.{} \
                     INNER JOIN {} {table} ON {table}.{} = {table}_link.{related_column}",
                    descriptor.identity, related.mapping, related.identity
                )),
            }
            if let Some(shared) = related.shared {
                ensure_identifier(shared.mapping)?;
                sql.push_str(&format!(
                    " INNER JOIN {} {table}_s ON {table}_s.{} = {table}.{}",
                    shared.mapping, shared.identity, related.identity
                ));
            }
        }

        let mut clauses = Vec::with_capacity(self.restrictions.len());
        let mut binds = Vec::with_capacity(self.restrictions.len());
        for restriction in &self.restrictions {
            let column = match restriction.path.split_once('.') {
                None => qualify(descriptor, ROOT_ALIAS, &restriction.path)?,
                Some((alias, attribute)) => {
                    let (table, related) = joined
                        .get(alias)
                        .ok_or_else(|| ConfigurationError::UnknownAlias(alias.to_string()))?;
                    qualify(related, table, attribute)?
                }
            };
            if restriction.value == Value::Null {
                clauses.push(format!("{column} IS NULL"));
            } else {
                clauses.push(format!("{column} = ?"));
                binds.push(restriction.value.clone());
            }
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY {ROOT_ALIAS}.{}", descriptor.identity));
        if let Some(limit) = self.max_results {
            sql.push_str(" LIMIT ?");
            binds.push(Value::Integer(i64::from(limit)));
        }
        sql.push(';');

        Ok(CompiledQuery {
            sql,
            binds,
            selection,
        })
    }
}

/// Identity first, then own columns, then shared-fragment columns.
pub(crate) fn select_list(
    descriptor: &'static EntityDescriptor,
    table: &str,
) -> (Vec<String>, Vec<&'static str>) {
    let mut expressions = vec![format!("{table}.{}", descriptor.identity)];
    let mut names = vec![descriptor.identity];
    for column in descriptor.columns {
        expressions.push(format!("{table}.{}", column.name));
        names.push(column.name);
    }
    if let Some(shared) = descriptor.shared {
        for column in shared.columns {
            expressions.push(format!("{table}_s.{}", column.name));
            names.push(column.name);
        }
    }
    (expressions, names)
}

fn qualify(descriptor: &EntityDescriptor, table: &str, attribute: &str) -> RepoResult<String> {
    match descriptor.locate(attribute) {
        Some(AttributeLocation::Identity) => Ok(format!("{table}.{}", descriptor.identity)),
        Some(AttributeLocation::Own(column)) => Ok(format!("{table}.{}", column.name)),
        Some(AttributeLocation::Shared(column)) => Ok(format!("{table}_s.{}", column.name)),
        None => Err(ConfigurationError::UnknownAttribute {
            mapping: descriptor.mapping,
            attribute: attribute.to_string(),
        }
        .into()),
    }
}
