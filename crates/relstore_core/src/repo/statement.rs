//! SQL statements issued by the gateway inside one unit of work.
//!
//! # Responsibility
//! - Translate records into INSERT/UPDATE/DELETE against own and shared
//!   tables, and link collection members.
//! - Materialize query rows into records with eager collections.
//!
//! # Invariants
//! - Callers validate descriptors and records before invoking writers.
//! - Shared-fragment rows are inserted first and deleted last; both rows
//!   carry the same identity.
//! - Collection sync only adds many-to-many links; it never removes existing
//!   ones and never rewrites one-to-many foreign keys.

use super::criteria::CompiledQuery;
use crate::db::schema::table_exists;
use crate::error::{ConfigurationError, PersistenceError, RepoResult};
use crate::model::descriptor::ensure_identifier;
use crate::model::{AssociationKind, AttributeLocation, Column, EntityDescriptor, EntityId, Record};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

/// Checks a record against its descriptor before any storage call.
///
/// # Errors
/// - `ConfigurationError::UnknownAttribute` for undeclared values.
/// - `ConfigurationError::NotACollection` / `UnknownAssociation` for bad
///   collection names.
/// - `PersistenceError::MissingAttribute` for null required columns.
pub(crate) fn check_record(descriptor: &'static EntityDescriptor, record: &Record) -> RepoResult<()> {
    for (name, _) in record.values() {
        match descriptor.locate(name) {
            Some(AttributeLocation::Own(_)) | Some(AttributeLocation::Shared(_)) => {}
            Some(AttributeLocation::Identity) | None => {
                return Err(ConfigurationError::UnknownAttribute {
                    mapping: descriptor.mapping,
                    attribute: name.to_string(),
                }
                .into());
            }
        }
    }

    for (name, _) in record.collections() {
        let association = descriptor.association(name)?;
        if !association.kind.is_collection() {
            return Err(ConfigurationError::NotACollection {
                mapping: descriptor.mapping,
                association: name.to_string(),
            }
            .into());
        }
        let related = association.related_descriptor();
        ensure_identifier(related.mapping)?;
        ensure_identifier(related.identity)?;
    }

    let shared_columns = descriptor.shared.map_or(&[][..], |shared| shared.columns);
    for column in descriptor.columns.iter().chain(shared_columns) {
        let present = !matches!(record.get(column.name), None | Some(Value::Null));
        if column.required && !present {
            return Err(PersistenceError::MissingAttribute {
                mapping: descriptor.mapping,
                attribute: column.name,
            }
            .into());
        }
    }

    Ok(())
}

/// Fails with `UnknownMapping` when a mapped table is absent.
pub(crate) fn ensure_mapping(conn: &Connection, descriptor: &EntityDescriptor) -> RepoResult<()> {
    if !table_exists(conn, descriptor.mapping)? {
        return Err(PersistenceError::UnknownMapping(descriptor.mapping).into());
    }
    if let Some(shared) = descriptor.shared {
        if !table_exists(conn, shared.mapping)? {
            return Err(PersistenceError::UnknownMapping(shared.mapping).into());
        }
    }
    Ok(())
}

/// Inserts a transient record and returns the storage-assigned identity.
pub(crate) fn insert(
    conn: &Connection,
    descriptor: &EntityDescriptor,
    record: &Record,
) -> RepoResult<EntityId> {
    let own = column_values(descriptor.columns, record);
    match descriptor.shared {
        Some(shared) => {
            let id = insert_row(conn, shared.mapping, None, &column_values(shared.columns, record))?;
            insert_row(conn, descriptor.mapping, Some((descriptor.identity, id)), &own)
        }
        None => insert_row(conn, descriptor.mapping, None, &own),
    }
}

/// Updates every declared column of the row matching `id`.
///
/// # Errors
/// - `PersistenceError::StaleIdentity` when no row matches.
pub(crate) fn update(
    conn: &Connection,
    descriptor: &EntityDescriptor,
    record: &Record,
    id: EntityId,
) -> RepoResult<()> {
    let own = column_values(descriptor.columns, record);
    if update_row(conn, descriptor.mapping, descriptor.identity, id, &own)? == 0 {
        return Err(PersistenceError::StaleIdentity {
            mapping: descriptor.mapping,
            id,
        }
        .into());
    }

    if let Some(shared) = descriptor.shared {
        let values = column_values(shared.columns, record);
        if update_row(conn, shared.mapping, shared.identity, id, &values)? == 0 {
            return Err(PersistenceError::StaleIdentity {
                mapping: shared.mapping,
                id,
            }
            .into());
        }
    }

    Ok(())
}

/// Writes missing link rows for the record's many-to-many collections.
///
/// One-to-many collections are read-only on save; the foreign key belongs to
/// the member row and only [`link_member`] moves it.
pub(crate) fn sync_collections(
    conn: &Connection,
    descriptor: &EntityDescriptor,
    record: &Record,
    owner_id: EntityId,
) -> RepoResult<()> {
    for (name, members) in record.collections() {
        let association = descriptor.association(name)?;
        if let AssociationKind::ManyToMany { .. } = association.kind {
            for member in members {
                link_member(conn, descriptor, name, owner_id, *member)?;
            }
        }
    }
    Ok(())
}

/// Links one member to `owner_id` through `association`.
///
/// One-to-many points the member's foreign key at the owner; many-to-many
/// adds the link row when it is missing.
///
/// # Errors
/// - `PersistenceError::DanglingReference` when the member row is absent.
/// - `ConfigurationError::NotACollection` for to-one associations.
pub(crate) fn link_member(
    conn: &Connection,
    descriptor: &EntityDescriptor,
    association: &str,
    owner_id: EntityId,
    member: EntityId,
) -> RepoResult<()> {
    let declared = descriptor.association(association)?;
    let related = declared.related_descriptor();
    let dangling = || PersistenceError::DanglingReference {
        mapping: related.mapping,
        id: member,
    };
    match declared.kind {
        AssociationKind::OneToMany { foreign_key } => {
            let sql = format!(
                "UPDATE {} SET {foreign_key} = ?1 WHERE {} = ?2;",
                related.mapping, related.identity
            );
            if conn.execute(&sql, params![owner_id, member])? == 0 {
                return Err(dangling().into());
            }
        }
        AssociationKind::ManyToMany {
            join_table,
            owner_column,
            related_column,
        } => {
            if !row_exists(conn, related, member)? {
                return Err(dangling().into());
            }
            conn.execute(
                &format!(
                    "INSERT INTO {join_table} ({owner_column}, {related_column})
                     SELECT ?1, ?2
                     WHERE NOT EXISTS (
                        SELECT 1 FROM {join_table}
                        WHERE {owner_column} = ?1 AND {related_column} = ?2
                     );"
                ),
                params![owner_id, member],
            )?;
        }
        AssociationKind::ManyToOne { .. } | AssociationKind::OneToOne { .. } => {
            return Err(ConfigurationError::NotACollection {
                mapping: descriptor.mapping,
                association: association.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Removes owned link rows, the own row, then the shared row.
///
/// Returns whether an own row was removed. Missing rows are not an error.
pub(crate) fn delete(conn: &Connection, descriptor: &EntityDescriptor, id: EntityId) -> RepoResult<bool> {
    for association in descriptor.collections() {
        if let AssociationKind::ManyToMany {
            join_table,
            owner_column,
            ..
        } = association.kind
        {
            conn.execute(
                &format!("DELETE FROM {join_table} WHERE {owner_column} = ?1;"),
                [id],
            )?;
        }
    }

    let removed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1;",
            descriptor.mapping, descriptor.identity
        ),
        [id],
    )?;

    if let Some(shared) = descriptor.shared {
        conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1;", shared.mapping, shared.identity),
            [id],
        )?;
    }

    Ok(removed > 0)
}

pub(crate) fn row_exists(conn: &Connection, descriptor: &EntityDescriptor, id: EntityId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
            descriptor.mapping, descriptor.identity
        ),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Runs a compiled query and returns records with collections loaded.
pub(crate) fn fetch(
    conn: &Connection,
    descriptor: &EntityDescriptor,
    query: &CompiledQuery,
) -> RepoResult<Vec<Record>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let mut rows = stmt.query(params_from_iter(query.binds.iter()))?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        let id = match row.get::<_, Value>(0)? {
            Value::Integer(id) => id,
            other => {
                return Err(PersistenceError::InvalidData(format!(
                    "identity `{}.{}` holds {:?}",
                    descriptor.mapping,
                    descriptor.identity,
                    other.data_type()
                ))
                .into());
            }
        };
        let mut record = Record::new(Some(id));
        for (index, name) in query.selection.iter().enumerate().skip(1) {
            record.set(name, row.get::<_, Value>(index)?);
        }
        records.push(record);
    }

    for record in &mut records {
        load_collections(conn, descriptor, record)?;
    }

    Ok(records)
}

fn load_collections(conn: &Connection, descriptor: &EntityDescriptor, record: &mut Record) -> RepoResult<()> {
    let Some(owner_id) = record.id() else {
        return Ok(());
    };

    for association in descriptor.collections() {
        let related = association.related_descriptor();
        let sql = match association.kind {
            AssociationKind::OneToMany { foreign_key } => format!(
                "SELECT {id} FROM {table} WHERE {foreign_key} = ?1 ORDER BY {id};",
                id = related.identity,
                table = related.mapping
            ),
            AssociationKind::ManyToMany {
                join_table,
                owner_column,
                related_column,
            } => format!(
                "SELECT DISTINCT {related_column} FROM {join_table}
                 WHERE {owner_column} = ?1
                 ORDER BY {related_column};"
            ),
            AssociationKind::ManyToOne { .. } | AssociationKind::OneToOne { .. } => continue,
        };

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([owner_id])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(row.get::<_, EntityId>(0)?);
        }
        record.set_collection(association.name, members);
    }

    Ok(())
}

fn column_values(columns: &[Column], record: &Record) -> Vec<(&'static str, Value)> {
    columns
        .iter()
        .map(|column| {
            let value = record.get(column.name).cloned().unwrap_or(Value::Null);
            (column.name, value)
        })
        .collect()
}

fn insert_row(
    conn: &Connection,
    table: &str,
    identity: Option<(&str, EntityId)>,
    values: &[(&'static str, Value)],
) -> RepoResult<EntityId> {
    let mut names = Vec::with_capacity(values.len() + 1);
    let mut binds = Vec::with_capacity(values.len() + 1);
    if let Some((column, id)) = identity {
        names.push(column);
        binds.push(Value::Integer(id));
    }
    for (name, value) in values {
        names.push(*name);
        binds.push(value.clone());
    }

    let sql = if names.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES;")
    } else {
        format!(
            "INSERT INTO {table} ({}) VALUES ({});",
            names.join(", "),
            vec!["?"; names.len()].join(", ")
        )
    };
    conn.execute(&sql, params_from_iter(binds))?;

    Ok(identity.map_or_else(|| conn.last_insert_rowid(), |(_, id)| id))
}

/// Returns the number of matched rows.
fn update_row(
    conn: &Connection,
    table: &str,
    identity: &str,
    id: EntityId,
    values: &[(&'static str, Value)],
) -> RepoResult<usize> {
    if values.is_empty() {
        let exists: i64 = conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {identity} = ?1);"),
            [id],
            |row| row.get(0),
        )?;
        return Ok(exists as usize);
    }

    let assignments = values
        .iter()
        .map(|(name, _)| format!("{name} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut binds = values
        .iter()
        .map(|(_, value)| value.clone())
        .collect::<Vec<_>>();
    binds.push(Value::Integer(id));

    let changed = conn.execute(
        &format!("UPDATE {table} SET {assignments} WHERE {identity} = ?;"),
        params_from_iter(binds),
    )?;
    Ok(changed)
}
