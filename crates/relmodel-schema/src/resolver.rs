//! Structural relation classification and join-key resolution.
//!
//! Cardinality is decided from shape alone: a junction descriptor forces
//! many-to-many; otherwise the collection flags of the declaring field and
//! of the target's back-relation pick the kind. Join keys come from declared
//! foreign keys on either side. Whatever cannot be resolved is a schema
//! error at build time.

use std::collections::HashMap;
use std::sync::Arc;

use relmodel_core::{Error, Result};

use crate::descriptor::{EntityDescriptor, LinkDescriptor, RelationDescriptor};
use crate::meta::{LinkMeta, RelationKind, RelationMeta};

const DEFAULT_ID_KEY: &str = "id";

/// Resolve one relationship field of `source` into its metadata.
pub(crate) fn resolve_relation(
    descriptors: &HashMap<String, Arc<EntityDescriptor>>,
    source: &EntityDescriptor,
    rel: &RelationDescriptor,
) -> Result<RelationMeta> {
    let target = descriptors.get(&rel.target).ok_or_else(|| {
        Error::schema(format!(
            "relation `{}.{}` targets unknown entity `{}`",
            source.entity, rel.name, rel.target
        ))
    })?;

    let source_id_key = source.primary_key().unwrap_or(DEFAULT_ID_KEY).to_string();
    let target_id_key = target.primary_key().unwrap_or(DEFAULT_ID_KEY).to_string();

    // The inverse field on the target, if the relation is bidirectional.
    let back = target.relations().find(|r| r.target == source.entity);
    let target_collection = back.is_some_and(|r| r.collection);

    // Foreign key on the target table pointing back at the source.
    let mut target_fk = None;
    let mut source_key = None;
    for col in target.columns() {
        if let Some(fk) = &col.foreign_key {
            if fk.table == source.table {
                target_fk = Some(col.name.clone());
                source_key = Some(fk.column.clone());
            }
        }
    }

    // Foreign key on the source pointing at the target: an explicit
    // declaration wins over a scan of the source's columns.
    let source_fk = rel.foreign_key.clone().or_else(|| {
        source.columns().find_map(|col| {
            col.foreign_key
                .as_ref()
                .filter(|fk| fk.table == target.table)
                .map(|_| col.name.clone())
        })
    });

    let mut meta = RelationMeta {
        kind: RelationKind::OneToOne,
        source: source.entity.clone(),
        target: target.entity.clone(),
        source_table: source.table.clone(),
        target_table: target.table.clone(),
        source_id_key,
        target_id_key,
        source_key,
        source_fk,
        target_fk,
        link: None,
    };

    if let Some(link) = &rel.link {
        meta.kind = RelationKind::ManyToMany;
        meta.link = Some(resolve_link(source, target, rel, link)?);
        return Ok(meta);
    }

    meta.kind = match (rel.collection, target_collection) {
        (true, true) => {
            return Err(Error::schema(format!(
                "relation `{}.{}` is collection-valued on both sides and needs \
                 a junction table",
                source.entity, rel.name
            )));
        }
        (true, false) => RelationKind::OneToMany,
        (false, false) => RelationKind::OneToOne,
        (false, true) => RelationKind::ManyToOne,
    };

    // Every non-junction kind joins through a foreign key on one side.
    let resolvable = match meta.kind {
        RelationKind::OneToMany => meta.target_fk.is_some(),
        RelationKind::ManyToOne => meta.source_fk.is_some(),
        RelationKind::OneToOne => meta.target_fk.is_some() || meta.source_fk.is_some(),
        RelationKind::ManyToMany => true,
    };
    if !resolvable {
        return Err(Error::schema(format!(
            "relation `{}.{}` ({}) has no resolvable foreign key between \
             `{}` and `{}`",
            source.entity,
            rel.name,
            meta.kind,
            source.table,
            meta.target_table
        )));
    }

    Ok(meta)
}

/// Assign junction columns to sides by the table identity each one
/// references. Both columns referencing the same table is ambiguous and
/// rejected rather than resolved by position.
fn resolve_link(
    source: &EntityDescriptor,
    target: &EntityDescriptor,
    rel: &RelationDescriptor,
    link: &LinkDescriptor,
) -> Result<LinkMeta> {
    let [first, second] = &link.columns;

    if first.references_table == second.references_table {
        return Err(Error::schema(format!(
            "junction `{}` for `{}.{}` references `{}` with both columns; \
             side assignment is ambiguous",
            link.table, source.entity, rel.name, first.references_table
        )));
    }

    let (source_side, target_side) = if first.references_table == source.table
        && second.references_table == target.table
    {
        (first, second)
    } else if second.references_table == source.table && first.references_table == target.table {
        (second, first)
    } else {
        return Err(Error::schema(format!(
            "junction `{}` for `{}.{}` does not reference both `{}` and `{}`",
            link.table, source.entity, rel.name, source.table, target.table
        )));
    };

    Ok(LinkMeta {
        table: link.table.clone(),
        source_secondary_key: source_side.column.clone(),
        target_secondary_key: target_side.column.clone(),
        source_key: source_side.references_column.clone(),
        target_key: target_side.references_column.clone(),
    })
}
