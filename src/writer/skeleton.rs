//! Skeleton construction.
//!
//! The destination set is known in full at open time, so the whole
//! group/dataset hierarchy is built and sized before any sample arrives:
//! a root `properties` struct-group with session-wide text fields, one
//! struct-group per catalog (optionally carrying the host metadata blob),
//! one struct-group per resource, and one pre-sized chunked float64 dataset
//! per catalog item. Text fields are only queued here; the registry flushes
//! them afterwards in one pass.

use std::collections::HashMap;
use std::time::Duration;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::catalog::CatalogItem;
use crate::layout::chunk::ChunkPlan;
use crate::layout::name;
use crate::store::{AttrValue, ContainerStore, ElementType, NodeId};
use crate::util::{Error, Result};

use super::constants::{
    CATALOG_PROPERTIES_FIELD, CLASS_ATTR, CLASS_DOUBLE, CLASS_STRUCT, DATE_TIME_FIELD,
    PROPERTIES_GROUP, SAMPLE_PERIOD_FIELD,
};
use super::text::TextBlockRegistry;

const DATE_TIME_STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Physical destination key: (catalog group, resource group, dataset name).
pub(crate) type DatasetKey = (String, String, String);

/// Resolved hierarchy: each catalog item's destination dataset by key.
#[derive(Debug)]
pub(crate) struct Skeleton {
    pub(crate) datasets: HashMap<DatasetKey, NodeId>,
}

impl Skeleton {
    /// Physical key for a catalog item. Shared with the write router so
    /// lookups and construction agree on naming.
    pub(crate) fn key_for(item: &CatalogItem) -> Result<DatasetKey> {
        Ok((
            name::catalog_group_name(&item.catalog.path),
            item.resource.id.clone(),
            name::dataset_name(&item.representation)?,
        ))
    }
}

/// Build the full hierarchy for `items`, queueing text entries into
/// `registry`. Fails before touching the store if the chunk plan is unusable.
pub(crate) fn build<S: ContainerStore>(
    store: &mut S,
    registry: &mut TextBlockRegistry,
    begin: OffsetDateTime,
    sample_period: Duration,
    plan: ChunkPlan,
    items: &[CatalogItem],
) -> Result<Skeleton> {
    if !plan.is_valid() {
        return Err(Error::Capacity {
            total_len: plan.extent(),
            max_chunk_len: 0,
        });
    }

    let root = store.root();

    // Session-wide properties.
    let properties = store.ensure_group(root, PROPERTIES_GROUP)?;
    store.write_attr(properties, CLASS_ATTR, AttrValue::Text(CLASS_STRUCT.to_string()))?;
    registry.add(properties, DATE_TIME_FIELD, begin.format(&DATE_TIME_STAMP)?)?;
    registry.add(properties, SAMPLE_PERIOD_FIELD, name::period_unit(sample_period))?;

    let mut catalog_groups: HashMap<String, NodeId> = HashMap::new();
    let mut resource_groups: HashMap<(String, String), NodeId> = HashMap::new();
    let mut datasets: HashMap<DatasetKey, NodeId> = HashMap::new();

    for item in items {
        let key = Skeleton::key_for(item)?;
        let (catalog_name, resource_id, dataset_name) = &key;

        let catalog_group = match catalog_groups.get(catalog_name) {
            Some(&id) => id,
            None => {
                let id = store.ensure_group(root, catalog_name)?;
                store.write_attr(id, CLASS_ATTR, AttrValue::Text(CLASS_STRUCT.to_string()))?;
                if let Some(blob) = &item.catalog.properties {
                    registry.add(id, CATALOG_PROPERTIES_FIELD, blob.clone())?;
                }
                catalog_groups.insert(catalog_name.clone(), id);
                id
            }
        };

        let resource_key = (catalog_name.clone(), resource_id.clone());
        let resource_group = match resource_groups.get(&resource_key) {
            Some(&id) => id,
            None => {
                let id = store.ensure_group(catalog_group, resource_id)?;
                store.write_attr(id, CLASS_ATTR, AttrValue::Text(CLASS_STRUCT.to_string()))?;
                resource_groups.insert(resource_key, id);
                id
            }
        };

        if datasets.contains_key(&key) {
            return Err(Error::config(format!(
                "duplicate catalog item: {}/{}/{}",
                catalog_name, resource_id, dataset_name
            )));
        }
        let dataset = store.create_dataset(
            resource_group,
            dataset_name,
            ElementType::Float64,
            plan.extent(),
            plan.chunk_len,
        )?;
        store.write_attr(dataset, CLASS_ATTR, AttrValue::Text(CLASS_DOUBLE.to_string()))?;
        datasets.insert(key, dataset);
    }

    Ok(Skeleton { datasets })
}
