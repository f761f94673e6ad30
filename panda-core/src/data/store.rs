//! Data storage.

use std::collections::HashMap;

use crate::graph::{DataGraph, NodeKind};
use crate::object::ObjectId;
use crate::types::{ErasedValue, TypeRegistry};

use super::base_data::{BaseData, DataId};
use super::DataError;

/// Owns every [`BaseData`] of a document, keyed by id.
#[derive(Debug, Default)]
pub struct DataStore {
    datas: HashMap<DataId, BaseData>,
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            datas: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, data: BaseData) {
        self.datas.insert(data.id(), data);
    }

    pub(crate) fn remove(&mut self, id: DataId) -> Option<BaseData> {
        self.datas.remove(&id)
    }

    pub fn get(&self, id: DataId) -> Option<&BaseData> {
        self.datas.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: DataId) -> Option<&mut BaseData> {
        self.datas.get_mut(&id)
    }

    /// Look a data up, failing with [`DataError::UnknownData`].
    pub fn try_get(&self, id: DataId) -> Result<&BaseData, DataError> {
        self.datas.get(&id).ok_or(DataError::UnknownData(id))
    }

    pub(crate) fn try_get_mut(&mut self, id: DataId) -> Result<&mut BaseData, DataError> {
        self.datas.get_mut(&id).ok_or(DataError::UnknownData(id))
    }

    pub fn len(&self) -> usize {
        self.datas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datas.is_empty()
    }

    /// Bring a data clean without running any object.
    ///
    /// A linked data first cleans its parent, then mirrors the parent's value.
    /// If a data on the chain is produced by an object that is still dirty,
    /// the producer has not run yet and [`DataError::OutOfOrder`] is
    /// returned; nothing is cleaned in that case.
    pub(crate) fn clean_data(
        &mut self,
        graph: &mut DataGraph,
        registry: &TypeRegistry,
        id: DataId,
    ) -> Result<(), DataError> {
        // Dirty data from `id` up to the first clean ancestor.
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(data) = current.filter(|data| graph.is_dirty(data.node())) {
            if let Some(producer) = dirty_producer(graph, data) {
                return Err(DataError::OutOfOrder { data, producer });
            }
            chain.push(data);
            current = self.try_get(data)?.parent();
        }

        for data in chain.into_iter().rev() {
            if let Some(parent) = self.try_get(data)?.parent() {
                self.copy_value(registry, parent, data)?;
            }
            graph.clean(data.node());
        }
        Ok(())
    }

    /// Copy the value of `from` into `to`, converting if the types differ.
    pub(crate) fn copy_value(
        &mut self,
        registry: &TypeRegistry,
        from: DataId,
        to: DataId,
    ) -> Result<(), DataError> {
        let (from_type, to_type) = (self.try_get(from)?.type_id(), self.try_get(to)?.type_id());
        if from == to {
            return Ok(());
        }

        let mut value = self.take_value(to)?;
        let source = self.try_get(from)?;
        let result = if from_type == to_type {
            match registry.copier(to_type) {
                Ok(copier) if copier.copy(&*source.value, &mut *value) => Ok(()),
                Ok(_) => Err(DataError::TypeMismatch {
                    expected: registry.type_name(to_type),
                    found: registry.type_name(from_type),
                }),
                Err(err) => Err(err.into()),
            }
        } else {
            match registry
                .converter(from_type, to_type)
                .and_then(|converter| converter.convert(&*source.value))
            {
                Some(converted) => {
                    value = converted;
                    Ok(())
                }
                None => Err(DataError::TypeMismatch {
                    expected: registry.type_name(to_type),
                    found: registry.type_name(from_type),
                }),
            }
        };

        self.put_value(to, value);
        result
    }

    /// Move a data's value out, leaving an empty placeholder behind.
    pub(crate) fn take_value(&mut self, id: DataId) -> Result<ErasedValue, DataError> {
        let data = self.try_get_mut(id)?;
        Ok(std::mem::replace(&mut data.value, Box::new(())))
    }

    /// Put back a value taken with [`DataStore::take_value`].
    pub(crate) fn put_value(&mut self, id: DataId, value: ErasedValue) {
        if let Some(data) = self.datas.get_mut(&id) {
            data.value = value;
        }
    }

    /// Data of an object, in no particular order.
    pub fn owned_by(&self, owner: ObjectId) -> impl Iterator<Item = &BaseData> {
        self.datas.values().filter(move |data| data.owner() == owner)
    }

    /// Data linked to `parent`.
    pub fn children_of(&self, graph: &DataGraph, parent: DataId) -> Vec<DataId> {
        graph
            .outputs(parent.node())
            .map(DataId::from_node)
            .filter(|child| {
                self.datas
                    .get(child)
                    .is_some_and(|data| data.parent() == Some(parent))
            })
            .collect()
    }
}

/// The dirty object feeding `id` directly, if any.
fn dirty_producer(graph: &DataGraph, id: DataId) -> Option<ObjectId> {
    graph
        .inputs(id.node())
        .find(|input| graph.kind(*input) == Some(NodeKind::Object) && graph.is_dirty(*input))
        .map(ObjectId::from_node)
}
