//! Generic objects: ports whose type is chosen when something is connected.
//!
//! A generic object declares a [`GenericSpec`]: which type families its
//! connector accepts, and which ports ([`GenericDefinition`]s) to create for
//! every connection. Connecting an output of type `T` to the connector picks
//! a concrete type and adds a [`GenericGroup`] of ports typed from it.

use smallvec::SmallVec;

use crate::data::{DataFlags, DataId};
use crate::document::{Document, DocumentError};
use crate::graph::GraphError;
use crate::types::{DataTypeId, TypeRegistry};

use super::panda_object::create_port;
use super::{ObjectError, ObjectId};

/// A set of types a generic connector accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    /// Exactly this type.
    Exact(DataTypeId),
    /// Any plain value type.
    AnyValue,
    /// Any list type.
    AnyList,
    /// Any animation type.
    AnyAnimation,
}

impl TypeFamily {
    /// Whether the family contains `type_id`.
    pub fn admits(self, type_id: DataTypeId) -> bool {
        match self {
            TypeFamily::Exact(exact) => exact == type_id,
            TypeFamily::AnyValue => type_id.is_single_value(),
            TypeFamily::AnyList => type_id.is_vector(),
            TypeFamily::AnyAnimation => type_id.is_animation(),
        }
    }
}

/// How a port of a generic group derives its type from the group type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeModifier {
    /// The group type itself.
    #[default]
    Same,
    /// The base value type.
    ValueOf,
    /// The list of the base value type.
    ListOf,
    /// The animation of the base value type.
    AnimationOf,
}

impl TypeModifier {
    pub fn apply(self, type_id: DataTypeId) -> DataTypeId {
        match self {
            TypeModifier::Same => type_id,
            TypeModifier::ValueOf => type_id.value_type(),
            TypeModifier::ListOf => type_id.vector_of(),
            TypeModifier::AnimationOf => type_id.animation_of(),
        }
    }
}

/// One port created for each connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericDefinition {
    pub name: String,
    pub help: String,
    pub output: bool,
    pub modifier: TypeModifier,
}

/// Declaration of a generic connector.
#[derive(Debug, Clone)]
pub struct GenericSpec {
    pub name: String,
    pub help: String,
    /// Accepted families, in preference order.
    pub families: SmallVec<[TypeFamily; 4]>,
    /// Ports of every group. The first one is the input the connection
    /// feeds, so it must not be an output.
    pub definitions: Vec<GenericDefinition>,
}

impl GenericSpec {
    pub fn new(name: &str, help: &str) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            families: SmallVec::new(),
            definitions: Vec::new(),
        }
    }

    /// Accept a type family.
    pub fn accept(mut self, family: TypeFamily) -> Self {
        self.families.push(family);
        self
    }

    /// Add an input port to every group.
    pub fn input(mut self, name: &str, help: &str, modifier: TypeModifier) -> Self {
        self.definitions.push(GenericDefinition {
            name: name.to_string(),
            help: help.to_string(),
            output: false,
            modifier,
        });
        self
    }

    /// Add an output port to every group.
    pub fn output(mut self, name: &str, help: &str, modifier: TypeModifier) -> Self {
        self.definitions.push(GenericDefinition {
            name: name.to_string(),
            help: help.to_string(),
            output: true,
            modifier,
        });
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ObjectError> {
        match self.definitions.first() {
            None => Err(ObjectError::InvalidGeneric("a generic needs at least one port")),
            Some(first) if first.output => Err(ObjectError::InvalidGeneric(
                "the first generic port must be an input",
            )),
            Some(_) if self.families.is_empty() => {
                Err(ObjectError::InvalidGeneric("a generic must accept a type family"))
            }
            Some(_) => Ok(()),
        }
    }

    /// Pick the group type to create for a connection from `source`.
    ///
    /// Exact families win first, then wildcard families, both in declaration
    /// order. Failing those, an exact family reachable through a registered
    /// converter is used.
    pub fn compatible_type(
        &self,
        registry: &TypeRegistry,
        source: DataTypeId,
    ) -> Result<DataTypeId, ObjectError> {
        let no_match = || ObjectError::NoCompatibleType {
            type_name: registry.type_name(source),
        };
        if source.is_generic() || registry.value_trait(source).is_err() {
            return Err(no_match());
        }

        let exact = self
            .families
            .iter()
            .any(|family| matches!(family, TypeFamily::Exact(t) if *t == source));
        if exact {
            return Ok(source);
        }
        let wildcard = self
            .families
            .iter()
            .any(|family| !matches!(family, TypeFamily::Exact(_)) && family.admits(source));
        if wildcard {
            return Ok(source);
        }
        self.families
            .iter()
            .find_map(|family| match family {
                TypeFamily::Exact(target) if registry.can_convert(source, *target) => Some(*target),
                _ => None,
            })
            .ok_or_else(no_match)
    }

    fn port_types(
        &self,
        registry: &TypeRegistry,
        type_id: DataTypeId,
    ) -> Result<Vec<DataTypeId>, ObjectError> {
        self.definitions
            .iter()
            .map(|definition| -> Result<DataTypeId, ObjectError> {
                let port_type = definition.modifier.apply(type_id);
                registry.value_trait(port_type)?;
                Ok(port_type)
            })
            .collect()
    }
}

/// The ports created for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericGroup {
    type_id: DataTypeId,
    datas: SmallVec<[DataId; 4]>,
}

impl GenericGroup {
    /// The type the group was created for.
    pub fn type_id(&self) -> DataTypeId {
        self.type_id
    }

    /// The ports, in definition order.
    pub fn datas(&self) -> &[DataId] {
        &self.datas
    }

    /// The port fed by the connection.
    pub fn input(&self) -> Option<DataId> {
        self.datas.first().copied()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GenericState {
    pub(crate) spec: GenericSpec,
    pub(crate) connector: DataId,
    pub(crate) groups: Vec<GenericGroup>,
}

impl GenericState {
    pub(crate) fn new(spec: GenericSpec, connector: DataId) -> Self {
        Self {
            spec,
            connector,
            groups: Vec::new(),
        }
    }

    /// The group whose connection port is `data`.
    pub(crate) fn group_fed_by(&self, data: DataId) -> Option<usize> {
        self.groups
            .iter()
            .position(|group| group.input() == Some(data))
    }
}

impl Document {
    /// The generic groups of an object, in port order.
    pub fn generic_groups(&self, object: ObjectId) -> Result<&[GenericGroup], ObjectError> {
        let entry = self.object_entry(object)?;
        let state = entry.generic.as_ref().ok_or(ObjectError::NotGeneric(object))?;
        Ok(&state.groups)
    }

    /// Add a group of ports typed from `type_id` at `index`.
    ///
    /// Indices past the end append. Returns the index of the new group.
    pub fn create_datas(
        &mut self,
        object: ObjectId,
        type_id: DataTypeId,
        index: usize,
    ) -> Result<usize, DocumentError> {
        let entry = self.object_entry(object)?;
        let state = entry.generic.as_ref().ok_or(ObjectError::NotGeneric(object))?;
        if type_id.is_generic() {
            return Err(ObjectError::NoCompatibleType {
                type_name: self.registry.type_name(type_id),
            }
            .into());
        }
        let port_types = state.spec.port_types(&self.registry, type_id)?;
        let index = index.min(state.groups.len());
        let anchor = state
            .groups
            .get(index)
            .and_then(GenericGroup::input)
            .unwrap_or(state.connector);
        let position = entry
            .ports
            .iter()
            .position(|port| *port == anchor)
            .unwrap_or(entry.ports.len());
        let definitions = state.spec.definitions.clone();

        let mut datas: SmallVec<[DataId; 4]> = SmallVec::new();
        let mut dirtied = Vec::new();
        for (definition, port_type) in definitions.iter().zip(port_types) {
            let value = self.registry.value_trait(port_type)?.create();
            let flags = if definition.output {
                DataFlags::output()
            } else {
                DataFlags::input()
            };
            match create_port(
                &mut self.graph,
                &mut self.datas,
                object,
                definition.name.clone(),
                definition.help.clone(),
                port_type,
                value,
                flags,
            ) {
                Ok((id, newly_dirty)) => {
                    datas.push(id);
                    dirtied.extend(newly_dirty);
                }
                Err(err) => {
                    for id in datas {
                        dirtied.extend(self.destroy_data(id));
                    }
                    self.notify_dirtied(dirtied);
                    return Err(ObjectError::from(err).into());
                }
            }
        }

        let entry = self.object_entry_mut(object)?;
        for (offset, id) in datas.iter().enumerate() {
            entry.ports.insert(position + offset, *id);
        }
        if let Some(state) = entry.generic.as_mut() {
            state.groups.insert(index, GenericGroup { type_id, datas });
        }
        self.renumber_generic(object);
        tracing::debug!(?object, group = index, type_name = %self.registry.type_name(type_id), "created generic group");
        self.notify_dirtied(dirtied);
        self.signals.modified_object.emit(&object);
        Ok(index)
    }

    /// Remove a generic group and its ports. Returns the group type, which
    /// is what [`Document::create_datas`] needs to recreate it.
    pub fn disconnect_data(
        &mut self,
        object: ObjectId,
        group: usize,
    ) -> Result<DataTypeId, DocumentError> {
        let entry = self.object_entry_mut(object)?;
        let state = entry.generic.as_mut().ok_or(ObjectError::NotGeneric(object))?;
        if group >= state.groups.len() {
            return Err(ObjectError::UnknownGroup { object, group }.into());
        }
        let removed = state.groups.remove(group);
        entry.ports.retain(|port| !removed.datas.contains(port));

        let mut dirtied = Vec::new();
        for id in &removed.datas {
            dirtied.extend(self.destroy_data(*id));
        }
        dirtied.extend(self.graph.set_dirty_value(object.node()));
        self.renumber_generic(object);
        tracing::debug!(?object, group, "removed generic group");
        self.notify_dirtied(dirtied);
        self.signals.modified_object.emit(&object);
        Ok(removed.type_id)
    }

    /// Connect `source` to the generic connector of `object`, creating a
    /// new group for it. Returns the input port that was linked.
    pub(crate) fn connect_generic(
        &mut self,
        object: ObjectId,
        source: DataId,
    ) -> Result<DataId, DocumentError> {
        let source_type = self.datas.try_get(source)?.type_id();
        let entry = self.object_entry(object)?;
        let state = entry.generic.as_ref().ok_or(ObjectError::NotGeneric(object))?;
        let type_id = state.spec.compatible_type(&self.registry, source_type)?;
        if self.graph.reaches(object.node(), source.node()) {
            return Err(GraphError::CyclicGraph {
                node: object.node(),
                input: source.node(),
            }
            .into());
        }

        let group = self.create_datas(object, type_id, usize::MAX)?;
        let input = self
            .generic_groups(object)?
            .get(group)
            .and_then(GenericGroup::input)
            .ok_or(ObjectError::UnknownGroup { object, group })?;
        if let Err(err) = self.set_parent(input, source) {
            if let Err(undo) = self.disconnect_data(object, group) {
                tracing::warn!(%undo, "failed to roll back generic group");
            }
            return Err(err);
        }
        Ok(input)
    }

    /// Name generic ports after their definition and group number.
    fn renumber_generic(&mut self, object: ObjectId) {
        let Some(state) = self.objects.get(object).and_then(|entry| entry.generic.as_ref()) else {
            return;
        };
        for (number, group) in state.groups.iter().enumerate() {
            for (definition, id) in state.spec.definitions.iter().zip(&group.datas) {
                if let Some(data) = self.datas.get_mut(*id) {
                    data.set_name(format!("{} #{}", definition.name, number + 1));
                }
            }
        }
    }
}
