//! Object behavior and the contexts it runs in.

use std::any::Any;

use crate::data::{BaseData, DataFlags, DataHandle, DataId, DataStore};
use crate::graph::{DataGraph, GraphError, NodeId, NodeKind};
use crate::types::{DataTypeId, DataValue, ErasedValue, TypeRegistry};

use super::generic::{GenericGroup, GenericSpec, GenericState};
use super::{ObjectClass, ObjectError, ObjectId};

/// The behavior of an object.
///
/// `update` is only called once every input of the object is clean, and
/// should write every output through the [`UpdateContext`].
pub trait PandaObject: Send {
    /// Recompute the outputs from the inputs.
    fn update(&mut self, ctx: &mut UpdateContext<'_>);

    /// Whether a dock object accepts `class` as a docked child.
    ///
    /// Only called for docks. The default accepts nothing.
    fn accepts_dockable(&self, _class: &ObjectClass) -> bool {
        false
    }

    /// Drop any cached state, e.g. before a document is re-run from scratch.
    fn reset(&mut self) {}
}

/// Create a data port and wire it to its owner.
///
/// Output ports depend on the owner and start dirty; every other port feeds
/// the owner and starts clean. Returns the nodes that became dirty.
#[allow(clippy::too_many_arguments)]
pub(crate) fn create_port(
    graph: &mut DataGraph,
    datas: &mut DataStore,
    owner: ObjectId,
    name: String,
    help: String,
    type_id: DataTypeId,
    value: ErasedValue,
    flags: DataFlags,
) -> Result<(DataId, Vec<NodeId>), GraphError> {
    let id = DataId::from_node(graph.add_node(NodeKind::Data, flags.output));
    let wired = if flags.output {
        graph.add_input(id.node(), owner.node())
    } else {
        graph.add_input(owner.node(), id.node())
    };
    match wired {
        Ok(dirtied) => {
            datas.insert(BaseData::new(id, name, help, owner, type_id, value, flags));
            Ok((id, dirtied))
        }
        Err(err) => {
            graph.remove_node(id.node());
            Err(err)
        }
    }
}

/// Declares the ports of an object while it is being created.
pub struct ObjectSetup<'a> {
    object: ObjectId,
    registry: &'a TypeRegistry,
    graph: &'a mut DataGraph,
    datas: &'a mut DataStore,
    ports: Vec<DataId>,
    generic: Option<GenericState>,
}

impl<'a> ObjectSetup<'a> {
    pub(crate) fn new(
        object: ObjectId,
        registry: &'a TypeRegistry,
        graph: &'a mut DataGraph,
        datas: &'a mut DataStore,
    ) -> Self {
        Self {
            object,
            registry,
            graph,
            datas,
            ports: Vec::new(),
            generic: None,
        }
    }

    /// The object being created.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Add an input port holding `T::default()`.
    pub fn add_input<T: DataValue>(
        &mut self,
        name: &str,
        help: &str,
    ) -> Result<DataHandle<T>, ObjectError> {
        self.add_data(name, help, DataFlags::input(), T::default())
    }

    /// Add an input port with an initial value.
    pub fn add_input_with<T: DataValue>(
        &mut self,
        name: &str,
        help: &str,
        value: T,
    ) -> Result<DataHandle<T>, ObjectError> {
        self.add_data(name, help, DataFlags::input(), value)
    }

    /// Add an output port.
    pub fn add_output<T: DataValue>(
        &mut self,
        name: &str,
        help: &str,
    ) -> Result<DataHandle<T>, ObjectError> {
        self.add_data(name, help, DataFlags::output(), T::default())
    }

    /// Add a port with explicit flags.
    pub fn add_data<T: DataValue>(
        &mut self,
        name: &str,
        help: &str,
        flags: DataFlags,
        value: T,
    ) -> Result<DataHandle<T>, ObjectError> {
        let type_id = self.registry.id_of::<T>()?;
        let (id, _) = create_port(
            self.graph,
            self.datas,
            self.object,
            name.to_string(),
            help.to_string(),
            type_id,
            Box::new(value),
            flags,
        )?;
        self.ports.push(id);
        Ok(DataHandle::new(id))
    }

    /// Make the object generic.
    ///
    /// Adds the connector port; groups created later are inserted before it.
    pub fn generic(&mut self, spec: GenericSpec) -> Result<DataId, ObjectError> {
        spec.validate()?;
        let flags = DataFlags {
            input: true,
            displayed: true,
            ..DataFlags::default()
        };
        let (connector, _) = create_port(
            self.graph,
            self.datas,
            self.object,
            spec.name.clone(),
            spec.help.clone(),
            DataTypeId::GENERIC,
            Box::new(()),
            flags,
        )?;
        self.ports.push(connector);
        self.generic = Some(GenericState::new(spec, connector));
        Ok(connector)
    }

    pub(crate) fn finish(self) -> (Vec<DataId>, Option<GenericState>) {
        (self.ports, self.generic)
    }
}

/// Access to the datas of an object during its update.
///
/// Reads see the input values, already mirrored from their parents. Writes
/// are restricted to the object's own ports.
pub struct UpdateContext<'a> {
    object: ObjectId,
    datas: &'a mut DataStore,
    graph: &'a mut DataGraph,
    registry: &'a TypeRegistry,
    groups: &'a [GenericGroup],
    dirtied: Vec<NodeId>,
}

impl<'a> UpdateContext<'a> {
    pub(crate) fn new(
        object: ObjectId,
        datas: &'a mut DataStore,
        graph: &'a mut DataGraph,
        registry: &'a TypeRegistry,
        groups: &'a [GenericGroup],
    ) -> Self {
        Self {
            object,
            datas,
            graph,
            registry,
            groups,
            dirtied: Vec::new(),
        }
    }

    /// The object being updated.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// The generic groups of the object, in port order.
    pub fn generic_groups(&self) -> &[GenericGroup] {
        self.groups
    }

    /// Read a port.
    pub fn get<T: DataValue>(&self, handle: DataHandle<T>) -> Option<&T> {
        self.datas.get(handle.id())?.value_ref::<T>()
    }

    /// Read a port without knowing its type.
    pub fn get_erased(&self, id: DataId) -> Option<&dyn Any> {
        self.datas.get(id).map(BaseData::value_any)
    }

    /// Read a port through an untyped id.
    pub fn get_as<T: DataValue>(&self, id: DataId) -> Option<&T> {
        self.datas.get(id)?.value_ref::<T>()
    }

    /// The type of a port.
    pub fn type_of(&self, id: DataId) -> Option<DataTypeId> {
        self.datas.get(id).map(BaseData::type_id)
    }

    /// Size of a port's value, for list-aware processing.
    pub fn size_of(&self, id: DataId) -> usize {
        self.datas
            .get(id)
            .and_then(|data| {
                self.registry
                    .value_trait(data.type_id())
                    .ok()
                    .map(|t| t.size(data.value_any()))
            })
            .unwrap_or(0)
    }

    /// Replace the value of one of the object's ports.
    pub fn set<T: DataValue>(&mut self, handle: DataHandle<T>, value: T) -> bool {
        self.with_mut(handle.id(), |slot: &mut T| *slot = value).is_some()
    }

    /// Edit the value of one of the object's ports in place.
    pub fn with_mut<T: DataValue, R>(
        &mut self,
        id: DataId,
        edit: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let data = self.datas.get_mut(id)?;
        if data.owner() != self.object {
            tracing::warn!(object = ?self.object, data = ?id, "refusing to write a foreign port");
            return None;
        }
        let result = edit(data.value_mut::<T>()?);
        self.dirtied.extend(self.graph.set_dirty_outputs(id.node()));
        Some(result)
    }

    /// Copy (or convert) the value of `from` into the object's port `to`.
    pub fn copy_erased(&mut self, from: DataId, to: DataId) -> bool {
        if self.datas.get(to).map(BaseData::owner) != Some(self.object) {
            return false;
        }
        match self.datas.copy_value(self.registry, from, to) {
            Ok(()) => {
                self.dirtied.extend(self.graph.set_dirty_outputs(to.node()));
                true
            }
            Err(err) => {
                tracing::debug!(%err, "generic copy failed");
                false
            }
        }
    }

    pub(crate) fn finish(self) -> Vec<NodeId> {
        self.dirtied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_parts() -> (DataGraph, DataStore, TypeRegistry, ObjectId) {
        let mut graph = DataGraph::new();
        let object = ObjectId::from_node(graph.add_node(NodeKind::Object, true));
        (graph, DataStore::new(), TypeRegistry::with_builtins(), object)
    }

    #[test]
    fn ports_are_wired_by_role() {
        let (mut graph, mut datas, registry, object) = setup_parts();
        let mut setup = ObjectSetup::new(object, &registry, &mut graph, &mut datas);
        let input = setup.add_input_with::<f64>("Input", "", 2.0).unwrap();
        let output = setup.add_output::<f64>("Result", "").unwrap();
        let (ports, generic) = setup.finish();

        assert_eq!(ports, vec![input.id(), output.id()]);
        assert!(generic.is_none());
        assert!(graph.inputs(object.node()).any(|n| n == input.id().node()));
        assert!(graph.inputs(output.id().node()).any(|n| n == object.node()));
        assert!(!graph.is_dirty(input.id().node()));
        assert!(graph.is_dirty(output.id().node()));
        assert_eq!(datas.get(input.id()).unwrap().value_ref::<f64>(), Some(&2.0));
    }

    #[test]
    fn unregistered_types_are_refused() {
        #[derive(Clone, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
        struct Unknown;

        let (mut graph, mut datas, registry, object) = setup_parts();
        let mut setup = ObjectSetup::new(object, &registry, &mut graph, &mut datas);
        assert!(setup.add_input::<Unknown>("x", "").is_err());
        assert!(setup.finish().0.is_empty());
    }

    #[test]
    fn context_only_writes_own_ports() {
        let (mut graph, mut datas, registry, object) = setup_parts();
        let other = ObjectId::from_node(graph.add_node(NodeKind::Object, false));

        let mut setup = ObjectSetup::new(object, &registry, &mut graph, &mut datas);
        let mine = setup.add_output::<i32>("Mine", "").unwrap();
        drop(setup);
        let mut setup = ObjectSetup::new(other, &registry, &mut graph, &mut datas);
        let theirs = setup.add_output::<i32>("Theirs", "").unwrap();
        drop(setup);

        let mut ctx = UpdateContext::new(object, &mut datas, &mut graph, &registry, &[]);
        assert!(ctx.set(mine, 3));
        assert!(!ctx.set(theirs, 4));
        assert_eq!(ctx.get(mine), Some(&3));
        assert_eq!(ctx.get(theirs), Some(&0));
        assert_eq!(ctx.size_of(mine.id()), 1);
    }
}
