//! Graph queries used by editors: neighborhoods, connected sets and the
//! links crossing a selection.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexSet;

use crate::data::DataId;
use crate::document::Document;
use crate::object::ObjectId;

use super::NodeKind;

/// Objects sharing a link or a dock relation with `object`, in port order.
pub fn neighbor_objects(doc: &Document, object: ObjectId) -> Vec<ObjectId> {
    let Some(entry) = doc.objects().get(object) else {
        return Vec::new();
    };
    let mut neighbors = IndexSet::new();
    for port in entry.ports() {
        if let Some(parent) = doc.data(*port).and_then(|data| data.parent()) {
            neighbors.extend(doc.data(parent).map(|data| data.owner()));
        }
        for child in doc.datas().children_of(doc.graph(), *port) {
            neighbors.extend(doc.data(child).map(|data| data.owner()));
        }
    }
    neighbors.extend(entry.dockables().iter().copied());
    neighbors.extend(entry.parent_dock());
    neighbors.shift_remove(&object);
    neighbors.into_iter().collect()
}

/// Every object linked to `object`, directly or not, including itself.
pub fn connected_objects(doc: &Document, object: ObjectId) -> Vec<ObjectId> {
    if !doc.objects().contains(object) {
        return Vec::new();
    }
    let mut seen = IndexSet::from([object]);
    let mut queue = VecDeque::from([object]);
    while let Some(current) = queue.pop_front() {
        for neighbor in neighbor_objects(doc, current) {
            if seen.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    seen.into_iter().collect()
}

/// Partition the objects into connected sets, in list order.
pub fn connected_components(doc: &Document) -> Vec<Vec<ObjectId>> {
    let mut assigned = HashSet::new();
    let mut components = Vec::new();
    for object in doc.objects().ids() {
        if assigned.contains(&object) {
            continue;
        }
        let component = connected_objects(doc, object);
        assigned.extend(component.iter().copied());
        components.push(component);
    }
    components
}

/// Objects `object` depends on, nearest first.
pub fn upstream_objects(doc: &Document, object: ObjectId) -> Vec<ObjectId> {
    walk_objects(doc, object, |node| doc.graph().inputs(node).collect())
}

/// Objects depending on `object`, nearest first.
pub fn downstream_objects(doc: &Document, object: ObjectId) -> Vec<ObjectId> {
    walk_objects(doc, object, |node| doc.graph().outputs(node).collect())
}

fn walk_objects<F>(doc: &Document, object: ObjectId, next: F) -> Vec<ObjectId>
where
    F: Fn(super::NodeId) -> Vec<super::NodeId>,
{
    let mut visited = HashSet::from([object.node()]);
    let mut queue: VecDeque<_> = next(object.node()).into();
    let mut objects = Vec::new();
    while let Some(node) = queue.pop_front() {
        if !visited.insert(node) {
            continue;
        }
        if doc.graph().kind(node) == Some(NodeKind::Object) {
            objects.push(ObjectId::from_node(node));
        }
        queue.extend(next(node));
    }
    objects
}

/// Links crossing the border of a set of objects.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionBoundary {
    /// `(inside, outside)`: an input inside the selection linked to a
    /// parent outside of it.
    pub inputs: Vec<(DataId, DataId)>,
    /// `(inside, outside)`: an output inside the selection feeding a child
    /// outside of it.
    pub outputs: Vec<(DataId, DataId)>,
}

/// Find the links entering and leaving `selection`.
pub fn selection_boundary(doc: &Document, selection: &[ObjectId]) -> SelectionBoundary {
    let inside: HashSet<ObjectId> = selection.iter().copied().collect();
    let owner_inside = |data: DataId| {
        doc.data(data)
            .is_some_and(|data| inside.contains(&data.owner()))
    };

    let mut boundary = SelectionBoundary::default();
    for object in selection {
        let Some(entry) = doc.objects().get(*object) else {
            continue;
        };
        for port in entry.ports() {
            if let Some(parent) = doc.data(*port).and_then(|data| data.parent()) {
                if !owner_inside(parent) {
                    boundary.inputs.push((*port, parent));
                }
            }
            for child in doc.datas().children_of(doc.graph(), *port) {
                if !owner_inside(child) {
                    boundary.outputs.push((*port, child));
                }
            }
        }
    }
    boundary
}
