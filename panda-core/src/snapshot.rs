//! Saving and loading documents.
//!
//! A [`DocumentSnapshot`] is a plain serde tree: objects in list order with
//! their persistent values, then the links between ports and the dock
//! relations, both addressed by object index and port name. Values are
//! stored as text through each type's codec, so a snapshot does not depend
//! on the process-local type ids.
//!
//! Loading is forgiving. Unknown classes become placeholders, and values or
//! links that cannot be restored are skipped; every such problem is
//! reported in the [`LoadReport`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::DataId;
use crate::document::Document;
use crate::object::{ObjectId, PLACEHOLDER_CLASS};

/// A saved document, or a saved selection of objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub objects: Vec<ObjectSnapshot>,
    #[serde(default)]
    pub links: Vec<LinkSnapshot>,
    #[serde(default)]
    pub docks: Vec<DockSnapshot>,
}

impl DocumentSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    /// Index of the object when it was saved.
    pub index: u32,
    pub class: String,
    /// Type names of the generic groups, in group order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_types: Vec<String>,
    #[serde(default)]
    pub datas: Vec<DataSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    pub name: String,
    pub type_name: String,
    /// The value, formatted by the type's text codec.
    pub value: String,
}

/// A port, addressed by object index and port name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub object: u32,
    pub data: String,
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object, self.data)
    }
}

/// `target` mirrors `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub target: PortRef,
    pub source: PortRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockSnapshot {
    pub dock: u32,
    pub dockables: Vec<u32>,
}

/// A problem found while loading. The affected part was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadDiagnostic {
    #[error("object {index} has unknown class {class}, loaded as a placeholder")]
    UnknownClass { index: u32, class: String },

    #[error("object {index} could not be created: {reason}")]
    CreateFailed { index: u32, reason: String },

    #[error("object {index} has a generic group of unusable type {type_name}: {reason}")]
    BadGenericType {
        index: u32,
        type_name: String,
        reason: String,
    },

    #[error("object {index} has no data named {data}")]
    UnknownData { index: u32, data: String },

    #[error("object {index}, data {data}: bad value: {reason}")]
    BadValue {
        index: u32,
        data: String,
        reason: String,
    },

    #[error("link {from} -> {to} skipped: {reason}")]
    BadLink {
        from: PortRef,
        to: PortRef,
        reason: String,
    },

    #[error("docking {dockable} into {dock} skipped: {reason}")]
    BadDock {
        dock: u32,
        dockable: u32,
        reason: String,
    },
}

/// Outcome of [`Document::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Objects created, in snapshot order.
    pub loaded: Vec<ObjectId>,
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl LoadReport {
    /// Whether everything was restored.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn report(&mut self, diagnostic: LoadDiagnostic) {
        tracing::warn!(%diagnostic, "load problem");
        self.diagnostics.push(diagnostic);
    }
}

impl Document {
    /// Save every object.
    pub fn save(&self) -> DocumentSnapshot {
        let all: Vec<ObjectId> = self.objects.ids().collect();
        self.save_objects(&all)
    }

    /// Save some objects, with the links and dock relations between them.
    pub fn save_objects(&self, selection: &[ObjectId]) -> DocumentSnapshot {
        let selected: HashSet<ObjectId> = selection.iter().copied().collect();
        let index_of = |id: ObjectId| self.objects.get(id).map(|entry| entry.index());
        let mut snapshot = DocumentSnapshot::default();

        for entry in self.objects.iter().filter(|entry| selected.contains(&entry.id())) {
            let mut object = ObjectSnapshot {
                index: entry.index(),
                class: entry.class().name().to_string(),
                generic_types: entry
                    .generic_groups()
                    .iter()
                    .map(|group| self.registry.type_name(group.type_id()))
                    .collect(),
                datas: Vec::new(),
            };

            for port in entry.ports() {
                let Some(data) = self.datas.get(*port) else {
                    continue;
                };
                if let Some(parent) = data.parent() {
                    let source = self
                        .datas
                        .get(parent)
                        .filter(|source| selected.contains(&source.owner()))
                        .and_then(|source| {
                            Some(PortRef {
                                object: index_of(source.owner())?,
                                data: source.name().to_string(),
                            })
                        });
                    if let Some(source) = source {
                        snapshot.links.push(LinkSnapshot {
                            target: PortRef {
                                object: entry.index(),
                                data: data.name().to_string(),
                            },
                            source,
                        });
                        continue;
                    }
                    // The parent stays behind: keep the mirrored value instead.
                }
                if !data.is_persistent() || data.type_id().is_generic() {
                    continue;
                }
                let formatted = self
                    .registry
                    .value_trait(data.type_id())
                    .and_then(|value_trait| value_trait.format_value(data.value_any()));
                match formatted {
                    Ok(value) => object.datas.push(DataSnapshot {
                        name: data.name().to_string(),
                        type_name: self.registry.type_name(data.type_id()),
                        value,
                    }),
                    Err(err) => tracing::warn!(data = data.name(), %err, "value not saved"),
                }
            }

            let dockables: Vec<u32> = entry
                .dockables()
                .iter()
                .filter(|child| selected.contains(child))
                .filter_map(|child| index_of(*child))
                .collect();
            if !dockables.is_empty() {
                snapshot.docks.push(DockSnapshot {
                    dock: entry.index(),
                    dockables,
                });
            }
            snapshot.objects.push(object);
        }
        snapshot
    }

    /// Add the objects of a snapshot to this document.
    ///
    /// Loaded objects get new indices, so a snapshot can be loaded into a
    /// non-empty document (e.g. when pasting).
    pub fn load(&mut self, snapshot: &DocumentSnapshot) -> LoadReport {
        let mut report = LoadReport::default();
        let mut created: HashMap<u32, ObjectId> = HashMap::new();

        for object in &snapshot.objects {
            let (class, known) = match self.factory.class(&object.class) {
                Some(class) => (Some(class), true),
                None => {
                    report.report(LoadDiagnostic::UnknownClass {
                        index: object.index,
                        class: object.class.clone(),
                    });
                    (self.factory.class(PLACEHOLDER_CLASS), false)
                }
            };
            let Some(class) = class else {
                report.report(LoadDiagnostic::CreateFailed {
                    index: object.index,
                    reason: "no placeholder class registered".to_string(),
                });
                continue;
            };
            let id = match self.instantiate(class) {
                Ok(id) => id,
                Err(err) => {
                    report.report(LoadDiagnostic::CreateFailed {
                        index: object.index,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            created.insert(object.index, id);
            report.loaded.push(id);
            if known {
                self.restore_object(id, object, &mut report);
            }
        }

        for link in &snapshot.links {
            let ports = self
                .resolve_port(&created, &link.target)
                .zip(self.resolve_port(&created, &link.source));
            let result = match ports {
                Some((target, source)) => self
                    .set_parent(target, source)
                    .map(|_| ())
                    .map_err(|err| err.to_string()),
                None => Err("port not found".to_string()),
            };
            if let Err(reason) = result {
                report.report(LoadDiagnostic::BadLink {
                    from: link.source.clone(),
                    to: link.target.clone(),
                    reason,
                });
            }
        }

        for dock in &snapshot.docks {
            for dockable in &dock.dockables {
                let pair = created.get(&dock.dock).zip(created.get(dockable));
                let result = match pair {
                    Some((dock_id, child_id)) => self
                        .add_dockable(*dock_id, *child_id, usize::MAX)
                        .map(|_| ())
                        .map_err(|err| err.to_string()),
                    None => Err("object not loaded".to_string()),
                };
                if let Err(reason) = result {
                    report.report(LoadDiagnostic::BadDock {
                        dock: dock.dock,
                        dockable: *dockable,
                        reason,
                    });
                }
            }
        }

        tracing::debug!(
            loaded = report.loaded.len(),
            problems = report.diagnostics.len(),
            "loaded snapshot"
        );
        report
    }

    fn restore_object(&mut self, id: ObjectId, object: &ObjectSnapshot, report: &mut LoadReport) {
        for type_name in &object.generic_types {
            let result = self
                .registry
                .id_by_name(type_name)
                .map_err(|err| err.to_string())
                .and_then(|type_id| {
                    self.create_datas(id, type_id, usize::MAX)
                        .map_err(|err| err.to_string())
                });
            if let Err(reason) = result {
                report.report(LoadDiagnostic::BadGenericType {
                    index: object.index,
                    type_name: type_name.clone(),
                    reason,
                });
            }
        }

        for data in &object.datas {
            let Some(port) = self.find_data(id, &data.name) else {
                report.report(LoadDiagnostic::UnknownData {
                    index: object.index,
                    data: data.name.clone(),
                });
                continue;
            };
            if let Err(err) = self.restore_value(port, &data.value) {
                report.report(LoadDiagnostic::BadValue {
                    index: object.index,
                    data: data.name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn resolve_port(&self, created: &HashMap<u32, ObjectId>, port: &PortRef) -> Option<DataId> {
        self.find_data(*created.get(&port.object)?, &port.data)
    }
}
