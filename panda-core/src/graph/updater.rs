//! Update Scheduling
//!
//! The [`NodeUpdater`] brings an object up to date by running every dirty
//! object it depends on, producers first.
//!
//! # Algorithm
//!
//! 1. Walk back from the requested object through its dirty dependencies:
//!    input ports (following links to the objects producing them), then
//!    docked children, then any other input edge, all in declaration order.
//! 2. Emit objects in post-order, so every object comes after the objects
//!    it reads from. The walk is deterministic for a given graph.
//! 3. Run the objects in that order. Each one is run at most once per pass.
//!
//! When the pass runs off the main thread, the first object whose class
//! needs the main thread and everything after it in the order are deferred
//! until [`Document::run_deferred`](crate::Document::run_deferred) is called
//! on the main thread.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::data::{DataError, DataId};
use crate::document::Document;
use crate::object::ObjectId;

/// Errors raised while updating objects.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The object depends on itself.
    #[error("object {0:?} depends on itself")]
    CyclicGraph(ObjectId),

    /// An input was read before the object producing it ran.
    #[error("object {object:?} read an output of {producer:?} before it was updated")]
    OutOfOrder {
        /// The object being updated.
        object: ObjectId,
        /// The port that was read, if the dependency goes through a port.
        data: Option<DataId>,
        /// The object that had not run yet.
        producer: ObjectId,
    },

    /// The update is waiting for the main thread.
    #[error("object {0:?} is waiting for the main thread")]
    Deferred(ObjectId),

    /// No object with this id exists.
    #[error("unknown object {0:?}")]
    UnknownObject(ObjectId),

    /// A data could not be read.
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Where an object is in the current update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Scheduled, or deferred to the main thread.
    Queued,
    /// Running right now.
    Updating,
    /// Ran during the last pass and has not been dirtied since.
    Done,
}

/// Walk marks. An object is `Visiting` while its dependencies are walked.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Walk {
    Visiting,
    Listed,
}

/// Runs dirty objects in dependency order.
#[derive(Debug, Default)]
pub struct NodeUpdater {
    states: HashMap<ObjectId, UpdateState>,
    deferred: IndexSet<ObjectId>,
    last_pass: Vec<ObjectId>,
}

impl NodeUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of an object, if it took part in a pass since it was dirtied.
    pub fn state(&self, object: ObjectId) -> Option<UpdateState> {
        self.states.get(&object).copied()
    }

    /// Objects run by the last pass, in run order.
    pub fn last_pass(&self) -> &[ObjectId] {
        &self.last_pass
    }

    /// Objects waiting for the main thread, in scheduling order.
    pub fn deferred(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.deferred.iter().copied()
    }

    /// Start a new pass: forget which objects the previous one ran.
    pub(crate) fn begin_pass(&mut self) {
        self.last_pass.clear();
    }

    /// Forget what the updater knows about an object that became dirty.
    pub(crate) fn clear(&mut self, object: ObjectId) {
        if self.states.get(&object) == Some(&UpdateState::Done) {
            self.states.remove(&object);
        }
    }

    /// Forget an object entirely, e.g. once it was removed.
    pub(crate) fn forget(&mut self, object: ObjectId) {
        self.states.remove(&object);
        self.deferred.shift_remove(&object);
    }

    pub(crate) fn reset(&mut self) {
        self.states.clear();
        self.deferred.clear();
        self.last_pass.clear();
    }

    /// Bring `target` up to date.
    ///
    /// Does nothing if the object is clean. Deferred objects stay dirty; a
    /// caller needing the value should check the object afterwards. Objects
    /// that ran are appended to the current pass.
    pub(crate) fn update_object(
        &mut self,
        doc: &mut Document,
        target: ObjectId,
    ) -> Result<(), UpdateError> {
        if !doc.objects.contains(target) {
            return Err(UpdateError::UnknownObject(target));
        }
        if !doc.graph.is_dirty(target.node()) {
            return Ok(());
        }

        let order = self.collect(doc, target)?;
        tracing::debug!(?target, count = order.len(), "update pass");

        let on_main_thread = doc.on_main_thread();
        let mut deferring = false;
        for object in order {
            if !doc.graph.is_dirty(object.node()) {
                continue;
            }
            deferring = deferring || (!on_main_thread && doc.requires_main_thread(object));
            if deferring {
                tracing::debug!(?object, "deferring update to the main thread");
                self.deferred.insert(object);
                self.states.insert(object, UpdateState::Queued);
                continue;
            }

            self.states.insert(object, UpdateState::Updating);
            if let Err(err) = doc.run_object_update(object) {
                self.states.remove(&object);
                tracing::warn!(?object, %err, "object update failed");
                return Err(err);
            }
            self.states.insert(object, UpdateState::Done);
            self.deferred.shift_remove(&object);
            self.last_pass.push(object);
        }
        Ok(())
    }

    /// Run the updates deferred to the main thread. Returns how many
    /// deferred objects are now clean.
    ///
    /// Objects are taken one at a time; if one fails, the ones after it stay
    /// deferred.
    pub(crate) fn run_deferred(&mut self, doc: &mut Document) -> Result<usize, UpdateError> {
        self.begin_pass();
        let mut done = 0;
        while let Some(object) = self.deferred.shift_remove_index(0) {
            if !doc.objects.contains(object) {
                continue;
            }
            self.update_object(doc, object)?;
            if !doc.graph.is_dirty(object.node()) {
                done += 1;
            }
        }
        Ok(done)
    }

    /// Dirty objects `target` depends on, followed by `target`, in
    /// dependency order.
    ///
    /// Depth-first over an explicit stack: each frame holds an object, its
    /// dirty dependencies and the next one to visit. An object is listed
    /// once all its dependencies are.
    fn collect(&self, doc: &Document, target: ObjectId) -> Result<Vec<ObjectId>, UpdateError> {
        let mut marks = HashMap::from([(target, Walk::Visiting)]);
        let mut order = Vec::new();
        let mut stack = vec![(target, doc.dirty_dependencies(target), 0_usize)];

        while let Some((object, dependencies, next)) = stack.last_mut() {
            let Some(dependency) = dependencies.get(*next).copied() else {
                let object = *object;
                stack.pop();
                marks.insert(object, Walk::Listed);
                order.push(object);
                continue;
            };
            *next += 1;
            match marks.get(&dependency).copied() {
                Some(Walk::Visiting) => return Err(UpdateError::CyclicGraph(dependency)),
                Some(Walk::Listed) => {}
                None => {
                    marks.insert(dependency, Walk::Visiting);
                    stack.push((dependency, doc.dirty_dependencies(dependency), 0));
                }
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    /// A document with two main-thread objects deferred by a pass that ran
    /// off the main thread.
    fn deferred_pair() -> (Document, ObjectId, ObjectId) {
        let mut doc = Document::new();
        let first = doc.create_object("render::Circles").unwrap();
        let second = doc.create_object("render::Circles").unwrap();
        let doc = thread::spawn(move || {
            doc.update_all().unwrap();
            doc
        })
        .join()
        .unwrap();
        (doc, first, second)
    }

    #[test]
    fn failed_deferred_update_keeps_the_rest_queued() {
        let (mut doc, first, second) = deferred_pair();
        assert_eq!(doc.deferred_objects(), vec![first, second]);

        // Lose a port of the first object so its update fails.
        let center = doc.find_data(first, "Center").unwrap();
        doc.datas.remove(center);
        doc.graph.set_dirty_value(center.node());

        let err = doc.run_deferred().unwrap_err();
        assert!(matches!(err, UpdateError::Data(DataError::UnknownData(id)) if id == center));
        assert_eq!(doc.deferred_objects(), vec![second]);
        assert!(doc.is_object_dirty(first));

        assert_eq!(doc.run_deferred().unwrap(), 1);
        assert!(!doc.is_object_dirty(second));
        assert!(doc.deferred_objects().is_empty());
        assert_eq!(doc.last_update_pass(), &[second]);
    }

    #[test]
    fn deep_dependencies_are_listed_producers_first() {
        let mut doc = Document::new();
        let mut chain = Vec::new();
        let mut previous: Option<DataId> = None;
        for _ in 0..2_000 {
            let add = doc.create_object("math::AddReals").unwrap();
            if let Some(previous) = previous {
                doc.set_parent(doc.find_data(add, "Input A").unwrap(), previous)
                    .unwrap();
            }
            previous = doc.find_data(add, "Result");
            chain.push(add);
        }

        let tail = chain[chain.len() - 1];
        let order = NodeUpdater::new().collect(&doc, tail).unwrap();
        assert_eq!(order, chain);
    }
}
