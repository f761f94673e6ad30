//! Integration Tests for the Dataflow Engine
//!
//! These tests build small documents and check that edits, propagation and
//! update passes work together correctly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use panda_core::data::{DataError, DataHandle, DataId};
use panda_core::delay::DelayedRunner;
use panda_core::graph::{connected_components, downstream_objects, selection_boundary, GraphError};
use panda_core::object::{
    Capability, GenericSpec, ObjectClass, ObjectError, ObjectFactory, ObjectId, PandaObject,
    TypeFamily, TypeModifier, UpdateContext, PLACEHOLDER_CLASS,
};
use panda_core::snapshot::{DocumentSnapshot, LoadDiagnostic};
use panda_core::{Document, DocumentError};

/// Sums two inputs and counts its updates.
struct Relay {
    a: DataHandle<f64>,
    b: DataHandle<f64>,
    out: DataHandle<f64>,
    runs: Arc<AtomicUsize>,
}

impl PandaObject for Relay {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let a = ctx.get(self.a).copied().unwrap_or_default();
        let b = ctx.get(self.b).copied().unwrap_or_default();
        ctx.set(self.out, a + b);
    }
}

struct Label {
    _text: DataHandle<String>,
}

impl PandaObject for Label {
    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}
}

struct Sink;

impl PandaObject for Sink {
    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}
}

/// A document whose factory knows the built-ins and the test classes.
fn document(runs: &Arc<AtomicUsize>) -> Document {
    let mut factory = ObjectFactory::with_builtins();
    let counter = Arc::clone(runs);
    factory
        .register(ObjectClass::new("test::Relay", move |setup| {
            Ok(Box::new(Relay {
                a: setup.add_input("A", "First term")?,
                b: setup.add_input("B", "Second term")?,
                out: setup.add_output("Out", "Sum")?,
                runs: Arc::clone(&counter),
            }))
        }))
        .unwrap();
    factory
        .register(
            ObjectClass::new("test::Label", |setup| {
                Ok(Box::new(Label {
                    _text: setup.add_output("Text", "Label text")?,
                }))
            })
            .capabilities(&[Capability::Dockable]),
        )
        .unwrap();
    factory
        .register(ObjectClass::new("test::ListSink", |setup| {
            let reals = setup.registry().id_of::<Vec<f64>>()?;
            let integers = setup.registry().id_of::<Vec<i32>>()?;
            setup.generic(
                GenericSpec::new("list", "Connect a list here")
                    .accept(TypeFamily::Exact(reals))
                    .accept(TypeFamily::Exact(integers))
                    .input("list", "Connected list", TypeModifier::Same),
            )?;
            Ok(Box::new(Sink))
        }))
        .unwrap();
    Document::builder().factory(Arc::new(factory)).build()
}

fn port(doc: &Document, object: ObjectId, name: &str) -> DataId {
    doc.find_data(object, name).unwrap()
}

/// A -> (B, C) -> D, every object a relay.
fn diamond(doc: &mut Document) -> [ObjectId; 4] {
    let [a, b, c, d] = ["A", "B", "C", "D"].map(|_| doc.create_object("test::Relay").unwrap());
    let out = |doc: &Document, id| port(doc, id, "Out");
    let (a_out, b_out, c_out) = (out(doc, a), out(doc, b), out(doc, c));
    doc.set_parent(port(doc, b, "A"), a_out).unwrap();
    doc.set_parent(port(doc, c, "A"), a_out).unwrap();
    doc.set_parent(port(doc, d, "A"), b_out).unwrap();
    doc.set_parent(port(doc, d, "B"), c_out).unwrap();
    [a, b, c, d]
}

/// Test that a diamond runs producers first and every object once.
#[test]
fn diamond_updates_each_object_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut doc = document(&runs);
    let [a, b, c, d] = diamond(&mut doc);

    doc.set_value(port(&doc, a, "A"), 1.0_f64).unwrap();
    doc.update_object(d).unwrap();
    assert_eq!(doc.last_update_pass(), &[a, b, c, d]);
    assert_eq!(runs.load(Ordering::SeqCst), 4);
    assert_eq!(*doc.get_value::<f64>(port(&doc, d, "Out")).unwrap(), 2.0);

    // Everything is clean, so a second request does nothing.
    doc.update_object(d).unwrap();
    assert!(doc.last_update_pass().is_empty());
    assert_eq!(runs.load(Ordering::SeqCst), 4);

    // Changing the source dirties the whole diamond.
    doc.set_value(port(&doc, a, "A"), 2.0_f64).unwrap();
    assert!([a, b, c, d].iter().all(|id| doc.is_object_dirty(*id)));
    assert_eq!(*doc.get_value::<f64>(port(&doc, d, "Out")).unwrap(), 4.0);
    assert_eq!(doc.last_update_pass(), &[a, b, c, d]);
    assert_eq!(runs.load(Ordering::SeqCst), 8);
}

/// Test that identical documents produce identical update orders.
#[test]
fn update_order_is_deterministic() {
    let positions = |doc: &mut Document| {
        let objects = diamond(doc);
        doc.update_object(objects[3]).unwrap();
        doc.last_update_pass()
            .iter()
            .map(|id| objects.iter().position(|o| o == id).unwrap())
            .collect::<Vec<_>>()
    };
    let runs = Arc::new(AtomicUsize::new(0));
    let first = positions(&mut document(&runs));
    let second = positions(&mut document(&runs));
    assert_eq!(first, second);
    assert_eq!(first, vec![0, 1, 2, 3]);
}

/// Test that ties are broken by port order, not creation order.
#[test]
fn update_order_follows_port_order() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut doc = document(&runs);
    let [a, b, c, d] = ["A", "B", "C", "D"].map(|_| doc.create_object("test::Relay").unwrap());
    let a_out = port(&doc, a, "Out");
    doc.set_parent(port(&doc, b, "A"), a_out).unwrap();
    doc.set_parent(port(&doc, c, "A"), a_out).unwrap();
    doc.set_parent(port(&doc, d, "A"), port(&doc, c, "Out")).unwrap();
    doc.set_parent(port(&doc, d, "B"), port(&doc, b, "Out")).unwrap();

    doc.update_object(d).unwrap();
    assert_eq!(doc.last_update_pass(), &[a, c, b, d]);
}

/// Test that a long chain of objects updates without exhausting the stack.
#[test]
fn long_chains_update_on_a_small_stack() {
    const LENGTH: usize = 10_000;

    let worker = thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut doc = Document::new();
            let mut head = None;
            let mut previous: Option<DataId> = None;
            for _ in 0..LENGTH {
                let add = doc.create_object("math::AddReals").unwrap();
                let input = port(&doc, add, "Input A");
                if let Some(previous) = previous {
                    doc.set_parent(input, previous).unwrap();
                }
                head.get_or_insert(input);
                previous = Some(port(&doc, add, "Result"));
            }
            let (head, tail) = (head.unwrap(), previous.unwrap());

            doc.set_value(head, 1.5_f64).unwrap();
            let value = *doc.get_value::<f64>(tail).unwrap();
            (value, doc.last_update_pass().len())
        })
        .unwrap();

    assert_eq!(worker.join().unwrap(), (1.5, LENGTH));
}

/// Test that update_all only runs dirty objects, in list order.
#[test]
fn update_all_runs_dirty_objects() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut doc = document(&runs);
    let [a, b, c, d] = diamond(&mut doc);
    let lone = doc.create_object("test::Relay").unwrap();

    doc.update_all().unwrap();
    assert_eq!(doc.last_update_pass(), &[a, b, c, d, lone]);

    doc.set_dirty(c).unwrap();
    doc.update_all().unwrap();
    assert_eq!(doc.last_update_pass(), &[c, d]);
}

/// Test that links propagate values and dirtiness.
#[test]
fn links_propagate_values() {
    let mut doc = Document::new();
    let first = doc.create_object("math::AddReals").unwrap();
    let second = doc.create_object("math::AddReals").unwrap();
    doc.set_parent(port(&doc, second, "Input A"), port(&doc, first, "Result"))
        .unwrap();

    doc.set_value(port(&doc, first, "Input A"), 1.5_f64).unwrap();
    doc.set_value(port(&doc, first, "Input B"), 2.0_f64).unwrap();
    doc.set_value(port(&doc, second, "Input B"), 10.0_f64).unwrap();
    let result = port(&doc, second, "Result");
    assert_eq!(*doc.get_value::<f64>(result).unwrap(), 13.5);
    assert!(!doc.is_data_dirty(result));

    // Linked data cannot be set directly.
    let linked = port(&doc, second, "Input A");
    assert!(matches!(
        doc.set_value(linked, 0.0_f64),
        Err(DocumentError::Data(DataError::Linked(_)))
    ));

    // After unlinking, the data keeps the last mirrored value.
    assert_eq!(doc.disconnect(linked).unwrap(), Some(port(&doc, first, "Result")));
    assert_eq!(*doc.get_value::<f64>(linked).unwrap(), 3.5);
    doc.set_value(linked, 0.0_f64).unwrap();
    assert_eq!(*doc.get_value::<f64>(result).unwrap(), 10.0);
}

/// Test that outputs are only written by their object.
#[test]
fn outputs_cannot_be_set_directly() {
    let mut doc = Document::new();
    let add = doc.create_object("math::AddReals").unwrap();
    doc.set_value(port(&doc, add, "Input A"), 2.0_f64).unwrap();
    let result = port(&doc, add, "Result");

    assert!(matches!(
        doc.set_value(result, 42.0_f64),
        Err(DocumentError::Data(DataError::ReadOnly(id))) if id == result
    ));
    assert!(matches!(
        doc.set_value_from_string(result, "42"),
        Err(DocumentError::Data(DataError::ReadOnly(_)))
    ));
    assert!(doc.is_object_dirty(add));
    assert!(doc.is_data_dirty(result));
    assert_eq!(*doc.get_value::<f64>(result).unwrap(), 2.0);
}

/// Test that integer outputs feed real inputs through the converter.
#[test]
fn converters_bridge_linked_types() {
    let mut doc = Document::new();
    let list = doc.create_object("generator::RealList").unwrap();
    let add = doc.create_object("math::AddReals").unwrap();
    let circles = doc.create_object("render::Circles").unwrap();

    // Drawn (integer) -> Input A (real)
    doc.set_parent(port(&doc, add, "Input A"), port(&doc, circles, "Drawn"))
        .unwrap();
    // Values (real list) -> Radius (real list)
    doc.set_parent(port(&doc, circles, "Radius"), port(&doc, list, "Values"))
        .unwrap();

    doc.set_value(port(&doc, circles, "Center"), vec![panda_core::types::Point::new(0.0, 0.0); 3])
        .unwrap();
    assert_eq!(*doc.get_value::<f64>(port(&doc, add, "Result")).unwrap(), 3.0);
}

/// Test that invalid links are refused without changing anything.
#[test]
fn invalid_links_are_refused() {
    let mut doc = Document::new();
    let first = doc.create_object("math::AddReals").unwrap();
    let second = doc.create_object("math::AddReals").unwrap();
    let list = doc.create_object("generator::RealList").unwrap();
    doc.set_parent(port(&doc, second, "Input A"), port(&doc, first, "Result"))
        .unwrap();

    // real_list -> real has no converter.
    let target = port(&doc, first, "Input B");
    let err = doc.set_parent(target, port(&doc, list, "Values")).unwrap_err();
    assert!(matches!(err, DocumentError::Data(DataError::TypeMismatch { .. })));

    // Closing the loop is a cycle.
    let target = port(&doc, first, "Input A");
    let err = doc.set_parent(target, port(&doc, second, "Result")).unwrap_err();
    assert!(matches!(err, DocumentError::Graph(GraphError::CyclicGraph { .. })));
    assert_eq!(doc.data(target).unwrap().parent(), None);

    // Outputs cannot be linked.
    let err = doc
        .set_parent(port(&doc, second, "Result"), port(&doc, list, "Values"))
        .unwrap_err();
    assert!(matches!(err, DocumentError::Data(DataError::NotAnInput(_))));
}

/// Test that dirty_object fires once per clean to dirty transition.
#[test]
fn dirty_object_is_emitted_once_per_transition() {
    let mut doc = Document::new();
    let add = doc.create_object("math::AddReals").unwrap();
    doc.update_object(add).unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let _subscription = doc.signals().dirty_object.connect(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let input = port(&doc, add, "Input A");
    doc.set_value(input, 1.0_f64).unwrap();
    doc.set_value(input, 2.0_f64).unwrap();
    doc.set_dirty(add).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    doc.update_object(add).unwrap();
    doc.set_value(input, 3.0_f64).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

/// Test that accessors mark dependents dirty when dropped.
#[test]
fn accessor_dirties_on_drop() {
    let mut doc = Document::new();
    let list = doc.create_object("generator::RealList").unwrap();
    let values = port(&doc, list, "Values");
    assert_eq!(doc.get_value::<Vec<f64>>(values).unwrap().len(), 5);

    {
        let mut count = doc.accessor::<i32>(port(&doc, list, "Count")).unwrap();
        *count += 2;
    }
    assert!(doc.is_object_dirty(list));
    assert_eq!(doc.get_value::<Vec<f64>>(values).unwrap().len(), 7);
}

/// Test that a layer refuses objects that do not render.
#[test]
fn dock_rejects_incompatible_dockables() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut doc = document(&runs);
    let layer = doc.create_object("render::Layer").unwrap();
    let label = doc.create_object("test::Label").unwrap();
    let circles = doc.create_object("render::Circles").unwrap();

    let err = doc.add_dockable(layer, label, 0).unwrap_err();
    assert!(matches!(
        err,
        DocumentError::Object(ObjectError::IncompatibleDockable { .. })
    ));
    assert!(doc.dockables(layer).unwrap().is_empty());
    assert_eq!(doc.parent_dock(label).unwrap(), None);

    assert_eq!(doc.add_dockable(layer, circles, 10).unwrap(), 0);
    assert_eq!(doc.dockables(layer).unwrap(), &[circles]);
    assert_eq!(doc.parent_dock(circles).unwrap(), Some(layer));

    // A dirty dockable dirties its dock.
    doc.update_object(layer).unwrap();
    assert!(!doc.is_object_dirty(layer));
    doc.set_dirty(circles).unwrap();
    assert!(doc.is_object_dirty(layer));

    assert_eq!(doc.remove_dockable(layer, circles).unwrap(), 0);
    assert_eq!(doc.parent_dock(circles).unwrap(), None);
}

/// Test that generic ports take the exact family of the source.
#[test]
fn generic_connection_picks_exact_family() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut doc = document(&runs);
    let sink = doc.create_object("test::ListSink").unwrap();
    let list = doc.create_object("generator::RealList").unwrap();
    let label = doc.create_object("test::Label").unwrap();
    let connector = port(&doc, sink, "list");

    let input = doc.connect(connector, port(&doc, list, "Values")).unwrap();
    let groups = doc.generic_groups(sink).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].type_id(), doc.registry().id_of::<Vec<f64>>().unwrap());
    assert_eq!(doc.data(input).unwrap().name(), "list #1");
    assert_eq!(doc.find_data(sink, "list #1"), Some(input));

    // Text has no family and no converter.
    let ports_before = doc.object(sink).unwrap().ports().len();
    let err = doc.connect(connector, port(&doc, label, "Text")).unwrap_err();
    assert!(matches!(
        err,
        DocumentError::Object(ObjectError::NoCompatibleType { .. })
    ));
    assert_eq!(doc.object(sink).unwrap().ports().len(), ports_before);
    assert_eq!(doc.generic_groups(sink).unwrap().len(), 1);

    // Disconnecting the group input removes the group.
    doc.disconnect(input).unwrap();
    assert!(doc.generic_groups(sink).unwrap().is_empty());
    assert!(doc.data(input).is_none());
}

/// Test that the identity object forwards values of any type.
#[test]
fn generic_identity_forwards_values() {
    let mut doc = Document::new();
    let add = doc.create_object("math::AddReals").unwrap();
    let list = doc.create_object("generator::RealList").unwrap();
    let identity = doc.create_object("generic::Identity").unwrap();
    let connector = port(&doc, identity, "input");

    doc.set_value(port(&doc, add, "Input A"), 4.0_f64).unwrap();
    doc.connect(connector, port(&doc, add, "Result")).unwrap();
    doc.connect(connector, port(&doc, list, "Values")).unwrap();

    let real = port(&doc, identity, "output #1");
    let reals = port(&doc, identity, "output #2");
    assert_eq!(*doc.get_value::<f64>(real).unwrap(), 4.0);
    assert_eq!(doc.get_value::<Vec<f64>>(reals).unwrap().len(), 5);

    // Removing a source drops the group it fed, and the rest renumbers.
    doc.remove_object(add).unwrap();
    assert_eq!(doc.generic_groups(identity).unwrap().len(), 1);
    assert_eq!(doc.find_data(identity, "output #1"), Some(reals));
}

/// Test that reinsertion moves an object without changing indices.
#[test]
fn reinsertion_keeps_indices() {
    let mut doc = Document::new();
    let ids: Vec<ObjectId> = (0..4)
        .map(|_| doc.create_object("math::AddReals").unwrap())
        .collect();
    let indices: Vec<u32> = ids.iter().map(|id| doc.object(*id).unwrap().index()).collect();

    assert_eq!(doc.reinsert_object(ids[3], 0).unwrap(), 3);
    let order: Vec<ObjectId> = doc.objects().ids().collect();
    assert_eq!(order, vec![ids[3], ids[0], ids[1], ids[2]]);
    for (id, index) in ids.iter().zip(&indices) {
        assert_eq!(doc.object(*id).unwrap().index(), *index);
        assert_eq!(doc.find(*index), Some(*id));
    }

    // Positions past the end are clamped.
    assert_eq!(doc.reinsert_object(ids[3], 99).unwrap(), 0);
    assert_eq!(doc.objects().position(ids[3]), Some(3));
}

/// Test that removing an object unlinks and dirties its dependents.
#[test]
fn removing_a_producer_keeps_the_last_value() {
    let mut doc = Document::new();
    let first = doc.create_object("math::AddReals").unwrap();
    let second = doc.create_object("math::AddReals").unwrap();
    let linked = port(&doc, second, "Input A");
    doc.set_parent(linked, port(&doc, first, "Result")).unwrap();
    doc.set_value(port(&doc, first, "Input A"), 6.0_f64).unwrap();
    assert_eq!(*doc.get_value::<f64>(port(&doc, second, "Result")).unwrap(), 6.0);

    doc.remove_object(first).unwrap();
    assert_eq!(doc.objects().len(), 1);
    assert_eq!(doc.data(linked).unwrap().parent(), None);
    assert_eq!(*doc.get_value::<f64>(linked).unwrap(), 6.0);
}

/// Test the graph queries on a small document.
#[test]
fn graph_queries_follow_links() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut doc = document(&runs);
    let [a, b, c, d] = diamond(&mut doc);
    let lone = doc.create_object("test::Relay").unwrap();

    assert_eq!(connected_components(&doc), vec![vec![a, b, c, d], vec![lone]]);
    assert_eq!(downstream_objects(&doc, a), vec![b, c, d]);

    let boundary = selection_boundary(&doc, &[b, c]);
    assert_eq!(boundary.inputs.len(), 2);
    assert_eq!(boundary.outputs.len(), 2);
}

/// Test that a document survives a save and load through JSON.
#[test]
fn save_and_load_round_trip() {
    let mut doc = Document::new();
    let first = doc.create_object("math::AddReals").unwrap();
    let second = doc.create_object("math::AddReals").unwrap();
    let layer = doc.create_object("render::Layer").unwrap();
    let circles = doc.create_object("render::Circles").unwrap();
    doc.set_parent(port(&doc, second, "Input A"), port(&doc, first, "Result"))
        .unwrap();
    doc.set_value(port(&doc, first, "Input A"), 1.25_f64).unwrap();
    doc.set_value(port(&doc, second, "Input B"), 2.0_f64).unwrap();
    doc.add_dockable(layer, circles, 0).unwrap();

    let text = doc.save().to_json().unwrap();
    let snapshot = DocumentSnapshot::from_json(&text).unwrap();

    let mut loaded = Document::new();
    let report = loaded.load(&snapshot);
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    assert_eq!(report.loaded.len(), 4);

    let (first, second) = (report.loaded[0], report.loaded[1]);
    let (layer, circles) = (report.loaded[2], report.loaded[3]);
    assert_eq!(*loaded.get_value::<f64>(port(&loaded, second, "Result")).unwrap(), 3.25);
    assert_eq!(
        loaded.data(port(&loaded, second, "Input A")).unwrap().parent(),
        Some(port(&loaded, first, "Result"))
    );
    assert_eq!(loaded.dockables(layer).unwrap(), &[circles]);
}

/// Test that infinite and NaN values are saved and loaded back.
#[test]
fn non_finite_values_survive_save_and_load() {
    let mut doc = Document::new();
    let add = doc.create_object("math::AddReals").unwrap();
    doc.set_value(port(&doc, add, "Input A"), f64::INFINITY).unwrap();
    doc.set_value(port(&doc, add, "Input B"), f64::NAN).unwrap();

    let text = doc.save().to_json().unwrap();
    let mut loaded = Document::new();
    let report = loaded.load(&DocumentSnapshot::from_json(&text).unwrap());
    assert!(report.is_clean(), "{:?}", report.diagnostics);

    let add = report.loaded[0];
    assert_eq!(*loaded.get_value::<f64>(port(&loaded, add, "Input A")).unwrap(), f64::INFINITY);
    assert!(loaded.get_value::<f64>(port(&loaded, add, "Input B")).unwrap().is_nan());
}

/// Test that pasting a selection keeps the values of links it cuts.
#[test]
fn pasting_keeps_values_of_cut_links() {
    let mut doc = Document::new();
    let first = doc.create_object("math::AddReals").unwrap();
    let second = doc.create_object("math::AddReals").unwrap();
    doc.set_parent(port(&doc, second, "Input A"), port(&doc, first, "Result"))
        .unwrap();
    doc.set_value(port(&doc, first, "Input A"), 4.5_f64).unwrap();
    assert_eq!(*doc.get_value::<f64>(port(&doc, second, "Result")).unwrap(), 4.5);

    let snapshot = doc.save_objects(&[second]);
    assert!(snapshot.links.is_empty());

    let report = doc.load(&snapshot);
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    let pasted = port(&doc, report.loaded[0], "Input A");
    assert_eq!(doc.data(pasted).unwrap().parent(), None);
    assert_eq!(*doc.get_value::<f64>(pasted).unwrap(), 4.5);
}

/// Test that unknown classes load as placeholders with diagnostics.
#[test]
fn unknown_classes_load_as_placeholders() {
    let mut doc = Document::new();
    let first = doc.create_object("math::AddReals").unwrap();
    let second = doc.create_object("math::AddReals").unwrap();
    doc.set_parent(port(&doc, second, "Input A"), port(&doc, first, "Result"))
        .unwrap();
    doc.set_value(port(&doc, second, "Input B"), 7.0_f64).unwrap();

    let mut snapshot = doc.save();
    snapshot.objects[0].class = "missing::Thing".to_string();

    let mut loaded = Document::new();
    let report = loaded.load(&snapshot);
    assert_eq!(report.loaded.len(), 2);
    assert!(matches!(
        &report.diagnostics[0],
        LoadDiagnostic::UnknownClass { class, .. } if class == "missing::Thing"
    ));
    assert!(matches!(&report.diagnostics[1], LoadDiagnostic::BadLink { .. }));
    assert_eq!(
        loaded.object(report.loaded[0]).unwrap().class().name(),
        PLACEHOLDER_CLASS
    );
    let restored = port(&loaded, report.loaded[1], "Input B");
    assert_eq!(*loaded.get_value::<f64>(restored).unwrap(), 7.0);
}

/// Test that main-thread objects wait for the main thread.
#[test]
fn main_thread_objects_are_deferred() {
    let mut doc = Document::new();
    let list = doc.create_object("generator::RealList").unwrap();
    let circles = doc.create_object("render::Circles").unwrap();
    doc.set_parent(port(&doc, circles, "Radius"), port(&doc, list, "Values"))
        .unwrap();

    // Run the pass on another thread; the circles must wait.
    let mut doc = thread::spawn(move || {
        doc.update_object(circles).unwrap();
        doc
    })
    .join()
    .unwrap();

    assert!(!doc.is_object_dirty(list));
    assert!(doc.is_object_dirty(circles));
    assert_eq!(doc.deferred_objects(), vec![circles]);

    assert_eq!(doc.run_deferred().unwrap(), 1);
    assert!(!doc.is_object_dirty(circles));
    assert!(doc.deferred_objects().is_empty());
}

/// Test that running deferred updates reports every object it ran.
#[test]
fn deferred_pass_lists_every_object() {
    let mut doc = Document::new();
    let first = doc.create_object("render::Circles").unwrap();
    let second = doc.create_object("render::Circles").unwrap();

    let mut doc = thread::spawn(move || {
        doc.update_all().unwrap();
        doc
    })
    .join()
    .unwrap();
    assert_eq!(doc.deferred_objects(), vec![first, second]);

    assert_eq!(doc.run_deferred().unwrap(), 2);
    assert_eq!(doc.last_update_pass(), &[first, second]);
}

/// Test that delayed callbacks reach the document through its mailbox.
#[test]
fn delayed_callbacks_post_to_the_mailbox() {
    let mut doc = Document::new();
    let add = doc.create_object("math::AddReals").unwrap();
    let input = port(&doc, add, "Input A");
    let runner = DelayedRunner::new().unwrap();
    let (tx, rx) = mpsc::channel();

    let mailbox = doc.mailbox();
    runner.schedule(Duration::from_millis(10), move || {
        mailbox.post(move |doc: &mut Document| {
            doc.set_value(input, 9.0_f64).unwrap();
        });
        tx.send(()).unwrap();
    });
    let cancelled = runner.schedule(Duration::from_millis(500), || panic!("cancelled callback ran"));
    assert!(cancelled.cancel());

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(doc.process_posted(), 1);
    assert_eq!(*doc.get_value::<f64>(port(&doc, add, "Result")).unwrap(), 9.0);
}
