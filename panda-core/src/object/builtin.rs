//! Built-in object classes.

use crate::data::DataHandle;
use crate::types::{Color, Point};

use super::class::{ObjectClass, ObjectFactory};
use super::generic::{GenericSpec, TypeFamily, TypeModifier};
use super::panda_object::{PandaObject, UpdateContext};
use super::Capability;

/// Class substituted for unknown classes when loading a document.
pub const PLACEHOLDER_CLASS: &str = "panda::Placeholder";

/// Register every built-in class into `factory`.
pub fn register_builtins(factory: &mut ObjectFactory) {
    let classes = [
        ObjectClass::new(PLACEHOLDER_CLASS, |_| Ok(Box::new(Placeholder)))
            .display_name("Placeholder")
            .description("Stands in for an object whose class is not available"),
        ObjectClass::new("math::AddReals", |setup| {
            Ok(Box::new(AddReals {
                first: setup.add_input("Input A", "First value")?,
                second: setup.add_input("Input B", "Second value")?,
                result: setup.add_output("Result", "Sum of the two values")?,
            }))
        })
        .display_name("Add reals")
        .bases(&["panda::Object"]),
        ObjectClass::new("generator::RealList", |setup| {
            Ok(Box::new(RealList {
                count: setup.add_input_with("Count", "Number of values", 5)?,
                start: setup.add_input("Start", "First value")?,
                step: setup.add_input_with("Step", "Difference between values", 1.0)?,
                values: setup.add_output("Values", "Generated values")?,
            }))
        })
        .display_name("Real list")
        .bases(&["panda::Object"]),
        ObjectClass::new("generic::Identity", |setup| {
            setup.generic(
                GenericSpec::new("input", "Connect any value here")
                    .accept(TypeFamily::AnyValue)
                    .accept(TypeFamily::AnyList)
                    .accept(TypeFamily::AnyAnimation)
                    .input("input", "Value to forward", TypeModifier::Same)
                    .output("output", "Forwarded value", TypeModifier::Same),
            )?;
            Ok(Box::new(Identity))
        })
        .display_name("Identity")
        .bases(&["panda::GenericObject", "panda::Object"]),
        ObjectClass::new("render::Layer", |setup| {
            Ok(Box::new(Layer {
                _opacity: setup.add_input_with("Opacity", "Opacity of the layer", 1.0)?,
            }))
        })
        .display_name("Layer")
        .bases(&["panda::Dock", "panda::Object"])
        .capabilities(&[Capability::Dock]),
        ObjectClass::new("render::Circles", |setup| {
            Ok(Box::new(Circles {
                centers: setup.add_input("Center", "Centers of the circles")?,
                radii: setup.add_input("Radius", "Radius of each circle")?,
                _color: setup.add_input_with("Color", "Fill color", Color::new(0.0, 0.0, 0.0, 1.0))?,
                drawn: setup.add_output("Drawn", "Number of circles drawn")?,
            }))
        })
        .display_name("Circles")
        .bases(&["panda::Renderer", "panda::Dockable", "panda::Object"])
        .capabilities(&[Capability::Dockable, Capability::Renderer, Capability::MainThread]),
    ];

    for class in classes {
        if let Err(err) = factory.register(class) {
            tracing::error!(%err, "failed to register built-in class");
        }
    }
}

struct Placeholder;

impl PandaObject for Placeholder {
    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}
}

struct AddReals {
    first: DataHandle<f64>,
    second: DataHandle<f64>,
    result: DataHandle<f64>,
}

impl PandaObject for AddReals {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let first = ctx.get(self.first).copied().unwrap_or_default();
        let second = ctx.get(self.second).copied().unwrap_or_default();
        ctx.set(self.result, first + second);
    }
}

struct RealList {
    count: DataHandle<i32>,
    start: DataHandle<f64>,
    step: DataHandle<f64>,
    values: DataHandle<Vec<f64>>,
}

impl PandaObject for RealList {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let count = ctx.get(self.count).copied().unwrap_or_default().max(0);
        let start = ctx.get(self.start).copied().unwrap_or_default();
        let step = ctx.get(self.step).copied().unwrap_or_default();
        ctx.with_mut(self.values.id(), |values: &mut Vec<f64>| {
            values.clear();
            values.extend((0..count).map(|i| start + step * f64::from(i)));
        });
    }
}

/// Forwards every connected value unchanged.
struct Identity;

impl PandaObject for Identity {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let pairs: Vec<_> = ctx
            .generic_groups()
            .iter()
            .filter_map(|group| match group.datas() {
                [input, output, ..] => Some((*input, *output)),
                _ => None,
            })
            .collect();
        for (input, output) in pairs {
            ctx.copy_erased(input, output);
        }
    }
}

struct Layer {
    _opacity: DataHandle<f64>,
}

impl PandaObject for Layer {
    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn accepts_dockable(&self, class: &ObjectClass) -> bool {
        class.has_capability(Capability::Renderer)
    }
}

struct Circles {
    centers: DataHandle<Vec<Point>>,
    radii: DataHandle<Vec<f64>>,
    _color: DataHandle<Color>,
    drawn: DataHandle<i32>,
}

impl PandaObject for Circles {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let centers = ctx.get(self.centers).map_or(0, Vec::len);
        let radii = ctx.get(self.radii).map_or(0, Vec::len);
        let drawn = if radii == 0 { 0 } else { centers };
        ctx.set(self.drawn, i32::try_from(drawn).unwrap_or(i32::MAX));
    }
}
