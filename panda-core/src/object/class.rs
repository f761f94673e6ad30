//! Object classes and the factory.

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

use super::panda_object::{ObjectSetup, PandaObject};
use super::{Capability, ObjectError};

/// Builds the behavior of a new object, declaring its ports on the way.
pub type Creator =
    Box<dyn Fn(&mut ObjectSetup<'_>) -> Result<Box<dyn PandaObject>, ObjectError> + Send + Sync>;

/// A registered kind of object.
pub struct ObjectClass {
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    bases: &'static [&'static str],
    capabilities: &'static [Capability],
    creator: Creator,
}

impl ObjectClass {
    /// Create a class with the given unique name.
    pub fn new<F>(name: &'static str, creator: F) -> Self
    where
        F: Fn(&mut ObjectSetup<'_>) -> Result<Box<dyn PandaObject>, ObjectError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            display_name: name,
            description: "",
            bases: &[],
            capabilities: &[],
            creator: Box::new(creator),
        }
    }

    /// Set the name shown in menus.
    pub fn display_name(mut self, display_name: &'static str) -> Self {
        self.display_name = display_name;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the chain of base class names, closest first.
    pub fn bases(mut self, bases: &'static [&'static str]) -> Self {
        self.bases = bases;
        self
    }

    /// Set the capabilities of the class.
    pub fn capabilities(mut self, capabilities: &'static [Capability]) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get_display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn get_description(&self) -> &'static str {
        self.description
    }

    pub fn get_bases(&self) -> &'static [&'static str] {
        self.bases
    }

    pub fn get_capabilities(&self) -> &'static [Capability] {
        self.capabilities
    }

    /// Whether objects of this class have a capability.
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether this class is `base` or derives from it.
    pub fn inherits(&self, base: &str) -> bool {
        self.name == base || self.bases.contains(&base)
    }

    pub(crate) fn create(
        &self,
        setup: &mut ObjectSetup<'_>,
    ) -> Result<Box<dyn PandaObject>, ObjectError> {
        (self.creator)(setup)
    }
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectClass")
            .field("name", &self.name)
            .field("bases", &self.bases)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Registry of object classes, keyed by class name.
///
/// Like the type registry, a factory is filled during start-up and shared
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct ObjectFactory {
    classes: IndexMap<&'static str, Arc<ObjectClass>>,
}

static GLOBAL: OnceLock<Arc<ObjectFactory>> = OnceLock::new();

impl ObjectFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory holding the built-in classes.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        super::builtin::register_builtins(&mut factory);
        factory
    }

    /// The process-wide factory with the built-in classes.
    pub fn global() -> Arc<ObjectFactory> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_builtins())))
    }

    /// Register a class. Names must be unique.
    pub fn register(&mut self, class: ObjectClass) -> Result<(), ObjectError> {
        if self.classes.contains_key(class.name) {
            return Err(ObjectError::DuplicateClass(class.name.to_string()));
        }
        tracing::debug!(class = class.name, "registered object class");
        self.classes.insert(class.name, Arc::new(class));
        Ok(())
    }

    /// Look a class up by name.
    pub fn class(&self, name: &str) -> Option<Arc<ObjectClass>> {
        self.classes.get(name).cloned()
    }

    /// Iterate over the classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<ObjectClass>> {
        self.classes.values()
    }

    /// Classes deriving from `base`.
    pub fn inheriting<'a>(&'a self, base: &'a str) -> impl Iterator<Item = &'a Arc<ObjectClass>> {
        self.classes.values().filter(move |class| class.inherits(base))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
