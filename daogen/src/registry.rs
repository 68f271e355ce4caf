//! Synthesis-time configuration: value generators and the encryption hook.
//!
//! Generators can be registered on a [`FunctionRegistry`] directly or
//! submitted from anywhere in the dependency graph through `inventory`:
//!
//! ```ignore
//! daogen::inventory::submit! {
//!     daogen::GeneratorRegistration::new("uuid", daogen::CallDescriptor::fixed("uuid.New", 0))
//! }
//! ```

use indexmap::IndexMap;
use log::debug;

use crate::errors::{Result, SynthError};
use crate::ir::CallDescriptor;
use crate::ir::functions::{ENCRYPT_PASSWORD, TIME_NOW};

/// A named value generator submitted at link time.
#[derive(Debug)]
pub struct GeneratorRegistration {
    pub name: &'static str,
    pub descriptor: CallDescriptor,
}

impl GeneratorRegistration {
    pub const fn new(name: &'static str, descriptor: CallDescriptor) -> Self {
        Self { name, descriptor }
    }
}

inventory::collect!(GeneratorRegistration);

/// All generators submitted through `inventory`.
pub fn registered_generators() -> impl Iterator<Item = &'static GeneratorRegistration> {
    inventory::iter::<GeneratorRegistration>()
}

/// Symbolic function names usable as write-path value generators.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: IndexMap<String, CallDescriptor>,
}

impl FunctionRegistry {
    /// Registry without any function.
    pub fn empty() -> Self {
        Self {
            functions: IndexMap::new(),
        }
    }

    /// Registry seeded with `now` and every submitted [`GeneratorRegistration`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("now", TIME_NOW);
        for registration in registered_generators() {
            debug!("registering generator `{}` from inventory", registration.name);
            registry.register(registration.name, registration.descriptor.clone());
        }
        registry
    }

    /// Adds or replaces a generator. Returns the previous descriptor.
    pub fn register(&mut self, name: impl Into<String>, descriptor: CallDescriptor) -> Option<CallDescriptor> {
        self.functions.insert(name.into(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&CallDescriptor> {
        self.functions.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<&CallDescriptor> {
        self.get(name)
            .ok_or_else(|| SynthError::UnknownGenerator(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

static DEFAULT_ENCRYPTION: CallDescriptor = ENCRYPT_PASSWORD;

/// Function applied to encrypted fields before they are bound.
///
/// Can be set once. Until then `encryptPassword(value)` is used.
#[derive(Debug, Default)]
pub struct EncryptionHook {
    registered: Option<CallDescriptor>,
}

impl EncryptionHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `descriptor`. A second call fails and keeps the first one.
    ///
    /// Takes `&mut self`, so the hook cannot change while a
    /// [`Synthesizer`](crate::Synthesizer) borrows the config:
    ///
    /// ```compile_fail
    /// use daogen::{CallDescriptor, GoSourceBuilder, SynthConfig, Synthesizer};
    ///
    /// let mut config = SynthConfig::new();
    /// let builder = GoSourceBuilder::new();
    /// let synth = Synthesizer::new(&builder, &config);
    /// config.encryption.register(CallDescriptor::fixed("vault.Seal", 1)).unwrap();
    /// drop(synth);
    /// ```
    pub fn register(&mut self, descriptor: CallDescriptor) -> Result<()> {
        descriptor.check_args(1)?;
        if let Some(existing) = &self.registered {
            return Err(SynthError::DuplicateHook {
                existing: existing.function.to_string(),
            });
        }
        debug!("registering encryption function `{}`", descriptor.function);
        self.registered = Some(descriptor);
        Ok(())
    }

    pub fn current(&self) -> &CallDescriptor {
        self.registered.as_ref().unwrap_or(&DEFAULT_ENCRYPTION)
    }

    pub fn is_registered(&self) -> bool {
        self.registered.is_some()
    }
}

/// Everything synthesis reads besides the fields themselves.
#[derive(Debug, Default)]
pub struct SynthConfig {
    pub functions: FunctionRegistry,
    pub encryption: EncryptionHook,
}

impl SynthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, name: impl Into<String>, descriptor: CallDescriptor) -> Self {
        self.functions.register(name, descriptor);
        self
    }

    pub fn with_encryption(mut self, descriptor: CallDescriptor) -> Result<Self> {
        self.encryption.register(descriptor)?;
        Ok(self)
    }
}
