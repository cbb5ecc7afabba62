use fxhash::FxHashMap;

use super::ad9249::AD9249Converter;
use super::config::Configuration;
use super::constants::AD9249_EVENT_NAME;
use super::converter::{Converter, StreamContext};
use super::detector_id::DetectorId;
use super::error::{ConverterError, RegistryError};
use super::raw_event::RawEvent;
use super::standard_event::StandardEvent;

/// Constructor for a converter
pub type ConverterFactory = fn() -> Box<dyn Converter>;

#[derive(Debug, Clone)]
struct Registration {
    name: String,
    factory: ConverterFactory,
}

/// ConverterRegistry maps detector identifiers to converter factories.
///
/// The registry is filled once during startup and is read-only afterwards. Each detector
/// type may be registered only once; a second registration for the same identifier is
/// rejected instead of replacing the first.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    factories: FxHashMap<DetectorId, Registration>,
}

impl ConverterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every converter shipped with this library
    pub fn with_builtin_converters() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_name(AD9249_EVENT_NAME, AD9249Converter::factory)?;
        Ok(registry)
    }

    /// Register a factory for a detector identifier
    pub fn register(
        &mut self,
        id: DetectorId,
        name: &str,
        factory: ConverterFactory,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.factories.get(&id) {
            spdlog::error!(
                "Refusing to register {} as detector type {}; already taken by {}",
                name,
                id,
                existing.name
            );
            return Err(RegistryError::DuplicateDetectorType {
                id: id.as_u32(),
                name: name.to_string(),
            });
        }
        spdlog::debug!("Registered converter {} as detector type {}", name, id);
        self.factories.insert(
            id,
            Registration {
                name: name.to_string(),
                factory,
            },
        );
        Ok(())
    }

    /// Register a factory under the identifier computed from a detector-type name
    pub fn register_name(
        &mut self,
        name: &str,
        factory: ConverterFactory,
    ) -> Result<(), RegistryError> {
        self.register(DetectorId::from_name(name), name, factory)
    }

    /// Create the converter registered for a detector identifier
    pub fn resolve(&self, id: DetectorId) -> Result<Box<dyn Converter>, RegistryError> {
        self.factories
            .get(&id)
            .map(|registration| (registration.factory)())
            .ok_or(RegistryError::UnknownDetectorType(id.as_u32()))
    }

    /// Names of all registered detector types, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.values().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Dispatch a raw event to the converter for its detector type and convert it.
    ///
    /// An unknown detector type is a hard error. Everything else follows the converter
    /// contract.
    pub fn convert(
        &self,
        raw: &RawEvent,
        event: &mut StandardEvent,
        conf: &Configuration,
        ctx: &mut StreamContext,
    ) -> Result<bool, ConverterError> {
        let converter = self.resolve(raw.detector_id()).map_err(|e| {
            spdlog::error!("{e} (event {})", raw.event_number());
            ConverterError::UnknownDetector(e)
        })?;
        converter.convert(raw, event, conf, ctx)
    }
}
