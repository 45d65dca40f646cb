//! Application context.
//!
//! Owns the registries that modules populate at startup: representation
//! converters, processor classes and data classes. Networks hold the context
//! through an `Arc`, so it lives until the last network is dropped.

use crate::config::AppConfig;
use crate::datastructures::converter::ConverterRegistry;
use crate::datastructures::data::DataFactory;
use crate::modules::{BaseModule, DeviceModule};
use crate::network::factory::ProcessorFactory;
use std::fmt;

/// A unit of registration: processors, data classes and converters.
pub trait Module: Send + Sync {
    fn identifier(&self) -> &'static str;

    fn register(&self, context: &mut ApplicationContext);
}

pub struct ApplicationContext {
    display_name: String,
    converters: ConverterRegistry,
    processors: ProcessorFactory,
    data: DataFactory,
    modules: Vec<&'static str>,
    torn_down: bool,
}

impl ApplicationContext {
    /// Empty context without any module registered.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            converters: ConverterRegistry::new(),
            processors: ProcessorFactory::new(),
            data: DataFactory::new(),
            modules: Vec::new(),
            torn_down: false,
        }
    }

    /// Context configured from `config` with the built-in modules registered.
    pub fn from_config(display_name: impl Into<String>, config: &AppConfig) -> Self {
        let mut context = Self::new(display_name);
        context.converters = ConverterRegistry::new()
            .with_warn_on_override(config.registry.warn_on_override);
        context.register_default_modules();
        context
    }

    /// Context with default settings and the built-in modules registered.
    pub fn with_default_modules(display_name: impl Into<String>) -> Self {
        let mut context = Self::new(display_name);
        context.register_default_modules();
        context
    }

    fn register_default_modules(&mut self) {
        self.register_module(&BaseModule);
        self.register_module(&DeviceModule);
    }

    /// Register a module. A module identifier is registered at most once.
    pub fn register_module(&mut self, module: &dyn Module) -> bool {
        let identifier = module.identifier();
        if self.modules.contains(&identifier) {
            tracing::warn!("Module {} is already registered", identifier);
            return false;
        }
        module.register(self);
        self.modules.push(identifier);
        tracing::info!(
            "Registered module {} ({} processor classes, {} converters)",
            identifier,
            self.processors.len(),
            self.converters.len()
        );
        true
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn modules(&self) -> &[&'static str] {
        &self.modules
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn converters_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.converters
    }

    pub fn processors(&self) -> &ProcessorFactory {
        &self.processors
    }

    pub fn processors_mut(&mut self) -> &mut ProcessorFactory {
        &mut self.processors
    }

    pub fn data_factory(&self) -> &DataFactory {
        &self.data
    }

    pub fn data_factory_mut(&mut self) -> &mut DataFactory {
        &mut self.data
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Clear every registry. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        tracing::info!(
            "Tearing down {} ({} modules)",
            self.display_name,
            self.modules.len()
        );
        self.processors.clear();
        self.converters.clear();
        self.data = DataFactory::new();
        self.modules.clear();
        self.torn_down = true;
    }
}

impl Drop for ApplicationContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("display_name", &self.display_name)
            .field("modules", &self.modules)
            .field("converters", &self.converters)
            .field("processors", &self.processors)
            .finish()
    }
}
