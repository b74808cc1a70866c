//! Command registry: sub-command factories discovered from a plugin source.

use crate::cli::command::Command;
use crate::cli::options::Configuration;
use crate::error::CliError;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// A pluggable sub-command: metadata, an options schema and a command builder.
pub trait CommandFactory: Send + Sync {
    /// Long command name
    fn name(&self) -> &str;

    /// Short command name
    fn shortcut(&self) -> Option<&str> {
        None
    }

    fn description(&self) -> &str;

    /// Options schema for the sub-command. Name, about text and alias are
    /// filled in by the options parser.
    fn options(&self) -> clap::Command {
        clap::Command::new(self.name().to_string())
    }

    /// Build a command from the sub-command's parsed configuration.
    fn build_command(&self, config: Configuration) -> anyhow::Result<Command>;
}

/// Where command factories come from.
pub trait PluginSource: Send + Sync {
    fn discover(&self) -> Vec<Arc<dyn CommandFactory>>;
}

/// Plugin source backed by factories registered at compile time.
#[derive(Default)]
pub struct StaticPlugins {
    factories: Vec<Arc<dyn CommandFactory>>,
}

impl StaticPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, factory: impl CommandFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    pub fn register(&mut self, factory: Arc<dyn CommandFactory>) {
        self.factories.push(factory);
    }
}

impl PluginSource for StaticPlugins {
    fn discover(&self) -> Vec<Arc<dyn CommandFactory>> {
        self.factories.clone()
    }
}

struct Catalog {
    ordered: Vec<Arc<dyn CommandFactory>>,
    by_name: HashMap<String, usize>,
}

/// Name → factory mapping, discovered lazily and exactly once.
pub struct CommandRegistry {
    source: Box<dyn PluginSource>,
    catalog: OnceLock<Catalog>,
}

impl CommandRegistry {
    pub fn new(source: impl PluginSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            catalog: OnceLock::new(),
        }
    }

    /// Get a command factory by name
    pub fn get_command(&self, name: &str) -> Result<Arc<dyn CommandFactory>, CliError> {
        let catalog = self.catalog();
        catalog
            .by_name
            .get(name)
            .map(|&i| Arc::clone(&catalog.ordered[i]))
            .ok_or_else(|| CliError::NotFound(name.to_string()))
    }

    /// All factories in discovery order.
    pub fn commands(&self) -> &[Arc<dyn CommandFactory>] {
        &self.catalog().ordered
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands().iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands().is_empty()
    }

    fn catalog(&self) -> &Catalog {
        self.catalog.get_or_init(|| {
            let mut ordered: Vec<Arc<dyn CommandFactory>> = Vec::new();
            let mut by_name = HashMap::new();
            for factory in self.source.discover() {
                let name = factory.name().to_string();
                if by_name.contains_key(&name) {
                    warn!(command = %name, "Ignoring duplicate command plugin");
                    continue;
                }
                debug!(command = %name, "Loaded command");
                by_name.insert(name, ordered.len());
                ordered.push(factory);
            }
            Catalog { ordered, by_name }
        })
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Option<Vec<&str>> = self
            .catalog
            .get()
            .map(|c| c.ordered.iter().map(|f| f.name()).collect());
        f.debug_struct("CommandRegistry")
            .field("commands", &names)
            .finish()
    }
}
