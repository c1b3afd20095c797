// Plugin Registry - registration-ordered set of action plugins

use std::sync::Arc;
use tracing::debug;

use crate::port::ActionPlugin;

/// Plugins registered at process start, immutable for the run's
/// duration. Registration order is plan order.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn ActionPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn ActionPlugin>) {
        debug!(plugin = %plugin.name(), "Registered action plugin");
        self.plugins.push(plugin);
    }

    pub fn plugins(&self) -> &[Arc<dyn ActionPlugin>] {
        &self.plugins
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn ActionPlugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }
}
