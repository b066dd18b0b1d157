//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{GraphLoader, InterviewEngine, SessionService};
use crate::config::Settings;
use crate::domain::NodeGraph;
use crate::infrastructure::traits::{FileSystem, RealFileSystem, Selector, SkimSelector};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Interactive selector used by `interview`
    pub selector: Arc<dyn Selector>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(SkimSelector))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        selector: Arc<dyn Selector>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            selector,
        }
    }

    /// Graph loader validating against the configured root node.
    pub fn graph_loader(&self) -> GraphLoader {
        GraphLoader::new(self.fs.clone(), self.settings.interview.root_node.clone())
    }

    pub fn session_service(&self) -> SessionService {
        SessionService::new(self.fs.clone())
    }

    /// Fresh engine over a loaded graph, configured from settings.
    pub fn engine(&self, graph: Arc<NodeGraph>) -> InterviewEngine {
        InterviewEngine::new(graph, self.settings.interview_options())
    }
}
