use crate::facts::Facts;
use fixflow_types::{PreprocessorConfiguration, UnitId};
use std::sync::Arc;

/// Immutable snapshot of one file's text plus the provider's syntax view of it.
///
/// Cloning is cheap. Transformations never mutate a unit; they produce text that the
/// analysis provider turns into a new snapshot.
#[derive(Clone)]
pub struct SourceUnit {
    id: UnitId,
    text: Arc<str>,
    configuration: Arc<PreprocessorConfiguration>,
    tree: Facts,
}

impl SourceUnit {
    pub fn new(
        id: UnitId,
        text: impl Into<Arc<str>>,
        configuration: PreprocessorConfiguration,
        tree: Facts,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            configuration: Arc::new(configuration),
            tree,
        }
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The configuration this snapshot was parsed under.
    pub fn configuration(&self) -> &PreprocessorConfiguration {
        &self.configuration
    }

    /// Typed access to the provider's syntax tree.
    pub fn tree<T: std::any::Any>(&self) -> Option<&T> {
        self.tree.get::<T>()
    }

    pub fn tree_facts(&self) -> &Facts {
        &self.tree
    }
}

impl std::fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceUnit")
            .field("id", &self.id)
            .field("bytes", &self.text.len())
            .field("configuration", &self.configuration.name)
            .finish()
    }
}
