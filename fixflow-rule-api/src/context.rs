use crate::facts::Facts;
use crate::unit::SourceUnit;
use fixflow_types::{PreprocessorConfiguration, UnitId};

/// A project's units plus cross-unit semantic information, under one configuration.
///
/// Read-only from the pipeline's perspective. Units keep the order the project supplied.
#[derive(Debug, Clone)]
pub struct CompilationContext {
    project: String,
    configuration: PreprocessorConfiguration,
    units: Vec<SourceUnit>,
    semantics: Facts,
}

impl CompilationContext {
    pub fn new(
        project: impl Into<String>,
        configuration: PreprocessorConfiguration,
        units: Vec<SourceUnit>,
        semantics: Facts,
    ) -> Self {
        Self {
            project: project.into(),
            configuration,
            units,
            semantics,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn configuration(&self) -> &PreprocessorConfiguration {
        &self.configuration
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn unit(&self, id: &UnitId) -> Option<&SourceUnit> {
        self.units.iter().find(|u| u.id() == id)
    }

    /// Position of `id` in project order.
    pub fn unit_index(&self, id: &UnitId) -> Option<usize> {
        self.units.iter().position(|u| u.id() == id)
    }

    /// Typed access to the provider's cross-unit semantic model.
    pub fn semantics<T: std::any::Any>(&self) -> Option<&T> {
        self.semantics.get::<T>()
    }
}
