use std::any::Any;
use std::sync::Arc;

/// Opaque, shareable value produced by an analysis provider.
///
/// The pipeline never looks inside; rules and the provider that produced the value agree
/// on its concrete type and recover it with [`Facts::get`].
#[derive(Clone, Default)]
pub struct Facts(Option<Arc<dyn Any + Send + Sync>>);

impl Facts {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl std::fmt::Debug for Facts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Facts(..)"),
            None => f.write_str("Facts(none)"),
        }
    }
}
