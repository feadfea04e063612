use std::panic::{AssertUnwindSafe, catch_unwind};

/// Invoke plug-in code, turning a panic into an ordinary error.
///
/// Rules, analyzers and fixers are third-party code; one of them panicking on one unit
/// must surface as a recoverable failure for that unit only.
pub fn call_plugin<T>(f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };
            Err(anyhow::anyhow!("panicked: {message}"))
        }
    }
}
