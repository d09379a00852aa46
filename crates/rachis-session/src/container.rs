use std::sync::{Arc, Mutex, PoisonError};

/// The host element wrapping the embedded frame.
pub trait Container: Send + Sync + 'static {
    /// Set the CSS `height` style, e.g. `"450px"`.
    fn set_height(&self, value: &str);
}

/// Container that records its height style.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    height: Arc<Mutex<Option<String>>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last height style applied, if any.
    pub fn height(&self) -> Option<String> {
        self.height
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Container for MemoryContainer {
    fn set_height(&self, value: &str) {
        *self.height.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
    }
}
