//! Navigator that records redirects instead of performing them.

use session_core::Navigator;
use std::sync::Mutex;

/// Records every URI passed to [`Navigator::redirect_to`].
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All redirect targets, in call order.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects.lock().unwrap().len()
    }

    pub fn last_redirect(&self) -> Option<String> {
        self.redirects.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to(&self, uri: &str) {
        self.redirects.lock().unwrap().push(uri.to_string());
    }
}
