use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Result slot shared between a step's consumer and whoever queued the step.
/// Consumers write into it during a run; the caller reads it afterwards, or a
/// later step's producer reads it mid-chain.
#[derive(Debug, Default)]
pub struct Shared<T>(Arc<Mutex<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock()
    }

    pub fn set(&self, value: T) {
        *self.0.lock() = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.lock())
    }
}

impl<T: Clone> Shared<T> {
    pub fn get(&self) -> T {
        self.0.lock().clone()
    }
}

impl<T: Default> Shared<T> {
    pub fn take(&self) -> T {
        std::mem::take(&mut *self.0.lock())
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}
