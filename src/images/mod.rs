pub mod proxy;
pub mod tools;

pub use proxy::ImageProxy;
pub use tools::ImageProxyError;

use tokio::sync::{Semaphore, SemaphorePermit};

/// Caps the number of decode/encode operations running at once in this
/// process. Transforms are CPU-bound; everything past the cap queues.
pub struct TransformLimiter {
    semaphore: Semaphore,
}

impl TransformLimiter {
    pub fn new(permits: usize) -> Self {
        Self {
            semaphore: Semaphore::new(permits.max(1)),
        }
    }

    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        // The semaphore is never closed
        self.semaphore
            .acquire()
            .await
            .expect("Transform semaphore closed")
    }
}
