use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::PipelineError;

/// Bounded pool of outbound-call slots shared by every argument task.
///
/// A permit is held only for the duration of one provider or scorer call.
#[derive(Debug, Clone)]
pub struct OutboundPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl OutboundPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, PipelineError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| PipelineError::Other(anyhow::anyhow!("outbound pool closed: {err}")))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for OutboundPool {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permits_return_on_drop() {
        let pool = OutboundPool::new(2);
        let first = pool.acquire().await.unwrap();
        let _second = pool.acquire().await.unwrap();
        assert_eq!(pool.available(), 0);

        drop(first);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(OutboundPool::new(0).capacity(), 1);
    }
}
