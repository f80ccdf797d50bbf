use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::BackendError;

/// A long-lived execution context created on first use.
///
/// Concurrent first uses share a single initialization. [`LazyContext::take`]
/// hands the context back for release exactly once; afterwards the slot is
/// empty and the next use creates a fresh context.
pub struct LazyContext<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> LazyContext<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<T>, BackendError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(context) = slot.as_ref() {
            return Ok(Arc::clone(context));
        }
        let context = Arc::new(init().await?);
        *slot = Some(Arc::clone(&context));
        Ok(context)
    }

    /// Empties the slot, returning the context if one was acquired.
    pub async fn take(&self) -> Option<Arc<T>> {
        self.slot.lock().await.take()
    }

    pub async fn is_acquired(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl<T> Default for LazyContext<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_initializes_once() {
        let context: LazyContext<usize> = LazyContext::new();
        let inits = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = context
                .get_or_try_init(|| async {
                    inits.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_first_use_initializes_once() {
        let context: LazyContext<usize> = LazyContext::new();
        let inits = &AtomicUsize::new(0);
        let init = move || async move {
            inits.fetch_add(1, Ordering::SeqCst);
            // Suspends while the other caller is polled
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(9)
        };

        let (first, second) =
            tokio::join!(context.get_or_try_init(init), context.get_or_try_init(init));

        let (first, second) = (first.unwrap(), second.unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, 9);
        assert_eq!(inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_init_leaves_slot_empty() {
        let context: LazyContext<usize> = LazyContext::new();
        let result = context
            .get_or_try_init(|| async { Err(BackendError::Context("offline".into())) })
            .await;
        assert!(result.is_err());
        assert!(!context.is_acquired().await);
    }

    #[tokio::test]
    async fn test_take_is_exactly_once() {
        let context: LazyContext<&str> = LazyContext::new();
        assert!(context.take().await.is_none());

        context.get_or_try_init(|| async { Ok("sandbox") }).await.unwrap();
        assert!(context.take().await.is_some());
        assert!(context.take().await.is_none());
    }
}
