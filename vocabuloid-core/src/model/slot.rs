//! Fetch-once cell for lazily loaded fields.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::OnceCell;

/// Observable state of a [`LazySlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unloaded,
    Loading,
    Loaded,
}

/// A field that is fetched on first access and cached afterwards.
///
/// Concurrent first accesses share a single load: one caller runs the
/// loader, the others wait for its outcome. A load that fails or finds no
/// data leaves the slot unloaded so the next access tries again. Once loaded
/// the value never changes.
pub struct LazySlot<T> {
    cell: OnceCell<T>,
    loading: AtomicBool,
}

enum Miss<E> {
    Empty,
    Failed(E),
}

/// Clears the loading flag even when the load future is dropped.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> LazySlot<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// A slot that starts out loaded.
    pub fn loaded(value: T) -> Self {
        Self {
            cell: OnceCell::new_with(Some(value)),
            loading: AtomicBool::new(false),
        }
    }

    /// The cached value, without loading.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn state(&self) -> SlotState {
        if self.cell.initialized() {
            SlotState::Loaded
        } else if self.loading.load(Ordering::Acquire) {
            SlotState::Loading
        } else {
            SlotState::Unloaded
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Return the cached value, running `load` first if there is none.
    ///
    /// `load` returns `Ok(None)` when the service had no data; that surfaces
    /// as `Ok(None)` here and the slot stays unloaded.
    pub async fn get_or_load<E, F, Fut>(&self, load: F) -> Result<Option<&T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(Some(value));
        }

        let outcome = self
            .cell
            .get_or_try_init(|| async {
                let _flag = LoadingFlag::raise(&self.loading);
                match load().await {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => Err(Miss::Empty),
                    Err(e) => Err(Miss::Failed(e)),
                }
            })
            .await;

        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(Miss::Empty) => Ok(None),
            Err(Miss::Failed(e)) => Err(e),
        }
    }
}

impl<T> Default for LazySlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for LazySlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Loaded").field(value).finish(),
            None => write!(f, "{:?}", self.state()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_loads_once() {
        let slot = LazySlot::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = slot
                .get_or_load(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(Some(42))
                })
                .await
                .unwrap();
            assert_eq!(value, Some(&42));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slot.state(), SlotState::Loaded);
    }

    #[tokio::test]
    async fn test_failure_leaves_slot_unloaded() {
        let slot: LazySlot<u32> = LazySlot::new();

        let result = slot.get_or_load(|| async { Err::<Option<u32>, _>("offline") }).await;
        assert_eq!(result, Err("offline"));
        assert_eq!(slot.state(), SlotState::Unloaded);

        let result = slot.get_or_load(|| async { Ok::<_, &str>(Some(5)) }).await;
        assert_eq!(result, Ok(Some(&5)));
    }

    #[tokio::test]
    async fn test_empty_result_leaves_slot_unloaded() {
        let slot: LazySlot<u32> = LazySlot::new();

        let result = slot.get_or_load(|| async { Ok::<_, ()>(None) }).await;
        assert_eq!(result, Ok(None));
        assert!(!slot.is_loaded());
    }

    #[tokio::test]
    async fn test_prefilled_slot_skips_loader() {
        let slot = LazySlot::loaded("inline");
        let result = slot
            .get_or_load(|| async { Err::<Option<&str>, _>("loader ran") })
            .await;
        assert_eq!(result, Ok(Some(&"inline")));
    }

    #[tokio::test]
    async fn test_concurrent_first_access_shares_one_load() {
        let slot = Arc::new(LazySlot::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    slot.get_or_load(|| async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, ()>(Some(vec![1, 2, 3]))
                    })
                    .await
                    .unwrap()
                    .cloned()
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), Some(vec![1, 2, 3]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_state_reports_loading() {
        let slot = Arc::new(LazySlot::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let loader = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move {
                slot.get_or_load(move || async move {
                    rx.await.ok();
                    Ok::<_, ()>(Some(1))
                })
                .await
                .map(|v| v.copied())
            })
        };

        while slot.state() == SlotState::Unloaded {
            tokio::task::yield_now().await;
        }
        assert_eq!(slot.state(), SlotState::Loading);

        tx.send(()).unwrap();
        assert_eq!(loader.await.unwrap(), Ok(Some(1)));
        assert_eq!(slot.state(), SlotState::Loaded);
    }
}
