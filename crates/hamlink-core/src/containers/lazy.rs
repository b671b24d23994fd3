// ── Lazy fields ──
//
// A field is fetched at most once. "Unavailable" is a memoized outcome of
// its own, so a value the device does not have is never asked for again.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::OnceCell;

/// Observable state of a lazy field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldState<'a, T> {
    NotFetched,
    Unavailable,
    Value(&'a T),
}

#[derive(Debug)]
pub struct LazyValue<T> {
    cell: OnceCell<Option<T>>,
}

impl<T> Default for LazyValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyValue<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Already-settled field; reading it never queries anything.
    pub fn resolved(value: Option<T>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(value)),
        }
    }

    pub fn state(&self) -> FieldState<'_, T> {
        match self.cell.get() {
            None => FieldState::NotFetched,
            Some(None) => FieldState::Unavailable,
            Some(Some(value)) => FieldState::Value(value),
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.cell.initialized()
    }

    /// Value if fetched and available; never triggers a fetch.
    pub fn peek(&self) -> Option<&T> {
        self.cell.get().and_then(Option::as_ref)
    }

    /// Runs `fetch` on first access only; concurrent readers wait for the
    /// same attempt.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Option<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        self.cell.get_or_init(fetch).await.as_ref()
    }

    /// Settles the field from a batch fetch. Returns `false` if it was
    /// already settled.
    pub fn fill(&self, value: Option<T>) -> bool {
        self.cell.set(value).is_ok()
    }
}

/// Accumulated time spent in device round trips.
#[derive(Debug, Default)]
pub struct QueryTimer {
    nanos: AtomicU64,
}

impl QueryTimer {
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn unavailable_is_memoized() {
        let calls = AtomicUsize::new(0);
        let field: LazyValue<f64> = LazyValue::new();
        assert_eq!(field.state(), FieldState::NotFetched);

        for _ in 0..3 {
            let value = field
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    None
                })
                .await;
            assert!(value.is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(field.state(), FieldState::Unavailable);
    }

    #[tokio::test]
    async fn fill_settles_only_once() {
        let field = LazyValue::new();
        assert!(field.fill(Some(7_u32)));
        assert!(!field.fill(None));
        assert_eq!(field.peek(), Some(&7));
        let value = field.get_or_fetch(|| async { Some(9) }).await;
        assert_eq!(value, Some(&7));
    }

    #[test]
    fn resolved_fields_are_fetched() {
        let field: LazyValue<String> = LazyValue::resolved(None);
        assert!(field.is_fetched());
        assert_eq!(field.state(), FieldState::Unavailable);
    }
}
