use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api::BookId;

/// Serializes mutations of the loan and reservation state of a single book.
/// Queue positions are computed from the current queue, so two concurrent
/// writers for the same book would otherwise race between count and insert.
#[derive(Default)]
pub struct BookLocks {
    locks: parking_lot::Mutex<HashMap<BookId, Arc<Mutex<()>>>>,
}

impl BookLocks {
    pub async fn lock(&self, book_id: BookId) -> BookGuard<'_> {
        let book_lock = self.locks.lock().entry(book_id).or_default().clone();
        BookGuard {
            book_locks: self,
            book_id,
            guard: Some(book_lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_books(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Holds the lock of one book, the entry is dropped with its last holder
pub struct BookGuard<'a> {
    book_locks: &'a BookLocks,
    book_id: BookId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for BookGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.book_locks.locks.lock();
        drop(self.guard.take());
        // Waiters clone the entry under the map lock, so a count of one means nobody else uses it
        if locks
            .get(&self.book_id)
            .is_some_and(|book_lock| Arc::strong_count(book_lock) == 1)
        {
            locks.remove(&self.book_id);
        }
    }
}

#[cfg(test)]
mod tests_book_locks {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn test_same_book_is_serialized() {
        let locks = Arc::new(BookLocks::default());
        let book_id = Uuid::new_v4();

        let guard = locks.lock(book_id).await;

        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(book_id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("Lock was not released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_other_books_are_not_blocked() {
        let locks = BookLocks::default();

        let _first = locks.lock(Uuid::new_v4()).await;
        let second = tokio::time::timeout(Duration::from_secs(1), locks.lock(Uuid::new_v4())).await;

        assert!(second.is_ok());
    }

    #[tokio::test]
    /// 1. Entry exists while the book is held or awaited
    /// 2. Releasing the last holder removes it
    async fn test_released_books_are_forgotten() {
        let locks = Arc::new(BookLocks::default());
        let book_id = Uuid::new_v4();

        let guard = locks.lock(book_id).await;
        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(book_id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(locks.tracked_books(), 1);

        drop(guard);
        waiting.await.unwrap();
        assert_eq!(locks.tracked_books(), 0);

        for _ in 0..100 {
            let _guard = locks.lock(Uuid::new_v4()).await;
        }
        assert_eq!(locks.tracked_books(), 0);
    }
}
