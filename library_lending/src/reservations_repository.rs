pub use in_memory_reservations_repository::InMemoryReservationsRepository;
pub use postgres_reservations_repository::PostgresReservationsRepository;

use chrono::{DateTime, Utc};

use crate::api::{BookId, BorrowerId, Reservation, ReservationId};
use crate::error::StoreError;

mod in_memory_reservations_repository;
mod postgres_reservations_repository;

/// Reservations are never deleted, cancelled or promoted ones are deactivated.
/// Only active reservations hold a queue position.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReservationsRepository: Send + Sync {
    /// Appends an active reservation at the end of the book's queue
    /// (position = number of active reservations + 1) in a single step
    async fn enqueue(
        &self,
        borrower_id: BorrowerId,
        book_id: BookId,
        reservation_date: DateTime<Utc>,
    ) -> Result<Reservation, StoreError>;

    async fn get_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, StoreError>;

    /// Active reservation of the borrower for the book
    async fn find_active(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> Result<Option<Reservation>, StoreError>;

    async fn count_active_for_book(&self, book_id: BookId) -> Result<u32, StoreError>;

    /// Active reservations for the book ordered by queue position
    async fn active_for_book(&self, book_id: BookId) -> Result<Vec<Reservation>, StoreError>;

    /// Active reservations of the borrower ordered by queue position
    async fn active_for_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Deactivates the reservation if it is active and owned by the borrower,
    /// returns the deactivated reservation or None if nothing matched
    async fn deactivate(
        &self,
        reservation_id: ReservationId,
        borrower_id: BorrowerId,
    ) -> Result<Option<Reservation>, StoreError>;

    /// Returns false if the reservation was not found
    async fn set_queue_position(
        &self,
        reservation_id: ReservationId,
        queue_position: u32,
    ) -> Result<bool, StoreError>;
}
