use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::{BookId, BorrowerId, Reservation, ReservationId};
use crate::error::StoreError;
use crate::reservations_repository::ReservationsRepository;

#[derive(Default)]
pub struct InMemoryReservationsRepository {
    reservations: parking_lot::RwLock<HashMap<ReservationId, Reservation>>,
}

impl InMemoryReservationsRepository {
    fn active_sorted_by_position(&self, filter: impl Fn(&Reservation) -> bool) -> Vec<Reservation> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .read()
            .values()
            .filter(|reservation| reservation.is_active && filter(reservation))
            .cloned()
            .collect();
        reservations.sort_by_key(|reservation| reservation.queue_position);
        reservations
    }
}

#[async_trait::async_trait]
impl ReservationsRepository for InMemoryReservationsRepository {
    async fn enqueue(
        &self,
        borrower_id: BorrowerId,
        book_id: BookId,
        reservation_date: DateTime<Utc>,
    ) -> Result<Reservation, StoreError> {
        let mut reservations_lock = self.reservations.write();

        let queue_size = reservations_lock
            .values()
            .filter(|reservation| reservation.is_active && reservation.book_id == book_id)
            .count();

        let reservation = Reservation {
            id: Uuid::new_v4(),
            borrower_id,
            book_id,
            reservation_date,
            expiration_date: None,
            is_active: true,
            queue_position: queue_size as u32 + 1,
        };
        reservations_lock.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn get_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self.reservations.read().get(&reservation_id).cloned())
    }

    async fn find_active(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .reservations
            .read()
            .values()
            .find(|reservation| {
                reservation.is_active
                    && reservation.book_id == book_id
                    && reservation.borrower_id == borrower_id
            })
            .cloned())
    }

    async fn count_active_for_book(&self, book_id: BookId) -> Result<u32, StoreError> {
        Ok(self
            .reservations
            .read()
            .values()
            .filter(|reservation| reservation.is_active && reservation.book_id == book_id)
            .count() as u32)
    }

    async fn active_for_book(&self, book_id: BookId) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.active_sorted_by_position(|reservation| reservation.book_id == book_id))
    }

    async fn active_for_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.active_sorted_by_position(|reservation| reservation.borrower_id == borrower_id))
    }

    async fn deactivate(
        &self,
        reservation_id: ReservationId,
        borrower_id: BorrowerId,
    ) -> Result<Option<Reservation>, StoreError> {
        let mut reservations_lock = self.reservations.write();

        match reservations_lock.get_mut(&reservation_id) {
            Some(reservation) if reservation.is_active && reservation.borrower_id == borrower_id => {
                reservation.is_active = false;
                Ok(Some(reservation.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_queue_position(
        &self,
        reservation_id: ReservationId,
        queue_position: u32,
    ) -> Result<bool, StoreError> {
        let mut reservations_lock = self.reservations.write();
        if let Some(reservation) = reservations_lock.get_mut(&reservation_id) {
            reservation.queue_position = queue_position;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
