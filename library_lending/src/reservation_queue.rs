use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::api::{
    BookAvailabilityInfo, BookId, BorrowerId, Reservation, ReservationId, ReservationInfo,
    ReservationResponse,
};
use crate::book_locks::BookLocks;
use crate::catalogue_store::CatalogueStore;
use crate::clock::Clock;
use crate::error::LendingError;
use crate::reservations_repository::ReservationsRepository;

/// Loans may be renewed, so each loan-end date is pushed back by this many days
const RENEWAL_BUFFER_DAYS: i64 = 7;
const DEFAULT_LOAN_DAYS: i64 = 14;
/// One loan cycle is assumed to serve two queue positions
const DAYS_PER_EXTRA_QUEUE_POSITION: i64 = 14;

/// Estimated date at which the holder of `queue_position` gets a copy.
/// `loan_end_dates` holds one entry per copy currently on loan, None for open-ended loans.
pub fn estimate_available_date(
    loan_end_dates: &[Option<NaiveDate>],
    queue_position: u32,
    today: NaiveDate,
) -> NaiveDate {
    if loan_end_dates.is_empty() {
        return today;
    }

    let mut availability_dates: Vec<NaiveDate> = loan_end_dates
        .iter()
        .flatten()
        .map(|end_date| *end_date + Duration::days(RENEWAL_BUFFER_DAYS))
        .collect();
    availability_dates.sort();

    let position = queue_position.max(1) as usize;
    if let Some(date) = availability_dates.get(position - 1) {
        return *date;
    }

    let last_available_date = availability_dates
        .last()
        .copied()
        .unwrap_or(today + Duration::days(DEFAULT_LOAN_DAYS));
    let extra_positions = (position - availability_dates.len()) as i64;
    last_available_date + Duration::days(extra_positions * DAYS_PER_EXTRA_QUEUE_POSITION)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationCreated {
    pub reservation: Reservation,
    pub estimated_available_date: NaiveDate,
}

impl From<ReservationCreated> for ReservationResponse {
    fn from(created: ReservationCreated) -> Self {
        Self {
            success: true,
            message: "Reservation created successfully.".to_string(),
            reservation_id: Some(created.reservation.id),
            queue_position: Some(created.reservation.queue_position),
            estimated_available_date: Some(created.estimated_available_date),
        }
    }
}

impl ReservationResponse {
    pub fn rejected(error: &LendingError) -> Self {
        let (reservation_id, queue_position) = match error {
            LendingError::Conflict {
                reservation_id,
                queue_position,
            } => (Some(*reservation_id), Some(*queue_position)),
            _ => (None, None),
        };
        Self {
            success: false,
            message: error.to_string(),
            reservation_id,
            queue_position,
            estimated_available_date: None,
        }
    }
}

/// Per-book waiting lists. Active positions of a book always form 1..=N.
pub struct ReservationQueue {
    catalogue: Arc<dyn CatalogueStore>,
    reservations: Arc<dyn ReservationsRepository>,
    clock: Arc<dyn Clock>,
    book_locks: Arc<BookLocks>,
}

impl ReservationQueue {
    pub fn new(
        catalogue: Arc<dyn CatalogueStore>,
        reservations: Arc<dyn ReservationsRepository>,
        clock: Arc<dyn Clock>,
        book_locks: Arc<BookLocks>,
    ) -> Self {
        Self {
            catalogue,
            reservations,
            clock,
            book_locks,
        }
    }

    /// Puts the borrower at the end of the book's queue.
    /// Only possible when every copy of the book is on loan.
    pub async fn create_reservation(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> Result<ReservationCreated, LendingError> {
        if self.catalogue.get_book(book_id).await?.is_none() {
            return Err(LendingError::NotFound("Book not found.".to_string()));
        }
        if self.catalogue.get_borrower(borrower_id).await?.is_none() {
            return Err(LendingError::NotFound("Borrower not found.".to_string()));
        }

        let _book_guard = self.book_locks.lock(book_id).await;

        // A cancellation whose renumbering failed leaves a gap, close it before appending
        if self.repack_queue(book_id).await? {
            tracing::warn!("Queue of book {} had gaps and was renumbered", book_id);
        }

        if let Some(existing) = self.reservations.find_active(book_id, borrower_id).await? {
            tracing::warn!(
                "Borrower {} already holds reservation {} for book {}",
                borrower_id,
                existing.id,
                book_id
            );
            return Err(LendingError::Conflict {
                reservation_id: existing.id,
                queue_position: existing.queue_position,
            });
        }

        let copies = self.catalogue.copies_of_book(book_id).await?;
        if copies.iter().any(|copy| copy.is_available()) {
            return Err(LendingError::InvalidOperation(
                "Book is currently available for immediate checkout. No reservation needed."
                    .to_string(),
            ));
        }

        let reservation = self
            .reservations
            .enqueue(borrower_id, book_id, self.clock.now())
            .await?;

        let loan_end_dates: Vec<Option<NaiveDate>> =
            copies.iter().map(|copy| copy.loan_end_date).collect();
        let estimated_available_date = estimate_available_date(
            &loan_end_dates,
            reservation.queue_position,
            self.clock.today(),
        );

        tracing::info!(
            "Reservation {} for book {} created at position {}",
            reservation.id,
            book_id,
            reservation.queue_position
        );
        Ok(ReservationCreated {
            reservation,
            estimated_available_date,
        })
    }

    /// Cancels an active reservation owned by the borrower.
    /// Returns false when there is no such reservation, whoever owns it.
    pub async fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
        borrower_id: BorrowerId,
    ) -> Result<bool, LendingError> {
        let Some(reservation) = self.reservations.get_reservation(reservation_id).await? else {
            tracing::warn!("Reservation {} not found for cancellation", reservation_id);
            return Ok(false);
        };

        let _book_guard = self.book_locks.lock(reservation.book_id).await;

        if self
            .reservations
            .deactivate(reservation_id, borrower_id)
            .await?
            .is_none()
        {
            tracing::warn!(
                "Reservation {} not active or not owned by borrower {}",
                reservation_id,
                borrower_id
            );
            return Ok(false);
        }

        self.repack_queue(reservation.book_id).await?;
        tracing::info!("Reservation {} cancelled", reservation_id);
        Ok(true)
    }

    /// Renumbers active reservations of the book to 1..=N keeping their order.
    /// Returns true if any position changed.
    pub async fn update_reservation_queue(&self, book_id: BookId) -> Result<bool, LendingError> {
        let _book_guard = self.book_locks.lock(book_id).await;
        self.repack_queue(book_id).await
    }

    async fn repack_queue(&self, book_id: BookId) -> Result<bool, LendingError> {
        let mut changed = false;
        for (reservation, queue_position) in self
            .reservations
            .active_for_book(book_id)
            .await?
            .into_iter()
            .zip(1..)
        {
            if reservation.queue_position != queue_position {
                self.reservations
                    .set_queue_position(reservation.id, queue_position)
                    .await?;
                changed = true;
            }
        }
        Ok(changed)
    }

    pub async fn get_next_reservation(
        &self,
        book_id: BookId,
    ) -> Result<Option<Reservation>, LendingError> {
        Ok(self
            .reservations
            .active_for_book(book_id)
            .await?
            .into_iter()
            .next())
    }

    pub async fn reservations_by_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Reservation>, LendingError> {
        Ok(self.reservations.active_for_borrower(borrower_id).await?)
    }

    pub async fn reservations_by_book(
        &self,
        book_id: BookId,
    ) -> Result<Vec<Reservation>, LendingError> {
        Ok(self.reservations.active_for_book(book_id).await?)
    }

    pub async fn reservation_info(
        &self,
        reservation: &Reservation,
    ) -> Result<ReservationInfo, LendingError> {
        let borrower_name = self
            .catalogue
            .get_borrower(reservation.borrower_id)
            .await?
            .map(|borrower| borrower.name)
            .unwrap_or_default();

        Ok(ReservationInfo {
            reservation_id: reservation.id,
            borrower_id: reservation.borrower_id,
            borrower_name,
            reservation_date: reservation.reservation_date,
            queue_position: reservation.queue_position,
        })
    }

    /// Copies, queue and estimated availability of the next queue slot.
    /// Unknown books yield `BookAvailabilityInfo::default()`.
    pub async fn book_availability(
        &self,
        book_id: BookId,
    ) -> Result<BookAvailabilityInfo, LendingError> {
        let Some(book) = self.catalogue.get_book(book_id).await? else {
            return Ok(BookAvailabilityInfo::default());
        };

        let copies = self.catalogue.copies_of_book(book_id).await?;
        let loan_end_dates: Vec<Option<NaiveDate>> = copies
            .iter()
            .filter(|copy| !copy.is_available())
            .map(|copy| copy.loan_end_date)
            .collect();
        let available_copies = copies.len() - loan_end_dates.len();

        let reservations = self.reservations.active_for_book(book_id).await?;
        let mut reservation_queue = Vec::with_capacity(reservations.len());
        for reservation in reservations.iter() {
            reservation_queue.push(self.reservation_info(reservation).await?);
        }

        let reservation_count = reservations.len() as u32;
        Ok(BookAvailabilityInfo {
            book_id,
            book_title: book.title,
            author_name: book.author,
            is_available: available_copies > 0,
            current_loan_end_date: loan_end_dates.iter().flatten().min().copied(),
            total_copies: copies.len() as u32,
            available_copies: available_copies as u32,
            reservation_count,
            estimated_available_date: Some(estimate_available_date(
                &loan_end_dates,
                reservation_count + 1,
                self.clock.today(),
            )),
            reservation_queue,
        })
    }
}
