use std::sync::Arc;

use crate::book_locks::BookLocks;
use crate::catalogue_store::CatalogueStore;
use crate::clock::Clock;
use crate::fine_ledger::FineLedger;
use crate::fines_repository::FinesRepository;
use crate::loans::LoanReturnProcessor;
use crate::reservation_queue::ReservationQueue;
use crate::reservations_repository::ReservationsRepository;

/// Domain services wired to one set of stores, shared by all request handlers
#[derive(Clone)]
pub struct LendingServices {
    pub loans: Arc<LoanReturnProcessor>,
    pub reservations: Arc<ReservationQueue>,
    pub fines: Arc<FineLedger>,
}

impl LendingServices {
    pub fn new(
        catalogue: Arc<dyn CatalogueStore>,
        fines_repository: Arc<dyn FinesRepository>,
        reservations_repository: Arc<dyn ReservationsRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let book_locks = Arc::new(BookLocks::default());
        let fines = Arc::new(FineLedger::new(fines_repository, clock.clone()));
        let reservations = Arc::new(ReservationQueue::new(
            catalogue.clone(),
            reservations_repository,
            clock.clone(),
            book_locks.clone(),
        ));
        let loans = Arc::new(LoanReturnProcessor::new(
            catalogue,
            fines.clone(),
            reservations.clone(),
            clock,
            book_locks,
        ));

        Self {
            loans,
            reservations,
            fines,
        }
    }
}
