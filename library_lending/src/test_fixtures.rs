use std::sync::Arc;

use chrono::NaiveDate;

use crate::api::{BookDetails, BookId, BorrowerDetails, BorrowerId, CopyId};
use crate::catalogue_store::{CatalogueStore, InMemoryCatalogueStore};
use crate::clock::FixedClock;
use crate::fines_repository::InMemoryFinesRepository;
use crate::lending_services::LendingServices;
use crate::reservations_repository::InMemoryReservationsRepository;

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub(crate) fn today() -> NaiveDate {
    date(2024, 6, 17)
}

/// In-memory stores and services with the clock frozen at `today()`
pub(crate) struct TestLibrary {
    pub catalogue: Arc<InMemoryCatalogueStore>,
    pub fines: Arc<InMemoryFinesRepository>,
    pub reservations: Arc<InMemoryReservationsRepository>,
    pub clock: FixedClock,
    pub services: LendingServices,
}

impl TestLibrary {
    pub fn new() -> Self {
        let catalogue = Arc::new(InMemoryCatalogueStore::default());
        let fines = Arc::new(InMemoryFinesRepository::default());
        let reservations = Arc::new(InMemoryReservationsRepository::default());
        let clock = FixedClock::at_date(today());
        let services = LendingServices::new(
            catalogue.clone(),
            fines.clone(),
            reservations.clone(),
            Arc::new(clock),
        );

        Self {
            catalogue,
            fines,
            reservations,
            clock,
            services,
        }
    }

    pub async fn add_borrower(&self, name: &str) -> BorrowerId {
        self.catalogue
            .add_borrower(BorrowerDetails {
                name: name.to_string(),
                email: format!("{}@library.test", name),
            })
            .await
            .unwrap()
    }

    pub async fn add_book_with_copies(&self, title: &str, copies: usize) -> (BookId, Vec<CopyId>) {
        let book_id = self
            .catalogue
            .add_book(BookDetails {
                title: title.to_string(),
                author: "Frank Herbert".to_string(),
            })
            .await
            .unwrap();

        let mut copy_ids = vec![];
        for _ in 0..copies {
            copy_ids.push(self.catalogue.add_copy(book_id).await.unwrap());
        }
        (book_id, copy_ids)
    }

    pub async fn lend(&self, copy_id: CopyId, borrower_id: BorrowerId, loan_end_date: Option<NaiveDate>) {
        assert!(self
            .catalogue
            .update_copy_loan(copy_id, Some(borrower_id), loan_end_date)
            .await
            .unwrap());
    }
}
