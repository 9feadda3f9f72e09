use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::api::{BookId, BorrowerId, Fine};
use crate::clock::Clock;
use crate::error::LendingError;
use crate::fines_repository::FinesRepository;

/// Records overdue fines. Amounts are computed by the caller.
pub struct FineLedger {
    fines_repository: Arc<dyn FinesRepository>,
    clock: Arc<dyn Clock>,
}

impl FineLedger {
    pub fn new(fines_repository: Arc<dyn FinesRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fines_repository,
            clock,
        }
    }

    pub async fn create_fine(
        &self,
        borrower_id: BorrowerId,
        book_id: BookId,
        due_date: NaiveDate,
        overdue_days: i64,
        amount: Decimal,
    ) -> Result<Fine, LendingError> {
        let fine = Fine {
            id: Uuid::new_v4(),
            borrower_id,
            book_id,
            amount,
            fine_date: self.clock.now(),
            due_date,
            overdue_days,
            reason: format!("Late return - {} day(s) overdue", overdue_days),
            is_paid: false,
        };

        self.fines_repository.insert_fine(fine.clone()).await?;
        tracing::info!(
            "Fine {} of {} issued to borrower {} for book {}",
            fine.id,
            fine.amount,
            borrower_id,
            book_id
        );
        Ok(fine)
    }

    pub async fn unpaid_fines_by_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Fine>, LendingError> {
        Ok(self
            .fines_repository
            .fines_by_borrower(borrower_id, true)
            .await?)
    }

    pub async fn all_fines_by_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Fine>, LendingError> {
        Ok(self
            .fines_repository
            .fines_by_borrower(borrower_id, false)
            .await?)
    }

    pub async fn fines(
        &self,
        borrower_id: BorrowerId,
        unpaid_only: bool,
    ) -> Result<Vec<Fine>, LendingError> {
        if unpaid_only {
            self.unpaid_fines_by_borrower(borrower_id).await
        } else {
            self.all_fines_by_borrower(borrower_id).await
        }
    }
}

#[cfg(test)]
mod tests_fine_ledger {
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::clock::FixedClock;
    use crate::error::StoreError;
    use crate::fines_repository::{InMemoryFinesRepository, MockFinesRepository};

    fn ledger_at(repository: Arc<dyn FinesRepository>, day: u32) -> FineLedger {
        FineLedger::new(
            repository,
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 4, day, 9, 30, 0).unwrap())),
        )
    }

    #[tokio::test]
    /// 1. Creates a fine, reason and unpaid flag are filled in
    /// 2. Fine is readable through both queries
    async fn test_create_fine_records_it() {
        let repository = Arc::new(InMemoryFinesRepository::default());
        let ledger = ledger_at(repository.clone(), 10);
        let borrower_id = Uuid::new_v4();
        let book_id = Uuid::new_v4();
        let due_date = NaiveDate::from_ymd_opt(2024, 4, 7).unwrap();

        let fine = ledger
            .create_fine(borrower_id, book_id, due_date, 3, dec!(1.50))
            .await
            .unwrap();

        assert_eq!(fine.borrower_id, borrower_id);
        assert_eq!(fine.book_id, book_id);
        assert_eq!(fine.amount, dec!(1.50));
        assert_eq!(fine.due_date, due_date);
        assert_eq!(fine.overdue_days, 3);
        assert_eq!(fine.reason, "Late return - 3 day(s) overdue");
        assert_eq!(
            fine.fine_date,
            Utc.with_ymd_and_hms(2024, 4, 10, 9, 30, 0).unwrap()
        );
        assert!(!fine.is_paid);

        assert_eq!(
            ledger.all_fines_by_borrower(borrower_id).await.unwrap(),
            vec![fine.clone()]
        );
        assert_eq!(
            ledger.unpaid_fines_by_borrower(borrower_id).await.unwrap(),
            vec![fine]
        );
    }

    #[tokio::test]
    async fn test_unknown_borrower_has_no_fines() {
        let ledger = ledger_at(Arc::new(InMemoryFinesRepository::default()), 1);

        assert!(ledger.fines(Uuid::new_v4(), true).await.unwrap().is_empty());
        assert!(ledger.fines(Uuid::new_v4(), false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fines_dispatches_on_unpaid_only() {
        let borrower_id = Uuid::new_v4();
        let mut repository = MockFinesRepository::new();
        repository
            .expect_fines_by_borrower()
            .withf(move |id, unpaid_only| *id == borrower_id && *unpaid_only)
            .times(1)
            .returning(|_, _| Ok(vec![]));
        repository
            .expect_fines_by_borrower()
            .withf(move |id, unpaid_only| *id == borrower_id && !*unpaid_only)
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let ledger = ledger_at(Arc::new(repository), 1);

        ledger.fines(borrower_id, true).await.unwrap();
        ledger.fines(borrower_id, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        let mut repository = MockFinesRepository::new();
        repository
            .expect_insert_fine()
            .returning(|_| Err(StoreError::Other("store unreachable".to_string())));
        let ledger = ledger_at(Arc::new(repository), 1);

        let result = ledger
            .create_fine(
                Uuid::new_v4(),
                Uuid::new_v4(),
                NaiveDate::from_ymd_opt(2024, 3, 30).unwrap(),
                2,
                dec!(1.00),
            )
            .await;

        assert!(matches!(result, Err(LendingError::Persistence(..))));
    }
}
