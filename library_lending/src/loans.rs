use std::sync::Arc;

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::api::{BookId, BookReturnResponse, BorrowerId, BorrowerLoan, CopyId, LoanedBook};
use crate::book_locks::BookLocks;
use crate::catalogue_store::CatalogueStore;
use crate::clock::Clock;
use crate::error::LendingError;
use crate::fine_ledger::FineLedger;
use crate::reservation_queue::ReservationQueue;

pub const DAILY_FINE_RATE: Decimal = dec!(0.50);

pub struct LoanReturnProcessor {
    catalogue: Arc<dyn CatalogueStore>,
    fine_ledger: Arc<FineLedger>,
    reservation_queue: Arc<ReservationQueue>,
    clock: Arc<dyn Clock>,
    book_locks: Arc<BookLocks>,
}

impl LoanReturnProcessor {
    pub fn new(
        catalogue: Arc<dyn CatalogueStore>,
        fine_ledger: Arc<FineLedger>,
        reservation_queue: Arc<ReservationQueue>,
        clock: Arc<dyn Clock>,
        book_locks: Arc<BookLocks>,
    ) -> Self {
        Self {
            catalogue,
            fine_ledger,
            reservation_queue,
            clock,
            book_locks,
        }
    }

    /// Borrowers with the books they hold whose loan has not yet run out,
    /// grouped by borrower id
    pub async fn active_loans(&self) -> Result<Vec<BorrowerLoan>, LendingError> {
        let today = self.clock.today();

        let borrower_loans = self
            .catalogue
            .copies_on_loan()
            .await?
            .into_iter()
            .filter(|loan| loan.loan_end_date.map_or(true, |end_date| end_date >= today))
            .sorted_by(|a, b| {
                (&a.borrower.name, a.borrower_id, &a.book.title)
                    .cmp(&(&b.borrower.name, b.borrower_id, &b.book.title))
            })
            .chunk_by(|loan| loan.borrower_id)
            .into_iter()
            .filter_map(|(borrower_id, loans)| {
                let loans = loans.collect_vec();
                let borrower = loans.first()?.borrower.clone();
                Some(BorrowerLoan {
                    borrower_id,
                    borrower_name: borrower.name,
                    borrower_email: borrower.email,
                    loaned_books: loans
                        .into_iter()
                        .map(|loan| LoanedBook {
                            book_id: loan.book_id,
                            book_title: loan.book.title,
                            author_name: loan.book.author,
                            loan_end_date: loan.loan_end_date,
                        })
                        .collect(),
                })
            })
            .collect();

        Ok(borrower_loans)
    }

    /// Closes the borrower's loan of the book.
    /// Overdue returns are fined, a waiting reservation is reported but not converted into a loan.
    pub async fn return_book(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> Result<BookReturnResponse, LendingError> {
        if self.catalogue.get_book(book_id).await?.is_none() {
            tracing::warn!("Return of unknown book {}", book_id);
            return Err(not_on_loan());
        }

        let _book_guard = self.book_locks.lock(book_id).await;

        let Some(copy) = self
            .catalogue
            .find_copy_on_loan(book_id, borrower_id)
            .await?
        else {
            tracing::warn!(
                "Book {} is not on loan to borrower {}",
                book_id,
                borrower_id
            );
            return Err(not_on_loan());
        };

        let today = self.clock.today();
        let overdue = copy
            .loan_end_date
            .filter(|end_date| *end_date < today)
            .map(|end_date| (end_date, (today - end_date).num_days()));

        // Read before any write so a failing read leaves the loan untouched
        let next_reservation = match self.reservation_queue.get_next_reservation(book_id).await? {
            Some(reservation) => Some(self.reservation_queue.reservation_info(&reservation).await?),
            None => None,
        };

        if !self
            .catalogue
            .update_copy_loan(copy.copy_id, None, None)
            .await?
        {
            return Err(LendingError::NotFound(format!(
                "Copy {} disappeared from the catalogue",
                copy.copy_id
            )));
        }

        let mut response = BookReturnResponse {
            success: true,
            message: "Book returned successfully on time.".to_string(),
            fine_issued: None,
            fine_amount: None,
            overdue_days: None,
            next_reservation: None,
        };

        if let Some((due_date, overdue_days)) = overdue {
            let fine_amount = (Decimal::from(overdue_days) * DAILY_FINE_RATE).round_dp(2);

            let fine = match self
                .fine_ledger
                .create_fine(borrower_id, book_id, due_date, overdue_days, fine_amount)
                .await
            {
                Ok(fine) => fine,
                Err(err) => {
                    return Err(self
                        .restore_loan(copy.copy_id, borrower_id, copy.loan_end_date, err)
                        .await);
                }
            };

            response.message = format!(
                "Book returned successfully. Fine of ${:.2} issued for {} day(s) overdue.",
                fine_amount, overdue_days
            );
            response.fine_issued = Some(fine);
            response.fine_amount = Some(fine_amount);
            response.overdue_days = Some(overdue_days);
        }

        if let Some(next_reservation) = next_reservation {
            response.message += &format!(
                " The book is now reserved for {}.",
                next_reservation.borrower_name
            );
            response.next_reservation = Some(next_reservation);
        }

        tracing::info!(
            "Book {} returned by borrower {}: {}",
            book_id,
            borrower_id,
            response.message
        );
        Ok(response)
    }

    /// Puts the copy back on loan after `cause` aborted the return.
    /// A failed restore is reported in the returned error.
    async fn restore_loan(
        &self,
        copy_id: CopyId,
        borrower_id: BorrowerId,
        loan_end_date: Option<NaiveDate>,
        cause: LendingError,
    ) -> LendingError {
        let restore_failure = match self
            .catalogue
            .update_copy_loan(copy_id, Some(borrower_id), loan_end_date)
            .await
        {
            Ok(true) => {
                tracing::warn!("Loan of copy {} restored after failed fine", copy_id);
                return cause;
            }
            Ok(false) => "copy is missing".to_string(),
            Err(err) => err.to_string(),
        };

        tracing::error!(
            "Failed to restore loan of copy {}: {}",
            copy_id,
            restore_failure
        );
        LendingError::LoanNotRestored {
            copy_id,
            cause: Box::new(cause),
            restore_failure,
        }
    }
}

fn not_on_loan() -> LendingError {
    LendingError::NotFound(
        "Book not found or not currently on loan to the specified borrower.".to_string(),
    )
}
