use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::api::{
    BookCopy, BookDetails, BookId, BorrowerDetails, BorrowerId, CopyId, CopyOnLoan,
};
use crate::catalogue_store::CatalogueStore;
use crate::error::StoreError;

#[derive(Default)]
pub struct InMemoryCatalogueStore {
    books: parking_lot::RwLock<HashMap<BookId, BookDetails>>,
    borrowers: parking_lot::RwLock<HashMap<BorrowerId, BorrowerDetails>>,
    copies: parking_lot::RwLock<HashMap<CopyId, BookCopy>>,
}

#[async_trait::async_trait]
impl CatalogueStore for InMemoryCatalogueStore {
    async fn add_book(&self, details: BookDetails) -> Result<BookId, StoreError> {
        let id = Uuid::new_v4();
        self.books.write().insert(id, details);
        Ok(id)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Option<BookDetails>, StoreError> {
        Ok(self.books.read().get(&book_id).cloned())
    }

    async fn add_borrower(&self, details: BorrowerDetails) -> Result<BorrowerId, StoreError> {
        let id = Uuid::new_v4();
        self.borrowers.write().insert(id, details);
        Ok(id)
    }

    async fn get_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Option<BorrowerDetails>, StoreError> {
        Ok(self.borrowers.read().get(&borrower_id).cloned())
    }

    async fn add_copy(&self, book_id: BookId) -> Result<CopyId, StoreError> {
        if !self.books.read().contains_key(&book_id) {
            return Err(StoreError::Other(format!("Book {} not in catalogue", book_id)));
        }
        let copy_id = Uuid::new_v4();
        self.copies.write().insert(
            copy_id,
            BookCopy {
                copy_id,
                book_id,
                on_loan_to: None,
                loan_end_date: None,
            },
        );
        Ok(copy_id)
    }

    async fn copies_of_book(&self, book_id: BookId) -> Result<Vec<BookCopy>, StoreError> {
        Ok(self
            .copies
            .read()
            .values()
            .filter(|copy| copy.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn find_copy_on_loan(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> Result<Option<BookCopy>, StoreError> {
        Ok(self
            .copies
            .read()
            .values()
            .find(|copy| copy.book_id == book_id && copy.on_loan_to == Some(borrower_id))
            .cloned())
    }

    async fn update_copy_loan(
        &self,
        copy_id: CopyId,
        on_loan_to: Option<BorrowerId>,
        loan_end_date: Option<NaiveDate>,
    ) -> Result<bool, StoreError> {
        let mut locked_copies = self.copies.write();
        if let Some(copy) = locked_copies.get_mut(&copy_id) {
            copy.on_loan_to = on_loan_to;
            copy.loan_end_date = loan_end_date;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn copies_on_loan(&self) -> Result<Vec<CopyOnLoan>, StoreError> {
        let books = self.books.read();
        let borrowers = self.borrowers.read();

        self.copies
            .read()
            .values()
            .filter_map(|copy| copy.on_loan_to.map(|borrower_id| (copy, borrower_id)))
            .map(|(copy, borrower_id)| {
                let borrower = borrowers.get(&borrower_id).cloned().ok_or_else(|| {
                    StoreError::Other(format!("Borrower {} of copy missing", borrower_id))
                })?;
                let book = books.get(&copy.book_id).cloned().ok_or_else(|| {
                    StoreError::Other(format!("Book {} of copy missing", copy.book_id))
                })?;
                Ok(CopyOnLoan {
                    copy_id: copy.copy_id,
                    borrower_id,
                    borrower,
                    book_id: copy.book_id,
                    book,
                    loan_end_date: copy.loan_end_date,
                })
            })
            .collect()
    }
}
