pub use in_memory_catalogue_store::InMemoryCatalogueStore;
pub use postgres_catalogue_store::PostgresCatalogueStore;

use chrono::NaiveDate;

use crate::api::{
    BookCopy, BookDetails, BookId, BorrowerDetails, BorrowerId, CopyId, CopyOnLoan,
};
use crate::error::StoreError;

mod in_memory_catalogue_store;
mod postgres_catalogue_store;

/// Books, borrowers and the physical copies on the shelves.
/// Adding entries and lending copies out belongs to the catalogue administration
/// and checkout flows, the lending core only reads copies and clears loans.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogueStore: Send + Sync {
    /// Adds book to the catalogue, returns an id assigned to the book
    async fn add_book(&self, details: BookDetails) -> Result<BookId, StoreError>;

    async fn get_book(&self, book_id: BookId) -> Result<Option<BookDetails>, StoreError>;

    async fn add_borrower(&self, details: BorrowerDetails) -> Result<BorrowerId, StoreError>;

    async fn get_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Option<BorrowerDetails>, StoreError>;

    /// Adds a copy of an existing book, fails if the book is unknown
    async fn add_copy(&self, book_id: BookId) -> Result<CopyId, StoreError>;

    async fn copies_of_book(&self, book_id: BookId) -> Result<Vec<BookCopy>, StoreError>;

    /// Copy of the book currently on loan to the borrower
    async fn find_copy_on_loan(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> Result<Option<BookCopy>, StoreError>;

    /// Sets or clears the loan of a copy, returns false if the copy was not found
    async fn update_copy_loan(
        &self,
        copy_id: CopyId,
        on_loan_to: Option<BorrowerId>,
        loan_end_date: Option<NaiveDate>,
    ) -> Result<bool, StoreError>;

    /// All copies currently on loan with their borrower and book details
    async fn copies_on_loan(&self) -> Result<Vec<CopyOnLoan>, StoreError>;
}
