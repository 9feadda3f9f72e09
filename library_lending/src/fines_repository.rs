pub use in_memory_fines_repository::InMemoryFinesRepository;
pub use postgres_fines_repository::PostgresFinesRepository;

use crate::api::{BorrowerId, Fine};
use crate::error::StoreError;

mod in_memory_fines_repository;
mod postgres_fines_repository;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FinesRepository: Send + Sync {
    async fn insert_fine(&self, fine: Fine) -> Result<(), StoreError>;

    /// Fines of the borrower, newest first
    async fn fines_by_borrower(
        &self,
        borrower_id: BorrowerId,
        unpaid_only: bool,
    ) -> Result<Vec<Fine>, StoreError>;
}
