use std::cmp::Reverse;

use crate::api::{BorrowerId, Fine};
use crate::error::StoreError;
use crate::fines_repository::FinesRepository;

#[derive(Default)]
pub struct InMemoryFinesRepository {
    fines: parking_lot::RwLock<Vec<Fine>>,
}

#[async_trait::async_trait]
impl FinesRepository for InMemoryFinesRepository {
    async fn insert_fine(&self, fine: Fine) -> Result<(), StoreError> {
        let mut locked_fines = self.fines.write();
        if locked_fines.iter().any(|existing| existing.id == fine.id) {
            return Err(StoreError::Other(format!("Fine {} already recorded", fine.id)));
        }
        locked_fines.push(fine);
        Ok(())
    }

    async fn fines_by_borrower(
        &self,
        borrower_id: BorrowerId,
        unpaid_only: bool,
    ) -> Result<Vec<Fine>, StoreError> {
        let mut fines: Vec<Fine> = self
            .fines
            .read()
            .iter()
            .filter(|fine| fine.borrower_id == borrower_id && !(unpaid_only && fine.is_paid))
            .cloned()
            .collect();
        fines.sort_by_key(|fine| Reverse(fine.fine_date));
        Ok(fines)
    }
}
