use crate::api::{CopyId, ReservationId};

/// Failure of one of the backing stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LendingError {
    #[error("{0}")]
    NotFound(String),

    #[error("You already have an active reservation for this book.")]
    Conflict {
        reservation_id: ReservationId,
        queue_position: u32,
    },

    #[error("{0}")]
    InvalidOperation(String),

    #[error("Store failure: {0}")]
    Persistence(#[from] StoreError),

    /// Return aborted after the copy was cleared and the loan could not be put back
    #[error("{cause}; loan of copy {copy_id} could not be restored: {restore_failure}")]
    LoanNotRestored {
        copy_id: CopyId,
        cause: Box<LendingError>,
        restore_failure: String,
    },
}
