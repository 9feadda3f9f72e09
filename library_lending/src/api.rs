use chrono::{DateTime, NaiveDate, Utc};
use paperclip::actix::Apiv2Schema;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BookId = Uuid;
pub type BorrowerId = Uuid;
pub type CopyId = Uuid;
pub type FineId = Uuid;
pub type ReservationId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct BorrowerDetails {
    pub name: String,
    pub email: String,
}

/// One physical copy of a book in the catalogue.
/// `on_loan_to` without `loan_end_date` is an open-ended loan.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct BookCopy {
    pub copy_id: CopyId,
    pub book_id: BookId,
    pub on_loan_to: Option<BorrowerId>,
    pub loan_end_date: Option<NaiveDate>,
}

impl BookCopy {
    pub fn is_available(&self) -> bool {
        self.on_loan_to.is_none()
    }
}

/// Copy currently on loan, joined with its borrower and book
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CopyOnLoan {
    pub copy_id: CopyId,
    pub borrower_id: BorrowerId,
    pub borrower: BorrowerDetails,
    pub book_id: BookId,
    pub book: BookDetails,
    pub loan_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct Fine {
    pub id: FineId,
    pub borrower_id: BorrowerId,
    pub book_id: BookId,
    pub amount: Decimal,
    pub fine_date: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub overdue_days: i64,
    pub reason: String,
    pub is_paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct Reservation {
    pub id: ReservationId,
    pub borrower_id: BorrowerId,
    pub book_id: BookId,
    pub reservation_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub queue_position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct LoanedBook {
    pub book_id: BookId,
    pub book_title: String,
    pub author_name: String,
    pub loan_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct BorrowerLoan {
    pub borrower_id: BorrowerId,
    pub borrower_name: String,
    pub borrower_email: String,
    pub loaned_books: Vec<LoanedBook>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ReservationInfo {
    pub reservation_id: ReservationId,
    pub borrower_id: BorrowerId,
    pub borrower_name: String,
    pub reservation_date: DateTime<Utc>,
    pub queue_position: u32,
}

/// Availability of a book with its waiting queue.
/// A default value (nil `book_id`) is returned for books that do not exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct BookAvailabilityInfo {
    pub book_id: BookId,
    pub book_title: String,
    pub author_name: String,
    pub is_available: bool,
    pub current_loan_end_date: Option<NaiveDate>,
    pub total_copies: u32,
    pub available_copies: u32,
    pub reservation_count: u32,
    pub estimated_available_date: Option<NaiveDate>,
    pub reservation_queue: Vec<ReservationInfo>,
}

impl BookAvailabilityInfo {
    pub fn is_unknown_book(&self) -> bool {
        self.book_id.is_nil()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ReturnBookRequest {
    pub book_id: BookId,
    pub borrower_id: BorrowerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct BookReturnResponse {
    pub success: bool,
    pub message: String,
    pub fine_issued: Option<Fine>,
    pub fine_amount: Option<Decimal>,
    pub overdue_days: Option<i64>,
    pub next_reservation: Option<ReservationInfo>,
}

impl BookReturnResponse {
    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            fine_issued: None,
            fine_amount: None,
            overdue_days: None,
            next_reservation: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ReservationRequest {
    pub book_id: BookId,
    pub borrower_id: BorrowerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ReservationResponse {
    pub success: bool,
    pub message: String,
    pub reservation_id: Option<ReservationId>,
    pub queue_position: Option<u32>,
    pub estimated_available_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct FinesQuery {
    #[serde(default)]
    pub unpaid_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct CancelReservationQuery {
    pub borrower_id: BorrowerId,
}
