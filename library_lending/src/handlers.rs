use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};
use uuid::Uuid;

use crate::api::{
    BookId, BookReturnResponse, BorrowerId, CancelReservationQuery, FinesQuery, ReservationId,
    ReservationRequest, ReservationResponse, ReturnBookRequest,
};
use crate::error::LendingError;
use crate::lending_services::LendingServices;

fn invalid_id(name: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(format!("Invalid {}", name))
}

fn internal_error(operation: &str, err: LendingError) -> HttpResponse {
    tracing::error!("{} failed {}", operation, err);
    HttpResponse::InternalServerError().finish()
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn get_active_loans(services: Data<LendingServices>) -> Result<HttpResponse, Error> {
    Ok(match services.loans.active_loans().await {
        Ok(loans) => HttpResponse::Ok().json(loans),
        Err(err) => internal_error("Get active loans", err),
    })
}

#[api_v2_operation]
pub async fn return_book(
    services: Data<LendingServices>,
    request: web::Json<ReturnBookRequest>,
) -> Result<HttpResponse, Error> {
    let ReturnBookRequest {
        book_id,
        borrower_id,
    } = request.into_inner();
    if book_id.is_nil() {
        return Ok(invalid_id("book id"));
    }
    if borrower_id.is_nil() {
        return Ok(invalid_id("borrower id"));
    }

    Ok(match services.loans.return_book(book_id, borrower_id).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(err @ LendingError::NotFound(_)) => {
            HttpResponse::NotFound().json(BookReturnResponse::failed(err.to_string()))
        }
        Err(err) => internal_error("Return book", err),
    })
}

#[api_v2_operation]
pub async fn get_fines(
    services: Data<LendingServices>,
    borrower_id: web::Path<BorrowerId>,
    query: web::Query<FinesQuery>,
) -> Result<HttpResponse, Error> {
    let borrower_id = borrower_id.into_inner();
    if borrower_id.is_nil() {
        return Ok(invalid_id("borrower id"));
    }

    Ok(
        match services.fines.fines(borrower_id, query.unpaid_only).await {
            Ok(fines) => HttpResponse::Ok().json(fines),
            Err(err) => internal_error("Get fines", err),
        },
    )
}

#[api_v2_operation]
pub async fn get_reservations_by_borrower(
    services: Data<LendingServices>,
    borrower_id: web::Path<BorrowerId>,
) -> Result<HttpResponse, Error> {
    let borrower_id = borrower_id.into_inner();
    if borrower_id.is_nil() {
        return Ok(invalid_id("borrower id"));
    }

    Ok(
        match services
            .reservations
            .reservations_by_borrower(borrower_id)
            .await
        {
            Ok(reservations) => HttpResponse::Ok().json(reservations),
            Err(err) => internal_error("Get borrower reservations", err),
        },
    )
}

#[api_v2_operation]
pub async fn create_reservation(
    services: Data<LendingServices>,
    request: web::Json<ReservationRequest>,
) -> Result<HttpResponse, Error> {
    let ReservationRequest {
        book_id,
        borrower_id,
    } = request.into_inner();
    if book_id.is_nil() {
        return Ok(invalid_id("book id"));
    }
    if borrower_id.is_nil() {
        return Ok(invalid_id("borrower id"));
    }

    Ok(
        match services
            .reservations
            .create_reservation(book_id, borrower_id)
            .await
        {
            Ok(created) => HttpResponse::Ok().json(ReservationResponse::from(created)),
            Err(err @ LendingError::NotFound(_)) => {
                HttpResponse::NotFound().json(ReservationResponse::rejected(&err))
            }
            Err(err @ (LendingError::Conflict { .. } | LendingError::InvalidOperation(_))) => {
                HttpResponse::BadRequest().json(ReservationResponse::rejected(&err))
            }
            Err(err) => internal_error("Create reservation", err),
        },
    )
}

#[api_v2_operation]
pub async fn cancel_reservation(
    services: Data<LendingServices>,
    reservation_id: web::Path<ReservationId>,
    query: web::Query<CancelReservationQuery>,
) -> Result<HttpResponse, Error> {
    let reservation_id = reservation_id.into_inner();
    if reservation_id.is_nil() {
        return Ok(invalid_id("reservation id"));
    }
    if query.borrower_id.is_nil() {
        return Ok(invalid_id("borrower id"));
    }

    Ok(
        match services
            .reservations
            .cancel_reservation(reservation_id, query.borrower_id)
            .await
        {
            Ok(true) => HttpResponse::Ok().json("Reservation cancelled successfully."),
            Ok(false) => HttpResponse::NotFound()
                .json("Reservation not found or you don't have permission to cancel it."),
            Err(err) => internal_error("Cancel reservation", err),
        },
    )
}

#[api_v2_operation]
pub async fn get_reservations_by_book(
    services: Data<LendingServices>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    if book_id.is_nil() {
        return Ok(invalid_id("book id"));
    }

    Ok(
        match services.reservations.reservations_by_book(book_id).await {
            Ok(reservations) => HttpResponse::Ok().json(reservations),
            Err(err) => internal_error("Get book reservations", err),
        },
    )
}

#[api_v2_operation]
pub async fn get_book_availability(
    services: Data<LendingServices>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let book_id: Uuid = book_id.into_inner();
    if book_id.is_nil() {
        return Ok(invalid_id("book id"));
    }

    Ok(
        match services.reservations.book_availability(book_id).await {
            Ok(availability) if availability.is_unknown_book() => {
                HttpResponse::NotFound().json("Book not found.")
            }
            Ok(availability) => HttpResponse::Ok().json(availability),
            Err(err) => internal_error("Get book availability", err),
        },
    )
}
