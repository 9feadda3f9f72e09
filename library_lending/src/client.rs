use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;

use crate::api::{
    BookAvailabilityInfo, BookId, BookReturnResponse, BorrowerId, BorrowerLoan, Fine,
    Reservation, ReservationId, ReservationRequest, ReservationResponse, ReturnBookRequest,
};

const MAX_RETRIES: u32 = 3;

pub struct LibraryLendingClient {
    url: String,
    client: ClientWithMiddleware,
}

impl LibraryLendingClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Calls GET /health endpoint
    pub async fn health(&self) -> anyhow::Result<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.url))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// Calls GET /api/loans endpoint
    pub async fn active_loans(&self) -> anyhow::Result<Vec<BorrowerLoan>> {
        let response = self
            .client
            .get(format!("{}/api/loans", self.url))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            bail!("Failed to list active loans {}", response.status())
        }
    }

    /// Calls POST /api/loans/return endpoint
    /// A book that is not on loan to the borrower yields a response with `success == false`
    pub async fn return_book(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> anyhow::Result<BookReturnResponse> {
        let response = self
            .client
            .post(format!("{}/api/loans/return", self.url))
            .json(&ReturnBookRequest {
                book_id,
                borrower_id,
            })
            .send()
            .await?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(response.json().await?)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to return book {}", error)
        }
    }

    /// Calls GET /api/borrower/{borrower_id}/fines endpoint
    pub async fn fines(
        &self,
        borrower_id: BorrowerId,
        unpaid_only: bool,
    ) -> anyhow::Result<Vec<Fine>> {
        let response = self
            .client
            .get(format!("{}/api/borrower/{}/fines", self.url, borrower_id))
            .query(&[("unpaid_only", unpaid_only)])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to list fines {}", error)
        }
    }

    /// Calls GET /api/borrower/{borrower_id}/reservations endpoint
    pub async fn reservations_by_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> anyhow::Result<Vec<Reservation>> {
        let response = self
            .client
            .get(format!(
                "{}/api/borrower/{}/reservations",
                self.url, borrower_id
            ))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to list reservations {}", error)
        }
    }

    /// Calls POST /api/reservations endpoint
    /// Rejected reservations (unknown book or borrower, duplicate, free copy)
    /// yield a response with `success == false`
    pub async fn create_reservation(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> anyhow::Result<ReservationResponse> {
        let response = self
            .client
            .post(format!("{}/api/reservations", self.url))
            .json(&ReservationRequest {
                book_id,
                borrower_id,
            })
            .send()
            .await?;

        match response.status() {
            status
                if status.is_success()
                    || status == StatusCode::NOT_FOUND
                    || status == StatusCode::BAD_REQUEST =>
            {
                Ok(response
                    .json()
                    .await
                    .context("Failed to parse reservation response")?)
            }
            _ => {
                let error: String = response.json().await.unwrap_or_default();
                bail!("Failed to create reservation {}", error)
            }
        }
    }

    /// Calls DELETE /api/reservations/{reservation_id} endpoint
    /// Returns true if cancelled and false if there was no such active reservation of the borrower
    pub async fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
        borrower_id: BorrowerId,
    ) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/api/reservations/{}", self.url, reservation_id))
            .query(&[("borrower_id", borrower_id)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to cancel reservation {}", error)
        }
    }

    /// Calls GET /api/book/{book_id}/reservations endpoint
    pub async fn reservations_by_book(&self, book_id: BookId) -> anyhow::Result<Vec<Reservation>> {
        let response = self
            .client
            .get(format!("{}/api/book/{}/reservations", self.url, book_id))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to list reservations {}", error)
        }
    }

    /// Calls GET /api/book/{book_id}/availability endpoint
    /// None if the book is not in the catalogue
    pub async fn book_availability(
        &self,
        book_id: BookId,
    ) -> anyhow::Result<Option<BookAvailabilityInfo>> {
        let response = self
            .client
            .get(format!("{}/api/book/{}/availability", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to get book availability {}", error)
        }
    }
}
