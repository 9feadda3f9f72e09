use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio_postgres::{Client, Row, Statement};
use uuid::Uuid;

use crate::api::{BookId, BorrowerId, Reservation, ReservationId};
use crate::error::StoreError;
use crate::postgres_connection::{connect, PostgresConfig};
use crate::reservations_repository::ReservationsRepository;

const RESERVATION_COLUMNS: &str =
    "id, borrower_id, book_id, reservation_date, expiration_date, is_active, queue_position";

pub struct PostgresReservationsRepository {
    client: Client,
}

impl PostgresReservationsRepository {
    pub async fn init(config: &PostgresConfig) -> anyhow::Result<Self> {
        let client = connect(config).await?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS reservations (
            id                  UUID PRIMARY KEY,
            borrower_id         UUID NOT NULL,
            book_id             UUID NOT NULL,
            reservation_date    TIMESTAMPTZ NOT NULL,
            expiration_date     TIMESTAMPTZ,
            is_active           BOOLEAN NOT NULL DEFAULT TRUE,
            queue_position      INTEGER NOT NULL
            );
        CREATE UNIQUE INDEX IF NOT EXISTS reservations_active_position
            ON reservations (book_id, queue_position) WHERE is_active;
        CREATE UNIQUE INDEX IF NOT EXISTS reservations_active_borrower
            ON reservations (book_id, borrower_id) WHERE is_active;
        ",
            )
            .await
            .context("Failed to setup reservations table")?;

        Ok(Self { client })
    }

    async fn query_reservations(
        &self,
        condition: &str,
        id: &Uuid,
    ) -> Result<Vec<Reservation>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT {} FROM reservations WHERE {} ORDER BY queue_position",
                RESERVATION_COLUMNS, condition
            ))
            .await?;

        let rows = self.client.query(&stmt, &[id]).await?;
        rows.iter().map(reservation_from_row).collect()
    }
}

fn reservation_from_row(row: &Row) -> Result<Reservation, StoreError> {
    let queue_position: i32 = row.try_get(6)?;
    Ok(Reservation {
        id: row.try_get(0)?,
        borrower_id: row.try_get(1)?,
        book_id: row.try_get(2)?,
        reservation_date: row.try_get(3)?,
        expiration_date: row.try_get(4)?,
        is_active: row.try_get(5)?,
        queue_position: u32::try_from(queue_position).map_err(|_| {
            StoreError::Other(format!("Invalid queue position {}", queue_position))
        })?,
    })
}

#[async_trait::async_trait]
impl ReservationsRepository for PostgresReservationsRepository {
    async fn enqueue(
        &self,
        borrower_id: BorrowerId,
        book_id: BookId,
        reservation_date: DateTime<Utc>,
    ) -> Result<Reservation, StoreError> {
        // Position is computed inside the INSERT, no gap between count and insert
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "INSERT INTO reservations (id, borrower_id, book_id, reservation_date, is_active, queue_position)
                 SELECT $1::UUID, $2::UUID, $3::UUID, $4::TIMESTAMPTZ, TRUE, COUNT(*) + 1
                 FROM reservations WHERE book_id = $3 AND is_active
                 RETURNING {}",
                RESERVATION_COLUMNS
            ))
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[&Uuid::new_v4(), &borrower_id, &book_id, &reservation_date],
            )
            .await?;

        rows.first()
            .ok_or_else(|| StoreError::Other("Reservation not returned".to_string()))
            .and_then(reservation_from_row)
    }

    async fn get_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .query_reservations("id = $1", &reservation_id)
            .await?
            .into_iter()
            .next())
    }

    async fn find_active(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> Result<Option<Reservation>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT {} FROM reservations WHERE book_id = $1 AND borrower_id = $2 AND is_active",
                RESERVATION_COLUMNS
            ))
            .await?;

        let rows = self.client.query(&stmt, &[&book_id, &borrower_id]).await?;
        rows.first().map(reservation_from_row).transpose()
    }

    async fn count_active_for_book(&self, book_id: BookId) -> Result<u32, StoreError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT COUNT(*) FROM reservations WHERE book_id = $1 AND is_active")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id]).await?;
        let count: i64 = rows
            .first()
            .ok_or_else(|| StoreError::Other("Count not returned".to_string()))?
            .try_get(0)?;
        u32::try_from(count).map_err(|_| StoreError::Other(format!("Invalid count {}", count)))
    }

    async fn active_for_book(&self, book_id: BookId) -> Result<Vec<Reservation>, StoreError> {
        self.query_reservations("book_id = $1 AND is_active", &book_id)
            .await
    }

    async fn active_for_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Reservation>, StoreError> {
        self.query_reservations("borrower_id = $1 AND is_active", &borrower_id)
            .await
    }

    async fn deactivate(
        &self,
        reservation_id: ReservationId,
        borrower_id: BorrowerId,
    ) -> Result<Option<Reservation>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "UPDATE reservations SET is_active = FALSE \
                 WHERE id = $1 AND borrower_id = $2 AND is_active RETURNING {}",
                RESERVATION_COLUMNS
            ))
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&reservation_id, &borrower_id])
            .await?;
        rows.first().map(reservation_from_row).transpose()
    }

    async fn set_queue_position(
        &self,
        reservation_id: ReservationId,
        queue_position: u32,
    ) -> Result<bool, StoreError> {
        let stmt: Statement = self
            .client
            .prepare("UPDATE reservations SET queue_position = $1 WHERE id = $2")
            .await?;

        let queue_position = i32::try_from(queue_position).map_err(|_| {
            StoreError::Other(format!("Invalid queue position {}", queue_position))
        })?;
        let updated = self
            .client
            .execute(&stmt, &[&queue_position, &reservation_id])
            .await?;
        Ok(updated > 0)
    }
}
