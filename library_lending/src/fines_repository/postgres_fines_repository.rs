use anyhow::Context;
use tokio_postgres::{Client, Statement};

use crate::api::{BorrowerId, Fine};
use crate::error::StoreError;
use crate::fines_repository::FinesRepository;
use crate::postgres_connection::{connect, PostgresConfig};

pub struct PostgresFinesRepository {
    client: Client,
}

impl PostgresFinesRepository {
    pub async fn init(config: &PostgresConfig) -> anyhow::Result<Self> {
        let client = connect(config).await?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS fines (
            id              UUID PRIMARY KEY,
            borrower_id     UUID NOT NULL,
            book_id         UUID NOT NULL,
            amount          NUMERIC(10, 2) NOT NULL,
            fine_date       TIMESTAMPTZ NOT NULL,
            due_date        DATE NOT NULL,
            overdue_days    BIGINT NOT NULL,
            reason          TEXT NOT NULL,
            is_paid         BOOLEAN NOT NULL DEFAULT FALSE
            )
        ",
            )
            .await
            .context("Failed to setup fines table")?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FinesRepository for PostgresFinesRepository {
    async fn insert_fine(&self, fine: Fine) -> Result<(), StoreError> {
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO fines (id, borrower_id, book_id, amount, fine_date, due_date, overdue_days, reason, is_paid) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .await?;

        self.client
            .execute(
                &stmt,
                &[
                    &fine.id,
                    &fine.borrower_id,
                    &fine.book_id,
                    &fine.amount,
                    &fine.fine_date,
                    &fine.due_date,
                    &fine.overdue_days,
                    &fine.reason,
                    &fine.is_paid,
                ],
            )
            .await?;
        Ok(())
    }

    async fn fines_by_borrower(
        &self,
        borrower_id: BorrowerId,
        unpaid_only: bool,
    ) -> Result<Vec<Fine>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, borrower_id, book_id, amount, fine_date, due_date, overdue_days, reason, is_paid \
                 FROM fines WHERE borrower_id = $1 AND (NOT $2 OR NOT is_paid) \
                 ORDER BY fine_date DESC",
            )
            .await?;

        let rows = self.client.query(&stmt, &[&borrower_id, &unpaid_only]).await?;

        rows.iter()
            .map(|row| {
                Ok(Fine {
                    id: row.try_get(0)?,
                    borrower_id: row.try_get(1)?,
                    book_id: row.try_get(2)?,
                    amount: row.try_get(3)?,
                    fine_date: row.try_get(4)?,
                    due_date: row.try_get(5)?,
                    overdue_days: row.try_get(6)?,
                    reason: row.try_get(7)?,
                    is_paid: row.try_get(8)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests_postgres_fines_repository {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serial_test::file_serial;
    use testcontainers::{ContainerAsync, GenericImage};
    use uuid::Uuid;

    use super::*;
    use crate::postgres_connection::test_support::{local_config, start_postgres_container};

    async fn start_postgres_container_and_init_repo(
    ) -> (ContainerAsync<GenericImage>, PostgresFinesRepository) {
        let pg_container = start_postgres_container().await;

        for _ in 0..10 {
            if let Ok(repo) = PostgresFinesRepository::init(&local_config()).await {
                return (pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// 1. Unknown borrower has no fines
    /// 2. Stored fine reads back with 2 decimal amount
    /// 3. Fines are listed newest first, paid ones skipped for unpaid only
    async fn test_fines_management() {
        let (_container, repository) = start_postgres_container_and_init_repo().await;
        let borrower_id = Uuid::new_v4();

        assert!(repository
            .fines_by_borrower(borrower_id, false)
            .await
            .unwrap()
            .is_empty());

        let older = Fine {
            id: Uuid::new_v4(),
            borrower_id,
            book_id: Uuid::new_v4(),
            amount: dec!(2.50),
            fine_date: Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
            overdue_days: 5,
            reason: "Late return - 5 day(s) overdue".to_string(),
            is_paid: false,
        };
        let newer_paid = Fine {
            id: Uuid::new_v4(),
            fine_date: Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap(),
            is_paid: true,
            ..older.clone()
        };

        repository.insert_fine(older.clone()).await.unwrap();
        repository.insert_fine(newer_paid.clone()).await.unwrap();

        assert_eq!(
            repository
                .fines_by_borrower(borrower_id, false)
                .await
                .unwrap(),
            vec![newer_paid, older.clone()]
        );
        assert_eq!(
            repository.fines_by_borrower(borrower_id, true).await.unwrap(),
            vec![older]
        );
    }
}
