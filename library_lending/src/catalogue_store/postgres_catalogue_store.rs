use anyhow::Context;
use chrono::NaiveDate;
use tokio_postgres::{Client, Row, Statement};
use uuid::Uuid;

use crate::api::{
    BookCopy, BookDetails, BookId, BorrowerDetails, BorrowerId, CopyId, CopyOnLoan,
};
use crate::catalogue_store::CatalogueStore;
use crate::error::StoreError;
use crate::postgres_connection::{connect, PostgresConfig};

pub struct PostgresCatalogueStore {
    client: Client,
}

impl PostgresCatalogueStore {
    pub async fn init(config: &PostgresConfig) -> anyhow::Result<Self> {
        let client = connect(config).await?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS books (
            id              UUID PRIMARY KEY,
            title           TEXT NOT NULL,
            author          TEXT NOT NULL
            );
        CREATE TABLE IF NOT EXISTS borrowers (
            id              UUID PRIMARY KEY,
            name            TEXT NOT NULL,
            email           TEXT NOT NULL
            );
        CREATE TABLE IF NOT EXISTS catalogue (
            id              UUID PRIMARY KEY,
            book_id         UUID NOT NULL REFERENCES books (id),
            on_loan_to      UUID REFERENCES borrowers (id),
            loan_end_date   DATE
            );
        ",
            )
            .await
            .context("Failed to setup catalogue tables")?;

        Ok(Self { client })
    }
}

fn copy_from_row(row: &Row) -> Result<BookCopy, StoreError> {
    Ok(BookCopy {
        copy_id: row.try_get(0)?,
        book_id: row.try_get(1)?,
        on_loan_to: row.try_get(2)?,
        loan_end_date: row.try_get(3)?,
    })
}

#[async_trait::async_trait]
impl CatalogueStore for PostgresCatalogueStore {
    async fn add_book(&self, details: BookDetails) -> Result<BookId, StoreError> {
        let stmt: Statement = self
            .client
            .prepare("INSERT INTO books (id, title, author) VALUES ($1, $2, $3)")
            .await?;

        let book_id = Uuid::new_v4();
        self.client
            .execute(&stmt, &[&book_id, &details.title, &details.author])
            .await?;
        Ok(book_id)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Option<BookDetails>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT title, author FROM books WHERE id = $1")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id]).await?;

        rows.first()
            .map(|row| {
                Ok(BookDetails {
                    title: row.try_get(0)?,
                    author: row.try_get(1)?,
                })
            })
            .transpose()
    }

    async fn add_borrower(&self, details: BorrowerDetails) -> Result<BorrowerId, StoreError> {
        let stmt: Statement = self
            .client
            .prepare("INSERT INTO borrowers (id, name, email) VALUES ($1, $2, $3)")
            .await?;

        let borrower_id = Uuid::new_v4();
        self.client
            .execute(&stmt, &[&borrower_id, &details.name, &details.email])
            .await?;
        Ok(borrower_id)
    }

    async fn get_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Option<BorrowerDetails>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT name, email FROM borrowers WHERE id = $1")
            .await?;

        let rows = self.client.query(&stmt, &[&borrower_id]).await?;

        rows.first()
            .map(|row| {
                Ok(BorrowerDetails {
                    name: row.try_get(0)?,
                    email: row.try_get(1)?,
                })
            })
            .transpose()
    }

    async fn add_copy(&self, book_id: BookId) -> Result<CopyId, StoreError> {
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO catalogue (id, book_id) SELECT $1, id FROM books WHERE id = $2 RETURNING id",
            )
            .await?;

        let copy_id = Uuid::new_v4();
        let rows = self.client.query(&stmt, &[&copy_id, &book_id]).await?;

        if rows.is_empty() {
            Err(StoreError::Other(format!("Book {} not in catalogue", book_id)))
        } else {
            Ok(copy_id)
        }
    }

    async fn copies_of_book(&self, book_id: BookId) -> Result<Vec<BookCopy>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, book_id, on_loan_to, loan_end_date FROM catalogue WHERE book_id = $1")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id]).await?;
        rows.iter().map(copy_from_row).collect()
    }

    async fn find_copy_on_loan(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
    ) -> Result<Option<BookCopy>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, book_id, on_loan_to, loan_end_date FROM catalogue \
                 WHERE book_id = $1 AND on_loan_to = $2 LIMIT 1",
            )
            .await?;

        let rows = self.client.query(&stmt, &[&book_id, &borrower_id]).await?;
        rows.first().map(copy_from_row).transpose()
    }

    async fn update_copy_loan(
        &self,
        copy_id: CopyId,
        on_loan_to: Option<BorrowerId>,
        loan_end_date: Option<NaiveDate>,
    ) -> Result<bool, StoreError> {
        let stmt: Statement = self
            .client
            .prepare("UPDATE catalogue SET on_loan_to = $1, loan_end_date = $2 WHERE id = $3")
            .await?;

        let updated = self
            .client
            .execute(&stmt, &[&on_loan_to, &loan_end_date, &copy_id])
            .await?;
        Ok(updated > 0)
    }

    async fn copies_on_loan(&self) -> Result<Vec<CopyOnLoan>, StoreError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT c.id, c.on_loan_to, br.name, br.email, c.book_id, b.title, b.author, c.loan_end_date
                 FROM catalogue c
                 JOIN borrowers br ON br.id = c.on_loan_to
                 JOIN books b ON b.id = c.book_id",
            )
            .await?;

        let rows = self.client.query(&stmt, &[]).await?;

        rows.iter()
            .map(|row| {
                Ok(CopyOnLoan {
                    copy_id: row.try_get(0)?,
                    borrower_id: row.try_get(1)?,
                    borrower: BorrowerDetails {
                        name: row.try_get(2)?,
                        email: row.try_get(3)?,
                    },
                    book_id: row.try_get(4)?,
                    book: BookDetails {
                        title: row.try_get(5)?,
                        author: row.try_get(6)?,
                    },
                    loan_end_date: row.try_get(7)?,
                })
            })
            .collect()
    }
}
