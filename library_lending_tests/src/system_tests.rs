use std::sync::Arc;

use actix_web::{App, HttpServer};
use chrono::NaiveDate;
use paperclip::actix::{web, OpenApiExt};
use rust_decimal_macros::dec;
use uuid::Uuid;

use library_lending::api::{BookDetails, BookId, BorrowerDetails, BorrowerId, CopyId};
use library_lending::app_config::config_app;
use library_lending::catalogue_store::{CatalogueStore, InMemoryCatalogueStore};
use library_lending::client::LibraryLendingClient;
use library_lending::clock::FixedClock;
use library_lending::fines_repository::InMemoryFinesRepository;
use library_lending::lending_services::LendingServices;
use library_lending::reservations_repository::InMemoryReservationsRepository;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

struct TestServer {
    catalogue: Arc<InMemoryCatalogueStore>,
    client: LibraryLendingClient,
}

impl TestServer {
    /// Starts the service on a random local port with in-memory stores and the clock at 2024-06-17
    async fn start() -> Self {
        let catalogue = Arc::new(InMemoryCatalogueStore::default());
        let services = LendingServices::new(
            catalogue.clone(),
            Arc::new(InMemoryFinesRepository::default()),
            Arc::new(InMemoryReservationsRepository::default()),
            Arc::new(FixedClock::at_date(date(2024, 6, 17))),
        );

        let server = HttpServer::new(move || {
            App::new()
                .wrap_api()
                .app_data(web::Data::new(services.clone()))
                .configure(config_app)
                .build()
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Failed to bind test server");
        let port = server.addrs()[0].port();
        tokio::spawn(server.run());

        let client = LibraryLendingClient::new(&format!("http://127.0.0.1:{}", port))
            .expect("Failed to create client");
        Self { catalogue, client }
    }

    async fn add_borrower(&self, name: &str) -> BorrowerId {
        self.catalogue
            .add_borrower(BorrowerDetails {
                name: name.to_string(),
                email: format!("{}@library.test", name),
            })
            .await
            .expect("Failed to add borrower")
    }

    async fn add_book(&self, title: &str, author: &str) -> (BookId, CopyId) {
        let book_id = self
            .catalogue
            .add_book(BookDetails {
                title: title.to_string(),
                author: author.to_string(),
            })
            .await
            .expect("Failed to add book");
        let copy_id = self
            .catalogue
            .add_copy(book_id)
            .await
            .expect("Failed to add copy");
        (book_id, copy_id)
    }

    async fn lend(&self, copy_id: CopyId, borrower_id: BorrowerId, loan_end_date: NaiveDate) {
        assert!(self
            .catalogue
            .update_copy_loan(copy_id, Some(borrower_id), Some(loan_end_date))
            .await
            .expect("Failed to lend copy"));
    }
}

#[tokio::test]
/// Full lending flow through the HTTP client
/// 1. Two borrowers queue for a book lent out 5 days past its due date
/// 2. Queue positions and estimates follow the loan end date
/// 3. Return by the holder issues a 2.50 fine and names the first in the queue
/// 4. Cancelling the first reservation moves the second one up
/// 5. Second return and second cancellation are rejected
async fn library_lending_e2e_test() {
    let server = TestServer::start().await;
    let client = &server.client;
    assert!(client.health().await.expect("Health check failed"));

    let anna = server.add_borrower("anna").await;
    let bob = server.add_borrower("bob").await;
    let carl = server.add_borrower("carl").await;
    let (dune, dune_copy) = server.add_book("Dune", "Frank Herbert").await;
    let (emma, emma_copy) = server.add_book("Emma", "Jane Austen").await;
    server.lend(dune_copy, anna, date(2024, 6, 12)).await;
    server.lend(emma_copy, carl, date(2024, 6, 30)).await;

    let bobs = client
        .create_reservation(dune, bob)
        .await
        .expect("Failed to reserve");
    assert!(bobs.success);
    assert_eq!(bobs.queue_position, Some(1));
    assert_eq!(bobs.estimated_available_date, Some(date(2024, 6, 19)));

    let carls = client
        .create_reservation(dune, carl)
        .await
        .expect("Failed to reserve");
    assert!(carls.success);
    assert_eq!(carls.queue_position, Some(2));
    assert_eq!(carls.estimated_available_date, Some(date(2024, 7, 3)));

    let duplicate = client
        .create_reservation(dune, bob)
        .await
        .expect("Failed to reserve");
    assert!(!duplicate.success);
    assert_eq!(duplicate.reservation_id, bobs.reservation_id);

    let availability = client
        .book_availability(dune)
        .await
        .expect("Failed to get availability")
        .expect("Book not found");
    assert!(!availability.is_available);
    assert_eq!(availability.reservation_count, 2);
    assert_eq!(availability.current_loan_end_date, Some(date(2024, 6, 12)));
    assert_eq!(
        availability
            .reservation_queue
            .iter()
            .map(|info| info.borrower_name.as_str())
            .collect::<Vec<_>>(),
        vec!["bob", "carl"]
    );

    let loans = client.active_loans().await.expect("Failed to list loans");
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].borrower_id, carl);
    assert_eq!(loans[0].loaned_books[0].book_id, emma);

    let returned = client
        .return_book(dune, anna)
        .await
        .expect("Failed to return book");
    assert!(returned.success);
    assert_eq!(returned.overdue_days, Some(5));
    assert_eq!(returned.fine_amount, Some(dec!(2.50)));
    assert_eq!(
        returned.next_reservation.map(|info| info.borrower_id),
        Some(bob)
    );

    let fines = client.fines(anna, true).await.expect("Failed to list fines");
    assert_eq!(fines.len(), 1);
    assert_eq!(fines[0].amount, dec!(2.50));
    assert_eq!(fines[0].book_id, dune);
    assert!(client
        .fines(bob, false)
        .await
        .expect("Failed to list fines")
        .is_empty());

    let bobs_id = bobs.reservation_id.expect("No reservation id");
    assert!(!client
        .cancel_reservation(bobs_id, carl)
        .await
        .expect("Failed to cancel"));
    assert!(client
        .cancel_reservation(bobs_id, bob)
        .await
        .expect("Failed to cancel"));
    assert!(!client
        .cancel_reservation(bobs_id, bob)
        .await
        .expect("Failed to cancel"));

    let queue = client
        .reservations_by_book(dune)
        .await
        .expect("Failed to list reservations");
    assert_eq!(queue.len(), 1);
    assert_eq!(Some(queue[0].id), carls.reservation_id);
    assert_eq!(queue[0].queue_position, 1);
    assert!(client
        .reservations_by_borrower(bob)
        .await
        .expect("Failed to list reservations")
        .is_empty());

    let second_return = client
        .return_book(dune, anna)
        .await
        .expect("Failed to return book");
    assert!(!second_return.success);
}

#[tokio::test]
async fn unknown_book_e2e_test() {
    let server = TestServer::start().await;
    let bob = server.add_borrower("bob").await;

    assert_eq!(
        server
            .client
            .book_availability(Uuid::new_v4())
            .await
            .expect("Failed to get availability"),
        None
    );

    let rejected = server
        .client
        .create_reservation(Uuid::new_v4(), bob)
        .await
        .expect("Failed to reserve");
    assert!(!rejected.success);
    assert_eq!(rejected.message, "Book not found.");
}
