pub mod api;
pub mod book_locks;
pub mod catalogue_store;
pub mod clock;
pub mod error;
pub mod fine_ledger;
pub mod fines_repository;
pub mod lending_services;
pub mod loans;
pub mod postgres_connection;
pub mod reservation_queue;
pub mod reservations_repository;
pub mod settings;

#[cfg(any(feature = "client", test))]
pub mod client;

#[cfg(any(feature = "server", test))]
pub mod app_config;

#[cfg(any(feature = "server", test))]
mod handlers;

#[cfg(test)]
mod test_fixtures;
