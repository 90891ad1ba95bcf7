pub mod communities;
pub mod error;
pub mod events;
pub mod middleware;
pub mod notifier;
pub mod routes;
pub mod service;
pub mod state;
pub mod threads;
pub mod toggle;
pub mod users;
