pub mod auth;
pub mod interactions;
pub mod middleware;
pub mod routes;
pub mod videos;

mod convert;
