//! Route composition for the HTTP server.

pub mod routes;
