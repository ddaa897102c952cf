//! Route handlers for the login flow and the health check.

pub mod dashboard;
pub mod health;
pub mod login;
pub mod logout;
pub mod register;
pub mod root;

pub(crate) mod flash;
pub(crate) mod session;
