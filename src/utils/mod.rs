//! Common utilities shared by the portal and booking layers

pub mod error;
pub mod retry;
