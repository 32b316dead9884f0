#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod rag;
pub mod session;
pub mod stream;
