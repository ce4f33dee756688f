//! Rendezvous Client SDK.
//!
//! This crate provides a typed client for the rendezvous HTTP API.
//!
//! # Example
//!
//! ```no_run
//! use rendezvous_client::RendezvousClient;
//!
//! # async fn example() -> Result<(), rendezvous_client::ClientError> {
//! let client = RendezvousClient::new("http://rendezvous.internal:8080")?;
//! let token = "user-jwt";
//!
//! client.create_account(token).await?;
//! let balance = client.balance(token).await?;
//!
//! println!("Available: {} credits", balance.available_credits);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // Every call returns `ClientError`

mod client;
mod error;
mod types;

pub use client::{ClientOptions, RendezvousClient};
pub use error::ClientError;
pub use types::*;
