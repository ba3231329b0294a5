//! HTTP client for the vCenter VI/JSON API.
//!
//! This crate provides a typed client for the small slice of the vCenter API
//! that session management needs.
//!
//! # Example
//!
//! ```no_run
//! use vsess_client::{ServerUrl, TlsTrust, VimClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = VimClient::builder()
//!     .server(ServerUrl::parse("vcenter.example.com")?)
//!     .tls(TlsTrust::from_thumbprint(Some("AB:CD:EF:01:23:45:67:89:AB:CD:EF:01:23:45:67:89:AB:CD:EF:01"))?)
//!     .build()?;
//!
//! client.session_manager().login("administrator@vsphere.local", "secret").await?;
//!
//! for dc in client.inventory().datacenters().await? {
//!     println!("{} ({})", dc.name, dc.reference);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **ServiceInstance**: service content, current time
//! - **SessionManager**: login, logout, session liveness
//! - **Inventory**: datacenter enumeration
//! - **SearchIndex**: lookup by BIOS or instance UUID

pub mod api;
pub mod client;
pub mod error;
pub mod tls;
pub mod types;

pub use client::{ClientBuilder, DEFAULT_RELEASE, SESSION_HEADER, ServerUrl, VimClient};
pub use error::{Error, Result};
pub use tls::{Thumbprint, TlsTrust};
pub use types::*;
