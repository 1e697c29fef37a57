//! NextGCore SBI (Service Based Interface) Library
//!
//! HTTP/2 plumbing shared by the UDM daemon: a cleartext hyper server and
//! client, the request/response envelopes, ProblemDetails and the OAuth2
//! client credentials flow toward the NRF.
//!
//! # Example
//!
//! ```rust,no_run
//! use ogs_sbi::{SbiClient, SbiRequest};
//!
//! async fn example() {
//!     let client = SbiClient::with_host_port("127.0.0.5", 7777);
//!     let response = client
//!         .send_request(SbiRequest::get("/nudm-uecm/v1/imsi-001010000000001/registrations/amf-3gpp-access"))
//!         .await;
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`] - Service names, NF types and application error causes
//! - [`message`] - SBI message structures (request, response, ProblemDetails)
//! - [`client`] - HTTP/2 client implementation
//! - [`server`] - HTTP/2 server implementation
//! - [`oauth`] - OAuth2 client credentials flow for 5G SBA
//! - [`error`] - Error types

pub mod error;
pub mod message;
pub mod oauth;
pub mod types;

pub mod client;
pub mod server;

pub use client::{SbiClient, SbiClientConfig};
pub use error::{SbiError, SbiResult};
pub use message::{InvalidParam, ProblemDetails, SbiHeader, SbiHttpMessage, SbiRequest, SbiResponse};
pub use oauth::{AccessTokenRequest, AccessTokenResponse, OAuth2Client, TokenCache};
pub use server::{
    send_error, send_internal_error, send_method_not_allowed, send_problem, SbiRequestHandler, SbiServer, SbiServerConfig,
};
pub use types::{NfType, SbiAppError, SbiServiceType, UriScheme};
