//! Twitter/X posting surface.
//!
//! Submodules provide the OAuth 1.0a request signer, the HTTP client wrapper
//! and the typed request/response models for `POST /2/tweets`.
pub mod client;
pub mod oauth;
pub mod types;

pub use client::TwitterApi;
pub use oauth::OAuthCredentials;
