//! Collaborators certbridge depends on, behind narrow async traits:
//!
//! - [`CertificateSource`]: the issuing authority ([`DnsimpleClient`])
//! - [`AppServiceClient`]: web application hostname bindings
//!   ([`AzureAppServiceClient`])
//! - [`BlobStore`]: object storage ([`FileSystemBlobStore`])
//!
//! In-memory doubles for all three live in [`memory`].

pub mod app_service;
pub mod blob;
pub mod client;
pub mod dnsimple;
pub mod memory;

pub use app_service::AzureAppServiceClient;
pub use blob::FileSystemBlobStore;
pub use client::{AppServiceClient, BindingUpdate, BlobStore, CertificateSource};
pub use dnsimple::DnsimpleClient;
