//! Core traits for dnssync
//!
//! - [`DnsProvider`]: list records of a zone and apply change sets to it
//! - [`DnsProviderFactory`]: build providers from configuration

pub mod dns_provider;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
