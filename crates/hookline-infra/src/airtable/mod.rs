//! Airtable HTTP clients.

pub mod client;

pub use client::HttpAirtablePayloadsApi;
