//! CNPJ Capital Enrichment Library
//!
//! This library reads registry exports (semicolon-delimited CSV), looks each
//! company up by CNPJ in a public registry service and writes the companies
//! whose declared capital exceeds 50,000 to a CSV file, together with the
//! contact fields of the original row.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Core pipeline logic.
//! - `integrations`: External service integrations.
//! - `config`: Configuration management.
//! - `dedup_cache`: Cooldown cache suppressing repeated lookups.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `lookup_client`: Registry lookup client.
//! - `models`: Core data models.
//! - `output`: Output CSV writer.
//! - `pipeline`: Record enrichment pipeline.
//! - `upload`: CSV decoding and full upload runs.
//! - `validator`: CNPJ extraction and validation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod config;
pub mod dedup_cache;
pub mod errors;
pub mod handlers;
pub mod lookup_client;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod upload;
pub mod validator;
