//! Brazilian Registry & Postal Lookup API Library
//!
//! This library backs the lookup service that back-office forms call to
//! validate tax documents and pre-fill company and address fields from
//! external providers (BrasilAPI, ReceitaWS, CNPJ.ws, Nominatim).
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `document`: CPF/CNPJ check-digit validation and input masks.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and routes.
//! - `models`: Lookup inputs, resolved records and provider payloads.
//! - `resolver`: Provider ordering, fallback and enrichment.
//! - `services`: External provider clients.

pub mod config;
pub mod document;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod resolver;
pub mod services;
