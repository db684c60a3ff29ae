//! Lookup orchestration shared by the HTTP handlers and library callers.
//!
//! - CEP: BrasilAPI, with Nominatim filling in missing coordinates
//! - CNPJ: BrasilAPI, then ReceitaWS, then CNPJ.ws, first record wins
//! - Free text: Nominatim, best effort

use crate::config::Config;
use crate::document::{self, DocumentKind};
use crate::errors::{AppError, NOT_FOUND_ANYWHERE_MESSAGE};
use crate::models::*;
use crate::services::{
    brasil_api_address, build_http_client, BrasilApiService, CnpjWsService, NominatimService,
    ReceitaWsService,
};

/// Order in which registry providers are tried for a CNPJ.
pub const COMPANY_PROVIDER_CHAIN: [CompanyProvider; 3] = [
    CompanyProvider::BrasilApi,
    CompanyProvider::ReceitaWs,
    CompanyProvider::CnpjWs,
];

/// Free-text addresses shorter than this are not worth a geocoding call.
pub const MIN_GEOCODE_QUERY_LEN: usize = 5;

pub struct LookupResolver {
    brasil_api: BrasilApiService,
    receita_ws: ReceitaWsService,
    cnpj_ws: CnpjWsService,
    nominatim: NominatimService,
    geocode_company_addresses: bool,
}

impl LookupResolver {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = build_http_client(config)?;

        Ok(Self {
            brasil_api: BrasilApiService::new(client.clone(), config.brasilapi_base_url.clone()),
            receita_ws: ReceitaWsService::new(client.clone(), config.receitaws_base_url.clone()),
            cnpj_ws: CnpjWsService::new(client.clone(), config.cnpjws_base_url.clone()),
            nominatim: NominatimService::new(client, config.nominatim_base_url.clone()),
            geocode_company_addresses: config.geocode_company_addresses,
        })
    }

    /// Resolve an address from a CEP.
    ///
    /// Coordinates missing from the postal provider are looked up with the
    /// geocoder; if that fails too the address is still returned, without
    /// coordinates.
    pub async fn resolve_address_by_postal_code(
        &self,
        code: &str,
    ) -> Result<AddressRecord, AppError> {
        let query = LookupQuery::postal_code(code)?;
        let cep = query.digits();

        tracing::info!("Resolving address for CEP {}", cep);

        let raw = match self.brasil_api.fetch_cep(cep).await {
            ProviderOutcome::Found(raw) => raw,
            ProviderOutcome::NotFound => {
                tracing::info!("CEP {} not found", cep);
                return Err(AppError::NotFound(format!("CEP {} not found", cep)));
            }
            ProviderOutcome::Failed(reason) => {
                tracing::error!("CEP lookup failed for {}: {}", cep, reason);
                return Err(AppError::ProviderUnavailable(reason));
            }
        };

        let mut address = brasil_api_address(raw, cep);

        if address.coordinates.is_none() {
            let fallback_query = join_query_parts(&[
                address.street.as_str(),
                address.city.as_str(),
                address.state.as_str(),
            ]);

            if let Some(fallback_query) = fallback_query {
                tracing::debug!(
                    "CEP {} has no coordinates, geocoding '{}'",
                    cep,
                    fallback_query
                );

                match self.nominatim.search(&fallback_query).await {
                    ProviderOutcome::Found(coordinates) => {
                        address.coordinates = Some(coordinates);
                        address.coordinates_source = Some(CoordinatesSource::Geocoder);
                    }
                    ProviderOutcome::NotFound => {
                        tracing::debug!("No geocoding match for CEP {}", cep);
                    }
                    ProviderOutcome::Failed(reason) => {
                        tracing::warn!("Geocoding fallback failed for CEP {}: {}", cep, reason);
                    }
                }
            } else {
                tracing::debug!("CEP {} has no coordinates and no address to geocode", cep);
            }
        }

        tracing::info!(
            "✓ Resolved CEP {} (coordinates: {})",
            cep,
            address.coordinates.is_some()
        );
        Ok(address)
    }

    /// Resolve a company from a CNPJ through the provider chain.
    ///
    /// Individual provider failures are never surfaced. When the chain is
    /// exhausted the caller gets a single `NotFoundAnywhere`.
    pub async fn resolve_company_by_tax_id(&self, id: &str) -> Result<CompanyLookup, AppError> {
        let query = LookupQuery::document(id, DocumentKind::Cnpj)?;
        let cnpj = query.digits();

        if !document::is_valid_cnpj(cnpj) {
            return Err(AppError::InvalidInput(format!(
                "Invalid CNPJ: check digits do not match for {}",
                cnpj
            )));
        }

        tracing::info!("Resolving company for CNPJ {}", cnpj);

        for provider in COMPANY_PROVIDER_CHAIN {
            let outcome = match provider {
                CompanyProvider::BrasilApi => self.brasil_api.fetch_company(cnpj).await,
                CompanyProvider::ReceitaWs => self.receita_ws.fetch_company(cnpj).await,
                CompanyProvider::CnpjWs => self.cnpj_ws.fetch_company(cnpj).await,
            };

            match outcome {
                ProviderOutcome::Found(mut company) => {
                    tracing::info!("✓ CNPJ {} resolved by {}", cnpj, provider);
                    if self.geocode_company_addresses {
                        if let Some(address) = company.address.to_query() {
                            company.coordinates = self.geocode_free_text(&address).await;
                        }
                    }
                    return Ok(CompanyLookup::new(company, provider));
                }
                ProviderOutcome::NotFound => {
                    tracing::info!(
                        "CNPJ {} not found at {}, trying next provider",
                        cnpj,
                        provider
                    );
                }
                ProviderOutcome::Failed(reason) => {
                    tracing::warn!(
                        "CNPJ provider {} failed for {}: {}, trying next provider",
                        provider,
                        cnpj,
                        reason
                    );
                }
            }
        }

        tracing::warn!("CNPJ {} not resolved by any provider", cnpj);
        Err(AppError::NotFoundAnywhere(NOT_FOUND_ANYWHERE_MESSAGE.to_string()))
    }

    /// Geocode a free-text address. Never fails: anything short of a match is `None`.
    pub async fn geocode_free_text(&self, address: &str) -> Option<Coordinates> {
        let address = address.trim();
        if address.chars().count() < MIN_GEOCODE_QUERY_LEN {
            return None;
        }

        match self.nominatim.search(address).await {
            ProviderOutcome::Found(coordinates) => Some(coordinates),
            ProviderOutcome::NotFound => None,
            ProviderOutcome::Failed(reason) => {
                tracing::warn!("Geocoding failed for '{}': {}", address, reason);
                None
            }
        }
    }
}
