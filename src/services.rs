use crate::config::Config;
use crate::document;
use crate::errors::AppError;
use crate::models::*;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds the HTTP client shared by every provider adapter.
///
/// The timeout applies per request, so a full CNPJ chain is bounded by
/// three times this value.
pub fn build_http_client(config: &Config) -> Result<Client, AppError> {
    Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))
}

/// Sends `request` and decodes a JSON body.
///
/// 404 maps to `NotFound`; any other failure maps to `Failed`.
async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &str,
) -> ProviderOutcome<T> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return ProviderOutcome::Failed(format!("{} request failed: {}", provider, e)),
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return ProviderOutcome::NotFound;
    }
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return ProviderOutcome::Failed(format!(
            "{} returned status {}: {}",
            provider, status, error_text
        ));
    }

    match response.json::<T>().await {
        Ok(data) => ProviderOutcome::Found(data),
        Err(e) => ProviderOutcome::Failed(format!("Failed to parse {} response: {}", provider, e)),
    }
}

/// Trims and drops empty strings.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn text(value: Option<String>) -> String {
    non_empty(value).unwrap_or_default()
}

fn state_code(value: Option<String>) -> String {
    text(value).to_uppercase()
}

fn zip_digits(value: Option<String>) -> String {
    value.map(|v| document::clean_digits(&v)).unwrap_or_default()
}

// ============ BrasilAPI ============

pub struct BrasilApiService {
    client: Client,
    base_url: String,
}

impl BrasilApiService {
    pub const NAME: &'static str = "BrasilAPI";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch the raw CEP v2 payload for an 8-digit postal code.
    pub async fn fetch_cep(&self, cep: &str) -> ProviderOutcome<BrasilApiCepResponse> {
        let url = format!("{}/api/cep/v2/{}", self.base_url, cep);
        tracing::debug!("BrasilAPI CEP URL: {}", url);

        fetch_json(self.client.get(&url), Self::NAME).await
    }

    /// Fetch a company from the CNPJ v1 endpoint.
    pub async fn fetch_company(&self, cnpj: &str) -> ProviderOutcome<CompanyRecord> {
        let url = format!("{}/api/cnpj/v1/{}", self.base_url, cnpj);
        tracing::debug!("BrasilAPI CNPJ URL: {}", url);

        fetch_json::<BrasilApiCnpjResponse>(self.client.get(&url), Self::NAME)
            .await
            .and_then_record(Self::NAME, |raw| brasil_api_company(raw, cnpj))
    }
}

/// Maps a CEP v2 payload; coordinates are kept only when both parse.
pub fn brasil_api_address(raw: BrasilApiCepResponse, cep: &str) -> AddressRecord {
    let coordinates = raw
        .location
        .and_then(|location| location.coordinates)
        .and_then(|c| Coordinates::parse(c.latitude.as_deref(), c.longitude.as_deref()));

    AddressRecord {
        postal_code: raw
            .cep
            .map(|c| document::clean_digits(&c))
            .filter(|c| c.len() == document::CEP_LENGTH)
            .unwrap_or_else(|| cep.to_string()),
        street: text(raw.street),
        neighborhood: text(raw.neighborhood),
        city: text(raw.city),
        state: state_code(raw.state),
        service: non_empty(raw.service),
        coordinates_source: coordinates.map(|_| CoordinatesSource::PostalProvider),
        coordinates,
    }
}

pub fn brasil_api_company(raw: BrasilApiCnpjResponse, cnpj: &str) -> Option<CompanyRecord> {
    let legal_name = non_empty(raw.razao_social)?;

    Some(CompanyRecord {
        document: cnpj.to_string(),
        legal_name,
        trade_name: non_empty(raw.nome_fantasia),
        email: non_empty(raw.email).map(|e| e.to_lowercase()),
        phone: non_empty(raw.ddd_telefone_1),
        address: PostalAddress {
            street: text(raw.logradouro),
            number: text(raw.numero),
            complement: non_empty(raw.complemento),
            neighborhood: text(raw.bairro),
            city: text(raw.municipio),
            state: state_code(raw.uf),
            zip: zip_digits(raw.cep),
        },
        coordinates: None,
    })
}

// ============ ReceitaWS ============

pub struct ReceitaWsService {
    client: Client,
    base_url: String,
}

impl ReceitaWsService {
    pub const NAME: &'static str = "ReceitaWS";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_company(&self, cnpj: &str) -> ProviderOutcome<CompanyRecord> {
        let url = format!("{}/v1/cnpj/{}", self.base_url, cnpj);
        tracing::debug!("ReceitaWS CNPJ URL: {}", url);

        match fetch_json::<ReceitaWsCnpjResponse>(self.client.get(&url), Self::NAME).await {
            // Errors arrive as 200 with status "ERROR"
            ProviderOutcome::Found(raw) if raw.status.as_deref() == Some("ERROR") => {
                tracing::debug!(
                    "ReceitaWS rejected CNPJ {}: {}",
                    cnpj,
                    raw.message.as_deref().unwrap_or("no message")
                );
                ProviderOutcome::NotFound
            }
            outcome => outcome.and_then_record(Self::NAME, |raw| receita_ws_company(raw, cnpj)),
        }
    }
}

pub fn receita_ws_company(raw: ReceitaWsCnpjResponse, cnpj: &str) -> Option<CompanyRecord> {
    let legal_name = non_empty(raw.nome)?;

    Some(CompanyRecord {
        document: cnpj.to_string(),
        legal_name,
        trade_name: non_empty(raw.fantasia),
        email: non_empty(raw.email).map(|e| e.to_lowercase()),
        phone: non_empty(raw.telefone),
        address: PostalAddress {
            street: text(raw.logradouro),
            number: text(raw.numero),
            complement: non_empty(raw.complemento),
            neighborhood: text(raw.bairro),
            city: text(raw.municipio),
            state: state_code(raw.uf),
            zip: zip_digits(raw.cep),
        },
        coordinates: None,
    })
}

// ============ CNPJ.ws ============

pub struct CnpjWsService {
    client: Client,
    base_url: String,
}

impl CnpjWsService {
    pub const NAME: &'static str = "CNPJ.ws";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_company(&self, cnpj: &str) -> ProviderOutcome<CompanyRecord> {
        let url = format!("{}/cnpj/{}", self.base_url, cnpj);
        tracing::debug!("CNPJ.ws URL: {}", url);

        fetch_json::<CnpjWsResponse>(self.client.get(&url), Self::NAME)
            .await
            .and_then_record(Self::NAME, |raw| cnpj_ws_company(raw, cnpj))
    }
}

pub fn cnpj_ws_company(raw: CnpjWsResponse, cnpj: &str) -> Option<CompanyRecord> {
    let legal_name = non_empty(raw.razao_social)?;
    let establishment = raw.estabelecimento?;

    let street = match (
        non_empty(establishment.tipo_logradouro),
        non_empty(establishment.logradouro),
    ) {
        (Some(kind), Some(name)) => format!("{} {}", kind, name),
        (None, Some(name)) => name,
        (_, None) => String::new(),
    };

    let phone = match (
        non_empty(establishment.ddd1),
        non_empty(establishment.telefone1),
    ) {
        (Some(ddd), Some(number)) => Some(format!("{}{}", ddd, number)),
        (None, Some(number)) => Some(number),
        (_, None) => None,
    };

    Some(CompanyRecord {
        document: cnpj.to_string(),
        legal_name,
        trade_name: non_empty(establishment.nome_fantasia),
        email: non_empty(establishment.email).map(|e| e.to_lowercase()),
        phone,
        address: PostalAddress {
            street,
            number: text(establishment.numero),
            complement: non_empty(establishment.complemento),
            neighborhood: text(establishment.bairro),
            city: text(establishment.cidade.and_then(|c| c.nome)),
            state: state_code(establishment.estado.and_then(|e| e.sigla)),
            zip: zip_digits(establishment.cep),
        },
        coordinates: None,
    })
}

// ============ Nominatim ============

pub struct NominatimService {
    client: Client,
    base_url: String,
}

impl NominatimService {
    pub const NAME: &'static str = "Nominatim";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Resolve a free-text address to the best match.
    pub async fn search(&self, query: &str) -> ProviderOutcome<Coordinates> {
        // Query parameters are encoded by the URL builder
        let url = match reqwest::Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("format", "json"), ("q", query), ("limit", "1")],
        ) {
            Ok(url) => url,
            Err(e) => {
                return ProviderOutcome::Failed(format!("Failed to build Nominatim URL: {}", e))
            }
        };

        tracing::debug!("Nominatim search: {}", query);

        match fetch_json::<Vec<NominatimPlace>>(self.client.get(url), Self::NAME).await {
            ProviderOutcome::Found(places) => {
                let place = match places.into_iter().next() {
                    Some(place) => place,
                    None => return ProviderOutcome::NotFound,
                };
                match Coordinates::parse(place.lat.as_deref(), place.lon.as_deref()) {
                    Some(coordinates) => ProviderOutcome::Found(coordinates),
                    None => ProviderOutcome::Failed(
                        "Nominatim returned unparsable coordinates".to_string(),
                    ),
                }
            }
            ProviderOutcome::NotFound => ProviderOutcome::NotFound,
            ProviderOutcome::Failed(reason) => ProviderOutcome::Failed(reason),
        }
    }
}
