use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::{self, DocumentKind, CEP_LENGTH};
use crate::errors::AppError;

// ============ Lookup Inputs ============

/// A cleaned identifier ready to be dispatched to a provider.
///
/// Only built through the validating constructors, so a value of this type
/// always holds digits of the canonical length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupQuery {
    /// 11-digit CPF or 14-digit CNPJ.
    Document { kind: DocumentKind, digits: String },
    /// 8-digit CEP.
    PostalCode(String),
}

impl LookupQuery {
    /// Cleans `raw` and accepts it if it has 8 digits.
    pub fn postal_code(raw: &str) -> Result<Self, AppError> {
        let digits = document::clean_digits(raw);
        if digits.len() != CEP_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "Invalid CEP: expected {} digits, got {}",
                CEP_LENGTH,
                digits.len()
            )));
        }
        Ok(LookupQuery::PostalCode(digits))
    }

    /// Cleans `raw` and accepts it if it has the length of `kind`.
    pub fn document(raw: &str, kind: DocumentKind) -> Result<Self, AppError> {
        let digits = document::clean_digits(raw);
        if digits.len() != kind.length() {
            return Err(AppError::InvalidInput(format!(
                "Invalid {}: expected {} digits, got {}",
                kind,
                kind.length(),
                digits.len()
            )));
        }
        Ok(LookupQuery::Document { kind, digits })
    }

    pub fn digits(&self) -> &str {
        match self {
            LookupQuery::Document { digits, .. } => digits,
            LookupQuery::PostalCode(digits) => digits,
        }
    }
}

// ============ Resolved Records ============

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Parses the string pairs the geodata providers send.
    ///
    /// Returns `None` if either side is missing, unparsable or not finite.
    pub fn parse(latitude: Option<&str>, longitude: Option<&str>) -> Option<Self> {
        let latitude: f64 = latitude?.trim().parse().ok()?;
        let longitude: f64 = longitude?.trim().parse().ok()?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// Where the coordinates of an [`AddressRecord`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatesSource {
    /// Sent by the postal code provider together with the address.
    PostalProvider,
    /// Filled in by the free-text geocoder.
    Geocoder,
}

/// Address resolved from a CEP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// 8-digit postal code.
    pub postal_code: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state (UF).
    pub state: String,
    /// Upstream service that answered the postal provider's request.
    pub service: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub coordinates_source: Option<CoordinatesSource>,
}

/// Postal address of a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    /// 8-digit postal code.
    pub zip: String,
}

impl PostalAddress {
    /// Free-text form used to geocode the address, `None` when it has no
    /// street, city or state.
    pub fn to_query(&self) -> Option<String> {
        let street = if self.street.is_empty() || self.number.is_empty() {
            self.street.clone()
        } else {
            format!("{} {}", self.street, self.number)
        };
        join_query_parts(&[street.as_str(), self.city.as_str(), self.state.as_str()])
    }
}

/// Company resolved from a CNPJ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// 14-digit CNPJ.
    pub document: String,
    /// Razão social.
    pub legal_name: String,
    /// Nome fantasia.
    pub trade_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: PostalAddress,
    pub coordinates: Option<Coordinates>,
}

/// Registry providers of the CNPJ fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyProvider {
    BrasilApi,
    ReceitaWs,
    CnpjWs,
}

impl CompanyProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            CompanyProvider::BrasilApi => "brasil_api",
            CompanyProvider::ReceitaWs => "receita_ws",
            CompanyProvider::CnpjWs => "cnpj_ws",
        }
    }
}

impl fmt::Display for CompanyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful CNPJ resolution, tagged with the provider that answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyLookup {
    pub company: CompanyRecord,
    pub provider: CompanyProvider,
    pub resolved_at: DateTime<Utc>,
}

impl CompanyLookup {
    pub fn new(company: CompanyRecord, provider: CompanyProvider) -> Self {
        Self {
            company,
            provider,
            resolved_at: Utc::now(),
        }
    }
}

/// Outcome of a single provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome<T> {
    Found(T),
    /// The provider answered authoritatively that the record does not exist.
    NotFound,
    /// Transport error, non-2xx status or malformed payload.
    Failed(String),
}

impl<T> ProviderOutcome<T> {
    /// Maps a found payload into a record; `None` means the payload was malformed.
    pub fn and_then_record<U, F>(self, provider: &str, f: F) -> ProviderOutcome<U>
    where
        F: FnOnce(T) -> Option<U>,
    {
        match self {
            ProviderOutcome::Found(raw) => match f(raw) {
                Some(record) => ProviderOutcome::Found(record),
                None => {
                    ProviderOutcome::Failed(format!("{} returned a malformed payload", provider))
                }
            },
            ProviderOutcome::NotFound => ProviderOutcome::NotFound,
            ProviderOutcome::Failed(reason) => ProviderOutcome::Failed(reason),
        }
    }
}

// ============ HTTP API Models ============

#[derive(Debug, Deserialize)]
pub struct GeocodeParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentValidationRequest {
    pub document: String,
    /// Algorithm to apply; picked from the digit count when absent.
    pub kind: Option<DocumentKind>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentValidationResponse {
    pub valid: bool,
    pub kind: Option<DocumentKind>,
    pub digits: String,
    pub formatted: String,
    pub message: Option<String>,
}

// ============ Provider Payloads ============

/// BrasilAPI `GET /api/cep/v2/{cep}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrasilApiCepResponse {
    pub cep: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub street: Option<String>,
    pub service: Option<String>,
    pub location: Option<BrasilApiLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrasilApiLocation {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub coordinates: Option<BrasilApiCoordinates>,
}

/// BrasilAPI sends coordinates as strings and may send `{}` when unknown.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrasilApiCoordinates {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// BrasilAPI `GET /api/cnpj/v1/{cnpj}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrasilApiCnpjResponse {
    pub cnpj: Option<String>,
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub email: Option<String>,
    pub ddd_telefone_1: Option<String>,
    pub cep: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub complemento: Option<String>,
    pub bairro: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
}

/// ReceitaWS `GET /v1/cnpj/{cnpj}`.
///
/// Errors come back as HTTP 200 with `status: "ERROR"`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceitaWsCnpjResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub cnpj: Option<String>,
    pub nome: Option<String>,
    pub fantasia: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub cep: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub complemento: Option<String>,
    pub bairro: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
}

/// CNPJ.ws `GET /cnpj/{cnpj}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CnpjWsResponse {
    pub razao_social: Option<String>,
    pub estabelecimento: Option<CnpjWsEstabelecimento>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CnpjWsEstabelecimento {
    pub cnpj: Option<String>,
    pub nome_fantasia: Option<String>,
    pub email: Option<String>,
    pub ddd1: Option<String>,
    pub telefone1: Option<String>,
    pub cep: Option<String>,
    pub tipo_logradouro: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub complemento: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<CnpjWsCidade>,
    pub estado: Option<CnpjWsEstado>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CnpjWsCidade {
    pub nome: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CnpjWsEstado {
    pub sigla: Option<String>,
}

/// One entry of Nominatim `GET /search?format=json`.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub display_name: Option<String>,
}

/// Joins the non-empty parts with `", "` and appends the country.
///
/// Returns `None` when every part is blank: the country alone would geocode
/// to its centroid.
pub fn join_query_parts(parts: &[&str]) -> Option<String> {
    let mut query: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if query.is_empty() {
        return None;
    }
    query.push("Brazil");
    Some(query.join(", "))
}
