pub const DEFAULT_BRASILAPI_BASE_URL: &str = "https://brasilapi.com.br";
pub const DEFAULT_RECEITAWS_BASE_URL: &str = "https://receitaws.com.br";
pub const DEFAULT_CNPJWS_BASE_URL: &str = "https://publica.cnpj.ws";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("rust-br-lookup-api/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub brasilapi_base_url: String,
    pub receitaws_base_url: String,
    pub cnpjws_base_url: String,
    pub nominatim_base_url: String,
    /// Per-request timeout applied to every outbound provider call.
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub geocode_company_addresses: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            brasilapi_base_url: DEFAULT_BRASILAPI_BASE_URL.to_string(),
            receitaws_base_url: DEFAULT_RECEITAWS_BASE_URL.to_string(),
            cnpjws_base_url: DEFAULT_CNPJWS_BASE_URL.to_string(),
            nominatim_base_url: DEFAULT_NOMINATIM_BASE_URL.to_string(),
            http_timeout_secs: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            geocode_company_addresses: false,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: parse_var("PORT", defaults.port)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            brasilapi_base_url: base_url_var("BRASILAPI_BASE_URL", DEFAULT_BRASILAPI_BASE_URL)?,
            receitaws_base_url: base_url_var("RECEITAWS_BASE_URL", DEFAULT_RECEITAWS_BASE_URL)?,
            cnpjws_base_url: base_url_var("CNPJWS_BASE_URL", DEFAULT_CNPJWS_BASE_URL)?,
            nominatim_base_url: base_url_var("NOMINATIM_BASE_URL", DEFAULT_NOMINATIM_BASE_URL)?,
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a positive integer"))
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("HTTP_TIMEOUT_SECS cannot be zero");
                    }
                    Ok(secs)
                })?,
            user_agent: std::env::var("HTTP_USER_AGENT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.user_agent),
            geocode_company_addresses: parse_var(
                "GEOCODE_COMPANY_ADDRESSES",
                defaults.geocode_company_addresses,
            )
            .map_err(|_| anyhow::anyhow!("GEOCODE_COMPANY_ADDRESSES must be true or false"))?,
            rate_limit_per_second: parse_var(
                "RATE_LIMIT_PER_SECOND",
                defaults.rate_limit_per_second,
            )
            .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a positive integer"))?,
            rate_limit_burst: parse_var("RATE_LIMIT_BURST", defaults.rate_limit_burst)
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a positive integer"))?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("BrasilAPI Base URL: {}", config.brasilapi_base_url);
        tracing::debug!("ReceitaWS Base URL: {}", config.receitaws_base_url);
        tracing::debug!("CNPJ.ws Base URL: {}", config.cnpjws_base_url);
        tracing::debug!("Nominatim Base URL: {}", config.nominatim_base_url);
        tracing::debug!("HTTP timeout: {}s", config.http_timeout_secs);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, T::Err> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse(),
        _ => Ok(default),
    }
}

fn base_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let raw = std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    validate_base_url(name, &raw)
}

/// Checks that `raw` is an absolute http(s) URL and strips trailing slashes.
pub fn validate_base_url(name: &str, raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    url::Url::parse(trimmed).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    Ok(trimmed.trim_end_matches('/').to_string())
}
