/// Integration tests with mocked external APIs
/// Tests the lookup resolver without hitting real providers
use rust_br_lookup_api::config::Config;
use rust_br_lookup_api::errors::AppError;
use rust_br_lookup_api::models::{CompanyProvider, Coordinates, CoordinatesSource};
use rust_br_lookup_api::resolver::LookupResolver;
use serde_json::json;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CNPJ: &str = "11222333000181";
const CEP: &str = "01001000";

/// Helper function to create a config pointing every provider at the mock server
fn create_test_config(base_url: String) -> Config {
    Config {
        brasilapi_base_url: base_url.clone(),
        receitaws_base_url: base_url.clone(),
        cnpjws_base_url: base_url.clone(),
        nominatim_base_url: base_url,
        ..Config::default()
    }
}

fn resolver_for(server: &MockServer) -> LookupResolver {
    LookupResolver::new(&create_test_config(server.uri())).unwrap()
}

fn brasil_api_cep_body(with_coordinates: bool) -> serde_json::Value {
    let coordinates = if with_coordinates {
        json!({"longitude": "-46.6339", "latitude": "-23.5503"})
    } else {
        json!({})
    };
    json!({
        "cep": CEP,
        "state": "SP",
        "city": "São Paulo",
        "neighborhood": "Sé",
        "street": "Praça da Sé",
        "service": "open-cep",
        "location": {"type": "Point", "coordinates": coordinates}
    })
}

fn brasil_api_cnpj_body() -> serde_json::Value {
    json!({
        "cnpj": CNPJ,
        "razao_social": "ACME COMERCIO LTDA",
        "nome_fantasia": "ACME",
        "email": "contato@acme.com.br",
        "ddd_telefone_1": "1133334444",
        "cep": "01001000",
        "logradouro": "PRACA DA SE",
        "numero": "100",
        "complemento": "",
        "bairro": "SE",
        "municipio": "SAO PAULO",
        "uf": "SP"
    })
}

fn receita_ws_body() -> serde_json::Value {
    json!({
        "status": "OK",
        "cnpj": "11.222.333/0001-81",
        "nome": "ACME COMERCIO LTDA",
        "fantasia": "ACME",
        "telefone": "(11) 3333-4444",
        "cep": "01.001-000",
        "logradouro": "PRACA DA SE",
        "numero": "100",
        "bairro": "SE",
        "municipio": "SAO PAULO",
        "uf": "SP"
    })
}

fn cnpj_ws_body() -> serde_json::Value {
    json!({
        "razao_social": "ACME COMERCIO LTDA",
        "estabelecimento": {
            "nome_fantasia": "ACME",
            "cep": "01001000",
            "tipo_logradouro": "PRACA",
            "logradouro": "DA SE",
            "numero": "100",
            "bairro": "SE",
            "cidade": {"nome": "São Paulo"},
            "estado": {"sigla": "SP"}
        }
    })
}

async fn mount(server: &MockServer, route: String, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

#[cfg(test)]
mod postal_code_tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_cep_makes_no_network_call() {
        let mock_server = MockServer::start().await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let resolver = resolver_for(&mock_server);

        for input in ["", "0100100", "010010001", "abc-def"] {
            let result = resolver.resolve_address_by_postal_code(input).await;
            assert!(
                matches!(result, Err(AppError::InvalidInput(_))),
                "{:?} should be rejected",
                input
            );
        }
    }

    #[tokio::test]
    async fn test_primary_coordinates_returned_without_fallback() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cep/v2/{}", CEP),
            ResponseTemplate::new(200).set_body_json(brasil_api_cep_body(true)),
            1,
        )
        .await;
        mount(&mock_server, "/search".to_string(), ResponseTemplate::new(200), 0).await;

        let resolver = resolver_for(&mock_server);
        let address = resolver
            .resolve_address_by_postal_code("01001-000")
            .await
            .unwrap();

        assert_eq!(address.postal_code, CEP);
        assert_eq!(address.street, "Praça da Sé");
        assert_eq!(address.neighborhood, "Sé");
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.state, "SP");
        assert_eq!(
            address.coordinates,
            Some(Coordinates {
                latitude: -23.5503,
                longitude: -46.6339
            })
        );
        assert_eq!(
            address.coordinates_source,
            Some(CoordinatesSource::PostalProvider)
        );
    }

    #[tokio::test]
    async fn test_missing_coordinates_use_geocoder() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cep/v2/{}", CEP),
            ResponseTemplate::new(200).set_body_json(brasil_api_cep_body(false)),
            1,
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("format", "json"))
            .and(query_param("limit", "1"))
            .and(query_param("q", "Praça da Sé, São Paulo, SP, Brazil"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"lat": "-23.5505", "lon": "-46.6333", "display_name": "Praça da Sé"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let resolver = resolver_for(&mock_server);
        let address = resolver.resolve_address_by_postal_code(CEP).await.unwrap();

        assert_eq!(
            address.coordinates,
            Some(Coordinates {
                latitude: -23.5505,
                longitude: -46.6333
            })
        );
        assert_eq!(address.coordinates_source, Some(CoordinatesSource::Geocoder));
    }

    #[tokio::test]
    async fn test_geocoder_failure_still_returns_address() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cep/v2/{}", CEP),
            ResponseTemplate::new(200).set_body_json(brasil_api_cep_body(false)),
            1,
        )
        .await;
        mount(
            &mock_server,
            "/search".to_string(),
            ResponseTemplate::new(500).set_body_string("Internal Server Error"),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let address = resolver.resolve_address_by_postal_code(CEP).await.unwrap();

        assert_eq!(address.street, "Praça da Sé");
        assert_eq!(address.coordinates, None);
        assert_eq!(address.coordinates_source, None);
    }

    #[tokio::test]
    async fn test_geocoder_empty_result_still_returns_address() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cep/v2/{}", CEP),
            ResponseTemplate::new(200).set_body_json(brasil_api_cep_body(false)),
            1,
        )
        .await;
        mount(
            &mock_server,
            "/search".to_string(),
            ResponseTemplate::new(200).set_body_json(json!([])),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let address = resolver.resolve_address_by_postal_code(CEP).await.unwrap();

        assert_eq!(address.coordinates, None);
    }

    #[tokio::test]
    async fn test_blank_address_skips_geocoder() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cep/v2/{}", CEP),
            ResponseTemplate::new(200).set_body_json(json!({
                "cep": CEP,
                "state": "",
                "city": "",
                "street": "",
                "service": "open-cep",
                "location": {"type": "Point", "coordinates": {}}
            })),
            1,
        )
        .await;
        mount(
            &mock_server,
            "/search".to_string(),
            ResponseTemplate::new(200).set_body_json(json!([
                {"lat": "-14.24", "lon": "-51.93", "display_name": "Brasil"}
            ])),
            0,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let address = resolver.resolve_address_by_postal_code(CEP).await.unwrap();

        assert_eq!(address.postal_code, CEP);
        assert_eq!(address.coordinates, None);
        assert_eq!(address.coordinates_source, None);
    }

    #[tokio::test]
    async fn test_cep_not_found() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            "/api/cep/v2/99999999".to_string(),
            ResponseTemplate::new(404).set_body_json(json!({"message": "CEP não encontrado"})),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let result = resolver.resolve_address_by_postal_code("99999-999").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cep_provider_error_is_unavailable() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cep/v2/{}", CEP),
            ResponseTemplate::new(500).set_body_string("Internal Server Error"),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let result = resolver.resolve_address_by_postal_code(CEP).await;

        assert!(matches!(result, Err(AppError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cep_malformed_payload_is_unavailable() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cep/v2/{}", CEP),
            ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let result = resolver.resolve_address_by_postal_code(CEP).await;

        assert!(matches!(result, Err(AppError::ProviderUnavailable(_))));
    }
}

#[cfg(test)]
mod company_chain_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_provider_wins() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cnpj/v1/{}", CNPJ),
            ResponseTemplate::new(200).set_body_json(brasil_api_cnpj_body()),
            1,
        )
        .await;
        mount(&mock_server, format!("/v1/cnpj/{}", CNPJ), ResponseTemplate::new(200), 0).await;
        mount(&mock_server, format!("/cnpj/{}", CNPJ), ResponseTemplate::new(200), 0).await;

        let resolver = resolver_for(&mock_server);
        let lookup = resolver
            .resolve_company_by_tax_id("11.222.333/0001-81")
            .await
            .unwrap();

        assert_eq!(lookup.provider, CompanyProvider::BrasilApi);
        assert_eq!(lookup.company.document, CNPJ);
        assert_eq!(lookup.company.legal_name, "ACME COMERCIO LTDA");
        assert_eq!(lookup.company.trade_name.as_deref(), Some("ACME"));
        assert_eq!(lookup.company.address.city, "SAO PAULO");
        assert_eq!(lookup.company.address.complement, None);
        assert_eq!(lookup.company.coordinates, None);
    }

    #[tokio::test]
    async fn test_second_provider_used_when_first_fails() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cnpj/v1/{}", CNPJ),
            ResponseTemplate::new(500).set_body_string("Internal Server Error"),
            1,
        )
        .await;
        mount(
            &mock_server,
            format!("/v1/cnpj/{}", CNPJ),
            ResponseTemplate::new(200).set_body_json(receita_ws_body()),
            1,
        )
        .await;
        mount(
            &mock_server,
            format!("/cnpj/{}", CNPJ),
            ResponseTemplate::new(200).set_body_json(cnpj_ws_body()),
            0,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let lookup = resolver.resolve_company_by_tax_id(CNPJ).await.unwrap();

        assert_eq!(lookup.provider, CompanyProvider::ReceitaWs);
        assert_eq!(lookup.company.address.zip, "01001000");
        assert_eq!(lookup.company.phone.as_deref(), Some("(11) 3333-4444"));
    }

    #[tokio::test]
    async fn test_not_found_and_error_status_fall_through_to_last_provider() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cnpj/v1/{}", CNPJ),
            ResponseTemplate::new(404),
            1,
        )
        .await;
        mount(
            &mock_server,
            format!("/v1/cnpj/{}", CNPJ),
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ERROR", "message": "CNPJ inválido"})),
            1,
        )
        .await;
        mount(
            &mock_server,
            format!("/cnpj/{}", CNPJ),
            ResponseTemplate::new(200).set_body_json(cnpj_ws_body()),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let lookup = resolver.resolve_company_by_tax_id(CNPJ).await.unwrap();

        assert_eq!(lookup.provider, CompanyProvider::CnpjWs);
        assert_eq!(lookup.company.address.street, "PRACA DA SE");
        assert_eq!(lookup.company.address.state, "SP");
    }

    #[tokio::test]
    async fn test_malformed_payload_falls_through() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cnpj/v1/{}", CNPJ),
            ResponseTemplate::new(200).set_body_json(json!({"cnpj": CNPJ})),
            1,
        )
        .await;
        mount(
            &mock_server,
            format!("/v1/cnpj/{}", CNPJ),
            ResponseTemplate::new(200).set_body_json(receita_ws_body()),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let lookup = resolver.resolve_company_by_tax_id(CNPJ).await.unwrap();

        assert_eq!(lookup.provider, CompanyProvider::ReceitaWs);
    }

    #[tokio::test]
    async fn test_all_providers_failing_yields_single_outcome() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cnpj/v1/{}", CNPJ),
            ResponseTemplate::new(503),
            1,
        )
        .await;
        mount(
            &mock_server,
            format!("/v1/cnpj/{}", CNPJ),
            ResponseTemplate::new(429).set_body_string("Too many requests"),
            1,
        )
        .await;
        mount(
            &mock_server,
            format!("/cnpj/{}", CNPJ),
            ResponseTemplate::new(404),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        let result = resolver.resolve_company_by_tax_id(CNPJ).await;

        match result {
            Err(AppError::NotFoundAnywhere(msg)) => {
                assert_eq!(
                    msg,
                    rust_br_lookup_api::errors::NOT_FOUND_ANYWHERE_MESSAGE
                );
            }
            other => panic!("Expected NotFoundAnywhere, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_cnpj_makes_no_network_call() {
        let mock_server = MockServer::start().await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let resolver = resolver_for(&mock_server);

        // Wrong length, CPF-sized, and wrong check digits
        for input in ["1122233300018", "52998224725", "11222333000182"] {
            let result = resolver.resolve_company_by_tax_id(input).await;
            assert!(
                matches!(result, Err(AppError::InvalidInput(_))),
                "{} should be rejected",
                input
            );
        }
    }

    #[tokio::test]
    async fn test_company_geocoding_when_enabled() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cnpj/v1/{}", CNPJ),
            ResponseTemplate::new(200).set_body_json(brasil_api_cnpj_body()),
            1,
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "PRACA DA SE 100, SAO PAULO, SP, Brazil"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"lat": "-23.55", "lon": "-46.63"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = Config {
            geocode_company_addresses: true,
            ..create_test_config(mock_server.uri())
        };
        let resolver = LookupResolver::new(&config).unwrap();
        let lookup = resolver.resolve_company_by_tax_id(CNPJ).await.unwrap();

        assert_eq!(
            lookup.company.coordinates,
            Some(Coordinates {
                latitude: -23.55,
                longitude: -46.63
            })
        );
    }

    #[tokio::test]
    async fn test_company_without_address_is_not_geocoded() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            format!("/api/cnpj/v1/{}", CNPJ),
            ResponseTemplate::new(200).set_body_json(json!({
                "cnpj": CNPJ,
                "razao_social": "ACME COMERCIO LTDA",
                "logradouro": "",
                "numero": "",
                "municipio": "",
                "uf": ""
            })),
            1,
        )
        .await;
        mount(&mock_server, "/search".to_string(), ResponseTemplate::new(200), 0).await;

        let config = Config {
            geocode_company_addresses: true,
            ..create_test_config(mock_server.uri())
        };
        let resolver = LookupResolver::new(&config).unwrap();
        let lookup = resolver.resolve_company_by_tax_id(CNPJ).await.unwrap();

        assert_eq!(lookup.provider, CompanyProvider::BrasilApi);
        assert_eq!(lookup.company.coordinates, None);
    }
}

#[cfg(test)]
mod geocode_tests {
    use super::*;

    #[tokio::test]
    async fn test_geocode_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Avenida Paulista 1000, São Paulo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"lat": "-23.5649", "lon": "-46.6519"}])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let resolver = resolver_for(&mock_server);
        let coordinates = resolver
            .geocode_free_text("  Avenida Paulista 1000, São Paulo ")
            .await;

        assert_eq!(
            coordinates,
            Some(Coordinates {
                latitude: -23.5649,
                longitude: -46.6519
            })
        );
    }

    #[tokio::test]
    async fn test_geocode_short_input_skips_call() {
        let mock_server = MockServer::start().await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let resolver = resolver_for(&mock_server);

        assert_eq!(resolver.geocode_free_text("").await, None);
        assert_eq!(resolver.geocode_free_text("  SP  ").await, None);
    }

    #[tokio::test]
    async fn test_geocode_failures_are_none() {
        let mock_server = MockServer::start().await;

        mount(
            &mock_server,
            "/search".to_string(),
            ResponseTemplate::new(200).set_body_json(json!([{"lat": "north", "lon": "-46.0"}])),
            1,
        )
        .await;

        let resolver = resolver_for(&mock_server);
        assert_eq!(resolver.geocode_free_text("Rua Inexistente, 0").await, None);
    }

    #[tokio::test]
    async fn test_geocode_unreachable_provider_is_none() {
        // Nothing listens on port 9 of localhost
        let config = Config {
            nominatim_base_url: "http://127.0.0.1:9".to_string(),
            http_timeout_secs: 1,
            ..Config::default()
        };
        let resolver = LookupResolver::new(&config).unwrap();

        assert_eq!(resolver.geocode_free_text("Praça da Sé, São Paulo").await, None);
    }
}
