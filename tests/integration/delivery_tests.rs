//! Outbound delivery against a local wiremock receiver

#[cfg(test)]
mod tests {
    use crate::assert_ok;
    use crate::common::fixtures::{self, TEST_USER_ID, register_request, with_headers, with_secret};
    use helpdesk_webhooks::config::WebhooksConfig;
    use helpdesk_webhooks::core::webhooks::events::data_map;
    use helpdesk_webhooks::core::webhooks::{
        DeliveryEngine, RegisterWebhookRequest, SIGNATURE_HEADER, Webhook, WebhookPayload, verify,
    };
    use helpdesk_webhooks::storage::StorageLayer;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn register(request: RegisterWebhookRequest) -> Webhook {
        let storage = StorageLayer::in_memory();
        fixtures::registry(&storage)
            .register(request, TEST_USER_ID)
            .await
            .expect("register webhook")
    }

    #[tokio::test]
    async fn test_delivery_to_2xx_endpoint_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(header("x-webhook-event", "ticket.created"))
            .respond_with(ResponseTemplate::new(200).set_body_string("received"))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = register(register_request(
            "Receiver",
            &format!("{}/hook", server.uri()),
            &["ticket.created"],
        ))
        .await;

        let outcome = assert_ok!(
            fixtures::engine()
                .deliver(&webhook, "ticket.created", data_map(json!({"ticket_id": 7})))
                .await
        );

        assert!(outcome.result.success());
        assert_eq!(outcome.result.status_code, 200);
        assert_eq!(outcome.result.response_body, "received");
        assert!(outcome.result.transport_error.is_none());

        let payload: WebhookPayload = serde_json::from_str(&outcome.payload.body).unwrap();
        assert_eq!(payload.event, "ticket.created");
        assert_eq!(payload.data["ticket_id"], json!(7));
        assert!(payload.signature.is_none());
    }

    #[tokio::test]
    async fn test_signed_delivery_carries_verifiable_signature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("x-webhook-signature"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = register(with_secret(
            register_request("Signed", &server.uri(), &["ticket.closed"]),
            "shared-secret",
        ))
        .await;

        let outcome = assert_ok!(
            fixtures::engine()
                .deliver(&webhook, "ticket.closed", data_map(json!({"ticket_id": 1})))
                .await
        );
        assert!(outcome.result.success());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let received = &requests[0];

        let signature = received
            .headers
            .get("x-webhook-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        // the body on the wire is exactly what the ledger would store
        assert_eq!(received.body, outcome.payload.body.as_bytes());

        let mut payload: WebhookPayload = serde_json::from_slice(&received.body).unwrap();
        assert_eq!(payload.signature.as_deref(), Some(signature.as_str()));
        payload.signature = None;
        let unsigned = serde_json::to_vec(&payload).unwrap();
        assert!(verify(&unsigned, "shared-secret", &signature));
        assert!(!verify(&unsigned, "other-secret", &signature));
    }

    #[tokio::test]
    async fn test_unsigned_delivery_has_no_signature_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let webhook = register(register_request("Plain", &server.uri(), &["ticket.created"])).await;
        let outcome = assert_ok!(
            fixtures::engine()
                .deliver(&webhook, "ticket.created", data_map(json!({})))
                .await
        );
        assert!(outcome.result.success());

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get(SIGNATURE_HEADER).is_none());
        assert!(requests[0].headers.get("x-webhook-id").is_some());
    }

    #[tokio::test]
    async fn test_custom_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-tenant", "acme"))
            .and(header("authorization", "Token abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = register(with_headers(
            register_request("Headers", &server.uri(), &["ticket.created"]),
            &[("X-Tenant", "acme"), ("Authorization", "Token abc")],
        ))
        .await;

        let outcome = assert_ok!(
            fixtures::engine()
                .deliver(&webhook, "ticket.created", data_map(json!({})))
                .await
        );
        assert!(outcome.result.success());
    }

    #[tokio::test]
    async fn test_server_error_is_a_failed_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let webhook = register(register_request("Broken", &server.uri(), &["ticket.created"])).await;
        let outcome = assert_ok!(
            fixtures::engine()
                .deliver(&webhook, "ticket.created", data_map(json!({})))
                .await
        );

        assert!(!outcome.result.success());
        assert_eq!(outcome.result.status_code, 500);
        assert_eq!(outcome.result.response_body, "boom");
        assert!(outcome.result.transport_error.is_none());
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let mut request = register_request("Slow", &server.uri(), &["ticket.created"]);
        request.timeout_seconds = Some(1);
        let webhook = register(request).await;

        let outcome = assert_ok!(
            fixtures::engine()
                .deliver(&webhook, "ticket.created", data_map(json!({})))
                .await
        );

        assert!(!outcome.result.success());
        assert_eq!(outcome.result.status_code, 0);
        assert!(outcome.result.transport_error.is_some());
        assert!(outcome.result.elapsed_ms < 4_000);
    }

    #[tokio::test]
    async fn test_large_response_body_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(256 * 1024)))
            .mount(&server)
            .await;

        let engine = DeliveryEngine::new(&WebhooksConfig {
            max_response_body_bytes: 1024,
            ..fixtures::test_policy()
        })
        .expect("build engine");
        let webhook = register(register_request("Chatty", &server.uri(), &["ticket.created"])).await;

        let outcome = assert_ok!(
            engine
                .deliver(&webhook, "ticket.created", data_map(json!({})))
                .await
        );
        assert!(outcome.result.success());
        assert_eq!(outcome.result.response_body.len(), 1024);
        assert!(outcome.result.response_body.chars().all(|c| c == 'x'));
    }
}
