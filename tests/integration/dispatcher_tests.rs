//! Event fan-out and the retry worker

#[cfg(test)]
mod tests {
    use crate::common::TestDatabase;
    use crate::common::fixtures::{self, TEST_USER_ID, register_request, with_filters, with_secret};
    use crate::{assert_ok, eventually};
    use chrono::{Duration, Utc};
    use helpdesk_webhooks::core::webhooks::events::data_map;
    use helpdesk_webhooks::core::webhooks::{
        DeliveryLedger, Event, EventType, RetryWorker, UpdateWebhookRequest, Webhook,
        WebhookDelivery, WebhookFilters,
    };
    use helpdesk_webhooks::storage::StorageLayer;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_status(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    async fn register(storage: &StorageLayer, url: &str, events: &[&str]) -> Webhook {
        fixtures::registry(storage)
            .register(register_request("Subscriber", url, events), TEST_USER_ID)
            .await
            .expect("register webhook")
    }

    fn worker(storage: &StorageLayer) -> RetryWorker {
        RetryWorker::new(
            fixtures::registry(storage),
            fixtures::engine(),
            fixtures::ledger(storage),
            fixtures::test_policy(),
        )
    }

    /// Wait for the background ledger task to write the first row, with its retry scheduled if due
    async fn first_delivery(ledger: &DeliveryLedger, webhook_id: i32, expect_retry: bool) -> WebhookDelivery {
        eventually!(async {
            ledger
                .list_deliveries(webhook_id, None)
                .await
                .map(|d| d.len() == 1 && (!expect_retry || d[0].next_retry.is_some()))
                .unwrap_or(false)
        });
        ledger
            .list_deliveries(webhook_id, None)
            .await
            .expect("list deliveries")
            .remove(0)
    }

    #[tokio::test]
    async fn test_dispatch_fans_out_to_subscribers() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);

        let healthy = mock_status(200).await;
        let broken = mock_status(500).await;
        let unrelated = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&unrelated)
            .await;

        let ok_hook = register(&storage, &healthy.uri(), &["ticket.created"]).await;
        let failing_hook = register(&storage, &broken.uri(), &["ticket.created", "ticket.closed"]).await;
        register(&storage, &unrelated.uri(), &["article.created"]).await;

        let event = Event::new(EventType::TicketCreated, data_map(json!({"ticket_id": 99})))
            .with_user(TEST_USER_ID);
        let report = assert_ok!(fixtures::dispatcher(&storage).dispatch(&event).await);

        assert_eq!(report.event_type, "ticket.created");
        assert_eq!(report.matched, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.deliveries.len(), 2);

        let ok_delivery = first_delivery(&ledger, ok_hook.id, false).await;
        assert!(ok_delivery.success);
        assert_eq!(ok_delivery.attempts, 1);
        assert!(ok_delivery.next_retry.is_none());

        // failed deliveries with a retry budget get their first retry queued
        let failed_delivery = first_delivery(&ledger, failing_hook.id, true).await;
        assert!(!failed_delivery.success);
        assert_eq!(failed_delivery.status_code, 500);
        assert_eq!(failed_delivery.attempts, 2);
    }

    #[tokio::test]
    async fn test_dispatch_without_subscribers() {
        let storage = StorageLayer::in_memory();
        let event = assert_ok!(Event::custom("queue.created", data_map(json!({}))));

        let report = assert_ok!(fixtures::dispatcher(&storage).dispatch(&event).await);
        assert_eq!(report.matched, 0);
        assert!(report.deliveries.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_dispatch_records_in_background() {
        let storage = StorageLayer::in_memory();
        let ledger = fixtures::ledger(&storage);
        let server = mock_status(200).await;
        let webhook = register(&storage, &server.uri(), &["customer.created"]).await;

        let handle = fixtures::dispatcher(&storage)
            .spawn_dispatch(Event::new(EventType::CustomerCreated, data_map(json!({"id": 5}))));
        assert_ok!(handle.await);

        let delivery = first_delivery(&ledger, webhook.id, false).await;
        assert!(delivery.success);
        assert_eq!(delivery.event_type, "customer.created");
    }

    #[tokio::test]
    async fn test_retry_worker_resends_stored_payload() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let webhook = fixtures::registry(&storage)
            .register(
                with_secret(
                    register_request("Flaky", &server.uri(), &["ticket.escalated"]),
                    "retry-secret",
                ),
                TEST_USER_ID,
            )
            .await
            .expect("register webhook");

        let event = Event::new(EventType::TicketEscalated, data_map(json!({"ticket_id": 3})));
        let report = assert_ok!(fixtures::dispatcher(&storage).dispatch(&event).await);
        assert_eq!(report.failed, 1);

        let delivery = first_delivery(&ledger, webhook.id, true).await;

        // not due yet
        let run = assert_ok!(worker(&storage).run_once(Utc::now()).await);
        assert_eq!(run.attempted, 0);

        let run = assert_ok!(worker(&storage).run_once(Utc::now() + Duration::minutes(2)).await);
        assert_eq!(run.attempted, 1);
        assert_eq!(run.succeeded, 1);

        let stored = assert_ok!(ledger.get_delivery(delivery.id).await);
        assert!(stored.success);
        assert_eq!(stored.status_code, 200);
        assert_eq!(stored.attempts, 2);
        assert!(stored.delivered_at.is_some());
        assert!(stored.next_retry.is_none());

        // byte-identical resend with the original signature
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body, requests[1].body);
        assert_eq!(
            requests[0].headers.get("x-webhook-signature"),
            requests[1].headers.get("x-webhook-signature")
        );
        assert!(requests[1].headers.get("x-webhook-signature").is_some());
    }

    #[tokio::test]
    async fn test_retry_budget_is_exhausted() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);
        let server = mock_status(500).await;

        let mut request = register_request("Down", &server.uri(), &["sla.breached"]);
        request.retry_count = Some(1);
        let webhook = fixtures::registry(&storage)
            .register(request, TEST_USER_ID)
            .await
            .expect("register webhook");

        let event = Event::new(EventType::SlaBreached, data_map(json!({})));
        assert_ok!(fixtures::dispatcher(&storage).dispatch(&event).await);
        let delivery = first_delivery(&ledger, webhook.id, true).await;

        let run = assert_ok!(worker(&storage).run_once(Utc::now() + Duration::minutes(2)).await);
        assert_eq!(run.attempted, 1);
        assert_eq!(run.exhausted, 1);
        assert_eq!(run.rescheduled, 0);

        let stored = assert_ok!(ledger.get_delivery(delivery.id).await);
        assert!(!stored.success);
        assert!(stored.next_retry.is_none());
        assert!(
            assert_ok!(ledger.due_retries(Utc::now() + Duration::days(1)).await).is_empty()
        );
    }

    #[tokio::test]
    async fn test_failed_retry_is_rescheduled_within_budget() {
        let storage = StorageLayer::in_memory();
        let ledger = fixtures::ledger(&storage);
        let server = mock_status(502).await;
        let webhook = register(&storage, &server.uri(), &["ticket.reopened"]).await;

        let event = Event::new(EventType::TicketReopened, data_map(json!({})));
        assert_ok!(fixtures::dispatcher(&storage).dispatch(&event).await);
        let delivery = first_delivery(&ledger, webhook.id, true).await;

        let run = assert_ok!(worker(&storage).run_once(Utc::now() + Duration::minutes(2)).await);
        assert_eq!(run.rescheduled, 1);

        let stored = assert_ok!(ledger.get_delivery(delivery.id).await);
        assert_eq!(stored.attempts, 3);
        assert!(stored.next_retry.is_some());
        assert_eq!(stored.status_code, 502);
    }

    #[tokio::test]
    async fn test_inactive_webhook_deliveries_are_parked() {
        let storage = StorageLayer::in_memory();
        let ledger = fixtures::ledger(&storage);
        let server = mock_status(500).await;
        let webhook = register(&storage, &server.uri(), &["queue.updated"]).await;

        let event = Event::new(EventType::QueueUpdated, data_map(json!({})));
        assert_ok!(fixtures::dispatcher(&storage).dispatch(&event).await);
        let delivery = first_delivery(&ledger, webhook.id, true).await;

        let deactivate = UpdateWebhookRequest {
            active: Some(false),
            ..Default::default()
        };
        assert_ok!(
            fixtures::registry(&storage)
                .update(webhook.id, deactivate, TEST_USER_ID)
                .await
        );

        let run = assert_ok!(worker(&storage).run_once(Utc::now() + Duration::minutes(2)).await);
        assert_eq!(run.parked, 1);
        assert_eq!(run.attempted, 0);

        let stored = assert_ok!(ledger.get_delivery(delivery.id).await);
        assert!(stored.next_retry.is_none());
        assert_eq!(stored.attempts, 2);
    }

    #[tokio::test]
    async fn test_dispatch_skips_webhooks_filtered_out() {
        let storage = StorageLayer::in_memory();
        let ledger = fixtures::ledger(&storage);

        let urgent = mock_status(200).await;
        let muted = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&muted)
            .await;

        let urgent_hook = register(&storage, &urgent.uri(), &["ticket.created"]).await;
        let muted_hook = fixtures::registry(&storage)
            .register(
                with_filters(
                    register_request("Queue 7", &muted.uri(), &["ticket.created"]),
                    WebhookFilters {
                        queue_ids: vec![7],
                        ..Default::default()
                    },
                ),
                TEST_USER_ID,
            )
            .await
            .expect("register webhook");

        let event = Event::new(
            EventType::TicketCreated,
            data_map(json!({"ticket_id": 1, "queue_id": 2, "priority": "high"})),
        );
        let report = assert_ok!(fixtures::dispatcher(&storage).dispatch(&event).await);
        assert_eq!(report.matched, 1);
        assert_eq!(report.deliveries[0].webhook_id, urgent_hook.id);

        first_delivery(&ledger, urgent_hook.id, false).await;
        assert!(assert_ok!(ledger.list_deliveries(muted_hook.id, None).await).is_empty());
    }

    #[tokio::test]
    async fn test_retry_worker_resends_concurrently() {
        let storage = StorageLayer::in_memory();
        let ledger = fixtures::ledger(&storage);

        let delay = std::time::Duration::from_millis(400);
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_delay(delay))
            .mount(&server)
            .await;

        let mut hooks = Vec::new();
        for _ in 0..4 {
            hooks.push(register(&storage, &server.uri(), &["ticket.updated"]).await);
        }

        let event = Event::new(EventType::TicketUpdated, data_map(json!({"ticket_id": 8})));
        let report = assert_ok!(fixtures::dispatcher(&storage).dispatch(&event).await);
        assert_eq!(report.failed, 4);
        for hook in &hooks {
            first_delivery(&ledger, hook.id, true).await;
        }

        let started = std::time::Instant::now();
        let run = assert_ok!(worker(&storage).run_once(Utc::now() + Duration::minutes(2)).await);
        assert_eq!(run.attempted, 4);
        assert_eq!(run.rescheduled, 4);
        // four sequential resends would take at least four delays
        assert!(started.elapsed() < delay * 3);
    }
}
