//! Delivery ledger against a migrated SQLite database

#[cfg(test)]
mod tests {
    use crate::common::TestDatabase;
    use crate::common::fixtures::{self, TEST_USER_ID, register_request};
    use crate::{assert_err, assert_ok};
    use chrono::{Duration, Utc};
    use helpdesk_webhooks::WebhookError;
    use helpdesk_webhooks::core::webhooks::{DeliveryResult, Webhook};
    use helpdesk_webhooks::storage::StorageLayer;

    fn ok_result() -> DeliveryResult {
        DeliveryResult {
            status_code: 200,
            response_body: "ok".to_string(),
            elapsed_ms: 15,
            transport_error: None,
        }
    }

    fn failed_result() -> DeliveryResult {
        DeliveryResult {
            status_code: 503,
            response_body: String::new(),
            elapsed_ms: 40,
            transport_error: None,
        }
    }

    async fn webhook(storage: &StorageLayer) -> Webhook {
        fixtures::registry(storage)
            .register(
                register_request("Ledger", "https://example.com/hook", &["ticket.created"]),
                TEST_USER_ID,
            )
            .await
            .expect("register webhook")
    }

    #[tokio::test]
    async fn test_record_delivery_success_and_failure() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);
        let webhook = webhook(&storage).await;

        let ok = assert_ok!(
            ledger
                .record_delivery(webhook.id, "ticket.created", "{\"a\":1}", &ok_result())
                .await
        );
        assert_eq!(ok.attempts, 1);
        assert!(ok.success);
        assert_eq!(ok.status_code, 200);
        assert_eq!(ok.response.as_deref(), Some("ok"));
        assert!(ok.delivered_at.is_some());
        assert!(ok.next_retry.is_none());
        assert_eq!(ok.payload, "{\"a\":1}");

        let failed = assert_ok!(
            ledger
                .record_delivery(webhook.id, "ticket.created", "{}", &failed_result())
                .await
        );
        assert!(!failed.success);
        assert!(failed.delivered_at.is_none());
        assert!(failed.response.is_none());

        let transport = assert_ok!(
            ledger
                .record_delivery(
                    webhook.id,
                    "ticket.created",
                    "{}",
                    &DeliveryResult::transport_failure("connection refused", 3),
                )
                .await
        );
        assert_eq!(transport.status_code, 0);
        assert_eq!(transport.error_message.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_list_deliveries_newest_first_and_capped() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);
        let webhook = webhook(&storage).await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            let delivery = assert_ok!(
                ledger
                    .record_delivery(webhook.id, "ticket.created", "{}", &ok_result())
                    .await
            );
            ids.push(delivery.id);
        }

        let listed = assert_ok!(ledger.list_deliveries(webhook.id, None).await);
        let listed_ids: Vec<i32> = listed.iter().map(|d| d.id).collect();
        ids.reverse();
        assert_eq!(listed_ids, ids);

        let limited = assert_ok!(ledger.list_deliveries(webhook.id, Some(2)).await);
        assert_eq!(limited.len(), 2);

        // unknown webhook: empty, not an error
        assert!(assert_ok!(ledger.list_deliveries(9999, None).await).is_empty());
    }

    #[tokio::test]
    async fn test_retry_delivery_increments_attempts() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);
        let webhook = webhook(&storage).await;

        let delivery = assert_ok!(
            ledger
                .record_delivery(webhook.id, "ticket.created", "{}", &failed_result())
                .await
        );

        let before = Utc::now();
        let retried = assert_ok!(ledger.retry_delivery(delivery.id).await);
        assert_eq!(retried.attempts, 2);
        let next_retry = retried.next_retry.expect("next_retry set");
        assert!(next_retry >= before + Duration::seconds(59));

        let retried = assert_ok!(ledger.retry_delivery(delivery.id).await);
        assert_eq!(retried.attempts, 3);

        let err = assert_err!(ledger.retry_delivery(123_456).await);
        assert!(matches!(err, WebhookError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_due_retries_and_record_attempt() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);
        let webhook = webhook(&storage).await;

        let delivery = assert_ok!(
            ledger
                .record_delivery(webhook.id, "ticket.created", "{}", &failed_result())
                .await
        );
        assert_ok!(ledger.retry_delivery(delivery.id).await);

        assert!(assert_ok!(ledger.due_retries(Utc::now()).await).is_empty());
        let due = assert_ok!(ledger.due_retries(Utc::now() + Duration::minutes(5)).await);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, delivery.id);

        assert_ok!(ledger.record_attempt(delivery.id, &ok_result(), None).await);
        let stored = assert_ok!(ledger.get_delivery(delivery.id).await);
        assert!(stored.success);
        assert!(stored.delivered_at.is_some());
        assert!(stored.next_retry.is_none());
        assert_eq!(stored.attempts, 2);

        assert!(
            assert_ok!(ledger.due_retries(Utc::now() + Duration::minutes(5)).await).is_empty()
        );
    }

    #[tokio::test]
    async fn test_stats_and_purge() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);
        let webhook = webhook(&storage).await;

        for result in [ok_result(), ok_result(), ok_result(), failed_result()] {
            assert_ok!(
                ledger
                    .record_delivery(webhook.id, "ticket.created", "{}", &result)
                    .await
            );
        }

        let stats = assert_ok!(ledger.stats(webhook.id).await);
        assert_eq!(stats.total_deliveries, 4);
        assert_eq!(stats.successful_deliveries, 3);
        assert_eq!(stats.failed_deliveries, 1);
        assert_eq!(stats.pending_retries, 0);
        assert!((stats.success_rate - 75.0).abs() < f64::EPSILON);
        assert_eq!(stats.average_response_time_ms, 21);
        let last_success = stats.last_success_at.expect("a success was recorded");
        let last_failure = stats.last_failure_at.expect("a failure was recorded");
        assert!(last_failure >= last_success);
        assert_eq!(stats.last_delivery_at, Some(last_failure));

        let emptied = assert_ok!(ledger.stats(webhook.id + 1000).await);
        assert_eq!(emptied.average_response_time_ms, 0);
        assert!(emptied.last_success_at.is_none());
        assert!(emptied.last_failure_at.is_none());

        // nothing is older than the retention window yet
        assert_eq!(assert_ok!(ledger.purge_expired(Utc::now()).await), 0);
        let far_future = Utc::now() + Duration::days(365);
        assert_eq!(assert_ok!(ledger.purge_expired(far_future).await), 4);
        assert_eq!(assert_ok!(ledger.stats(webhook.id).await).total_deliveries, 0);
    }

    #[tokio::test]
    async fn test_delete_webhook_removes_deliveries() {
        let db = TestDatabase::new().await;
        let storage = db.storage();
        let ledger = fixtures::ledger(&storage);
        let registry = fixtures::registry(&storage);
        let webhook = webhook(&storage).await;

        let delivery = assert_ok!(
            ledger
                .record_delivery(webhook.id, "ticket.created", "{}", &ok_result())
                .await
        );

        assert_ok!(registry.delete(webhook.id).await);
        let err = assert_err!(ledger.get_delivery(delivery.id).await);
        assert!(matches!(err, WebhookError::NotFound(_)));
        assert!(assert_ok!(registry.list(None).await).is_empty());
    }
}
