//! Webhook registry against a migrated SQLite database

#[cfg(test)]
mod tests {
    use crate::common::TestDatabase;
    use crate::common::fixtures::{
        self, TEST_USER_ID, register_request, with_filters, with_headers, with_secret,
    };
    use crate::{assert_err, assert_ok};
    use helpdesk_webhooks::WebhookError;
    use helpdesk_webhooks::core::webhooks::{UpdateWebhookRequest, WebhookFilters};
    use serde_json::{Map, json};

    #[tokio::test]
    async fn test_database_health_check() {
        let db = TestDatabase::new().await;
        assert_ok!(db.db().health_check().await);
        assert_ok!(db.storage().health_check().await);
    }

    #[tokio::test]
    async fn test_register_applies_defaults() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let webhook = assert_ok!(
            registry
                .register(
                    register_request("CRM", "https://example.com/hook", &["ticket.created"]),
                    TEST_USER_ID,
                )
                .await
        );

        assert!(webhook.id > 0);
        assert!(webhook.active);
        assert_eq!(webhook.retry_count, 3);
        assert_eq!(webhook.timeout_seconds, 5);
        assert_eq!(webhook.create_by, TEST_USER_ID);
        assert_eq!(webhook.events, vec!["ticket.created".to_string()]);
        assert!(webhook.secret.is_none());
    }

    #[tokio::test]
    async fn test_register_round_trips_secret_and_headers() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let request = with_headers(
            with_secret(
                register_request(
                    "Signed",
                    "https://example.com/signed",
                    &["ticket.created", "ticket.closed"],
                ),
                "topsecret",
            ),
            &[("X-Tenant", "acme")],
        );
        let created = assert_ok!(registry.register(request, TEST_USER_ID).await);

        let fetched = assert_ok!(registry.get(created.id).await);
        assert_eq!(fetched.secret.as_deref(), Some("topsecret"));
        assert_eq!(fetched.headers.get("X-Tenant").map(String::as_str), Some("acme"));
        assert_eq!(fetched.events.len(), 2);
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_url() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let err = assert_err!(
            registry
                .register(
                    register_request("Bad", "not-a-valid-url", &["ticket.created"]),
                    TEST_USER_ID,
                )
                .await
        );
        assert!(matches!(err, WebhookError::Validation(_)));

        let err = assert_err!(
            registry
                .register(register_request("Bad", "", &["ticket.created"]), TEST_USER_ID)
                .await
        );
        assert!(matches!(err, WebhookError::Validation(_)));

        // nothing was persisted
        assert!(assert_ok!(registry.list(None).await).is_empty());
    }

    #[tokio::test]
    async fn test_list_filters_on_active() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let first = assert_ok!(
            registry
                .register(
                    register_request("One", "https://example.com/1", &["ticket.created"]),
                    TEST_USER_ID,
                )
                .await
        );
        assert_ok!(
            registry
                .register(
                    register_request("Two", "https://example.com/2", &["ticket.created"]),
                    TEST_USER_ID,
                )
                .await
        );

        let deactivate = UpdateWebhookRequest {
            active: Some(false),
            ..Default::default()
        };
        assert_ok!(registry.update(first.id, deactivate, 2).await);

        assert_eq!(assert_ok!(registry.list(None).await).len(), 2);
        let active = assert_ok!(registry.list(Some(true)).await);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Two");
        let inactive = assert_ok!(registry.list(Some(false)).await);
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].change_by, 2);
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let created = assert_ok!(
            registry
                .register(
                    with_secret(
                        register_request("Orig", "https://example.com/hook", &["ticket.created"]),
                        "s1",
                    ),
                    TEST_USER_ID,
                )
                .await
        );

        let update = UpdateWebhookRequest {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = assert_ok!(registry.update(created.id, update, TEST_USER_ID).await);
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.url, created.url);
        assert_eq!(updated.secret.as_deref(), Some("s1"));
        assert!(updated.change_time >= created.change_time);

        let clear_secret = UpdateWebhookRequest {
            secret: Some(String::new()),
            ..Default::default()
        };
        let updated = assert_ok!(registry.update(created.id, clear_secret, TEST_USER_ID).await);
        assert!(updated.secret.is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_webhook() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let update = UpdateWebhookRequest {
            name: Some("x".to_string()),
            ..Default::default()
        };
        let err = assert_err!(registry.update(404, update, TEST_USER_ID).await);
        assert!(matches!(err, WebhookError::NotFound(_)));

        let err = assert_err!(registry.delete(404).await);
        assert!(matches!(err, WebhookError::NotFound(_)));

        let err = assert_err!(registry.get(404).await);
        assert!(matches!(err, WebhookError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_subscribers_match_event_and_active() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let tickets = assert_ok!(
            registry
                .register(
                    register_request("Tickets", "https://example.com/t", &["ticket.created"]),
                    TEST_USER_ID,
                )
                .await
        );
        assert_ok!(
            registry
                .register(
                    register_request("Articles", "https://example.com/a", &["article.created"]),
                    TEST_USER_ID,
                )
                .await
        );

        let subscribers = assert_ok!(registry.subscribers("ticket.created", &Map::new()).await);
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].id, tickets.id);

        let deactivate = UpdateWebhookRequest {
            active: Some(false),
            ..Default::default()
        };
        assert_ok!(registry.update(tickets.id, deactivate, TEST_USER_ID).await);
        assert!(assert_ok!(registry.subscribers("ticket.created", &Map::new()).await).is_empty());
    }

    #[tokio::test]
    async fn test_filters_round_trip_and_update() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let filters = WebhookFilters {
            queue_ids: vec![2],
            priorities: vec!["high".to_string()],
            ..Default::default()
        };
        let created = assert_ok!(
            registry
                .register(
                    with_filters(
                        register_request("Urgent", "https://example.com/u", &["ticket.created"]),
                        filters.clone(),
                    ),
                    TEST_USER_ID,
                )
                .await
        );
        assert_eq!(assert_ok!(registry.get(created.id).await).filters, filters);

        let urgent = json!({"queue_id": 2, "priority": "high"});
        let routine = json!({"queue_id": 2, "priority": "low"});
        let data = |v: serde_json::Value| v.as_object().cloned().unwrap_or_default();
        assert_eq!(
            assert_ok!(registry.subscribers("ticket.created", &data(urgent.clone())).await).len(),
            1
        );
        assert!(
            assert_ok!(registry.subscribers("ticket.created", &data(routine.clone())).await)
                .is_empty()
        );

        // clearing the filters subscribes the webhook to every ticket again
        let clear = UpdateWebhookRequest {
            filters: Some(WebhookFilters::default()),
            ..Default::default()
        };
        let updated = assert_ok!(registry.update(created.id, clear, TEST_USER_ID).await);
        assert!(updated.filters.is_empty());
        assert_eq!(
            assert_ok!(registry.subscribers("ticket.created", &data(routine)).await).len(),
            1
        );
    }

    #[tokio::test]
    async fn test_malformed_json_columns_degrade_to_empty() {
        let db = TestDatabase::new().await;
        let registry = fixtures::registry(&db.storage());

        let request = with_filters(
            with_headers(
                register_request("Legacy", "https://example.com/l", &["ticket.created"]),
                &[("X-Tenant", "acme")],
            ),
            WebhookFilters {
                statuses: vec!["open".to_string()],
                ..Default::default()
            },
        );
        let created = assert_ok!(registry.register(request, TEST_USER_ID).await);

        db.execute(&format!(
            "UPDATE webhooks SET events = 'not json', headers = '{{broken', filters = '[' \
             WHERE id = {}",
            created.id
        ))
        .await;

        let listed = assert_ok!(registry.list(None).await);
        assert_eq!(listed.len(), 1);
        assert!(listed[0].events.is_empty());
        assert!(listed[0].headers.is_empty());
        assert!(listed[0].filters.is_empty());

        let fetched = assert_ok!(registry.get(created.id).await);
        assert_eq!(fetched.name, "Legacy");
        assert!(fetched.events.is_empty());

        // no events means no subscriptions
        assert!(assert_ok!(registry.subscribers("ticket.created", &Map::new()).await).is_empty());
    }
}
