//! Integration tests for helpdesk-webhooks
//!
//! These tests exercise the services against a real SQLite database and a
//! local HTTP receiver.

pub mod delivery_tests;
pub mod dispatcher_tests;
pub mod ledger_tests;
pub mod registry_tests;
