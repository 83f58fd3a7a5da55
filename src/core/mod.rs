//! Core functionality for the webhook service
//!
//! This module contains the business logic and data structures.

pub mod webhooks;
