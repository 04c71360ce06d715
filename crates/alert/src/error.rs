// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the alert engine and its channels.

/// Errors that can occur registering rules or delivering alerts.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A rule was registered with an empty name.
    #[error("Alert rule names must not be empty")]
    EmptyRuleName,

    /// The webhook HTTP client could not be constructed.
    #[error("Failed to build webhook client: {details}")]
    ChannelInit {
        /// Human-readable details of the failure.
        details: String,
    },

    /// The webhook request failed before a response arrived.
    #[error("Webhook request to '{url}' failed: {details}")]
    WebhookRequest {
        /// The webhook endpoint.
        url: String,
        /// Human-readable details of the failure.
        details: String,
    },

    /// The webhook endpoint answered with a failure status.
    #[error("Webhook endpoint '{url}' answered {status}")]
    WebhookStatus {
        /// The webhook endpoint.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },
}
