use serde::{Deserialize, Serialize};

/// Request action, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Get,
    Set,
    Subscribe,
    Unsubscribe,
}

/// A VISS request, as it arrives on a transport channel.
///
/// `MgrId`/`ClientId` are stamped by the transport manager edge before the
/// envelope reaches the core; the dispatcher only ever preserves and
/// echoes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub action: Action,
    pub path: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "MgrId")]
    pub mgr_id: u16,
    #[serde(rename = "ClientId")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(
        rename = "subscriptionId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription_id: Option<String>,
}

/// One `{number, reason, message}` error detail, per spec.md §3's error
/// response template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub number: String,
    pub reason: String,
    pub message: String,
}

/// A VISS response, echoing the originating request's correlation fields.
///
/// At most one of `value`, `metadata`, `error` is populated — callers
/// construct a fresh envelope per response rather than mutating a shared
/// template (spec.md §9's "shared errorResponseMap" design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub action: Action,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "MgrId")]
    pub mgr_id: u16,
    #[serde(rename = "ClientId")]
    pub client_id: String,
    pub timestamp: String,
    /// A plain string for a single match, or a JSON array of
    /// `{"path":P,"value":V}` objects for an aggregated multi-match reply
    /// (spec.md §4.H step 6) — hence `serde_json::Value` rather than `String`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(
        rename = "subscriptionId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl ResponseEnvelope {
    /// Build a fresh error envelope echoing `request`'s correlation fields.
    pub fn error_for(
        request: &RequestEnvelope,
        number: &str,
        reason: &str,
        message: &str,
        timestamp: impl Into<String>,
    ) -> Self {
        ResponseEnvelope {
            action: request.action,
            request_id: request.request_id.clone(),
            mgr_id: request.mgr_id,
            client_id: request.client_id.clone(),
            timestamp: timestamp.into(),
            value: None,
            metadata: None,
            subscription_id: None,
            error: Some(ErrorDetail {
                number: number.to_string(),
                reason: reason.to_string(),
                message: message.to_string(),
            }),
        }
    }

    pub fn value_for(
        request: &RequestEnvelope,
        value: impl Into<serde_json::Value>,
        timestamp: impl Into<String>,
    ) -> Self {
        ResponseEnvelope {
            action: request.action,
            request_id: request.request_id.clone(),
            mgr_id: request.mgr_id,
            client_id: request.client_id.clone(),
            timestamp: timestamp.into(),
            value: Some(value.into()),
            metadata: None,
            subscription_id: None,
            error: None,
        }
    }

    /// Build a response from a service manager's raw reply to a single
    /// matched leaf, preserving everything beyond the bare `value` that
    /// `aggregate`'s multi-match array form has no room for: an `error`
    /// object reported by the service itself becomes this response's
    /// error (rather than being silently treated as a successful `null`),
    /// and a `subscriptionId` the service attached rides along so the
    /// client can later `unsubscribe` (spec.md §4.H step 6, mirroring the
    /// original's single-match passthrough).
    pub fn from_reply(request: &RequestEnvelope, reply: ServiceReply, timestamp: impl Into<String>) -> Self {
        if let Some(error) = reply.error() {
            return ResponseEnvelope {
                action: request.action,
                request_id: request.request_id.clone(),
                mgr_id: request.mgr_id,
                client_id: request.client_id.clone(),
                timestamp: timestamp.into(),
                value: None,
                metadata: None,
                subscription_id: None,
                error: Some(error),
            };
        }
        ResponseEnvelope {
            action: request.action,
            request_id: request.request_id.clone(),
            mgr_id: request.mgr_id,
            client_id: request.client_id.clone(),
            timestamp: timestamp.into(),
            value: reply.value.map(serde_json::Value::String),
            metadata: None,
            subscription_id: reply.subscription_id(),
            error: None,
        }
    }

    pub fn metadata_for(
        request: &RequestEnvelope,
        metadata: serde_json::Value,
        timestamp: impl Into<String>,
    ) -> Self {
        ResponseEnvelope {
            action: request.action,
            request_id: request.request_id.clone(),
            mgr_id: request.mgr_id,
            client_id: request.client_id.clone(),
            timestamp: timestamp.into(),
            value: None,
            metadata: Some(metadata),
            subscription_id: None,
            error: None,
        }
    }
}

/// A raw reply from a service manager, as read off a service data socket.
///
/// Only the `value` field is interpreted by aggregation (spec.md §4.H
/// step 6); everything else in the raw reply is preserved verbatim when
/// there is a single accepted match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl ServiceReply {
    /// The service's own `error` object, if it reported one instead of a
    /// value (spec.md §4.H step 6 — a single-match error must surface as
    /// an error response, not a successful `value: null`).
    pub fn error(&self) -> Option<ErrorDetail> {
        self.rest
            .get("error")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The `subscriptionId` a service attaches to a `subscribe` reply, so
    /// the client can later address it with `unsubscribe`.
    pub fn subscription_id(&self) -> Option<String> {
        self.rest
            .get("subscriptionId")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    }
}
