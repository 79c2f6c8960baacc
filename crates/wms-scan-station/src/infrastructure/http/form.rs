//! HTTP implementation of the [`SubmitClient`] port.
//!
//! A submission is one POST of the form values, as a flat JSON object, to the
//! form's action path.  Any 2xx reply counts as accepted.

use async_trait::async_trait;
use serde_json::Value;

use super::ApiClient;
use crate::application::form_submit::{SubmitClient, SubmitError};

/// Posts forms to the WMS backend.
#[derive(Debug, Clone)]
pub struct HttpFormClient {
    api: ApiClient,
}

impl HttpFormClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SubmitClient for HttpFormClient {
    async fn submit(&self, action: &str, body: &Value) -> Result<Value, SubmitError> {
        self.api
            .post(action, body)
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
