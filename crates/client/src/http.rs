//! reqwest-backed remote collection.

use std::marker::PhantomData;

use async_trait::async_trait;
use oneflow_core::error::NON_FIELD;
use oneflow_core::{Entity, FieldErrors, RecordId};
use oneflow_sync::{RemoteCollection, SyncError};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One `/api/{resource}/` collection over HTTP.
///
/// Cheap to clone; clones share the underlying connection pool.
pub struct HttpCollection<E> {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for HttpCollection<E> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> core::fmt::Debug for HttpCollection<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpCollection")
            .field("url", &self.collection_url())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<E> {
    Plain(Vec<E>),
    Page { results: Vec<E> },
}

impl<E: Entity> HttpCollection<E> {
    /// `api_url` is the backend origin (e.g. `http://localhost:8000`).
    pub fn new(client: reqwest::Client, api_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
            token,
            _entity: PhantomData,
        }
    }

    pub fn collection_url(&self) -> String {
        format!("{}/api/{}/", self.base_url, E::RESOURCE)
    }

    pub fn record_url(&self, id: &RecordId) -> String {
        format!("{}/api/{}/{}/", self.base_url, E::RESOURCE, id)
    }

    async fn send(&self, req: RequestBuilder, id: Option<&RecordId>) -> Result<Response, SyncError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(error_from_response(resp, id).await)
        }
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SyncError> {
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(resource = E::RESOURCE, status, error = %e, "undecodable response body");
            SyncError::malformed(status, e.to_string())
        })
    }
}

#[async_trait]
impl<E: Entity> RemoteCollection<E> for HttpCollection<E> {
    async fn fetch_all(&self) -> Result<Vec<E>, SyncError> {
        let resp = self.send(self.client.get(self.collection_url()), None).await?;
        Ok(match Self::decode::<Listing<E>>(resp).await? {
            Listing::Plain(records) => records,
            Listing::Page { results } => results,
        })
    }

    async fn fetch(&self, id: &RecordId) -> Result<E, SyncError> {
        let resp = self.send(self.client.get(self.record_url(id)), Some(id)).await?;
        Self::decode(resp).await
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, SyncError> {
        let resp = self
            .send(self.client.post(self.collection_url()).json(draft), None)
            .await?;
        Self::decode(resp).await
    }

    async fn update(&self, id: &RecordId, patch: &E::Patch) -> Result<E, SyncError> {
        let resp = self
            .send(self.client.patch(self.record_url(id)).json(patch), Some(id))
            .await?;
        Self::decode(resp).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), SyncError> {
        self.send(self.client.delete(self.record_url(id)), Some(id)).await?;
        Ok(())
    }
}

async fn error_from_response(resp: Response, id: Option<&RecordId>) -> SyncError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).ok();

    match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => return SyncError::NotFound(id.clone()),
        (StatusCode::CONFLICT, _) => return SyncError::Conflict(message_of(body.as_ref(), &text)),
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, _) => {
            if let Some(Value::Object(fields)) = &body {
                return SyncError::Validation(field_errors(fields));
            }
        }
        _ => {}
    }
    SyncError::server(status.as_u16(), message_of(body.as_ref(), &text))
}

/// `{"field": ["msg", ...], "detail": "..."}` into per-field messages.
fn field_errors(fields: &serde_json::Map<String, Value>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (key, value) in fields {
        let field = match key.as_str() {
            "detail" | "non_field_errors" => NON_FIELD,
            other => other,
        };
        match value {
            Value::Array(items) => {
                for item in items {
                    errors.add(field, text_of(item));
                }
            }
            other => errors.add(field, text_of(other)),
        }
    }
    if errors.is_empty() {
        errors.add(NON_FIELD, "request rejected");
    }
    errors
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn message_of(body: Option<&Value>, raw: &str) -> String {
    body.and_then(|b| b.get("detail"))
        .map(text_of)
        .unwrap_or_else(|| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_and_non_field_errors_share_the_non_field_key() {
        let body = json!({
            "detail": "Invalid order",
            "non_field_errors": ["Totals do not match"],
            "order_number": ["This field is required.", "Must be unique."]
        });
        let Value::Object(fields) = body else { unreachable!() };
        let errors = field_errors(&fields);

        assert_eq!(
            errors.get(NON_FIELD),
            Some(&["Invalid order".to_string(), "Totals do not match".to_string()][..])
        );
        assert_eq!(errors.get("order_number").map(<[String]>::len), Some(2));
    }

    #[test]
    fn empty_object_still_reports_something() {
        let errors = field_errors(&serde_json::Map::new());
        assert!(errors.get(NON_FIELD).is_some());
    }

    #[test]
    fn message_prefers_detail() {
        let body = json!({"detail": "stale version"});
        assert_eq!(message_of(Some(&body), "ignored"), "stale version");
        assert_eq!(message_of(None, " bad gateway \n"), "bad gateway");
    }

    #[test]
    fn urls_keep_the_trailing_slash() {
        let remote = HttpCollection::<oneflow_sales::SalesOrder>::new(
            reqwest::Client::new(),
            "http://erp.local/",
            None,
        );
        assert_eq!(remote.collection_url(), "http://erp.local/api/sales-orders/");
        assert_eq!(remote.record_url(&RecordId::from(7u64)), "http://erp.local/api/sales-orders/7/");
    }
}
