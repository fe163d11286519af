use mileage_tracker_lib::mileage_record::{MileageAck, MileageRecord, NewMileageRecord};
use reqwest::{Client, IntoUrl, Method, RequestBuilder, Url};
use serde_json::{json, Value};

use super::{endpoints::*, MileageApi};
use crate::{config::Configuration, TrackerError};

/// JSON-over-HTTP client for the backend. Every request carries the user id header.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    user_id: String,
}

impl ApiClient {
    pub fn new(config: &Configuration) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TrackerError::Config(format!("Failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/mileage/{id}` with the id as a single encoded path segment.
    fn entry_url(&self, id: &str) -> Result<Url, TrackerError> {
        if matches!(id, "" | "." | "..") {
            return Err(TrackerError::Submission(format!("Invalid entry id: '{id}'")));
        }

        let mut url = Url::parse(&self.url(MILEAGE))
            .map_err(|e| TrackerError::Config(format!("Invalid api_base_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TrackerError::Config("api_base_url cannot have a path".to_string()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(USER_ID_HEADER, &self.user_id)
    }

    /// Sends the request and returns the JSON body. A non-success status, or a
    /// success status whose body carries an `error` field, is a `Submission` error.
    async fn send(&self, request: RequestBuilder) -> Result<Value, TrackerError> {
        let response = request
            .send()
            .await
            .map_err(|e| TrackerError::Submission(format!("Request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TrackerError::Submission(format!("Failed to read response: {e}")))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                Err(_) if status.is_success() => {
                    return Err(TrackerError::Submission("Response was not valid JSON".to_string()));
                }
                Err(_) => Value::Null,
            }
        };

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| format!("Server responded with {status}"));
            tracing::warn!("{} {}", status, message);
            return Err(TrackerError::Submission(message));
        }

        if let Some(message) = body.get(ERROR).and_then(Value::as_str) {
            tracing::warn!("Server reported error: {}", message);
            return Err(TrackerError::Submission(message.to_string()));
        }

        Ok(body)
    }
}

fn error_message(body: &Value) -> Option<String> {
    [DETAIL, ERROR]
        .iter()
        .find_map(|key| body.get(*key))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, TrackerError> {
    serde_json::from_value(body).map_err(|e| TrackerError::Submission(format!("Unexpected response: {e}")))
}

#[async_trait::async_trait]
impl MileageApi for ApiClient {
    async fn list_entries(&self) -> Result<Vec<MileageRecord>, TrackerError> {
        let body = self.send(self.request(Method::GET, self.url(MILEAGE))).await?;

        // Older backends wrap the list
        match body {
            Value::Array(_) => decode(body),
            Value::Object(mut map) => match map.remove(ENTRIES) {
                Some(entries) => decode(entries),
                None => Ok(Vec::new()),
            },
            _ => Ok(Vec::new()),
        }
    }

    async fn add_entry(&self, record: &NewMileageRecord) -> Result<MileageAck, TrackerError> {
        let body = self.send(self.request(Method::POST, self.url(MILEAGE_ADD)).json(record)).await?;
        tracing::debug!("Mileage save response: {}", body);

        // The record is saved at this point, an unrecognised body only loses the id
        Ok(serde_json::from_value(body).unwrap_or_default())
    }

    async fn update_purpose(&self, id: &str, purpose: &str) -> Result<(), TrackerError> {
        let request = self
            .request(Method::PUT, self.entry_url(id)?)
            .json(&json!({ "purpose": purpose }));
        self.send(request).await.map(|_| ())
    }

    async fn delete_entry(&self, id: &str) -> Result<(), TrackerError> {
        self.send(self.request(Method::DELETE, self.entry_url(id)?)).await.map(|_| ())
    }

    async fn weekly_mileage(&self) -> Result<f64, TrackerError> {
        let body = self.send(self.request(Method::GET, self.url(MILEAGE_WEEKLY))).await?;
        Ok(body.get(WEEKLY_MILEAGE).and_then(Value::as_f64).unwrap_or(0.))
    }
}
