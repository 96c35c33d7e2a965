use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::db::error::TagStoreError;
use crate::server::http::{send_with_retry, RetryPolicy};

/// One column-name → value mapping per result row.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub q: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// Executes parameterized statements against the remote database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Runs all statements in one request and returns one row set per statement.
    async fn execute_batch(&self, statements: Vec<Statement>) -> Result<Vec<Vec<Row>>, TagStoreError>;

    async fn execute(&self, statement: Statement) -> Result<Vec<Row>, TagStoreError> {
        let mut results = self.execute_batch(vec![statement]).await?;
        if results.is_empty() {
            return Ok(Vec::new());
        }
        Ok(results.swap_remove(0))
    }
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    statements: &'a [Statement],
}

#[derive(Deserialize)]
struct StatementResponse {
    results: Option<ResultSet>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ResultSet {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Client for a libsql/Turso style `POST {"statements": [...]}` endpoint.
pub struct SqlHttpClient {
    client: Client,
    url: String,
    auth_token: String,
    retry: RetryPolicy,
}

impl SqlHttpClient {
    pub fn new(client: Client, url: String, auth_token: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            url,
            auth_token,
            retry,
        }
    }
}

#[async_trait]
impl SqlExecutor for SqlHttpClient {
    async fn execute_batch(&self, statements: Vec<Statement>) -> Result<Vec<Vec<Row>>, TagStoreError> {
        for statement in &statements {
            debug!(query = %statement.q.trim(), params = ?statement.params, "Executing SQL statement.");
        }

        let body = BatchRequest {
            statements: &statements,
        };
        let response = send_with_retry(self.retry, || {
            self.client
                .post(&self.url)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.auth_token))
                .json(&body)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, body = %error_body, "SQL endpoint returned an error status.");
            return Err(TagStoreError::Query(format!(
                "SQL endpoint returned {status}: {error_body}"
            )));
        }

        let payload: Value = response.json().await?;
        parse_batch_response(payload)
    }
}

/// Maps the endpoint's positional `columns`/`rows` into named rows, surfacing the
/// first per-statement error.
pub fn parse_batch_response(payload: Value) -> Result<Vec<Vec<Row>>, TagStoreError> {
    if let Some(message) = payload.get("error") {
        let message = message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string());
        return Err(TagStoreError::Query(message));
    }

    let responses: Vec<StatementResponse> = serde_json::from_value(payload)
        .map_err(|e| TagStoreError::Decode(format!("Unexpected SQL response: {e}")))?;

    responses
        .into_iter()
        .map(|response| {
            if let Some(err) = response.error {
                return Err(TagStoreError::Query(if err.message.is_empty() {
                    "Query execution failed".to_string()
                } else {
                    err.message
                }));
            }
            let Some(result) = response.results else {
                return Ok(Vec::new());
            };
            Ok(result
                .rows
                .into_iter()
                .map(|values| {
                    result
                        .columns
                        .iter()
                        .cloned()
                        .zip(values)
                        .collect::<Row>()
                })
                .collect())
        })
        .collect()
}

/// Reads a text column, accepting numbers stored by loose clients.
pub fn row_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
