//! Boundary trait for FETCH stage producers
//!
//! A FETCH callback returns any response-like value whose body parses as
//! structured data. HTTP responses implement it directly; plain JSON values
//! implement it too, which keeps producers testable without a server.

use async_trait::async_trait;
use serde_json::Value;

/// A response-like object whose body can be parsed as structured data.
#[async_trait]
pub trait Fetched: Send {
    /// Consume the response and parse its body as JSON.
    async fn into_body(self) -> anyhow::Result<Value>;
}

#[async_trait]
impl Fetched for Value {
    async fn into_body(self) -> anyhow::Result<Value> {
        Ok(self)
    }
}

#[async_trait]
impl Fetched for reqwest::Response {
    async fn into_body(self) -> anyhow::Result<Value> {
        Ok(self.json().await?)
    }
}
