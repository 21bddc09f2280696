// Cloudflare API bindings: authenticated HTTP client plus Workers Routes
// and Page Rules resource clients

pub mod cloudflare;

use async_trait::async_trait;
use route_kit_core::Result;
use serde_json::Value;

pub use cloudflare::{BASE_URL, Cloudflare, HttpClient, PageRules, Routes};

/// Executes JSON requests against the API and returns the parsed body.
///
/// [`HttpClient`] is the real implementation; resource clients are generic
/// over this trait so callers can put their own transport underneath.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value>;
    async fn post(&self, path: &str, body: Value) -> Result<Value>;
    async fn put(&self, path: &str, body: Value) -> Result<Value>;
    async fn patch(&self, path: &str, body: Value) -> Result<Value>;
    async fn delete(&self, path: &str) -> Result<Value>;
}
