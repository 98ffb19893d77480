//! Fetch todos from jsonplaceholder.
//!
//! The first request succeeds and decodes the todo. The second asks for a
//! todo that does not exist while expecting `200`, and shows what a caller
//! gets back on an unexpected status.
//!
//! Run with: RUST_LOG=debug cargo run --bin todos

use fetchkit::{Client, FetchError, Request};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Todo {
    user_id: u64,
    id: u64,
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct Fail {
    #[serde(default)]
    status: String,
}

const BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = Client::builder().build();

    tracing::info!("example for the 200 OK case");
    let mut request = Request::new()
        .method("GET")
        .url(format!("{BASE_URL}/todos/1"))
        .expected_status(200)
        .with_response::<Todo>()
        .with_error_response::<Fail>();

    match request.send(&client).await {
        Ok(_) => {
            if let Some(todo) = request.response() {
                tracing::info!(user_id = todo.user_id, id = todo.id, title = %todo.title, "successful request");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "error executing request");
            if let Some(body) = e.body() {
                tracing::debug!(body = %String::from_utf8_lossy(body), "response body");
            }
            return Err(e.into());
        }
    }

    tracing::info!("example for the 404 Not Found case, expecting 200");
    let mut request = Request::new()
        .url(format!("{BASE_URL}/todos/0"))
        .with_response::<Todo>()
        .with_error_response::<Fail>();

    if let Err(e) = request.send(&client).await {
        let body = e.body().map(|b| String::from_utf8_lossy(b).into_owned());
        tracing::error!(error = %e, body = ?body, "error executing request");
        if let FetchError::UnexpectedStatus { actual: 404, .. } = e {
            tracing::error!("entity not found");
        }
        if let Some(fail) = request.error_response() {
            tracing::debug!(status = %fail.status, "decoded error");
        }
    }

    Ok(())
}
