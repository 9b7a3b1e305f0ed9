//! HTTP request node - one templated request per input item.

use std::collections::HashMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::expression::render_template;
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequestConfig {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

/// Substitute `{{field}}` placeholders in the url, header values, and
/// body strings against one item's payload.
pub fn resolve_request(config: &HttpRequestConfig, data: &Value) -> Result<ResolvedRequest> {
    let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Node(format!("invalid http method: {}", config.method)))?;

    let headers = config
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), render_template(v, data)))
        .collect();

    Ok(ResolvedRequest {
        method,
        url: render_template(&config.url, data),
        headers,
        body: config.body.as_ref().map(|body| render_value(body, data)),
    })
}

fn render_value(value: &Value, data: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(render_template(s, data)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, data)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, data)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Issue one request per input item. An empty input still issues a
/// single request with no substitution data.
pub async fn run(
    client: &reqwest::Client,
    items: &[ExecutionItem],
    config: &HttpRequestConfig,
) -> Result<Vec<ExecutionItem>> {
    let payloads: Vec<Value> = if items.is_empty() {
        vec![Value::Object(Map::new())]
    } else {
        items.iter().map(ExecutionItem::to_value).collect()
    };

    let mut out = Vec::with_capacity(payloads.len());
    for data in payloads {
        let request = resolve_request(config, &data)?;
        debug!(method = %request.method, url = %request.url, "http request");

        let mut builder = client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Node(format!(
                "http {} from {}: {}",
                status.as_u16(),
                request.url,
                truncate(&text, 200)
            )));
        }

        let payload = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| {
            let mut map = Map::new();
            map.insert("body".to_string(), Value::String(text));
            Value::Object(map)
        });
        out.push(ExecutionItem::from_value(payload));
    }

    Ok(out)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
