use serde::Deserialize;
use serde_json::Value;

use crate::connection::{ConnectionSession, HttpRequest};
use crate::console::console;
use crate::conversations::{ChatError, ChatResult};

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Option<Vec<ModelEntry>>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: Option<Value>,
}

/// Extracts the sorted model identifiers from a model-list response body.
pub fn parse_model_ids(body: &str) -> ChatResult<Vec<String>> {
    let list: ModelList = serde_json::from_str(body).map_err(|e| ChatError::Parse(e.to_string()))?;

    let Some(entries) = list.data else {
        console().warning("The response does not contain a list of models.");
        return Ok(Vec::new());
    };

    let mut ids: Vec<String> = entries
        .into_iter()
        .filter_map(|entry| match entry.id {
            Some(Value::String(id)) => Some(id),
            _ => None,
        })
        .collect();
    ids.sort();
    Ok(ids)
}

/// Asks the service which models it offers. Informational only.
pub async fn list_models(session: &mut ConnectionSession) -> ChatResult<Vec<String>> {
    let path = session.endpoint().models_path.clone();
    let response = session.send(HttpRequest::get(path)).await?;

    if !response.is_ok() {
        return Err(ChatError::Protocol {
            status: response.status,
            body: response.body,
        });
    }

    parse_model_ids(&response.body)
}
