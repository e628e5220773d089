//! Scripted in-process search transport

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use halexp_tester::request::RequestDescriptor;
use halexp_tester::transport::{SearchTransport, TransportError};

struct Script {
    pattern: String,
    gate: Option<Arc<Notify>>,
    response: Result<Value, TransportError>,
}

/// Transport answering from scripts matched by URL substring
///
/// Unmatched requests get an empty envelope. A gated script blocks until
/// its `Notify` is signalled, so tests choose the completion order.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<Vec<Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose URL contains `pattern` immediately
    pub fn respond(self, pattern: &str, response: Result<Value, TransportError>) -> Self {
        self.push(pattern, None, response);
        self
    }

    /// Answer requests containing `pattern` once the returned gate is notified
    pub fn respond_gated(&self, pattern: &str, response: Result<Value, TransportError>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(pattern, Some(Arc::clone(&gate)), response);
        gate
    }

    fn push(&self, pattern: &str, gate: Option<Arc<Notify>>, response: Result<Value, TransportError>) {
        self.scripts.lock().unwrap().push(Script {
            pattern: pattern.to_string(),
            gate,
            response,
        });
    }

    /// URLs requested so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchTransport for ScriptedTransport {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Value, TransportError> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let matched = {
            let scripts = self.scripts.lock().unwrap();
            scripts
                .iter()
                .find(|s| url.contains(&s.pattern))
                .map(|s| (s.gate.clone(), s.response.clone()))
        };

        match matched {
            Some((gate, response)) => {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                response
            }
            None => Ok(envelope(vec![])),
        }
    }
}

pub fn envelope(records: Vec<Value>) -> Value {
    json!({ "reponses": records })
}

pub fn author_record(name: &str, id_hal: &str) -> Value {
    json!({
        "author_name": name,
        "author_id-hal": id_hal,
        "author_labs_id": "lab-42",
        "aggregation score": 0.87,
        "results_phrases": ["sea level", "sea level", "adaptation"],
        "results_metadata": [
            { "title_s": ["Coastal risk"] },
            { "title_s": ["Urban heat"] }
        ]
    })
}

pub fn document_record(title: &str, uri: &str) -> Value {
    json!({
        "title_s": [title],
        "uri_s": uri,
        "citationFull_s": format!("Doe J. {}. 2021.", title),
        "abstract_s": ["An abstract."],
        "keyword_s": ["climate", "policy"],
        "publicationDate_s": "2021-03-01"
    })
}
