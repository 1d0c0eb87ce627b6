#![allow(dead_code)]

//! In-process stand-in for the cluster snapshot API, served over real HTTP

use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server};

/// A request as seen by the fake cluster
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

/// Repositories, snapshots and indices known to the fake cluster
#[derive(Debug, Default)]
pub struct ClusterState {
    pub indices: Vec<String>,
    pub repositories: BTreeMap<String, Value>,
    pub snapshots: BTreeMap<(String, String), Value>,
    pub requests: Vec<RecordedRequest>,
    next_start_millis: i64,
}

impl ClusterState {
    fn handle(&mut self, method: &str, url: &str, body: Option<Value>) -> (u16, Value) {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let wait = query.split('&').any(|pair| pair == "wait_for_completion=true");

        match (method, segments.as_slice()) {
            ("GET", ["_snapshot"]) => {
                let repositories: serde_json::Map<String, Value> = self
                    .repositories
                    .iter()
                    .map(|(name, repo)| (name.clone(), repo.clone()))
                    .collect();
                (200, Value::Object(repositories))
            }
            ("PUT", ["_snapshot", repo]) => {
                self.repositories
                    .insert(repo.to_string(), body.unwrap_or_else(|| json!({})));
                (200, json!({"acknowledged": true}))
            }
            ("DELETE", ["_snapshot", repo]) => match self.repositories.remove(*repo) {
                Some(_) => (200, json!({"acknowledged": true})),
                None => repository_missing(repo),
            },
            ("GET", ["_snapshot", repo, "_all"]) => {
                if !self.repositories.contains_key(*repo) {
                    return repository_missing(repo);
                }
                let snapshots: Vec<Value> = self
                    .snapshots
                    .iter()
                    .filter(|((r, _), _)| r == repo)
                    .map(|(_, snapshot)| snapshot.clone())
                    .collect();
                (200, json!({ "snapshots": snapshots }))
            }
            ("PUT", ["_snapshot", repo, snapshot]) => {
                self.create_snapshot(repo, snapshot, body.unwrap_or_default(), wait)
            }
            ("DELETE", ["_snapshot", repo, snapshot]) => {
                if !self.repositories.contains_key(*repo) {
                    return repository_missing(repo);
                }
                match self
                    .snapshots
                    .remove(&(repo.to_string(), snapshot.to_string()))
                {
                    Some(_) => (200, json!({"acknowledged": true})),
                    None => error(
                        404,
                        "snapshot_missing_exception",
                        &format!("[{repo}:{snapshot}] is missing"),
                    ),
                }
            }
            _ => error(400, "illegal_argument_exception", "unsupported request"),
        }
    }

    fn create_snapshot(&mut self, repo: &str, snapshot: &str, body: Value, wait: bool) -> (u16, Value) {
        if !self.repositories.contains_key(repo) {
            return repository_missing(repo);
        }

        let key = (repo.to_string(), snapshot.to_string());
        if self.snapshots.contains_key(&key) {
            return error(
                400,
                "invalid_snapshot_name_exception",
                &format!("[{repo}:{snapshot}] snapshot with the same name already exists"),
            );
        }

        let pattern = body["indices"].as_str().unwrap_or("*").to_string();
        let ignore_unavailable = body["ignore_unavailable"].as_bool().unwrap_or(false);

        let mut matched = Vec::new();
        for part in pattern.split(',') {
            let hits: Vec<String> = self
                .indices
                .iter()
                .filter(|index| matches_pattern(part, index))
                .cloned()
                .collect();
            if hits.is_empty() && !part.contains('*') && !ignore_unavailable {
                return error(404, "index_not_found_exception", &format!("no such index [{part}]"));
            }
            matched.extend(hits);
        }

        self.next_start_millis += 1000;
        let entry = json!({
            "snapshot": snapshot,
            "state": "SUCCESS",
            "start_time_in_millis": 1_700_000_000_000i64 + self.next_start_millis,
            "indices": matched,
            "include_global_state": body["include_global_state"],
        });
        self.snapshots.insert(key, entry.clone());

        if wait {
            (200, json!({ "snapshot": entry }))
        } else {
            (200, json!({"accepted": true}))
        }
    }
}

fn matches_pattern(pattern: &str, index: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => index.starts_with(prefix),
        None => pattern == index,
    }
}

fn error(status: u16, error_type: &str, reason: &str) -> (u16, Value) {
    (
        status,
        json!({
            "error": {
                "root_cause": [{"type": error_type, "reason": reason}],
                "type": error_type,
                "reason": reason,
            },
            "status": status,
        }),
    )
}

fn repository_missing(repo: &str) -> (u16, Value) {
    error(404, "repository_missing_exception", &format!("[{repo}] missing"))
}

/// Fake cluster listening on an ephemeral local port
pub struct FakeCluster {
    server: Arc<Server>,
    worker: Option<JoinHandle<()>>,
    state: Arc<Mutex<ClusterState>>,
    url: String,
}

impl FakeCluster {
    pub fn start() -> Self {
        Self::with_indices(&[])
    }

    pub fn with_indices(indices: &[&str]) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind fake cluster"));
        let addr = server
            .server_addr()
            .to_ip()
            .expect("fake cluster listens on TCP");

        let state = Arc::new(Mutex::new(ClusterState {
            indices: indices.iter().map(|s| s.to_string()).collect(),
            ..ClusterState::default()
        }));

        let worker = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut raw = String::new();
                    let _ = request.as_reader().read_to_string(&mut raw);
                    let body = serde_json::from_str(&raw).ok();

                    let content_type = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Content-Type"))
                        .map(|h| h.value.as_str().to_string());

                    let method = request.method().as_str().to_string();
                    let url = request.url().to_string();

                    let (status, reply) = {
                        let mut state = state.lock().unwrap();
                        state.requests.push(RecordedRequest {
                            method: method.clone(),
                            url: url.clone(),
                            content_type,
                            body: body.clone(),
                        });
                        state.handle(&method, &url, body)
                    };

                    let mut response = Response::from_string(reply.to_string()).with_status_code(status);
                    if let Ok(header) = Header::from_bytes(b"Content-Type", b"application/json") {
                        response.add_header(header);
                    }
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            server,
            worker: Some(worker),
            state,
            url: format!("http://{addr}"),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request reached the fake cluster")
    }

    pub fn has_repository(&self, name: &str) -> bool {
        self.state.lock().unwrap().repositories.contains_key(name)
    }
}

impl Drop for FakeCluster {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
