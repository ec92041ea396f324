//! In-process mock of the Proxmox VE API for client integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const USER: &str = "root@pam";
pub const PASSWORD: &str = "secret";
pub const TICKET: &str = "PVE:root@pam:TICKET";
pub const CSRF: &str = "csrf-token";

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub form: HashMap<String, String>,
    pub cookie: Option<String>,
    pub csrf: Option<String>,
}

#[derive(Default)]
struct Inner {
    requests: Vec<RecordedRequest>,
    exit_status: Option<String>,
    container_running: bool,
}

#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Mutex<Inner>>,
}

impl MockState {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Find the first recorded request with the given method and path suffix.
    pub fn find(&self, method: Method, path_suffix: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .find(|r| r.method == method && r.path.ends_with(path_suffix))
    }

    pub fn set_exit_status(&self, status: &str) {
        self.inner.lock().unwrap().exit_status = Some(status.to_string());
    }

    pub fn set_container_running(&self, running: bool) {
        self.inner.lock().unwrap().container_running = running;
    }
}

/// Mock server bound to an OS-chosen port.
pub struct MockProxmox {
    pub addr: SocketAddr,
    pub state: MockState,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl MockProxmox {
    pub async fn spawn() -> Self {
        let state = MockState::default();
        let router = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    /// Host string accepted by `ProxmoxClient::login`.
    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn data(value: Value) -> Response {
    (StatusCode::OK, Json(json!({ "data": value }))).into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, message.to_string()).into_response()
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let path = uri.path().to_string();
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let (exit_status, running) = {
        let mut inner = state.inner.lock().unwrap();
        inner.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            form: form.clone(),
            cookie: header("cookie"),
            csrf: header("csrfpreventiontoken"),
        });
        (
            inner.exit_status.clone().unwrap_or_else(|| "OK".to_string()),
            inner.container_running,
        )
    };

    let Some(rest) = path.strip_prefix("/api2/json/") else {
        return error(StatusCode::NOT_FOUND, "no such path");
    };
    let segments: Vec<&str> = rest.split('/').collect();

    if segments.as_slice() == ["access", "ticket"] {
        return if form.get("username").map(String::as_str) == Some(USER)
            && form.get("password").map(String::as_str) == Some(PASSWORD)
        {
            data(json!({
                "ticket": TICKET,
                "CSRFPreventionToken": CSRF,
                "username": USER,
            }))
        } else {
            error(StatusCode::UNAUTHORIZED, "authentication failure")
        };
    }

    let expected_cookie = format!("PVEAuthCookie={}", TICKET);
    if header("cookie").as_deref() != Some(expected_cookie.as_str()) {
        return error(StatusCode::UNAUTHORIZED, "no ticket");
    }

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["nodes", node, "lxc"]) => {
            let vmid = form.get("vmid").cloned().unwrap_or_default();
            data(json!(format!(
                "UPID:{}:00001000:00002000:5F000000:vzcreate:{}:root@pam:",
                node, vmid
            )))
        }
        ("POST", ["nodes", node, "lxc", vmid, "status", action]) => data(json!(format!(
            "UPID:{}:00001000:00002000:5F000000:vz{}:{}:root@pam:",
            node, action, vmid
        ))),
        ("DELETE", ["nodes", node, "lxc", vmid]) => data(json!(format!(
            "UPID:{}:00001000:00002000:5F000000:vzdestroy:{}:root@pam:",
            node, vmid
        ))),
        ("GET", ["nodes", _, "lxc", "404", ..]) => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Configuration file 'nodes/pve1/lxc/404.conf' does not exist",
        ),
        ("GET", ["nodes", _, "lxc", _, "config"]) => data(json!({
            "hostname": "web01",
            "cores": 2,
            "memory": 1024,
            "swap": 512,
            "net0": "name=eth0,bridge=vmbr0,ip=dhcp",
            "ostype": "ubuntu",
        })),
        ("PUT", ["nodes", _, "lxc", _, "config"]) => data(Value::Null),
        ("GET", ["nodes", _, "lxc", _, "status", "current"]) => data(json!({
            "status": if running { "running" } else { "stopped" },
            "vmid": 100,
        })),
        ("GET", ["nodes", _, "tasks", _, "status"]) => data(json!({
            "status": "stopped",
            "exitstatus": exit_status,
        })),
        ("POST", ["access", "users"])
        | ("PUT", ["access", "users", _])
        | ("DELETE", ["access", "users", _])
        | ("PUT", ["access", "password"])
        | ("POST", ["access", "groups"])
        | ("PUT", ["access", "groups", _])
        | ("DELETE", ["access", "groups", _])
        | ("POST", ["cluster", "backup"]) => data(Value::Null),
        ("GET", ["access", "users", "missing@pve"]) => {
            error(StatusCode::INTERNAL_SERVER_ERROR, "no such user ('missing@pve')")
        }
        ("GET", ["access", "users", _]) => data(json!({
            "comment": "ops",
            "email": "ops@example.com",
            "enable": 1,
            "expire": 0,
            "firstname": "Ada",
            "lastname": "Lovelace",
            "groups": ["admins"],
        })),
        ("GET", ["access", "groups", _]) => data(json!({
            "comment": "administrators",
            "members": ["ops@pve"],
        })),
        _ => error(StatusCode::NOT_IMPLEMENTED, "unhandled"),
    }
}
