//! reqwest-backed implementation of [`ProxmoxApi`].

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::ProxmoxApi;
use crate::error::{ApiError, Result};
use crate::types::{
    ContainerConfig, ContainerRef, ContainerStatus, GroupConfig, NewBackupRequest,
    NewContainerRequest, NewGroupRequest, NewUserRequest, PasswordChangeRequest, TaskStatus,
    Ticket, TicketRequest, UpdateContainerRequest, UpdateGroupRequest, UpdateUserRequest, Upid,
    UserConfig,
};

/// Default port of the Proxmox VE API daemon.
pub const DEFAULT_PORT: u16 = 8006;

/// Every API response is wrapped in `{"data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Authenticated client for one Proxmox VE cluster.
#[derive(Clone)]
pub struct ProxmoxClient {
    http: reqwest::Client,
    base: Url,
    ticket: Ticket,
}

impl std::fmt::Debug for ProxmoxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxmoxClient")
            .field("base", &self.base.as_str())
            .field("username", &self.ticket.username)
            .finish()
    }
}

/// Build the API base URL from a host string.
///
/// A bare host gets `https` and port 8006. A host with an explicit scheme is
/// taken as is. The path is always `/api2/json`.
pub fn base_url(host: &str) -> Result<Url> {
    let host = host.trim().trim_end_matches('/');
    let explicit_scheme = host.contains("://");
    let raw = if explicit_scheme {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    let mut url =
        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", host, e)))?;
    if !explicit_scheme && !has_explicit_port(host) {
        url.set_port(Some(DEFAULT_PORT))
            .map_err(|_| ApiError::InvalidUrl(host.to_string()))?;
    }
    url.set_path("/api2/json");
    Ok(url)
}

impl ProxmoxClient {
    /// Obtain a ticket for `user` and return a ready client.
    pub async fn login(host: &str, user: &str, password: &str, insecure: bool) -> Result<Self> {
        let base = base_url(host)?;
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()?;

        let mut url = base.clone();
        push_segments(&mut url, &["access", "ticket"])?;
        info!(url = %url, user = %user, "Requesting Proxmox ticket");

        let response = http
            .post(url)
            .form(&TicketRequest {
                username: user,
                password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("{}: {}", status, body.trim())));
        }

        let envelope: Envelope<Ticket> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let ticket = envelope
            .data
            .ok_or_else(|| ApiError::Auth("ticket response carried no data".to_string()))?;

        debug!(username = %ticket.username, "Authenticated against Proxmox");
        Ok(Self { http, base, ticket })
    }

    /// Username the ticket was issued for.
    pub fn username(&self) -> &str {
        &self.ticket.username
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        push_segments(&mut url, segments)?;
        Ok(url)
    }

    /// Issue one request and unwrap the response envelope.
    async fn call<F, T>(
        &self,
        method: Method,
        segments: &[&str],
        form: Option<&F>,
    ) -> Result<Option<T>>
    where
        F: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        debug!(method = %method, path = %url.path(), "Proxmox API request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(
                reqwest::header::COOKIE,
                format!("PVEAuthCookie={}", self.ticket.ticket),
            );
        if method != Method::GET {
            request = request.header("CSRFPreventionToken", &self.ticket.csrf_token);
        }
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match body.trim() {
                "" => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
                text => text.to_string(),
            };
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    async fn call_required<F, T>(
        &self,
        method: Method,
        segments: &[&str],
        form: Option<&F>,
    ) -> Result<T>
    where
        F: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(method, segments, form)
            .await?
            .ok_or_else(|| ApiError::MissingData(segments.join("/")))
    }

    async fn call_unit<F>(&self, method: Method, segments: &[&str], form: Option<&F>) -> Result<()>
    where
        F: Serialize + ?Sized,
    {
        self.call::<F, serde_json::Value>(method, segments, form)
            .await
            .map(|_| ())
    }
}

fn has_explicit_port(host: &str) -> bool {
    host.rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok())
}

fn push_segments(url: &mut Url, segments: &[&str]) -> Result<()> {
    let shown = url.to_string();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl(shown))?
        .extend(segments);
    Ok(())
}

const NO_FORM: Option<&()> = None;

#[async_trait]
impl ProxmoxApi for ProxmoxClient {
    async fn create_container(&self, req: &NewContainerRequest) -> Result<Upid> {
        self.call_required(Method::POST, &["nodes", req.node.as_str(), "lxc"], Some(req))
            .await
    }

    async fn start_container(&self, ct: &ContainerRef) -> Result<Upid> {
        self.call_required(
            Method::POST,
            &["nodes", ct.node.as_str(), "lxc", ct.vmid.as_str(), "status", "start"],
            NO_FORM,
        )
        .await
    }

    async fn shutdown_container(&self, ct: &ContainerRef) -> Result<Upid> {
        self.call_required(
            Method::POST,
            &["nodes", ct.node.as_str(), "lxc", ct.vmid.as_str(), "status", "shutdown"],
            NO_FORM,
        )
        .await
    }

    async fn update_container(
        &self,
        ct: &ContainerRef,
        req: &UpdateContainerRequest,
    ) -> Result<Option<Upid>> {
        self.call(
            Method::PUT,
            &["nodes", ct.node.as_str(), "lxc", ct.vmid.as_str(), "config"],
            Some(req),
        )
        .await
    }

    async fn delete_container(&self, ct: &ContainerRef) -> Result<Upid> {
        self.call_required(
            Method::DELETE,
            &["nodes", ct.node.as_str(), "lxc", ct.vmid.as_str()],
            NO_FORM,
        )
        .await
    }

    async fn container_config(&self, ct: &ContainerRef) -> Result<ContainerConfig> {
        self.call_required(
            Method::GET,
            &["nodes", ct.node.as_str(), "lxc", ct.vmid.as_str(), "config"],
            NO_FORM,
        )
        .await
    }

    async fn container_status(&self, ct: &ContainerRef) -> Result<ContainerStatus> {
        self.call_required(
            Method::GET,
            &["nodes", ct.node.as_str(), "lxc", ct.vmid.as_str(), "status", "current"],
            NO_FORM,
        )
        .await
    }

    async fn task_status(&self, node: &str, upid: &Upid) -> Result<TaskStatus> {
        self.call_required(
            Method::GET,
            &["nodes", node, "tasks", upid.as_str(), "status"],
            NO_FORM,
        )
        .await
    }

    async fn create_user(&self, req: &NewUserRequest) -> Result<()> {
        self.call_unit(Method::POST, &["access", "users"], Some(req))
            .await
    }

    async fn user_config(&self, userid: &str) -> Result<UserConfig> {
        self.call_required(Method::GET, &["access", "users", userid], NO_FORM)
            .await
    }

    async fn update_user(&self, userid: &str, req: &UpdateUserRequest) -> Result<()> {
        self.call_unit(Method::PUT, &["access", "users", userid], Some(req))
            .await
    }

    async fn change_password(&self, userid: &str, password: &str) -> Result<()> {
        self.call_unit(
            Method::PUT,
            &["access", "password"],
            Some(&PasswordChangeRequest { userid, password }),
        )
        .await
    }

    async fn delete_user(&self, userid: &str) -> Result<()> {
        self.call_unit(Method::DELETE, &["access", "users", userid], NO_FORM)
            .await
    }

    async fn create_group(&self, req: &NewGroupRequest) -> Result<()> {
        self.call_unit(Method::POST, &["access", "groups"], Some(req))
            .await
    }

    async fn group_config(&self, groupid: &str) -> Result<GroupConfig> {
        self.call_required(Method::GET, &["access", "groups", groupid], NO_FORM)
            .await
    }

    async fn update_group(&self, groupid: &str, req: &UpdateGroupRequest) -> Result<()> {
        self.call_unit(Method::PUT, &["access", "groups", groupid], Some(req))
            .await
    }

    async fn delete_group(&self, groupid: &str) -> Result<()> {
        self.call_unit(Method::DELETE, &["access", "groups", groupid], NO_FORM)
            .await
    }

    async fn create_backup(&self, req: &NewBackupRequest) -> Result<()> {
        self.call_unit(Method::POST, &["cluster", "backup"], Some(req))
            .await
    }
}
