//! Provider configuration.
//!
//! Credentials come from CLI flags or, when absent, from the `PROXMOX_*`
//! environment variables.

use std::fmt;
use std::time::Duration;

use crate::error::{ProviderError, Result};

pub const HOST_ENV: &str = "PROXMOX_HOST";
pub const USER_ENV: &str = "PROXMOX_USER";
pub const PASSWORD_ENV: &str = "PROXMOX_PASSWORD";
pub const INSECURE_ENV: &str = "PROXMOX_INSECURE";
pub const TASK_TIMEOUT_ENV: &str = "PROXMOX_TASK_TIMEOUT";

/// Default overall deadline for one task, in seconds.
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 600;

/// Backoff and deadline for task polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: u32,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            multiplier: 2,
            timeout: Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS),
        }
    }
}

impl PollSettings {
    /// Interval to sleep after `current`, capped at `max_interval`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier.max(1))
            .min(self.max_interval)
    }
}

/// Connection settings for one Proxmox cluster.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub insecure: bool,
    pub poll: PollSettings,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("poll", &self.poll)
            .finish()
    }
}

impl ProviderConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut poll = PollSettings::default();
        if let Some(secs) = lookup(TASK_TIMEOUT_ENV).and_then(|v| v.trim().parse().ok()) {
            poll.timeout = Duration::from_secs(secs);
        }

        Self {
            host: lookup(HOST_ENV).unwrap_or_default(),
            user: lookup(USER_ENV).unwrap_or_default(),
            password: lookup(PASSWORD_ENV).unwrap_or_default(),
            insecure: lookup(INSECURE_ENV).is_some_and(|v| is_truthy(&v)),
            poll,
        }
    }

    /// Host, user and password are all required.
    pub fn validate(&self) -> Result<()> {
        for (field, value, env) in [
            ("host", &self.host, HOST_ENV),
            ("user", &self.user, USER_ENV),
            ("password", &self.password, PASSWORD_ENV),
        ] {
            if value.trim().is_empty() {
                return Err(ProviderError::Config(format!(
                    "{} is required (set --{} or {})",
                    field, field, env
                )));
            }
        }
        if self.poll.timeout.is_zero() {
            return Err(ProviderError::Config(
                "task timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Same spellings clap's `BoolishValueParser` accepts as true.
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "t" | "true" | "on"
    )
}

/// Provider flags shared by every CLI subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Proxmox host (e.g., pve.example.com or https://pve.example.com:8006)
    #[arg(long, env = HOST_ENV)]
    pub host: Option<String>,

    /// Proxmox user (e.g., root@pam)
    #[arg(long, env = USER_ENV)]
    pub user: Option<String>,

    /// Proxmox password
    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(
        long,
        env = INSECURE_ENV,
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub insecure: bool,

    /// Overall timeout for a single cluster task, in seconds
    #[arg(long, env = TASK_TIMEOUT_ENV, default_value_t = DEFAULT_TASK_TIMEOUT_SECS)]
    pub task_timeout: u64,
}

impl From<ProviderArgs> for ProviderConfig {
    fn from(args: ProviderArgs) -> Self {
        Self {
            host: args.host.unwrap_or_default(),
            user: args.user.unwrap_or_default(),
            password: args.password.unwrap_or_default(),
            insecure: args.insecure,
            poll: PollSettings {
                timeout: Duration::from_secs(args.task_timeout),
                ..PollSettings::default()
            },
        }
    }
}
