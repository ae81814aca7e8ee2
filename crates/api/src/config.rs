use std::time::Duration;

use codecall_core::escalation::{default_tier_one_timeouts, EscalationPolicy};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Per-tier escalation timeouts in seconds, ordered from tier 1.
    pub escalation_tier_secs: Vec<u64>,
    /// Tier-1 timeouts in seconds per urgency level (critical first).
    pub tier_one_by_urgency_secs: [u64; 5],
    /// Maximum number of journaled events replayed to a reconnecting
    /// WebSocket client before declaring a gap (default: `256`).
    pub replay_backlog: i64,
    /// Seconds between WebSocket heartbeat pings (default: `30`).
    pub heartbeat_interval_secs: u64,
    /// Upper bound in seconds for one notification dispatch, including
    /// the transport's internal retries (default: `30`).
    pub dispatch_timeout_secs: u64,
    /// External webhook endpoint for notification delivery. When unset
    /// deliveries go to the log sink.
    pub notify_webhook_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `HOST`                          | `0.0.0.0`               |
    /// | `PORT`                          | `3000`                  |
    /// | `CORS_ORIGINS`                  | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                    |
    /// | `ESCALATION_TIER_TIMEOUTS_SECS` | `300,600,900`           |
    /// | `TIER1_TIMEOUTS_BY_URGENCY_SECS`| `60,120,300,600,900`    |
    /// | `REPLAY_BACKLOG`                | `256`                   |
    /// | `HEARTBEAT_INTERVAL_SECS`       | `30`                    |
    /// | `DISPATCH_TIMEOUT_SECS`         | `30`                    |
    /// | `NOTIFY_WEBHOOK_URL`            | (unset)                 |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let escalation_tier_secs = parse_secs_list(
            &std::env::var("ESCALATION_TIER_TIMEOUTS_SECS").unwrap_or_else(|_| "300,600,900".into()),
            "ESCALATION_TIER_TIMEOUTS_SECS",
        );

        let tier_one_list = parse_secs_list(
            &std::env::var("TIER1_TIMEOUTS_BY_URGENCY_SECS")
                .unwrap_or_else(|_| "60,120,300,600,900".into()),
            "TIER1_TIMEOUTS_BY_URGENCY_SECS",
        );
        let tier_one_by_urgency_secs: [u64; 5] = tier_one_list
            .try_into()
            .expect("TIER1_TIMEOUTS_BY_URGENCY_SECS must have exactly 5 entries");

        let replay_backlog: i64 = std::env::var("REPLAY_BACKLOG")
            .unwrap_or_else(|_| "256".into())
            .parse()
            .expect("REPLAY_BACKLOG must be a valid i64");

        let heartbeat_interval_secs: u64 = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("HEARTBEAT_INTERVAL_SECS must be a valid u64");

        let dispatch_timeout_secs: u64 = std::env::var("DISPATCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("DISPATCH_TIMEOUT_SECS must be a valid u64");

        let notify_webhook_url = std::env::var("NOTIFY_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            escalation_tier_secs,
            tier_one_by_urgency_secs,
            replay_backlog,
            heartbeat_interval_secs,
            dispatch_timeout_secs,
            notify_webhook_url,
        }
    }

    /// Build the escalation policy from the configured timeouts.
    ///
    /// Panics at startup on an invalid ladder, which is the desired
    /// behaviour -- we want misconfiguration to fail fast.
    pub fn escalation_policy(&self) -> EscalationPolicy {
        let tiers: Vec<Duration> = self
            .escalation_tier_secs
            .iter()
            .map(|s| Duration::from_secs(*s))
            .collect();
        let tier_one = self.tier_one_by_urgency_secs.map(Duration::from_secs);
        EscalationPolicy::from_timeouts(&tiers, tier_one)
            .unwrap_or_else(|e| panic!("Invalid escalation configuration: {e}"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            escalation_tier_secs: vec![300, 600, 900],
            tier_one_by_urgency_secs: default_tier_one_timeouts().map(|d| d.as_secs()),
            replay_backlog: 256,
            heartbeat_interval_secs: 30,
            dispatch_timeout_secs: 30,
            notify_webhook_url: None,
        }
    }
}

/// Parse a comma-separated list of second counts.
fn parse_secs_list(value: &str, var: &str) -> Vec<u64> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .unwrap_or_else(|_| panic!("{var} must be a comma-separated list of seconds"))
        })
        .collect()
}
