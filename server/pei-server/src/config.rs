use std::env;
use std::time::Duration;
use tracing::warn;

/// Runtime configuration, read from the environment with defaults.
///
/// * `PEI_MAX_TOKEN_TTL_SECS` - upper bound for family token TTLs
/// * `PEI_STUDENT_LOCK_TIMEOUT_MS` - bound on per-student write lock waits
/// * `PEI_AUDIT_RETRY_ATTEMPTS` / `PEI_AUDIT_RETRY_BACKOFF_MS` - audit
///   writer retry policy
/// * `PEI_AUDIT_QUEUE_CAPACITY` - bounded audit queue size
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_token_ttl_secs: i64,
    pub student_lock_timeout: Duration,
    pub audit_retry_attempts: u32,
    pub audit_retry_backoff: Duration,
    pub audit_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // 30 days, the original family-token lifetime.
            max_token_ttl_secs: 2_592_000,
            student_lock_timeout: Duration::from_millis(2_000),
            audit_retry_attempts: 3,
            audit_retry_backoff: Duration::from_millis(50),
            audit_queue_capacity: 1_024,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_token_ttl_secs: env_parse("PEI_MAX_TOKEN_TTL_SECS", defaults.max_token_ttl_secs),
            student_lock_timeout: Duration::from_millis(env_parse(
                "PEI_STUDENT_LOCK_TIMEOUT_MS",
                defaults.student_lock_timeout.as_millis() as u64,
            )),
            audit_retry_attempts: env_parse(
                "PEI_AUDIT_RETRY_ATTEMPTS",
                defaults.audit_retry_attempts,
            ),
            audit_retry_backoff: Duration::from_millis(env_parse(
                "PEI_AUDIT_RETRY_BACKOFF_MS",
                defaults.audit_retry_backoff.as_millis() as u64,
            )),
            audit_queue_capacity: env_parse(
                "PEI_AUDIT_QUEUE_CAPACITY",
                defaults.audit_queue_capacity,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "unparsable environment value; using default");
            default
        }),
        Err(_) => default,
    }
}
