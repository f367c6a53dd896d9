/// Default admin password accepted by `get_admin`.
pub const DEFAULT_ADMIN_PASSWORD: &str = "SOME SECRET KEY";

/// Default verify token expected by the `example_two` validator.
pub const DEFAULT_VERIFY_TOKEN: &str = "AFIDOH1H41V";

/// Server-level configuration for the operation pipeline and the handlers.
///
/// Controls operation timeouts, concurrency limits, and the secrets the
/// credential-issuing procedures depend on.
#[derive(Clone)]
pub struct ServerConfig {
    /// Default timeout for operations in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
    /// Password that `get_admin` trades for an admin credential.
    pub admin_password: String,
    /// Token the `example_two` webhook validator expects.
    pub verify_token: String,
    /// HMAC key for capability tokens. Random per process unless configured,
    /// in which case tokens survive a restart of the same deployment.
    pub signing_key: Vec<u8>,
    /// Registered procedures hidden from external `Exec` calls.
    pub private_procedures: Vec<String>,
}

impl ServerConfig {
    /// Generates a fresh random signing key.
    #[must_use]
    pub fn random_signing_key() -> Vec<u8> {
        rand::random::<[u8; 32]>().to_vec()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_operation_timeout_ms: 30_000,
            max_concurrent_operations: 1000,
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            verify_token: DEFAULT_VERIFY_TOKEN.to_string(),
            signing_key: Self::random_signing_key(),
            private_procedures: Vec::new(),
        }
    }
}

// Keeps secrets out of logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("default_operation_timeout_ms", &self.default_operation_timeout_ms)
            .field("max_concurrent_operations", &self.max_concurrent_operations)
            .field("admin_password", &"<redacted>")
            .field("verify_token", &"<redacted>")
            .field("signing_key", &"<redacted>")
            .field("private_procedures", &self.private_procedures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.default_operation_timeout_ms, 30_000);
        assert_eq!(config.max_concurrent_operations, 1000);
        assert_eq!(config.admin_password, "SOME SECRET KEY");
        assert_eq!(config.verify_token, "AFIDOH1H41V");
        assert_eq!(config.signing_key.len(), 32);
        assert!(config.private_procedures.is_empty());
    }

    #[test]
    fn each_default_gets_its_own_signing_key() {
        assert_ne!(ServerConfig::default().signing_key, ServerConfig::default().signing_key);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", ServerConfig::default());
        assert!(!rendered.contains("SOME SECRET KEY"));
        assert!(rendered.contains("<redacted>"));
    }
}
