use std::env;

/// Minimum accepted JWT secret length in bytes.
const MIN_SECRET_LEN: usize = 32;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Candidate ports, tried in order until one binds.
    pub bind_ports: Vec<u16>,
    /// Secret keying bearer-token signatures. Required, >= 32 bytes.
    pub jwt_secret: String,
    /// Default tracing filter directive.
    pub log_level: Option<String>,
    /// Whether anyone may register, or only admins.
    pub open_registration: bool,
    /// Seeded admin account (identifier, password).
    pub admin_account: Option<(String, String)>,
    /// Seeded tester account (identifier, password).
    pub tester_account: Option<(String, String)>,
}

impl Config {
    /// Load configuration from environment variables. Fails when the JWT
    /// secret is missing or too short.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is required"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} bytes", MIN_SECRET_LEN);
        }

        let bind_ports: Vec<u16> = env::var("BIND_PORTS")
            .unwrap_or_else(|_| "3001".to_string())
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        if bind_ports.is_empty() {
            anyhow::bail!("BIND_PORTS contains no usable port");
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            bind_ports,
            jwt_secret,
            log_level: env::var("LOG_LEVEL").ok(),
            open_registration: env::var("OPEN_REGISTRATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            admin_account: account_from_env("ADMIN_IDENTIFIER", "ADMIN_PASSWORD"),
            tester_account: account_from_env("TESTER_IDENTIFIER", "TESTER_PASSWORD"),
        })
    }
}

fn account_from_env(id_var: &str, password_var: &str) -> Option<(String, String)> {
    match (env::var(id_var), env::var(password_var)) {
        (Ok(id), Ok(password)) if !id.is_empty() && !password.is_empty() => Some((id, password)),
        _ => None,
    }
}
