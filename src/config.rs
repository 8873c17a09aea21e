use anyhow::Context;
use serde::Deserialize;

/// Longest session a token may be issued for: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub leeway_seconds: u64,
}

/// Which data store backs the credential and product repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Administrator account created at startup if it does not exist yet.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match get("APP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("APP_PORT {raw:?} is not a valid port"))?,
            None => 8080,
        };

        let store = match get("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        };

        let database_url = get("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let secret = get("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .context("JWT_SECRET must be set")?;

        let ttl_minutes = match get("JWT_TTL_MINUTES").and_then(|v| v.parse::<i64>().ok()) {
            Some(m) if m > MAX_TTL_MINUTES => {
                anyhow::bail!("JWT_TTL_MINUTES must be at most {MAX_TTL_MINUTES}")
            }
            Some(m) if m > 0 => m,
            _ => 60,
        };

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "storefront".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "storefront-users".into()),
            ttl_minutes,
            leeway_seconds: get("JWT_LEEWAY_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0),
        };

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => anyhow::bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            host,
            port,
            store,
            database_url,
            jwt,
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_for_optional_values() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config");
        assert_eq!(cfg.store, StoreBackend::Postgres);
        assert_eq!(cfg.jwt.issuer, "storefront");
        assert_eq!(cfg.jwt.audience, "storefront-users");
        assert_eq!(cfg.jwt.ttl_minutes, 60);
        assert_eq!(cfg.jwt.leeway_seconds, 0);
        assert!(cfg.admin.is_none());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn listen_address_comes_from_env() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "x"),
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", "3000"),
        ]))
        .expect("config");
        assert_eq!(cfg.bind_addr(), "127.0.0.1:3000");

        let err = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "x"),
            ("APP_PORT", "http"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn ttl_beyond_a_year_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "x"),
            ("JWT_TTL_MINUTES", "9223372036854775807"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_TTL_MINUTES"));

        let max = MAX_TTL_MINUTES.to_string();
        let cfg = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "x"),
            ("JWT_TTL_MINUTES", max.as_str()),
        ]))
        .expect("config");
        assert_eq!(cfg.jwt.ttl_minutes, MAX_TTL_MINUTES);
    }

    #[test]
    fn jwt_secret_is_required() {
        let err = AppConfig::from_lookup(lookup(&[("STORE_BACKEND", "memory")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        let err = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "  "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "x")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "x"),
            ("JWT_TTL_MINUTES", "15"),
        ]))
        .expect("config");
        assert_eq!(cfg.store, StoreBackend::Memory);
        assert_eq!(cfg.jwt.ttl_minutes, 15);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn admin_seed_needs_both_fields() {
        let err = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "x"),
            ("ADMIN_EMAIL", "root@shop.test"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("ADMIN_PASSWORD"));

        let cfg = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "x"),
            ("ADMIN_EMAIL", "root@shop.test"),
            ("ADMIN_PASSWORD", "changeme123"),
        ]))
        .expect("config");
        assert_eq!(cfg.admin.map(|a| a.email).as_deref(), Some("root@shop.test"));
    }
}
