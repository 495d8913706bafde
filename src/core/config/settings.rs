use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    ApiSettings, AttemptSettings, ConfigError, CorsSettings, DatabaseSettings, RedisSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("ATTEMPTS_HOST", "0.0.0.0");
        let port = env_or_default("ATTEMPTS_PORT", "8000");

        let environment = parse_environment(
            env_optional("ATTEMPTS_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("ATTEMPTS_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Exam Attempts API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let explicit_secret = env_optional("SECRET_KEY");
        let secret_was_set = explicit_secret.is_some();
        let secret_key = match explicit_secret {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "attempts");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "attempts_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DATABASE_MAX_CONNECTIONS", env_or_default("DATABASE_MAX_CONNECTIONS", "30"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let max_commit_retries =
            parse_u32("MAX_COMMIT_RETRIES", env_or_default("MAX_COMMIT_RETRIES", "3"))?;
        let commit_retry_backoff_ms = parse_u64(
            "COMMIT_RETRY_BACKOFF_MS",
            env_or_default("COMMIT_RETRY_BACKOFF_MS", "25"),
        )?;
        let reconcile_interval_seconds = parse_u64(
            "RECONCILE_INTERVAL_SECONDS",
            env_or_default("RECONCILE_INTERVAL_SECONDS", "60"),
        )?;
        let reconcile_grace_seconds = parse_u64(
            "RECONCILE_GRACE_SECONDS",
            env_or_default("RECONCILE_GRACE_SECONDS", "30"),
        )?;
        let reconcile_batch_size = parse_u32(
            "RECONCILE_BATCH_SIZE",
            env_or_default("RECONCILE_BATCH_SIZE", "200"),
        )?;
        let audit_interval_seconds = parse_u64(
            "AUDIT_INTERVAL_SECONDS",
            env_or_default("AUDIT_INTERVAL_SECONDS", "900"),
        )?;
        let start_rate_limit_seconds = parse_u64(
            "START_RATE_LIMIT_SECONDS",
            env_or_default("START_RATE_LIMIT_SECONDS", "5"),
        )?;

        let log_level = env_or_default("ATTEMPTS_LOG_LEVEL", "info");
        let json =
            env_optional("ATTEMPTS_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            attempts: AttemptSettings {
                max_commit_retries,
                commit_retry_backoff_ms,
                reconcile_interval_seconds,
                reconcile_grace_seconds,
                reconcile_batch_size,
                audit_interval_seconds,
                start_rate_limit_seconds,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate(secret_was_set)?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn attempts(&self) -> &AttemptSettings {
        &self.attempts
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self, secret_was_set: bool) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.attempts.reconcile_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RECONCILE_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.attempts.audit_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "AUDIT_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.attempts.reconcile_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RECONCILE_BATCH_SIZE",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if !secret_was_set {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }
        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        Ok(())
    }
}
