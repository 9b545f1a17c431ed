use super::parsing::{
    env_optional, env_or_default, is_http_url, parse_bool, parse_cors_origins, parse_environment,
    parse_set_count, parse_u16, parse_u32, parse_u64,
};
use super::types::{
    AllocationSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings,
    NotificationSettings, RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAM_ALLOCATOR_HOST", "0.0.0.0");
        let port = env_or_default("EXAM_ALLOCATOR_PORT", "8000");

        let environment = parse_environment(
            env_optional("EXAM_ALLOCATOR_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("EXAM_ALLOCATOR_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Exam Allocator API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "exam_allocator");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "exam_allocator");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "20"),
        )?;

        let set_count = parse_set_count("EXAM_SET_COUNT", env_or_default("EXAM_SET_COUNT", "5"))?;
        let exam_link_base = env_or_default("EXAM_LINK_BASE", "http://localhost:3000/exam");

        let webhook_url = env_optional("NOTIFY_WEBHOOK_URL");
        let notify_timeout_seconds =
            parse_u64("NOTIFY_TIMEOUT_SECONDS", env_or_default("NOTIFY_TIMEOUT_SECONDS", "10"))?;

        let log_level = env_or_default("EXAM_ALLOCATOR_LOG_LEVEL", "info");
        let json = env_optional("EXAM_ALLOCATOR_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
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
            allocation: AllocationSettings { set_count, exam_link_base },
            notifications: NotificationSettings {
                webhook_url,
                timeout_seconds: notify_timeout_seconds,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
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

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn allocation(&self) -> &AllocationSettings {
        &self.allocation
    }

    pub(crate) fn notifications(&self) -> &NotificationSettings {
        &self.notifications
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.allocation.exam_link_base.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_LINK_BASE",
                value: String::from("<empty>"),
            });
        }

        if self.notifications.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "NOTIFY_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if let Some(url) = &self.notifications.webhook_url {
            if !is_http_url(url) {
                return Err(ConfigError::InvalidValue {
                    field: "NOTIFY_WEBHOOK_URL",
                    value: url.clone(),
                });
            }
        }

        Ok(())
    }
}
