use std::net::IpAddr;

use ipnet::IpNet;

use crate::notify::Topic;

pub const DEFAULT_NOTIFY_SUBJECT: &str = "New Form Submission";

pub const DEFAULT_NOTIFY_TEMPLATE: &str = "New submission received:\n\n\
Name: {{name}}\n\
Age: {{age}}\n\
Profession: {{profession}}\n\
Experience: {{experience}}";

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub table_name: String,
    pub topic: Topic,
    pub api_base: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub cors_origins: Vec<String>,
    pub rate_limit: u32,
    pub rate_limit_window_secs: u64,
    pub honeypot_field: Option<String>,
    pub redirect_url: Option<String>,
    pub list_page_size: usize,
    pub list_max_page_size: usize,
    pub notify_subject: String,
    pub notify_template: String,
    pub notify_max_attempts: i32,
    pub worker_count: usize,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let storage = match env_or("FORMDROP_STORAGE", "postgres").as_str() {
            "postgres" => StorageBackend::Postgres {
                database_url: env_required("DATABASE_URL")?,
            },
            "memory" => StorageBackend::Memory,
            other => return Err(format!("Invalid FORMDROP_STORAGE: {other}")),
        };

        let table_name = env_or("FORMDROP_TABLE_NAME", "submissions");
        if table_name.trim().is_empty() {
            return Err("FORMDROP_TABLE_NAME must not be empty".to_string());
        }

        let topic: Topic = env_or("FORMDROP_TOPIC", "log:submissions")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_TOPIC: {e}"))?;

        let api_base = env_or("FORMDROP_API_BASE", "")
            .trim_end_matches('/')
            .to_string();

        let host: IpAddr = env_or("FORMDROP_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_HOST: {e}"))?;

        let port: u16 = env_or("FORMDROP_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_PORT: {e}"))?;

        let max_body_size: usize = env_or("FORMDROP_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("FORMDROP_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid FORMDROP_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cors_origins: Vec<String> = env_or("FORMDROP_CORS_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let rate_limit: u32 = env_or("FORMDROP_RATE_LIMIT", "10")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_RATE_LIMIT: {e}"))?;

        let rate_limit_window_secs: u64 = env_or("FORMDROP_RATE_LIMIT_WINDOW_SECS", "60")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_RATE_LIMIT_WINDOW_SECS: {e}"))?;

        let honeypot_field = env_optional("FORMDROP_HONEYPOT_FIELD");
        let redirect_url = env_optional("FORMDROP_REDIRECT_URL");

        let list_page_size: usize = env_or("FORMDROP_LIST_PAGE_SIZE", "100")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_LIST_PAGE_SIZE: {e}"))?;

        let list_max_page_size: usize = env_or("FORMDROP_LIST_MAX_PAGE_SIZE", "1000")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_LIST_MAX_PAGE_SIZE: {e}"))?;

        let notify_subject = env_or("FORMDROP_NOTIFY_SUBJECT", DEFAULT_NOTIFY_SUBJECT);
        let notify_template = env_optional("FORMDROP_NOTIFY_TEMPLATE")
            .map(|t| t.replace("\\n", "\n"))
            .unwrap_or_else(|| DEFAULT_NOTIFY_TEMPLATE.to_string());

        let notify_max_attempts: i32 = env_or("FORMDROP_NOTIFY_MAX_ATTEMPTS", "5")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_NOTIFY_MAX_ATTEMPTS: {e}"))?;

        let worker_count: usize = env_or("FORMDROP_WORKER_COUNT", "2")
            .parse()
            .map_err(|e| format!("Invalid FORMDROP_WORKER_COUNT: {e}"))?;

        let log_level = env_or("FORMDROP_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("FORMDROP_SMTP_HOST").ok(),
            std::env::var("FORMDROP_SMTP_PORT").ok(),
            std::env::var("FORMDROP_SMTP_USER").ok(),
            std::env::var("FORMDROP_SMTP_PASS").ok(),
            std::env::var("FORMDROP_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid FORMDROP_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        let config = Config {
            storage,
            table_name,
            topic,
            api_base,
            host,
            port,
            max_body_size,
            trusted_proxies,
            cors_origins,
            rate_limit,
            rate_limit_window_secs,
            honeypot_field,
            redirect_url,
            list_page_size,
            list_max_page_size,
            notify_subject,
            notify_template,
            notify_max_attempts,
            worker_count,
            log_level,
            smtp,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that parse but cannot work.
    pub fn validate(&self) -> Result<(), String> {
        if self.list_page_size == 0 || self.list_page_size > self.list_max_page_size {
            return Err(format!(
                "FORMDROP_LIST_PAGE_SIZE must be between 1 and {}",
                self.list_max_page_size
            ));
        }
        if self.notify_max_attempts < 1 {
            return Err(format!(
                "FORMDROP_NOTIFY_MAX_ATTEMPTS must be at least 1, got {}",
                self.notify_max_attempts
            ));
        }
        if self.worker_count == 0 {
            return Err("FORMDROP_WORKER_COUNT must be at least 1".to_string());
        }
        Ok(())
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
