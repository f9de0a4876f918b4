use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const DB_URL_ENV: &str = "OPS_DASHBOARD_DB_URL";
pub const DB_KEY_ENV: &str = "OPS_DASHBOARD_DB_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_order_column")]
    pub order_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Column names the dashboard reads off the snapshot row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMap {
    #[serde(default = "default_campaign_status")]
    pub campaign_status: String,
    #[serde(default = "default_mailing_count")]
    pub mailing_count: String,
    #[serde(default = "default_average_ticket")]
    pub average_ticket: String,
    #[serde(default = "default_lead_count")]
    pub lead_count: String,
    #[serde(default = "default_call_count")]
    pub call_count: String,
    #[serde(default = "default_last_lead_at")]
    pub last_lead_at: String,
    #[serde(default = "default_consumed_value")]
    pub consumed_value: String,
    #[serde(default = "default_order_column")]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_url: Option<String>,
    pub db_key: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ConfigOverrides {
    pub fn from_env() -> Self {
        Self {
            db_url: non_empty_env(DB_URL_ENV),
            db_key: non_empty_env(DB_KEY_ENV),
            host: None,
            port: None,
        }
    }
}

/// Resolved presentation settings shared by the renderer and the server.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub title: String,
    pub table: String,
    pub refresh_secs: u64,
    pub timezone: Tz,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
            table: default_table(),
            refresh_secs: default_refresh_secs(),
            timezone: chrono_tz::America::Sao_Paulo,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/ops-dashboard/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.db_url {
            self.source.url = url;
        }
        if let Some(key) = overrides.db_key {
            self.source.api_key = key;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs.max(1))
    }

    pub fn page_settings(&self) -> Result<PageSettings> {
        let timezone = Tz::from_str(self.page.timezone.trim())
            .map_err(|e| anyhow!("invalid page.timezone {:?}: {e}", self.page.timezone))?;
        Ok(PageSettings {
            title: self.page.title.clone(),
            table: self.source.table.clone(),
            refresh_secs: self.page.refresh_secs.max(1),
            timezone,
        })
    }

    pub fn default_template() -> String {
        let template = r#"# Credentials may also come from OPS_DASHBOARD_DB_URL / OPS_DASHBOARD_DB_KEY.
[source]
url = "https://your-project.supabase.co"
api_key = ""
table = "operacao_rpo"
order_column = "created_at"

[cache]
ttl_secs = 50

[page]
title = "📊 Painel Supervisório — Operação de Call Center"
refresh_secs = 60
timezone = "America/Sao_Paulo"

# Column names in the source table. Adjust when the schema differs.
[fields]
campaign_status = "st_campanhas_rpo"
mailing_count = "qtde_mailing_rpo"
average_ticket = "ticket_medio_rpo"
lead_count = "qtde_lead_rpo"
call_count = "qtde_chamadas_rpo"
last_lead_at = "ultimo_lead_rpo"
consumed_value = "valor_consumido_rpo"
created_at = "created_at"

[server]
host = "127.0.0.1"
port = 8501
"#;
        template.to_string()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            table: default_table(),
            order_column: default_order_column(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            refresh_secs: default_refresh_secs(),
            timezone: default_timezone(),
        }
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            campaign_status: default_campaign_status(),
            mailing_count: default_mailing_count(),
            average_ticket: default_average_ticket(),
            lead_count: default_lead_count(),
            call_count: default_call_count(),
            last_lead_at: default_last_lead_at(),
            consumed_value: default_consumed_value(),
            created_at: default_order_column(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_table() -> String {
    "operacao_rpo".to_string()
}

fn default_order_column() -> String {
    "created_at".to_string()
}

fn default_ttl_secs() -> u64 {
    50
}

fn default_title() -> String {
    "📊 Painel Supervisório — Operação de Call Center".to_string()
}

fn default_refresh_secs() -> u64 {
    60
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_campaign_status() -> String {
    "st_campanhas_rpo".to_string()
}

fn default_mailing_count() -> String {
    "qtde_mailing_rpo".to_string()
}

fn default_average_ticket() -> String {
    "ticket_medio_rpo".to_string()
}

fn default_lead_count() -> String {
    "qtde_lead_rpo".to_string()
}

fn default_call_count() -> String {
    "qtde_chamadas_rpo".to_string()
}

fn default_last_lead_at() -> String {
    "ultimo_lead_rpo".to_string()
}

fn default_consumed_value() -> String {
    "valor_consumido_rpo".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}
