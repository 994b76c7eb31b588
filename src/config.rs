use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use config::{Config as config_config, File as config_file};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{crawler::pse, logging::Logger, util::text::NumberLocale};

const CONFIG_PATH: &str = "app.json";

const TOPIC: &str = "TOPIC";
const SERVER_ADDR: &str = "SERVER_ADDR";
const FLUSH_TIMEOUT_SECS: &str = "FLUSH_TIMEOUT_SECS";
const MESSAGE_TIMEOUT_MS: &str = "MESSAGE_TIMEOUT_MS";
const CONNECT_TIMEOUT_MS: &str = "CONNECT_TIMEOUT_MS";
const EDGE_HOST: &str = "EDGE_HOST";
const NUMBER_LOCALE: &str = "NUMBER_LOCALE";
const STOCK_CODES: &str = "STOCK_CODES";

/// PSEi 成分股
pub const DEFAULT_STOCK_CODES: &[&str] = &[
    "AC", "ACEN", "AEV", "AGI", "ALI", "AP", "BDO", "BLOOM", "BPI", "CNPF", "CNVRG", "DMC", "EMI",
    "GLO", "GTCAP", "ICT", "JFC", "JGS", "LTG", "MBT", "MER", "MONDE", "PGOLD", "SCC", "SM",
    "SMC", "SMPH", "TEL", "URC", "WLCON",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required {0} environment variable not set")]
    Missing(&'static str),
    #[error("I can't read the config file {path} because {reason}")]
    Source { path: String, reason: String },
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct App {
    #[serde(default)]
    pub kafka: Kafka,
    #[serde(default)]
    pub edge: Edge,
    #[serde(default)]
    pub stock: Stock,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Kafka {
    pub topic: String,
    pub server_addr: String,
    pub flush_timeout_secs: u64,
    pub message_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for Kafka {
    fn default() -> Self {
        Kafka {
            topic: String::new(),
            server_addr: String::new(),
            flush_timeout_secs: 10,
            message_timeout_ms: 5000,
            connect_timeout_ms: 5000,
        }
    }
}

impl Kafka {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Edge {
    pub host: String,
    pub number_locale: String,
}

impl Default for Edge {
    fn default() -> Self {
        Edge {
            host: pse::HOST.to_string(),
            number_locale: "en_US".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Stock {
    pub codes: Vec<String>,
}

impl Default for Stock {
    fn default() -> Self {
        Stock {
            codes: DEFAULT_STOCK_CODES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl App {
    /// 讀取 app.json (若存在) 並以環境變數覆蓋
    pub fn load(logger: &Logger) -> Result<Self, ConfigError> {
        Self::load_from(&config_path(), |key| env::var(key).ok(), logger)
    }

    /// Builds the settings from an optional config file and a variable lookup.
    ///
    /// Missing `TOPIC` or `SERVER_ADDR` is an error; everything else has a default.
    pub fn load_from<F>(path: &Path, lookup: F, logger: &Logger) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app = if path.exists() {
            config_config::builder()
                .add_source(config_file::from(path))
                .build()
                .and_then(|c| c.try_deserialize::<App>())
                .map_err(|why| ConfigError::Source {
                    path: path.display().to_string(),
                    reason: format!("{:?}", why),
                })?
        } else {
            App::default()
        };

        let app = app.override_with(lookup, logger);
        app.validate()?;

        Ok(app)
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with<F>(mut self, lookup: F, logger: &Logger) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(topic) = lookup(TOPIC) {
            self.kafka.topic = topic;
        }

        if let Some(addr) = lookup(SERVER_ADDR) {
            self.kafka.server_addr = addr;
        }

        if let Some(secs) = lookup(FLUSH_TIMEOUT_SECS) {
            self.kafka.flush_timeout_secs =
                parse_or(logger, FLUSH_TIMEOUT_SECS, &secs, self.kafka.flush_timeout_secs);
        }

        if let Some(ms) = lookup(MESSAGE_TIMEOUT_MS) {
            self.kafka.message_timeout_ms =
                parse_or(logger, MESSAGE_TIMEOUT_MS, &ms, self.kafka.message_timeout_ms);
        }

        if let Some(ms) = lookup(CONNECT_TIMEOUT_MS) {
            self.kafka.connect_timeout_ms =
                parse_or(logger, CONNECT_TIMEOUT_MS, &ms, self.kafka.connect_timeout_ms);
        }

        if let Some(host) = lookup(EDGE_HOST) {
            self.edge.host = host;
        }

        if let Some(tag) = lookup(NUMBER_LOCALE) {
            self.edge.number_locale = tag;
        }

        if let Some(codes) = lookup(STOCK_CODES) {
            self.stock.codes = codes
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.kafka.topic.trim().is_empty() {
            return Err(ConfigError::Missing(TOPIC));
        }

        if self.kafka.server_addr.trim().is_empty() {
            return Err(ConfigError::Missing(SERVER_ADDR));
        }

        Ok(())
    }

    /// The numeric format of the quote pages; unknown tags fall back to en_US.
    pub fn number_locale(&self, logger: &Logger) -> NumberLocale {
        NumberLocale::from_tag(&self.edge.number_locale).unwrap_or_else(|| {
            logger.warn(format!(
                "Unknown number locale {}, using en_US",
                self.edge.number_locale
            ));
            NumberLocale::EN_US
        })
    }
}

fn parse_or<T: FromStr + Copy>(logger: &Logger, key: &str, value: &str, default: T) -> T {
    T::from_str(value.trim()).unwrap_or_else(|_| {
        logger.warn(format!("Ignoring invalid {} value '{}'", key, value));
        default
    })
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
