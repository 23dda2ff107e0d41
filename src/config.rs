//! Configuração do execwatch carregada de `execwatch.toml`.
//!
//! [`TrackerConfig`] reúne todos os parâmetros ajustáveis. Campos ausentes no
//! arquivo usam valores padrão. `EXECWATCH_API_TOKEN`, `EXECWATCH_BASE_URL`
//! e `EXECWATCH_ORG_KEY` têm precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::state_machine::RetryConfig;

const CONFIG_FILE: &str = "execwatch.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chave da organização usada em todas as rotas da API.
    #[serde(default)]
    pub org_key: String,

    #[serde(default)]
    pub api_token: String,

    /// Segundos entre ciclos de polling do watch.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Máximo de chamadas remotas simultâneas em operações em lote.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Tentativas por chamada remota, contando a primeira.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Atraso base em milissegundos para o backoff exponencial.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://os.deeporigin.io/api".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_concurrency() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            org_key: String::new(),
            api_token: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            max_concurrency: default_max_concurrency(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TrackerConfig {
    /// Carrega `execwatch.toml` do diretório atual e aplica as variáveis de
    /// ambiente.
    pub fn load() -> Result<Self> {
        Self::load_with_env(Path::new(CONFIG_FILE))
    }

    /// Igual a [`load`](Self::load), mas lendo um caminho explícito.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Lê um arquivo de configuração; usa os padrões se ele não existir.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<TrackerConfig>(&contents)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(token) = non_empty("EXECWATCH_API_TOKEN") {
            self.api_token = token;
        }
        if let Some(url) = non_empty("EXECWATCH_BASE_URL") {
            self.base_url = url;
        }
        if let Some(org) = non_empty("EXECWATCH_ORG_KEY") {
            self.org_key = org;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            attempt_timeout_ms: self.request_timeout_secs.saturating_mul(1000),
        }
    }
}
