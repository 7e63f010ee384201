/**
* filename : config
* author : HAMA
* date: 2025. 5. 8.
* description:
**/

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::AnalyticsError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backtest_service: BacktestServiceConfig,
    pub quote_service: QuoteServiceConfig,
    pub analytics: AnalyticsConfig,
    pub monte_carlo: MonteCarloConfig,
    pub streaming: StreamingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestServiceConfig {
    pub base_url: String,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteServiceConfig {
    pub base_url: String,
    pub ws_url: String,
    pub timeout_ms: Option<u64>,
}

/// 배치 분석 파라미터
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub rolling_window: usize,
    pub histogram_buckets: usize,
    pub top_trades: usize,
    /// 거래당 무위험 수익률
    pub risk_free_rate: f64,
    /// 샤프/소르티노 연율화 계수 (1.0 = 연율화 없음)
    pub annualization: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub scenario_count: usize,
    pub path_length: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub window_capacity: usize,
    pub sma_period: usize,
    pub channel_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Load configuration from a file
    pub fn load() -> Result<Self, AnalyticsError> {
        Self::load_from(Path::new("config.json"))
    }

    pub fn load_from(config_path: &Path) -> Result<Self, AnalyticsError> {
        let mut cfg = if config_path.exists() {
            let mut file = File::open(config_path)
                .map_err(|e| AnalyticsError::ConfigError(format!("Failed to open config file: {}", e)))?;

            let mut contents = String::new();
            file.read_to_string(&mut contents)
                .map_err(|e| AnalyticsError::ConfigError(format!("Failed to read config file: {}", e)))?;

            serde_json::from_str::<Config>(&contents)
                .map_err(|e| AnalyticsError::ConfigError(format!("Failed to parse config file: {}", e)))?
        } else {
            Config::default()
        };

        // environment overrides
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply environment variable overrides for runtime fields
    fn apply_env_overrides(&mut self) {
        use std::env;
        if let Ok(v) = env::var("BACKTEST_SERVICE_URL") { if !v.is_empty() { self.backtest_service.base_url = v; } }
        if let Ok(v) = env::var("QUOTE_SERVICE_URL") { if !v.is_empty() { self.quote_service.base_url = v; } }
        if let Ok(v) = env::var("QUOTE_WS_URL") { if !v.is_empty() { self.quote_service.ws_url = v; } }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(port) = v.parse::<u16>() { self.server.port = port; }
        }
        if let Ok(v) = env::var("MONTE_CARLO_SEED") {
            if let Ok(seed) = v.parse::<u64>() { self.monte_carlo.seed = Some(seed); }
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.analytics.rolling_window == 0 {
            return Err(AnalyticsError::ConfigError("analytics.rolling_window must be > 0".to_string()));
        }
        if self.analytics.histogram_buckets == 0 {
            return Err(AnalyticsError::ConfigError("analytics.histogram_buckets must be > 0".to_string()));
        }
        if self.analytics.annualization <= 0.0 {
            return Err(AnalyticsError::ConfigError("analytics.annualization must be > 0".to_string()));
        }
        if self.monte_carlo.scenario_count == 0 || self.monte_carlo.path_length == 0 {
            return Err(AnalyticsError::ConfigError("monte_carlo counts must be > 0".to_string()));
        }
        if self.streaming.window_capacity < 2 {
            return Err(AnalyticsError::ConfigError("streaming.window_capacity must be >= 2".to_string()));
        }
        if self.streaming.sma_period == 0 || self.streaming.sma_period > self.streaming.window_capacity {
            return Err(AnalyticsError::ConfigError(
                "streaming.sma_period must be within 1..=window_capacity".to_string(),
            ));
        }
        if self.streaming.channel_buffer == 0 {
            return Err(AnalyticsError::ConfigError("streaming.channel_buffer must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

impl Default for BacktestServiceConfig {
    fn default() -> Self {
        BacktestServiceConfig {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: Some(30_000),
        }
    }
}

impl Default for QuoteServiceConfig {
    fn default() -> Self {
        QuoteServiceConfig {
            base_url: "http://127.0.0.1:8000".to_string(),
            ws_url: "ws://127.0.0.1:8000".to_string(),
            timeout_ms: Some(5000),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            rolling_window: 30,
            histogram_buckets: 20,
            top_trades: 5,
            risk_free_rate: 0.0,
            annualization: 1.0,
        }
    }
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        MonteCarloConfig {
            scenario_count: 100,
            path_length: 50,
            seed: None,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        StreamingConfig {
            window_capacity: 100,
            sma_period: 20,
            channel_buffer: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}
