//! 이벤트 결과 분석 및 스트리밍 지표 엔진
//!
//! 백테스트 이벤트 결과 배치를 요약 지표, 상관관계, 몬테카를로 시뮬레이션으로 분석하고
//! 실시간 가격 틱으로 SMA/RSI 지표를 계산합니다.

pub mod analytics;
pub mod backtest;
pub mod config;
pub mod error;
pub mod http;
pub mod indicators;
pub mod market_data;
pub mod models;
pub mod utils;

// 핵심 타입 재노출
pub use crate::analytics::{AnalyticsReport, CorrelationMatrix, Metric, MonteCarloSimulator, OutcomeMetrics};
pub use crate::backtest::{BacktestParameters, BacktestService};
pub use crate::error::AnalyticsError;
pub use crate::indicators::{IndicatorSnapshot, StreamingIndicatorEngine};
pub use crate::market_data::{SessionManager, TickFeed, TickSubscription};
pub use crate::models::{EventOutcome, EventType, PriceTick, Quote};

/// 버전 정보
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 결과 타입 별칭
pub type Result<T> = std::result::Result<T, AnalyticsError>;
