//! 로깅 유틸리티
//!
//! 로그 초기화 및 도메인 로그 헬퍼 제공

use env_logger::Builder;
use log::LevelFilter;
use std::env;

use crate::error::AnalyticsError;

fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// 로깅 시스템 초기화
///
/// RUST_LOG가 설정되어 있으면 설정 파일의 레벨보다 우선한다.
pub fn init(default_level: &str) -> Result<(), AnalyticsError> {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());

    Builder::new()
        .filter_level(parse_level(&log_level))
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| AnalyticsError::ConfigError(format!("logger already initialized: {}", e)))?;

    log::info!("로깅 시스템 초기화 완료: 레벨 = {}", log_level);

    Ok(())
}

/// 배치 분석 완료 로그
pub fn log_batch_analyzed(source: &str, outcomes: usize, event_types: usize) {
    log::info!("배치 분석 완료: {} - 결과 수: {} - 이벤트 유형 수: {}", source, outcomes, event_types);
}

/// 몬테카를로 시뮬레이션 로그
pub fn log_simulation(scenarios: usize, path_length: usize, seed: Option<u64>) {
    match seed {
        Some(seed) => log::info!("시뮬레이션 실행: 시나리오 {} x 경로 {} (seed = {})", scenarios, path_length, seed),
        None => log::info!("시뮬레이션 실행: 시나리오 {} x 경로 {}", scenarios, path_length),
    }
}

/// 구독 시작 로그
pub fn log_subscribed(session: &str, ticker: &str) {
    log::info!("구독 시작: 세션 {} - 티커: {}", session, ticker);
}

/// 구독 종료 로그
pub fn log_unsubscribed(session: &str, ticker: &str) {
    log::info!("구독 종료: 세션 {} - 티커: {}", session, ticker);
}

/// 폐기된 틱 로그
pub fn log_tick_rejected(ticker: &str, error: &AnalyticsError) {
    log::warn!("틱 폐기: {} - {}", ticker, error);
}

/// 오류 로그
pub fn log_error(context: &str, error: &AnalyticsError) {
    if error.is_transient() {
        log::warn!("일시적 오류 - {}: {}", context, error);
    } else {
        log::error!("오류 발생 - {}: {}", context, error);
    }
}
