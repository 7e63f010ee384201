/**
* filename : main
* author : HAMA
* date: 2025. 5. 8.
* description: analyze / simulate / quote / serve 진입점
**/

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use eventQuant::analytics::{AnalyticsReport, MonteCarloParams, MonteCarloSimulator, OutcomeMetrics, RiskSettings};
use eventQuant::backtest::{CsvOutcomeLoader, HttpBacktestClient, OutcomeSource};
use eventQuant::config::Config;
use eventQuant::http::{build_router, AppState};
use eventQuant::market_data::{HttpQuoteClient, QuoteProvider, SessionManager, WebSocketTickFeed};
use eventQuant::utils::{format, logging};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // 설정 로드
    let config = Config::load()?;

    // 로깅 초기화
    logging::init(&config.logging.level)?;
    log::info!("이벤트 분석 엔진 시작 (v{})", eventQuant::VERSION);

    // 명령줄 인수 확인
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("analyze") => run_analyze(&config, &args[2..]),
        Some("simulate") => run_simulate(&config, &args[2..]),
        Some("quote") => {
            let ticker = args.get(2).context("usage: eventQuant quote <TICKER>")?;
            run_quote(&config, ticker).await
        }
        Some("serve") | None => run_server(config).await,
        Some(other) => anyhow::bail!("unknown command: {}", other),
    }
}

/// `--min-sentiment X`: 감성 점수가 X를 넘는 행만 분석
fn parse_min_sentiment(value: Option<&String>) -> Result<f64, anyhow::Error> {
    let value = value.context("--min-sentiment requires a value")?;
    value.parse().with_context(|| format!("invalid sentiment threshold: {}", value))
}

fn run_analyze(config: &Config, args: &[String]) -> Result<(), anyhow::Error> {
    let mut csv_path = None;
    let mut min_sentiment = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--min-sentiment" {
            min_sentiment = Some(parse_min_sentiment(iter.next())?);
        } else {
            csv_path = Some(PathBuf::from(arg));
        }
    }

    let path = csv_path.context("usage: eventQuant analyze <outcomes.csv> [--min-sentiment X]")?;
    let loader = CsvOutcomeLoader::new(path, ',').with_sentiment_threshold(min_sentiment);
    let batch = loader.load_outcomes()?;

    let report = AnalyticsReport::from_batch(&batch, &config.analytics)
        .with_context(|| format!("{} 분석 실패", loader.describe()))?;
    logging::log_batch_analyzed(&loader.describe(), report.overall.total_events, report.by_event_type.len());

    println!("{}", report.summary());
    Ok(())
}

fn run_simulate(config: &Config, args: &[String]) -> Result<(), anyhow::Error> {
    let mut csv_path = None;
    let mut seed = config.monte_carlo.seed;
    let mut min_sentiment = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--seed" {
            let value = iter.next().context("--seed requires a value")?;
            seed = Some(value.parse().with_context(|| format!("invalid seed: {}", value))?);
        } else if arg == "--min-sentiment" {
            min_sentiment = Some(parse_min_sentiment(iter.next())?);
        } else {
            csv_path = Some(PathBuf::from(arg));
        }
    }

    // CSV가 없으면 기본 파라미터
    let metrics = match csv_path {
        Some(path) => {
            let batch = CsvOutcomeLoader::new(path, ',')
                .with_sentiment_threshold(min_sentiment)
                .load_outcomes()?;
            Some(OutcomeMetrics::compute(&batch, &RiskSettings::from(&config.analytics))?)
        }
        None => None,
    };
    let params = MonteCarloParams::from_metrics(metrics.as_ref(), &config.monte_carlo);

    logging::log_simulation(params.scenario_count, params.path_length, seed);
    let result = MonteCarloSimulator::from_seed_option(seed).run(&params)?;

    println!("=== 몬테카를로 시뮬레이션 ===");
    println!("시나리오: {} x {} 거래", params.scenario_count, params.path_length);
    println!("승률: {}", format::format_percent(params.win_rate, 1));
    println!("평균 최종 수익: {}", format::format_percent(result.summary.mean_final, 2));
    println!("중앙 최종 수익: {}", format::format_percent(result.summary.median_final, 2));
    println!("기대 최종 수익: {}", format::format_percent(result.summary.expected_final, 2));
    println!("수익 확률: {}", format::format_percent(result.summary.probability_of_profit, 1));

    Ok(())
}

async fn run_quote(config: &Config, ticker: &str) -> Result<(), anyhow::Error> {
    let client = HttpQuoteClient::from_config(&config.quote_service)?;
    let quote = client.get_quote(&ticker.to_uppercase()).await?;

    println!("{} {}", quote.ticker, format::format_price(quote.current));
    println!(
        "변동: {} {} ({})",
        if quote.is_up() { "▲" } else { "▼" },
        format::format_signed(quote.change(), 2),
        format::format_percent(quote.change_percent().map(|p| p / 100.0), 2)
    );
    println!("고가 {} / 저가 {}", format::format_price(quote.high), format::format_price(quote.low));
    println!("기준 시각: {}", quote.timestamp.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

async fn run_server(config: Config) -> Result<(), anyhow::Error> {
    let backtest = Arc::new(HttpBacktestClient::from_config(&config.backtest_service)?);
    match backtest.health_check().await {
        Ok(true) => log::info!("백테스트 서비스 연결 확인"),
        Ok(false) => log::warn!("백테스트 서비스 응답 이상: {}", config.backtest_service.base_url),
        Err(e) => logging::log_error("backtest health check", &e),
    }
    let quotes = Arc::new(HttpQuoteClient::from_config(&config.quote_service)?);
    let feed = Arc::new(WebSocketTickFeed::from_config(&config.quote_service, &config.streaming));
    let sessions = Arc::new(SessionManager::new(feed, config.streaming.clone()));
    log::info!("백테스트 서비스: {}", config.backtest_service.base_url);
    log::info!("시세 서비스: {} / {}", config.quote_service.base_url, config.quote_service.ws_url);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, backtest, quotes, sessions);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("서버 시작: http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
