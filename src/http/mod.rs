use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::analytics::{AnalyticsReport, MonteCarloParams, MonteCarloResult, MonteCarloSimulator, OutcomeMetrics, RiskSettings};
use crate::backtest::{BacktestParameters, BacktestService};
use crate::config::Config;
use crate::error::AnalyticsError;
use crate::market_data::{QuoteProvider, SessionId, SessionManager, SubscriptionState};
use crate::models::{EventOutcome, Quote};
use crate::utils::logging;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<Config>,
  pub backtest: Arc<dyn BacktestService>,
  pub quotes: Arc<dyn QuoteProvider>,
  pub sessions: Arc<SessionManager>,
  /// 마지막으로 완성된 보고서. 새 배치가 오면 통째로 교체된다
  pub latest_report: Arc<RwLock<Option<AnalyticsReport>>>,
}

impl AppState {
  pub fn new(
    config: Config,
    backtest: Arc<dyn BacktestService>,
    quotes: Arc<dyn QuoteProvider>,
    sessions: Arc<SessionManager>,
  ) -> Self {
    AppState {
      config: Arc::new(config),
      backtest,
      quotes,
      sessions,
      latest_report: Arc::new(RwLock::new(None)),
    }
  }
}

#[derive(Debug, Serialize)]
struct Health { status: &'static str }

/// 렌더링 싱크용 응답. 빈 배치는 에러가 아니라 빈 상태
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportResponse {
  Ready { report: Box<AnalyticsReport> },
  Empty,
}

#[derive(Debug, Serialize)]
struct ErrorBody { error: String, transient: bool }

pub struct ApiError(AnalyticsError);

impl From<AnalyticsError> for ApiError {
  fn from(e: AnalyticsError) -> Self {
    ApiError(e)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      AnalyticsError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
      AnalyticsError::SessionNotFound(_) | AnalyticsError::ChannelNotFound(_) => StatusCode::NOT_FOUND,
      AnalyticsError::NotSubscribed(_) => StatusCode::CONFLICT,
      AnalyticsError::InvalidParameter(_) | AnalyticsError::ParseError(_) | AnalyticsError::MalformedTick(_) => {
        StatusCode::BAD_REQUEST
      }
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    logging::log_error("http", &self.0);
    (status, Json(ErrorBody { error: self.0.to_string(), transient: self.0.is_transient() })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn build_router(state: AppState) -> Router {
  let cors = CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any);

  Router::new()
    .route("/health", get(|| async { Json(Health { status: "ok" }) }))
    // batch analytics
    .route("/analytics", post(analyze_batch))
    .route("/analytics/latest", get(latest_report))
    .route("/backtest", post(run_backtest))
    .route("/simulate", post(simulate))
    // live data
    .route("/quote/:ticker", get(get_quote))
    .route("/sessions", post(create_session))
    .route("/sessions/:id", get(get_session).delete(close_session))
    .route("/sessions/:id/ticker", post(switch_ticker).delete(unsubscribe))
    .route("/ws/indicators/:id", get(ws_indicators))
    .with_state(state)
    .layer(cors)
    .layer(TraceLayer::new_for_http())
}

async fn publish_report(state: &AppState, batch: &[EventOutcome]) -> ApiResult<ReportResponse> {
  match AnalyticsReport::from_batch(batch, &state.config.analytics) {
    Ok(report) => {
      logging::log_batch_analyzed("http", report.overall.total_events, report.by_event_type.len());
      *state.latest_report.write().await = Some(report.clone());
      Ok(Json(ReportResponse::Ready { report: Box::new(report) }))
    }
    Err(e) if e.is_empty_state() => {
      *state.latest_report.write().await = None;
      Ok(Json(ReportResponse::Empty))
    }
    Err(e) => Err(e.into()),
  }
}

async fn analyze_batch(State(state): State<AppState>, Json(batch): Json<Vec<EventOutcome>>) -> ApiResult<ReportResponse> {
  for outcome in &batch {
    outcome.validate()?;
  }
  publish_report(&state, &batch).await
}

async fn latest_report(State(state): State<AppState>) -> ApiResult<ReportResponse> {
  let latest = state.latest_report.read().await;
  Ok(Json(match latest.as_ref() {
    Some(report) => ReportResponse::Ready { report: Box::new(report.clone()) },
    None => ReportResponse::Empty,
  }))
}

async fn run_backtest(State(state): State<AppState>, Json(params): Json<BacktestParameters>) -> ApiResult<ReportResponse> {
  params.validate()?;
  let batch = state.backtest.run_backtest(&params).await?;
  publish_report(&state, &batch).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimulateRequest {
  /// 주어지면 이 배치의 요약 지표로 파라미터를 만든다
  pub outcomes: Option<Vec<EventOutcome>>,
  pub win_rate: Option<f64>,
  pub avg_win: Option<f64>,
  pub avg_loss: Option<f64>,
  pub scenario_count: Option<usize>,
  pub path_length: Option<usize>,
  pub seed: Option<u64>,
}

impl SimulateRequest {
  pub fn to_params(&self, config: &Config) -> Result<MonteCarloParams, AnalyticsError> {
    let metrics = match &self.outcomes {
      Some(batch) if !batch.is_empty() => {
        Some(OutcomeMetrics::compute(batch, &RiskSettings::from(&config.analytics))?)
      }
      _ => None,
    };

    let mut params = MonteCarloParams::from_metrics(metrics.as_ref(), &config.monte_carlo);
    if let Some(v) = self.win_rate { params.win_rate = v; }
    if let Some(v) = self.avg_win { params.avg_win = v; }
    if let Some(v) = self.avg_loss { params.avg_loss = v; }
    if let Some(v) = self.scenario_count { params.scenario_count = v; }
    if let Some(v) = self.path_length { params.path_length = v; }
    Ok(params)
  }
}

async fn simulate(State(state): State<AppState>, Json(req): Json<SimulateRequest>) -> ApiResult<MonteCarloResult> {
  let params = req.to_params(&state.config)?;
  let seed = req.seed.or(state.config.monte_carlo.seed);
  logging::log_simulation(params.scenario_count, params.path_length, seed);

  let result = MonteCarloSimulator::from_seed_option(seed).run(&params)?;
  Ok(Json(result))
}

#[derive(Debug, Serialize)]
pub struct QuoteView {
  #[serde(flatten)]
  pub quote: Quote,
  pub change: f64,
  pub change_percent: Option<f64>,
}

async fn get_quote(Path(ticker): Path<String>, State(state): State<AppState>) -> ApiResult<QuoteView> {
  let quote = state.quotes.get_quote(&ticker.to_uppercase()).await?;
  Ok(Json(QuoteView { change: quote.change(), change_percent: quote.change_percent(), quote }))
}

#[derive(Debug, Serialize)]
struct SessionView {
  id: SessionId,
  state: SubscriptionState,
  ticker: Option<String>,
}

async fn create_session(State(state): State<AppState>) -> ApiResult<SessionView> {
  let id = state.sessions.create_session().await;
  Ok(Json(SessionView { id, state: SubscriptionState::Unsubscribed, ticker: None }))
}

async fn session_view(state: &AppState, id: SessionId) -> Result<SessionView, AnalyticsError> {
  let session = state.sessions.get(id).await?;
  let session = session.lock().await;
  Ok(SessionView { id, state: session.state(), ticker: session.ticker().map(str::to_string) })
}

async fn get_session(Path(id): Path<String>, State(state): State<AppState>) -> ApiResult<SessionView> {
  let id: SessionId = id.parse()?;
  Ok(Json(session_view(&state, id).await?))
}

async fn close_session(Path(id): Path<String>, State(state): State<AppState>) -> ApiResult<serde_json::Value> {
  let id: SessionId = id.parse()?;
  state.sessions.close_session(id).await?;
  Ok(Json(serde_json::json!({"status":"ok","closed": id})))
}

#[derive(Debug, Deserialize)]
struct SwitchTickerReq { ticker: String }

async fn switch_ticker(
  Path(id): Path<String>,
  State(state): State<AppState>,
  Json(req): Json<SwitchTickerReq>,
) -> ApiResult<SessionView> {
  let id: SessionId = id.parse()?;
  state.sessions.switch_ticker(id, &req.ticker).await?;
  Ok(Json(session_view(&state, id).await?))
}

async fn unsubscribe(Path(id): Path<String>, State(state): State<AppState>) -> ApiResult<SessionView> {
  let id: SessionId = id.parse()?;
  state.sessions.unsubscribe(id).await?;
  Ok(Json(session_view(&state, id).await?))
}

async fn ws_indicators(
  ws: WebSocketUpgrade,
  Path(id): Path<String>,
  State(state): State<AppState>,
) -> Result<Response, ApiError> {
  let id: SessionId = id.parse()?;
  let receiver = state.sessions.receiver(id).await?;
  let latest = state.sessions.latest_snapshot(id).await?;
  Ok(ws.on_upgrade(move |socket| indicator_stream(socket, receiver, latest)))
}

async fn indicator_stream(
  mut socket: WebSocket,
  mut receiver: broadcast::Receiver<crate::indicators::IndicatorSnapshot>,
  latest: Option<crate::indicators::IndicatorSnapshot>,
) {
  if let Some(snapshot) = latest {
    if let Ok(text) = serde_json::to_string(&snapshot) {
      if socket.send(Message::Text(text)).await.is_err() {
        return;
      }
    }
  }

  loop {
    match receiver.recv().await {
      Ok(snapshot) => {
        if let Ok(text) = serde_json::to_string(&snapshot) {
          if socket.send(Message::Text(text)).await.is_err() {
            break;
          }
        }
      }
      // 느린 소비자는 최신 값부터 다시 받는다
      Err(broadcast::error::RecvError::Lagged(skipped)) => {
        log::debug!("indicator socket lagged by {} snapshots", skipped);
      }
      Err(broadcast::error::RecvError::Closed) => break,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_simulate_request_defaults() {
    let params = SimulateRequest::default().to_params(&Config::default()).unwrap();
    assert_eq!(params.win_rate, 0.5);
    assert_eq!(params.scenario_count, 100);
  }

  #[test]
  fn test_simulate_request_overrides() {
    let req: SimulateRequest = serde_json::from_str(r#"{"win_rate": 0.7, "path_length": 10, "seed": 3}"#).unwrap();
    let params = req.to_params(&Config::default()).unwrap();
    assert_eq!(params.win_rate, 0.7);
    assert_eq!(params.path_length, 10);
    assert_eq!(params.avg_win, 0.03);
  }

  #[test]
  fn test_oversized_simulation_is_bad_request() {
    let req: SimulateRequest = serde_json::from_value(serde_json::json!({"path_length": u64::MAX})).unwrap();
    let params = req.to_params(&Config::default()).unwrap();
    let err = MonteCarloSimulator::seeded(1).run(&params).unwrap_err();
    assert_eq!(ApiError::from(err).into_response().status(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn test_empty_report_shape() {
    let json = serde_json::to_value(ReportResponse::Empty).unwrap();
    assert_eq!(json, serde_json::json!({"state": "empty"}));
  }
}
