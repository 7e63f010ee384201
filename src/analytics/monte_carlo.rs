/**
* filename : monte_carlo
* author : HAMA
* date: 2025. 5. 14.
* description: 승률/평균 손익 기반 누적 수익 경로 시뮬레이션
**/

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analytics::statistics::OverallMetrics;
use crate::config::MonteCarloConfig;
use crate::error::AnalyticsError;
use crate::utils::math;

pub const DEFAULT_WIN_RATE: f64 = 0.5;
pub const DEFAULT_AVG_WIN: f64 = 0.03;
pub const DEFAULT_AVG_LOSS: f64 = -0.02;

/// 요청 하나가 만들 수 있는 경로 규모 상한
pub const MAX_SCENARIOS: usize = 100_000;
pub const MAX_PATH_LENGTH: usize = 10_000;
pub const MAX_TOTAL_POINTS: usize = 10_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloParams {
  pub win_rate: f64,
  pub avg_win: f64,
  pub avg_loss: f64,
  pub scenario_count: usize,
  pub path_length: usize,
}

impl Default for MonteCarloParams {
  fn default() -> Self {
    let cfg = MonteCarloConfig::default();
    MonteCarloParams {
      win_rate: DEFAULT_WIN_RATE,
      avg_win: DEFAULT_AVG_WIN,
      avg_loss: DEFAULT_AVG_LOSS,
      scenario_count: cfg.scenario_count,
      path_length: cfg.path_length,
    }
  }
}

impl MonteCarloParams {
  /// 배치 요약 지표에서 파라미터 구성. 정의되지 않은 지표는 기본값 사용
  pub fn from_metrics(metrics: Option<&OverallMetrics>, cfg: &MonteCarloConfig) -> Self {
    let (win_rate, avg_win, avg_loss) = match metrics {
      Some(m) => (
        m.win_rate,
        m.avg_win.value_or(DEFAULT_AVG_WIN),
        m.avg_loss.value_or(DEFAULT_AVG_LOSS),
      ),
      None => (DEFAULT_WIN_RATE, DEFAULT_AVG_WIN, DEFAULT_AVG_LOSS),
    };

    MonteCarloParams {
      win_rate,
      avg_win,
      avg_loss,
      scenario_count: cfg.scenario_count,
      path_length: cfg.path_length,
    }
  }

  pub fn validate(&self) -> Result<(), AnalyticsError> {
    if !(0.0..=1.0).contains(&self.win_rate) {
      return Err(AnalyticsError::InvalidParameter(format!("win_rate out of [0, 1]: {}", self.win_rate)));
    }
    if !self.avg_win.is_finite() || self.avg_win < 0.0 {
      return Err(AnalyticsError::InvalidParameter(format!("avg_win must be >= 0: {}", self.avg_win)));
    }
    if !self.avg_loss.is_finite() || self.avg_loss > 0.0 {
      return Err(AnalyticsError::InvalidParameter(format!("avg_loss must be <= 0: {}", self.avg_loss)));
    }
    if self.scenario_count == 0 || self.path_length == 0 {
      return Err(AnalyticsError::InvalidParameter("scenario_count and path_length must be > 0".to_string()));
    }
    if self.scenario_count > MAX_SCENARIOS {
      return Err(AnalyticsError::InvalidParameter(format!(
        "scenario_count exceeds {}: {}", MAX_SCENARIOS, self.scenario_count
      )));
    }
    if self.path_length > MAX_PATH_LENGTH {
      return Err(AnalyticsError::InvalidParameter(format!(
        "path_length exceeds {}: {}", MAX_PATH_LENGTH, self.path_length
      )));
    }
    if self.scenario_count * (self.path_length + 1) > MAX_TOTAL_POINTS {
      return Err(AnalyticsError::InvalidParameter(format!(
        "{} x {} exceeds {} points", self.scenario_count, self.path_length, MAX_TOTAL_POINTS
      )));
    }
    Ok(())
  }

  /// 경로 끝값의 기대치: path_length × (p·avg_win + (1 − p)·avg_loss)
  pub fn expected_final_return(&self) -> f64 {
    self.path_length as f64 * (self.win_rate * self.avg_win + (1.0 - self.win_rate) * self.avg_loss)
  }
}

/// 합성 누적 수익 경로 하나. points[0] = 0 (원점), 이후 거래마다 한 점
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloScenario {
  pub points: Vec<f64>,
}

impl MonteCarloScenario {
  pub fn final_return(&self) -> f64 {
    self.points.last().copied().unwrap_or(0.0)
  }

  /// 원점을 제외한 거래 수
  pub fn trade_count(&self) -> usize {
    self.points.len().saturating_sub(1)
  }
}

/// 시나리오 끝값 분포 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
  pub mean_final: f64,
  pub median_final: f64,
  pub p5_final: f64,
  pub p95_final: f64,
  pub probability_of_profit: f64,
  pub expected_final: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
  pub params: MonteCarloParams,
  pub scenarios: Vec<MonteCarloScenario>,
  pub summary: SimulationSummary,
}

pub struct MonteCarloSimulator<R: Rng> {
  rng: R,
}

impl MonteCarloSimulator<StdRng> {
  pub fn seeded(seed: u64) -> Self {
    MonteCarloSimulator { rng: StdRng::seed_from_u64(seed) }
  }

  pub fn from_entropy() -> Self {
    MonteCarloSimulator { rng: StdRng::from_entropy() }
  }

  pub fn from_seed_option(seed: Option<u64>) -> Self {
    match seed {
      Some(seed) => Self::seeded(seed),
      None => Self::from_entropy(),
    }
  }
}

impl<R: Rng> MonteCarloSimulator<R> {
  pub fn with_rng(rng: R) -> Self {
    MonteCarloSimulator { rng }
  }

  pub fn run(&mut self, params: &MonteCarloParams) -> Result<MonteCarloResult, AnalyticsError> {
    params.validate()?;

    let scenarios: Vec<MonteCarloScenario> = (0..params.scenario_count)
      .map(|_| self.simulate_path(params))
      .collect();

    let summary = summarize(&scenarios, params)?;

    Ok(MonteCarloResult {
      params: params.clone(),
      scenarios,
      summary,
    })
  }

  fn simulate_path(&mut self, params: &MonteCarloParams) -> MonteCarloScenario {
    let mut points = Vec::with_capacity(params.path_length + 1);
    let mut cumulative = 0.0;
    points.push(cumulative);

    for _ in 0..params.path_length {
      let is_win = self.rng.gen::<f64>() < params.win_rate;
      let scale = 0.5 + self.rng.gen::<f64>();
      let step = if is_win { params.avg_win * scale } else { params.avg_loss * scale };
      cumulative += step;
      points.push(cumulative);
    }

    MonteCarloScenario { points }
  }
}

fn summarize(scenarios: &[MonteCarloScenario], params: &MonteCarloParams) -> Result<SimulationSummary, AnalyticsError> {
  let finals: Vec<f64> = scenarios.iter().map(|s| s.final_return()).collect();
  let profitable = finals.iter().filter(|v| **v > 0.0).count();

  Ok(SimulationSummary {
    mean_final: math::average(&finals).ok_or(AnalyticsError::NoData)?,
    median_final: math::median(&finals).ok_or(AnalyticsError::NoData)?,
    p5_final: math::percentile(&finals, 5.0).ok_or(AnalyticsError::NoData)?,
    p95_final: math::percentile(&finals, 95.0).ok_or(AnalyticsError::NoData)?,
    probability_of_profit: profitable as f64 / finals.len() as f64,
    expected_final: params.expected_final_return(),
  })
}
