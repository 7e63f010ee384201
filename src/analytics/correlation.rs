use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::series::sort_chronologically;
use crate::error::AnalyticsError;
use crate::models::{EventOutcome, EventType};
use crate::utils::math;

/// 이벤트 유형 간 수익률 상관계수 행렬 (대칭, 대각 1.0)
///
/// 결과가 2개 미만인 유형이나 유효 포인트가 2개 미만인 쌍은 키 자체가 없다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationMatrix {
    entries: BTreeMap<EventType, BTreeMap<EventType, f64>>,
}

impl CorrelationMatrix {
    /// 유형별로 시간순 순위가 같은 결과끼리 짝지어 피어슨 상관계수를 구한다.
    /// 길이가 다르면 짧은 쪽에 맞춰 자른다.
    pub fn compute(outcomes: &[EventOutcome]) -> Result<Self, AnalyticsError> {
        if outcomes.is_empty() {
            return Err(AnalyticsError::NoData);
        }

        let mut series: BTreeMap<EventType, Vec<f64>> = BTreeMap::new();
        for outcome in sort_chronologically(outcomes) {
            series.entry(outcome.event_type).or_default().push(outcome.total_return);
        }
        series.retain(|_, returns| returns.len() >= 2);

        let mut matrix = CorrelationMatrix::default();
        let types: Vec<EventType> = series.keys().copied().collect();

        for (i, a) in types.iter().enumerate() {
            matrix.insert(*a, *a, 1.0);

            for b in types.iter().skip(i + 1) {
                let (xs, ys) = (&series[a], &series[b]);
                let n = xs.len().min(ys.len());
                if let Some(r) = math::pearson(&xs[..n], &ys[..n]) {
                    matrix.insert(*a, *b, r);
                    matrix.insert(*b, *a, r);
                }
            }
        }

        Ok(matrix)
    }

    fn insert(&mut self, a: EventType, b: EventType, value: f64) {
        self.entries.entry(a).or_default().insert(b, value);
    }

    pub fn get(&self, a: EventType, b: EventType) -> Option<f64> {
        self.entries.get(&a).and_then(|row| row.get(&b)).copied()
    }

    pub fn event_types(&self) -> Vec<EventType> {
        self.entries.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_symmetric(&self) -> bool {
        self.entries.iter().all(|(a, row)| {
            row.iter().all(|(b, v)| self.get(*b, *a) == Some(*v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn outcome(day: u32, event_type: EventType, ret: f64) -> EventOutcome {
        let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        EventOutcome::new(date, event_type, 100.0, 100.0 * (1.0 + ret), ret)
    }

    #[test]
    fn test_positional_pairing_truncates() {
        let batch = vec![
            outcome(1, EventType::Earnings, 0.01),
            outcome(2, EventType::Earnings, 0.02),
            outcome(3, EventType::Earnings, 0.03),
            outcome(4, EventType::Fed, -0.01),
            outcome(5, EventType::Fed, -0.02),
        ];
        let matrix = CorrelationMatrix::compute(&batch).unwrap();

        assert_eq!(matrix.get(EventType::Earnings, EventType::Earnings), Some(1.0));
        let r = matrix.get(EventType::Earnings, EventType::Fed).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn test_types_with_single_outcome_are_absent() {
        let batch = vec![
            outcome(1, EventType::Earnings, 0.01),
            outcome(2, EventType::Earnings, 0.02),
            outcome(3, EventType::Merger, 0.05),
        ];
        let matrix = CorrelationMatrix::compute(&batch).unwrap();
        assert_eq!(matrix.event_types(), vec![EventType::Earnings]);
        assert_eq!(matrix.get(EventType::Earnings, EventType::Merger), None);
    }

    #[test]
    fn test_zero_variance_pair_is_omitted() {
        let batch = vec![
            outcome(1, EventType::Fed, 0.01),
            outcome(2, EventType::Fed, 0.01),
            outcome(3, EventType::Dividend, 0.02),
            outcome(4, EventType::Dividend, 0.04),
        ];
        let matrix = CorrelationMatrix::compute(&batch).unwrap();
        assert_eq!(matrix.get(EventType::Fed, EventType::Dividend), None);
        assert_eq!(matrix.get(EventType::Fed, EventType::Fed), Some(1.0));
    }
}
