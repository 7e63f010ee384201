use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time quote returned by the live-quote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub current: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn change(&self) -> f64 {
        self.current - self.previous_close
    }

    /// Percent change vs previous close, None when there is no previous close.
    pub fn change_percent(&self) -> Option<f64> {
        if self.previous_close > 0.0 {
            Some(self.change() / self.previous_close * 100.0)
        } else {
            None
        }
    }

    pub fn is_up(&self) -> bool {
        self.change() >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(current: f64, previous_close: f64) -> Quote {
        Quote {
            ticker: "AAPL".to_string(),
            current,
            open: 100.0,
            high: 102.0,
            low: 98.0,
            previous_close,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_change_and_percent() {
        let q = quote(105.0, 100.0);
        assert!((q.change() - 5.0).abs() < 1e-12);
        assert!((q.change_percent().unwrap() - 5.0).abs() < 1e-12);
        assert!(q.is_up());
    }

    #[test]
    fn test_percent_without_previous_close() {
        assert_eq!(quote(105.0, 0.0).change_percent(), None);
    }
}
