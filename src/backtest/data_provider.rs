use std::path::PathBuf;

use crate::error::AnalyticsError;
use crate::models::{filter_by_sentiment, EventOutcome, EventType};
use crate::utils::parse_date;

/// 오프라인 결과 배치 공급자
pub trait OutcomeSource {
    fn describe(&self) -> String;
    fn load_outcomes(&self) -> Result<Vec<EventOutcome>, AnalyticsError>;
}

/// CSV 파일에서 이벤트 결과 배치를 읽는다
///
/// 헤더: `date,event_type,entry_price,exit_price,total_return[,volatility,volume_ratio,sentiment,description]`
pub struct CsvOutcomeLoader {
    path: PathBuf,
    delimiter: u8,
    sentiment_threshold: Option<f64>,
}

impl CsvOutcomeLoader {
    pub fn new(path: PathBuf, delimiter: char) -> Self {
        Self {
            path,
            delimiter: delimiter as u8,
            sentiment_threshold: None,
        }
    }

    /// 감성 점수가 threshold를 넘는 행만 남긴다. 점수 없는 행은 제외
    pub fn with_sentiment_threshold(mut self, threshold: Option<f64>) -> Self {
        self.sentiment_threshold = threshold;
        self
    }

    pub fn from_reader<R: std::io::Read>(reader: R, delimiter: u8) -> Result<Vec<EventOutcome>, AnalyticsError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut result = Vec::new();
        for (line, rec) in rdr.deserialize().enumerate() {
            let row: CsvRow = rec?;
            let outcome = row.into_outcome().map_err(|e| {
                AnalyticsError::ParseError(format!("row {}: {}", line + 1, e))
            })?;
            outcome.validate()?;
            result.push(outcome);
        }
        Ok(result)
    }
}

impl OutcomeSource for CsvOutcomeLoader {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load_outcomes(&self) -> Result<Vec<EventOutcome>, AnalyticsError> {
        let file = std::fs::File::open(&self.path)?;
        let outcomes = Self::from_reader(file, self.delimiter)?;

        Ok(match self.sentiment_threshold {
            Some(threshold) => filter_by_sentiment(&outcomes, threshold),
            None => outcomes,
        })
    }
}

#[derive(serde::Deserialize)]
struct CsvRow {
    date: String,
    event_type: String,
    entry_price: f64,
    exit_price: f64,
    total_return: f64,
    #[serde(default)]
    volatility: Option<f64>,
    #[serde(default)]
    volume_ratio: Option<f64>,
    #[serde(default)]
    sentiment: Option<f64>,
    #[serde(default)]
    description: Option<String>,
}

impl CsvRow {
    fn into_outcome(self) -> Result<EventOutcome, AnalyticsError> {
        let date = parse_date(&self.date)
            .ok_or_else(|| AnalyticsError::ParseError(format!("invalid date: {}", self.date)))?;
        let event_type: EventType = self.event_type.parse()?;

        Ok(EventOutcome {
            date,
            event_type,
            description: self.description.filter(|d| !d.is_empty()),
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            pre_return: None,
            post_return: None,
            total_return: self.total_return,
            volatility: self.volatility.unwrap_or(0.0),
            volume_ratio: self.volume_ratio.unwrap_or(1.0),
            sentiment: self.sentiment,
        })
    }
}
