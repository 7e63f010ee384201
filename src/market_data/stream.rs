use std::collections::HashMap;

use tokio::sync::broadcast;

use crate::error::AnalyticsError;
use crate::indicators::IndicatorSnapshot;

/// 세션별 지표 스냅샷 브로드캐스트와 최신 값 캐시
pub struct IndicatorStream {
    channels: HashMap<String, broadcast::Sender<IndicatorSnapshot>>,
    latest: HashMap<String, IndicatorSnapshot>,
    buffer_size: usize,
}

impl IndicatorStream {
    pub fn new(buffer_size: usize) -> Self {
        IndicatorStream {
            channels: HashMap::new(),
            latest: HashMap::new(),
            buffer_size,
        }
    }

    /// 채널 생성 또는 가져오기
    pub fn get_or_create_channel(&mut self, key: &str) -> broadcast::Sender<IndicatorSnapshot> {
        if let Some(sender) = self.channels.get(key) {
            sender.clone()
        } else {
            let (sender, _) = broadcast::channel(self.buffer_size);
            self.channels.insert(key.to_string(), sender.clone());
            sender
        }
    }

    /// 스냅샷 저장 및 브로드캐스트. 구독자가 없어도 최신 값은 갱신된다
    pub fn publish(&mut self, key: &str, snapshot: IndicatorSnapshot) -> Result<(), AnalyticsError> {
        let sender = self
            .channels
            .get(key)
            .ok_or_else(|| AnalyticsError::ChannelNotFound(key.to_string()))?;

        let _ = sender.send(snapshot.clone());
        self.latest.insert(key.to_string(), snapshot);
        Ok(())
    }

    pub fn get_latest(&self, key: &str) -> Option<IndicatorSnapshot> {
        self.latest.get(key).cloned()
    }

    /// 최신 스냅샷만 비운다 (창 교체 시)
    pub fn clear_latest(&mut self, key: &str) {
        self.latest.remove(key);
    }

    pub fn get_receiver(&self, key: &str) -> Result<broadcast::Receiver<IndicatorSnapshot>, AnalyticsError> {
        if let Some(sender) = self.channels.get(key) {
            Ok(sender.subscribe())
        } else {
            Err(AnalyticsError::ChannelNotFound(key.to_string()))
        }
    }

    pub fn remove_channel(&mut self, key: &str) {
        self.channels.remove(key);
        self.latest.remove(key);
    }
}
