/**
* filename : session
* author : HAMA
* date: 2025. 5. 14.
* description: 세션별 티커 구독과 스트리밍 지표 소비 작업
**/

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::StreamingConfig;
use crate::error::AnalyticsError;
use crate::indicators::{IndicatorSnapshot, StreamingIndicatorEngine};
use crate::market_data::provider::TickFeed;
use crate::market_data::stream::IndicatorStream;
use crate::models::PriceTick;
use crate::utils::logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|e| AnalyticsError::ParseError(format!("invalid session id {}: {}", s, e)))
    }
}

/// 구독 상태: UNSUBSCRIBED -> ACTIVE -> CLOSED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Unsubscribed,
    Active,
    Closed,
}

struct ActiveSubscription {
    feed_id: Uuid,
    ticker: String,
    task: JoinHandle<()>,
}

/// 라이브 분석 세션. "현재 티커"는 세션마다 따로 가진다
pub struct LiveSession {
    id: SessionId,
    key: String,
    feed: Arc<dyn TickFeed>,
    stream: Arc<RwLock<IndicatorStream>>,
    config: StreamingConfig,
    generation: Arc<AtomicU64>,
    current: Option<ActiveSubscription>,
    state: SubscriptionState,
}

impl LiveSession {
    pub async fn open(
        id: SessionId,
        feed: Arc<dyn TickFeed>,
        stream: Arc<RwLock<IndicatorStream>>,
        config: StreamingConfig,
    ) -> Self {
        let key = id.to_string();
        stream.write().await.get_or_create_channel(&key);

        LiveSession {
            id,
            key,
            feed,
            stream,
            config,
            generation: Arc::new(AtomicU64::new(0)),
            current: None,
            state: SubscriptionState::Unsubscribed,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn ticker(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.ticker.as_str())
    }

    /// 티커 구독. 기존 구독은 새 구독을 열기 전에 닫는다
    pub async fn subscribe(&mut self, ticker: &str) -> Result<(), AnalyticsError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(AnalyticsError::InvalidParameter("ticker must not be empty".to_string()));
        }

        self.close_current().await;

        let subscription = self.feed.subscribe(&ticker).await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let task = tokio::spawn(consume_ticks(
            self.key.clone(),
            ticker.clone(),
            generation,
            self.generation.clone(),
            subscription.receiver,
            StreamingIndicatorEngine::from_config(&self.config),
            self.stream.clone(),
        ));

        logging::log_subscribed(&self.key, &ticker);
        self.current = Some(ActiveSubscription { feed_id: subscription.id, ticker, task });
        self.state = SubscriptionState::Active;
        Ok(())
    }

    pub async fn unsubscribe(&mut self) -> Result<(), AnalyticsError> {
        if self.current.is_none() {
            return Err(AnalyticsError::NotSubscribed(self.key.clone()));
        }
        self.close_current().await;
        Ok(())
    }

    async fn close_current(&mut self) {
        if let Some(subscription) = self.current.take() {
            // 처리 중인 틱도 이 시점 이후로는 반영되지 않는다
            self.generation.fetch_add(1, Ordering::SeqCst);
            subscription.task.abort();

            if let Err(e) = self.feed.unsubscribe(subscription.feed_id).await {
                logging::log_error("unsubscribe", &e);
            }

            self.stream.write().await.clear_latest(&self.key);
            self.state = SubscriptionState::Closed;
            logging::log_unsubscribed(&self.key, &subscription.ticker);
        }
    }

    pub async fn latest_snapshot(&self) -> Option<IndicatorSnapshot> {
        self.stream.read().await.get_latest(&self.key)
    }

    pub async fn receiver(&self) -> Result<broadcast::Receiver<IndicatorSnapshot>, AnalyticsError> {
        self.stream.read().await.get_receiver(&self.key)
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        if let Some(subscription) = self.current.take() {
            subscription.task.abort();
        }
    }
}

/// 구독 하나의 단일 소비자. 틱을 도착 순서대로 처리한다
async fn consume_ticks(
    key: String,
    ticker: String,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    mut rx: mpsc::Receiver<PriceTick>,
    mut engine: StreamingIndicatorEngine,
    stream: Arc<RwLock<IndicatorStream>>,
) {
    while let Some(tick) = rx.recv().await {
        if current_generation.load(Ordering::SeqCst) != generation {
            log::debug!("stale tick discarded: {} @ {}", ticker, tick.timestamp);
            break;
        }

        match engine.on_tick(tick) {
            Ok(snapshot) => {
                let mut guard = stream.write().await;
                if current_generation.load(Ordering::SeqCst) != generation {
                    log::debug!("stale snapshot discarded: {}", ticker);
                    break;
                }
                if let Err(e) = guard.publish(&key, snapshot) {
                    log::debug!("snapshot dropped for {}: {}", key, e);
                }
            }
            Err(e) => logging::log_tick_rejected(&ticker, &e),
        }
    }
}

/// 세션 관리자
pub struct SessionManager {
    feed: Arc<dyn TickFeed>,
    stream: Arc<RwLock<IndicatorStream>>,
    config: StreamingConfig,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<LiveSession>>>>,
}

impl SessionManager {
    pub fn new(feed: Arc<dyn TickFeed>, config: StreamingConfig) -> Self {
        let stream = Arc::new(RwLock::new(IndicatorStream::new(config.channel_buffer)));
        SessionManager {
            feed,
            stream,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_session(&self) -> SessionId {
        let id = SessionId::new();
        let session = LiveSession::open(id, self.feed.clone(), self.stream.clone(), self.config.clone()).await;
        self.sessions.write().await.insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn get(&self, id: SessionId) -> Result<Arc<Mutex<LiveSession>>, AnalyticsError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AnalyticsError::SessionNotFound(id.to_string()))
    }

    /// 세션의 티커 교체
    pub async fn switch_ticker(&self, id: SessionId, ticker: &str) -> Result<(), AnalyticsError> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        session.subscribe(ticker).await
    }

    pub async fn unsubscribe(&self, id: SessionId) -> Result<(), AnalyticsError> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        session.unsubscribe().await
    }

    pub async fn close_session(&self, id: SessionId) -> Result<(), AnalyticsError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AnalyticsError::SessionNotFound(id.to_string()))?;

        let mut session = session.lock().await;
        if session.state() == SubscriptionState::Active {
            session.unsubscribe().await?;
        }
        self.stream.write().await.remove_channel(&id.to_string());
        Ok(())
    }

    pub async fn state(&self, id: SessionId) -> Result<SubscriptionState, AnalyticsError> {
        let session = self.get(id).await?;
        let session = session.lock().await;
        Ok(session.state())
    }

    pub async fn latest_snapshot(&self, id: SessionId) -> Result<Option<IndicatorSnapshot>, AnalyticsError> {
        self.get(id).await?;
        Ok(self.stream.read().await.get_latest(&id.to_string()))
    }

    pub async fn receiver(&self, id: SessionId) -> Result<broadcast::Receiver<IndicatorSnapshot>, AnalyticsError> {
        self.get(id).await?;
        self.stream.read().await.get_receiver(&id.to_string())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::provider::{MockTickFeed, TickSubscription};
    use tokio::time::{timeout, Duration};

    fn tick(i: i64, price: f64) -> PriceTick {
        PriceTick::new(1_700_000_000_000 + i, price, 5.0)
    }

    #[tokio::test]
    async fn test_subscribe_processes_ticks_in_order() {
        let (tx, rx) = mpsc::channel(16);
        let mut feed = MockTickFeed::new();
        feed.expect_subscribe().return_once(move |t| Ok(TickSubscription::new(t, rx)));
        feed.expect_unsubscribe().returning(|_| Ok(()));

        let manager = SessionManager::new(Arc::new(feed), StreamingConfig::default());
        let id = manager.create_session().await;
        assert_eq!(manager.state(id).await.unwrap(), SubscriptionState::Unsubscribed);

        manager.switch_ticker(id, "aapl").await.unwrap();
        let mut snapshots = manager.receiver(id).await.unwrap();

        for i in 0..3 {
            tx.send(tick(i, 100.0 + i as f64)).await.unwrap();
        }

        let mut prices = Vec::new();
        for _ in 0..3 {
            let snapshot = timeout(Duration::from_secs(2), snapshots.recv()).await.unwrap().unwrap();
            prices.push(snapshot.price);
        }
        assert_eq!(prices, vec![100.0, 101.0, 102.0]);
        assert_eq!(manager.latest_snapshot(id).await.unwrap().unwrap().rsi14, Some(100.0));

        manager.unsubscribe(id).await.unwrap();
        assert_eq!(manager.state(id).await.unwrap(), SubscriptionState::Closed);
        assert!(manager.latest_snapshot(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_own_feed_subscription() {
        let (_tx, rx) = mpsc::channel(16);
        let subscription = TickSubscription::new("MSFT", rx);
        let feed_id = subscription.id;

        let mut feed = MockTickFeed::new();
        feed.expect_subscribe().return_once(move |_| Ok(subscription));
        feed.expect_unsubscribe()
            .withf(move |id| *id == feed_id)
            .times(1)
            .returning(|_| Ok(()));

        let manager = SessionManager::new(Arc::new(feed), StreamingConfig::default());
        let id = manager.create_session().await;
        manager.switch_ticker(id, "MSFT").await.unwrap();
        manager.unsubscribe(id).await.unwrap();

        assert!(matches!(manager.unsubscribe(id).await, Err(AnalyticsError::NotSubscribed(_))));
    }

    #[tokio::test]
    async fn test_missing_channel_does_not_stop_consumer() {
        let (tx, rx) = mpsc::channel(16);
        let mut feed = MockTickFeed::new();
        feed.expect_subscribe().return_once(move |t| Ok(TickSubscription::new(t, rx)));
        feed.expect_unsubscribe().returning(|_| Ok(()));

        let manager = SessionManager::new(Arc::new(feed), StreamingConfig::default());
        let id = manager.create_session().await;
        manager.switch_ticker(id, "NVDA").await.unwrap();

        let key = id.to_string();
        manager.stream.write().await.remove_channel(&key);
        tx.send(tick(1, 900.0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.latest_snapshot(id).await.unwrap().is_none());

        manager.stream.write().await.get_or_create_channel(&key);
        let mut snapshots = manager.receiver(id).await.unwrap();
        tx.send(tick(2, 901.0)).await.unwrap();

        let snapshot = timeout(Duration::from_secs(2), snapshots.recv()).await.unwrap().unwrap();
        assert_eq!(snapshot.price, 901.0);
        assert_eq!(snapshot.window_len, 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_session_unsubscribed() {
        let mut feed = MockTickFeed::new();
        feed.expect_subscribe()
            .returning(|t| Err(AnalyticsError::UpstreamUnavailable(format!("{} feed down", t))));

        let manager = SessionManager::new(Arc::new(feed), StreamingConfig::default());
        let id = manager.create_session().await;

        let err = manager.switch_ticker(id, "TSLA").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(manager.state(id).await.unwrap(), SubscriptionState::Unsubscribed);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let manager = SessionManager::new(Arc::new(MockTickFeed::new()), StreamingConfig::default());
        let err = manager.switch_ticker(SessionId::new(), "AAPL").await.unwrap_err();
        assert!(matches!(err, AnalyticsError::SessionNotFound(_)));
    }

    #[test]
    fn test_session_id_round_trip() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
