use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::convert::TryFrom;
use std::str::FromStr;

use interface::{TradeSide, TradeTrace};

/// 추적 레코드 저장소 인터페이스
/// 확장성을 위해 트레이트로 정의하여 나중에 다른 DB로 전환 가능
#[async_trait]
pub trait TraceRecordRepository: Send + Sync {
    /// 추적 레코드 저장
    async fn save(&self, record: &TradeTrace) -> Result<(), RecordError>;

    /// 레코드 id로 단건 조회
    async fn find_by_id(&self, id: &str) -> Result<Option<TradeTrace>, RecordError>;

    /// trace_id를 공유하는 모든 레코드 조회 (시간 오름차순)
    async fn find_by_trace_id(&self, trace_id: &str) -> Result<Vec<TradeTrace>, RecordError>;

    /// 전략 id로 레코드 조회 (시간 내림차순)
    async fn find_by_strategy(
        &self,
        strategy_id: &str,
        limit: Option<u64>,
    ) -> Result<Vec<TradeTrace>, RecordError>;

    /// 심볼 + 시간 범위로 레코드 조회 (시간 내림차순)
    async fn find_by_symbol(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TradeTrace>, RecordError>;

    /// 모든 레코드 조회 (시간 내림차순)
    async fn find_all(&self, limit: Option<u64>) -> Result<Vec<TradeTrace>, RecordError>;
}

/// SeaORM trade_trace::Model을 TradeTrace로 변환
impl TryFrom<super::entities::trade_trace::Model> for TradeTrace {
    type Error = RecordError;

    fn try_from(model: super::entities::trade_trace::Model) -> Result<Self, Self::Error> {
        let timestamp = DateTime::parse_from_rfc3339(&model.timestamp)
            .map_err(|e| RecordError::Other(format!("Failed to parse timestamp: {}", e)))?
            .with_timezone(&Utc);

        let side = TradeSide::from_str(&model.side).map_err(RecordError::Other)?;

        Ok(TradeTrace {
            id: model.id,
            strategy_id: model.strategy_id,
            symbol: model.symbol,
            side,
            quantity: model.quantity,
            price: model.price,
            timestamp,
            order_id: model.order_id,
            trade_id: model.trade_id,
            parent_id: model.parent_id,
            trace_id: model.trace_id,
            metadata: model.metadata,
        })
    }
}

/// 기록 저장소 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Other error: {0}")]
    Other(String),
}
