use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use interface::{
    ExportFormat, TraceChain, TraceError, TraceFilter, TraceStatistics, TradeSide, TradeTrace,
};

use super::{chain, filter, stats};
use crate::export;
use crate::record::{RecordError, TraceRecordRepository};

/// 내보내기 시 포함하는 최대 레코드 수
const EXPORT_ROW_LIMIT: usize = 10_000;

/// 감사 추적 서비스 에러
/// 저장소 에러는 재시도 없이 그대로 전파한다
#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("store error: {0}")]
    Store(#[from] RecordError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 새 추적 레코드 생성 요청
#[derive(Debug, Clone, Deserialize)]
pub struct NewTrace {
    pub strategy_id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: i64,
    pub price: f64,
    pub order_id: String,
    pub trade_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// 해석하지 않는 부가 정보
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// 추적 검색/사슬 재구성/통계 집계 서비스
///
/// 모든 읽기 연산은 호출 시작 시 저장소 스냅샷을 한 번 가져온 뒤
/// 순수 계산만 수행한다. 내부에 공유 가변 상태가 없으므로
/// 여러 호출자가 동시에 사용해도 안전하다.
pub struct TraceService {
    repo: Arc<dyn TraceRecordRepository>,
}

impl TraceService {
    pub fn new(repo: Arc<dyn TraceRecordRepository>) -> Self {
        Self { repo }
    }

    /// 추적 레코드 생성
    /// parent_id가 있으면 부모의 trace_id를 이어받아 사슬 불변식을 유지한다
    pub async fn create(&self, req: NewTrace) -> Result<TradeTrace, AuditError> {
        if req.quantity <= 0 {
            return Err(TraceError::InvalidRecord(format!(
                "quantity must be positive, got {}",
                req.quantity
            ))
            .into());
        }
        if req.price <= 0.0 {
            return Err(TraceError::InvalidRecord(format!(
                "price must be positive, got {}",
                req.price
            ))
            .into());
        }

        let trace_id = match &req.parent_id {
            Some(parent_id) => {
                let parent = self.repo.find_by_id(parent_id).await?.ok_or_else(|| {
                    TraceError::InvalidRecord(format!(
                        "parent record {} does not exist",
                        parent_id
                    ))
                })?;
                parent.trace_id
            }
            None => Uuid::new_v4().to_string(),
        };

        let record = TradeTrace {
            id: Uuid::new_v4().to_string(),
            strategy_id: req.strategy_id,
            symbol: req.symbol,
            side: req.side,
            quantity: req.quantity,
            price: req.price,
            timestamp: Utc::now(),
            order_id: req.order_id,
            trade_id: req.trade_id,
            parent_id: req.parent_id,
            trace_id,
            metadata: req
                .metadata
                .as_ref()
                .and_then(|m| serde_json::to_string(m).ok()),
        };

        self.repo.save(&record).await?;
        info!("trace record {} created (trace {})", record.id, record.trace_id);

        Ok(record)
    }

    /// trace_id의 가장 이른 레코드 단건 조회
    pub async fn get_trace(&self, trace_id: &str) -> Result<TradeTrace, AuditError> {
        let records = self.repo.find_by_trace_id(trace_id).await?;
        match records.into_iter().next() {
            Some(record) => Ok(record),
            None => Err(TraceError::TraceNotFound(trace_id.to_string()).into()),
        }
    }

    /// 조건 검색
    /// 전체 스냅샷에 필터를 적용해 (timestamp, id) 오름차순 목록을 반환한다
    pub async fn search(&self, criteria: &TraceFilter) -> Result<Vec<TradeTrace>, AuditError> {
        filter::validate(criteria)?;
        let snapshot = self.repo.find_all(None).await?;
        Ok(filter::filter_traces(&snapshot, criteria)?)
    }

    /// 추적 사슬 재구성
    pub async fn chain(&self, trace_id: &str) -> Result<TraceChain, AuditError> {
        let records = self.repo.find_by_trace_id(trace_id).await?;
        Ok(chain::reconstruct_chain(trace_id, &records)?)
    }

    /// 전략별 통계 집계 (시간 범위는 양 끝 포함)
    pub async fn statistics(
        &self,
        strategy_id: &str,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<TraceStatistics, AuditError> {
        let criteria = TraceFilter {
            strategy_id: Some(strategy_id.to_string()),
            start_time,
            end_time,
            ..TraceFilter::default()
        };
        filter::validate(&criteria)?;

        let snapshot = self.repo.find_by_strategy(strategy_id, None).await?;
        let matched = filter::filter_traces(&snapshot, &criteria)?;

        Ok(stats::aggregate(&matched))
    }

    /// 전략별 최근 레코드 목록 (시간 내림차순)
    pub async fn traces_by_strategy(
        &self,
        strategy_id: &str,
        limit: Option<u64>,
    ) -> Result<Vec<TradeTrace>, AuditError> {
        Ok(self.repo.find_by_strategy(strategy_id, limit).await?)
    }

    /// 심볼별 시간 범위 레코드 목록 (시간 내림차순)
    pub async fn traces_by_symbol(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TradeTrace>, AuditError> {
        let criteria = TraceFilter {
            start_time: Some(start),
            end_time: Some(end),
            ..TraceFilter::default()
        };
        filter::validate(&criteria)?;

        Ok(self.repo.find_by_symbol(symbol, start, end).await?)
    }

    /// 검색 결과 내보내기 (json/csv)
    pub async fn export(
        &self,
        criteria: &TraceFilter,
        format: ExportFormat,
    ) -> Result<Vec<u8>, AuditError> {
        let mut records = self.search(criteria).await?;
        if records.len() > EXPORT_ROW_LIMIT {
            warn!(
                "export truncated to {} of {} records",
                EXPORT_ROW_LIMIT,
                records.len()
            );
            records.truncate(EXPORT_ROW_LIMIT);
        }

        match format {
            ExportFormat::Json => Ok(export::to_json(&records)?),
            ExportFormat::Csv => Ok(export::to_csv(&records)),
        }
    }
}
