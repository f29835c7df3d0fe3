use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Schema, Set,
};
use std::convert::TryInto;
use std::env;
use std::path::PathBuf;
use tracing::info;

use super::entities::trade_trace;
use super::{RecordError, TraceRecordRepository};
use interface::TradeTrace;

/// SQLite 기반 추적 레코드 저장소
pub struct SqliteTraceRepository {
    db: DatabaseConnection,
}

impl SqliteTraceRepository {
    /// 새로운 SQLite 저장소 인스턴스 생성
    /// DB 파일 경로는 환경 변수 DB_PATH로 지정 가능 (기본값: "audit_traces.db")
    pub async fn new() -> Result<Self, RecordError> {
        let db_path = env::var("DB_PATH").unwrap_or_else(|_| "audit_traces.db".to_string());

        // 절대 경로 또는 상대 경로 처리
        let mut path = PathBuf::from(&db_path);
        if !path.is_absolute() {
            if let Ok(current_dir) = env::current_dir() {
                path = current_dir.join(&db_path);
            }
        }

        // 디렉토리가 없으면 생성
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RecordError::Other(format!("Failed to create DB directory: {}", e)))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::with_url(&db_url).await
    }

    /// 명시적 URL로 저장소 생성 (테스트용 임시 DB 등)
    pub async fn with_url(db_url: &str) -> Result<Self, RecordError> {
        info!("Connecting to SQLite database: {}", db_url);

        let db = Database::connect(db_url)
            .await
            .map_err(|e| RecordError::Database(e))?;

        let backend = db.get_database_backend();
        let schema = Schema::new(backend);

        // 테이블 생성 (IF NOT EXISTS)
        let mut create_table_stmt = schema.create_table_from_entity(trade_trace::Entity);
        create_table_stmt.if_not_exists();

        db.execute(backend.build(&create_table_stmt))
            .await
            .map_err(|e| RecordError::Database(e))?;

        use sea_orm::sea_query::Index;

        let mut trace_id_idx = Index::create()
            .name("idx_trade_traces_trace_id")
            .table(trade_trace::Entity)
            .col(trade_trace::Column::TraceId)
            .to_owned();
        trace_id_idx.if_not_exists();

        let mut strategy_idx = Index::create()
            .name("idx_trade_traces_strategy_id")
            .table(trade_trace::Entity)
            .col(trade_trace::Column::StrategyId)
            .to_owned();
        strategy_idx.if_not_exists();

        let mut symbol_idx = Index::create()
            .name("idx_trade_traces_symbol")
            .table(trade_trace::Entity)
            .col(trade_trace::Column::Symbol)
            .to_owned();
        symbol_idx.if_not_exists();

        let mut timestamp_idx = Index::create()
            .name("idx_trade_traces_timestamp")
            .table(trade_trace::Entity)
            .col(trade_trace::Column::Timestamp)
            .to_owned();
        timestamp_idx.if_not_exists();

        if let Err(e) = db.execute(backend.build(&trace_id_idx)).await {
            tracing::debug!("Index idx_trade_traces_trace_id creation skipped: {}", e);
        }
        if let Err(e) = db.execute(backend.build(&strategy_idx)).await {
            tracing::debug!("Index idx_trade_traces_strategy_id creation skipped: {}", e);
        }
        if let Err(e) = db.execute(backend.build(&symbol_idx)).await {
            tracing::debug!("Index idx_trade_traces_symbol creation skipped: {}", e);
        }
        if let Err(e) = db.execute(backend.build(&timestamp_idx)).await {
            tracing::debug!("Index idx_trade_traces_timestamp creation skipped: {}", e);
        }

        info!("Trade traces table initialized");

        Ok(Self { db })
    }
}

#[async_trait]
impl TraceRecordRepository for SqliteTraceRepository {
    async fn save(&self, record: &TradeTrace) -> Result<(), RecordError> {
        let model = trade_trace::ActiveModel {
            id: Set(record.id.clone()),
            strategy_id: Set(record.strategy_id.clone()),
            symbol: Set(record.symbol.clone()),
            side: Set(record.side.to_string()),
            quantity: Set(record.quantity),
            price: Set(record.price),
            timestamp: Set(record.timestamp.to_rfc3339()),
            order_id: Set(record.order_id.clone()),
            trade_id: Set(record.trade_id.clone()),
            parent_id: Set(record.parent_id.clone()),
            trace_id: Set(record.trace_id.clone()),
            metadata: Set(record.metadata.clone()),
        };

        trade_trace::Entity::insert(model)
            .exec(&self.db)
            .await
            .map_err(|e| RecordError::Database(e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TradeTrace>, RecordError> {
        let model = trade_trace::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| RecordError::Database(e))?;

        match model {
            Some(m) => Ok(Some(m.try_into()?)),
            None => Ok(None),
        }
    }

    async fn find_by_trace_id(&self, trace_id: &str) -> Result<Vec<TradeTrace>, RecordError> {
        let models = trade_trace::Entity::find()
            .filter(trade_trace::Column::TraceId.eq(trace_id))
            .order_by_asc(trade_trace::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(|e| RecordError::Database(e))?;

        models.into_iter().map(|m| m.try_into()).collect()
    }

    async fn find_by_strategy(
        &self,
        strategy_id: &str,
        limit: Option<u64>,
    ) -> Result<Vec<TradeTrace>, RecordError> {
        let mut query = trade_trace::Entity::find()
            .filter(trade_trace::Column::StrategyId.eq(strategy_id))
            .order_by_desc(trade_trace::Column::Timestamp);

        if let Some(limit_val) = limit {
            query = query.limit(limit_val);
        }

        let models = query
            .all(&self.db)
            .await
            .map_err(|e| RecordError::Database(e))?;

        models.into_iter().map(|m| m.try_into()).collect()
    }

    async fn find_by_symbol(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TradeTrace>, RecordError> {
        let start_str = start.to_rfc3339();
        let end_str = end.to_rfc3339();

        let models = trade_trace::Entity::find()
            .filter(trade_trace::Column::Symbol.eq(symbol))
            .filter(trade_trace::Column::Timestamp.gte(start_str))
            .filter(trade_trace::Column::Timestamp.lte(end_str))
            .order_by_desc(trade_trace::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(|e| RecordError::Database(e))?;

        models.into_iter().map(|m| m.try_into()).collect()
    }

    async fn find_all(&self, limit: Option<u64>) -> Result<Vec<TradeTrace>, RecordError> {
        let mut query =
            trade_trace::Entity::find().order_by_desc(trade_trace::Column::Timestamp);

        if let Some(limit_val) = limit {
            query = query.limit(limit_val);
        }

        let models = query
            .all(&self.db)
            .await
            .map_err(|e| RecordError::Database(e))?;

        models.into_iter().map(|m| m.try_into()).collect()
    }
}
