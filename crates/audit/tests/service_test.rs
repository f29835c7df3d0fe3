use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use audit::record::{SqliteTraceRepository, TraceRecordRepository};
use audit::trace::{AuditError, NewTrace, TraceService};
use interface::{ExportFormat, TraceError, TraceFilter, TradeSide, TradeTrace};

/// 임시 파일 DB로 저장소와 서비스를 구성
async fn setup() -> (TempDir, Arc<SqliteTraceRepository>, TraceService) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("audit_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let repo = Arc::new(SqliteTraceRepository::with_url(&db_url).await.unwrap());
    let service = TraceService::new(repo.clone());

    (dir, repo, service)
}

fn record(
    id: &str,
    trace_id: &str,
    parent_id: Option<&str>,
    ts_secs: i64,
    strategy_id: &str,
    symbol: &str,
    side: TradeSide,
    quantity: i64,
    price: f64,
) -> TradeTrace {
    TradeTrace {
        id: id.to_string(),
        strategy_id: strategy_id.to_string(),
        symbol: symbol.to_string(),
        side,
        quantity,
        price,
        timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
        order_id: format!("order-{}", id),
        trade_id: format!("fill-{}", id),
        parent_id: parent_id.map(|p| p.to_string()),
        trace_id: trace_id.to_string(),
        metadata: None,
    }
}

#[tokio::test]
async fn search_filters_and_orders_records() {
    let (_dir, repo, service) = setup().await;

    repo.save(&record("c", "t3", None, 300, "alpha", "BTCUSDT", TradeSide::Buy, 1, 10.0))
        .await
        .unwrap();
    repo.save(&record("a", "t1", None, 100, "alpha", "BTCUSDT", TradeSide::Buy, 1, 10.0))
        .await
        .unwrap();
    repo.save(&record("b", "t2", None, 200, "beta", "ETHUSDT", TradeSide::Sell, 1, 10.0))
        .await
        .unwrap();

    let criteria = TraceFilter {
        strategy_id: Some("alpha".to_string()),
        ..TraceFilter::default()
    };
    let result = service.search(&criteria).await.unwrap();

    let ids: Vec<&str> = result.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(result.iter().all(|r| r.strategy_id == "alpha"));
}

#[tokio::test]
async fn search_with_inverted_range_fails_on_empty_store() {
    let (_dir, _repo, service) = setup().await;

    let criteria = TraceFilter {
        start_time: Some(Utc.timestamp_opt(200, 0).unwrap()),
        end_time: Some(Utc.timestamp_opt(100, 0).unwrap()),
        ..TraceFilter::default()
    };

    let result = service.search(&criteria).await;

    assert!(matches!(
        result,
        Err(AuditError::Trace(TraceError::InvalidCriteria(_)))
    ));
}

#[tokio::test]
async fn chain_is_rebuilt_from_unordered_storage() {
    let (_dir, repo, service) = setup().await;

    repo.save(&record("b", "t1", Some("a"), 200, "alpha", "BTCUSDT", TradeSide::Sell, 2, 11.0))
        .await
        .unwrap();
    repo.save(&record("c", "t1", Some("b"), 300, "alpha", "BTCUSDT", TradeSide::Buy, 3, 12.0))
        .await
        .unwrap();
    repo.save(&record("a", "t1", None, 100, "alpha", "BTCUSDT", TradeSide::Buy, 1, 10.0))
        .await
        .unwrap();

    let chain = service.chain("t1").await.unwrap();

    assert_eq!(chain.trace_id, "t1");
    assert_eq!(chain.length, 3);
    let ids: Vec<&str> = chain.chain.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn chain_for_unknown_trace_is_not_found() {
    let (_dir, _repo, service) = setup().await;

    let result = service.chain("missing").await;

    assert!(matches!(
        result,
        Err(AuditError::Trace(TraceError::TraceNotFound(_)))
    ));
}

#[tokio::test]
async fn chain_with_two_roots_is_integrity_error() {
    let (_dir, repo, service) = setup().await;

    repo.save(&record("a", "t1", None, 100, "alpha", "BTCUSDT", TradeSide::Buy, 1, 10.0))
        .await
        .unwrap();
    repo.save(&record("b", "t1", None, 200, "alpha", "BTCUSDT", TradeSide::Buy, 1, 10.0))
        .await
        .unwrap();

    let result = service.chain("t1").await;

    assert!(matches!(
        result,
        Err(AuditError::Trace(TraceError::MultipleRoots(_)))
    ));
}

#[tokio::test]
async fn statistics_aggregates_by_strategy() {
    let (_dir, repo, service) = setup().await;

    repo.save(&record("a", "t1", None, 100, "alpha", "BTCUSDT", TradeSide::Buy, 10, 100.0))
        .await
        .unwrap();
    repo.save(&record("b", "t2", None, 200, "alpha", "BTCUSDT", TradeSide::Sell, 5, 200.0))
        .await
        .unwrap();
    // 다른 전략의 레코드는 집계에 포함되지 않는다
    repo.save(&record("x", "t3", None, 150, "beta", "BTCUSDT", TradeSide::Buy, 99, 999.0))
        .await
        .unwrap();

    let stats = service.statistics("alpha", None, None).await.unwrap();

    assert_eq!(stats.total_trades, 2);
    assert_eq!(stats.total_volume, 15);
    assert_eq!(stats.total_value, 2000.0);
    assert_eq!(stats.buy_count, 1);
    assert_eq!(stats.sell_count, 1);
    assert_eq!(stats.avg_price, 150.0);
    assert_eq!(stats.max_price, 200.0);
    assert_eq!(stats.min_price, 100.0);
}

#[tokio::test]
async fn statistics_for_empty_strategy_is_all_zero() {
    let (_dir, _repo, service) = setup().await;

    let stats = service.statistics("nobody", None, None).await.unwrap();

    assert_eq!(stats.total_trades, 0);
    assert_eq!(stats.total_volume, 0);
    assert_eq!(stats.total_value, 0.0);
    assert_eq!(stats.avg_price, 0.0);
}

#[tokio::test]
async fn create_child_inherits_parent_trace_id() {
    let (_dir, _repo, service) = setup().await;

    let root = service
        .create(NewTrace {
            strategy_id: "alpha".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: TradeSide::Buy,
            quantity: 10,
            price: 100.0,
            order_id: "o-1".to_string(),
            trade_id: "f-1".to_string(),
            parent_id: None,
            metadata: None,
        })
        .await
        .unwrap();

    assert!(root.parent_id.is_none());

    let child = service
        .create(NewTrace {
            strategy_id: "alpha".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: TradeSide::Sell,
            quantity: 4,
            price: 101.0,
            order_id: "o-2".to_string(),
            trade_id: "f-2".to_string(),
            parent_id: Some(root.id.clone()),
            metadata: None,
        })
        .await
        .unwrap();

    assert_eq!(child.trace_id, root.trace_id);

    let chain = service.chain(&root.trace_id).await.unwrap();
    assert_eq!(chain.length, 2);
    assert_eq!(chain.chain[0].id, root.id);
    assert_eq!(chain.chain[1].id, child.id);
}

#[tokio::test]
async fn create_rejects_invalid_records() {
    let (_dir, _repo, service) = setup().await;

    let zero_quantity = service
        .create(NewTrace {
            strategy_id: "alpha".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: TradeSide::Buy,
            quantity: 0,
            price: 100.0,
            order_id: "o-1".to_string(),
            trade_id: "f-1".to_string(),
            parent_id: None,
            metadata: None,
        })
        .await;
    assert!(matches!(
        zero_quantity,
        Err(AuditError::Trace(TraceError::InvalidRecord(_)))
    ));

    let missing_parent = service
        .create(NewTrace {
            strategy_id: "alpha".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: TradeSide::Buy,
            quantity: 1,
            price: 100.0,
            order_id: "o-1".to_string(),
            trade_id: "f-1".to_string(),
            parent_id: Some("no-such-record".to_string()),
            metadata: None,
        })
        .await;
    assert!(matches!(
        missing_parent,
        Err(AuditError::Trace(TraceError::InvalidRecord(_)))
    ));
}

#[tokio::test]
async fn get_trace_returns_earliest_record() {
    let (_dir, repo, service) = setup().await;

    repo.save(&record("b", "t1", Some("a"), 200, "alpha", "BTCUSDT", TradeSide::Sell, 1, 10.0))
        .await
        .unwrap();
    repo.save(&record("a", "t1", None, 100, "alpha", "BTCUSDT", TradeSide::Buy, 1, 10.0))
        .await
        .unwrap();

    let found = service.get_trace("t1").await.unwrap();

    assert_eq!(found.id, "a");
}

#[tokio::test]
async fn export_produces_csv_and_json() {
    let (_dir, repo, service) = setup().await;

    let mut with_metadata = record(
        "a", "t1", None, 100, "alpha", "BTCUSDT", TradeSide::Buy, 10, 100.0,
    );
    with_metadata.metadata = Some(r#"{"reason":"rebalance"}"#.to_string());
    repo.save(&with_metadata).await.unwrap();

    let criteria = TraceFilter::default();

    let csv = service.export(&criteria, ExportFormat::Csv).await.unwrap();
    let csv_text = String::from_utf8(csv).unwrap();
    let lines: Vec<&str> = csv_text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("id,strategy_id,symbol,side,"));
    assert!(lines[1].contains("alpha"));
    assert!(lines[1].contains(r#""{""reason"":""rebalance""}""#));

    let json = service.export(&criteria, ExportFormat::Json).await.unwrap();
    let parsed: Vec<TradeTrace> = serde_json::from_slice(&json).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].id, "a");
    assert_eq!(
        parsed[0].metadata.as_deref(),
        Some(r#"{"reason":"rebalance"}"#)
    );
}
