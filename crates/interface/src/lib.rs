use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// 거래 방향 (매수/매도)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            _ => Err(format!("Invalid TradeSide: {}", s)),
        }
    }
}

/// 체결된 거래 한 건에 대한 감사 추적 레코드
/// 한 번 기록되면 변경되지 않는다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeTrace {
    /// 레코드 고유 식별자 (UUID 문자열)
    pub id: String,
    /// 소유 전략 식별자
    pub strategy_id: String,
    /// 종목 심볼 (예: "BTCUSDT", "AAPL")
    pub symbol: String,
    /// 거래 방향
    pub side: TradeSide,
    /// 거래 수량 (양수)
    pub quantity: i64,
    /// 체결 가격 (양수)
    pub price: f64,
    /// 체결 UTC 시간
    pub timestamp: DateTime<Utc>,
    /// 원본 주문 식별자 (여러 레코드가 하나의 주문을 공유할 수 있음)
    pub order_id: String,
    /// 브로커 체결 식별자
    pub trade_id: String,
    /// 인과적으로 선행한 레코드의 id (루트 이벤트는 None)
    pub parent_id: Option<String>,
    /// 같은 인과 사슬의 모든 레코드가 공유하는 식별자
    pub trace_id: String,
    /// 추가 메타데이터 (JSON 문자열, 코어에서는 해석하지 않음)
    pub metadata: Option<String>,
}

/// 하나의 추적 사슬을 루트부터 순서대로 재구성한 읽기 전용 뷰
/// 요청 시점에 계산되며 저장되지 않는다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceChain {
    pub trace_id: String,
    /// 루트 → 최신 자손 순서의 레코드
    pub chain: Vec<TradeTrace>,
    pub length: usize,
}

/// 레코드 집합에 대한 집계 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceStatistics {
    pub total_trades: u64,
    pub total_volume: i64,
    /// Σ quantity × price
    pub total_value: f64,
    pub buy_count: u64,
    pub sell_count: u64,
    /// 거래별 단순 평균 가격 (거래량 가중 아님)
    pub avg_price: f64,
    pub max_price: f64,
    pub min_price: f64,
}

/// 추적 레코드 검색 조건
/// 생략된 필드는 제약을 두지 않는다 (빈 문자열도 생략으로 취급)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub strategy_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub side: Option<TradeSide>,
    /// 포함 범위 시작 (RFC3339)
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// 포함 범위 끝 (RFC3339)
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// 빈 문자열/누락 필드를 None으로 역직렬화
/// 대시보드는 설정되지 않은 필터 필드를 빈 문자열로 보낸다
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// 내보내기 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!("Invalid ExportFormat: {}", s)),
        }
    }
}

/// 추적 엔진 에러 타입
#[derive(Error, Debug)]
pub enum TraceError {
    /// 잘못된 검색 조건 (예: 역전된 시간 범위)
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    /// 해당 trace_id의 레코드가 존재하지 않음
    #[error("trace not found: {0}")]
    TraceNotFound(String),

    /// 한 추적 그룹에 루트 레코드가 둘 이상 존재 (데이터 무결성 위반)
    #[error("multiple root records in trace: {0}")]
    MultipleRoots(String),

    /// 부모 포인터 순환 감지 (데이터 무결성 위반)
    #[error("cycle detected in trace: {0}")]
    CycleDetected(String),

    /// 레코드 불변식 위반 (수량/가격/부모 참조)
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_side_round_trip() {
        assert_eq!("buy".parse::<TradeSide>().unwrap(), TradeSide::Buy);
        assert_eq!("sell".parse::<TradeSide>().unwrap(), TradeSide::Sell);
        assert_eq!(TradeSide::Buy.to_string(), "buy");
        assert!("BUY".parse::<TradeSide>().is_err());
    }

    #[test]
    fn filter_deserializes_empty_strings_as_unset() {
        let raw = r#"{"strategy_id":"","symbol":"","side":"","start_time":"","end_time":""}"#;
        let filter: TraceFilter = serde_json::from_str(raw).unwrap();
        assert!(filter.strategy_id.is_none());
        assert!(filter.symbol.is_none());
        assert!(filter.side.is_none());
        assert!(filter.start_time.is_none());
        assert!(filter.end_time.is_none());
    }

    #[test]
    fn filter_deserializes_supplied_fields() {
        let raw = r#"{"strategy_id":"momentum-1","side":"sell","start_time":"2024-03-01T00:00:00Z"}"#;
        let filter: TraceFilter = serde_json::from_str(raw).unwrap();
        assert_eq!(filter.strategy_id.as_deref(), Some("momentum-1"));
        assert_eq!(filter.side, Some(TradeSide::Sell));
        assert!(filter.start_time.is_some());
        assert!(filter.end_time.is_none());
    }
}
