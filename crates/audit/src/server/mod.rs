use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use interface::{ExportFormat, TraceError, TraceFilter, TraceStatistics, TradeTrace};

use crate::trace::{AuditError, NewTrace, TraceService};

/// 에러 응답 본문
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// 서비스 에러를 HTTP 응답으로 변환
/// 무결성 위반(MultipleRoots/CycleDetected)은 감사 도구의 하드 에러다
fn error_response(err: AuditError) -> Response {
    let (status, code) = match &err {
        AuditError::Trace(TraceError::InvalidCriteria(_))
        | AuditError::Trace(TraceError::InvalidRecord(_)) => {
            (StatusCode::BAD_REQUEST, "validation_error")
        }
        AuditError::Trace(TraceError::TraceNotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
        AuditError::Trace(TraceError::MultipleRoots(_))
        | AuditError::Trace(TraceError::CycleDetected(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "data_integrity_error")
        }
        AuditError::Store(_) | AuditError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    };

    (
        status,
        Json(ErrorBody {
            error: code,
            message: err.to_string(),
        }),
    )
        .into_response()
}

fn validation_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: "validation_error",
            message: message.into(),
        }),
    )
        .into_response()
}

/// 감사 추적 API 라우터 구성
/// 대시보드 프론트엔드가 브라우저에서 호출하므로 CORS를 허용한다
pub fn router(service: Arc<TraceService>) -> Router {
    Router::new()
        .route("/api/audit/traces", post(create_trace))
        .route("/api/audit/traces/search", post(search_traces))
        .route("/api/audit/traces/export", post(export_traces))
        .route("/api/audit/traces/:id", get(get_trace))
        .route("/api/audit/traces/:id/chain", get(get_trace_chain))
        .route(
            "/api/audit/traces/strategy/:strategy_id",
            get(get_traces_by_strategy),
        )
        .route(
            "/api/audit/traces/strategy/:strategy_id/statistics",
            get(get_trace_statistics),
        )
        .route("/api/audit/traces/symbol/:symbol", get(get_traces_by_symbol))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// API 서버 시작
pub async fn start_server(port: u16, service: Arc<TraceService>) -> eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("audit API listening on {}", addr);

    axum::serve(listener, router(service)).await?;

    Ok(())
}

async fn create_trace(
    State(service): State<Arc<TraceService>>,
    Json(req): Json<NewTrace>,
) -> Response {
    match service.create(req).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_trace(
    State(service): State<Arc<TraceService>>,
    Path(trace_id): Path<String>,
) -> Response {
    match service.get_trace(&trace_id).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_trace_chain(
    State(service): State<Arc<TraceService>>,
    Path(trace_id): Path<String>,
) -> Response {
    match service.chain(&trace_id).await {
        Ok(chain) => Json(chain).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct StrategyListParams {
    limit: Option<u64>,
}

#[derive(Debug, Serialize)]
struct StrategyListResponse {
    strategy_id: String,
    traces: Vec<TradeTrace>,
    count: usize,
}

async fn get_traces_by_strategy(
    State(service): State<Arc<TraceService>>,
    Path(strategy_id): Path<String>,
    Query(params): Query<StrategyListParams>,
) -> Response {
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(100);

    match service.traces_by_strategy(&strategy_id, Some(limit)).await {
        Ok(traces) => Json(StrategyListResponse {
            strategy_id,
            count: traces.len(),
            traces,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct TimeRangeParams {
    start_time: Option<String>,
    end_time: Option<String>,
}

/// RFC3339 시간 파라미터 파싱, 생략 시 최근 default_days일 범위
fn parse_time_range(
    params: &TimeRangeParams,
    default_days: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>), Response> {
    let start = match params.start_time.as_deref() {
        Some(raw) if !raw.is_empty() => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| validation_error("Invalid start_time format"))?,
        _ => Utc::now() - Duration::days(default_days),
    };

    let end = match params.end_time.as_deref() {
        Some(raw) if !raw.is_empty() => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| validation_error("Invalid end_time format"))?,
        _ => Utc::now(),
    };

    Ok((start, end))
}

#[derive(Debug, Serialize)]
struct SymbolListResponse {
    symbol: String,
    traces: Vec<TradeTrace>,
    count: usize,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

async fn get_traces_by_symbol(
    State(service): State<Arc<TraceService>>,
    Path(symbol): Path<String>,
    Query(params): Query<TimeRangeParams>,
) -> Response {
    let (start, end) = match parse_time_range(&params, 7) {
        Ok(range) => range,
        Err(resp) => return resp,
    };

    match service.traces_by_symbol(&symbol, start, end).await {
        Ok(traces) => Json(SymbolListResponse {
            symbol,
            count: traces.len(),
            traces,
            start_time: start,
            end_time: end,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Serialize)]
struct StatisticsResponse {
    strategy_id: String,
    statistics: TraceStatistics,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

async fn get_trace_statistics(
    State(service): State<Arc<TraceService>>,
    Path(strategy_id): Path<String>,
    Query(params): Query<TimeRangeParams>,
) -> Response {
    let (start, end) = match parse_time_range(&params, 30) {
        Ok(range) => range,
        Err(resp) => return resp,
    };

    match service.statistics(&strategy_id, Some(start), Some(end)).await {
        Ok(statistics) => Json(StatisticsResponse {
            strategy_id,
            statistics,
            start_time: start,
            end_time: end,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, Serialize)]
struct Pagination {
    page: u64,
    limit: u64,
    total: usize,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    traces: Vec<TradeTrace>,
    pagination: Pagination,
}

async fn search_traces(
    State(service): State<Arc<TraceService>>,
    Query(params): Query<PageParams>,
    Json(criteria): Json<TraceFilter>,
) -> Response {
    let page = params.page.filter(|p| *p > 0).unwrap_or(1);
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(20);

    match service.search(&criteria).await {
        Ok(all) => {
            let total = all.len();
            let offset = ((page - 1) * limit) as usize;
            let traces: Vec<TradeTrace> = all
                .into_iter()
                .skip(offset)
                .take(limit as usize)
                .collect();

            Json(SearchResponse {
                traces,
                pagination: Pagination { page, limit, total },
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ExportParams {
    format: Option<String>,
}

async fn export_traces(
    State(service): State<Arc<TraceService>>,
    Query(params): Query<ExportParams>,
    Json(criteria): Json<TraceFilter>,
) -> Response {
    let format = match params.format.as_deref().unwrap_or("json").parse::<ExportFormat>() {
        Ok(format) => format,
        Err(_) => return validation_error("Unsupported format"),
    };

    match service.export(&criteria, format).await {
        Ok(data) => {
            let (content_type, filename) = match format {
                ExportFormat::Json => ("application/json", "traces.json"),
                ExportFormat::Csv => ("text/csv", "traces.csv"),
            };

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename={}", filename),
                    ),
                ],
                data,
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}
