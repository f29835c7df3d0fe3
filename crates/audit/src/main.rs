use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::eyre;
use structopt::StructOpt;
use tracing::info;

use audit::record::SqliteTraceRepository;
use audit::trace::TraceService;
use interface::{ExportFormat, TraceFilter, TradeSide};

#[derive(Debug, StructOpt)]
#[structopt(name = "audit", about = "트레이드 감사 추적 API 서버")]
enum Command {
    /// 감사 추적 API 서버 실행
    Serve,
    /// 필터 조건에 맞는 추적 레코드를 stdout으로 내보내기
    Export {
        /// 출력 형식 (json 또는 csv)
        #[structopt(long, default_value = "json")]
        format: String,
        /// 전략 id로 필터
        #[structopt(long)]
        strategy_id: Option<String>,
        /// 심볼로 필터
        #[structopt(long)]
        symbol: Option<String>,
        /// 거래 방향으로 필터 (buy 또는 sell)
        #[structopt(long)]
        side: Option<String>,
        /// 포함 범위 시작 (RFC3339)
        #[structopt(long)]
        start_time: Option<String>,
        /// 포함 범위 끝 (RFC3339)
        #[structopt(long)]
        end_time: Option<String>,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // init error reporting
    color_eyre::install()?;

    // init logging
    let _guards = audit::logger::init_tracing();

    // init trace record repository
    let repo = SqliteTraceRepository::new()
        .await
        .map_err(|e| eyre::eyre!("감사 기록 저장소 초기화 실패: {}", e))?;
    let service = Arc::new(TraceService::new(Arc::new(repo)));

    match Command::from_args() {
        Command::Serve => {
            let port = std::env::var("AUDIT_API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(12095);

            info!("감사 추적 API 서버를 포트 {}에서 시작합니다", port);
            audit::server::start_server(port, service).await
        }
        Command::Export {
            format,
            strategy_id,
            symbol,
            side,
            start_time,
            end_time,
        } => {
            run_export(
                service,
                format,
                strategy_id,
                symbol,
                side,
                start_time,
                end_time,
            )
            .await
        }
    }
}

/// 필터 조건으로 레코드를 내보내서 stdout에 기록
async fn run_export(
    service: Arc<TraceService>,
    format: String,
    strategy_id: Option<String>,
    symbol: Option<String>,
    side: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
) -> eyre::Result<()> {
    let format: ExportFormat = format
        .parse()
        .map_err(|e: String| eyre::eyre!("잘못된 형식: {}", e))?;

    let side = side
        .map(|s| s.parse::<TradeSide>())
        .transpose()
        .map_err(|e| eyre::eyre!("잘못된 거래 방향: {}", e))?;

    let start_time = parse_rfc3339(start_time.as_deref())
        .map_err(|e| eyre::eyre!("잘못된 start_time: {}", e))?;
    let end_time = parse_rfc3339(end_time.as_deref())
        .map_err(|e| eyre::eyre!("잘못된 end_time: {}", e))?;

    let criteria = TraceFilter {
        strategy_id,
        symbol,
        side,
        start_time,
        end_time,
    };

    let data = service
        .export(&criteria, format)
        .await
        .map_err(|e| eyre::eyre!("내보내기 실패: {}", e))?;

    use std::io::Write;
    std::io::stdout().write_all(&data)?;

    Ok(())
}

fn parse_rfc3339(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    raw.map(|s| DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc)))
        .transpose()
}
