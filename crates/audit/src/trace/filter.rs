use interface::{TraceError, TraceFilter, TradeTrace};

/// 검색 조건 정합성 검증
/// start_time > end_time이면 저장소 상태와 무관하게 실패한다
pub fn validate(criteria: &TraceFilter) -> Result<(), TraceError> {
    if let (Some(start), Some(end)) = (criteria.start_time, criteria.end_time) {
        if start > end {
            return Err(TraceError::InvalidCriteria(format!(
                "start_time {} is after end_time {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
    }
    Ok(())
}

/// 제공된 조건의 논리곱으로 레코드를 필터링한다
/// 결과는 (timestamp, id) 오름차순으로 정렬되어 항상 같은 순서를 보장한다
/// 빈 결과는 에러가 아니다
pub fn filter_traces(
    records: &[TradeTrace],
    criteria: &TraceFilter,
) -> Result<Vec<TradeTrace>, TraceError> {
    validate(criteria)?;

    let mut matched: Vec<TradeTrace> = records
        .iter()
        .filter(|r| matches(r, criteria))
        .cloned()
        .collect();

    matched.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(matched)
}

fn matches(record: &TradeTrace, criteria: &TraceFilter) -> bool {
    if let Some(strategy_id) = &criteria.strategy_id {
        if &record.strategy_id != strategy_id {
            return false;
        }
    }
    if let Some(symbol) = &criteria.symbol {
        if &record.symbol != symbol {
            return false;
        }
    }
    if let Some(side) = criteria.side {
        if record.side != side {
            return false;
        }
    }
    // 시간 범위는 양 끝을 포함한다
    if let Some(start) = criteria.start_time {
        if record.timestamp < start {
            return false;
        }
    }
    if let Some(end) = criteria.end_time {
        if record.timestamp > end {
            return false;
        }
    }
    true
}
