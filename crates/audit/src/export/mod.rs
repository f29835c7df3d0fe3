use interface::TradeTrace;

/// 검색 결과를 JSON 바이트로 직렬화 (레코드 목록 그대로)
pub fn to_json(records: &[TradeTrace]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(records)
}

/// 검색 결과를 CSV 바이트로 직렬화
/// 컬럼은 레코드 필드 선언 순서이고 metadata는 JSON 문자열 컬럼으로 평탄화된다
pub fn to_csv(records: &[TradeTrace]) -> Vec<u8> {
    let mut out = String::from(
        "id,strategy_id,symbol,side,quantity,price,timestamp,order_id,trade_id,parent_id,trace_id,metadata\n",
    );

    for record in records {
        let row = [
            csv_field(&record.id),
            csv_field(&record.strategy_id),
            csv_field(&record.symbol),
            record.side.to_string(),
            record.quantity.to_string(),
            format!("{:.2}", record.price),
            record.timestamp.to_rfc3339(),
            csv_field(&record.order_id),
            csv_field(&record.trade_id),
            csv_field(record.parent_id.as_deref().unwrap_or("")),
            csv_field(&record.trace_id),
            csv_field(record.metadata.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out.into_bytes()
}

/// 쉼표/따옴표/개행이 들어간 필드는 따옴표로 감싸고 내부 따옴표는 이중으로 만든다
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
