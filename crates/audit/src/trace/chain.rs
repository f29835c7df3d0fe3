use std::collections::{HashMap, HashSet};

use interface::{TraceChain, TraceError, TradeTrace};

/// trace_id를 공유하는 레코드 집합에서 루트부터 이어지는 선형 사슬을 재구성한다
///
/// 한 노드에 자식이 여럿이면 timestamp가 가장 이른 자식을 따라간다
/// (동률이면 id 오름차순). 주 사슬에서 벗어난 형제 분기는 결과에 포함되지 않는다.
///
/// 무결성 위반은 감지 즉시 에러로 보고하며 임의로 보정하지 않는다:
/// - 루트(부모 없는 레코드)가 둘 이상이면 MultipleRoots
/// - 루트가 하나도 없으면 모든 레코드가 부모를 가지므로 부모 포인터가
///   순환한다 (CycleDetected)
/// - 탐색 중 이미 방문한 노드를 다시 만나면 CycleDetected
pub fn reconstruct_chain(
    trace_id: &str,
    records: &[TradeTrace],
) -> Result<TraceChain, TraceError> {
    if records.is_empty() {
        return Err(TraceError::TraceNotFound(trace_id.to_string()));
    }

    let roots: Vec<&TradeTrace> = records.iter().filter(|r| r.parent_id.is_none()).collect();
    if roots.len() > 1 {
        return Err(TraceError::MultipleRoots(trace_id.to_string()));
    }
    let root = *roots
        .first()
        .ok_or_else(|| TraceError::CycleDetected(trace_id.to_string()))?;

    // parent_id → 자식 레코드 매핑, 각 형제 목록은 (timestamp, id) 오름차순
    let mut children: HashMap<&str, Vec<&TradeTrace>> = HashMap::new();
    for record in records {
        if let Some(parent_id) = &record.parent_id {
            children.entry(parent_id.as_str()).or_default().push(record);
        }
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(root.id.as_str());

    let mut chain = vec![root.clone()];
    let mut current = root;

    while let Some(siblings) = children.get(current.id.as_str()) {
        let next = siblings[0];
        if !visited.insert(next.id.as_str()) {
            return Err(TraceError::CycleDetected(trace_id.to_string()));
        }
        chain.push(next.clone());
        current = next;
    }

    Ok(TraceChain {
        trace_id: trace_id.to_string(),
        length: chain.len(),
        chain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::testutil::trace_at;

    #[test]
    fn linear_chain_regardless_of_storage_order() {
        // 저장 순서를 섞어도 사슬 순서는 루트부터 복원된다
        let records = vec![
            trace_at("c", "t1", Some("b"), 300),
            trace_at("a", "t1", None, 100),
            trace_at("d", "t1", Some("c"), 400),
            trace_at("b", "t1", Some("a"), 200),
        ];

        let result = reconstruct_chain("t1", &records).unwrap();

        assert_eq!(result.length, 4);
        let ids: Vec<&str> = result.chain.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn missing_trace_is_not_found() {
        let result = reconstruct_chain("missing", &[]);

        assert!(matches!(result, Err(TraceError::TraceNotFound(_))));
    }

    #[test]
    fn two_rootless_parent_records_fail() {
        let records = vec![
            trace_at("a", "t1", None, 100),
            trace_at("b", "t1", None, 200),
        ];

        let result = reconstruct_chain("t1", &records);

        assert!(matches!(result, Err(TraceError::MultipleRoots(_))));
    }

    #[test]
    fn branching_picks_earliest_child() {
        // A(ts=1) ← B(ts=2), C(ts=3): B가 주 사슬, C는 형제 분기로 제외
        let records = vec![
            trace_at("1", "t1", None, 1),
            trace_at("2", "t1", Some("1"), 2),
            trace_at("3", "t1", Some("1"), 3),
        ];

        let result = reconstruct_chain("t1", &records).unwrap();

        assert_eq!(result.length, 2);
        let ids: Vec<&str> = result.chain.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn sibling_timestamp_tie_breaks_by_id() {
        let records = vec![
            trace_at("root", "t1", None, 1),
            trace_at("b", "t1", Some("root"), 5),
            trace_at("a", "t1", Some("root"), 5),
        ];

        let result = reconstruct_chain("t1", &records).unwrap();

        let ids: Vec<&str> = result.chain.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "a"]);
    }

    #[test]
    fn cyclic_parent_pointers_fail() {
        // 서로를 부모로 가리키는 두 레코드: 루트가 없다
        let records = vec![
            trace_at("a", "t1", Some("b"), 100),
            trace_at("b", "t1", Some("a"), 200),
        ];

        let result = reconstruct_chain("t1", &records);

        assert!(matches!(result, Err(TraceError::CycleDetected(_))));
    }
}
