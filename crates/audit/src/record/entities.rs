/// 감사 추적 레코드 엔티티 모듈
pub mod trade_trace {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "trade_traces")]
    pub struct Model {
        /// 레코드 고유 식별자 (UUID 문자열)
        #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
        pub id: String,

        /// 소유 전략 식별자
        #[sea_orm(column_type = "Text")]
        pub strategy_id: String,

        /// 종목 심볼
        #[sea_orm(column_type = "Text")]
        pub symbol: String,

        /// 거래 방향 (buy, sell)
        #[sea_orm(column_type = "Text")]
        pub side: String,

        /// 거래 수량
        #[sea_orm(column_type = "BigInteger")]
        pub quantity: i64,

        /// 체결 가격
        #[sea_orm(column_type = "Double")]
        pub price: f64,

        /// 체결 UTC 시간 (ISO 8601 형식)
        #[sea_orm(column_type = "Text")]
        pub timestamp: String,

        /// 원본 주문 식별자
        #[sea_orm(column_type = "Text")]
        pub order_id: String,

        /// 브로커 체결 식별자
        #[sea_orm(column_type = "Text")]
        pub trade_id: String,

        /// 선행 레코드 id (루트 이벤트는 NULL)
        #[sea_orm(column_type = "Text", nullable)]
        pub parent_id: Option<String>,

        /// 인과 사슬 식별자
        #[sea_orm(column_type = "Text")]
        pub trace_id: String,

        /// 추가 메타데이터 (NULL 가능, TEXT, JSON)
        #[sea_orm(column_type = "Text", nullable)]
        pub metadata: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
