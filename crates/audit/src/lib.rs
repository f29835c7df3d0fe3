pub mod export;
pub mod logger;
pub mod record;
pub mod server;
pub mod trace;

/// 프로세스 시작 시 .env 파일을 자동으로 로드
#[ctor::ctor]
fn load_dotenv() {
    let _ = dotenv::dotenv();
}
