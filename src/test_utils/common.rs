use crate::AppTaskAttemptId;
use crate::ServerHostAndPort;
use crate::ShuffleWriteConfig;
use crate::WriteSessionParams;

pub const TEST_NETWORK_TIMEOUT_MS: u64 = 2_000;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

pub fn test_session_params(
    app_id: &str,
    finish_upload_ack: bool,
) -> WriteSessionParams {
    WriteSessionParams {
        timeout_millis: TEST_NETWORK_TIMEOUT_MS,
        finish_upload_ack,
        user: "user1".to_string(),
        app_id: app_id.to_string(),
        app_attempt: "attempt1".to_string(),
        shuffle_write_config: ShuffleWriteConfig {
            file_compression_codec: String::new(),
            num_splits: 3,
        },
    }
}

pub fn test_task_attempt(map_id: u32) -> AppTaskAttemptId {
    AppTaskAttemptId::new("app1", "attempt1", 1, map_id, map_id as u64)
}

/// Address of a port nothing listens on: bind, read the port, release it.
pub async fn unused_local_address() -> ServerHostAndPort {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    ServerHostAndPort::new("127.0.0.1", port)
}
