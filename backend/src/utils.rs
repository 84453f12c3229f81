pub fn ms_since_epoch() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
