use rand::{distributions::Alphanumeric, Rng};

fn prefixed_id(prefix: &str, random_len: usize) -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let random_part: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(random_len)
        .map(char::from)
        .collect();

    format!("{}_{}_{}", prefix, timestamp, random_part.to_lowercase())
}

pub fn generate_request_id() -> String {
    prefixed_id("req", 10)
}

pub fn generate_run_id() -> String {
    prefixed_id("run", 8)
}
