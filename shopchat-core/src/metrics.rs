// ABOUTME: Metric recording helpers for widget turns and backend requests
// ABOUTME: Uses the metrics facade; a host installs a recorder or the calls are no-ops

use metrics::{counter, histogram};

/// Label value for a completed turn outcome
pub fn record_turn(outcome: &'static str) {
    counter!("shopchat_turns_total", "outcome" => outcome).increment(1);
}

/// Count a failed or timed-out backend call, labelled by which call failed
pub fn record_request_error(kind: &'static str) {
    counter!("shopchat_request_errors_total", "kind" => kind).increment(1);
}

/// Seconds the primary chat request took, successful or not
pub fn record_request_duration(seconds: f64) {
    histogram!("shopchat_request_duration_seconds").record(seconds);
}

pub fn record_upload_duration(seconds: f64) {
    histogram!("shopchat_upload_duration_seconds").record(seconds);
}

pub fn record_suggestions(count: usize) {
    histogram!("shopchat_suggestions_count").record(count as f64);
}
