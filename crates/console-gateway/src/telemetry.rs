//! Gateway counters
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! embedding process installs a recorder.
//!
//! - `gateway_requests_total` (counter): labels `status`, `attempt`
//! - `gateway_refresh_total` (counter): label `outcome`
//! - `gateway_unauthorized_total` (counter)

/// Record a response from the backend for a primary or retried call.
pub fn record_response(status: u16, attempt: &'static str) {
    ::metrics::counter!(
        "gateway_requests_total",
        "status" => status.to_string(),
        "attempt" => attempt
    )
    .increment(1);
}

/// Record a settled refresh call (`success` or `failure`).
pub fn record_refresh(outcome: &'static str) {
    ::metrics::counter!("gateway_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a request that resolved as unauthorized after recovery failed.
pub fn record_unauthorized() {
    ::metrics::counter!("gateway_unauthorized_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_response(200, "initial");
        record_refresh("success");
        record_unauthorized();
    }

    /// build_recorder() keeps each test isolated from the global recorder.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_response_carries_status_and_attempt() {
        let (recorder, handle) = isolated_recorder();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        record_response(401, "initial");
        record_response(200, "retry");

        let output = handle.render();
        assert!(output.contains("gateway_requests_total"));
        assert!(output.contains("status=\"401\""));
        assert!(output.contains("attempt=\"initial\""));
        assert!(output.contains("status=\"200\""));
        assert!(output.contains("attempt=\"retry\""));
    }

    #[test]
    fn refresh_outcomes_are_labelled() {
        let (recorder, handle) = isolated_recorder();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        record_refresh("success");
        record_refresh("failure");
        record_unauthorized();

        let output = handle.render();
        assert!(output.contains("gateway_refresh_total"));
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"failure\""));
        assert!(output.contains("gateway_unauthorized_total"));
    }
}
