//! Callback contracts satisfied by worker implementations.
//!
//! These are invoked by whichever layer owns the worker processes (a pool
//! driver or an embedding server runtime), never by the orchestrator itself.

use crate::WorkerId;

/// Lifecycle callbacks of a worker process.
///
/// Every method defaults to a no-op so implementors override only the events
/// they care about.
pub trait WorkerEvents {
    /// The worker process has been started.
    fn on_worker_start(&self, _worker_id: WorkerId) {}

    /// The worker process is stopping. Fires after `on_worker_exit` or
    /// `on_worker_error`.
    fn on_worker_stop(&self, _worker_id: WorkerId) {}

    /// The worker process exited cleanly.
    fn on_worker_exit(&self, _worker_id: WorkerId) {}

    /// The worker process terminated abnormally.
    ///
    /// `exit_code` is `-1` when the process was killed by a signal, and
    /// `signal` is `0` when it exited on its own.
    fn on_worker_error(&self, _worker_id: WorkerId, _pid: u32, _exit_code: i32, _signal: i32) {}
}

/// Request entry point for network-facing workers.
///
/// The pool never calls this; it is declared so worker types can advertise
/// that they also serve requests for an embedding server.
pub trait RequestHandler {
    type Request;
    type Response;

    fn on_request(&self, request: Self::Request, response: &mut Self::Response);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl WorkerEvents for Echo {}

    impl RequestHandler for Echo {
        type Request = String;
        type Response = Vec<String>;

        fn on_request(&self, request: String, response: &mut Vec<String>) {
            response.push(request.to_uppercase());
        }
    }

    #[test]
    fn default_callbacks_are_inert() {
        let echo = Echo;
        echo.on_worker_start(0);
        echo.on_worker_error(0, 1, -1, 9);
        echo.on_worker_exit(0);
        echo.on_worker_stop(0);
    }

    #[test]
    fn handler_writes_into_response() {
        let mut response = Vec::new();
        Echo.on_request("ping".to_owned(), &mut response);
        Echo.on_request("pong".to_owned(), &mut response);
        assert_eq!(response, ["PING", "PONG"]);
    }
}
