//! Process-wide logger tests
//!
//! The global logger can only be installed once per process, so the whole
//! lifecycle is exercised in a single test.

use calltrace_core::{Event, Format, Value};
use calltrace_delivery::{Logger, global};

#[tokio::test]
async fn test_global_logger_lifecycle() {
    // Nothing installed: every call is a no-op.
    assert!(global::get().is_none());
    assert_eq!(global::id(), 0);
    global::log_enter(0, "ignored", &[]);
    global::call_trace();

    let (logger, mut queue) = Logger::new(Format::Text, 16);
    global::install(logger).unwrap();

    let (second, _queue) = Logger::new(Format::Json, 16);
    let rejected = global::install(second).unwrap_err();
    assert_eq!(rejected.format(), Format::Json);

    let id = global::id();
    assert_eq!(id, 1);
    global::log_enter(id, "handle", &[Value::from("req")]);
    global::log_leave(id, "handle", &[Value::from("req")], &[Value::from(0)]);
    global::log(Event::new("custom", vec![], vec![]));
    global::call_trace();

    let names: Vec<String> = std::iter::from_fn(|| queue.try_recv())
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["handle_Enter", "handle_Leave", "custom", "TRACE"]);

    // Already installed, so the environment is not consulted.
    let installed = global::init_from_env().unwrap();
    assert_eq!(installed.format(), Format::Text);
    assert_eq!(global::get().unwrap().stats().enqueued, 4);
}
