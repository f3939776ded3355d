use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("ollama_repl.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("ollama_repl.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("ollama_repl.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("ollama_repl.stream.chunks");
pub(crate) static STREAM_SKIPPED_LINES: Counter = Counter::new("ollama_repl.stream.skipped_lines");
pub(crate) static STREAM_BYTES: Counter = Counter::new("ollama_repl.stream.bytes");
pub(crate) static STREAM_INTERRUPTS: Counter = Counter::new("ollama_repl.stream.interrupts");

pub(crate) static MODEL_CACHE_HITS: Counter = Counter::new("ollama_repl.model_cache.hits");
pub(crate) static MODEL_CACHE_REFRESHES: Counter =
    Counter::new("ollama_repl.model_cache.refreshes");
pub(crate) static MODEL_CACHE_REFRESH_FAILURES: Counter =
    Counter::new("ollama_repl.model_cache.refresh_failures");

pub(crate) static EXECUTIONS: Counter = Counter::new("ollama_repl.exec.executions");
pub(crate) static EXECUTION_FAILURES: Counter = Counter::new("ollama_repl.exec.failures");
pub(crate) static EXECUTION_DURATION: Moments =
    Moments::new("ollama_repl.exec.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_SKIPPED_LINES);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_INTERRUPTS);

    collector.register_counter(&MODEL_CACHE_HITS);
    collector.register_counter(&MODEL_CACHE_REFRESHES);
    collector.register_counter(&MODEL_CACHE_REFRESH_FAILURES);

    collector.register_counter(&EXECUTIONS);
    collector.register_counter(&EXECUTION_FAILURES);
    collector.register_moments(&EXECUTION_DURATION);
}
