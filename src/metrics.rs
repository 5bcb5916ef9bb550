use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Histogram, IntGauge, register_counter, register_counter_vec,
    register_histogram, register_int_gauge,
};


lazy_static! {
    pub static ref QUERY_TOTAL: Counter =
        register_counter!("gateway_queries_total", "Total number of admitted queries").unwrap();
    pub static ref ADMISSION_REJECTIONS: CounterVec = register_counter_vec!(
        "gateway_admission_rejections_total",
        "Requests turned away before inference, by reason",
        &["reason"]
    )
    .unwrap();
    pub static ref INFERENCE_FAILURES: CounterVec = register_counter_vec!(
        "gateway_inference_failures_total",
        "Failed inference calls, by kind",
        &["kind"]
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_query_latency_seconds",
        "End to end latency of admitted queries in seconds"
    )
    .unwrap();
    pub static ref INFERENCE_LATENCY: Histogram = register_histogram!(
        "gateway_inference_latency_seconds",
        "Time spent inside the model backend in seconds"
    )
    .unwrap();
    pub static ref INFERENCE_IN_FLIGHT: IntGauge =
        register_int_gauge!("gateway_inference_in_flight", "Inference calls currently running").unwrap();
}
