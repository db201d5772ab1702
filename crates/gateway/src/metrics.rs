use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};

pub struct PredictionMetrics {
    pub duration_histogram: Histogram<f64>,
    pub instances_counter: Counter<u64>,
    pub detections_counter: Counter<u64>,
}

impl PredictionMetrics {
    /// Instruments are no-ops unless a meter provider was installed by telemetry init.
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];
        let duration_histogram = meter
            .f64_histogram("inference_duration_seconds")
            .with_description("Time to process one instance (decode + infer + annotate)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let instances_counter = meter
            .u64_counter("prediction_instances_total")
            .with_description("Total instances received on the predict route")
            .build();
        let detections_counter = meter
            .u64_counter("inference_detections_total")
            .with_description("Total detections returned")
            .build();

        Self {
            duration_histogram,
            instances_counter,
            detections_counter,
        }
    }
}
