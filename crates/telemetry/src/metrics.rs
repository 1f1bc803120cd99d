use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ==== Plate OCR Service Metrics ====
    pub static ref PLATE_OCR_REQUESTS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "plate_ocr_requests_total",
                "Total number of plate OCR requests",
            ),
            &["outcome"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PLATE_OCR_PROCESSING_TIME: Histogram = {
        let metric = Histogram::with_opts(
            HistogramOpts::new(
                "plate_ocr_processing_seconds",
                "End-to-end time of one serialized inference call",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PLATE_OCR_STAGE_TIME: HistogramVec = {
        let metric = HistogramVec::new(
            HistogramOpts::new(
                "plate_ocr_stage_seconds",
                "Time spent in one pipeline stage",
            ),
            &["stage"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PLATE_OCR_GATE_WAITERS: IntGauge = {
        let metric = IntGauge::new(
            "plate_ocr_gate_waiters",
            "Requests currently queued on the inference gate",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };
}
