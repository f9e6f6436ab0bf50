use prometheus::Encoder;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;

use crate::error::Result;

/// Outcome label of a detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Match,
    NoMatch,
    NotFound,
    NoText,
    Failed,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Match => "match",
            Outcome::NoMatch => "no_match",
            Outcome::NotFound => "not_found",
            Outcome::NoText => "no_text",
            Outcome::Failed => "failed",
        }
    }
}

pub struct PipelineMetrics {
    registry: Registry,
    detections: IntCounterVec,
    duration: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let detections = IntCounterVec::new(
            Opts::new("plate_gate_detections_total", "Detection runs by outcome"),
            &["outcome"],
        )?;
        let duration = Histogram::with_opts(HistogramOpts::new(
            "plate_gate_detection_seconds",
            "Time spent locating, reading and matching a plate",
        ))?;
        registry.register(Box::new(detections.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            detections,
            duration,
        })
    }

    pub fn observe(&self, outcome: Outcome, seconds: f64) {
        self.detections.with_label_values(&[outcome.label()]).inc();
        self.duration.observe(seconds);
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        self.detections.with_label_values(&[outcome.label()]).get()
    }

    /// Text exposition format of every registered metric.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_outcomes() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.observe(Outcome::Match, 0.1);
        metrics.observe(Outcome::Match, 0.2);
        metrics.observe(Outcome::NotFound, 0.05);

        assert_eq!(metrics.count(Outcome::Match), 2);
        assert_eq!(metrics.count(Outcome::NotFound), 1);
        assert_eq!(metrics.count(Outcome::NoText), 0);

        let text = metrics.render().unwrap();
        assert!(text.contains("plate_gate_detections_total{outcome=\"match\"} 2"));
        assert!(text.contains("plate_gate_detection_seconds_count 3"));
    }
}
