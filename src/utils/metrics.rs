use crate::detection::AnomalyKind;
use crate::ingest::IngestStats;
use crate::pipeline::AnalysisReport;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Prometheus counters for analysis runs
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    records_total: IntCounter,
    rows_dropped_total: IntCounterVec,
    aggregates_total: IntCounter,
    regions: IntGauge,
    anomalies_total: IntCounterVec,
    skipped_evaluations_total: IntCounter,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let records_total = IntCounter::new("pulse_records_total", "Transaction records analyzed")?;
        registry.register(Box::new(records_total.clone()))?;

        let rows_dropped_total = IntCounterVec::new(
            Opts::new("pulse_rows_dropped_total", "CSV rows dropped during ingest"),
            &["reason"],
        )?;
        registry.register(Box::new(rows_dropped_total.clone()))?;

        let aggregates_total = IntCounter::new(
            "pulse_aggregates_total",
            "Region x period x category aggregates, gap fills included",
        )?;
        registry.register(Box::new(aggregates_total.clone()))?;

        let regions = IntGauge::new("pulse_regions", "Regions in the last run")?;
        registry.register(Box::new(regions.clone()))?;

        let anomalies_total = IntCounterVec::new(
            Opts::new("pulse_anomalies_total", "Anomaly flags raised"),
            &["kind"],
        )?;
        registry.register(Box::new(anomalies_total.clone()))?;

        let skipped_evaluations_total = IntCounter::new(
            "pulse_skipped_evaluations_total",
            "Evaluations skipped for lack of history",
        )?;
        registry.register(Box::new(skipped_evaluations_total.clone()))?;

        Ok(Self {
            registry,
            records_total,
            rows_dropped_total,
            aggregates_total,
            regions,
            anomalies_total,
            skipped_evaluations_total,
        })
    }

    pub fn observe_ingest(&self, stats: &IngestStats) {
        self.rows_dropped_total
            .with_label_values(&["bad_date"])
            .inc_by(stats.bad_dates as u64);
        self.rows_dropped_total
            .with_label_values(&["blank_region"])
            .inc_by(stats.blank_regions as u64);
    }

    pub fn observe(&self, report: &AnalysisReport) {
        self.records_total.inc_by(report.stats.records as u64);
        self.aggregates_total.inc_by(report.stats.aggregates as u64);
        self.regions.set(report.stats.regions as i64);

        for kind in AnomalyKind::ALL {
            let count = report.anomalies.iter().filter(|f| f.kind == kind).count();
            self.anomalies_total
                .with_label_values(&[kind.name()])
                .inc_by(count as u64);
        }

        self.skipped_evaluations_total
            .inc_by(report.skipped_evaluations.len() as u64);
    }

    /// Text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
