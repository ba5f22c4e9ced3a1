use anyhow::{anyhow, Context};
use log::{info, warn};
use radarcube::telemetry::{MetricsSnapshot, PipelineMetrics};
use radarcube::{CubeShape, IqCube, PipelineConfig, PipelineReport, RadarPipeline};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Detection report tagged with the capture it came from.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CubeReport {
    pub source: String,
    #[serde(flatten)]
    pub report: PipelineReport,
}

/// Runs cubes through pipelines built once per input shape and shared by
/// every worker.
pub struct Runner {
    config: PipelineConfig,
    metrics: Arc<PipelineMetrics>,
    pipelines: Mutex<HashMap<CubeShape, Arc<RadarPipeline>>>,
}

impl Runner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(PipelineMetrics::new()),
            pipelines: Mutex::new(HashMap::new()),
        }
    }

    pub fn pipeline_for(&self, shape: CubeShape) -> anyhow::Result<Arc<RadarPipeline>> {
        let mut cache = self
            .pipelines
            .lock()
            .map_err(|_| anyhow!("pipeline cache poisoned"))?;
        if let Some(pipeline) = cache.get(&shape) {
            return Ok(pipeline.clone());
        }
        let pipeline = Arc::new(
            RadarPipeline::with_metrics(self.config.clone(), shape, self.metrics.clone())
                .with_context(|| format!("preparing pipeline for {shape:?}"))?,
        );
        cache.insert(shape, pipeline.clone());
        Ok(pipeline)
    }

    pub fn execute(&self, source: &str, cube: &IqCube) -> anyhow::Result<CubeReport> {
        let pipeline = self.pipeline_for(cube.shape())?;
        let report = pipeline
            .process(cube)
            .with_context(|| format!("processing {source}"))?;
        Ok(CubeReport {
            source: source.to_string(),
            report,
        })
    }

    pub fn execute_file(&self, path: &Path) -> anyhow::Result<CubeReport> {
        let cube = IqCube::load(path)
            .with_context(|| format!("loading capture {}", path.display()))?;
        self.execute(&path.display().to_string(), &cube)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Processes every capture on blocking worker threads, at most `workers` at
/// a time. Failed captures are logged and left out of the result.
pub async fn run_batch(
    runner: Arc<Runner>,
    paths: Vec<PathBuf>,
    workers: usize,
) -> anyhow::Result<Vec<CubeReport>> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .context("acquiring batch worker")?;
        let runner = runner.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let result = runner.execute_file(&path);
            drop(permit);
            result
        }));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await.context("joining batch worker")? {
            Ok(report) => reports.push(report),
            Err(err) => warn!("skipping capture: {err:#}"),
        }
    }
    info!("batch finished: {} captures reported", reports.len());
    Ok(reports)
}

/// `*.iqc` captures in `dir`, sorted by name.
pub fn collect_captures(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("listing capture directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "iqc") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_iq_cube, ScenarioConfig, TargetSpec};
    use crate::workflow::config::WorkflowConfig;
    use radarcube::config::FftBins;
    use tempfile::tempdir;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            bins: FftBins::unpadded(),
            ..PipelineConfig::default()
        }
    }

    fn scenario(range_m: f64) -> ScenarioConfig {
        ScenarioConfig {
            pulses: 16,
            samples: Some(64),
            targets: vec![TargetSpec {
                range_m,
                amplitude: 10.0,
                ..TargetSpec::default()
            }],
            ..ScenarioConfig::default()
        }
    }

    fn shipped_workflow() -> WorkflowConfig {
        WorkflowConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/workflow.yaml")).unwrap()
    }

    #[test]
    fn shipped_workflow_reports_one_detection_per_target() {
        let mut workflow = shipped_workflow();
        workflow.scenario.noise_std = 0.0;
        workflow.scenario.targets = vec![TargetSpec {
            range_m: 500.0,
            velocity_mps: 10.0,
            ..TargetSpec::default()
        }];
        let runner = Runner::new(workflow.pipeline.clone());
        let cube = build_iq_cube(&workflow.pipeline.radar, &workflow.scenario).unwrap();
        assert_eq!(cube.samples(), 212);

        let report = runner.execute("synthetic", &cube).unwrap().report;
        assert_eq!(report.detections.len(), 1);
        let hit = &report.detections[0];
        assert!((hit.range_m - 500.0).abs() <= report.range_resolution_m);
        assert!((hit.velocity_mps - 10.0).abs() <= report.velocity_resolution_mps);
    }

    #[test]
    fn shipped_scenario_resolves_both_targets() {
        let workflow = shipped_workflow();
        let runner = Runner::new(workflow.pipeline.clone());
        let cube = build_iq_cube(&workflow.pipeline.radar, &workflow.scenario).unwrap();

        let report = runner.execute("synthetic", &cube).unwrap().report;
        let mut hits: Vec<(f64, f64)> = report
            .detections
            .iter()
            .map(|d| (d.range_m, d.velocity_mps))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(hits.len(), workflow.scenario.targets.len());
        for (hit, target) in hits.iter().zip(&workflow.scenario.targets) {
            assert!((hit.0 - target.range_m).abs() <= report.range_resolution_m);
            assert!((hit.1 - target.velocity_mps).abs() <= report.velocity_resolution_mps);
        }
    }

    #[test]
    fn runner_reuses_pipeline_per_shape() {
        let runner = Runner::new(small_config());
        let shape = CubeShape {
            channels: 4,
            pulses: 16,
            samples: 64,
        };
        let first = runner.pipeline_for(shape).unwrap();
        let second = runner.pipeline_for(shape).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn runner_executes_synthetic_cube() {
        let config = small_config();
        let runner = Runner::new(config.clone());
        let cube = build_iq_cube(&config.radar, &scenario(150.0)).unwrap();
        let report = runner.execute("synthetic", &cube).unwrap();
        assert!(!report.report.detections.is_empty());
        assert_eq!(runner.metrics().cubes_processed, 1);
    }

    #[test]
    fn batch_processes_every_capture() {
        let dir = tempdir().unwrap();
        let config = small_config();
        for (i, range) in [150.0, 210.0].into_iter().enumerate() {
            let cube = build_iq_cube(&config.radar, &scenario(range)).unwrap();
            cube.save(dir.path().join(format!("capture{i}.iqc"))).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("broken.iqc"), b"IQCB").unwrap();

        let paths = collect_captures(dir.path()).unwrap();
        assert_eq!(paths.len(), 3);

        let runner = Arc::new(Runner::new(config));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap();
        let reports = runtime
            .block_on(run_batch(runner.clone(), paths, 2))
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.source.ends_with(".iqc")));
        assert_eq!(runner.metrics().cubes_processed, 2);
    }
}
