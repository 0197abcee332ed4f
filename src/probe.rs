//! End-to-end probe run: launch, barrier, then the retention inspection phases.

use crate::config::RunConfig;
use crate::context::AccessorStats;
use crate::error::ProbeError;
use crate::inspection::{pause_for_inspection, RetentionReport};
use crate::launcher::{BoundedLauncher, RunReport};
use crate::process::LineSink;
use crate::scope::ServiceProvider;
use serde::Serialize;
use std::io::BufRead;
use std::sync::Arc;
use tracing::info;

pub const PHASE_AFTER_BARRIER: &str = "after-barrier";
pub const PHASE_AFTER_TEARDOWN: &str = "after-teardown";

/// Everything observed during one probe run
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub run: RunReport,
    pub retention: Vec<RetentionReport>,
    pub accessor: AccessorStats,
}

/// Run the probe described by `config`, writing unit lines to `sink`.
///
/// `input` is read once per inspection phase unless `config.pause` is cleared.
pub async fn run_probe<R: BufRead>(
    config: RunConfig,
    sink: Arc<dyn LineSink>,
    input: &mut R,
) -> Result<ProbeOutcome, ProbeError> {
    let pause = config.pause;
    let units = config.units;
    let provider = ServiceProvider::builder().config(config).sink(sink).build();
    let accessor = provider.accessor();
    let gauge = provider.gauge();
    let mut retention = Vec::with_capacity(2);

    // The launcher's own call tree gets an ambient slot that it never sets.
    let run = accessor
        .scope(async {
            let launcher = BoundedLauncher::new(provider.clone());
            let run = launcher.run(units).await?;
            retention.push(RetentionReport::capture(PHASE_AFTER_BARRIER, &gauge, &accessor));
            Ok::<RunReport, ProbeError>(run)
        })
        .await?;

    if pause {
        pause_for_inspection(PHASE_AFTER_BARRIER, input)?;
    }

    drop(provider);
    info!("Service provider released");
    retention.push(RetentionReport::capture(PHASE_AFTER_TEARDOWN, &gauge, &accessor));

    if pause {
        pause_for_inspection(PHASE_AFTER_TEARDOWN, input)?;
    }

    Ok(ProbeOutcome {
        run,
        retention,
        accessor: accessor.stats(),
    })
}
