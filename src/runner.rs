use crate::{
    error::JobError,
    jobs::JobConfig,
    orchestrator::{JobState, RunContext, SignInJob, StatusCheck},
    report::{JobResult, RunSummary},
    util::now_rfc3339,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

pub struct Runner<'a> {
    ctx: RunContext<'a>,
}

/// Read-only view of one job, used by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct JobProbe {
    pub label: String,
    pub logged_in: Option<bool>,
    pub signed_today: Option<bool>,
    pub consecutive_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> Runner<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Runs every job in order against the shared session. A failing job is
    /// recorded and never stops the ones after it.
    pub fn run_all(&self, jobs: &[JobConfig]) -> RunSummary {
        let started = now_rfc3339();
        let mut results = Vec::with_capacity(jobs.len());

        for job in jobs {
            results.push(self.run_one(job));
        }

        RunSummary::from_results(results, started, now_rfc3339())
    }

    fn run_one(&self, job: &JobConfig) -> JobResult {
        let mut sign_in = match SignInJob::new(job, self.ctx) {
            Ok(j) => j,
            Err(err) => return self.fault(job, err),
        };

        match sign_in.run() {
            Ok(JobState::Failed(message)) => {
                warn!("job {} failed: {}", job.label, message);
                JobResult {
                    label: job.label.clone(),
                    success: sign_in.success(),
                    detail: Some(message),
                }
            }
            Ok(state) => JobResult {
                label: job.label.clone(),
                success: sign_in.success(),
                detail: Some(format!("{state:?}")),
            },
            Err(err) => self.fault(job, err),
        }
    }

    fn fault(&self, job: &JobConfig, err: JobError) -> JobResult {
        if err.is_login_failure() {
            error!("job {} could not log in: {}", job.label, err);
        } else {
            error!("job {} errored: {}", job.label, err);
        }
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            error!("  caused by: {}", cause);
            source = cause.source();
        }
        debug!("job {} fault detail: {:?}", job.label, err);
        JobResult {
            label: job.label.clone(),
            success: false,
            detail: Some(err.to_string()),
        }
    }

    /// Reports login and signed-today state without logging in or signing.
    pub fn probe_all(&self, jobs: &[JobConfig]) -> Vec<JobProbe> {
        jobs.iter().map(|job| self.probe_one(job)).collect()
    }

    fn probe_one(&self, job: &JobConfig) -> JobProbe {
        let mut probe = JobProbe {
            label: job.label.clone(),
            logged_in: None,
            signed_today: None,
            consecutive_days: None,
            error: None,
        };

        let outcome = SignInJob::new(job, self.ctx).and_then(|sign_in| {
            let logged_in = sign_in.is_login()?;
            probe.logged_in = Some(logged_in);
            if logged_in {
                match sign_in.is_signed()? {
                    StatusCheck::Known(status) => {
                        probe.signed_today = Some(status.signed_today);
                        probe.consecutive_days = Some(status.consecutive_days);
                    }
                    StatusCheck::Drifted(drift) => probe.error = Some(drift.to_string()),
                    StatusCheck::Unavailable { status, reason } => {
                        probe.error = Some(format!("status page answered {status} {reason}"))
                    }
                }
            }
            Ok(())
        });

        if let Err(err) = outcome {
            probe.error = Some(err.to_string());
        }
        info!(
            "probe {} logged_in={:?} signed_today={:?}",
            probe.label, probe.logged_in, probe.signed_today
        );
        probe
    }
}
