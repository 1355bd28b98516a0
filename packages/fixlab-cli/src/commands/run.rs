use crate::cli::RunArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use fixlab_rs::session::SessionOrder;
use fixlab_rs::{
    FailurePolicy, FixlabError, Pipeline, PipelineConfig, RunReport, SnapshotFormat,
    SnapshotWriter,
};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Serialize)]
struct RunOutput<'a> {
    inputs: Vec<String>,
    output: &'a str,
    format: SnapshotFormat,
    #[serde(flatten)]
    report: &'a RunReport,
}

pub async fn execute(args: RunArgs) -> i32 {
    let files = match params::resolve_inputs(&args.input) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let options = match params::load_options(args.options.as_deref()) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let format = match params::resolve_format(args.format.as_deref(), &args.output) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let mut runner = match params::resolve_runner(args.python.as_deref(), args.bridge.as_deref()) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::DETECTOR_NOT_FOUND;
        }
    };
    if let Some(secs) = args.timeout {
        runner = runner.with_timeout(Duration::from_secs(secs));
    }

    let table = match params::load_inputs(&files) {
        Ok(t) => t,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!(
            "Loaded {} samples from {} file(s)",
            table.samples.len(),
            files.len()
        );
    }

    let config = PipelineConfig {
        checkpoint_every: args.checkpoint_every,
        failure_policy: if args.continue_on_error {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        },
        session_order: if args.sort_sessions {
            SessionOrder::Sorted
        } else {
            SessionOrder::FirstSeen
        },
    };

    let mut pipeline = Pipeline::new(
        runner,
        SnapshotWriter::new(&args.output, format),
        options,
        config,
    );
    if !args.quiet {
        pipeline = pipeline.with_progress(|p| {
            eprintln!("[{}/{}] {}...", p.index + 1, p.total, p.key);
        });
    }

    let start_time = Instant::now();
    let report = match pipeline.run(table.samples).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return error_exit_code(&e);
        }
    };

    if !args.quiet {
        for skipped in &report.skipped {
            eprintln!("  Skipped {}: {}", skipped.key, skipped.reason);
        }
        eprintln!(
            "Run complete: {}/{} sessions, {} fixations, {} skipped, {:.1}s",
            report.sessions_processed,
            report.sessions_total,
            report.fixations,
            report.skipped.len(),
            start_time.elapsed().as_secs_f64()
        );
        eprintln!("Results written to {}", args.output);
    }

    if args.json {
        let summary = RunOutput {
            inputs: files.iter().map(|f| f.display().to_string()).collect(),
            output: &args.output,
            format,
            report: &report,
        };
        if let Err(e) = output::emit_json(&summary, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    report_exit_code(&report)
}

fn report_exit_code(report: &RunReport) -> i32 {
    if report.skipped.is_empty() {
        exit_codes::SUCCESS
    } else if report.sessions_processed > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

fn error_exit_code(error: &FixlabError) -> i32 {
    match error {
        FixlabError::LabelCollision { .. } | FixlabError::InvalidParameter(_) => {
            exit_codes::INPUT_ERROR
        }
        _ => exit_codes::EXECUTION_ERROR,
    }
}
