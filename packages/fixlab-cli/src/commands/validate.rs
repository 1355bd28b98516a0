use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use fixlab_rs::loader::LoadedTable;
use fixlab_rs::session::{find_label_collisions, partition, SessionOrder};
use fixlab_rs::{quality, Eye, Resolution};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct SessionSummary {
    participant: String,
    recording: String,
    label: String,
    samples: usize,
    /// Fractions after the quality filter
    missing_left: f64,
    missing_right: f64,
}

#[derive(Serialize)]
struct CollisionSummary {
    label: String,
    sessions: Vec<String>,
}

#[derive(Serialize, Default)]
struct ValidateOutput {
    files: Vec<String>,
    samples: usize,
    sessions: Vec<SessionSummary>,
    collisions: Vec<CollisionSummary>,
    unrecognized_validity: BTreeMap<String, usize>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let mut result = ValidateOutput::default();

    match params::resolve_inputs(&args.input).and_then(|files| {
        result.files = files.iter().map(|f| f.display().to_string()).collect();
        let options = params::load_options(args.options.as_deref())?;
        let table = params::load_inputs(&files)?;
        Ok((table, options.resolution()))
    }) {
        Ok((table, bounds)) => summarize(&mut result, table, bounds),
        Err(msg) => result.error = Some(msg),
    }

    if result.error.is_none() && !result.collisions.is_empty() {
        let labels: Vec<&str> = result.collisions.iter().map(|c| c.label.as_str()).collect();
        result.error = Some(format!(
            "Distinct sessions share result labels: {}",
            labels.join(", ")
        ));
    }

    if args.json {
        if let Err(e) = output::emit_json(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        print_text(&result);
    }

    if result.error.is_some() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}

fn summarize(result: &mut ValidateOutput, table: LoadedTable, bounds: Resolution) {
    result.samples = table.samples.len();
    result.unrecognized_validity = table.unrecognized_validity;

    let sessions = partition(table.samples, SessionOrder::FirstSeen);
    result.collisions = find_label_collisions(&sessions)
        .into_iter()
        .map(|(label, keys)| CollisionSummary {
            label,
            sessions: keys.iter().map(|k| k.to_string()).collect(),
        })
        .collect();

    result.sessions = sessions
        .iter()
        .map(|session| {
            let cleaned = quality::filter(&session.samples, bounds);
            SessionSummary {
                participant: session.key.participant_id.clone(),
                recording: session.key.recording_id.clone(),
                label: session.label(),
                samples: session.len(),
                missing_left: quality::missing_fraction(&cleaned, Eye::Left),
                missing_right: quality::missing_fraction(&cleaned, Eye::Right),
            }
        })
        .collect();
}

fn print_text(result: &ValidateOutput) {
    if let Some(ref err) = result.error {
        if result.sessions.is_empty() {
            eprintln!("Error: {}", err);
            return;
        }
    }

    println!(
        "{} samples in {} session(s) from {} file(s)",
        result.samples,
        result.sessions.len(),
        result.files.len()
    );
    for s in &result.sessions {
        println!(
            "  {:<16} {}, {}: {} samples, missing L {:.1}% R {:.1}%",
            s.label,
            s.participant,
            s.recording,
            s.samples,
            s.missing_left * 100.0,
            s.missing_right * 100.0
        );
    }
    for (label, count) in &result.unrecognized_validity {
        println!("  Unrecognized validity '{}' on {} rows (treated as invalid)", label, count);
    }
    for c in &result.collisions {
        println!("  Label '{}' shared by {}", c.label, c.sessions.join(" / "));
    }
    if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    }
}
