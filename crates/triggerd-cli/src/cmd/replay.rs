use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use triggerd_core::capture::{Capture, Effect};
use triggerd_core::config::Config;
use triggerd_core::engine::{DispatchReport, Engine};
use triggerd_core::registry::RuleRegistry;
use triggerd_core::seed::default_triggers;
use triggerd_core::state::SensorStateStore;
use triggerd_core::store::TriggerStore;

use crate::output::{print_json, print_table};

#[derive(Serialize)]
struct ReplayLine {
    line: usize,
    #[serde(flatten)]
    report: DispatchReport,
    effects: Vec<Effect>,
}

#[derive(Serialize)]
struct Rejected {
    line: usize,
    error: String,
}

#[derive(Serialize)]
struct ReplayOutput {
    readings: Vec<ReplayLine>,
    rejected: Vec<Rejected>,
}

pub fn run(root: &Path, file: &Path, defaults: bool, json: bool) -> Result<()> {
    let registry = Arc::new(RuleRegistry::new());
    let records = if defaults {
        default_triggers(&Config::load_or_default(root)?.thresholds)
    } else {
        let (_, store) = super::open_store(root)?;
        store.list_triggers()?
    };
    let report = registry.replace(&records);
    for skipped in &report.skipped {
        eprintln!("skipped trigger '{}': {}", skipped.id, skipped.reason);
    }

    let reader: Box<dyn BufRead> = if file == Path::new("-") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let f = std::fs::File::open(file)
            .with_context(|| format!("cannot open {}", file.display()))?;
        Box::new(BufReader::new(f))
    };

    let output = replay(&registry, reader)?;

    if json {
        return print_json(&output);
    }
    for r in &output.rejected {
        eprintln!("line {}: {}", r.line, r.error);
    }
    let rows = output
        .readings
        .iter()
        .flat_map(|l| {
            l.effects.iter().map(move |e| {
                vec![
                    l.line.to_string(),
                    l.report.sensor_id.clone(),
                    describe(e),
                ]
            })
        })
        .collect::<Vec<_>>();
    if rows.is_empty() {
        println!("No effects ({} reading(s) replayed)", output.readings.len());
        return Ok(());
    }
    print_table(&["LINE", "SENSOR", "EFFECT"], rows);
    Ok(())
}

/// Feed each non-blank line to a fresh engine whose capabilities only
/// record what they were asked to do.
fn replay(registry: &Arc<RuleRegistry>, reader: Box<dyn BufRead>) -> Result<ReplayOutput> {
    let capture = Capture::new();
    let engine = Engine::new(
        Arc::new(SensorStateStore::new()),
        registry.clone(),
        capture.capabilities(),
    );

    let mut output = ReplayOutput {
        readings: Vec::new(),
        rejected: Vec::new(),
    };
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match engine.dispatch_raw(line.as_bytes()) {
            Ok(report) => output.readings.push(ReplayLine {
                line: n + 1,
                report,
                effects: capture.take(),
            }),
            Err(e) => output.rejected.push(Rejected {
                line: n + 1,
                error: e.to_string(),
            }),
        }
    }
    Ok(output)
}

fn describe(effect: &Effect) -> String {
    match effect {
        Effect::Publish { topic, payload } => format!("publish {topic} {payload}"),
        Effect::Call(call) => {
            let mut s = format!("{} {}:{}", call.method, call.actuator_id, call.path);
            if !call.query.is_empty() {
                let q: Vec<String> = call.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
                s.push('?');
                s.push_str(&q.join("&"));
            }
            if let Some(body) = &call.body {
                s.push(' ');
                s.push_str(body);
            }
            s
        }
        Effect::Fault(f) => format!("fault {} {}", f.fault_type, f.message),
    }
}
