use clap::Parser;
use ionlog_rs::log::{ParsedLog, decode};
use ionlog_rs::timeline::{Topic, extract_topics, time_range};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ion-dump", about = "Decode a binary Ion robot log and summarize it")]
struct Args {
    /// Path to the .ion log
    #[arg(long)]
    input: PathBuf,

    /// Write {raw, session, robot, topics} as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print one line per topic
    #[arg(long)]
    topics: bool,
}

#[derive(Serialize)]
struct DumpJson<'a> {
    #[serde(flatten)]
    log: &'a ParsedLog,
    topics: &'a [Topic],
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(&args.input)
        .map_err(|e| format!("failed to read {}: {e}", args.input.display()))?;
    let parsed = decode(&bytes)?;
    let topics = extract_topics(&parsed.raw);
    let range = time_range(&topics);

    println!(
        "log items={} dropped={} session_id={:?} robot_id={:?} topics={}",
        parsed.raw.len(),
        parsed.dropped_items,
        parsed.session.as_ref().and_then(|s| s.id()),
        parsed.robot.as_ref().and_then(|r| r.id()),
        topics.len()
    );
    match range {
        Some(r) => println!(
            "time_range start_ms={} end_ms={} duration_ms={}",
            r.start,
            r.end,
            r.duration()
        ),
        None => println!("time_range none"),
    }
    if args.topics {
        for t in &topics {
            println!(
                "topic name={} type={} messages={} frequency={:?}",
                t.topic_name,
                t.topic_type,
                t.messages.len(),
                t.declared_frequency
            );
        }
    }

    if let Some(path) = args.json {
        let json = serde_json::to_string_pretty(&DumpJson {
            log: &parsed,
            topics: &topics,
        })?;
        fs::write(&path, json)?;
        eprintln!("wrote decoded log to {}", path.display());
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
