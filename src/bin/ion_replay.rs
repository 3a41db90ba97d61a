use clap::Parser;
use ionlog_rs::config::ViewerConfig;
use ionlog_rs::log::{decode_in_background, join_decode};
use ionlog_rs::timeline::{
    ClockSnapshot, EventRecorder, FrameEntry, FramePayloads, ManualTimeSource, PlaybackCommand, PlaybackEvent,
    PlaybackEventKind, PlaybackObserver, PlaybackSession, SystemTimeSource, TimeSource,
};
use std::cell::Cell;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Parser)]
#[command(
    name = "ion-replay",
    about = "Headless playback of a binary Ion robot log"
)]
struct Args {
    /// Path to the .ion log
    #[arg(long)]
    input: PathBuf,

    /// Viewer config (JSON); defaults apply to missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Playback speed multiplier
    #[arg(long)]
    speed: Option<f64>,

    /// Run for this long (wall ms); defaults to one pass over the log
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Seek to this fraction (0..=1) before playing
    #[arg(long)]
    seek: Option<f64>,

    /// Only report these topics (repeatable)
    #[arg(long)]
    topic: Vec<String>,

    /// Pause after this many wrap-arounds
    #[arg(long)]
    max_loops: Option<u32>,

    /// Advance a manual clock instead of sleeping
    #[arg(long)]
    simulated: bool,

    /// Include message payloads in frame events
    #[arg(long)]
    with_data: bool,

    /// Output playback events JSON
    #[arg(long)]
    events_json: Option<PathBuf>,
}

/// 虚拟时间回退即视为一次循环；达到上限后暂停。
struct LoopWatcher {
    last: i64,
    loops: Rc<Cell<u32>>,
    max_loops: Option<u32>,
}

impl PlaybackObserver for LoopWatcher {
    fn on_tick(&mut self, snapshot: &ClockSnapshot, commands: &mut Vec<PlaybackCommand>) {
        if snapshot.virtual_time < self.last {
            let loops = self.loops.get() + 1;
            self.loops.set(loops);
            if self.max_loops.is_some_and(|max| loops >= max) {
                commands.push(PlaybackCommand::Pause);
            }
        }
        self.last = snapshot.virtual_time;
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    let bytes = fs::read(&args.input)
        .map_err(|e| format!("failed to read {}: {e}", args.input.display()))?;

    if args.simulated {
        let source = ManualTimeSource::new(0);
        let handle = source.clone();
        let tick = config.tick_interval_ms;
        let session = PlaybackSession::new(source, config);
        replay(session, bytes, &args, move || {
            handle.advance(tick as i64);
        })
    } else {
        let tick = config.tick_interval_ms;
        let session = PlaybackSession::new(SystemTimeSource, config);
        replay(session, bytes, &args, move || {
            thread::sleep(Duration::from_millis(tick));
        })
    }
}

fn replay<S: TimeSource>(
    mut session: PlaybackSession<S>,
    bytes: Vec<u8>,
    args: &Args,
    mut wait_tick: impl FnMut(),
) -> Result<(), Box<dyn Error>> {
    let ticket = session.begin_load();
    session.complete_load(ticket, join_decode(decode_in_background(bytes)))?;

    let loops = Rc::new(Cell::new(0));
    session.subscribe(Box::new(LoopWatcher {
        last: 0,
        loops: loops.clone(),
        max_loops: args.max_loops,
    }));

    let mut recorder = EventRecorder::default();
    if let Some(log) = session.log() {
        let transform = session.static_transform().unwrap_or_else(|err| {
            warn!(error = %err, "静态变换无法解析");
            None
        });
        recorder.push(PlaybackEvent::meta(log, transform));
    }
    if let Some(speed) = args.speed {
        if !session.set_speed(speed) {
            return Err(format!("invalid speed {speed}").into());
        }
    }
    if let Some(fraction) = args.seek {
        session.seek(fraction);
    }
    if !session.play() {
        return Err("log has no timestamped messages to play".into());
    }
    recorder.push(PlaybackEvent::clock(&session.snapshot()));

    let tick = session.config().tick_interval_ms;
    let duration_ms = args.duration_ms.unwrap_or_else(|| {
        let speed = session.clock().speed();
        (session.clock().duration() as f64 / speed).ceil() as u64 + tick
    });
    let ticks = duration_ms.div_ceil(tick).max(1);

    let mut last_loops = 0;
    for _ in 0..ticks {
        wait_tick();
        let snapshot = session.tick();
        if loops.get() != last_loops {
            last_loops = loops.get();
            recorder.push(PlaybackEvent {
                t_ms: snapshot.virtual_time,
                kind: PlaybackEventKind::Loop,
            });
        }
        let entries: Vec<FrameEntry<'_>> = session
            .current_frame()
            .into_iter()
            .filter(|e| args.topic.is_empty() || args.topic.contains(&e.topic.topic_name))
            .collect();
        let payloads = FramePayloads::capture(&session, args.with_data);
        println!(
            "tick t_ms={} abs_ms={:?} progress={:.3} frames={} pose={} image={}",
            snapshot.virtual_time,
            snapshot.absolute_time,
            snapshot.progress,
            entries.len(),
            payloads.pose.is_some(),
            payloads.image.is_some()
        );
        recorder.push(PlaybackEvent::frame(
            &snapshot,
            &entries,
            payloads,
            args.with_data,
        ));
        if !snapshot.is_playing {
            break;
        }
    }
    session.pause();
    let last = session.snapshot();
    recorder.push(PlaybackEvent::clock(&last));
    println!(
        "done t_ms={} loops={} events={}",
        last.virtual_time,
        loops.get(),
        recorder.len()
    );

    if let Some(path) = &args.events_json {
        let json = serde_json::to_string_pretty(&recorder.events)?;
        fs::write(path, json)?;
        eprintln!("wrote playback events to {}", path.display());
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
