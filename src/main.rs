//! Headless streaming simulator.
//!
//! Walks an observer along a world's path and logs every segment transition.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --manifest <PATH>       World manifest JSON (default: built-in demo world)
//!   --dt <SECONDS>          Fixed tick length (default: 0.05)
//!   --ticks <N>             Stop after N ticks (default: end of path)
//!   --unlock <FLAG>@<T>     Set FLAG true at simulated time T (repeatable)
//!   --realtime              Sleep between ticks
//!   --debug-port <PORT>     Start the TCP debug server (implies --realtime)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use segstream::core::logging;
use segstream::core::types::Vec3;
use segstream::flags::FlagStore;
use segstream::streaming::{
    ContentHost, Namespace, ProximityStreamer, RecordingHost, SegmentDef, StreamingConfig,
    StreamingStats, TriggerSet,
};
use segstream::world::WorldManifest;
use segstream::Result;

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let manifest = match parse_str_arg(args, "--manifest") {
        Some(path) => WorldManifest::load(&PathBuf::from(path))?,
        None => {
            log::info!("No --manifest given, using the built-in demo world");
            demo_manifest()
        }
    };

    let dt = parse_f32_arg(args, "--dt").unwrap_or(0.05);
    let max_ticks = parse_u64_arg(args, "--ticks");
    let unlocks = parse_unlocks(args);
    let debug_port = parse_u16_arg(args, "--debug-port");
    let realtime = has_flag(args, "--realtime") || debug_port.is_some();

    for (from, to) in manifest.dangling_adjacency() {
        log::warn!("Segment '{}' lists unknown neighbour '{}'", from, to);
    }

    let registry = manifest.registry()?;
    let mut triggers = TriggerSet::from_registry(&registry);
    let flags = FlagStore::shared();
    let mut streamer = ProximityStreamer::new(
        manifest.streaming.clone(),
        registry,
        flags.clone(),
        RecordingHost::new(),
    )?;

    // Debug server runs on its own runtime; commands are applied between ticks
    let debug_state = Arc::new(Mutex::new(SharedDebugState::default()));
    let runtime = match debug_port {
        Some(_) => Some(tokio::runtime::Runtime::new()?),
        None => None,
    };
    let _server = match (&runtime, debug_port) {
        (Some(rt), Some(port)) => {
            let _guard = rt.enter();
            let handler: Arc<tokio::sync::Mutex<dyn segstream_debug::DebugHandler>> =
                Arc::new(tokio::sync::Mutex::new(AppDebugHandler {
                    state: debug_state.clone(),
                }));
            Some(segstream_debug::DebugServer::start(handler, port))
        }
        _ => None,
    };

    let path_duration = manifest.path_duration();
    log::info!(
        "Simulating '{}': {} triggers, path {:.1}s, dt {}",
        manifest.name,
        triggers.len(),
        path_duration,
        dt
    );

    let mut applied = vec![false; unlocks.len()];
    let mut observer_override: Option<Vec3> = None;
    let mut time = 0.0f32;
    let mut tick = 0u64;

    loop {
        match max_ticks {
            Some(n) if tick >= n => break,
            None if debug_port.is_none() && time > path_duration => break,
            _ => {}
        }

        // Between ticks: narrative unlocks, debug commands, trigger volumes
        for (i, (flag, at)) in unlocks.iter().enumerate() {
            if !applied[i] && time >= *at {
                log::info!("t={:.2}: unlock '{}'", time, flag);
                flags.write().set_flag(flag.as_str(), true);
                applied[i] = true;
            }
        }

        let pending = std::mem::take(&mut debug_state.lock().pending);
        for command in pending {
            apply_command(command, &mut streamer, &mut observer_override);
        }

        let observer = observer_override
            .or_else(|| manifest.observer_at(time))
            .unwrap_or(Vec3::ZERO);

        let eager = triggers.dispatch(observer, &mut streamer);
        if eager > 0 {
            log::info!("t={:.2}: trigger eagerly loaded {} segments", time, eager);
        }

        let stats = streamer.update(observer, dt);
        if has_transitions(&stats) {
            log::info!(
                "t={:.2} observer=({:.1}, {:.1}, {:.1}): +{} loaded, +{} preloaded, -{} unloaded, {} gated, {} live",
                time,
                observer.x,
                observer.y,
                observer.z,
                stats.loaded,
                stats.preloaded,
                stats.unloaded,
                stats.gated,
                streamer.live_instance_count()
            );
        }

        if debug_port.is_some() {
            debug_state.lock().publish(&streamer);
        }

        time += dt;
        tick += 1;

        if realtime {
            std::thread::sleep(Duration::from_secs_f32(dt.max(0.001)));
        }
    }

    let host = streamer.host();
    log::info!(
        "Done after {} ticks: {} instantiated, {} destroyed, {} visibility changes, {} live, {} visited",
        tick,
        host.instantiate_calls,
        host.destroy_calls,
        host.visibility_calls,
        streamer.live_instance_count(),
        flags.read().visited_count()
    );

    streamer.unload_all();
    Ok(())
}

fn has_transitions(stats: &StreamingStats) -> bool {
    stats.loaded + stats.preloaded + stats.unloaded + stats.promoted > 0
}

/// Built-in world: a corridor of rooms with gated memory vignettes
fn demo_manifest() -> WorldManifest {
    let rooms = 10;
    let core = (0..rooms)
        .map(|i| {
            let mut def = SegmentDef::new(
                format!("room{}", i),
                format!("rooms/room{}", i),
                Vec3::new(i as f32 * 15.0, 0.0, 0.0),
            )
            .with_trigger(Vec3::new(7.5, 4.0, 6.0));
            if i + 1 < rooms {
                def = def.with_adjacency([format!("room{}", i + 1)]);
            }
            def
        })
        .collect();

    let memory = vec![
        SegmentDef::new("first_light", "memories/first_light", Vec3::new(20.0, 0.0, 12.0)),
        SegmentDef::new("the_letter", "memories/the_letter", Vec3::new(65.0, 0.0, -10.0))
            .with_required_flag("found_letter"),
        SegmentDef::new("the_river", "memories/the_river", Vec3::new(110.0, 0.0, 8.0))
            .with_required_flag("crossed_bridge"),
    ];

    WorldManifest {
        name: "demo".to_string(),
        streaming: StreamingConfig::default(),
        core,
        memory,
        observer_path: vec![Vec3::ZERO, Vec3::new(140.0, 0.0, 0.0)],
        observer_speed: 6.0,
    }
}

// --- Debug server bridge ---

enum PendingCommand {
    MoveObserver(Vec3),
    SetFlag(String, bool),
    Enter(Namespace, String),
    Activate(Namespace, String),
}

fn apply_command<H: ContentHost>(
    command: PendingCommand,
    streamer: &mut ProximityStreamer<H>,
    observer_override: &mut Option<Vec3>,
) {
    match command {
        PendingCommand::MoveObserver(pos) => *observer_override = Some(pos),
        PendingCommand::SetFlag(name, value) => streamer.flags().write().set_flag(name, value),
        PendingCommand::Enter(namespace, id) => {
            streamer.on_observer_enter(&id, namespace);
        }
        PendingCommand::Activate(namespace, id) => {
            streamer.activate(&id, namespace);
        }
    }
}

/// State shared between the debug server and the tick loop
#[derive(Default)]
struct SharedDebugState {
    pending: Vec<PendingCommand>,
    observer: [f32; 3],
    tick: u64,
    segments: Vec<segstream_debug::SegmentInfo>,
    flags: Vec<segstream_debug::FlagInfo>,
    visited: Vec<String>,
    stats: segstream_debug::StatsInfo,
}

impl SharedDebugState {
    fn publish<H: ContentHost>(&mut self, streamer: &ProximityStreamer<H>) {
        let observer = streamer.observer();
        self.observer = observer.to_array();
        self.tick = streamer.tick_count();
        self.segments = streamer
            .snapshot()
            .into_iter()
            .map(|s| segstream_debug::SegmentInfo {
                namespace: s.namespace.to_string(),
                id: s.id,
                state: s.state.as_str().to_string(),
                distance: s.distance,
                required_flag: s.required_flag,
                eligible: s.eligible,
            })
            .collect();

        let flags = streamer.flags().read();
        self.flags = flags
            .flags()
            .map(|(name, value)| segstream_debug::FlagInfo {
                name: name.to_string(),
                value,
            })
            .collect();
        self.flags.sort_by(|a, b| a.name.cmp(&b.name));
        self.visited = flags.visited().map(str::to_string).collect();
        self.visited.sort();

        let stats = streamer.last_stats();
        self.stats = segstream_debug::StatsInfo {
            tick: self.tick,
            loaded: stats.loaded,
            preloaded: stats.preloaded,
            unloaded: stats.unloaded,
            promoted: stats.promoted,
            gated: stats.gated,
            preload_pass: stats.preload_pass,
            live_instances: streamer.live_instance_count() as u32,
        };
    }
}

struct AppDebugHandler {
    state: Arc<Mutex<SharedDebugState>>,
}

impl segstream_debug::DebugHandler for AppDebugHandler {
    fn handle_command(
        &mut self,
        cmd: segstream_debug::DebugCommand,
    ) -> segstream_debug::DebugResponse {
        use segstream_debug::*;

        let mut s = self.state.lock();
        match cmd {
            DebugCommand::Ping => DebugResponse::pong(),
            DebugCommand::GetObserver => DebugResponse::ok(ResponseData::Observer {
                position: s.observer,
                tick: s.tick,
            }),
            DebugCommand::MoveObserver { x, y, z } => {
                s.pending.push(PendingCommand::MoveObserver(Vec3::new(x, y, z)));
                DebugResponse::queued(format!("observer -> ({}, {}, {})", x, y, z))
            }
            DebugCommand::GetSegments { namespace } => {
                let filter = match namespace.map(|ns| ns.parse::<Namespace>()).transpose() {
                    Ok(filter) => filter,
                    Err(e) => return DebugResponse::error(e.to_string()),
                };
                let segments = s
                    .segments
                    .iter()
                    .filter(|seg| filter.is_none_or(|ns| seg.namespace == ns.as_str()))
                    .cloned()
                    .collect();
                DebugResponse::ok(ResponseData::Segments { segments })
            }
            DebugCommand::GetSegment { namespace, id } => {
                let ns = match namespace.parse::<Namespace>() {
                    Ok(ns) => ns,
                    Err(e) => return DebugResponse::error(e.to_string()),
                };
                match s.segments.iter().find(|seg| seg.namespace == ns.as_str() && seg.id == id) {
                    Some(segment) => DebugResponse::ok(ResponseData::Segment {
                        segment: segment.clone(),
                    }),
                    None => DebugResponse::error(format!("No {} segment '{}'", ns, id)),
                }
            }
            DebugCommand::SetFlag { name, value } => {
                let description = format!("{} = {}", name, value);
                s.pending.push(PendingCommand::SetFlag(name, value));
                DebugResponse::queued(description)
            }
            DebugCommand::GetFlags => DebugResponse::ok(ResponseData::Flags {
                flags: s.flags.clone(),
                visited: s.visited.clone(),
            }),
            DebugCommand::EnterSegment { namespace, id } => match namespace.parse::<Namespace>() {
                Ok(ns) => {
                    let description = format!("enter {} '{}'", ns, id);
                    s.pending.push(PendingCommand::Enter(ns, id));
                    DebugResponse::queued(description)
                }
                Err(e) => DebugResponse::error(e.to_string()),
            },
            DebugCommand::ActivateSegment { namespace, id } => {
                match namespace.parse::<Namespace>() {
                    Ok(ns) => {
                        let description = format!("activate {} '{}'", ns, id);
                        s.pending.push(PendingCommand::Activate(ns, id));
                        DebugResponse::queued(description)
                    }
                    Err(e) => DebugResponse::error(e.to_string()),
                }
            }
            DebugCommand::GetStats => DebugResponse::ok(ResponseData::Stats {
                stats: s.stats.clone(),
            }),
        }
    }
}

// --- Argument parsing ---

fn parse_str_arg(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_f32_arg(args: &[String], name: &str) -> Option<f32> {
    parse_str_arg(args, name).and_then(|s| s.parse().ok())
}

fn parse_u64_arg(args: &[String], name: &str) -> Option<u64> {
    parse_str_arg(args, name).and_then(|s| s.parse().ok())
}

fn parse_u16_arg(args: &[String], name: &str) -> Option<u16> {
    parse_str_arg(args, name).and_then(|s| s.parse().ok())
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

/// Collect every `--unlock FLAG@TIME` pair
fn parse_unlocks(args: &[String]) -> Vec<(String, f32)> {
    args.windows(2)
        .filter(|w| w[0] == "--unlock")
        .filter_map(|w| {
            let (flag, at) = w[1].split_once('@')?;
            match at.parse::<f32>() {
                Ok(at) if !flag.is_empty() => Some((flag.to_string(), at)),
                _ => {
                    log::warn!("Ignoring malformed --unlock '{}'", w[1]);
                    None
                }
            }
        })
        .collect()
}
