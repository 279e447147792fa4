//! clock-runner: headless driver for the game time core.
//!
//! Usage:
//!   clock-runner --seconds 30 --frame-ms 16 --speed normal
//!   clock-runner --seconds 5 --speed very_fast --jitter --seed 7
//!   clock-runner --realtime --seconds 3 --speed fast
//!   clock-runner --ipc-mode --db saves.db --destination
//!
//! `--destination` gives the demo traveller a pending destination, so the
//! first unpause starts the journey.
//!
//! IPC commands, one JSON object per line:
//!   {"type":"get_state"}  {"type":"frame","delta_ms":16}
//!   {"type":"set_speed","speed":"fast"}  {"type":"toggle"}
//!   {"type":"clock","command":{"cmd":"skip_minutes","minutes":60}}
//!   {"type":"save","slot":"a"}  {"type":"load","slot":"a"}
//!   {"type":"slots"}  {"type":"quit"}

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::cell::Cell;
use std::env;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tradecraft_core::{
    cascade::CascadeSlot,
    command::ClockCommand,
    config::EngineConfig,
    engine::GameEngine,
    error::SimResult,
    scheduler::ManualFrameScheduler,
    store::SaveStore,
    subsystem::{TickContext, Tickable, TravelHook},
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Frame { delta_ms: f64 },
    SetSpeed { speed: String },
    Toggle,
    Clock { command: ClockCommand },
    Save { slot: String },
    Load { slot: String },
    Slots,
    Quit,
}

/// Stand-in for a dependent game system: counts the ticks it receives.
struct DemoSystem {
    name:  &'static str,
    ticks: Rc<Cell<u64>>,
}

impl Tickable for DemoSystem {
    fn name(&self) -> &'static str { self.name }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        self.ticks.set(self.ticks.get() + 1);
        log::trace!("{}: tick at {:02}:{:02}", self.name, ctx.clock.hour(), ctx.clock.minute());
        Ok(())
    }

    fn daily_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        self.ticks.set(self.ticks.get() + 1);
        log::info!(
            "{}: daily run for {}-{:02}-{:02}",
            self.name,
            ctx.clock.year(),
            ctx.clock.month(),
            ctx.clock.day()
        );
        Ok(())
    }
}

struct DemoTravel {
    pending:    bool,
    travelling: bool,
}

impl TravelHook for DemoTravel {
    fn is_travelling(&self) -> bool { self.travelling }
    fn has_pending_destination(&self) -> bool { self.pending }

    fn resume_or_auto_start(&mut self) {
        log::info!("travel: departing for pending destination");
        self.pending = false;
        self.travelling = true;
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seconds = parse_arg(&args, "--seconds", 30.0f64);
    let frame_ms = parse_arg(&args, "--frame-ms", 16.0f64);
    let seed = parse_arg(&args, "--seed", 42u64);
    let ipc_mode = has_flag(&args, "--ipc-mode");
    let jitter = has_flag(&args, "--jitter");
    let realtime = has_flag(&args, "--realtime");
    let speed = string_arg(&args, "--speed").unwrap_or("normal");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");

    let config = EngineConfig::load(data_dir)?;
    let mut engine = GameEngine::new(config)?;
    let counters = register_demo_systems(&mut engine);
    engine.set_travel_hook(Box::new(DemoTravel {
        pending:    has_flag(&args, "--destination"),
        travelling: false,
    }));

    let store = SaveStore::open(db)?;
    store.migrate()?;

    if ipc_mode {
        return run_ipc_loop(&mut engine, &store);
    }

    println!("Tradecraft clock-runner");
    println!("  seconds:   {seconds}");
    println!("  frame_ms:  {frame_ms}");
    println!("  speed:     {speed}");
    println!("  jitter:    {jitter} (seed {seed})");
    println!("  realtime:  {realtime}");
    println!("  start:     {}", engine.info().formatted);
    println!();

    engine.set_mode_str(speed)?;
    let mut frames = ManualFrameScheduler::new();
    engine.start(&mut frames);

    if realtime {
        run_realtime(&mut engine, &mut frames, seconds, frame_ms);
    } else {
        run_simulated(&mut engine, &mut frames, seconds, frame_ms, jitter.then_some(seed));
    }
    engine.stop(&mut frames);

    print_summary(&engine, &counters);
    Ok(())
}

fn register_demo_systems(engine: &mut GameEngine) -> Vec<(&'static str, Rc<Cell<u64>>)> {
    CascadeSlot::ALL
        .iter()
        .map(|slot| {
            let ticks = Rc::new(Cell::new(0));
            engine.register(*slot, Box::new(DemoSystem { name: slot.name(), ticks: Rc::clone(&ticks) }));
            (slot.name(), ticks)
        })
        .collect()
}

/// Feed frames without sleeping. With a seed, frame lengths vary
/// randomly around `frame_ms`.
fn run_simulated(
    engine: &mut GameEngine,
    frames: &mut ManualFrameScheduler,
    seconds: f64,
    frame_ms: f64,
    jitter_seed: Option<u64>,
) {
    let mut rng = jitter_seed.map(Pcg64Mcg::seed_from_u64);
    let budget_ms = seconds * 1000.0;
    let mut elapsed_ms = 0.0;

    while elapsed_ms < budget_ms {
        let mut delta = frame_ms;
        if let Some(rng) = rng.as_mut() {
            delta *= rng.gen_range(0.25..4.0);
        }
        delta = delta.min(budget_ms - elapsed_ms);
        match frames.fire(engine, delta) {
            Some(outcome) => elapsed_ms += delta.max(outcome.delta_ms),
            None => break,
        }
    }
}

/// Drive frames from the wall clock, sleeping between them.
fn run_realtime(engine: &mut GameEngine, frames: &mut ManualFrameScheduler, seconds: f64, frame_ms: f64) {
    let started = Instant::now();
    let mut last = started;
    let frame = Duration::from_secs_f64(frame_ms.max(1.0) / 1000.0);

    while started.elapsed().as_secs_f64() < seconds {
        std::thread::sleep(frame);
        let now = Instant::now();
        let delta_ms = now.duration_since(last).as_secs_f64() * 1000.0;
        last = now;
        if frames.fire(engine, delta_ms).is_none() {
            break;
        }
    }
}

fn run_ipc_loop(engine: &mut GameEngine, store: &SaveStore) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if handle.read_line(&mut buffer)? == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = match handle_ipc(engine, store, cmd) {
            Ok(reply) => reply,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_ipc(engine: &mut GameEngine, store: &SaveStore, cmd: IpcCommand) -> Result<serde_json::Value> {
    match cmd {
        IpcCommand::GetState | IpcCommand::Quit => {}
        IpcCommand::Frame { delta_ms } => { engine.frame(delta_ms); }
        IpcCommand::SetSpeed { speed } => { engine.set_mode_str(&speed)?; }
        IpcCommand::Toggle => { engine.toggle(); }
        IpcCommand::Clock { command } => engine.apply_command(command)?,
        IpcCommand::Save { slot } => {
            let save_id = store.write_slot(&slot, &engine.save_data())?;
            return Ok(serde_json::json!({ "saved": slot, "save_id": save_id }));
        }
        IpcCommand::Load { slot } => match store.read_slot(&slot, &engine.config().epoch)? {
            Some(data) => engine.load_save_data(&data),
            None => anyhow::bail!("no save in slot '{slot}'"),
        },
        IpcCommand::Slots => return Ok(serde_json::to_value(store.list_slots()?)?),
    }
    Ok(serde_json::to_value(engine.info())?)
}

fn print_summary(engine: &GameEngine, counters: &[(&'static str, Rc<Cell<u64>>)]) {
    let info = engine.info();
    println!("=== RUN SUMMARY ===");
    println!("  final time:     {}", info.formatted);
    println!("  season:         {}", info.season);
    println!("  game minutes:   {}", info.minutes_elapsed);
    println!("  cascade runs:   {}", engine.ticks_fired());
    println!("  speed:          {}", info.speed);
    println!();
    println!("=== CASCADE STEPS ===");
    for stat in engine.cascade().step_stats() {
        let seen = counters
            .iter()
            .find(|(name, _)| *name == stat.name)
            .map(|(_, c)| c.get())
            .unwrap_or(0);
        println!(
            "  {:<24} runs: {:>6}  failures: {:>3}  observed: {:>6}",
            stat.name, stat.runs, stat.failures, seen
        );
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradecraft_core::speed::SpeedMode;

    fn send(engine: &mut GameEngine, store: &SaveStore, line: &str) -> serde_json::Value {
        let cmd: IpcCommand = serde_json::from_str(line).expect("valid command");
        handle_ipc(engine, store, cmd).expect("command succeeds")
    }

    #[test]
    fn ipc_toggle_flips_pause() {
        let mut engine = GameEngine::new(EngineConfig::default()).expect("default config");
        let store = SaveStore::in_memory().expect("store");
        store.migrate().expect("migration");

        let reply = send(&mut engine, &store, r#"{"type":"toggle"}"#);
        assert_eq!(engine.speed().mode(), SpeedMode::Normal);
        assert_eq!(reply["isPaused"], false);

        send(&mut engine, &store, r#"{"type":"toggle"}"#);
        assert!(engine.speed().is_paused());
    }

    #[test]
    fn ipc_clock_skip_and_slots() {
        let mut engine = GameEngine::new(EngineConfig::default()).expect("default config");
        let store = SaveStore::in_memory().expect("store");
        store.migrate().expect("migration");

        send(&mut engine, &store, r#"{"type":"clock","command":{"cmd":"skip_minutes","minutes":60}}"#);
        assert_eq!(engine.clock().hour(), 9);

        let huge: IpcCommand =
            serde_json::from_str(r#"{"type":"clock","command":{"cmd":"skip_minutes","minutes":18446744073709551615}}"#)
                .expect("valid command");
        assert!(handle_ipc(&mut engine, &store, huge).is_err());

        send(&mut engine, &store, r#"{"type":"save","slot":"a"}"#);
        let slots = send(&mut engine, &store, r#"{"type":"slots"}"#);
        assert_eq!(slots.as_array().map(Vec::len), Some(1));
    }
}
