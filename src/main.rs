//! revbox - realtime engine sound simulator.
//!
//! Usage:
//!   revbox --assets DIR [--script FILE] [--profile NAME] [--seconds N]
//!          [--latency MS] [--gain G] [--verbose | --quiet]
//!
//! Without a throttle script no hardware is attached and the throttle
//! reads 0.0, so the engine stays off.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use std::{env, fs};

use log::LevelFilter;
use rb_master::{
    load_profiles, LogSink, NoButton, Runtime, ScriptedButton, ScriptedThrottle, SimConfig, SimError,
    Simulator, ThrottleScript, Unavailable,
};
use simple_logger::SimpleLogger;

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn log_level(args: &[String]) -> LevelFilter {
    if args.iter().any(|a| a == "--verbose") {
        LevelFilter::Debug
    } else if args.iter().any(|a| a == "--quiet") {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if let Err(e) = SimpleLogger::new().with_level(log_level(&args)).env().init() {
        eprintln!("logger: {}", e);
    }
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), SimError> {
    let assets = PathBuf::from(flag_value(args, "--assets").unwrap_or("assets"));

    let mut config = SimConfig::default();
    if let Some(name) = flag_value(args, "--profile") {
        if !config.start_with(name) {
            return Err(SimError::UnknownProfile(name.to_string()));
        }
    }
    if let Some(ms) = flag_value(args, "--latency").and_then(|v| v.parse().ok()) {
        config.latency_ms = ms;
    }
    if let Some(gain) = flag_value(args, "--gain").and_then(|v| v.parse().ok()) {
        config.master_gain = gain;
    }

    let script = match flag_value(args, "--script") {
        Some(path) => Some(ThrottleScript::parse(&fs::read_to_string(path)?)?),
        None => None,
    };
    let limit = flag_value(args, "--seconds")
        .and_then(|v| v.parse::<f32>().ok())
        .or_else(|| script.as_ref().map(|s| s.duration() + 1.0));

    let (profiles, clips) = load_profiles(&assets, &config.rotation)?;
    let calibration = config.calibration;
    let simulator = match script {
        Some(script) => {
            let button = ScriptedButton::new(script.presses.clone());
            Simulator::initialize(
                config,
                profiles,
                clips,
                Box::new(ScriptedThrottle::new(script, calibration)),
                Box::new(button),
                Box::new(LogSink::new(30)),
            )?
        }
        None => {
            log::warn!("no throttle script given; throttle reads 0.0");
            Simulator::initialize(
                config,
                profiles,
                clips,
                Box::new(Unavailable),
                Box::new(NoButton),
                Box::new(LogSink::new(30)),
            )?
        }
    };

    let mut runtime = Runtime::start(simulator);
    let started = Instant::now();
    while !runtime.is_finished() {
        if limit.is_some_and(|secs| started.elapsed().as_secs_f32() >= secs) {
            runtime.request_stop();
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    if let Some(sim) = runtime.stop() {
        let s = sim.snapshot();
        log::info!("stopped in {} / {} after {} ticks", s.profile, s.state, sim.ticks());
    }
    Ok(())
}
