//! rb-cli - offline rendering and profile inspection.
//!
//! Usage:
//!   rb-cli --list [--profile NAME]
//!   rb-cli --script FILE --out FILE [--assets DIR | --tones] [--profile NAME]
//!          [--seconds N] [--gain G] [--verbose | --quiet]

use std::path::PathBuf;
use std::{env, fs};

use log::LevelFilter;
use rb_ir::Clip;
use rb_master::{
    build_profiles, frames_to_wav, load_profiles, render_offline, ClipBank, NullSink, ScriptedButton,
    ScriptedThrottle, SimConfig, SimError, Simulator, ThrottleScript, PROFILE_NAMES,
};
use simple_logger::SimpleLogger;

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let level = if has_flag(&args, "--verbose") {
        LevelFilter::Debug
    } else if has_flag(&args, "--quiet") {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("logger: {}", e);
    }

    let result = if has_flag(&args, "--list") {
        list(flag_value(&args, "--profile"))
    } else {
        render(&args)
    };
    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn list(only: Option<&str>) -> Result<(), SimError> {
    for name in PROFILE_NAMES {
        if only.is_some_and(|o| !o.eq_ignore_ascii_case(name)) {
            continue;
        }
        let (dir, clips) = rb_master::profile_assets(name).ok_or_else(|| SimError::UnknownProfile(name.to_string()))?;
        println!("{} ({}/)", name, dir);
        for clip in clips {
            println!("  {}.wav", clip);
        }
    }
    Ok(())
}

/// A 110 Hz tone for every clip the rotation uses.
fn tone_bank(rotation: &[String]) -> Result<ClipBank, SimError> {
    let mut clips = ClipBank::new();
    for name in rotation {
        let (_, names) = rb_master::profile_assets(name).ok_or_else(|| SimError::UnknownProfile(name.clone()))?;
        for clip in names {
            clips.insert(Clip::tone(clip, 2.0, 44100, 110.0));
        }
    }
    Ok(clips)
}

fn render(args: &[String]) -> Result<(), SimError> {
    let (Some(script_path), Some(out)) = (flag_value(args, "--script"), flag_value(args, "--out")) else {
        eprintln!("Usage: rb-cli --script FILE --out FILE [--assets DIR | --tones] [--profile NAME] [--seconds N]");
        eprintln!("       rb-cli --list [--profile NAME]");
        std::process::exit(2);
    };

    let mut config = SimConfig::default();
    if let Some(name) = flag_value(args, "--profile") {
        if !config.start_with(name) {
            return Err(SimError::UnknownProfile(name.to_string()));
        }
    }
    if let Some(gain) = flag_value(args, "--gain").and_then(|v| v.parse().ok()) {
        config.master_gain = gain;
    }

    let script = ThrottleScript::parse(&fs::read_to_string(script_path)?)?;
    let seconds = flag_value(args, "--seconds")
        .and_then(|v| v.parse::<f32>().ok())
        .unwrap_or(script.duration() + 1.0);

    let (profiles, clips) = if has_flag(args, "--tones") {
        let mut clips = tone_bank(&config.rotation)?;
        (build_profiles(&config.rotation, &mut clips)?, clips)
    } else {
        let assets = PathBuf::from(flag_value(args, "--assets").unwrap_or("assets"));
        load_profiles(&assets, &config.rotation)?
    };

    let calibration = config.calibration;
    let sample_rate = config.sample_rate;
    let button = ScriptedButton::new(script.presses.clone());
    let mut sim = Simulator::initialize(
        config,
        profiles,
        clips,
        Box::new(ScriptedThrottle::new(script, calibration)),
        Box::new(button),
        Box::new(NullSink),
    )?;

    println!("Rendering {:.1} s to {} at {} Hz...", seconds, out, sample_rate);
    let frames = render_offline(&mut sim, seconds);
    let wav = frames_to_wav(&frames, sample_rate)?;
    fs::write(out, &wav)?;

    let s = sim.snapshot();
    println!("Rendered {} frames ({} bytes)", frames.len(), wav.len());
    println!("Final: {} in {} at {:.0} rpm", s.profile, s.state, s.rpm);
    Ok(())
}
