//! Realtime audio thread and offline rendering.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use rb_audio::{AudioOutput, CpalOutput};
use rb_engine::Frame;

use crate::simulator::Simulator;

/// Handle to a simulator running on its own audio thread.
pub struct Runtime {
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    thread: Option<JoinHandle<Simulator>>,
}

impl Runtime {
    /// Open the default output device and tick `simulator` against it.
    pub fn start(simulator: Simulator) -> Self {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let stop = stop_signal.clone();
        let done = finished.clone();
        let counter = ticks.clone();

        let thread = std::thread::spawn(move || {
            let mut simulator = simulator;
            audio_thread(&mut simulator, &stop, &counter);
            done.store(true, Ordering::Relaxed);
            simulator
        });

        Self {
            stop_signal,
            finished,
            ticks,
            thread: Some(thread),
        }
    }

    /// Ask for an orderly shutdown without waiting.
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::Relaxed);
    }

    /// Shut down, wait for the fade to finish and hand the simulator back.
    pub fn stop(&mut self) -> Option<Simulator> {
        self.request_stop();
        let handle = self.thread.take()?;
        match handle.join() {
            Ok(simulator) => Some(simulator),
            Err(_) => {
                log::error!("audio thread panicked outside a tick");
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.stop();
    }
}

fn audio_thread(simulator: &mut Simulator, stop: &AtomicBool, ticks: &AtomicU64) {
    let latency = simulator.config().latency_ms;
    let (mut output, consumer) = match CpalOutput::new(latency) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("{}", e);
            return;
        }
    };
    if output.sample_rate() != simulator.config().sample_rate {
        log::warn!(
            "device runs at {} Hz, rendering at {} Hz",
            output.sample_rate(),
            simulator.config().sample_rate
        );
    }
    if let Err(e) = output.build_stream(consumer).and_then(|_| output.start()) {
        log::error!("{}", e);
        return;
    }

    run(simulator, &mut output, stop, ticks);

    if let Err(e) = output.stop() {
        log::warn!("{}", e);
    }
    log::info!("audio thread done after {} ticks, {} underruns", ticks.load(Ordering::Relaxed), output.underruns());
}

/// Tick, render and write blocks until the simulator has shut down.
///
/// Setting `stop` starts the shutdown fade. A panic inside a tick is
/// logged and treated the same way; a second one silences everything.
pub fn run<O: AudioOutput>(simulator: &mut Simulator, output: &mut O, stop: &AtomicBool, ticks: &AtomicU64) {
    let mut block = vec![Frame::silence(); simulator.frames_per_tick()];
    let mut faults = 0u32;

    while !simulator.is_finished() {
        if stop.load(Ordering::Relaxed) && !simulator.is_shutting_down() {
            simulator.shutdown();
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| step_block(simulator, &mut block)));
        if let Err(payload) = result {
            faults += 1;
            log::error!("tick fault: {}", panic_message(payload.as_ref()));
            if faults > 1 {
                simulator.halt();
                break;
            }
            simulator.shutdown();
            block.fill(Frame::silence());
        }

        output.write(&block);
        ticks.fetch_add(1, Ordering::Relaxed);
    }

    block.fill(Frame::silence());
    output.write(&block);
}

#[cfg(not(feature = "alloc_check"))]
fn step_block(simulator: &mut Simulator, block: &mut [Frame]) {
    simulator.step();
    simulator.render(block);
}

#[cfg(feature = "alloc_check")]
fn step_block(simulator: &mut Simulator, block: &mut [Frame]) {
    assert_no_alloc::assert_no_alloc(|| {
        simulator.step();
        simulator.render(block);
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// Render `seconds` of audio without a device. Stops early once a
/// shutdown completes.
pub fn render_offline(simulator: &mut Simulator, seconds: f32) -> Vec<Frame> {
    let tick_rate = simulator.config().tick_rate as f32;
    let ticks = (seconds.max(0.0) * tick_rate).ceil() as usize;
    let mut block = vec![Frame::silence(); simulator.frames_per_tick()];
    let mut frames = Vec::with_capacity(ticks * block.len());

    for _ in 0..ticks {
        simulator.step();
        simulator.render(&mut block);
        frames.extend_from_slice(&block);
        if simulator.is_finished() {
            break;
        }
    }
    frames
}
