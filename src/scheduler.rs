//! Fixed-rate simulation loop
//!
//! The [`World`] lives on one dedicated thread that ticks at 60 Hz. Other
//! threads reach it only through channels:
//! - an unbounded FIFO request queue (actions and state queries)
//! - a single-slot response channel for synchronous state queries
//!
//! Each tick the loop drains every queued request, advances physics once,
//! publishes the resulting snapshot for stream subscribers and sleeps for
//! the rest of the tick budget.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError, TrySendError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::consts::{SIM_DT, STREAM_BUFFER, STREAM_INTERVAL, TICK_INTERVAL};
use crate::error::{Error, Result};
use crate::protocol::{Action, FullSnapshot, StateResponse, StreamMessage};
use crate::settings::{Arena, WorldConfig};
use crate::sim::World;

/// Work queued for the simulation thread
#[derive(Debug)]
enum Request {
    Action { robot: usize, action: Action },
    State { robot: Option<usize> },
}

/// Latest snapshot published by the loop after each tick
type SnapshotSlot = Arc<RwLock<FullSnapshot>>;

/// A running simulation.
///
/// Dropping this and every [`SimHandle`] stops the loop after its current tick.
pub struct Simulation {
    handle: SimHandle,
    constants: Arena,
    published: SnapshotSlot,
    /// Cleared when the loop exits; stream subscribers stop with it
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl Simulation {
    /// Build the world and start ticking it on a new thread
    pub fn start(config: &WorldConfig) -> Result<Self> {
        let world = World::new(config)?;
        let constants = world.constants().clone();
        let robot_count = world.robot_count();
        let published: SnapshotSlot = Arc::new(RwLock::new(world.snapshot()));

        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::sync_channel(1);

        let running = Arc::new(AtomicBool::new(true));

        let slot = Arc::clone(&published);
        let alive = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("bbr-sim".into())
            .spawn(move || run_loop(world, request_rx, response_tx, slot, alive))?;

        log::info!("Simulation started: {robot_count} robots at 60 Hz");

        Ok(Self {
            handle: SimHandle {
                requests: request_tx,
                responses: Arc::new(Mutex::new(response_rx)),
                query_in_flight: Arc::new(AtomicBool::new(false)),
                robot_count,
            },
            constants,
            published,
            running,
            thread,
        })
    }

    /// A new handle for submitting actions and queries from any thread
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    pub fn constants(&self) -> &Arena {
        &self.constants
    }

    /// The snapshot published after the most recent tick
    pub fn snapshot(&self) -> Result<FullSnapshot> {
        read_slot(&self.published)
    }

    /// Start streaming: one [`StreamMessage::Constants`], then
    /// [`StreamMessage::State`] frames at ~30 Hz until the receiver is dropped
    /// or the loop exits, which disconnects the receiver.
    ///
    /// Frames are dropped, never queued without bound, while the receiver lags.
    pub fn subscribe(&self) -> Result<Receiver<StreamMessage>> {
        let (tx, rx) = mpsc::sync_channel(STREAM_BUFFER);
        let constants = self.constants.clone();
        let slot = Arc::clone(&self.published);
        let running = Arc::clone(&self.running);
        thread::Builder::new()
            .name("bbr-stream".into())
            .spawn(move || stream_loop(constants, slot, running, tx))?;
        log::info!("Stream subscriber connected");
        Ok(rx)
    }

    /// Drop this simulation's handle and wait for the loop to exit.
    ///
    /// Blocks until every cloned [`SimHandle`] is gone as well.
    pub fn stop(self) -> Result<()> {
        let Self { handle, thread, .. } = self;
        drop(handle);
        thread.join().map_err(|_| Error::SimulationStopped)
    }
}

/// Cloneable sender side of a running simulation
#[derive(Clone)]
pub struct SimHandle {
    requests: Sender<Request>,
    responses: Arc<Mutex<Receiver<Result<StateResponse>>>>,
    query_in_flight: Arc<AtomicBool>,
    robot_count: usize,
}

impl SimHandle {
    pub fn robot_count(&self) -> usize {
        self.robot_count
    }

    fn check_robot(&self, index: usize) -> Result<()> {
        if index < self.robot_count {
            Ok(())
        } else {
            Err(Error::InvalidIndex {
                index,
                count: self.robot_count,
            })
        }
    }

    /// Queue an action for a robot. Never blocks; applied before the next tick.
    pub fn submit_action(&self, robot: usize, action: Action) -> Result<()> {
        self.check_robot(robot)?;
        self.requests
            .send(Request::Action { robot, action })
            .map_err(|_| Error::SimulationStopped)
    }

    /// Ask the loop for one robot's vision, or the full snapshot for `None`.
    ///
    /// Blocks for up to about one tick. Only one query may be outstanding
    /// across all handles; a concurrent second one fails with [`Error::QueryBusy`].
    pub fn query_state(&self, robot: Option<usize>) -> Result<StateResponse> {
        if let Some(index) = robot {
            self.check_robot(index)?;
        }

        if self
            .query_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::QueryBusy);
        }
        let _in_flight = ClearOnDrop(&self.query_in_flight);

        self.requests
            .send(Request::State { robot })
            .map_err(|_| Error::SimulationStopped)?;

        let responses = self.responses.lock().map_err(|_| Error::SimulationStopped)?;
        responses.recv().map_err(|_| Error::SimulationStopped)?
    }
}

/// Clears a flag when dropped, on every exit path
struct ClearOnDrop<'a>(&'a AtomicBool);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn read_slot(slot: &SnapshotSlot) -> Result<FullSnapshot> {
    slot.read()
        .map(|snapshot| snapshot.clone())
        .map_err(|_| Error::SimulationStopped)
}

fn run_loop(
    mut world: World,
    requests: Receiver<Request>,
    responses: SyncSender<Result<StateResponse>>,
    published: SnapshotSlot,
    running: Arc<AtomicBool>,
) {
    let _running = ClearOnDrop(&running);
    loop {
        let started = Instant::now();

        // Drain everything queued so far; no per-tick cap
        loop {
            match requests.try_recv() {
                Ok(request) => handle_request(&mut world, request, &responses),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::info!("All handles dropped, stopping at tick {}", world.time_ticks());
                    return;
                }
            }
        }

        world.tick(SIM_DT);

        match published.write() {
            Ok(mut slot) => *slot = world.snapshot(),
            Err(_) => {
                log::error!("Snapshot slot poisoned, stopping simulation");
                return;
            }
        }

        let elapsed = started.elapsed();
        match TICK_INTERVAL.checked_sub(elapsed) {
            Some(rest) => thread::sleep(rest),
            None => log::warn!(
                "Tick {} took {:?}, over the {:?} budget",
                world.time_ticks(),
                elapsed,
                TICK_INTERVAL
            ),
        }
    }
}

fn handle_request(world: &mut World, request: Request, responses: &SyncSender<Result<StateResponse>>) {
    match request {
        Request::Action { robot, action } => {
            if let Err(err) = world.apply_action(robot, &action) {
                log::warn!("Rejected action: {err}");
            }
        }
        Request::State { robot } => {
            // The slot is free: at most one query is ever outstanding
            if let Err(TrySendError::Full(_)) = responses.try_send(world.state(robot)) {
                log::warn!("Dropped state response, previous one was never collected");
            }
        }
    }
}

fn stream_loop(
    constants: Arena,
    slot: SnapshotSlot,
    running: Arc<AtomicBool>,
    tx: SyncSender<StreamMessage>,
) {
    let mut message = StreamMessage::Constants(constants);
    loop {
        if !running.load(Ordering::Acquire) {
            log::info!("Simulation stopped, closing stream");
            return;
        }

        match tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::trace!("Subscriber lagging, frame dropped"),
            Err(TrySendError::Disconnected(_)) => {
                log::info!("Stream subscriber disconnected");
                return;
            }
        }

        thread::sleep(STREAM_INTERVAL);

        message = match read_slot(&slot) {
            Ok(snapshot) => StreamMessage::State(snapshot),
            Err(err) => {
                log::warn!("Stream stopped: {err}");
                return;
            }
        };
    }
}
