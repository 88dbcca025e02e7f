//! Desktop simulator. The main thread owns the watchface and feeds it events
//! one at a time; everything that would be asynchronous on a watch (clock
//! ticks, the phone, the user poking at it) runs on its own thread and posts
//! into one channel.

use crate::{
    companion::Companion,
    config::Config,
    display::TerminalSurface,
    host::{
        BatteryState, Host, LocalTime, SendError, TickUnit, TimerHandle,
        TimerKind,
    },
    message::Record,
    persist::{FileStore, Store},
    watchface::Watchface,
};
use anyhow::{bail, Context};
use chrono::{Local, Timelike};
use itertools::Itertools;
use log::{debug, error, info, trace, warn};
use std::{
    io, mem,
    sync::{
        mpsc::{self, RecvTimeoutError, Sender, SyncSender, TrySendError},
        Arc, RwLock,
    },
    thread,
    time::{Duration, Instant},
};

/// Records the outbox holds before sends start failing with busy
const OUTBOX_CAPACITY: usize = 4;
const COMMANDS: &str = "tap, connect, disconnect, \
    battery <percent> [charging|plugged], fail <reason>, quit";

/// Everything the watchface can be woken up for, besides timers
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Tick(LocalTime),
    Connection(bool),
    Battery(BatteryState),
    Tap,
    /// Record from the phone
    Inbound(Record),
    /// Outbox reported a failure after the hand-off
    SendFailed(SendError),
    Shutdown,
}

/// Tick subscription, shared with the ticker thread
type SharedTickUnit = Arc<RwLock<Option<TickUnit>>>;

#[derive(Debug)]
struct Timer {
    deadline: Instant,
    kind: TimerKind,
    handle: TimerHandle,
}

/// [Host] backed by threads and channels
#[derive(Debug)]
pub struct SimHost {
    next_handle: u64,
    timers: Vec<Timer>,
    outbox: SyncSender<Record>,
    connected: bool,
    tick_unit: SharedTickUnit,
    taps: bool,
    restart_requested: bool,
}

impl SimHost {
    pub fn new(
        outbox: SyncSender<Record>,
        tick_unit: SharedTickUnit,
        connected: bool,
    ) -> Self {
        Self {
            next_handle: 0,
            timers: Vec::new(),
            outbox,
            connected,
            tick_unit,
            taps: false,
            restart_requested: false,
        }
    }

    /// When the earliest pending timer is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|timer| timer.deadline).min()
    }

    /// Remove and return every timer due by `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerKind, TimerHandle)> {
        let (due, pending): (Vec<_>, Vec<_>) = mem::take(&mut self.timers)
            .into_iter()
            .partition(|timer| timer.deadline <= now);
        self.timers = pending;
        due.into_iter()
            .sorted_by_key(|timer| timer.deadline)
            .map(|timer| (timer.kind, timer.handle))
            .collect()
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn taps_enabled(&self) -> bool {
        self.taps
    }

    /// Did the watchface ask to be restarted? Clears the request.
    pub fn take_restart(&mut self) -> bool {
        mem::take(&mut self.restart_requested)
    }

    fn set_tick_unit(&self, unit: Option<TickUnit>) {
        match self.tick_unit.write() {
            Ok(mut guard) => *guard = unit,
            Err(err) => error!("Error updating tick subscription: {err}"),
        }
    }
}

impl Host for SimHost {
    fn schedule(&mut self, kind: TimerKind, after: Duration) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.timers.push(Timer {
            deadline: Instant::now() + after,
            kind,
            handle,
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.retain(|timer| timer.handle != handle);
    }

    fn send(&mut self, record: Record) -> Result<(), SendError> {
        if !self.connected {
            return Err(SendError::NotConnected);
        }
        trace!("Outbox: {record}");
        self.outbox.try_send(record).map_err(|err| match err {
            TrySendError::Full(_) => SendError::Busy,
            TrySendError::Disconnected(_) => SendError::AppNotRunning,
        })
    }

    fn subscribe_ticks(&mut self, unit: TickUnit) {
        self.set_tick_unit(Some(unit));
    }

    fn unsubscribe_ticks(&mut self) {
        self.set_tick_unit(None);
    }

    fn subscribe_taps(&mut self) {
        self.taps = true;
    }

    fn unsubscribe_taps(&mut self) {
        self.taps = false;
    }

    fn vibrate(&mut self) {
        info!("Bzzzt");
    }

    fn restart(&mut self) {
        self.restart_requested = true;
    }

    fn now(&self) -> LocalTime {
        local_now()
    }
}

type SimWatchface<S> = Watchface<S, SimHost, TerminalSurface>;

/// Run the simulator until ctrl-c or `quit`
pub fn run(config: Config) -> anyhow::Result<()> {
    let (events_tx, events_rx) = mpsc::channel();
    let (outbox_tx, outbox_rx) = mpsc::sync_channel(OUTBOX_CAPACITY);
    let tick_unit = SharedTickUnit::default();

    let shutdown = events_tx.clone();
    ctrlc::set_handler(move || {
        let _ = shutdown.send(Event::Shutdown);
    })
    .context("Error setting ctrl-c handler")?;
    spawn_ticker(Arc::clone(&tick_unit), events_tx.clone());
    spawn_commands(events_tx.clone());
    Companion::new(config.companion.clone(), config.settings, events_tx)
        .spawn(outbox_rx);

    let connected = !config.companion.start_disconnected;
    let store = FileStore::load(config.store_path);
    let host = SimHost::new(outbox_tx, tick_unit, connected);
    let mut watchface = Watchface::new(store, host, TerminalSurface::new());
    watchface.start(connected);
    watchface.on_battery(BatteryState {
        charge_percent: 80,
        ..Default::default()
    });
    watchface.surface_mut().flush();
    println!("Ctrl-c to exit. Commands: {COMMANDS}");

    loop {
        let deadline = watchface.host().next_deadline();
        let event = match deadline {
            Some(deadline) => {
                let timeout =
                    deadline.saturating_duration_since(Instant::now());
                match events_rx.recv_timeout(timeout) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match events_rx.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        if let Some(event) = event {
            if !dispatch(&mut watchface, event) {
                break;
            }
        }
        for (kind, handle) in watchface.host_mut().take_due(Instant::now()) {
            watchface.on_timer(kind, handle);
        }
        if watchface.host_mut().take_restart() {
            watchface = restart(watchface);
        }
        watchface.surface_mut().flush();
    }

    watchface.stop();
    info!("Shutting down");
    Ok(())
}

/// Hand one event to the watchface. Returns false on shutdown.
fn dispatch<S: Store>(watchface: &mut SimWatchface<S>, event: Event) -> bool {
    debug!("Event: {event:?}");
    match event {
        Event::Tick(now) => watchface.on_tick(&now),
        Event::Connection(connected) => {
            watchface.host_mut().set_connected(connected);
            watchface.on_connection(connected);
        }
        Event::Battery(battery) => watchface.on_battery(battery),
        Event::Tap => {
            if watchface.host().taps_enabled() {
                watchface.on_tap();
            } else {
                info!("Tap sensor is off in this seconds hand mode");
            }
        }
        Event::Inbound(record) => {
            if watchface.host().is_connected() {
                watchface.on_message(&record);
            } else {
                debug!("Phone is disconnected, dropping {record}");
            }
        }
        Event::SendFailed(error) => watchface.on_send_failed(error),
        Event::Shutdown => return false,
    }
    true
}

/// Tear the watchface down and bring it back up from the store, the way the
/// watch relaunches an app
fn restart<S: Store>(mut watchface: SimWatchface<S>) -> SimWatchface<S> {
    warn!("Restarting watchface");
    let connected = watchface.state().bluetooth_connected;
    let battery = watchface.state().battery;
    watchface.stop();
    let (store, host, surface) = watchface.into_parts();
    let mut watchface = Watchface::new(store, host, surface);
    watchface.start(connected);
    if let Some(battery) = battery {
        watchface.on_battery(battery);
    }
    watchface
}

/// Current wall clock time. Zone text is the UTC offset, since that's all
/// the local timezone gives us.
pub fn local_now() -> LocalTime {
    let now = Local::now();
    LocalTime {
        time: now.naive_local(),
        zone: now.format("%z").to_string(),
    }
}

/// Post a tick at the top of every second or minute, per the subscription
fn spawn_ticker(tick_unit: SharedTickUnit, events: Sender<Event>) {
    thread::spawn(move || loop {
        let millis = Local::now().timestamp_subsec_millis().min(999);
        thread::sleep(Duration::from_millis(u64::from(1000 - millis)));

        let now = local_now();
        let unit = match tick_unit.read() {
            Ok(guard) => *guard,
            Err(err) => {
                error!("Error reading tick subscription: {err}");
                break;
            }
        };
        let due = match unit {
            Some(TickUnit::Second) => true,
            Some(TickUnit::Minute) => now.time.second() == 0,
            None => false,
        };
        if due && events.send(Event::Tick(now)).is_err() {
            break;
        }
    });
}

/// Read commands from stdin, standing in for the user and the radio
fn spawn_commands(events: Sender<Event>) {
    thread::spawn(move || {
        for line in io::stdin().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    error!("Error reading stdin: {err}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(event) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(err) => warn!("{err:#}"),
            }
        }
    });
}

fn parse_command(line: &str) -> anyhow::Result<Event> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let event = match command {
        "tap" => Event::Tap,
        "connect" => Event::Connection(true),
        "disconnect" => Event::Connection(false),
        "battery" => {
            let percent: u8 = words
                .next()
                .context("Missing battery percent")?
                .parse()
                .context("Invalid battery percent")?;
            if percent > 100 {
                bail!("Battery percent must be 0-100, got {percent}");
            }
            let state = words.next();
            let is_charging = state == Some("charging");
            Event::Battery(BatteryState {
                charge_percent: percent,
                is_charging,
                is_plugged: is_charging || state == Some("plugged"),
            })
        }
        "fail" => {
            let reason = words.next().context("Missing failure reason")?;
            Event::SendFailed(parse_send_error(reason)?)
        }
        "quit" | "exit" => Event::Shutdown,
        _ => bail!("Unknown command `{command}`. Commands: {COMMANDS}"),
    };
    Ok(event)
}

fn parse_send_error(reason: &str) -> anyhow::Result<SendError> {
    let error = match reason {
        "timeout" => SendError::Timeout,
        "rejected" => SendError::Rejected,
        "not-connected" => SendError::NotConnected,
        "not-running" => SendError::AppNotRunning,
        "invalid" => SendError::InvalidArgs,
        "busy" => SendError::Busy,
        "overflow" => SendError::BufferOverflow,
        "released" => SendError::AlreadyReleased,
        "oom" => SendError::OutOfMemory,
        "internal" => SendError::Internal,
        _ => bail!("Unknown failure reason `{reason}`"),
    };
    Ok(error)
}
