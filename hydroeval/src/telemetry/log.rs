//! A minimal, always-on structured logger, built on `slog` (the teacher's
//! logging backend), for the engine's own operational narration — distinct
//! from [`crate::communicator::Communicator`], the caller-facing fan-out
//! channel.
//!
//! The teacher's `telemetry::log::init` assembles field-dedup/redact
//! filters, a rate limiter, and an async channel drain on top of a JSON or
//! terminal drain before parking the result behind a `OnceCell`-backed
//! harness. hydroeval keeps the harness pattern but drops the filters/rate
//! limiting/async channel — a library with no surrounding service has
//! nothing to redact and no log volume budget to enforce.

use crate::settings::LogSettings;
use once_cell::sync::OnceCell;
use slog::{Drain, Level, Logger};
use std::net::UdpSocket;
use std::str::FromStr;
use std::sync::Mutex;

static ROOT_LOGGER: OnceCell<Logger> = OnceCell::new();

fn parse_level(name: &str) -> Level {
    Level::from_str(name).unwrap_or(Level::Info)
}

fn terminal_drain(settings: &LogSettings) -> Box<dyn Drain<Ok = (), Err = slog::Never> + Send + Sync> {
    if settings.json {
        let drain = slog_json::Json::default(std::io::stdout()).fuse();
        Box::new(slog::LevelFilter::new(drain, parse_level(&settings.level)).fuse())
    } else {
        let decorator = slog_term::TermDecorator::new().stdout().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        Box::new(slog::LevelFilter::new(drain, parse_level(&settings.level)).fuse())
    }
}

/// A `slog::Drain` that forwards each formatted record over UDP to
/// `127.0.0.1:<port>`, the simplest faithful reading of "a datagram log
/// handler" that doesn't require the teacher's full telemetry HTTP server.
struct UdpDrain {
    socket: UdpSocket,
    target: String,
}

impl UdpDrain {
    fn bind(port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        Ok(UdpDrain {
            socket,
            target: format!("127.0.0.1:{port}"),
        })
    }
}

impl Drain for UdpDrain {
    type Ok = ();
    type Err = slog::Never;

    fn log(&self, record: &slog::Record, _values: &slog::OwnedKVList) -> Result<(), slog::Never> {
        let line = format!("{} {}\n", record.level().as_short_str(), record.msg());
        let _ = self.socket.send_to(line.as_bytes(), &self.target);
        Ok(())
    }
}

fn udp_drain_from_env() -> Option<UdpDrain> {
    let port: u16 = std::env::var("UDP_LOG_PORT").ok()?.parse().ok()?;
    UdpDrain::bind(port).ok()
}

/// Fans a record out to the terminal/JSON drain and, when configured, a UDP
/// drain. A hand-rolled composite rather than `slog::Duplicate` since the
/// UDP leg is optional and both legs already report `Ok = ()`.
struct FanoutDrain {
    base: Box<dyn Drain<Ok = (), Err = slog::Never> + Send + Sync>,
    udp: Option<Mutex<UdpDrain>>,
}

impl Drain for FanoutDrain {
    type Ok = ();
    type Err = slog::Never;

    fn log(&self, record: &slog::Record, values: &slog::OwnedKVList) -> Result<(), slog::Never> {
        self.base.log(record, values)?;

        if let Some(udp) = &self.udp {
            let _ = udp.lock().map(|drain| drain.log(record, values));
        }

        Ok(())
    }
}

/// Returns the process-wide logger, initializing it from `LogSettings::from_env()`
/// (and `UDP_LOG_PORT`, if set) on first call.
pub fn logger() -> &'static Logger {
    ROOT_LOGGER.get_or_init(|| init(&LogSettings::from_env()))
}

/// Builds a root logger from `settings`. Exposed so callers that need a
/// non-default configuration (e.g. tests) can construct one directly rather
/// than relying on [`logger`]'s environment-derived default.
pub fn init(settings: &LogSettings) -> Logger {
    let drain = FanoutDrain {
        base: terminal_drain(settings),
        udp: udp_drain_from_env().map(Mutex::new),
    };

    Logger::root(drain.fuse(), slog::o!("component" => "hydroeval"))
}
