//! Host-side stand-ins for the hardware traits.

extern crate std;

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::net::Ipv4Addr;
use std::collections::VecDeque;
use std::string::String;
use std::sync::Once;
use std::vec::Vec;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::config::Credentials;
use crate::display::{DisplayError, Screen};
use crate::framebuffer::FrameBuffer;
use crate::network::{Joined, NetworkLink};
use crate::sensors::{Reading, Sensor, SensorError};
use crate::server::HttpTransport;

/// Shared, ordered record of what the fakes were asked to do.
#[derive(Default)]
pub struct EventLog {
    events: RefCell<Vec<&'static str>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: &'static str) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

std::thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Global logger that files each record under the thread that emitted it, so
/// tests running in parallel only see their own lines.
struct CapturingLogger;

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let line = std::format!("{}", record.args());
        CAPTURED.with(|captured| captured.borrow_mut().push((record.level(), line)));
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger;

/// Run `f` and return what it produced along with every log line it emitted.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<(Level, String)>) {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });

    CAPTURED.with(|captured| captured.borrow_mut().clear());
    let result = f();
    let lines = CAPTURED.with(|captured| captured.borrow_mut().drain(..).collect());
    (result, lines)
}

pub fn joined() -> Joined {
    Joined::assume(Ipv4Addr::new(10, 0, 0, 9))
}

pub struct NoopDelay;

impl DelayNs for NoopDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

/// Remembers every millisecond wait it was asked for.
#[derive(Default)]
pub struct RecordingDelay {
    pub waits_ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
    }
}

/// I2C bus that serves queued read payloads and records writes.
#[derive(Default)]
pub struct FakeI2c {
    reads: VecDeque<Vec<u8>>,
    writes: Vec<(u8, Vec<u8>)>,
}

impl FakeI2c {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_read(&mut self, payload: &[u8]) {
        self.reads.push_back(payload.to_vec());
    }

    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c for FakeI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                Operation::Read(buf) => {
                    let payload = self
                        .reads
                        .pop_front()
                        .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
                    let n = payload.len().min(buf.len());
                    buf[..n].copy_from_slice(&payload[..n]);
                }
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
            }
        }
        Ok(())
    }
}

/// Screen backed by two framebuffers: what was drawn and what was flushed.
pub struct RecordingScreen<'a> {
    log: &'a EventLog,
    pub fail_init: bool,
    drawn: FrameBuffer,
    flushed: FrameBuffer,
}

impl<'a> RecordingScreen<'a> {
    pub fn new(log: &'a EventLog) -> Self {
        Self {
            log,
            fail_init: false,
            drawn: FrameBuffer::new(),
            flushed: FrameBuffer::new(),
        }
    }

    pub fn flushed(&self) -> &FrameBuffer {
        &self.flushed
    }

    pub fn flushed_pixels(&self) -> u32 {
        self.flushed.lit_pixels()
    }

    pub fn pixel(&self, x: i32, y: i32) -> BinaryColor {
        self.flushed.pixel(x, y)
    }
}

impl OriginDimensions for RecordingScreen<'_> {
    fn size(&self) -> Size {
        self.drawn.size()
    }
}

impl DrawTarget for RecordingScreen<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.drawn.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.drawn.clear(color)
    }
}

impl Screen for RecordingScreen<'_> {
    async fn init(&mut self) -> Result<(), DisplayError> {
        self.log.push("display.init");
        if self.fail_init {
            Err(DisplayError::InitFailed)
        } else {
            Ok(())
        }
    }

    async fn flush(&mut self) -> Result<(), DisplayError> {
        self.log.push("display.flush");
        let _ = self.drawn.flush(&mut self.flushed);
        Ok(())
    }
}

/// Sensor that replays a fixed list of outcomes, then reports 20 degC.
pub struct ScriptedSensor<'a> {
    log: &'a EventLog,
    pub fail_init: bool,
    outcomes: VecDeque<Result<Reading, SensorError>>,
}

impl<'a> ScriptedSensor<'a> {
    pub fn new(log: &'a EventLog, outcomes: &[Result<Reading, SensorError>]) -> Self {
        Self {
            log,
            fail_init: false,
            outcomes: outcomes.iter().copied().collect(),
        }
    }
}

impl Sensor for ScriptedSensor<'_> {
    async fn init(&mut self) -> Result<(), SensorError> {
        self.log.push("sensor.init");
        if self.fail_init {
            Err(SensorError::InitializationFailed {
                sensor: "scripted",
                details: "configured to fail",
            })
        } else {
            Ok(())
        }
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        self.log.push("sensor.read");
        self.outcomes
            .pop_front()
            .unwrap_or(Ok(Reading::new(20.0, 50.0)))
    }
}

/// Link that comes up after a fixed number of failed checks.
pub struct ScriptedLink<'a> {
    log: &'a EventLog,
    failing_checks: Cell<u32>,
    checks: Cell<u32>,
    address: Option<Ipv4Addr>,
    pub begun_with: Option<&'static str>,
}

impl<'a> ScriptedLink<'a> {
    pub fn new(log: &'a EventLog, failing_checks: u32, address: Ipv4Addr) -> Self {
        Self {
            log,
            failing_checks: Cell::new(failing_checks),
            checks: Cell::new(0),
            address: Some(address),
            begun_with: None,
        }
    }

    pub fn checks(&self) -> u32 {
        self.checks.get()
    }

    pub fn drop_link(&mut self) {
        self.address = None;
    }
}

impl NetworkLink for ScriptedLink<'_> {
    async fn begin(&mut self, credentials: &Credentials) {
        self.log.push("network.begin");
        self.begun_with = Some(credentials.ssid);
    }

    fn current_address(&self) -> Option<Ipv4Addr> {
        self.log.push("network.check");
        self.checks.set(self.checks.get() + 1);
        match self.failing_checks.get() {
            0 => self.address,
            n => {
                self.failing_checks.set(n - 1);
                None
            }
        }
    }
}

/// Listener fed with pre-recorded clients, each a list of read chunks.
pub struct ScriptedTransport<'a> {
    log: &'a EventLog,
    clients: VecDeque<VecDeque<Vec<u8>>>,
    current: Option<VecDeque<Vec<u8>>>,
    written: Vec<u8>,
}

impl<'a> ScriptedTransport<'a> {
    pub fn new(log: &'a EventLog) -> Self {
        Self {
            log,
            clients: VecDeque::new(),
            current: None,
            written: Vec::new(),
        }
    }

    pub fn push_client(&mut self, chunks: &[&[u8]]) {
        self.clients
            .push_back(chunks.iter().map(|c| c.to_vec()).collect());
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl HttpTransport for ScriptedTransport<'_> {
    type Error = ();

    async fn listen(&mut self) {
        self.log.push("listen");
    }

    async fn poll_pending(&mut self) -> bool {
        self.log.push("poll");
        if self.current.is_none() {
            self.current = self.clients.pop_front();
        }
        self.current.is_some()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some(chunks) = self.current.as_mut() else {
            return Err(());
        };
        let Some(mut chunk) = chunks.pop_front() else {
            return Ok(0);
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    async fn close(&mut self) {
        self.log.push("close");
        self.current = None;
    }
}
