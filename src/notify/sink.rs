use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use super::escpos;
use super::ticket::Ticket;
use crate::config::PrinterTarget;
use crate::error::SinkError;

/// Anything that can take a finished ticket.
pub trait Sink: Send {
    fn print(&mut self, ticket: &Ticket) -> Result<(), SinkError>;
}

/// ESC/POS receipt printer behind a device file such as `/dev/usb/lp0`.
///
/// The device is opened for every ticket and closed when the handle drops,
/// so a printer that is unplugged and replugged between balloons recovers
/// without a restart.
pub struct DeviceSink {
    path: PathBuf,
}

impl DeviceSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Sink for DeviceSink {
    fn print(&mut self, ticket: &Ticket) -> Result<(), SinkError> {
        let mut device = OpenOptions::new()
            .write(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| SinkError::Open {
                path: self.path.display().to_string(),
                source,
            })?;

        let bytes = escpos::encode(ticket);
        device.write_all(&bytes)?;
        device.flush()?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Ticket written to printer");
        Ok(())
    }
}

/// Plain-text tickets on stdout, for dry runs and printers fed by a pipe.
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn print(&mut self, ticket: &Ticket) -> Result<(), SinkError> {
        let mut out = std::io::stdout().lock();
        out.write_all(ticket.plain_text().as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

pub fn from_target(target: &PrinterTarget) -> Box<dyn Sink> {
    match target {
        PrinterTarget::Device(path) => Box::new(DeviceSink::new(path.clone())),
        PrinterTarget::Stdout => Box::new(StdoutSink),
    }
}
