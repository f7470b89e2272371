// Serial line transport
//
// Owns the serial port and turns it into a pair of channels: received
// newline-terminated records come out one at a time with their terminator
// stripped, and outbound lines go in whole. One reader thread and one writer
// thread; the writer does a single write per line so physical writes never
// interleave.

use serialport::SerialPort;
use std::io::{Read, Write};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

const READ_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Line-oriented serial link to the drive controller
pub struct SerialLink {
    tx: UnboundedSender<String>,
    rx: UnboundedReceiver<String>,
}

impl SerialLink {
    /// Open the port and start the reader and writer threads
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        info!("Opening serial port {} at {} baud", path, baud_rate);
        let port = serialport::new(path, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        let writer_port = port.try_clone()?;

        let (line_tx, line_rx) = unbounded_channel::<String>();
        let (out_tx, out_rx) = unbounded_channel::<String>();

        thread::spawn(move || read_loop(port, line_tx));
        thread::spawn(move || write_loop(writer_port, out_rx));

        Ok(Self {
            tx: out_tx,
            rx: line_rx,
        })
    }

    /// Handle for queueing outbound lines
    pub fn sender(&self) -> UnboundedSender<String> {
        self.tx.clone()
    }

    /// Next received record, None once the reader thread has stopped
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

fn read_loop(mut port: Box<dyn SerialPort>, lines: UnboundedSender<String>) {
    let mut pending = Vec::new();
    let mut chunk = [0u8; 256];

    loop {
        match port.read(&mut chunk) {
            Ok(0) => {}
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                for record in split_records(&mut pending) {
                    if lines.send(record).is_err() {
                        // Receiver dropped, runtime is shutting down
                        return;
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                warn!("Serial read failed, stopping reader: {}", e);
                return;
            }
        }
    }
}

fn write_loop(mut port: Box<dyn SerialPort>, mut lines: UnboundedReceiver<String>) {
    while let Some(line) = lines.blocking_recv() {
        debug!("Writing {} bytes to serial port", line.len());
        if let Err(e) = port.write_all(line.as_bytes()).and_then(|_| port.flush()) {
            warn!("Serial write failed, stopping writer: {}", e);
            return;
        }
    }
}

/// Drain complete newline-terminated records from the buffer, stripping the
/// terminator (and a preceding '\r' if the controller sent one). Partial
/// trailing data stays in the buffer for the next read.
fn split_records(pending: &mut Vec<u8>) -> Vec<String> {
    let mut records = Vec::new();
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let mut record: Vec<u8> = pending.drain(..=pos).collect();
        record.pop(); // the '\n'
        if record.last() == Some(&b'\r') {
            record.pop();
        }
        records.push(String::from_utf8_lossy(&record).into_owned());
    }
    records
}
