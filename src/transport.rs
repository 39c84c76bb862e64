// src/transport.rs - Serial link seam plus loopback and file-backed links
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BAUD_RATE: u32 = 9600;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link is not open")]
    NotOpen,
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Parameters for opening a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkParams {
    pub port: PathBuf,
    pub baud_rate: u32,
    /// Captured controller output replayed as inbound lines (file link only).
    pub status_capture: Option<PathBuf>,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            port: PathBuf::from("serial.out"),
            baud_rate: DEFAULT_BAUD_RATE,
            status_capture: None,
        }
    }
}

/// The narrow contract the control loop needs from a serial connection.
pub trait SerialLink {
    fn is_open(&self) -> bool;
    fn open(&mut self, params: &LinkParams) -> Result<(), LinkError>;
    fn close(&mut self);
    fn write(&mut self, text: &str) -> Result<(), LinkError>;
    /// Next complete inbound line without its terminator, never blocking.
    fn read_line(&mut self) -> Option<String>;
}

/// Accumulates inbound bytes and hands out complete lines one at a time.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn push(&mut self, data: &str) {
        self.pending.push_str(data);
    }

    pub fn next_line(&mut self) -> Option<String> {
        let end = self.pending.find('\n')?;
        let mut line: String = self.pending.drain(..=end).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// In-memory link. Records everything written and serves injected inbound data.
#[derive(Debug, Default)]
pub struct LoopbackLink {
    open: bool,
    written: Vec<String>,
    inbound: LineBuffer,
}

impl LoopbackLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each successful `write` call, in order.
    pub fn written(&self) -> &[String] {
        &self.written
    }
}

#[cfg(test)]
impl LoopbackLink {
    /// Queue raw bytes as if the controller had sent them.
    pub fn feed(&mut self, data: &str) {
        self.inbound.push(data);
    }
}

impl SerialLink for LoopbackLink {
    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self, params: &LinkParams) -> Result<(), LinkError> {
        debug!("Loopback standing in for {}", params.port.display());
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn write(&mut self, text: &str) -> Result<(), LinkError> {
        if !self.open {
            return Err(LinkError::NotOpen);
        }
        self.written.push(text.to_string());
        Ok(())
    }

    fn read_line(&mut self) -> Option<String> {
        if !self.open {
            return None;
        }
        self.inbound.next_line()
    }
}

/// Bench link: outbound text is appended to the port path, inbound lines come
/// from an optional capture of controller output.
#[derive(Debug, Default)]
pub struct FileLink {
    output: Option<File>,
    inbound: LineBuffer,
}

impl FileLink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SerialLink for FileLink {
    fn is_open(&self) -> bool {
        self.output.is_some()
    }

    fn open(&mut self, params: &LinkParams) -> Result<(), LinkError> {
        let output = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&params.port)
            .map_err(|source| LinkError::Open {
                path: params.port.clone(),
                source,
            })?;

        self.inbound.clear();
        if let Some(capture) = &params.status_capture {
            let text = std::fs::read_to_string(capture).map_err(|source| LinkError::Open {
                path: capture.clone(),
                source,
            })?;
            debug!("Loaded {} bytes of controller output from {}", text.len(), capture.display());
            self.inbound.push(&text);
        }

        info!("Opened {} at {} baud", params.port.display(), params.baud_rate);
        self.output = Some(output);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut output) = self.output.take() {
            let _ = output.flush();
            info!("Link closed");
        }
    }

    fn write(&mut self, text: &str) -> Result<(), LinkError> {
        let output = self.output.as_mut().ok_or(LinkError::NotOpen)?;
        output.write_all(text.as_bytes())?;
        output.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Option<String> {
        if self.output.is_none() {
            return None;
        }
        self.inbound.next_line()
    }
}
