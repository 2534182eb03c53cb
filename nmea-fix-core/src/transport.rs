// transport.rs
use crate::gps::provider::FieldProvider;
use embassy_time::Instant;

/// Non-blocking byte source, normally the receiver's UART.
pub trait Transport {
    /// Bytes that can be read right now without waiting.
    fn available(&mut self) -> usize;
    fn read(&mut self) -> Option<u8>;
}

/// Adapts an `embedded-io` serial port.
pub struct IoTransport<R> {
    port: R,
}

impl<R> IoTransport<R> {
    pub fn new(port: R) -> Self {
        Self { port }
    }

    pub fn into_inner(self) -> R {
        self.port
    }
}

impl<R: embedded_io::Read + embedded_io::ReadReady> Transport for IoTransport<R> {
    fn available(&mut self) -> usize {
        match self.port.read_ready() {
            Ok(true) => 1,
            _ => 0,
        }
    }

    fn read(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}

/// Feeds every byte the transport has buffered into the parser.
///
/// Returns true if any byte completed a sentence that updated a field.
/// Never waits for more data; whatever arrives later is picked up on the
/// next call.
pub fn ingest<T: Transport, P: FieldProvider>(transport: &mut T, fields: &mut P, now: Instant) -> bool {
    let mut is_valid = false;
    while transport.available() > 0 {
        let Some(byte) = transport.read() else {
            break;
        };
        is_valid |= fields.encode(byte, now);
    }
    is_valid
}
