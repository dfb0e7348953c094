//! Response framing.
//!
//! Writes are best-effort: a failed write is logged and the rest of the
//! response is dropped, nothing is reported to the caller.

use embedded_hal::serial::Write;

use crate::protocol::{Response, TERMINATOR};

pub struct Encoder<'a, P> {
    port: &'a mut P,
    failed: bool,
}

impl<'a, P> Encoder<'a, P>
where
    P: Write<u8>,
    P::Error: core::fmt::Debug,
{
    pub fn new(port: &'a mut P) -> Self {
        Self {
            port,
            failed: false,
        }
    }

    fn put(&mut self, b: u8) {
        if self.failed {
            return;
        }
        if let Err(e) = block!(self.port.write(b)) {
            warn!("Dropping response, write failed: {:?}", e);
            self.failed = true;
        }
    }

    /// Decimal text, no sign or leading zeros
    pub fn send_uint(&mut self, value: u32) {
        let mut digits = [0u8; 10];
        let mut n = value;
        let mut i = digits.len();

        loop {
            i -= 1;
            digits[i] = b'0' + (n % 10) as u8;
            n /= 10;
            if n == 0 {
                break;
            }
        }

        for d in &digits[i..] {
            self.put(*d);
        }
    }

    /// Single raw 0 or 1 byte
    pub fn send_bool(&mut self, value: bool) {
        self.put(value as u8);
    }

    /// Payload followed by the terminator
    pub fn respond(&mut self, response: Response) {
        match response {
            Response::Uint(v) => self.send_uint(v),
            Response::Bool(v) => self.send_bool(v),
            Response::Status => self.put(0),
        }
        self.put(TERMINATOR);

        if !self.failed {
            if let Err(e) = block!(self.port.flush()) {
                warn!("Response flush failed: {:?}", e);
            }
        }
    }
}
