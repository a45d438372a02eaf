//! Line-delimited JSON codec.
//!
//! Every message is one JSON document terminated by `\n`. A trailing `\r` is
//! tolerated so the protocol can be driven from telnet-style clients.

use crate::error::ProtocolError;
use crate::message::{Request, Response};
use bytes::{Bytes, BytesMut};

/// Encodes messages as JSON lines.
pub struct Encoder;

impl Encoder {
    /// Encodes a request as a JSON line.
    pub fn encode_request(request: &Request) -> Result<Vec<u8>, ProtocolError> {
        Self::encode_json(request)
    }

    /// Encodes a response as a JSON line.
    pub fn encode_response(response: &Response) -> Result<Vec<u8>, ProtocolError> {
        Self::encode_json(response)
    }

    /// Encodes any JSON-serializable value as a JSON line.
    pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = serde_json::to_vec(value)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Splits an incoming byte stream into lines.
///
/// A line longer than the limit is reported once and then skipped up to and
/// including its terminating newline.
pub struct LineDecoder {
    buffer: BytesMut,
    max_line: usize,
    discarding: bool,
}

impl LineDecoder {
    pub fn new(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_line,
            discarding: false,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next complete line without its terminator.
    pub fn next_line(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        loop {
            let newline = self.buffer.iter().position(|&b| b == b'\n');

            if self.discarding {
                match newline {
                    Some(pos) => {
                        let _ = self.buffer.split_to(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buffer.clear();
                        return Ok(None);
                    }
                }
            }

            return match newline {
                Some(pos) => {
                    let mut line = self.buffer.split_to(pos + 1);
                    line.truncate(pos);
                    if line.last() == Some(&b'\r') {
                        line.truncate(pos - 1);
                    }
                    if line.len() > self.max_line {
                        return Err(ProtocolError::LineTooLong {
                            size: line.len(),
                            max: self.max_line,
                        });
                    }
                    Ok(Some(line.freeze()))
                }
                None if self.buffer.len() > self.max_line => {
                    let size = self.buffer.len();
                    self.buffer.clear();
                    self.discarding = true;
                    Err(ProtocolError::LineTooLong {
                        size,
                        max: self.max_line,
                    })
                }
                None => Ok(None),
            };
        }
    }

    /// Decodes the next line as JSON, skipping blank lines.
    pub fn decode_line<T: serde::de::DeserializeOwned>(
        &mut self,
    ) -> Result<Option<T>, ProtocolError> {
        while let Some(line) = self.next_line()? {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(serde_json::from_slice(&line)?));
        }
        Ok(None)
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(crate::MAX_LINE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Operation;

    #[test]
    fn test_multiple_lines() {
        let req1 = Request::new("1", Operation::Ping);
        let req2 = Request::new("2", Operation::Info);

        let mut data = Encoder::encode_request(&req1).unwrap();
        data.extend(Encoder::encode_request(&req2).unwrap());

        let mut decoder = LineDecoder::default();
        decoder.extend(&data);

        let decoded1: Request = decoder.decode_line().unwrap().unwrap();
        assert_eq!(decoded1.id, "1");

        let decoded2: Request = decoder.decode_line().unwrap().unwrap();
        assert_eq!(decoded2.op, Operation::Info);

        assert!(decoder.decode_line::<Request>().unwrap().is_none());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_partial_line() {
        let mut decoder = LineDecoder::default();
        decoder.extend(b"{\"type\":\"request\"");
        assert!(decoder.next_line().unwrap().is_none());

        decoder.extend(b",\"id\":\"1\",\"op\":\"PING\",\"params\":{}}\r\n");
        let line = decoder.next_line().unwrap().unwrap();
        assert!(line.ends_with(b"}"));
        let decoded = Request::from_line(&line).unwrap();
        assert_eq!(decoded.id, "1");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut decoder = LineDecoder::default();
        decoder.extend(b"\n  \n{\"id\":\"1\",\"op\":\"BYE\"}\n");
        let decoded: Request = decoder.decode_line().unwrap().unwrap();
        assert_eq!(decoded.op, Operation::Bye);
    }

    #[test]
    fn test_overlong_line_is_skipped() {
        let mut decoder = LineDecoder::new(16);
        decoder.extend(&[b'x'; 20]);
        assert!(matches!(
            decoder.next_line(),
            Err(ProtocolError::LineTooLong { size: 20, max: 16 })
        ));

        // Rest of the long line is dropped, the next one comes through.
        decoder.extend(b"xxxx\nshort\n");
        assert_eq!(&decoder.next_line().unwrap().unwrap()[..], b"short");
    }

    #[test]
    fn test_overlong_complete_line() {
        let mut decoder = LineDecoder::new(4);
        decoder.extend(b"abcdef\nok\n");
        assert!(decoder.next_line().is_err());
        assert_eq!(&decoder.next_line().unwrap().unwrap()[..], b"ok");
    }

    #[test]
    fn test_encode_response() {
        let response = Response::ok("req-1", serde_json::json!({"pong": true}));
        let encoded = Encoder::encode_response(&response).unwrap();
        assert_eq!(encoded.last(), Some(&b'\n'));
        assert_eq!(encoded.iter().filter(|&&b| b == b'\n').count(), 1);
    }
}
