//! Streaming decoder for inbound RESP commands.
//!
//! Client→server traffic is always an array of bulk strings. The decoder
//! is a restartable state machine (`WaitType → WaitSize → WaitArgSize →
//! WaitArgData → WaitCrlf`) that consumes whatever bytes are available and
//! picks up exactly where it left off on the next call — any split point
//! is tolerated, including between `\r` and `\n`.
//!
//! One command at a time: on [`Decode::Complete`] the parsed argument
//! vector is available until [`RespDecoder::reset`], which prepares the
//! machine for the next command. On [`Decode::Error`] the offending bytes
//! have been consumed, so a caller that resets and continues always makes
//! progress.

use bytes::{Buf, Bytes, BytesMut};

/// Maximum number of arguments a single command may declare.
const MAX_ARGS: usize = 1024 * 1024;

/// Maximum length of a single bulk-string argument (512 MB, matching Redis).
const MAX_ARG_LEN: usize = 512 * 1024 * 1024;

/// Maximum length of a size line (`*N` / `$N` digits). i64 needs at most
/// 20 characters; anything longer is malformed.
const MAX_LINE_LEN: usize = 20;

/// Outcome of a [`RespDecoder::consume`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// A full command is parsed; fetch it with [`RespDecoder::args`].
    Complete,
    /// Input exhausted mid-command; feed more bytes and call again.
    Partial,
    /// Lexical violation. The decoder must be reset before reuse.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting `*` (array marker).
    WaitType,
    /// Accumulating the array size integer up to CRLF.
    WaitSize,
    /// Expecting `$`, then accumulating the bulk length up to CRLF.
    WaitArgSize,
    /// Copying `arg_len` bytes of bulk data.
    WaitArgData,
    /// Expecting the CRLF that closes a bulk string.
    WaitCrlf,
}

/// Restartable RESP command decoder.
#[derive(Debug)]
pub struct RespDecoder {
    state: State,
    args: Vec<Bytes>,
    expected_args: usize,
    arg_len: usize,
    /// Bulk data accumulated so far for the current argument.
    current: Vec<u8>,
    /// Digits of the size line accumulated so far.
    line: Vec<u8>,
    /// `$` of the current argument header has been consumed.
    seen_dollar: bool,
    /// `\r` of the closing CRLF has been consumed.
    seen_cr: bool,
}

impl Default for RespDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RespDecoder {
    pub fn new() -> Self {
        Self {
            state: State::WaitType,
            args: Vec::new(),
            expected_args: 0,
            arg_len: 0,
            current: Vec::new(),
            line: Vec::new(),
            seen_dollar: false,
            seen_cr: false,
        }
    }

    /// The argument vector of the last completed command.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Takes ownership of the completed argument vector.
    pub fn take_args(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.args)
    }

    /// Clears all accumulated state for the next command.
    pub fn reset(&mut self) {
        self.state = State::WaitType;
        self.args.clear();
        self.expected_args = 0;
        self.arg_len = 0;
        self.current.clear();
        self.line.clear();
        self.seen_dollar = false;
        self.seen_cr = false;
    }

    /// Consumes bytes from the front of `buf`, advancing the state
    /// machine. Consumed bytes are removed from the buffer; on `Partial`
    /// the buffer is fully drained into internal state.
    pub fn consume(&mut self, buf: &mut BytesMut) -> Decode {
        let mut pos = 0;
        let result = self.run(buf, &mut pos);
        buf.advance(pos);
        result
    }

    fn run(&mut self, buf: &BytesMut, pos: &mut usize) -> Decode {
        let data: &[u8] = buf;

        while *pos < data.len() {
            match self.state {
                State::WaitType => {
                    let byte = data[*pos];
                    *pos += 1;
                    if byte != b'*' {
                        return Decode::Error;
                    }
                    self.state = State::WaitSize;
                }

                State::WaitSize => match self.read_line(data, pos) {
                    LineStep::Done => {
                        let count = match self.parse_line() {
                            Some(n) if n >= 0 && (n as usize) <= MAX_ARGS => n as usize,
                            // negative array lengths never appear in
                            // client→server traffic
                            _ => return Decode::Error,
                        };
                        self.expected_args = count;
                        if count == 0 {
                            return Decode::Complete;
                        }
                        self.state = State::WaitArgSize;
                    }
                    LineStep::NeedMore => return Decode::Partial,
                    LineStep::Malformed => return Decode::Error,
                },

                State::WaitArgSize => {
                    if !self.seen_dollar {
                        let byte = data[*pos];
                        *pos += 1;
                        if byte != b'$' {
                            return Decode::Error;
                        }
                        self.seen_dollar = true;
                        continue;
                    }
                    match self.read_line(data, pos) {
                        LineStep::Done => {
                            let len = match self.parse_line() {
                                Some(n) if n >= 0 && (n as usize) <= MAX_ARG_LEN => n as usize,
                                _ => return Decode::Error,
                            };
                            self.arg_len = len;
                            self.current.clear();
                            self.current.reserve(len.min(4096));
                            self.state = State::WaitArgData;
                        }
                        LineStep::NeedMore => return Decode::Partial,
                        LineStep::Malformed => return Decode::Error,
                    }
                }

                State::WaitArgData => {
                    let needed = self.arg_len - self.current.len();
                    let available = data.len() - *pos;
                    let take = needed.min(available);
                    self.current.extend_from_slice(&data[*pos..*pos + take]);
                    *pos += take;
                    if self.current.len() == self.arg_len {
                        self.state = State::WaitCrlf;
                    } else {
                        return Decode::Partial;
                    }
                }

                State::WaitCrlf => {
                    let byte = data[*pos];
                    *pos += 1;
                    if !self.seen_cr {
                        if byte != b'\r' {
                            return Decode::Error;
                        }
                        self.seen_cr = true;
                        continue;
                    }
                    if byte != b'\n' {
                        return Decode::Error;
                    }
                    self.seen_cr = false;
                    self.seen_dollar = false;
                    self.args
                        .push(Bytes::from(std::mem::take(&mut self.current)));
                    if self.args.len() == self.expected_args {
                        return Decode::Complete;
                    }
                    self.state = State::WaitArgSize;
                }
            }
        }

        Decode::Partial
    }

    /// Accumulates a CRLF-terminated line into `self.line`. Scans for the
    /// `\n` with memchr; the `\r` may have arrived in an earlier call.
    fn read_line(&mut self, data: &[u8], pos: &mut usize) -> LineStep {
        match memchr::memchr(b'\n', &data[*pos..]) {
            Some(nl) => {
                self.line.extend_from_slice(&data[*pos..*pos + nl]);
                *pos += nl + 1;
                if self.line.last() != Some(&b'\r') || self.line.len() > MAX_LINE_LEN + 1 {
                    return LineStep::Malformed;
                }
                self.line.pop();
                LineStep::Done
            }
            None => {
                let rest = &data[*pos..];
                *pos += rest.len();
                self.line.extend_from_slice(rest);
                if self.line.len() > MAX_LINE_LEN + 1 {
                    LineStep::Malformed
                } else {
                    LineStep::NeedMore
                }
            }
        }
    }

    /// Parses and clears the accumulated size line as a signed base-10
    /// integer. Returns `None` on empty or non-numeric input.
    fn parse_line(&mut self) -> Option<i64> {
        let parsed = std::str::from_utf8(&self.line)
            .ok()
            .and_then(|s| s.parse::<i64>().ok());
        self.line.clear();
        parsed
    }
}

enum LineStep {
    Done,
    NeedMore,
    Malformed,
}
