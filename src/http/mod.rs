//! HTTP client on top of the module's built-in HTTP stack.
//!
//! A session walks through bearer bring-up, HTTP context setup, an optional
//! request body upload, the HTTP action and finally the read-back of the
//! response body:
//!
//! ```text
//! Created -> AttachedChecked -> BearerUp -> HttpInitialized -> Configured
//!         -> Uploading -> Actioned -> Retrievable -> Terminated
//! ```
//!
//! The request body is bounded by the length announced in
//! [`HttpSession::post_init`], the response body by the length reported by
//! the action. Both bounds are enforced without touching the transport.

mod bounded;

pub use bounded::{BoundedReader, BoundedWriter};

use core::fmt::Write as _;

use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_io::{ErrorType, Read, ReadReady, Write};

use crate::{
    channel::{parse_line, CommandChannel, ReplyBuf},
    client::Sim900,
    command::{
        bearer::{types::BearerCommandType, SetBearerState},
        http::{
            responses::HttpActionResult,
            types::{HttpMethod, HttpParam},
            HttpAction, HttpInit, HttpRead, HttpTerm, SetHttpData, SetHttpParameter,
            SetHttpParameterNumber, MAX_HTTP_PARAM_LEN,
        },
        psn::{types::GPRSAttachedState, GetGPRSAttached},
    },
    config::{NoPin, StatusSense},
    error::Error,
    modules::ModuleParams,
    traits::Clock,
};

/// Largest value accepted for the HTTP session timeout, in seconds.
pub const MAX_HTTP_TIMEOUT_S: u16 = 1000;

/// Longest parameter tag accepted by AT+HTTPPARA.
pub const MAX_HTTP_PARAM_TAG_LEN: usize = 16;

/// Extra silence tolerated per uploaded byte while waiting for the result
/// of an action. Heuristic, not a documented module characteristic.
const ACTION_TIME_PER_BYTE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Created,
    AttachedChecked,
    BearerUp,
    HttpInitialized,
    Configured,
    Uploading,
    Actioned,
    Retrievable,
    Terminated,
}

/// One HTTP conversation with the module.
///
/// Created by [`Sim900::create_http_connection`], it holds the modem lock
/// for its whole lifetime. [`terminate`](Self::terminate) tears the HTTP
/// context and the bearer down; dropping the session without terminating
/// only releases the lock.
pub struct HttpSession<'a, T, CLK, PWR = NoPin, STAT = NoPin> {
    sim: &'a Sim900<T, CLK, PWR, STAT>,
    cid: u8,
    url: &'a str,
    state: SessionState,
    writer: BoundedWriter,
    reader: BoundedReader,
}

impl<'a, T, CLK, PWR, STAT> HttpSession<'a, T, CLK, PWR, STAT>
where
    T: Read + Write + ReadReady,
    CLK: Clock,
    PWR: OutputPin,
    STAT: StatusSense,
{
    pub(crate) fn new(sim: &'a Sim900<T, CLK, PWR, STAT>, cid: u8, url: &'a str) -> Self {
        Self {
            sim,
            cid,
            url,
            state: SessionState::Created,
            writer: BoundedWriter::default(),
            reader: BoundedReader::default(),
        }
    }

    pub fn cid(&self) -> u8 {
        self.cid
    }

    pub fn url(&self) -> &str {
        self.url
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn writer(&self) -> &BoundedWriter {
        &self.writer
    }

    pub fn reader(&self) -> &BoundedReader {
        &self.reader
    }

    /// Bytes of the response body not read yet, zero until
    /// [`init_retrieve`](Self::init_retrieve) succeeded.
    pub fn available(&self) -> u32 {
        self.reader.remaining()
    }

    /// Bring up the bearer and the HTTP context, then set the CID, URL and
    /// session timeout (in seconds, at most [`MAX_HTTP_TIMEOUT_S`]).
    ///
    /// Nothing is rolled back on failure; call [`terminate`](Self::terminate)
    /// to clean up.
    pub fn init(&mut self, timeout: u16) -> Result<(), Error> {
        let sim = self.sim;
        sim.track(|| self.init_inner(timeout))
    }

    /// Set an HTTP parameter on the initialized context.
    pub fn set_param(&mut self, param: HttpParam, value: &str) -> Result<(), Error> {
        let sim = self.sim;
        sim.track(|| self.set_param_inner(param.tag(), value))
    }

    /// Set an HTTP parameter by its raw tag.
    pub fn set_param_raw(&mut self, tag: &str, value: &str) -> Result<(), Error> {
        let sim = self.sim;
        sim.track(|| self.set_param_inner(tag, value))
    }

    pub fn set_param_u32(&mut self, param: HttpParam, value: u32) -> Result<(), Error> {
        let sim = self.sim;
        sim.track(|| {
            self.ensure_context()?;
            let mut ch = sim.channel()?;
            self.finish_body(&mut ch)?;
            ch.send(&SetHttpParameterNumber {
                tag: param.tag(),
                value,
            })
        })
    }

    /// Announce a request body of `content_length` bytes and wait until the
    /// module is ready to receive it.
    pub fn post_init(&mut self, content_length: u32) -> Result<(), Error> {
        let sim = self.sim;
        sim.track(|| self.post_init_inner(content_length))
    }

    /// Write one byte of the announced request body.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        let sim = self.sim;
        sim.track(|| self.write_inner(&[byte]).map(|_| ()))
    }

    /// Finish the upload, if any, and run a POST.
    pub fn post(&mut self) -> Result<HttpActionResult, Error> {
        let sim = self.sim;
        sim.track(|| self.post_inner())
    }

    pub fn get(&mut self) -> Result<HttpActionResult, Error> {
        let sim = self.sim;
        sim.track(|| self.action_inner(HttpMethod::Get))
    }

    pub fn head(&mut self) -> Result<HttpActionResult, Error> {
        let sim = self.sim;
        sim.track(|| self.action_inner(HttpMethod::Head))
    }

    /// Request the whole response body from the module and arm reading.
    pub fn init_retrieve(&mut self) -> Result<(), Error> {
        let sim = self.sim;
        sim.track(|| self.init_retrieve_inner())
    }

    /// Read one byte of the response body, waiting up to the input timeout
    /// for it to arrive.
    pub fn read_byte(&mut self) -> Result<u8, Error> {
        let sim = self.sim;
        sim.track(|| {
            let mut ch = sim.channel()?;
            self.read_body_byte(&mut ch)
        })
    }

    /// Tear down the HTTP context and the bearer and release the modem.
    ///
    /// Best effort: teardown failures are logged and left in
    /// [`Sim900::last_error`], the lock is released regardless.
    pub fn terminate(mut self) {
        let sim = self.sim;
        // Failures are reported through the last-error slot.
        let _ = sim.track(|| self.teardown());
    }

    fn init_inner(&mut self, timeout: u16) -> Result<(), Error> {
        if timeout > MAX_HTTP_TIMEOUT_S {
            return Err(Error::InvalidHttpTimeout);
        }
        if self.state >= SessionState::HttpInitialized {
            return Err(Error::InvalidState);
        }

        let sim = self.sim;
        let mut ch = sim.channel()?;

        let attached = ch.query(&GetGPRSAttached, b"+CGATT")?;
        self.state = SessionState::AttachedChecked;

        if attached.state == GPRSAttachedState::Attached {
            if let Err(_e) = ch.send(&SetBearerState {
                cmd_type: BearerCommandType::Close,
                cid: self.cid,
            }) {
                debug!("Bearer {} not shut down: {:?}", self.cid, _e);
            }
        }

        let cid = self.cid;
        self.retry(&mut ch, "Bearer start", |ch| {
            ch.send(&SetBearerState {
                cmd_type: BearerCommandType::Open,
                cid,
            })
        })?;
        self.state = SessionState::BearerUp;
        info!("Bearer {} connected", cid);

        self.retry(&mut ch, "HTTPINIT", |ch| ch.send(&HttpInit))?;
        self.state = SessionState::HttpInitialized;
        debug!("HTTP initialized");

        ch.send(&SetHttpParameter {
            tag: HttpParam::Cid.tag(),
            value: &decimal(u32::from(cid))?,
        })?;
        ch.send(&SetHttpParameter {
            tag: HttpParam::Url.tag(),
            value: self.url,
        })?;
        ch.send(&SetHttpParameter {
            tag: HttpParam::Timeout.tag(),
            value: &decimal(u32::from(timeout))?,
        })?;
        self.state = SessionState::Configured;
        info!("URL: {}", self.url);

        Ok(())
    }

    fn set_param_inner(&mut self, tag: &str, value: &str) -> Result<(), Error> {
        if tag.len() > MAX_HTTP_PARAM_TAG_LEN || value.len() > MAX_HTTP_PARAM_LEN {
            return Err(Error::CharacterLimitExceeded);
        }
        self.ensure_context()?;

        let sim = self.sim;
        let mut ch = sim.channel()?;
        self.finish_body(&mut ch)?;
        ch.send(&SetHttpParameter { tag, value })
    }

    fn post_init_inner(&mut self, content_length: u32) -> Result<(), Error> {
        let max = self.sim.module.max_post_data();
        if content_length > max {
            warn!("Post data of {} bytes exceeds {} bytes", content_length, max);
            return Err(Error::MaxPostSizeExceeded);
        }
        self.ensure_context()?;

        let sim = self.sim;
        let mut ch = sim.channel()?;
        self.finish_body(&mut ch)?;
        ch.write_command(&SetHttpData {
            size: content_length,
            time: self.sim.http_data_window_ms,
        })?;
        let timeout = ch.input_timeout();
        ch.wait_for(b"DOWNLOAD", true, timeout, None)?;

        self.writer = BoundedWriter::new(content_length);
        self.state = SessionState::Uploading;
        Ok(())
    }

    fn write_inner(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if self.state != SessionState::Uploading {
            return Err(Error::InvalidState);
        }

        let n = self.writer.admit(buf.len())?;
        if n > 0 {
            let sim = self.sim;
            sim.channel()?.write_raw(&buf[..n])?;
            self.writer.advance(n);
        }
        Ok(n)
    }

    fn post_inner(&mut self) -> Result<HttpActionResult, Error> {
        if self.state == SessionState::Uploading {
            let sim = self.sim;
            let mut ch = sim.channel()?;
            self.finish_upload(&mut ch)?;
        }
        self.action_inner(HttpMethod::Post)
    }

    fn action_inner(&mut self, method: HttpMethod) -> Result<HttpActionResult, Error> {
        self.ensure_context()?;

        let sim = self.sim;
        let mut ch = sim.channel()?;
        self.finish_body(&mut ch)?;

        let input_timeout = ch.input_timeout();
        let timeout = match method {
            HttpMethod::Post => action_timeout(input_timeout, self.writer.limit()),
            _ => input_timeout,
        };

        let mut reply = ReplyBuf::new();
        ch.write_command(&HttpAction { method })?;
        ch.wait_for(b"+HTTPACTION:", false, timeout, Some(&mut reply))?;
        ch.wait_for(b"\n", true, input_timeout, Some(&mut reply))?;
        let result: HttpActionResult = parse_line(&reply, b"+HTTPACTION:")?;

        info!(
            "HTTP {:?} {}: status {}, {} bytes",
            method, self.url, result.status, result.length
        );

        self.reader = BoundedReader::new(result.length);
        self.state = SessionState::Actioned;
        Ok(result)
    }

    fn init_retrieve_inner(&mut self) -> Result<(), Error> {
        if !matches!(
            self.state,
            SessionState::Actioned | SessionState::Retrievable
        ) {
            return Err(Error::InvalidState);
        }

        let sim = self.sim;
        let mut ch = sim.channel()?;
        self.finish_body(&mut ch)?;

        let length = self.reader.limit();
        if length > 0 {
            debug!("Getting data, {} bytes", length);
            let timeout = ch.input_timeout();
            ch.write_command(&HttpRead {
                start: 0,
                size: length,
            })?;
            ch.wait_for(b"+HTTPREAD:", true, timeout, None)?;
            // The body starts right after this line, line endings included.
            ch.wait_for(b"\n", false, timeout, None)?;
        }

        self.reader.arm();
        self.state = SessionState::Retrievable;
        Ok(())
    }

    fn read_body_byte(&mut self, ch: &mut CommandChannel<T, CLK>) -> Result<u8, Error> {
        self.reader.admit()?;

        let timeout = ch.input_timeout();
        let byte = ch.read_byte_timeout(timeout)?;
        self.reader.advance();

        if self.reader.remaining() == 0 {
            // Trailing result code of AT+HTTPREAD
            if let Err(_e) = ch.wait_for(b"OK", true, timeout, None) {
                warn!("No OK after response body: {:?}", _e);
            }
        }

        Ok(byte)
    }

    fn teardown(&mut self) -> Result<(), Error> {
        let sim = self.sim;
        let mut ch = sim.channel()?;
        let mut result = Ok(());

        if self.state == SessionState::Uploading {
            if let Err(e) = self.abort_upload(&mut ch) {
                result = Err(e);
            }
        }
        if let Err(e) = self.finish_body(&mut ch) {
            warn!("Failed to discard response body: {:?}", e);
            result = result.and(Err(e));
        }

        if self.state >= SessionState::HttpInitialized {
            if let Err(e) = self.retry(&mut ch, "HTTPTERM", |ch| ch.send(&HttpTerm)) {
                result = result.and(Err(e));
            }
        }

        if self.state >= SessionState::AttachedChecked {
            let cid = self.cid;
            if let Err(e) = self.retry(&mut ch, "Bearer stop", |ch| {
                ch.send(&SetBearerState {
                    cmd_type: BearerCommandType::Close,
                    cid,
                })
            }) {
                result = result.and(Err(e));
            }
        }

        self.state = SessionState::Terminated;
        info!("HTTP session on bearer {} terminated", self.cid);
        result
    }

    /// Wait for the module to acknowledge the uploaded body.
    fn finish_upload(&mut self, ch: &mut CommandChannel<T, CLK>) -> Result<(), Error> {
        if self.writer.remaining() > 0 {
            warn!(
                "Posting {} of {} announced bytes",
                self.writer.count(),
                self.writer.limit()
            );
        }

        let timeout = ch.input_timeout();
        ch.wait_for(b"OK", true, timeout, None)?;
        self.state = SessionState::Configured;
        Ok(())
    }

    /// An incomplete upload only ends when the module's data window
    /// expires, anything written before that would be taken as body.
    fn abort_upload(&mut self, ch: &mut CommandChannel<T, CLK>) -> Result<(), Error> {
        if self.writer.remaining() > 0 {
            warn!("Upload aborted, waiting for the data window to close");
        }

        let window = Duration::from_millis(u64::from(self.sim.http_data_window_ms));
        let timeout = window + ch.input_timeout();
        ch.wait_for(b"OK", true, timeout, None)?;
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Consume the unread part of an armed response body, so the next
    /// command starts on a clean line.
    fn finish_body(&mut self, ch: &mut CommandChannel<T, CLK>) -> Result<(), Error> {
        let remaining = self.reader.remaining();
        if remaining == 0 {
            return Ok(());
        }

        debug!("Discarding {} unread body bytes", remaining);
        for _ in 0..remaining {
            self.read_body_byte(ch)?;
        }
        Ok(())
    }

    fn ensure_context(&self) -> Result<(), Error> {
        match self.state {
            SessionState::HttpInitialized
            | SessionState::Configured
            | SessionState::Actioned
            | SessionState::Retrievable => Ok(()),
            _ => Err(Error::InvalidState),
        }
    }

    /// Run `step` up to the configured number of attempts, sleeping the
    /// retry delay in between.
    fn retry(
        &self,
        ch: &mut CommandChannel<T, CLK>,
        what: &'static str,
        mut step: impl FnMut(&mut CommandChannel<T, CLK>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let attempts = self.sim.retries.max(1);
        let mut last = Error::Timeout;

        for attempt in 1..=attempts {
            match step(&mut *ch) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!("{} failed ({}/{}): {:?}", what, attempt, attempts, e);
                    last = e;
                }
            }

            if attempt < attempts {
                ch.clock().delay(self.sim.retry_delay);
            }
        }

        error!("{} failed after {} attempts", what, attempts);
        Err(last)
    }
}

/// Render a number as a quoted-parameter value.
fn decimal(value: u32) -> Result<heapless::String<10>, Error> {
    let mut s = heapless::String::new();
    write!(s, "{}", value).map_err(|_| Error::BufferFull)?;
    Ok(s)
}

/// Silence tolerated while the module performs a POST of `length` bytes.
fn action_timeout(input_timeout: Duration, length: u32) -> Duration {
    let scaled = ACTION_TIME_PER_BYTE * length;
    if scaled > input_timeout {
        scaled
    } else {
        input_timeout
    }
}

impl<'a, T, CLK, PWR, STAT> Drop for HttpSession<'a, T, CLK, PWR, STAT> {
    fn drop(&mut self) {
        if self.state != SessionState::Terminated {
            debug!("HTTP session dropped without terminate");
        }
        if let Ok(mut channel) = self.sim.channel.try_borrow_mut() {
            channel.unlock();
        }
    }
}

impl<'a, T, CLK, PWR, STAT> ErrorType for HttpSession<'a, T, CLK, PWR, STAT> {
    type Error = Error;
}

impl<'a, T, CLK, PWR, STAT> Read for HttpSession<'a, T, CLK, PWR, STAT>
where
    T: Read + Write + ReadReady,
    CLK: Clock,
    PWR: OutputPin,
    STAT: StatusSense,
{
    /// Reads up to the end of the declared body, then reports end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let sim = self.sim;
        sim.track(|| {
            if !self.reader.is_ready() {
                return Err(Error::DataNotReady);
            }

            let n = buf.len().min(self.reader.remaining() as usize);
            let mut ch = sim.channel()?;
            for slot in buf[..n].iter_mut() {
                *slot = self.read_body_byte(&mut ch)?;
            }
            Ok(n)
        })
    }
}

impl<'a, T, CLK, PWR, STAT> Write for HttpSession<'a, T, CLK, PWR, STAT>
where
    T: Read + Write + ReadReady,
    CLK: Clock,
    PWR: OutputPin,
    STAT: StatusSense,
{
    /// Writes as much of `buf` as the announced body length allows.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let sim = self.sim;
        sim.track(|| self.write_inner(buf))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
