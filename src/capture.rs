//! Screen capture session.
//!
//! Capturing requires an authorization step owned by some other thread (a UI
//! dialog on a device). The session hands the authorizer a [`Replier`] and
//! blocks on the matching waiter until the authorizer grants a
//! [`CaptureSource`], denies, or the configured timeout expires.

use crate::handoff::{one_shot, Replier};
use crate::image::codec::{self, ImageFormat};
use crate::image::ImageBuffer;
use crate::trace::{trace_event, trace_span};
use crate::util::{ImgFindError, ImgFindResult};
use std::path::Path;
use std::time::Duration;

/// Produces native-resolution frames of the screen.
pub trait CaptureSource: Send {
    /// Grabs the current frame.
    fn capture(&mut self) -> ImgFindResult<ImageBuffer>;

    /// Returns false once the underlying projection has been revoked.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Reply carried back from an authorizer: a source when granted.
pub type CaptureGrant = Option<Box<dyn CaptureSource>>;

/// Asks the user (or platform) for capture permission.
///
/// Implementations may reply on any thread and at any later time; dropping
/// the replier without answering counts as a failed request.
pub trait CaptureAuthorizer {
    fn request(&self, reply: Replier<CaptureGrant>);
}

/// Capture session settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// How long [`CaptureSession::request_permission`] waits for a reply.
    pub permission_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            permission_timeout: Duration::from_secs(30),
        }
    }
}

/// Permission state plus the most recent frame.
pub struct CaptureSession<A> {
    authorizer: A,
    cfg: CaptureConfig,
    source: Option<Box<dyn CaptureSource>>,
    last_frame: Option<ImageBuffer>,
}

impl<A: CaptureAuthorizer> CaptureSession<A> {
    pub fn new(authorizer: A) -> Self {
        Self::with_config(authorizer, CaptureConfig::default())
    }

    pub fn with_config(authorizer: A, cfg: CaptureConfig) -> Self {
        Self {
            authorizer,
            cfg,
            source: None,
            last_frame: None,
        }
    }

    /// Requests permission unless a valid source is already held.
    ///
    /// Returns `Ok(false)` when the authorizer denies.
    pub fn request_permission(&mut self) -> ImgFindResult<bool> {
        if self.has_permission() {
            return Ok(true);
        }
        let (replier, waiter) = one_shot("capture permission");
        self.authorizer.request(replier);
        let grant = waiter.wait_timeout(self.cfg.permission_timeout)?;
        let granted = grant.is_some();
        trace_event!("permission_reply", granted = granted);
        self.source = grant;
        Ok(granted)
    }

    /// Returns true while a valid capture source is held.
    pub fn has_permission(&self) -> bool {
        self.source.as_ref().is_some_and(|source| source.is_valid())
    }

    /// Captures a frame and returns an independent copy of it.
    ///
    /// The session keeps the frame; see [`CaptureSession::last_frame`].
    pub fn capture(&mut self) -> ImgFindResult<ImageBuffer> {
        let _span = trace_span!("capture").entered();
        let source = self
            .source
            .as_mut()
            .ok_or(ImgFindError::PermissionDenied("no screen capture permission"))?;
        let frame = source.capture()?;
        let copy = frame.duplicate("capture")?;
        if let Some(mut previous) = self.last_frame.replace(frame) {
            previous.release();
        }
        Ok(copy)
    }

    /// Captures a frame and saves it as PNG.
    pub fn capture_to(&mut self, path: impl AsRef<Path>) -> ImgFindResult<()> {
        let frame = self.capture()?;
        codec::save(frame, path, ImageFormat::Png, 100)
    }

    /// Most recent frame, if any.
    pub fn last_frame(&self) -> Option<&ImageBuffer> {
        self.last_frame.as_ref()
    }

    /// Drops the capture source and the cached frame.
    pub fn release(&mut self) {
        self.source = None;
        if let Some(mut frame) = self.last_frame.take() {
            frame.release();
        }
    }
}
