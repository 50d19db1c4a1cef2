use anyhow::Result;

/// Anything that can be polled for a new image: a camera, a decoder, a
/// synthetic generator. Called from the capture thread only.
pub trait FrameSource<F> {
    /// Fills `frame` in place. `Ok(false)` means the source produced nothing
    /// usable this time. Both that and `Err` are treated as transient and
    /// retried.
    fn acquire_into(&mut self, frame: &mut F) -> Result<bool>;
}

/// Anything that can show a frame and report user input. Called from the
/// render thread only.
pub trait FrameSink<F> {
    /// Overlays `fps` on `frame` and displays it.
    fn render(&mut self, frame: &mut F, fps: f64) -> Result<()>;

    /// Non-blocking check for a quit request from the user.
    fn poll_quit(&mut self) -> Result<bool>;
}

impl<F, S: FrameSource<F> + ?Sized> FrameSource<F> for Box<S> {
    fn acquire_into(&mut self, frame: &mut F) -> Result<bool> {
        (**self).acquire_into(frame)
    }
}

impl<F, K: FrameSink<F> + ?Sized> FrameSink<F> for Box<K> {
    fn render(&mut self, frame: &mut F, fps: f64) -> Result<()> {
        (**self).render(frame, fps)
    }

    fn poll_quit(&mut self) -> Result<bool> {
        (**self).poll_quit()
    }
}
