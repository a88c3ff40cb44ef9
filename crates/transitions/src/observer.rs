use crossbeam_channel::{Receiver, Sender};

/// Lifecycle notifications from a [`TransitionEngine`](crate::TransitionEngine).
///
/// Within one tick `on_progress` always comes before `on_complete`, and
/// `on_start` comes before the first `on_progress` of a run. A cancelled run
/// reports `on_cancel` and never `on_complete`.
pub trait TransitionObserver {
    fn on_start(&mut self) {}

    fn on_progress(&mut self, _progress: f32) {}

    fn on_complete(&mut self) {}

    fn on_cancel(&mut self) {}
}

type Callback = Box<dyn FnMut()>;
type ProgressCallback = Box<dyn FnMut(f32)>;

/// Observer assembled from closures.
///
/// ```
/// use transitions::CallbackObserver;
///
/// let observer = CallbackObserver::new()
///     .on_progress(|p| println!("{:.0}%", p * 100.0))
///     .on_complete(|| println!("done"));
/// # drop(observer);
/// ```
#[derive(Default)]
pub struct CallbackObserver {
    start: Option<Callback>,
    progress: Option<ProgressCallback>,
    complete: Option<Callback>,
    cancel: Option<Callback>,
}

impl CallbackObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, callback: impl FnMut() + 'static) -> Self {
        self.start = Some(Box::new(callback));
        self
    }

    pub fn on_progress(mut self, callback: impl FnMut(f32) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.complete = Some(Box::new(callback));
        self
    }

    pub fn on_cancel(mut self, callback: impl FnMut() + 'static) -> Self {
        self.cancel = Some(Box::new(callback));
        self
    }
}

impl TransitionObserver for CallbackObserver {
    fn on_start(&mut self) {
        if let Some(callback) = self.start.as_mut() {
            callback();
        }
    }

    fn on_progress(&mut self, progress: f32) {
        if let Some(callback) = self.progress.as_mut() {
            callback(progress);
        }
    }

    fn on_complete(&mut self) {
        if let Some(callback) = self.complete.as_mut() {
            callback();
        }
    }

    fn on_cancel(&mut self) {
        if let Some(callback) = self.cancel.as_mut() {
            callback();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionEvent {
    Started,
    Progress(f32),
    Completed,
    Cancelled,
}

/// Forwards every notification as a [`TransitionEvent`]. Send failures
/// (receiver dropped) are ignored.
pub struct ChannelObserver {
    tx: Sender<TransitionEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<TransitionEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: Sender<TransitionEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: TransitionEvent) {
        let _ = self.tx.send(event);
    }
}

impl TransitionObserver for ChannelObserver {
    fn on_start(&mut self) {
        self.send(TransitionEvent::Started);
    }

    fn on_progress(&mut self, progress: f32) {
        self.send(TransitionEvent::Progress(progress));
    }

    fn on_complete(&mut self) {
        self.send(TransitionEvent::Completed);
    }

    fn on_cancel(&mut self) {
        self.send(TransitionEvent::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn callback_observer_only_runs_installed_hooks() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut observer = CallbackObserver::new().on_progress(move |p| sink.borrow_mut().push(p));
        TransitionObserver::on_start(&mut observer);
        TransitionObserver::on_progress(&mut observer, 0.25);
        TransitionObserver::on_complete(&mut observer);
        assert_eq!(*seen.borrow(), vec![0.25]);
    }

    #[test]
    fn channel_observer_forwards_events() {
        let (mut observer, rx) = ChannelObserver::new();
        observer.on_start();
        observer.on_progress(1.0);
        observer.on_complete();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                TransitionEvent::Started,
                TransitionEvent::Progress(1.0),
                TransitionEvent::Completed
            ]
        );
    }

    #[test]
    fn dropped_receiver_is_not_an_error() {
        let (mut observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_cancel();
    }
}
