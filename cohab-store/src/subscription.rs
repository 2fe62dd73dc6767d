use tokio::sync::watch;

/// A live view over store state.
///
/// Every delivery carries the complete current result set, never a diff, so
/// consumers replace their local copy on each emission. Dropping the handle
/// unsubscribes; callers release it when they navigate away from a room to
/// avoid leaking a listener per room ever visited.
pub struct Snapshots<T> {
    receiver: watch::Receiver<T>,
}

impl<T: Clone> Snapshots<T> {
    pub fn new(receiver: watch::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// The state as of the latest push
    pub fn current(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Waits for the next push and returns the full replacement state.
    /// Returns [None] once the publishing side has gone away.
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}
