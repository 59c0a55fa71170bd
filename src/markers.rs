use std::{
    collections::HashMap,
    fmt,
    time::Duration,
};
use tokio::{
    task::AbortHandle,
    time::{
        self,
        Instant,
    },
};

/// How long a "+1" marker stays on screen.
pub const MARKER_LIFETIME: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MarkerId(u64);

impl From<u64> for MarkerId {
    fn from(raw: u64) -> Self {
        MarkerId(raw)
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker-{}", self.0)
    }
}

/// Tap coordinate relative to the top-left corner of the tap surface.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TapPosition {
    pub x: u16,
    pub y: u16,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub x: u16,
    pub y: u16,
}

/// Live markers plus the timers that retire them.
///
/// Every timer is aborted when the board is dropped, so a torn-down session
/// never receives late expiry callbacks.
pub struct MarkerBoard {
    lifetime: Duration,
    next_id: u64,
    markers: Vec<Marker>,
    timers: HashMap<MarkerId, AbortHandle>,
}

impl MarkerBoard {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            next_id: 0,
            markers: Vec::new(),
            timers: HashMap::new(),
        }
    }

    /// Places a marker and schedules `on_expire` to run once its lifetime is up.
    ///
    /// The callback only reports the expiry; the owner removes the marker with
    /// [`MarkerBoard::remove`] on its own loop.
    pub fn place<F>(&mut self, at: TapPosition, on_expire: F) -> MarkerId
    where
        F: FnOnce(MarkerId) + Send + 'static,
    {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.markers.push(Marker {
            id,
            x: at.x,
            y: at.y,
        });

        let deadline = Instant::now() + self.lifetime;
        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            on_expire(id);
        });
        self.timers.insert(id, handle.abort_handle());
        id
    }

    pub fn remove(&mut self, id: MarkerId) -> bool {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
        let before = self.markers.len();
        self.markers.retain(|marker| marker.id != id);
        self.markers.len() != before
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        self.markers.clear();
    }
}

impl Default for MarkerBoard {
    fn default() -> Self {
        Self::new(MARKER_LIFETIME)
    }
}

impl Drop for MarkerBoard {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
