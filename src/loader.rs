//! Background image loading for the canvas.
//!
//! Decoding (and fetching, for URLs) runs off the UI thread. Every request
//! gets a ticket and only the most recently requested load may complete:
//! starting a new one drops the receiver of the old one, so a slow stale
//! load can never replace a newer image.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::api::MemeApi;
use crate::error::LoadError;
use crate::scene::{Background, BackgroundSource};
use crate::task::{Pending, Spawner, spawn_task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub result: Result<Background, LoadError>,
}

pub struct ImageLoader {
    spawner: Arc<dyn Spawner>,
    api: Arc<dyn MemeApi>,
    next_ticket: u64,
    in_flight: Option<(LoadTicket, Pending<Result<Background, LoadError>>)>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("next_ticket", &self.next_ticket)
            .field("in_flight", &self.in_flight.as_ref().map(|(ticket, _)| *ticket))
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    pub fn new(spawner: Arc<dyn Spawner>, api: Arc<dyn MemeApi>) -> Self {
        Self {
            spawner,
            api,
            next_ticket: 0,
            in_flight: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Decode already-read bytes, e.g. from a drop with inline contents
    pub fn request_bytes(&mut self, bytes: Vec<u8>, source: BackgroundSource) -> LoadTicket {
        self.start("decode-image", move || Background::decode(&bytes, source))
    }

    /// The format is sniffed from the file contents; the extension is ignored
    pub fn request_path(&mut self, path: &Path) -> LoadTicket {
        let path = path.to_path_buf();
        self.start("read-image", move || {
            let label = path.display().to_string();
            let bytes = std::fs::read(&path)?;
            if image::guess_format(&bytes).is_err() {
                return Err(LoadError::NotAnImage(label));
            }
            Background::decode(&bytes, BackgroundSource::File(label))
        })
    }

    /// Fetch the bytes ourselves so the canvas never holds pixels it cannot export
    pub fn request_url(&mut self, url: &str) -> LoadTicket {
        let url = url.trim().to_owned();
        let api = Arc::clone(&self.api);
        self.start("fetch-image", move || {
            let bytes = api.download(&url)?;
            Background::decode(&bytes, BackgroundSource::Url(url))
        })
    }

    /// Drop the current request, if any
    pub fn cancel(&mut self) {
        if let Some((ticket, _)) = self.in_flight.take() {
            debug!("Image load {ticket:?} cancelled");
        }
    }

    /// The finished load, if the latest request has completed
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let (ticket, pending) = self.in_flight.as_mut()?;
        let ticket = *ticket;
        let result = match pending.try_take() {
            Ok(None) => return None,
            Ok(Some(result)) => result,
            Err(lost) => Err(LoadError::Lost(lost)),
        };
        self.in_flight = None;

        match &result {
            Ok(background) => info!(
                "Image load {ticket:?} finished: {}x{}",
                background.width(),
                background.height()
            ),
            Err(err) => warn!("Image load {ticket:?} failed: {err}"),
        }
        Some(LoadOutcome { ticket, result })
    }

    fn start<F>(&mut self, name: &str, job: F) -> LoadTicket
    where
        F: FnOnce() -> Result<Background, LoadError> + Send + 'static,
    {
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        if let Some((stale, _)) = self.in_flight.take() {
            debug!("Image load {stale:?} superseded by {ticket:?}");
        }
        let pending = spawn_task(self.spawner.as_ref(), name, job);
        self.in_flight = Some((ticket, pending));
        ticket
    }
}
