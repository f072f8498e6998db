use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Navigation event broadcast between linked chart surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LinkEvent {
    Pan { steps: i64 },
    Zoom { factor: f64, auto_adjust: bool },
}

/// Observer interface for linked pan/zoom across chart surfaces.
///
/// Registration is explicit in both directions: an observer that goes away
/// must be unregistered by id, there is no weak-reference liveness probing.
pub trait SurfaceLinkObserver {
    fn id(&self) -> &str;
    fn on_link_event(&mut self, event: LinkEvent);
}

/// Broadcast hub connecting several chart surfaces' navigation.
#[derive(Default)]
pub struct SurfaceLink {
    observers: Vec<Box<dyn SurfaceLinkObserver>>,
}

impl SurfaceLink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer with a unique identifier.
    pub fn register(&mut self, observer: Box<dyn SurfaceLinkObserver>) -> ChartResult<()> {
        let observer_id = observer.id().to_owned();
        if observer_id.is_empty() {
            return Err(ChartError::InvalidData(
                "link observer id must not be empty".to_owned(),
            ));
        }
        if self
            .observers
            .iter()
            .any(|entry| entry.id() == observer_id)
        {
            return Err(ChartError::InvalidData(format!(
                "link observer with id `{observer_id}` is already registered"
            )));
        }
        self.observers.push(observer);
        Ok(())
    }

    /// Unregisters an observer by id. Returns `true` when removed.
    pub fn unregister(&mut self, observer_id: &str) -> bool {
        if let Some(position) = self
            .observers
            .iter()
            .position(|entry| entry.id() == observer_id)
        {
            self.observers.remove(position);
            return true;
        }
        false
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Delivers an event to every observer except the originator.
    pub fn broadcast(&mut self, origin_id: &str, event: LinkEvent) {
        for observer in &mut self.observers {
            if observer.id() != origin_id {
                observer.on_link_event(event);
            }
        }
    }
}
