mod link;
mod surface;

pub use link::{LinkEvent, SurfaceLink, SurfaceLinkObserver};
pub use surface::{ChartSurface, ChartSurfaceConfig, SurfaceAction};
