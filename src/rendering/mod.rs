pub mod backbuffer;
pub mod context;
pub mod overlay;
pub mod preview;
pub mod raster;
pub mod surface;

// Re-export main types
pub use backbuffer::{
    render_backbuffer, Backbuffer, BackbufferRenderer, RedrawStats, RedrawUpdate, ViewSnapshot,
};
pub use context::{DrawCommand, RenderContext};
pub use preview::ScaledPreview;
pub use raster::RasterSurface;
pub use surface::{Color, DrawingSurface, Pen};
