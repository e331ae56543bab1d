/// Scene, script and compositor configuration models.
pub mod model;
/// Frame-count and transition-window math.
pub mod timeline;
