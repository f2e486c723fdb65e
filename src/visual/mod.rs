//! Procedural visual-entity engine: color mapping, composite shapes,
//! and the bounded-lifetime animation of tracked entities.

pub mod animator;
pub mod color;
pub mod mapper;
pub mod spawner;
pub mod surface;

pub use animator::{AnimationReport, EntityAnimator, EntityState, VisualEntity};
pub use color::Rgb;
pub use mapper::{FeatureToVisualMapper, VisualStyle};
pub use spawner::{Archetype, Motion, StrokeOrientation, StrokeSpawner, VisualEntitySpawner};
pub use surface::{BBox, Canvas, CircleStyle, DrawingSurface, Handle, Paint, Point, Primitive};
