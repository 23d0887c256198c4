#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod frame;
pub mod math;
pub mod scene;
pub mod settings;

pub use errors::{Result, SceneError};
pub use frame::{FrameDriver, FrameStats};
pub use math::{AffineExt, EulerAngles};
pub use scene::{
    CacheState, Component, ComponentContext, ComponentHandle, NodeHandle, NodeMut, RenderContext,
    SceneGraph, SceneNode, TransformStats, TraversalOrder,
};
pub use settings::SceneGraphSettings;
