//! Scene graph configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for a [`SceneGraph`](crate::scene::SceneGraph).
///
/// All fields have defaults, so partial configs deserialize cleanly:
///
/// ```rust
/// use gsgamelib::SceneGraphSettings;
///
/// let release = SceneGraphSettings {
///     validate_each_frame: false,
///     track_destroyed: false,
///     ..Default::default()
/// };
/// assert_eq!(release.initial_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneGraphSettings {
    /// Run [`SceneGraph::validate`](crate::scene::SceneGraph::validate) after
    /// every update pass of the [`FrameDriver`](crate::frame::FrameDriver).
    ///
    /// Defaults to `true` in debug builds only.
    pub validate_each_frame: bool,

    /// Remember handles of destroyed nodes until the next validation, so the
    /// validator can confirm none of them still resolves.
    ///
    /// The list is only drained by
    /// [`SceneGraph::validate`](crate::scene::SceneGraph::validate). Turn this
    /// off when the graph is used without per-frame validation and nothing
    /// else calls `validate`, or the list keeps growing.
    ///
    /// Defaults to `true` in debug builds only.
    pub track_destroyed: bool,

    /// Number of node slots reserved up front.
    pub initial_capacity: usize,
}

impl Default for SceneGraphSettings {
    fn default() -> Self {
        Self {
            validate_each_frame: cfg!(debug_assertions),
            track_destroyed: cfg!(debug_assertions),
            initial_capacity: 256,
        }
    }
}
