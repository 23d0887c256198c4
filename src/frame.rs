//! Per-frame driver.
//!
//! [`FrameDriver`] runs the game loop's scene phases in order:
//!
//! 1. snapshot every live node
//! 2. update each node of the snapshot that is still alive
//! 3. validate the graph (when [`SceneGraphSettings::validate_each_frame`] is set)
//! 4. snapshot again and render each live node
//!
//! Components may create, move, re-parent or destroy nodes during the update
//! phase. Nodes created during a frame are first updated on the next frame;
//! nodes destroyed during a frame are skipped for the rest of it.
//!
//! [`SceneGraphSettings::validate_each_frame`]: crate::settings::SceneGraphSettings::validate_each_frame

use crate::errors::Result;
use crate::scene::SceneGraph;

/// Counters collected over one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Nodes whose components were updated.
    pub updated: usize,
    /// Snapshot entries destroyed before their turn came.
    pub skipped: usize,
    /// Nodes whose components were rendered.
    pub rendered: usize,
}

/// Drives update, validation and render passes over a [`SceneGraph`].
///
/// # Lifecycle
///
/// 1. Create with [`FrameDriver::new`] or [`FrameDriver::default`]
/// 2. Call [`tick`](Self::tick) once per frame with the real delta time
/// 3. Pause with [`set_paused`](Self::set_paused) to freeze updates while
///    rendering continues
/// 4. While paused, advance one frame at a time with
///    [`step_frame`](Self::step_frame)
#[derive(Debug, Clone)]
pub struct FrameDriver {
    paused: bool,
    /// Run the next update even though paused.
    step_requested: bool,
    time_scale: f32,

    time: f32,
    frame_count: u64,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDriver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            paused: false,
            step_requested: false,
            time_scale: 1.0,
            time: 0.0,
            frame_count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            log::debug!("Frame driver {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn toggle_paused(&mut self) {
        self.set_paused(!self.paused);
    }

    /// Lets the next [`update`](Self::update) run one normal pass while
    /// paused. The driver stays paused afterwards.
    ///
    /// Requesting a step every frame keeps stepping for as long as the
    /// requests continue. Without a pause the request has no effect and is
    /// dropped by the next update.
    pub fn step_frame(&mut self) {
        self.step_requested = true;
    }

    /// `true` if a step was requested and the next update has not run yet.
    #[inline]
    #[must_use]
    pub fn is_step_pending(&self) -> bool {
        self.step_requested
    }

    /// Multiplier applied to every delta time handed to components.
    #[inline]
    #[must_use]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Negative values are clamped to zero.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Scaled game time accumulated over unpaused frames, in seconds.
    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Number of frames run, paused ones included.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Runs one full frame: update, validation, render.
    pub fn tick(&mut self, graph: &mut SceneGraph, dt: f32) -> Result<FrameStats> {
        let mut stats = self.update(graph, dt)?;
        stats.rendered = self.render(graph);
        Ok(stats)
    }

    /// Update phase followed by validation.
    ///
    /// While paused no component is updated, unless a step was requested
    /// with [`step_frame`](Self::step_frame). Validation always runs.
    pub fn update(&mut self, graph: &mut SceneGraph, dt: f32) -> Result<FrameStats> {
        self.frame_count += 1;
        let mut stats = FrameStats::default();
        let stepping = std::mem::take(&mut self.step_requested);

        if !self.paused || stepping {
            let dt = dt * self.time_scale;
            self.time += dt;

            for node in graph.snapshot() {
                if !graph.contains(node) {
                    stats.skipped += 1;
                    continue;
                }
                graph.update_node(node, dt)?;
                stats.updated += 1;
            }
        }

        if graph.settings().validate_each_frame {
            graph.validate()?;
        }

        log::trace!(
            "Frame {}: {} nodes updated, {} skipped",
            self.frame_count,
            stats.updated,
            stats.skipped
        );
        Ok(stats)
    }

    /// Render phase over a fresh snapshot. Returns the number of nodes rendered.
    pub fn render(&self, graph: &SceneGraph) -> usize {
        graph
            .snapshot()
            .into_iter()
            .filter(|&node| graph.render_node(node).is_ok())
            .count()
    }
}
