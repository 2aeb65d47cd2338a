use std::f32::consts::TAU;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::walker::SurfaceWalker;

const SCROLL_STEP: f32 = 0.05;
const MOUSE_SENS: f32 = 0.005;

/// Translates raw scroll and drag deltas into walker commands and camera
/// parameters.
///
/// The controller owns the view-tuning state (zoom, pitch, accumulated
/// heading) and borrows the walker per event, so event wiring holds one of
/// these instead of reaching for the walker through a global.
#[derive(Debug, Clone)]
pub struct WalkerController {
    scroll_step: f32,
    mouse_sens: f32,
    zoom: f32,
    pitch: f32,
    heading: f32,
}

impl WalkerController {
    pub fn new() -> Self {
        Self {
            scroll_step: SCROLL_STEP,
            mouse_sens: MOUSE_SENS,
            zoom: 1.0,
            pitch: 0.2,
            heading: 0.0,
        }
    }

    /// Scrolling steps the walker, forward on scroll-up, and zooms the
    /// camera out one notch per tick of scroll-up.
    pub fn scroll(&mut self, walker: &mut SurfaceWalker, yoffset: f32) {
        self.zoom = (self.zoom - yoffset * self.scroll_step).clamp(0.1, 10.0);
        walker.step_forward(if yoffset > 0.0 { 1 } else { -1 });
    }

    /// Dragging turns the walker with horizontal motion and pitches the
    /// camera with vertical motion.
    pub fn drag(&mut self, walker: &mut SurfaceWalker, xoffset: f32, yoffset: f32) {
        let turn = xoffset * self.mouse_sens;
        walker.rotate(turn);
        self.heading = (self.heading + turn).rem_euclid(TAU);
        self.pitch = (self.pitch + yoffset * self.mouse_sens).clamp(-0.1, 0.4);
        trace!("drag: heading {:.3}, pitch {:.3}", self.heading, self.pitch);
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Total turn applied so far, wrapped to one revolution.
    pub fn heading(&self) -> f32 {
        self.heading
    }
}

impl Default for WalkerController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::test_torus_grid;
    use approx::assert_relative_eq;

    fn walker() -> SurfaceWalker {
        SurfaceWalker::new(test_torus_grid(10, 10, 1., 5.))
    }

    #[test]
    fn pitch_clamps_to_its_interval() {
        let mut w = walker();
        let mut ctl = WalkerController::new();
        for _ in 0..500 {
            ctl.drag(&mut w, 0., 10.);
        }
        assert_relative_eq!(ctl.pitch(), 0.4);
        for _ in 0..500 {
            ctl.drag(&mut w, 0., -10.);
        }
        assert_relative_eq!(ctl.pitch(), -0.1);
    }

    #[test]
    fn zoom_clamps_to_its_interval() {
        let mut w = walker();
        let mut ctl = WalkerController::new();
        for _ in 0..500 {
            ctl.scroll(&mut w, 1.);
        }
        assert_relative_eq!(ctl.zoom(), 0.1);
        for _ in 0..500 {
            ctl.scroll(&mut w, -1.);
        }
        assert_relative_eq!(ctl.zoom(), 10.);
    }

    #[test]
    fn scroll_direction_picks_the_step_sign() {
        let mut w = walker();
        let mut ctl = WalkerController::new();
        let start = w.flat_pos();

        ctl.scroll(&mut w, 1.);
        assert!(w.flat_pos().y > start.y, "scroll up should step forward");

        ctl.scroll(&mut w, -1.);
        assert_relative_eq!(w.flat_pos(), start, epsilon = 1e-3);
    }

    #[test]
    fn drag_turns_the_heading() {
        let mut w = walker();
        let mut ctl = WalkerController::new();
        let before = w.flat_dir();
        ctl.drag(&mut w, 40., 0.);
        assert!((w.flat_dir() - before).norm() > 1e-3);
        assert_relative_eq!(ctl.heading(), 40. * MOUSE_SENS, epsilon = 1e-6);
    }

    #[test]
    fn heading_wraps_at_a_full_turn() {
        let mut w = walker();
        let mut ctl = WalkerController::new();
        let per_drag = TAU / 8.;
        for _ in 0..8 {
            ctl.drag(&mut w, per_drag / MOUSE_SENS, 0.);
        }
        assert!(ctl.heading() < 1e-3 || ctl.heading() > TAU - 1e-3);
    }
}
