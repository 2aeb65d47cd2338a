//! Reference walk: generates a landscape, then scripts the scroll/drag
//! input a windowed build would receive and logs where the walker ends up.

use std::f32::consts::TAU;
use std::sync::Arc;

use log::info;

use torwalk_landscape::LandscapeBuilder;
use torwalk_model::{FollowCamera, SurfaceWalker, WalkerController};

fn main() {
    simple_logger::init().unwrap();

    // mirrors the stock scene: 300 cells around the hole, tube scaled to
    // keep cells roughly square
    let minor = 0.7;
    let major = 5.0;
    let y_frag = ((300.0 * minor / major) as usize).max(5);
    let mesh = LandscapeBuilder::new(300, y_frag, minor, major)
        .height_field(|u: f32, v: f32| ((u * 9. * TAU).sin() * (v * 5. * TAU).cos()).abs())
        .height_mult(0.8)
        .bedrock(0.3)
        .build()
        .unwrap();

    let mut walker = SurfaceWalker::new(Arc::new(mesh));
    let mut control = WalkerController::default();
    let mut camera = FollowCamera::default();
    camera.set_aspect(16.0 / 9.0);

    for tick in 0..240u32 {
        control.scroll(&mut walker, 1.0);
        if tick % 12 == 0 {
            control.drag(&mut walker, 8.0, 2.0);
        }

        camera.set_zoom(control.zoom());
        camera.follow(&walker, control.pitch());

        if tick % 24 == 0 {
            let p = walker.position();
            let f = walker.forward().normalize();
            info!(
                "tick {tick:3}: face {:5}, pos ({:6.2}, {:6.2}, {:6.2}), forward ({:5.2}, {:5.2}, {:5.2})",
                walker.current_face(),
                p.x, p.y, p.z,
                f.x, f.y, f.z,
            );
        }
    }

    info!("eye settled at {:?}", camera.pos());
    info!("view-projection:\n{}", camera.vp_mat());
}
