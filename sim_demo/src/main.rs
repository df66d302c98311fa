//! Headless frame loop demo
//!
//! Spawns randomly moving bodies in a kinematic world, removes them when they
//! drift out of range, and renders every frame through the in-memory device.
//!
//! Usage: `sim_demo [config.toml|config.ron] [frames]`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_render::foundation::logging;
use sim_render::prelude::*;
use sim_render::render::device::HeadlessDeviceConfig;
use sim_render::render::program::source;

const DEFAULT_FRAMES: u64 = 600;
const FRAME_DT: f32 = 1.0 / 60.0;
const SPAWN_EVERY: u64 = 8;
const MAX_BODIES: usize = 64;
const WORLD_RADIUS: f32 = 25.0;
const STATS_EVERY: u64 = 120;
const CALL_LOG_CAPACITY: usize = 4096;

/// One kind of body the demo can spawn
struct Archetype {
    shape: ShapeHandle,
    summary: ShapeSummary,
    program: &'static str,
    color: Color,
}

fn archetypes(world: &mut SimpleWorld) -> Result<Vec<Archetype>, Box<dyn std::error::Error>> {
    let sphere = world.add_shape(ShapeDesc::Sphere { radius: 0.75 });
    let crate_box = world.add_shape(ShapeDesc::Cuboid { half_extents: Vec3::new(0.5, 0.5, 0.5) });
    let ring = world.add_shape(ShapeDesc::Ring { radius: 1.2 });

    Ok(vec![
        Archetype {
            shape: sphere,
            summary: ShapeSummary::untextured(Resolution::High, NormalStrategy::Sphere),
            program: source::LIT_LAMBERT,
            color: Color::rgb(0.8, 0.7, 0.5),
        },
        Archetype {
            shape: crate_box,
            summary: ShapeSummary::untextured(Resolution::Low, NormalStrategy::Facet),
            program: source::LIT_LAMBERT,
            color: Color::rgb(0.4, 0.6, 0.9),
        },
        Archetype {
            shape: ring,
            summary: ShapeSummary::untextured(Resolution::High, NormalStrategy::None),
            program: source::UNLIT_MONOCHROME,
            color: Color::GREEN,
        },
        Archetype {
            shape: sphere,
            summary: ShapeSummary::new(
                Resolution::Low,
                NormalStrategy::None,
                Some(UvStrategy::Spherical),
                Some(UvCoefficients::equirectangular()),
            )?,
            program: source::DEBUG_UV,
            color: Color::WHITE,
        },
    ])
}

fn random_vec(rng: &mut StdRng, magnitude: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-magnitude..magnitude),
        rng.gen_range(-magnitude..magnitude),
        rng.gen_range(-magnitude..magnitude),
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RendererConfig::load_or_default(path)?,
        None => RendererConfig::new("sim_demo"),
    };
    let frames = match args.next() {
        Some(frames) => frames.parse()?,
        None => DEFAULT_FRAMES,
    };

    logging::init_with_config(&config);

    log::info!("Starting sim_demo for {frames} frames");

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut world = SimpleWorld::new();
    let kinds = archetypes(&mut world)?;
    let device = HeadlessDevice::with_config(HeadlessDeviceConfig {
        max_logged_calls: Some(CALL_LOG_CAPACITY),
        ..Default::default()
    });
    let mut renderer = Renderer::new(config, device);

    let mut camera = Camera::perspective(Vec3::new(0.0, 12.0, 40.0), 50.0, 16.0 / 9.0, ClipPlanes::default());
    camera.look_at(Vec3::zeros());
    let light = DirectionalLight::new(Vec3::new(-0.3, -1.0, -0.5), Color::rgb(1.0, 0.95, 0.9));

    let mut spawned = 0usize;
    let mut removed = 0usize;
    for frame in 1..=frames {
        if frame % SPAWN_EVERY == 0 && world.body_count() < MAX_BODIES {
            let kind = &kinds[rng.gen_range(0..kinds.len())];
            let transform = Transform::from_position(random_vec(&mut rng, 5.0));
            let body = world.add_body(kind.shape, transform);
            world.set_velocity(body, random_vec(&mut rng, 4.0), random_vec(&mut rng, 2.0));
            renderer.spawn_for_body(&world, body, kind.shape, &kind.summary, kind.program, kind.color)?;
            spawned += 1;
        }

        world.step(FRAME_DT);
        let escaped: Vec<BodyHandle> = world
            .body_handles()
            .filter(|&body| world.body(body).is_some_and(|b| b.transform.position.norm() > WORLD_RADIUS))
            .collect();
        for body in escaped {
            world.remove_body(body);
            removed += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let state = FrameState::new(camera)
            .with_light(light)
            .with_elapsed(frame as f32 * FRAME_DT);
        let stats = renderer.render_frame(&world, &state)?;

        if frame % STATS_EVERY == 0 {
            let cache = renderer.mesh_cache().stats();
            log::info!(
                "frame {}: {} draws, {} binds, {} uploads, {} destroyed, {} reclaimed, cache {}/{} hits, {} live meshes",
                stats.frame,
                stats.draw.draws,
                stats.draw.program_binds,
                stats.broadcast.uniform_uploads,
                stats.destroyed,
                stats.reclaimed,
                cache.hits,
                cache.hits + cache.misses,
                cache.live_entries
            );
        }
    }

    let device = renderer.device();
    log::info!(
        "Spawned {spawned} bodies, removed {removed}; {} draw calls, {} floats uploaded",
        device.draw_calls(),
        device.floats_uploaded()
    );

    renderer.shutdown()?;
    log::info!(
        "Shutdown complete: {} buffers, {} vertex arrays, {} programs still live",
        renderer.device().live_buffers(),
        renderer.device().live_vertex_arrays(),
        renderer.device().live_programs()
    );
    Ok(())
}
