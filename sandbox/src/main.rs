use anyhow::{Context, Result};
use prism_agents::{RenderAgent, RendererConfig};
use prism_core::math::{FRAC_PI_4, LinearRgba, Mat4, Vec3};
use prism_core::renderer::api::{DeviceCaps, MeshData};
use prism_core::renderer::light::PointLight;
use prism_core::scene::{Camera, InstanceFlags, Material, MeshInstance, Scene};
use prism_infra::HeadlessDevice;
use std::path::PathBuf;
use std::sync::Arc;

const FRAMES: u32 = 4;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RendererConfig::load(&path)?,
        None => RendererConfig::default(),
    };
    let output = args.next().map_or_else(std::env::temp_dir, PathBuf::from);
    prism_telemetry::init_logging(&config.logging);

    let device = HeadlessDevice::new(DeviceCaps::high_end());
    let mut renderer = RenderAgent::new(Arc::new(device.clone()), &config)
        .context("Failed to create the renderer")?;
    let (mut scene, ground) = build_scene(&mut renderer)?;
    let camera = Camera::look_at(
        Vec3::new(0.0, 3.0, 9.0),
        Vec3::ZERO,
        Vec3::Y,
        FRAC_PI_4,
        config.settings.width.max(1) as f32 / config.settings.height.max(1) as f32,
        0.1,
        200.0,
    )
    .context("Degenerate camera")?;

    let view = renderer.default_view();
    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            log::info!("Sandbox: Simulating a device loss");
            device.simulate_device_loss();
        }
        if renderer.device_state().is_ok() {
            renderer.render_scene(view, &mut scene, &camera)?;
            renderer.present(view)?;
            log::info!("Sandbox: {}", renderer.render_stats());
        } else {
            log::warn!("Sandbox: Device is {}, recovering", renderer.device_state());
            renderer.on_device_lost();
            renderer.on_device_reset()?;
        }
    }
    log::info!(
        "Sandbox: {:?}, {} bytes of VRAM in use",
        renderer.frame_timings(),
        renderer.vram_usage()
    );

    let light_map = renderer
        .generate_light_map((128, 128), &mut scene, ground)
        .context("Light map bake failed")?;
    let path = output.join("sandbox_light_map.png");
    light_map
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Sandbox: Wrote {}", path.display());

    renderer.shutdown();
    Ok(())
}

fn build_scene(renderer: &mut RenderAgent) -> Result<(Scene, prism_core::scene::InstanceId)> {
    let mut scene = Scene::new();
    scene.fog.color = LinearRgba::rgb(0.35, 0.45, 0.6);
    scene
        .point_lights
        .push(PointLight::new(Vec3::new(-2.0, 2.0, 1.0), 6.0, 1.5));

    let cube = MeshData::unit_cube();
    let cube_handle = renderer.upload_mesh(&cube)?;
    let ground = scene.add_mesh(
        MeshInstance::new(
            cube_handle,
            cube.bounds(),
            Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)) * Mat4::from_scale(Vec3::new(8.0, 0.2, 8.0)),
            Material::colored(LinearRgba::rgb(0.5, 0.6, 0.4)),
        )
        .with_flags(InstanceFlags {
            static_shadow_caster: true,
            dynamic_shadow_receiver: true,
            static_lighting: true,
            ..InstanceFlags::default()
        }),
    );
    scene.add_mesh(
        MeshInstance::new(cube_handle, cube.bounds(), Mat4::from_translation(Vec3::new(-1.5, 0.0, 0.0)), Material::default())
            .with_flags(InstanceFlags {
                static_shadow_caster: true,
                dynamic_shadow_caster: true,
                ..InstanceFlags::default()
            }),
    );

    let sphere = MeshData::uv_sphere(24, 12);
    let sphere_handle = renderer.upload_mesh(&sphere)?;
    scene.add_mesh(MeshInstance::new(
        sphere_handle,
        sphere.bounds(),
        Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0)),
        Material {
            reflectivity: 0.8,
            glow: 0.3,
            ..Material::default()
        },
    ));
    Ok((scene, ground))
}
