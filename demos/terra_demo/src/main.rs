//! Spinning cube demo.
//!
//! Drives `Renderer` end to end against the VS-individual engine variant:
//! one pipeline, one mesh bundle, one model bundle, one model whose
//! transform is updated every frame.

use std::time::Instant;

use ash::vk;
use terra::engine::MeshBundleSource;
use terra::foundation::math::{Quat, Transform, Vec3};
use terra::pipeline::GraphicsPipelineBuilder;
use terra::{RenderEngineKind, Renderer, RendererConfig};

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    colour: [f32; 3],
    uv: [f32; 2],
}

fn cube_vertices() -> Vec<Vertex> {
    const P: f32 = 0.5;
    vec![
        Vertex { position: [-P, -P, -P], colour: [1.0, 0.0, 0.0], uv: [0.0, 0.0] },
        Vertex { position: [P, -P, -P], colour: [0.0, 1.0, 0.0], uv: [1.0, 0.0] },
        Vertex { position: [P, P, -P], colour: [0.0, 0.0, 1.0], uv: [1.0, 1.0] },
        Vertex { position: [-P, P, -P], colour: [1.0, 1.0, 0.0], uv: [0.0, 1.0] },
        Vertex { position: [-P, -P, P], colour: [1.0, 0.0, 1.0], uv: [0.0, 0.0] },
        Vertex { position: [P, -P, P], colour: [0.0, 1.0, 1.0], uv: [1.0, 0.0] },
        Vertex { position: [P, P, P], colour: [1.0, 1.0, 1.0], uv: [1.0, 1.0] },
        Vertex { position: [-P, P, P], colour: [0.2, 0.2, 0.2], uv: [0.0, 1.0] },
    ]
}

const CUBE_INDICES: [u32; 36] = [
    0, 1, 2, 2, 3, 0, // back
    4, 6, 5, 6, 4, 7, // front
    4, 0, 3, 3, 7, 4, // left
    1, 5, 6, 6, 2, 1, // right
    3, 2, 6, 6, 7, 3, // top
    4, 5, 1, 1, 0, 4, // bottom
];

fn main() -> terra::Result<()> {
    env_logger::init();

    let config = RendererConfig {
        application_name: "Terra Cube Demo".to_string(),
        engine_kind: RenderEngineKind::VsIndividual,
        ..RendererConfig::default()
    };

    let mut renderer = Renderer::new(&config)?;
    renderer.finalise_initialisation()?;

    let pipeline = renderer.add_pipeline(
        GraphicsPipelineBuilder::new()
            .set_vertex_stage("cube.vert.spv", "cube.frag.spv")
            .add_colour_attachment(renderer.swapchain_format(), false)
            .set_depth_stencil_state(false, false, vk::CompareOp::ALWAYS, vk::Format::UNDEFINED),
    )?;

    let vertices = cube_vertices();
    let vertex_bytes = bytemuck::cast_slice(&vertices);
    let aabb = terra::foundation::Aabb::new(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5));
    let mesh_bundle = renderer.add_mesh_bundle(MeshBundleSource::Vertex {
        vertex_bytes,
        indices: &CUBE_INDICES,
        aabb,
    })?;

    let model_bundle = renderer.add_model_bundle();
    let model = renderer.add_model(model_bundle, pipeline, mesh_bundle, Transform::identity())?;

    renderer.add_camera(terra::Camera {
        eye: Vec3::new(2.5, 2.0, 3.5),
        target: Vec3::new(0.0, 0.0, 0.0),
        up: Vec3::new(0.0, 1.0, 0.0),
        fov_y: std::f32::consts::FRAC_PI_3,
        near: 0.1,
        far: 100.0,
    });

    renderer.set_background_colour([0.02, 0.02, 0.05, 1.0]);

    let start = Instant::now();
    while !renderer.should_close() {
        renderer.poll_events();

        let angle = start.elapsed().as_secs_f32();
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), angle);
        renderer.set_model_visible(model, true)?;
        renderer.update_model_transform(model, Transform::from_position_rotation(Vec3::zeros(), rotation))?;

        renderer.render()?;
    }

    renderer.wait_for_gpu_to_finish()?;
    Ok(())
}
