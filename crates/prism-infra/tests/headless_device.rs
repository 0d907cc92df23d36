// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use prism_core::math::{LinearRgba, Mat4};
use prism_core::renderer::api::{
    BlendMode, BufferDescriptor, BufferUsage, DeviceCaps, DeviceState, DrawCall, MeshData,
    PassKind, RenderPassDescriptor, SwapChainDescriptor, TargetView, TextureDescriptor,
    TextureFormat, VertexSpace,
};
use prism_core::renderer::settings::{MsaaLevel, PolygonMode};
use prism_core::renderer::{GraphicsDevice, RenderError, ResourceError};
use prism_infra::HeadlessDevice;

fn swap_chain_desc() -> SwapChainDescriptor {
    SwapChainDescriptor {
        width: 32,
        height: 32,
        format: TextureFormat::Rgba8Unorm,
        buffer_count: 2,
        fullscreen: false,
        vsync: false,
        msaa: MsaaLevel::None,
    }
}

#[test]
fn test_device_state_machine() -> anyhow::Result<()> {
    let device = HeadlessDevice::new(DeviceCaps::high_end());
    assert_eq!(device.device_state(), DeviceState::Ok);

    let chain = device.create_swap_chain(&swap_chain_desc())?;
    let sampled = device.create_texture(&TextureDescriptor::sampled("white", 1, 1, 1))?;

    device.simulate_device_loss();
    assert_eq!(device.device_state(), DeviceState::Lost);
    assert!(device.reset(&swap_chain_desc()).is_err());
    assert!(matches!(
        device.create_texture(&TextureDescriptor::render_target(
            "rt",
            8,
            8,
            TextureFormat::Rgba8Unorm
        )),
        Err(ResourceError::DeviceNotReady(DeviceState::Lost))
    ));

    device.destroy_swap_chain(chain)?;
    assert_eq!(device.device_state(), DeviceState::NotReset);
    // Ordinary textures survive a loss.
    assert_eq!(device.live_textures(), 1);

    device.reset(&swap_chain_desc())?;
    assert_eq!(device.device_state(), DeviceState::Ok);
    device.destroy_texture(sampled)?;

    device.simulate_driver_failure();
    assert_eq!(device.device_state(), DeviceState::Error);
    assert!(matches!(
        device.reset(&swap_chain_desc()),
        Err(RenderError::DeviceError(_))
    ));
    Ok(())
}

#[test]
fn test_out_of_video_memory_is_reported_at_allocation() {
    let device = HeadlessDevice::new(DeviceCaps::high_end());
    device.set_vram_budget(1024);
    let result = device.create_texture(&TextureDescriptor::sampled("big", 64, 64, 1));
    match result {
        Err(ResourceError::OutOfVideoMemory {
            requested,
            available,
        }) => {
            assert_eq!(requested, 64 * 64 * 4);
            assert_eq!(available, 1024);
        }
        other => panic!("expected OutOfVideoMemory, got {other:?}"),
    }
    assert_eq!(device.vram_usage(), 0);
}

#[test]
fn test_texel_space_draw_is_read_back() -> anyhow::Result<()> {
    let device = HeadlessDevice::new(DeviceCaps::high_end());
    let quad = MeshData::unit_quad();
    let vb = device.create_buffer(
        &BufferDescriptor {
            label: "quad vertices".into(),
            usage: BufferUsage::Vertex,
        },
        bytemuck::cast_slice(&quad.vertices),
    )?;
    let ib = device.create_buffer(
        &BufferDescriptor {
            label: "quad indices".into(),
            usage: BufferUsage::Index,
        },
        bytemuck::cast_slice(&quad.indices),
    )?;
    let target = device.create_texture(&TextureDescriptor::render_target(
        "bake",
        16,
        16,
        TextureFormat::Rgba8Unorm,
    ))?;

    {
        let mut pass = device.begin_render_pass(&RenderPassDescriptor::cleared(
            PassKind::LightMapGeneration,
            TargetView::whole(target),
            LinearRgba::TRANSPARENT,
        ))?;
        pass.draw(&DrawCall {
            tag: 7,
            vertex_buffer: vb,
            index_buffer: ib,
            index_count: quad.indices.len() as u32,
            model: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            space: VertexSpace::Texel,
            color: LinearRgba::RED,
            shade: None,
            blend: BlendMode::Opaque,
            polygon: PolygonMode::Solid,
            states: Vec::new(),
            textures: Vec::new(),
        })?;
    }

    let image = device.read_back(TargetView::whole(target))?;
    assert_eq!((image.width, image.height), (16, 16));
    assert_eq!(image.texel(8, 8), [255, 0, 0, 255]);

    let log = device.frame_log();
    assert_eq!(log.kinds(), vec![PassKind::LightMapGeneration]);
    assert!(log.passes[0].drew(7));
    assert_eq!(log.passes[0].triangles, 2);
    Ok(())
}

#[test]
fn test_large_targets_are_read_back_at_nominal_size() -> anyhow::Result<()> {
    let device = HeadlessDevice::with_raster_limit(DeviceCaps::high_end(), 8);
    let target = device.create_texture(&TextureDescriptor::render_target(
        "shadow",
        64,
        64,
        TextureFormat::Rgba8Unorm,
    ))?;
    drop(device.begin_render_pass(&RenderPassDescriptor::cleared(
        PassKind::StaticShadow,
        TargetView::whole(target),
        LinearRgba::WHITE,
    ))?);
    let image = device.read_back(TargetView::whole(target))?;
    assert_eq!(image.rgba8.len(), 64 * 64 * 4);
    assert!(image.rgba8.iter().all(|&b| b == 255));
    Ok(())
}
