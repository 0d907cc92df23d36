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

//! Executes one pass: gather from every accepting executor, then submit.

use super::resource_cache::ResourceCache;
use prism_core::lane::Lane;
use prism_core::renderer::api::RenderPassDescriptor;
use prism_core::renderer::stats::PassStats;
use prism_core::renderer::{GraphicsDevice, RenderStats, ResourceError};
use prism_core::scene::Scene;
use prism_lanes::render_lane::{
    Command, CommandList, CommandOp, Executor, RenderContext, RenderExecutor,
};

/// Borrowed machinery shared by every pass of a frame.
pub(crate) struct PassRunner<'a> {
    pub(crate) cache: &'a ResourceCache,
    pub(crate) executors: &'a [Executor],
    pub(crate) stats: &'a mut RenderStats,
    pub(crate) commands: &'a mut CommandList,
}

impl PassRunner<'_> {
    /// Runs a pass through the executors.
    ///
    /// Executors accepting the pass gather in registration order into one
    /// combined list; each slice is then executed by the executor that
    /// gathered it.
    pub(crate) fn run(
        &mut self,
        ctx: &RenderContext,
        scene: &Scene,
        descriptor: &RenderPassDescriptor,
    ) -> Result<(), ResourceError> {
        let cache = self.cache;
        self.commands.clear();
        for (i, executor) in self.executors.iter().enumerate() {
            if executor.is_initialized() && executor.accepts(ctx.pass) {
                self.commands
                    .gather_into(i, |out| executor.gather_commands(ctx, scene, cache, out));
            }
        }

        log::trace!(
            "RenderAgent: Pass {} gathered {} commands",
            ctx.pass,
            self.commands.len()
        );

        let mut stats = PassStats::new(ctx.pass);
        {
            let mut pass = cache.device().begin_render_pass(descriptor)?;
            for (i, commands) in self.commands.spans() {
                self.executors[i].execute_commands(commands, &mut *pass)?;
                record(self.stats, &mut stats, commands);
            }
        }
        self.stats.passes.push(stats);
        Ok(())
    }
}

/// Runs a pass over commands gathered outside the executors.
pub(crate) fn submit_commands(
    device: &dyn GraphicsDevice,
    stats: &mut RenderStats,
    descriptor: &RenderPassDescriptor,
    commands: &[Command],
) -> Result<(), ResourceError> {
    let mut pass_stats = PassStats::new(descriptor.kind);
    {
        let mut pass = device.begin_render_pass(descriptor)?;
        for command in commands {
            command.submit(&mut *pass)?;
        }
    }
    record(stats, &mut pass_stats, commands);
    stats.passes.push(pass_stats);
    Ok(())
}

fn record(frame: &mut RenderStats, pass: &mut PassStats, commands: &[Command]) {
    for command in commands {
        pass.record(command.mode);
        if let CommandOp::Draw(call) = &command.op {
            frame.draw_calls += 1;
            frame.triangles += u64::from(call.index_count / 3);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::math::LinearRgba;
    use prism_core::renderer::api::{DeviceCaps, PassKind, TargetView, TextureDescriptor, TextureFormat};
    use prism_infra::HeadlessDevice;

    #[test]
    fn test_empty_pass_is_still_recorded() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let target = device
            .create_texture(&TextureDescriptor::render_target(
                "target",
                16,
                16,
                TextureFormat::Rgba8Unorm,
            ))
            .unwrap();
        let mut stats = RenderStats::default();
        let descriptor = RenderPassDescriptor::cleared(
            PassKind::Glow,
            TargetView::whole(target),
            LinearRgba::BLACK,
        );

        submit_commands(&device, &mut stats, &descriptor, &[]).unwrap();

        assert_eq!(stats.passes.len(), 1);
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(device.take_frame_log().kinds(), vec![PassKind::Glow]);
        device.destroy_texture(target).unwrap();
    }
}
