use std::fmt;
use std::time::Instant;

use anyhow::Result;
use automaton::{
    AllocationError, Extent, FrameCounter, InteractionStage, KernelImage, KernelPolicy,
    KernelTaps, Parameters, PipelineError, PointerState, SchedulerState,
};
use crossbeam_channel::{Receiver, Sender};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, error};
use winit::dpi::PhysicalSize;

use crate::runtime::FrameStats;
use crate::types::GpuPowerPreference;

use super::context::GpuContext;
use super::pipeline::{encode_pass, Passes};
use super::textures::{check_extent, KernelTexture, PingPong};
use super::uniforms::SimUniforms;

/// GPU-resident simulation bound to a window surface.
///
/// Runs the same frame sequence as `automaton::Pipeline`: interaction
/// (when active) with promotion into the read buffer, update, present, swap.
pub(crate) struct GpuSimulation {
    context: GpuContext,
    passes: Passes,
    uniform_buffer: wgpu::Buffer,
    state: PingPong,
    kernel: KernelTexture,
    taps: KernelTaps,
    kernel_source: Parameters,
    policy: KernelPolicy,
    bind_groups: [wgpu::BindGroup; 2],
    phase: SchedulerState,
    frame: FrameCounter,
    resize_tx: Sender<Extent>,
    resize_rx: Receiver<Extent>,
    stats: FrameStats,
}

impl GpuSimulation {
    pub(crate) fn new<T>(
        target: &T,
        surface_size: PhysicalSize<u32>,
        extent: Extent,
        params: &Parameters,
        policy: KernelPolicy,
        gpu_power: GpuPowerPreference,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, surface_size, gpu_power)?;
        let passes = Passes::new(&context.device, context.surface_format)?;
        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("simulation uniforms"),
            size: std::mem::size_of::<SimUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        check_extent(extent, context.max_texture_dimension)?;
        let state = PingPong::new(&context.device, extent)?;
        let taps = build_taps(params);
        let kernel = KernelTexture::new(&context.device, &context.queue, &taps)?;
        let bind_groups = passes.bind_groups(&context.device, &uniform_buffer, &state, &kernel);
        let (resize_tx, resize_rx) = crossbeam_channel::unbounded();

        tracing::info!(
            width = extent.width,
            height = extent.height,
            reach = taps.reach(),
            "GPU simulation running"
        );

        Ok(Self {
            context,
            passes,
            uniform_buffer,
            state,
            kernel,
            taps,
            kernel_source: *params,
            policy,
            bind_groups,
            phase: SchedulerState::Running,
            frame: FrameCounter::default(),
            resize_tx,
            resize_rx,
            stats: FrameStats::new(Instant::now()),
        })
    }

    pub(crate) fn extent(&self) -> Extent {
        self.state.extent
    }

    pub(crate) fn frame(&self) -> u64 {
        self.frame.get()
    }

    pub(crate) fn surface_size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Reconfigures the swapchain; the simulation grid is untouched.
    pub(crate) fn resize_surface(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    /// Queues a cold reset at `extent` for the next frame boundary.
    pub(crate) fn request_resize(&self, extent: Extent) {
        // The receiver lives in `self`, so the send cannot fail.
        let _ = self.resize_tx.send(extent);
    }

    /// Applies the most recent queued resize as a cold reset: fresh state
    /// buffers, a regenerated kernel and a zeroed frame counter. A failed
    /// reset leaves the simulation in `Resetting` and is returned to the
    /// caller.
    fn apply_pending_resize(&mut self) -> Result<(), PipelineError> {
        let Some(extent) = self.resize_rx.try_iter().last() else {
            return Ok(());
        };
        if extent == self.state.extent {
            return Ok(());
        }
        self.phase = SchedulerState::Resetting;
        if let Err(err) = self.reallocate(extent) {
            error!(%extent, error = %err, "GPU simulation reset failed");
            return Err(err.into());
        }
        self.frame.reset();
        self.phase = SchedulerState::Running;
        tracing::info!(width = extent.width, height = extent.height, "GPU simulation reset");
        Ok(())
    }

    fn reallocate(&mut self, extent: Extent) -> Result<(), AllocationError> {
        check_extent(extent, self.context.max_texture_dimension)?;
        self.state = PingPong::new(&self.context.device, extent)?;
        self.taps = build_taps(&self.kernel_source);
        self.kernel = KernelTexture::new(&self.context.device, &self.context.queue, &self.taps)?;
        self.rebuild_bind_groups();
        Ok(())
    }

    fn refresh_kernel(&mut self, params: &Parameters) -> Result<(), AllocationError> {
        if self.policy != KernelPolicy::Track || !params.kernel_differs(&self.kernel_source) {
            return Ok(());
        }
        let taps = build_taps(params);
        self.kernel = KernelTexture::new(&self.context.device, &self.context.queue, &taps)?;
        self.taps = taps;
        self.kernel_source = *params;
        self.rebuild_bind_groups();
        debug!(reach = self.taps.reach(), "kernel regenerated");
        Ok(())
    }

    fn rebuild_bind_groups(&mut self) {
        self.bind_groups = self.passes.bind_groups(
            &self.context.device,
            &self.uniform_buffer,
            &self.state,
            &self.kernel,
        );
    }

    /// Runs one frame and presents it. On any error nothing is simulated
    /// and the frame counter does not advance.
    pub(crate) fn render_frame(
        &mut self,
        params: Parameters,
        pointer: PointerState,
    ) -> Result<(), FrameError> {
        if self.phase != SchedulerState::Running {
            return Err(PipelineError::NotRunning(self.phase).into());
        }
        self.apply_pending_resize()?;
        self.refresh_kernel(&params).map_err(PipelineError::from)?;

        let output = self.context.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let frame = self.frame.get();
        let uniforms = SimUniforms::new(
            self.state.extent,
            (self.context.config.width, self.context.config.height),
            &params,
            pointer,
            frame,
            &self.taps,
        );
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        let read = self.state.read;
        let write = self.state.write();
        if InteractionStage::plan(&params, pointer, frame).is_active() {
            encode_pass(
                &mut encoder,
                "interaction pass",
                &self.passes.interaction,
                &self.bind_groups[read],
                &self.state.targets[write].view,
            );
            self.state.encode_promote(&mut encoder);
        }
        encode_pass(
            &mut encoder,
            "update pass",
            &self.passes.update,
            &self.bind_groups[read],
            &self.state.write_target().view,
        );
        encode_pass(
            &mut encoder,
            "present pass",
            &self.passes.present,
            &self.bind_groups[write],
            &surface_view,
        );

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.state.swap();
        self.frame.increment();

        if let Some(fps) = self.stats.record(Instant::now()) {
            debug!(
                fps = fps.round(),
                frame = self.frame.get(),
                width = self.state.extent.width,
                height = self.state.extent.height,
                "render stats"
            );
        }
        Ok(())
    }
}

fn build_taps(params: &Parameters) -> KernelTaps {
    KernelTaps::from_image(&KernelImage::generate(
        params.outer_radius,
        params.ratio_of_radii,
        params.kernel_profile,
    ))
}

/// Why a GPU frame was not rendered.
#[derive(Debug)]
pub(crate) enum FrameError {
    /// The swapchain could not hand out a texture; usually transient.
    Surface(wgpu::SurfaceError),
    /// The simulation could not continue, e.g. a reset failed to allocate.
    Pipeline(PipelineError),
}

impl FrameError {
    pub(crate) fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            FrameError::Surface(err) => Some(err),
            FrameError::Pipeline(_) => None,
        }
    }
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(value: wgpu::SurfaceError) -> Self {
        FrameError::Surface(value)
    }
}

impl From<PipelineError> for FrameError {
    fn from(value: PipelineError) -> Self {
        FrameError::Pipeline(value)
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Surface(err) => write!(f, "surface error: {err}"),
            FrameError::Pipeline(err) => write!(f, "simulation error: {err}"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Surface(err) => Some(err),
            FrameError::Pipeline(err) => Some(err),
        }
    }
}
