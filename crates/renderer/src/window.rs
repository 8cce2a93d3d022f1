use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use automaton::{Extent, Parameters, PointerState};
use tracing::{debug, error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{FrameError, GpuSimulation};
use crate::runtime::FramePacer;
use crate::types::{NamedPreset, RendererConfig};

const MAX_BRUSH_RADIUS: f32 = 256.0;

/// Window, GPU simulation and the live input state feeding it.
pub(crate) struct WindowState {
    window: Arc<Window>,
    gpu: GpuSimulation,
    mouse: MouseState,
    controls: Controls,
    presets: Vec<NamedPreset>,
    preset_index: usize,
    params: Parameters,
    scale: u32,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let preset = config.initial_preset();
        let extent = Extent::new(config.grid_size.0.max(1), config.grid_size.1.max(1));
        let gpu = GpuSimulation::new(
            window.as_ref(),
            size,
            extent,
            &preset.params,
            config.kernel_policy,
            config.gpu_power,
        )?;
        info!(preset = %preset.name, "simulation preset");

        let presets = if config.presets.is_empty() {
            vec![preset.clone()]
        } else {
            config.presets.clone()
        };
        let preset_index = presets
            .iter()
            .position(|candidate| candidate.name == preset.name)
            .unwrap_or(0);

        Ok(Self {
            window,
            gpu,
            mouse: MouseState::default(),
            controls: Controls::default(),
            presets,
            preset_index,
            params: preset.params,
            scale: config.scale.max(1),
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.gpu.surface_size()
    }

    /// Reconfigures the surface now and defers the grid reset to the next
    /// frame boundary.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize_surface(new_size);
        if let Some(extent) = grid_extent_for_window(new_size, self.scale) {
            if extent != self.gpu.extent() {
                debug!(%extent, "grid resize requested");
                self.gpu.request_resize(extent);
            }
        }
    }

    pub(crate) fn render_frame(&mut self) -> Result<(), FrameError> {
        let extent = self.gpu.extent();
        let pointer = self.mouse.pointer(self.size(), extent);
        let mut params = self.params;
        params.random_seed = self.controls.reseed_held;
        params.kill = self.controls.kill_held;
        self.gpu.render_frame(params, pointer)
    }

    /// Applies a key event; returns `true` when the window should close.
    fn handle_key(&mut self, event: &KeyEvent) -> bool {
        let Some(control) = control_for_key(&event.logical_key) else {
            return false;
        };
        let pressed = event.state == ElementState::Pressed;
        match control {
            Control::Reseed => self.controls.reseed_held = pressed,
            Control::Kill => self.controls.kill_held = pressed,
            Control::ShrinkBrush if pressed => {
                self.params.brush_radius = adjust_brush(self.params.brush_radius, -1.0);
                debug!(radius = self.params.brush_radius, "brush radius");
            }
            Control::GrowBrush if pressed => {
                self.params.brush_radius = adjust_brush(self.params.brush_radius, 1.0);
                debug!(radius = self.params.brush_radius, "brush radius");
            }
            Control::NextPreset if pressed && !event.repeat => self.next_preset(),
            Control::Quit => return pressed,
            _ => {}
        }
        false
    }

    fn next_preset(&mut self) {
        if self.presets.len() < 2 {
            return;
        }
        self.preset_index = (self.preset_index + 1) % self.presets.len();
        let preset = &self.presets[self.preset_index];
        self.params = preset.params;
        info!(preset = %preset.name, frame = self.gpu.frame(), "switched preset");
    }
}

/// Keys the window responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Reseed,
    Kill,
    ShrinkBrush,
    GrowBrush,
    NextPreset,
    Quit,
}

fn control_for_key(key: &Key) -> Option<Control> {
    match key {
        Key::Character(value) if value.eq_ignore_ascii_case("r") => Some(Control::Reseed),
        Key::Character(value) if value.eq_ignore_ascii_case("k") => Some(Control::Kill),
        Key::Character(value) if value.as_str() == "[" => Some(Control::ShrinkBrush),
        Key::Character(value) if value.as_str() == "]" => Some(Control::GrowBrush),
        Key::Named(NamedKey::Delete) => Some(Control::Kill),
        Key::Named(NamedKey::Tab) => Some(Control::NextPreset),
        Key::Named(NamedKey::Escape) => Some(Control::Quit),
        _ => None,
    }
}

/// Held-key triggers sampled once per frame.
#[derive(Debug, Default, Clone, Copy)]
struct Controls {
    reseed_held: bool,
    kill_held: bool,
}

fn adjust_brush(radius: f32, delta: f32) -> f32 {
    (radius + delta).clamp(0.0, MAX_BRUSH_RADIUS)
}

/// Grid extent shown in a window of `size` pixels; `None` while minimized.
fn grid_extent_for_window(size: PhysicalSize<u32>, scale: u32) -> Option<Extent> {
    let scale = scale.max(1);
    let extent = Extent::new(size.width / scale, size.height / scale);
    (extent.width > 0 && extent.height > 0).then_some(extent)
}

#[derive(Default)]
struct MouseState {
    position: Option<PhysicalPosition<f64>>,
    is_pressed: bool,
}

impl MouseState {
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.position = Some(position);
    }

    fn handle_button(&mut self, state: ElementState) {
        self.is_pressed = state == ElementState::Pressed;
    }

    /// Cursor mapped into grid cells. Before the cursor enters the window the
    /// pointer rests on the grid centre.
    fn pointer(&self, window: PhysicalSize<u32>, extent: Extent) -> PointerState {
        let Some(position) = self.position else {
            return PointerState {
                held: self.is_pressed,
                ..PointerState::centered(extent)
            };
        };
        let x = position.x as f32 * extent.width as f32 / window.width.max(1) as f32;
        let y = position.y as f32 * extent.height as f32 / window.height.max(1) as f32;
        PointerState::new(x, y, self.is_pressed)
    }
}

/// Opens the simulation window and runs until it is closed.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (width, height) = config.window_size();
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config)
        .map_err(|err| anyhow!("failed to initialise window renderer: {err}"))?;
    let mut pacer = FramePacer::new(config.target_fps);
    if let Some(interval) = pacer.interval() {
        info!(interval_ms = interval.as_millis() as u64, "frame rate capped");
    }
    state.window().request_redraw();

    let fatal: Rc<RefCell<Option<FrameError>>> = Rc::default();
    let loop_fatal = Rc::clone(&fatal);
    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::KeyboardInput { event, .. } => {
                        if state.handle_key(&event) {
                            elwt.exit();
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        state.mouse.handle_cursor_moved(position);
                    }
                    WindowEvent::MouseInput {
                        state: button_state,
                        button: MouseButton::Left,
                        ..
                    } => state.mouse.handle_button(button_state),
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                        pacer.reset();
                    }
                    WindowEvent::RedrawRequested => match state.render_frame() {
                        Ok(()) => pacer.mark_rendered(Instant::now()),
                        Err(err) => match err.as_surface_error() {
                            Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                let size = state.size();
                                state.resize(size);
                            }
                            Some(wgpu::SurfaceError::OutOfMemory) => {
                                error!("surface out of memory; exiting");
                                elwt.exit();
                            }
                            Some(wgpu::SurfaceError::Timeout) => {
                                debug!("surface timeout; retrying next frame");
                            }
                            Some(other) => {
                                warn!(error = ?other, "surface error; retrying next frame");
                            }
                            None => {
                                error!(error = %err, "simulation stopped; exiting");
                                *loop_fatal.borrow_mut() = Some(err);
                                elwt.exit();
                            }
                        },
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let now = Instant::now();
                if pacer.ready_for_frame(now) {
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = pacer.next_deadline() {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                } else {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))?;

    match fatal.take() {
        Some(err) => Err(anyhow::Error::new(err).context("simulation window stopped")),
        None => Ok(()),
    }
}
