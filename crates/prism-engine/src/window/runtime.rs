use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::events::{Event, EventDispatcher, WINDOW_EVENT};
use crate::input::InputState;
use crate::input::platform::winit::{resize_event, translate_window_event};
use crate::time::{FrameClock, FrameTime};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Runtime context passed to the application.
///
/// Requests are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    exit: bool,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.exit = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives `app` until it exits or the window closes.
    ///
    /// Pointer and resize input is published on `events` before the matching
    /// `App::on_window_event` call. A clone of the dispatcher is also handed to
    /// every frame through [`FrameCtx::events`].
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, events: EventDispatcher, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, events, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    events: EventDispatcher,
    app: A,

    window: Option<(WindowId, WindowEntry)>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, events: EventDispatcher, app: A) -> Self {
        Self {
            config,
            gpu_init,
            events,
            app,
            window: None,
            exit_requested: false,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<(WindowId, WindowEntry)> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            input_state: InputState::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
            .try_build()
            .context("GPU initialization failed")?;

        // Let listeners size their projections before the first frame.
        let size = entry.with_gpu(|gpu| gpu.size());
        self.events.dispatch(WINDOW_EVENT, Event::Resized(resize_event(size)));

        Ok((id, entry))
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some((id, entry)) = self.window.as_mut() else {
            return;
        };

        let window_id = *id;
        let (app, events) = (&mut self.app, &self.events);
        let mut runtime_ctx = RuntimeCtx::default();
        let mut app_control = AppControl::Continue;

        entry.with_mut(|fields| {
            let ft: FrameTime = fields.clock.tick();

            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window_id,
                    window: fields.window,
                },
                gpu: fields.gpu,
                input: fields.input_state,
                events,
                time: ft,
                runtime: &mut runtime_ctx,
            };

            app_control = app.on_frame(&mut ctx);
        });

        if app_control == AppControl::Exit || runtime_ctx.exit_requested() {
            self.request_exit(event_loop);
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok((id, entry)) => {
                entry.with_window(|w| w.request_redraw());
                self.window = Some((id, entry));
            }
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                self.request_exit(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: controls and animations update every frame.
        if let Some((_, entry)) = &self.window {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Split borrows to avoid `self` capture inside `ouroboros` closures.
        let (app, events, window) = (&mut self.app, &self.events, &mut self.window);

        let Some((id, entry)) = window.as_mut() else {
            return;
        };
        if *id != window_id {
            return;
        }

        // The surface must match the new size before any listener renders.
        match &event {
            WindowEvent::Resized(new_size) => {
                entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
            }
            _ => {}
        }

        let mut app_control = AppControl::Continue;
        entry.with_mut(|fields| {
            translate_window_event(fields.window, fields.input_state, &event, |channel, ev| {
                events.dispatch(channel, ev);
            });

            app_control = app.on_window_event(window_id, &event);
        });

        if app_control == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.window = None;
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some((_, entry)) = &self.window {
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
