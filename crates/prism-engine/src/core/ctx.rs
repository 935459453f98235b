use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::events::EventDispatcher;
use crate::input::InputState;
use crate::render::{RenderCtx, Viewport};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id:     WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Framebuffer aspect ratio, `None` while minimized.
    pub fn aspect(&self) -> Option<f32> {
        let size = self.window.inner_size();
        Viewport::new(size.width as f32, size.height as f32).aspect()
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window:     WindowCtx<'a>,
    pub gpu:        &'a mut Gpu<'w>,
    pub input:      &'a InputState,
    pub events:     &'a EventDispatcher,
    pub time:       FrameTime,
    pub runtime:    &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Opens one render pass that clears colour to `clear` and depth to 1.0,
    /// calls `draw` with a ready [`RenderCtx`], then presents the frame.
    ///
    /// Surface errors are handled here; only a fatal one asks the app to exit.
    pub fn render<F>(&mut self, clear: wgpu::Color, draw: F) -> AppControl
    where
        F: FnOnce(&RenderCtx<'_>, &mut wgpu::RenderPass<'_>),
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    return AppControl::Exit;
                }
                return AppControl::Continue;
            }
        };

        let size = self.gpu.size();
        let rctx = RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            self.gpu.depth_format(),
            Viewport::new(size.width as f32, size.height as f32),
        );

        // Pass borrows frame.encoder; dropped before submit() takes frame.
        {
            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view:           &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load:  wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.gpu.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load:  wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes:    None,
                occlusion_query_set: None,
                multiview_mask:      None,
            });

            draw(&rctx, &mut pass);
        }

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
