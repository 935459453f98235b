use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use anyhow::Result;
use glam::{Mat4, Vec3};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use prism_engine::camera::{Camera, PerspectiveCamera};
use prism_engine::controls::OrbitControls;
use prism_engine::core::{App, AppControl, FrameCtx};
use prism_engine::device::GpuInit;
use prism_engine::events::{EventDispatcher, ResizeEvent, Subscription, WINDOW_EVENT};
use prism_engine::geometry::{BoxGeometry, BoxParams};
use prism_engine::gpu::{Geometry, Shader, ShaderError, ShaderInfo, Texture2D};
use prism_engine::loaders::{Image, ImageLoader, LoadResult, Loader};
use prism_engine::logging::{LoggingConfig, init_logging};
use prism_engine::render::RenderCtx;
use prism_engine::window::{Runtime, RuntimeConfig};

const VERTEX_SHADER: &str = include_str!("../shaders/scene.vert.wgsl");
const FRAGMENT_SHADER: &str = include_str!("../shaders/scene.frag.wgsl");

const CLEAR: wgpu::Color = wgpu::Color { r: 0.0, g: 0.0, b: 0.5, a: 1.0 };

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let events = EventDispatcher::new();
    let demo = Demo::new(&events, std::env::args().nth(1));

    Runtime::run(
        RuntimeConfig {
            title: "prism starter".to_string(),
            ..Default::default()
        },
        GpuInit::default(),
        events,
        demo,
    )
}

/// GPU-side resources; created on the first frame, once a device exists.
struct Scene {
    shader: Shader,
    geometry: Geometry,
    texture: Texture2D,
}

impl Scene {
    fn new(ctx: &RenderCtx<'_>) -> Result<Self, ShaderError> {
        let mut shader = Shader::new(
            ctx,
            &[ShaderInfo::vertex(VERTEX_SHADER), ShaderInfo::fragment(FRAGMENT_SHADER)],
        )?;
        shader.set_uniform("light_dir", Vec3::new(0.4, 1.0, 0.7))?;

        let mesh = BoxGeometry::build(&BoxParams::default());
        let geometry = Geometry::from_mesh(ctx, &mesh);

        let texture = checkerboard().map(Texture2D::with_image).unwrap_or_default();

        Ok(Self {
            shader,
            geometry,
            texture,
        })
    }

    fn draw(
        &mut self,
        ctx: &RenderCtx<'_>,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &impl Camera,
        model: Mat4,
    ) -> Result<(), ShaderError> {
        self.shader.set_uniform("projection", camera.projection())?;
        self.shader.set_uniform("view", camera.view())?;
        self.shader.set_uniform("model", model)?;

        if self.texture.is_loaded() {
            self.texture.bind(ctx, &self.shader, pass);
        }
        self.geometry.draw(ctx.queue, pass, &self.shader);
        Ok(())
    }
}

struct Demo {
    camera: PerspectiveCamera,
    controls: OrbitControls,

    /// Latest aspect ratio published on the window channel, not yet applied.
    aspect: Rc<Cell<Option<f32>>>,
    _resize: Subscription,

    textures: Option<Receiver<LoadResult<Image>>>,
    pending_image: Option<Arc<Image>>,

    scene: Option<Scene>,
    spin: f32,
}

impl Demo {
    fn new(events: &EventDispatcher, texture_path: Option<String>) -> Self {
        let aspect = Rc::new(Cell::new(None));
        let resize = {
            let aspect = Rc::clone(&aspect);
            events.subscribe(WINDOW_EVENT, move |event| {
                if let Some(size) = event.downcast_ref::<ResizeEvent>().and_then(ResizeEvent::aspect) {
                    aspect.set(Some(size));
                }
            })
        };

        let mut controls = OrbitControls::new(events);
        controls.radius = 3.0;

        let textures = texture_path.map(|path| {
            let (tx, rx) = mpsc::channel();
            ImageLoader.load_async(path, move |result| {
                let _ = tx.send(result);
            });
            rx
        });

        Self {
            camera: PerspectiveCamera::new(45.0, 16.0 / 9.0, 0.1, 100.0),
            controls,
            aspect,
            _resize: resize,
            textures,
            pending_image: None,
            scene: None,
            spin: 0.0,
        }
    }

    fn poll_texture(&mut self) {
        let Some(received) = self.textures.as_ref().map(Receiver::try_recv) else {
            return;
        };

        match received {
            Ok(Ok(image)) => {
                log::info!("texture '{}' ready ({}x{})", image.filename, image.width, image.height);
                self.pending_image = Some(image);
                self.textures = None;
            }
            Ok(Err(e)) => {
                log::warn!("keeping the checkerboard texture: {e}");
                self.textures = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.textures = None,
        }
    }
}

impl App for Demo {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        // Some platforms never report the initial size; read it off the window once.
        let initial = if self.scene.is_none() { ctx.window.aspect() } else { None };
        if let Some(aspect) = self.aspect.take().or(initial) {
            self.camera.set_aspect(aspect);
        }
        self.poll_texture();

        let dt = ctx.time.dt;
        self.controls.update(&mut self.camera, dt);
        self.spin += dt * 0.5;
        let model = Mat4::from_rotation_y(self.spin) * Mat4::from_scale(Vec3::splat(0.6));

        let (scene, camera, pending) = (&mut self.scene, &self.camera, &mut self.pending_image);
        let mut failed = false;

        let control = ctx.render(CLEAR, |rctx, pass| {
            if scene.is_none() {
                match Scene::new(rctx) {
                    Ok(s) => *scene = Some(s),
                    Err(e) => {
                        log::error!("scene setup failed: {e:#}");
                        failed = true;
                        return;
                    }
                }
            }
            let Some(scene) = scene.as_mut() else {
                return;
            };

            if let Some(image) = pending.take() {
                scene.texture.set_image(image);
            }
            if let Err(e) = scene.draw(rctx, pass, camera, model) {
                log::error!("draw failed: {e:#}");
                failed = true;
            }
        });

        if failed {
            ctx.runtime.exit();
        }
        control
    }
}

/// 8x8 two-tone fallback so the box is textured before any file loads.
fn checkerboard() -> Option<Arc<Image>> {
    const SIZE: u32 = 8;
    let data = (0..SIZE * SIZE)
        .flat_map(|i| {
            let (x, y) = (i % SIZE, i / SIZE);
            if (x + y) % 2 == 0 {
                [235, 235, 235, 255]
            } else {
                [60, 60, 70, 255]
            }
        })
        .collect();
    Image::from_rgba8("checkerboard", SIZE, SIZE, data).map(Arc::new)
}
