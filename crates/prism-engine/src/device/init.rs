/// GPU setup handed to [`crate::window::Runtime::run`].
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB swapchain format when the surface offers one.
    ///
    /// Textures are uploaded as sRGB, so an sRGB target keeps colours unchanged.
    pub prefer_srgb: bool,

    /// Swap behaviour. `Fifo` is the only mode every backend must support.
    pub present_mode: wgpu::PresentMode,

    /// Preferred alpha mode; unsupported requests fall back to the first supported mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Adapter preference when several GPUs are present.
    pub power_preference: wgpu::PowerPreference,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Hint only; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl GpuInit {
    /// `Fifo` when `enabled`, otherwise `AutoNoVsync` (mailbox or immediate,
    /// whichever the surface supports).
    pub fn vsync(mut self, enabled: bool) -> Self {
        self.present_mode = if enabled {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        self
    }

    /// Prefers the integrated GPU.
    pub fn low_power(mut self) -> Self {
        self.power_preference = wgpu::PowerPreference::LowPower;
        self
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
