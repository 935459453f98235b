use std::sync::Arc;

use crate::loaders::Image;
use crate::render::RenderCtx;

use super::program::TEXTURE_GROUP;
use super::shader::Shader;

pub(crate) const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Uploaded texture, view and sampler.
pub(crate) struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GpuTexture {
    /// Uploads tightly packed RGBA8 rows.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
        }
    }

    pub fn bind_group(&self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism texture bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

/// 2D texture fed from an [`Image`].
///
/// Setting an image only records it; pixels reach the GPU on the next
/// [`Texture2D::bind`], so images decoded on a loader thread can be handed over
/// without a device.
#[derive(Default)]
pub struct Texture2D {
    pending: Option<Arc<Image>>,
    gpu: Option<GpuTexture>,
    /// Bind group and the id of the shader whose layout it was built for.
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl Texture2D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(image: Arc<Image>) -> Self {
        let mut texture = Self::new();
        texture.set_image(image);
        texture
    }

    /// Replaces the image; the previous GPU texture is released on the next bind.
    pub fn set_image(&mut self, image: Arc<Image>) {
        self.pending = Some(image);
    }

    pub fn is_loaded(&self) -> bool {
        self.pending.is_some() || self.gpu.is_some()
    }

    /// Uploads any pending image, then binds the texture for `shader` at group 1.
    ///
    /// The binding sticks to `shader`: later `use_program` calls in the same pass
    /// keep it.
    pub fn bind(&mut self, ctx: &RenderCtx<'_>, shader: &Shader, pass: &mut wgpu::RenderPass<'_>) {
        if let Some(image) = self.pending.take() {
            self.upload(ctx, &image);
        }

        let Some(gpu) = &self.gpu else {
            log::error!("Texture2D::bind called before an image was loaded");
            return;
        };
        let Some(layout) = shader.texture_layout() else {
            log::error!("Texture2D::bind: shader declares no @group({TEXTURE_GROUP}) texture");
            return;
        };

        let bind_group = match &self.bind_group {
            Some((id, bg)) if *id == shader.id() => bg.clone(),
            _ => {
                let bg = gpu.bind_group(ctx.device, layout);
                self.bind_group = Some((shader.id(), bg.clone()));
                bg
            }
        };

        pass.set_bind_group(TEXTURE_GROUP, &bind_group, &[]);
        shader.attach_texture(bind_group);
    }

    fn upload(&mut self, ctx: &RenderCtx<'_>, image: &Image) {
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0 || image.height == 0 || image.data.len() != expected {
            log::error!(
                "image '{}' has invalid size {}x{} with {} bytes",
                image.filename,
                image.width,
                image.height,
                image.data.len()
            );
            return;
        }

        self.bind_group = None;
        self.gpu = Some(GpuTexture::upload(
            ctx.device,
            ctx.queue,
            &image.filename,
            image.width,
            image.height,
            &image.data,
        ));
        log::debug!("uploaded texture '{}' ({}x{})", image.filename, image.width, image.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_texture_is_not_loaded() {
        assert!(!Texture2D::new().is_loaded());
    }

    #[test]
    fn set_image_marks_loaded_before_upload() {
        let image = Image::from_rgba8("white.png", 1, 1, vec![255; 4]).unwrap();
        let texture = Texture2D::with_image(Arc::new(image));
        assert!(texture.is_loaded());
    }
}
