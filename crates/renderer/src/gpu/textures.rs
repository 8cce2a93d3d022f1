use automaton::{AllocationError, Extent, KernelTaps};
use wgpu::util::{DeviceExt, TextureDataOrder};

/// Float format holding one cell (rgb + unused alpha) per texel.
pub(crate) const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// One simulation buffer on the GPU.
pub(crate) struct StateTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// GPU double buffer; `read` indexes the current buffer.
pub(crate) struct PingPong {
    pub targets: [StateTarget; 2],
    pub read: usize,
    pub extent: Extent,
}

impl PingPong {
    /// Allocates both buffers at `extent`. `wgpu` zero-initializes new
    /// textures, so the grid starts black.
    pub fn new(device: &wgpu::Device, extent: Extent) -> Result<Self, AllocationError> {
        let cells = 2 * extent.width as usize * extent.height as usize;
        let targets = allocate_scoped(device, "GPU state buffers", cells, || {
            [0, 1].map(|index| {
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("state buffer #{index}")),
                    size: texture_size(extent),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: STATE_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_SRC
                        | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                StateTarget { texture, view }
            })
        })?;
        Ok(Self {
            targets,
            read: 0,
            extent,
        })
    }

    pub fn write(&self) -> usize {
        1 - self.read
    }

    pub fn write_target(&self) -> &StateTarget {
        &self.targets[self.write()]
    }

    pub fn swap(&mut self) {
        self.read = self.write();
    }

    /// Records a copy of the write buffer into the read buffer.
    pub fn encode_promote(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_texture(
            self.targets[self.write()].texture.as_image_copy(),
            self.targets[self.read].texture.as_image_copy(),
            texture_size(self.extent),
        );
    }
}

/// Kernel taps uploaded as a `(2·reach + 1)²` float texture.
pub(crate) struct KernelTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl KernelTexture {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        taps: &KernelTaps,
    ) -> Result<Self, AllocationError> {
        let span = 2 * taps.reach() + 1;
        let dense = taps.to_dense_rgba();
        let texture = allocate_scoped(device, "kernel texture", dense.len(), || {
            device.create_texture_with_data(
                queue,
                &wgpu::TextureDescriptor {
                    label: Some("kernel taps"),
                    size: wgpu::Extent3d {
                        width: span,
                        height: span,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba32Float,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                TextureDataOrder::LayerMajor,
                bytemuck::cast_slice(&dense),
            )
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            _texture: texture,
            view,
        })
    }
}

/// Runs `create` inside an out-of-memory error scope so a failed GPU
/// allocation is returned instead of reaching the uncaptured-error handler.
fn allocate_scoped<T>(
    device: &wgpu::Device,
    what: &'static str,
    cells: usize,
    create: impl FnOnce() -> T,
) -> Result<T, AllocationError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(err) => {
            tracing::error!(what, cells, error = %err, "GPU allocation failed");
            Err(AllocationError::OutOfMemory { what, cells })
        }
    }
}

pub(crate) fn texture_size(extent: Extent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: 1,
    }
}

/// Rejects extents the device cannot back with a texture. Oversize grids
/// are an error, never shrunk to fit.
pub(crate) fn check_extent(extent: Extent, max_dimension: u32) -> Result<(), AllocationError> {
    if extent.width == 0 || extent.height == 0 {
        return Err(AllocationError::EmptyExtent {
            width: extent.width,
            height: extent.height,
        });
    }
    if extent.width > max_dimension || extent.height > max_dimension {
        return Err(AllocationError::TooLarge {
            width: extent.width,
            height: extent.height,
            limit: max_dimension,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversize_extent_is_rejected_not_shrunk() {
        assert_eq!(
            check_extent(Extent::new(20_000, 10), 8192),
            Err(AllocationError::TooLarge {
                width: 20_000,
                height: 10,
                limit: 8192
            })
        );
        assert!(check_extent(Extent::new(10, 8193), 8192).is_err());
    }

    #[test]
    fn extent_within_limit_is_accepted() {
        assert_eq!(check_extent(Extent::new(8192, 8192), 8192), Ok(()));
        assert_eq!(check_extent(Extent::new(640, 480), 8192), Ok(()));
    }

    #[test]
    fn empty_extent_is_rejected() {
        assert_eq!(
            check_extent(Extent::new(0, 4), 8192),
            Err(AllocationError::EmptyExtent { width: 0, height: 4 })
        );
    }
}
