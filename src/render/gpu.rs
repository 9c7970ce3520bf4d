use std::collections::HashMap;

use crate::{
    foundation::core::Size,
    foundation::error::{SplitcapError, SplitcapResult},
    layout::planner::Viewport,
    render::{
        backend::{CompositeBackend, FrameRGBA, ProgramId},
        shader::{ProgramSource, QUAD_TEX_COORDS, QUAD_VERTICES},
    },
    transform::mat4::{self, MAT4_IDENTITY, Mat4},
};

const MAT4_BYTES: u64 = 64;
/// Per-draw stride of the user matrix buffer; the default `min_uniform_buffer_offset_alignment`.
const USER_MATRIX_STRIDE: u64 = 256;
const VERTEX_STRIDE: u64 = 16;

struct GpuTarget {
    size: Size,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    readback_bytes_per_row: u32,
}

struct GpuInput {
    size: Size,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

#[derive(Clone, Copy)]
struct PendingDraw {
    viewport: Viewport,
    user_matrix: Mat4,
}

/// wgpu implementation of [`CompositeBackend`].
///
/// Draws are recorded between `bind_input` and `unbind`, then submitted as one render pass
/// that loads the current target contents.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    sampler: wgpu::Sampler,
    vertices: wgpu::Buffer,
    tex_matrix_buffer: wgpu::Buffer,

    target: Option<GpuTarget>,
    input: Option<GpuInput>,
    input_bound: bool,
    programs: HashMap<ProgramId, GpuProgram>,
    next_program: u32,
    current_program: Option<ProgramId>,

    tex_matrix: Mat4,
    user_matrix: Mat4,
    viewport: Option<Viewport>,
    pending: Vec<PendingDraw>,
}

impl WgpuBackend {
    pub fn new() -> SplitcapResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                SplitcapError::graphics_init("no gpu adapter available")
            }
            other => {
                SplitcapError::graphics_init(format!("wgpu request_adapter failed: {other:?}"))
            }
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("splitcap_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| SplitcapError::graphics_init(format!("wgpu request_device failed: {e:?}")))?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("splitcap_input_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut vertex_bytes = Vec::with_capacity((VERTEX_STRIDE * 4) as usize);
        for (pos, tex) in QUAD_VERTICES.iter().zip(QUAD_TEX_COORDS.iter()) {
            for v in pos.iter().chain(tex.iter()) {
                vertex_bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        let vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("splitcap_quad"),
            size: vertex_bytes.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertices, 0, &vertex_bytes);

        let tex_matrix_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("splitcap_tex_matrix"),
            size: MAT4_BYTES,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        tracing::debug!(adapter = ?adapter.get_info().name, "wgpu backend ready");

        Ok(Self {
            device,
            queue,
            sampler,
            vertices,
            tex_matrix_buffer,
            target: None,
            input: None,
            input_bound: false,
            programs: HashMap::new(),
            next_program: 1,
            current_program: None,
            tex_matrix: MAT4_IDENTITY,
            user_matrix: MAT4_IDENTITY,
            viewport: None,
            pending: Vec::new(),
        })
    }

    fn scoped<T>(&self, what: &str, f: impl FnOnce(&Self) -> T) -> SplitcapResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let out = f(self);
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(out),
            Some(e) => Err(SplitcapError::gpu(format!("{what}: {e}"))),
        }
    }

    fn flush(&mut self) -> SplitcapResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        let program = self
            .current_program
            .and_then(|id| self.programs.get(&id))
            .ok_or_else(|| SplitcapError::gpu("draw: no program in use"))?;
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| SplitcapError::gpu("draw: no input texture bound"))?;
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| SplitcapError::gpu("draw: no render target"))?;
        // wgpu viewports are measured from the top edge
        let tops = pending
            .iter()
            .map(|draw| {
                let vp = draw.viewport;
                (vp.x + vp.width <= target.size.width)
                    .then(|| target.size.height.checked_sub(vp.y + vp.height))
                    .flatten()
                    .ok_or_else(|| {
                        SplitcapError::gpu(format!(
                            "draw: viewport {vp:?} exceeds target {}",
                            target.size
                        ))
                    })
            })
            .collect::<SplitcapResult<Vec<u32>>>()?;

        self.queue
            .write_buffer(&self.tex_matrix_buffer, 0, &mat4::to_le_bytes(&self.tex_matrix));
        let user_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("splitcap_user_matrices"),
            size: USER_MATRIX_STRIDE * pending.len() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        for (i, draw) in pending.iter().enumerate() {
            self.queue.write_buffer(
                &user_buffer,
                USER_MATRIX_STRIDE * i as u64,
                &mat4::to_le_bytes(&draw.user_matrix),
            );
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("splitcap_multi_region_bg"),
            layout: &program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.tex_matrix_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &user_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(MAT4_BYTES),
                    }),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("splitcap_draw_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("splitcap_multi_region_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&program.pipeline);
            rp.set_vertex_buffer(0, self.vertices.slice(..));
            for (i, (draw, top)) in pending.iter().zip(&tops).enumerate() {
                let vp = draw.viewport;
                rp.set_viewport(
                    vp.x as f32,
                    *top as f32,
                    vp.width as f32,
                    vp.height as f32,
                    0.0,
                    1.0,
                );
                rp.set_bind_group(0, &bind_group, &[(USER_MATRIX_STRIDE * i as u64) as u32]);
                rp.draw(0..4, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));

        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(()),
            Some(e) => Err(SplitcapError::gpu(format!("multi-region draw: {e}"))),
        }
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

impl CompositeBackend for WgpuBackend {
    fn ensure_target(&mut self, size: Size) -> SplitcapResult<()> {
        if size.is_empty() {
            return Err(SplitcapError::validation(format!(
                "render target must be non-empty, got {size}"
            )));
        }
        if self.target.as_ref().map(|t| t.size) == Some(size) {
            return Ok(());
        }

        let bytes_per_row_unpadded = size
            .width
            .checked_mul(4)
            .ok_or_else(|| SplitcapError::gpu("render target width overflow"))?;
        let bytes_per_row = align_to(bytes_per_row_unpadded, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer_size = u64::from(bytes_per_row)
            .checked_mul(u64::from(size.height))
            .ok_or_else(|| SplitcapError::gpu("readback buffer size overflow"))?;

        let target = self.scoped("create render target", |this| {
            let texture = this.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("splitcap_target"),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let readback = this.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("splitcap_readback"),
                size: buffer_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            GpuTarget {
                size,
                texture,
                view,
                readback,
                readback_bytes_per_row: bytes_per_row,
            }
        })?;
        self.target = Some(target);
        self.pending.clear();
        Ok(())
    }

    fn clear_target(&mut self, rgba: [u8; 4]) -> SplitcapResult<()> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| SplitcapError::gpu("clear: no render target"))?;
        let [r, g, b, a] = rgba.map(|c| f64::from(c) / 255.0);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("splitcap_clear_encoder"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("splitcap_clear_rp"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn create_program(&mut self, source: &ProgramSource) -> SplitcapResult<ProgramId> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(source.wgsl.into()),
            });

        let uniform_entry = |binding: u32, dynamic: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: wgpu::BufferSize::new(MAT4_BYTES),
            },
            count: None,
        };
        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("splitcap_multi_region_bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                multisampled: false,
                                view_dimension: wgpu::TextureViewDimension::D2,
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                        uniform_entry(2, false),
                        uniform_entry(3, true),
                    ],
                });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("splitcap_multi_region_pl"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(source.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: VERTEX_STRIDE,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        if let Some(e) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(SplitcapError::graphics_init(format!(
                "{}: program creation failed: {e}",
                source.label
            )));
        }

        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(
            id,
            GpuProgram {
                pipeline,
                bind_group_layout,
            },
        );
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) -> SplitcapResult<()> {
        if !self.programs.contains_key(&program) {
            return Err(SplitcapError::gpu(format!(
                "use_program: unknown program {}",
                program.0
            )));
        }
        self.current_program = Some(program);
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn bind_input(&mut self, frame: &FrameRGBA) -> SplitcapResult<()> {
        let size = frame.size();
        if size.is_empty() {
            return Err(SplitcapError::gpu("bind_input: empty texture"));
        }
        if self.input.as_ref().map(|i| i.size) != Some(size) {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("splitcap_input"),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.input = Some(GpuInput {
                size,
                texture,
                view,
            });
        }
        self.input_bound = true;
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| SplitcapError::gpu("bind_input: texture allocation failed"))?;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &input.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 4),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn set_tex_matrix(&mut self, m: &Mat4) -> SplitcapResult<()> {
        self.tex_matrix = *m;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> SplitcapResult<()> {
        self.viewport = Some(viewport);
        Ok(())
    }

    fn set_user_matrix(&mut self, m: &Mat4) -> SplitcapResult<()> {
        self.user_matrix = *m;
        Ok(())
    }

    fn draw_quad(&mut self) -> SplitcapResult<()> {
        if self.current_program.is_none() {
            return Err(SplitcapError::gpu("draw_quad: no program in use"));
        }
        if !self.input_bound {
            return Err(SplitcapError::gpu("draw_quad: no input texture bound"));
        }
        let viewport = self
            .viewport
            .ok_or_else(|| SplitcapError::gpu("draw_quad: no viewport set"))?;
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| SplitcapError::gpu("draw_quad: no render target"))?;
        if viewport.x + viewport.width > target.size.width
            || viewport.y + viewport.height > target.size.height
        {
            return Err(SplitcapError::gpu(format!(
                "draw_quad: viewport {viewport:?} exceeds target {}",
                target.size
            )));
        }
        if viewport.width == 0 || viewport.height == 0 {
            return Ok(());
        }
        self.pending.push(PendingDraw {
            viewport,
            user_matrix: self.user_matrix,
        });
        Ok(())
    }

    fn unbind(&mut self) -> SplitcapResult<()> {
        let flushed = self.flush();
        self.pending.clear();
        self.input_bound = false;
        self.current_program = None;
        self.viewport = None;
        flushed
    }

    fn readback_rgba8(&mut self) -> SplitcapResult<FrameRGBA> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| SplitcapError::gpu("readback: no render target"))?;
        let Size { width, height } = target.size;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("splitcap_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &target.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(target.readback_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = target.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| SplitcapError::gpu(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| SplitcapError::gpu("readback channel closed"))?
            .map_err(|e| SplitcapError::gpu(format!("readback map failed: {e:?}")))?;

        let mapped = buffer_slice.get_mapped_range();
        let row_bytes = (width as usize) * 4;
        let padded_row_bytes = target.readback_bytes_per_row as usize;
        let mut out = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * padded_row_bytes;
            out.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        target.readback.unmap();

        Ok(FrameRGBA {
            width,
            height,
            data: out,
        })
    }
}
