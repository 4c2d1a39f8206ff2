use crate::device::{Material, RenderDevice, RenderTarget};
use crate::error::{DeviceFailure, RenderError};
use crate::params::Parameters;
use crate::surfaces::SurfacePair;
use crate::uniforms::{DisplayBlock, SimulationBlock, UniformBindings};
use anyhow::Context;
use bytemuck::Zeroable;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Simulation state format. Not filterable, so shaders use `textureLoad`.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const TEXEL_BYTES: u32 = 16;

/// Off-screen render target: a texture the simulation renders into and the
/// next pass samples from.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct ScreenFrame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// Bind groups for each possible source slot, valid for one surface generation.
struct BindGroupCache<G = wgpu::BindGroup> {
    generation: u64,
    simulation: [Option<G>; 2],
    // [texture_to_display][previous_iteration_texture]
    display: [[Option<G>; 2]; 2],
}

impl<G> BindGroupCache<G> {
    fn empty(generation: u64) -> Self {
        Self {
            generation,
            simulation: [None, None],
            display: [[None, None], [None, None]],
        }
    }

    fn sync(&mut self, generation: u64) {
        if self.generation != generation {
            *self = Self::empty(generation);
        }
    }
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    simulation_pipeline: wgpu::RenderPipeline,
    display_pipeline: wgpu::RenderPipeline,
    simulation_layout: wgpu::BindGroupLayout,
    display_layout: wgpu::BindGroupLayout,
    simulation_uniforms: wgpu::Buffer,
    display_uniforms: wgpu::Buffer,
    bind_groups: BindGroupCache,

    // Per-frame recording state; everything is submitted at once in `present`.
    encoder: Option<wgpu::CommandEncoder>,
    frame: Option<ScreenFrame>,
    last_simulation_block: Option<SimulationBlock>,
}

impl WgpuDevice {
    pub fn new(window: Arc<winit::window::Window>) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create window surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter found")?;
        log::info!("GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("GPU Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("failed to request GPU device")?;

        // Validation errors end the frame instead of aborting the process.
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            log::error!("wgpu error: {error}");
        }));

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let simulation_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Simulation Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/simulation.wgsl").into()),
        });
        let display_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/display.wgsl").into()),
        });

        let simulation_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulation Bind Group Layout"),
            entries: &[uniform_entry(0), texture_entry(1)],
        });
        let display_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Display Bind Group Layout"),
            entries: &[uniform_entry(0), texture_entry(1), texture_entry(2)],
        });

        let simulation_pipeline = create_quad_pipeline(
            &device,
            "Simulation Pipeline",
            &simulation_shader,
            &simulation_layout,
            TARGET_FORMAT,
        );
        let display_pipeline = create_quad_pipeline(
            &device,
            "Display Pipeline",
            &display_shader,
            &display_layout,
            surface_format,
        );

        let simulation_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Simulation Uniforms"),
            contents: bytemuck::bytes_of(&SimulationBlock::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let display_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Display Uniforms"),
            contents: bytemuck::bytes_of(&DisplayBlock::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            simulation_pipeline,
            display_pipeline,
            simulation_layout,
            display_layout,
            simulation_uniforms,
            display_uniforms,
            bind_groups: BindGroupCache::empty(0),
            encoder: None,
            frame: None,
            last_simulation_block: None,
        })
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Reconfigures the swapchain after it was lost.
    pub fn reconfigure(&mut self) {
        self.frame = None;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn acquire_frame(&mut self) -> Result<(), RenderError> {
        match self.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some(ScreenFrame { texture, view });
                Ok(())
            }
            Err(err) => Err(DeviceFailure::from(err).into()),
        }
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn record(
        &mut self,
        material: Material,
        bindings: &UniformBindings,
        params: &Parameters,
        surfaces: &SurfacePair<OffscreenTarget>,
        target: RenderTarget,
    ) -> Result<(), RenderError> {
        if target == RenderTarget::Screen && self.frame.is_none() {
            self.acquire_frame()?;
        }
        self.bind_groups.sync(surfaces.generation());

        let (label, pipeline, bind_group) = match material {
            Material::Simulation => {
                let source = bindings.simulation.previous_iteration_texture;
                let source_view = &surfaces.resolve(source)?.view;

                // Constant across a batch; only rewritten when parameters or size change.
                let block = SimulationBlock::new(&bindings.simulation, &params.simulation);
                if self.last_simulation_block != Some(block) {
                    self.queue
                        .write_buffer(&self.simulation_uniforms, 0, bytemuck::bytes_of(&block));
                    self.last_simulation_block = Some(block);
                }

                let bind_group = self.bind_groups.simulation[source.slot.as_usize()]
                    .get_or_insert_with(|| {
                        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some("Simulation Bind Group"),
                            layout: &self.simulation_layout,
                            entries: &[
                                wgpu::BindGroupEntry {
                                    binding: 0,
                                    resource: self.simulation_uniforms.as_entire_binding(),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 1,
                                    resource: wgpu::BindingResource::TextureView(source_view),
                                },
                            ],
                        })
                    });
                ("Simulation Pass", &self.simulation_pipeline, &*bind_group)
            }
            Material::Display => {
                let shown = bindings.display.texture_to_display;
                let history = bindings.display.previous_iteration_texture;
                let shown_view = &surfaces.resolve(shown)?.view;
                let history_view = &surfaces.resolve(history)?.view;

                let block = DisplayBlock::new(&bindings.display, &params.display);
                self.queue
                    .write_buffer(&self.display_uniforms, 0, bytemuck::bytes_of(&block));

                let bind_group = self.bind_groups.display[shown.slot.as_usize()]
                    [history.slot.as_usize()]
                .get_or_insert_with(|| {
                    self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("Display Bind Group"),
                        layout: &self.display_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: self.display_uniforms.as_entire_binding(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: wgpu::BindingResource::TextureView(shown_view),
                            },
                            wgpu::BindGroupEntry {
                                binding: 2,
                                resource: wgpu::BindingResource::TextureView(history_view),
                            },
                        ],
                    })
                });
                ("Display Pass", &self.display_pipeline, &*bind_group)
            }
        };

        let view = match target {
            RenderTarget::Offscreen(index) => &surfaces.get(index).view,
            RenderTarget::Screen => match &self.frame {
                Some(frame) => &frame.view,
                None => return Err(DeviceFailure::SurfaceLost.into()),
            },
        };

        let encoder = self.encoder.get_or_insert_with(|| {
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                })
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);

        Ok(())
    }
}

impl RenderDevice for WgpuDevice {
    type Target = OffscreenTarget;

    fn create_target(&mut self, width: u32, height: u32) -> Result<OffscreenTarget, RenderError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::InvalidDimensions { width, height });
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Ping-Pong Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(OffscreenTarget {
            texture,
            view,
            width,
            height,
        })
    }

    fn release_target(&mut self, target: OffscreenTarget) {
        // wgpu keeps the allocation alive until in-flight submissions finish.
        target.texture.destroy();
    }

    fn seed_target(&mut self, target: &OffscreenTarget, texels: &[[f32; 4]]) {
        debug_assert_eq!(texels.len(), (target.width * target.height) as usize);
        self.queue.write_texture(
            target.texture.as_image_copy(),
            bytemuck::cast_slice(texels),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(target.width * TEXEL_BYTES),
                rows_per_image: Some(target.height),
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn render(
        &mut self,
        material: Material,
        bindings: &UniformBindings,
        params: &Parameters,
        surfaces: &SurfacePair<OffscreenTarget>,
        target: RenderTarget,
    ) -> Result<(), RenderError> {
        let result = self.record(material, bindings, params, surfaces, target);
        if result.is_err() {
            // Passes recorded before the failure still run, so the ping-pong
            // index the driver keeps matches the GPU state.
            self.flush();
        }
        result
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.flush();
        if let Some(frame) = self.frame.take() {
            frame.texture.present();
        }
        Ok(())
    }

    fn resize_screen(&mut self, width: u32, height: u32) {
        self.frame = None;
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn create_quad_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
