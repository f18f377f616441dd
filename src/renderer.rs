// renderer.rs — 核心渲染器（反向立方体/球体 + 立方体面纹理数组 + egui）

use crate::atlas::CubeAtlas;
use crate::error::ViewerError;
use crate::mesh::{self, Mesh};
use crate::panorama::{Geometry, PanoramaViewer};
use crate::stereo::{Eye, EyeView, FACES_PER_EYE};
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Texture layers: six left-eye faces followed by six right-eye faces.
const FACE_LAYERS: u32 = 2 * FACES_PER_EYE;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    layer_offset: u32,
    pad: [u32; 3],
}

impl CameraUniform {
    fn new(eye: Eye) -> Self {
        Self {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            layer_offset: eye.layer_offset(),
            pad: [0; 3],
        }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Per-eye uniform buffer and the bind group tying it to the face textures.
struct EyeBinding {
    uniform: CameraUniform,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,

    // 纹理资源
    bind_group_layout: wgpu::BindGroupLayout,
    faces: wgpu::Texture,
    sampler: wgpu::Sampler,

    // 几何体
    cube: GpuMesh,
    sphere: GpuMesh,
    geometry: Geometry,

    // Uniform 资源，左右眼各一份
    left: EyeBinding,
    right: EyeBinding,
    views: Vec<EyeView>,

    // UI
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

fn create_face_texture(device: &wgpu::Device, edge: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        size: wgpu::Extent3d {
            width: edge,
            height: edge,
            depth_or_array_layers: FACE_LAYERS,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some("cube_faces"),
        view_formats: &[],
    })
}

fn write_face(queue: &wgpu::Queue, texture: &wgpu::Texture, layer: u32, edge: u32, rgba: &[u8]) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * edge),
            rows_per_image: Some(edge),
        },
        wgpu::Extent3d {
            width: edge,
            height: edge,
            depth_or_array_layers: 1,
        },
    );
}

fn create_eye_binding(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    faces: &wgpu::Texture,
    sampler: &wgpu::Sampler,
    eye: Eye,
) -> EyeBinding {
    let uniform = CameraUniform::new(eye);
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Camera Buffer"),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = create_bind_group(device, layout, &buffer, faces, sampler);
    EyeBinding {
        uniform,
        buffer,
        bind_group,
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    faces: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let view = faces.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        ..Default::default()
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&view) },
            wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(sampler) },
        ],
        label: Some("faces_bind_group"),
    })
}

impl Renderer {
    pub async fn new(window: std::sync::Arc<Window>) -> Result<Self, ViewerError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // SAFETY: the window is kept alive by the Arc owned by the event loop for
        // as long as the renderer exists.
        let surface = unsafe { instance.create_surface(window.as_ref()) }?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;

        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        // --- 1. Face textures (checkerboard until an atlas arrives) ---
        let faces = create_face_texture(&device, 2);
        let checker: [u8; 16] = [
            96, 96, 96, 255, 160, 160, 160, 255, 160, 160, 160, 255, 96, 96, 96, 255,
        ];
        for layer in 0..FACE_LAYERS {
            write_face(&queue, &faces, layer, 2, &checker);
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge, // 面与面之间不能环绕采样
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // --- 2. Bind groups ---
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry { // Camera Uniform
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry { // Face array
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry { // Sampler
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("faces_bind_group_layout"),
        });

        let left = create_eye_binding(&device, &bind_group_layout, &faces, &sampler, Eye::Left);
        let right = create_eye_binding(&device, &bind_group_layout, &faces, &sampler, Eye::Right);

        // --- 3. Pipeline ---
        let shader = device.create_shader_module(wgpu::include_wgsl!("shader_cube.wgsl"));
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // 从内部观察，闭合凸壳每条视线只命中一次
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        // --- 4. Geometry ---
        let cube = GpuMesh::upload(&device, &mesh::build_inverted_cube(mesh::CUBE_SIZE), "cube");
        let sphere = GpuMesh::upload(
            &device,
            &mesh::build_sphere(
                mesh::SPHERE_RADIUS,
                mesh::SPHERE_LAT_SEGMENTS,
                mesh::SPHERE_LON_SEGMENTS,
            ),
            "sphere",
        );

        // --- 5. Egui ---
        let egui_ctx = egui::Context::default();
        let mut egui_state = egui_winit::State::new(window.as_ref());
        egui_state.set_pixels_per_point(window.scale_factor() as f32);
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface, device, queue, config, size,
            render_pipeline,
            bind_group_layout, faces, sampler,
            cube, sphere, geometry: Geometry::Cube,
            left, right, views: Vec::new(),
            egui_ctx, egui_state, egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        self.config.present_mode = if enabled {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        self.surface.configure(&self.device, &self.config);
    }

    /// Recomputes the per-eye viewports and view-projection matrices.
    pub fn update_camera(&mut self, viewer: &PanoramaViewer) {
        self.geometry = viewer.geometry;
        self.views = viewer.stereo.views(self.config.width, self.config.height);

        for view in &self.views {
            let binding = match view.eye {
                Eye::Left => &mut self.left,
                Eye::Right => &mut self.right,
            };
            binding.uniform.view_proj = viewer
                .view_projection(view.viewport.aspect())
                .to_cols_array_2d();
            self.queue
                .write_buffer(&binding.buffer, 0, bytemuck::cast_slice(&[binding.uniform]));
        }
    }

    /// Uploads the atlas faces, replacing whatever was shown before.
    pub fn load_atlas(&mut self, atlas: CubeAtlas) {
        let max_edge = self.device.limits().max_texture_dimension_2d;
        let atlas = atlas.fit_to(max_edge);
        let edge = atlas.tile_size();

        self.faces = create_face_texture(&self.device, edge);
        for eye in [Eye::Left, Eye::Right] {
            for (i, face) in atlas.faces(eye).iter().enumerate() {
                write_face(&self.queue, &self.faces, eye.layer_offset() + i as u32, edge, face);
            }
        }

        for binding in [&mut self.left, &mut self.right] {
            binding.bind_group = create_bind_group(
                &self.device,
                &self.bind_group_layout,
                &binding.buffer,
                &self.faces,
                &self.sampler,
            );
        }

        log::info!(
            "uploaded {} atlas, {}x{} per face",
            if atlas.is_stereo() { "stereo" } else { "mono" },
            edge,
            edge
        );
    }

    pub fn render_with_ui(
        &mut self,
        window: &Window,
        run_ui: impl FnOnce(&egui::Context),
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // 1. Render Scene, one pass region per eye
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            let mesh = match self.geometry {
                Geometry::Cube => &self.cube,
                Geometry::Sphere => &self.sphere,
            };

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for eye_view in &self.views {
                let vp = eye_view.viewport;
                if vp.width < 1.0 || vp.height < 1.0 {
                    continue;
                }
                let binding = match eye_view.eye {
                    Eye::Left => &self.left,
                    Eye::Right => &self.right,
                };
                render_pass.set_viewport(vp.x, vp.y, vp.width, vp.height, 0.0, 1.0);
                render_pass.set_bind_group(0, &binding.bind_group, &[]);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        // 2. Render UI
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, run_ui);

        self.egui_state.handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes);

        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: true },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer.render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
