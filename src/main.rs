// main.rs — 事件循环：拖拽/触摸/滚轮交互、菜单与状态栏

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod atlas;
mod config;
mod error;
mod i18n;
mod input;
mod loader;
mod mesh;
mod panorama;
mod renderer;
mod stereo;

use clap::Parser;
use config::Args;
use loader::AtlasLoader;
use panorama::{Geometry, PanoramaViewer, PointerId};
use renderer::Renderer;
use stereo::StereoMode;

use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{CursorIcon, Fullscreen, Window, WindowBuilder},
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

enum LoadStatus {
    Empty,
    Loading(PathBuf),
    Loaded { tile_size: u32, stereo: bool },
    Failed(String),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut current_lang = args.lang.clone();
    i18n::init(&current_lang);

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)?,
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone()))?;
    let mut viewer = PanoramaViewer::new(args.lon, args.lat, args.fov);
    viewer.geometry = args.geometry.into();
    viewer.stereo = args.stereo_mode();

    // FPS 计算
    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;
    let mut show_fps = false;

    // 交互状态：MouseInput 不带坐标，记录最近的光标位置
    let mut cursor = (0.0f32, 0.0f32);

    // UI 状态
    let mut vsync_enabled = true;
    let mut status = LoadStatus::Empty;

    // 异步加载：运行时打开的文件按宽高比推断块数
    let mut loader = AtlasLoader::new();

    if let Some(path) = args.initial_atlas() {
        status = LoadStatus::Loading(path.clone());
        loader.request(path, args.tiles);
    } else {
        log::info!("no atlas given, press O to open one");
    }

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        // 检查后台加载结果
        if let Some(result) = loader.poll() {
            status = match result {
                Ok(atlas) => {
                    let (tile_size, stereo) = (atlas.tile_size(), atlas.is_stereo());
                    renderer.load_atlas(atlas);
                    LoadStatus::Loaded { tile_size, stereo }
                }
                Err(e) => {
                    log::error!("{e}");
                    LoadStatus::Failed(e.to_string())
                }
            };
        }

        match event {
            Event::WindowEvent { event, .. } => {
                // 松开按键/抬起手指时无论落在哪里都结束拖拽
                if let Some(pointer) = input::released_pointer(&event) {
                    viewer.end_drag(pointer);
                    if !viewer.is_dragging() {
                        window.set_cursor_icon(CursorIcon::Default);
                    }
                }

                // 再让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                let scale = window.scale_factor();
                let logical = |p: PhysicalPosition<f64>| {
                    let p = p.to_logical::<f64>(scale);
                    (p.x as f32, p.y as f32)
                };

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        renderer.resize(*new_inner_size);
                    }

                    // 键盘快捷键
                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => {
                                    if let Some(path) = pick_atlas() {
                                        status = LoadStatus::Loading(path.clone());
                                        loader.request(path, None);
                                    }
                                }
                                Some(VirtualKeyCode::F11) => toggle_fullscreen(&window, &mut viewer),
                                Some(VirtualKeyCode::S) => viewer.stereo = viewer.stereo.toggled(),
                                Some(VirtualKeyCode::G) => viewer.geometry = viewer.geometry.toggled(),
                                Some(VirtualKeyCode::R) => viewer.reset(),
                                _ => {}
                            }
                        }
                    }

                    // 鼠标交互：任意按键按下开始拖拽
                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        ..
                    } => {
                        viewer.begin_drag(PointerId::Mouse, cursor.0, cursor.1);
                        window.set_cursor_icon(CursorIcon::Grabbing);
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = logical(position);
                        viewer.drag_to(PointerId::Mouse, cursor.0, cursor.1);
                    }

                    WindowEvent::Touch(Touch { phase, location, id, .. }) => {
                        let (x, y) = logical(location);
                        let pointer = PointerId::Touch(id);
                        match phase {
                            TouchPhase::Started => viewer.begin_drag(pointer, x, y),
                            TouchPhase::Moved => viewer.drag_to(pointer, x, y),
                            // already released above
                            TouchPhase::Ended | TouchPhase::Cancelled => {}
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        viewer.zoom(input::wheel_delta_pixels(delta, scale));
                    }

                    WindowEvent::DroppedFile(path) => {
                        status = LoadStatus::Loading(path.clone());
                        loader.request(path, None);
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                // FPS 统计
                frame_count += 1;
                let now = Instant::now();
                if now.duration_since(last_frame_time).as_secs_f32() >= 1.0 {
                    fps = frame_count as f32 / now.duration_since(last_frame_time).as_secs_f32();
                    frame_count = 0;
                    last_frame_time = now;
                }

                renderer.update_camera(&viewer);

                let mut action = UiAction::default();
                let vsync_before = vsync_enabled;
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_ui(
                        ctx,
                        &mut viewer,
                        &mut action,
                        &mut show_fps,
                        &mut vsync_enabled,
                        fps,
                        &status,
                        &mut current_lang,
                    );
                });

                if vsync_enabled != vsync_before {
                    renderer.set_vsync(vsync_enabled);
                }
                if let Some(path) = action.open {
                    status = LoadStatus::Loading(path.clone());
                    loader.request(path, None);
                }
                if action.toggle_fullscreen {
                    toggle_fullscreen(&window, &mut viewer);
                }
                if action.language_changed {
                    window.set_title(&i18n::tr("app.title"));
                }
                if action.exit {
                    *control_flow = ControlFlow::Exit;
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory");
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => log::warn!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn pick_atlas() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(&i18n::tr("file.filter.images"), &IMAGE_EXTENSIONS)
        .pick_file()
}

fn toggle_fullscreen(window: &Window, viewer: &mut PanoramaViewer) {
    viewer.is_fullscreen = !viewer.is_fullscreen;
    if viewer.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

/// Requests from the UI that need the window or the loader.
#[derive(Default)]
struct UiAction {
    open: Option<PathBuf>,
    toggle_fullscreen: bool,
    language_changed: bool,
    exit: bool,
}

#[allow(clippy::too_many_arguments)]
fn draw_ui(
    ctx: &egui::Context,
    viewer: &mut PanoramaViewer,
    action: &mut UiAction,
    show_fps: &mut bool,
    vsync_enabled: &mut bool,
    fps: f32,
    status: &LoadStatus,
    current_lang: &mut String,
) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            // File
            ui.menu_button(i18n::tr("menu.file"), |ui| {
                if ui.button(i18n::tr("menu.open_atlas")).clicked() {
                    ui.close_menu();
                    action.open = pick_atlas();
                }
                if ui.button(i18n::tr("menu.exit")).clicked() {
                    action.exit = true;
                }
            });

            // View
            ui.menu_button(i18n::tr("menu.view"), |ui| {
                if ui.button(i18n::tr("view.reset")).clicked() {
                    viewer.reset();
                    ui.close_menu();
                }

                let fullscreen_label = if viewer.is_fullscreen {
                    i18n::tr("view.fullscreen.exit")
                } else {
                    i18n::tr("view.fullscreen.enter")
                };
                if ui.button(fullscreen_label).clicked() {
                    action.toggle_fullscreen = true;
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button(i18n::tr("view.geometry"), |ui| {
                    for (geometry, key) in [
                        (Geometry::Cube, "geometry.cube"),
                        (Geometry::Sphere, "geometry.sphere"),
                    ] {
                        if ui.radio_value(&mut viewer.geometry, geometry, i18n::tr(key)).clicked() {
                            ui.close_menu();
                        }
                    }
                });

                let mut side_by_side = viewer.stereo == StereoMode::SideBySide;
                if ui.checkbox(&mut side_by_side, i18n::tr("view.stereo")).clicked() {
                    viewer.stereo = if side_by_side {
                        StereoMode::SideBySide
                    } else {
                        StereoMode::Mono
                    };
                }

                ui.separator();
                if ui.checkbox(show_fps, i18n::tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }
                ui.checkbox(vsync_enabled, i18n::tr("view.enable_vsync"));
            });

            // Language
            ui.menu_button(i18n::tr("menu.language"), |ui| {
                for (code, name) in i18n::available_languages() {
                    if ui.radio_value(current_lang, code.clone(), name).clicked() {
                        i18n::init(&code);
                        action.language_changed = true;
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            match status {
                LoadStatus::Empty => {
                    ui.label(i18n::tr("status.no_atlas"));
                }
                LoadStatus::Loading(path) => {
                    ui.label(
                        egui::RichText::new(i18n::tr_with(
                            "status.loading",
                            &[("path", path.display().to_string())],
                        ))
                        .color(egui::Color32::YELLOW),
                    );
                }
                LoadStatus::Loaded { tile_size, stereo } => {
                    let key = if *stereo {
                        "status.loaded_stereo"
                    } else {
                        "status.loaded_mono"
                    };
                    ui.label(i18n::tr_with(key, &[("size", tile_size.to_string())]));
                }
                LoadStatus::Failed(err) => {
                    ui.label(
                        egui::RichText::new(i18n::tr_with("status.failed", &[("err", err.clone())]))
                            .color(egui::Color32::RED),
                    );
                }
            }
            ui.label("|");

            let geometry = match viewer.geometry {
                Geometry::Cube => i18n::tr("geometry.cube"),
                Geometry::Sphere => i18n::tr("geometry.sphere"),
            };
            let stereo = match viewer.stereo {
                StereoMode::Mono => i18n::tr("status.mode_mono"),
                StereoMode::SideBySide => i18n::tr("status.mode_side_by_side"),
            };
            ui.label(format!("{geometry} / {stereo}"));
            ui.label("|");
            ui.label(format!("Lon: {:.1}°", viewer.lon()));
            ui.label("|");
            ui.label(format!("Lat: {:.1}°", viewer.lat()));
            ui.label("|");
            ui.label(format!("FOV: {:.1}°", viewer.fov));

            if *show_fps {
                ui.label("|");
                ui.label(egui::RichText::new(format!("FPS: {:.1}", fps)).color(egui::Color32::GREEN));
            }
        });
    });
}
