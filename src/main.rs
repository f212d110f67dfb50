//! brainview demo
//!
//! Synthetic hemispheres, a volume and a chart drawn into four regions of
//! one window. Arrow keys rotate, left click identifies, right click
//! projects onto the surface, S saves a PNG of the window.

use std::f32::consts::PI;
use std::path::Path;

use brainview::annotation::{Annotation, AnnotationAnchor, AnnotationShape};
use brainview::capture;
use brainview::fiber::{Fiber, FiberDisplay, FiberLayer};
use brainview::model::{
    Border, ChartModel, ChartSeries, Focus, GrayscalePalette, LineChart, SliceSelection, SliceViewPlane, Structure,
    SurfaceGeometry, SurfaceLayer, SurfaceModel, SurfaceType, ViewTransform, VolumeData, VolumeKind, VolumeOverlay,
    VolumeSliceModel, WholeBrainModel, WholeBrainSeparation, WholeBrainVolumeMode,
};
use brainview::rasterizer::{self as gl, Rgba};
use brainview::text::{RecordedText, TextStyle};
use brainview::{
    BrainRenderer, FrameTiming, ModelContent, Preferences, SelectionCategory, SelectionManager, ViewportRegion,
    WindowContent, VERSION,
};
use macroquad::prelude::*;

const ROTATE_DEGREES_PER_SECOND: f32 = 90.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("brainview v{}", VERSION),
        window_width: 1024,
        window_height: 768,
        window_resizable: true,
        high_dpi: false,
        ..Default::default()
    }
}

/// Data the regions borrow from, built once
struct Scene {
    left: SurfaceGeometry,
    right: SurfaceGeometry,
    left_rgba: Vec<Rgba>,
    right_rgba: Vec<Rgba>,
    borders: Vec<Border>,
    foci: Vec<Focus>,
    volume: VolumeData,
    palette: GrayscalePalette,
    series: Vec<ChartSeries>,
    fibers: Vec<Fiber>,
}

impl Scene {
    fn new() -> Self {
        let left = hemisphere("left", Structure::CortexLeft, gl::Vec3::new(-35.0, 0.0, 0.0), 30.0);
        let right = hemisphere("right", Structure::CortexRight, gl::Vec3::new(35.0, 0.0, 0.0), 30.0);
        let left_rgba = shade_by_height(&left, Rgba::rgb(0.9, 0.6, 0.4));
        let right_rgba = shade_by_height(&right, Rgba::rgb(0.4, 0.6, 0.9));
        let borders = vec![Border {
            name: "equator".into(),
            nodes: (6 * 24..7 * 24).collect(),
            color: Rgba::rgb(1.0, 1.0, 0.0),
            closed: true,
        }];
        let foci = vec![Focus {
            name: "pole".into(),
            xyz: gl::Vec3::new(-35.0, 30.0, 0.0),
            color: Rgba::GREEN,
            radius: 3.0,
        }];
        let fibers = (0..8)
            .map(|i| {
                let a = i as f32 / 8.0 * 2.0 * PI;
                Fiber {
                    origin: gl::Vec3::new(a.cos() * 40.0, a.sin() * 40.0, 0.0),
                    direction: gl::Vec3::new(a.cos(), a.sin(), 0.5).normalize(),
                    magnitude: 1.0,
                    fan_major: 2.0,
                    fan_minor: 1.0,
                    opacity: 1.0,
                    index: i,
                }
            })
            .collect();
        Self {
            left,
            right,
            left_rgba,
            right_rgba,
            borders,
            foci,
            volume: blob_volume(),
            palette: GrayscalePalette { threshold: Some(0.05) },
            series: demo_series(),
            fibers,
        }
    }
}

/// Sphere of `radius` around `center`, 12 stacks by 24 slices
fn hemisphere(name: &str, structure: Structure, center: gl::Vec3, radius: f32) -> SurfaceGeometry {
    let (stacks, slices) = (12usize, 24usize);
    let mut coordinates = Vec::with_capacity((stacks + 1) * slices);
    for i in 0..=stacks {
        let phi = PI * i as f32 / stacks as f32;
        for j in 0..slices {
            let theta = 2.0 * PI * j as f32 / slices as f32;
            let p = gl::Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            coordinates.push(center + p * radius);
        }
    }
    let mut triangles = Vec::with_capacity(stacks * slices * 2);
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * slices + j;
            let b = i * slices + (j + 1) % slices;
            triangles.push([a, a + slices, b]);
            triangles.push([b, a + slices, b + slices]);
        }
    }
    let mut g = SurfaceGeometry {
        name: name.to_string(),
        structure,
        surface_type: SurfaceType::Anatomical,
        coordinates,
        normals: Vec::new(),
        triangles,
    };
    g.compute_normals();
    g
}

fn shade_by_height(g: &SurfaceGeometry, base: Rgba) -> Vec<Rgba> {
    g.coordinates
        .iter()
        .map(|p| base.shade(0.6 + 0.4 * (p.y / 30.0).clamp(-1.0, 1.0)))
        .collect()
}

/// 20^3 grid over -50..50 with a gaussian blob in the middle
fn blob_volume() -> VolumeData {
    let n = 20usize;
    let origin = gl::Vec3::new(-47.5, -47.5, -47.5);
    let spacing = gl::Vec3::new(5.0, 5.0, 5.0);
    let mut values = Vec::with_capacity(n * n * n);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let p = gl::Vec3::new(
                    origin.x + i as f32 * spacing.x,
                    origin.y + j as f32 * spacing.y,
                    origin.z + k as f32 * spacing.z,
                );
                values.push((-p.dot(p) / (2.0 * 25.0 * 25.0)).exp());
            }
        }
    }
    VolumeData {
        name: "blob".into(),
        dims: [n, n, n],
        origin,
        spacing,
        maps: vec![values],
        kind: VolumeKind::Scalar,
    }
}

fn demo_series() -> Vec<ChartSeries> {
    let wave = |f: fn(f32) -> f32, color| ChartSeries {
        name: "wave".into(),
        points: (0..40).map(|i| gl::Vec2::new(i as f32 * 0.25, f(i as f32 * 0.25))).collect(),
        color,
        line_width: 1.0,
    };
    vec![wave(f32::sin, Rgba::RED), wave(f32::cos, Rgba::BLUE)]
}

/// Four regions in a 2x2 grid: surface, slices, chart, whole brain
fn layout<'a>(
    scene: &'a Scene,
    overlays: &'a [VolumeOverlay<'a>],
    annotations: &'a [Annotation<'a>],
    view: ViewTransform,
    window: &WindowContent,
) -> Vec<ViewportRegion<'a>> {
    let cells = window.rect().grid(2, 2);
    let slices = SliceSelection::centered(&scene.volume);
    let mut left = SurfaceLayer::new(&scene.left, &scene.left_rgba);
    left.borders = &scene.borders;
    left.foci = &scene.foci;
    let fibers = FiberLayer { fibers: &scene.fibers, display: FiberDisplay::default() };

    let contents = [
        ModelContent::Surface(SurfaceModel { layer: left.clone(), view, mirrored: false }),
        ModelContent::VolumeSlices(VolumeSliceModel {
            overlays,
            plane: SliceViewPlane::All,
            slices,
            view,
            fibers: None,
        }),
        ModelContent::Chart(ChartModel::Lines(LineChart { series: &scene.series })),
        ModelContent::WholeBrain(WholeBrainModel {
            left: Some(left),
            right: Some(SurfaceLayer::new(&scene.right, &scene.right_rgba)),
            cerebellum: None,
            overlays,
            slices,
            separation: WholeBrainSeparation { left_right: 5.0, cerebellum: 0.0 },
            view,
            fibers: Some(fibers),
        }),
    ];
    cells
        .into_iter()
        .zip(contents)
        .enumerate()
        .map(|(tab, (rect, content))| {
            let mut region = ViewportRegion::new(rect, window.index, Some(tab), content);
            if tab == 1 {
                region.annotations = annotations;
            }
            region
        })
        .collect()
}

fn log_selection(selection: &SelectionManager) {
    for category in SelectionCategory::ALL {
        if let Some(result) = selection.result(category) {
            log::info!(
                "{:?} {:?} depth {:.4} model {:?}",
                category,
                result.indices,
                result.screen_depth,
                result.model_xyz
            );
        }
    }
}

fn to_color(c: Rgba) -> Color {
    Color::new(c.r, c.g, c.b, c.a)
}

#[macroquad::main(window_conf)]
async fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let preferences = Preferences::load_or_default(&Preferences::default_path());
    let mut renderer = BrainRenderer::new(screen_width() as usize, screen_height() as usize, preferences);
    let scene = Scene::new();
    let overlays = [VolumeOverlay {
        volume: &scene.volume,
        map_index: 0,
        palette: Some(&scene.palette),
        opacity: 1.0,
        enabled: true,
        whole_brain_mode: WholeBrainVolumeMode::Slices,
    }];
    let colorbar_stats = scene.volume.statistics(0);
    let annotations = [Annotation::new(
        AnnotationAnchor::Tab(gl::Vec2::new(50.0, 94.0)),
        AnnotationShape::Colorbar { palette: &scene.palette, statistics: colorbar_stats },
    )];

    let mut selection = SelectionManager::new();
    let mut text = RecordedText::new();
    let mut view = ViewTransform::default();
    let (mut yaw, mut pitch) = (0.0f32, 0.0f32);
    let mut draw_ms = 0.0f32;

    loop {
        let dt = get_frame_time();
        if is_key_down(KeyCode::Left) {
            yaw -= ROTATE_DEGREES_PER_SECOND * dt;
        }
        if is_key_down(KeyCode::Right) {
            yaw += ROTATE_DEGREES_PER_SECOND * dt;
        }
        if is_key_down(KeyCode::Up) {
            pitch -= ROTATE_DEGREES_PER_SECOND * dt;
        }
        if is_key_down(KeyCode::Down) {
            pitch += ROTATE_DEGREES_PER_SECOND * dt;
        }
        view.rotation = gl::mat4_mul(&gl::mat4_rotation_x(pitch), &gl::mat4_rotation_y(yaw));

        let window = WindowContent::new(0, screen_width() as i32, screen_height() as i32);
        let regions = layout(&scene, &overlays, &annotations, view, &window);

        // Picking reuses the framebuffer, so it runs before the frame is drawn
        let (mx, my) = mouse_position();
        let (mx, my) = (mx as i32, my as i32);
        if let Some(region) = regions.iter().find(|r| r.rect.contains(mx, my)) {
            if is_mouse_button_pressed(MouseButton::Left) {
                match renderer.select(&window, region, mx, my, &mut selection, true) {
                    Ok(()) => log_selection(&selection),
                    Err(e) => log::error!("selection failed: {}", e),
                }
            }
            if is_mouse_button_pressed(MouseButton::Right) {
                match renderer.project_to_model(&window, region, mx, my) {
                    Ok(p) if p.is_valid() => log::info!("projected to {:?} on {:?}", p.stereotaxic_xyz, p.structure),
                    Ok(_) => log::info!("nothing to project onto"),
                    Err(e) => log::error!("projection failed: {}", e),
                }
            }
        }

        let start = get_time();
        text.clear();
        let timing = FrameTiming { frames_per_second: get_fps() as f32, draw_milliseconds: draw_ms };
        if let Err(e) = renderer.draw_models(&window, &regions, Some(timing), Some(&mut text)) {
            log::error!("draw failed: {}", e);
        }
        draw_ms = ((get_time() - start) * 1000.0) as f32;

        let fb = renderer.framebuffer();
        if is_key_pressed(KeyCode::S) {
            if let Err(e) = capture::save_png(fb, fb.bounds(), Path::new("brainview.png")) {
                log::error!("{}", e);
            }
        }
        clear_background(BLACK);
        let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
        texture.set_filter(FilterMode::Nearest);
        draw_texture(&texture, 0.0, 0.0, WHITE);
        for (x, y, label, style) in &text.items {
            draw_text_line(label, *x, *y, style);
        }

        next_frame().await;
    }
}

fn draw_text_line(label: &str, x: f32, y: f32, style: &TextStyle) {
    let dims = measure_text(label, None, style.size as u16, 1.0);
    let x = match style.align {
        brainview::text::TextAlign::Left => x,
        brainview::text::TextAlign::Center => x - dims.width / 2.0,
        brainview::text::TextAlign::Right => x - dims.width,
    };
    draw_text(label, x, y, style.size, to_color(style.color));
}
