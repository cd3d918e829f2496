//! Tiny Renderer viewer
//!
//! Opens a window showing a scene rendered by the software rasterizer, or
//! renders turntable frames straight to PNG with `--headless`.
//!
//! Controls: drag to orbit, wheel to zoom, C reset camera, 1-5 pick a shader,
//! W wireframe, R auto-rotate, arrows move the light in X/Y, PageUp/PageDown
//! move it in Z, -/= lower or raise the specular exponent, Esc quit.

mod app;

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::info;

use app::Viewer;
use tiny_renderer::rasterizer::{ShaderKind, HEIGHT, WIDTH};
use tiny_renderer::world::{load_scene, SceneFile};

const USAGE: &str = "Usage: tiny-renderer [SCENE.ron] [--headless OUT.png] [--frames N] \
                     [--size WxH] [--shader NAME] [--wireframe] [--workers N]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;

    let (mut file, base_dir) = match &options.scene {
        Some(path) => {
            let file = load_scene(path).with_context(|| format!("failed to load scene {}", path.display()))?;
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (file, dir)
        }
        None => (SceneFile::demo(), PathBuf::from(".")),
    };

    if options.wireframe {
        file.render.wireframe = true;
    }
    if let Some(workers) = options.workers {
        file.render.workers = workers;
    }

    let (width, height) = options.size;
    let scene = file
        .build(&base_dir, width, height)
        .context("failed to build scene")?;
    info!(
        "Scene: {} models, {} lights, {}x{}",
        scene.models().len(),
        scene.lights().len(),
        width,
        height
    );

    let mut viewer = Viewer::new(scene, file.render.clone());
    if let Some(kind) = options.shader {
        viewer.set_shader(kind);
    }

    match &options.headless {
        Some(out) => headless::run(viewer, out, options.frames),
        None => {
            interactive::run(viewer);
            Ok(())
        }
    }
}

struct CliOptions {
    scene: Option<PathBuf>,
    headless: Option<PathBuf>,
    frames: usize,
    size: (usize, usize),
    shader: Option<ShaderKind>,
    wireframe: bool,
    workers: Option<usize>,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            scene: None,
            headless: None,
            frames: 1,
            size: (WIDTH, HEIGHT),
            shader: None,
            wireframe: false,
            workers: None,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| args.next().ok_or_else(|| anyhow!("{flag} needs a value\n{USAGE}"));
            match arg.as_str() {
                "--headless" => options.headless = Some(PathBuf::from(value("--headless")?)),
                "--frames" => {
                    options.frames = value("--frames")?
                        .parse::<usize>()
                        .context("--frames expects a number")?
                        .max(1);
                }
                "--size" => options.size = parse_size(&value("--size")?)?,
                "--shader" => {
                    let name = value("--shader")?;
                    let kind = ShaderKind::from_name(&name).ok_or_else(|| {
                        let names: Vec<_> = ShaderKind::ALL.iter().map(|k| k.label()).collect();
                        anyhow!("Unknown shader: {name}. Expected one of {}", names.join(", "))
                    })?;
                    options.shader = Some(kind);
                }
                "--workers" => {
                    let workers = value("--workers")?
                        .parse::<usize>()
                        .context("--workers expects a number")?;
                    options.workers = Some(workers.max(1));
                }
                "--wireframe" => options.wireframe = true,
                "-h" | "--help" => return Err(anyhow!(USAGE)),
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}\n{USAGE}"));
                }
                path => {
                    if options.scene.is_some() {
                        return Err(anyhow!("Only one scene file may be given\n{USAGE}"));
                    }
                    options.scene = Some(PathBuf::from(path));
                }
            }
        }
        Ok(options)
    }
}

fn parse_size(s: &str) -> Result<(usize, usize)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("--size expects WxH, got {s}"))?;
    let w: usize = w.parse().with_context(|| format!("invalid width in {s}"))?;
    let h: usize = h.parse().with_context(|| format!("invalid height in {s}"))?;
    if w == 0 || h == 0 {
        return Err(anyhow!("--size must be non-zero, got {s}"));
    }
    Ok((w, h))
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::f32::consts::TAU;
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use indicatif::{ProgressBar, ProgressStyle};
    use log::info;
    use tiny_renderer::rasterizer::Snapshot;

    use crate::app::Viewer;

    /// Render `frames` turntable frames to PNG
    pub fn run(mut viewer: Viewer, out: &Path, frames: usize) -> Result<()> {
        let bar = ProgressBar::new(frames as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .context("invalid progress template")?
                .progress_chars("=> "),
        );

        let step = TAU / frames as f32;
        let mut snapshot = Snapshot::default();
        for i in 0..frames {
            let stats = viewer.render(&mut snapshot);
            let path = frame_path(out, i, frames);
            image::save_buffer(
                &path,
                &snapshot.pixels,
                snapshot.width as u32,
                snapshot.height as u32,
                image::ColorType::Rgba8,
            )
            .with_context(|| format!("failed to write {}", path.display()))?;

            bar.set_message(format!("{} px", stats.main.pixels_written));
            bar.inc(1);
            viewer.orbit.rotate(step, 0.0);
        }
        bar.finish_and_clear();
        info!("Wrote {} frame(s) to {}", frames, out.display());
        Ok(())
    }

    /// `out.png` for one frame, `out_0000.png`, `out_0001.png`, ... for several
    pub fn frame_path(out: &Path, index: usize, frames: usize) -> PathBuf {
        if frames <= 1 {
            return out.to_path_buf();
        }
        let stem = out.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let ext = out.extension().map(|s| s.to_string_lossy()).unwrap_or("png".into());
        out.with_file_name(format!("{stem}_{index:04}.{ext}"))
    }
}

#[cfg(target_arch = "wasm32")]
mod headless {
    use std::path::Path;

    use anyhow::{anyhow, Result};

    use crate::app::Viewer;

    pub fn run(_viewer: Viewer, _out: &Path, _frames: usize) -> Result<()> {
        Err(anyhow!("headless rendering is not available on wasm"))
    }
}

mod interactive {
    use macroquad::prelude::*;
    use tiny_renderer::rasterizer::{FrameView, ShaderKind};

    use crate::app::{letterbox, Viewer};

    /// Window is this many times the canvas size
    const WINDOW_SCALE: i32 = 2;
    /// World units per second while a light key is held
    const LIGHT_SPEED: f32 = 2.0;
    /// Specular exponent multiplier per key press
    const SPECULAR_STEP: f32 = 2.0;

    pub fn run(viewer: Viewer) {
        let conf = Conf {
            window_title: format!("Tiny Renderer v{}", tiny_renderer::VERSION),
            window_width: viewer.renderer.width() as i32 * WINDOW_SCALE,
            window_height: viewer.renderer.height() as i32 * WINDOW_SCALE,
            window_resizable: true,
            high_dpi: true,
            ..Default::default()
        };
        macroquad::Window::from_config(conf, frame_loop(viewer));
    }

    async fn frame_loop(mut viewer: Viewer) {
        let mut last_mouse = mouse_position();

        loop {
            if is_key_pressed(KeyCode::Escape) {
                break;
            }

            // Mouse: left drag orbits, wheel zooms
            let mouse = mouse_position();
            if is_mouse_button_down(MouseButton::Left) {
                viewer.drag(mouse.0 - last_mouse.0, mouse.1 - last_mouse.1);
            }
            last_mouse = mouse;

            let wheel = mouse_wheel().1;
            if wheel != 0.0 {
                viewer.zoom(wheel.signum());
            }

            let shader_keys = [KeyCode::Key1, KeyCode::Key2, KeyCode::Key3, KeyCode::Key4, KeyCode::Key5];
            for (i, key) in shader_keys.into_iter().enumerate() {
                if is_key_pressed(key) {
                    if let Some(kind) = ShaderKind::from_index(i) {
                        viewer.set_shader(kind);
                    }
                }
            }
            if is_key_pressed(KeyCode::W) {
                viewer.toggle_wireframe();
            }
            if is_key_pressed(KeyCode::R) {
                viewer.auto_rotate = !viewer.auto_rotate;
            }
            if is_key_pressed(KeyCode::C) {
                viewer.reset_camera();
            }
            if is_key_pressed(KeyCode::Equal) {
                viewer.scale_specular(SPECULAR_STEP);
            }
            if is_key_pressed(KeyCode::Minus) {
                viewer.scale_specular(1.0 / SPECULAR_STEP);
            }

            let dt = get_frame_time();
            let axis = |neg: KeyCode, pos: KeyCode| is_key_down(pos) as i32 as f32 - is_key_down(neg) as i32 as f32;
            let light_delta = ::glam::Vec3::new(
                axis(KeyCode::Left, KeyCode::Right),
                axis(KeyCode::Down, KeyCode::Up),
                axis(KeyCode::PageDown, KeyCode::PageUp),
            );
            if light_delta != ::glam::Vec3::ZERO {
                viewer.move_light(light_delta * LIGHT_SPEED * dt);
            }
            viewer.tick(dt);

            let bg = viewer.scene.background;
            clear_background(Color::from_rgba(bg.r, bg.g, bg.b, bg.a));

            // Present: upload the finished frame and fit it to the window, background in the bars
            viewer.render(&mut |frame: FrameView<'_>| {
                let texture = Texture2D::from_rgba8(frame.width as u16, frame.height as u16, frame.pixels);
                texture.set_filter(FilterMode::Nearest);
                let (x, y, w, h) = letterbox(screen_width(), screen_height(), frame.width, frame.height);
                draw_texture_ex(
                    &texture,
                    x,
                    y,
                    WHITE,
                    DrawTextureParams {
                        dest_size: Some(Vec2::new(w, h)),
                        ..Default::default()
                    },
                );
            });

            draw_text(&viewer.status_line(get_fps()), 10.0, 20.0, 20.0, WHITE);
            next_frame().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let options = parse(&[]).unwrap();
        assert!(options.scene.is_none());
        assert!(options.headless.is_none());
        assert_eq!(options.frames, 1);
        assert_eq!(options.size, (WIDTH, HEIGHT));
    }

    #[test]
    fn test_all_flags() {
        let options = parse(&[
            "scene.ron", "--headless", "out.png", "--frames", "8", "--size", "200x100", "--shader", "Phong",
            "--wireframe", "--workers", "4",
        ])
        .unwrap();
        assert_eq!(options.scene, Some(PathBuf::from("scene.ron")));
        assert_eq!(options.headless, Some(PathBuf::from("out.png")));
        assert_eq!(options.frames, 8);
        assert_eq!(options.size, (200, 100));
        assert_eq!(options.shader, Some(ShaderKind::Phong));
        assert!(options.wireframe);
        assert_eq!(options.workers, Some(4));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse(&["--shader", "toon"]).is_err());
        assert!(parse(&["--size", "100"]).is_err());
        assert!(parse(&["--size", "0x10"]).is_err());
        assert!(parse(&["--frames"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["a.ron", "b.ron"]).is_err());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_frame_paths() {
        let out = Path::new("renders/spin.png");
        assert_eq!(headless::frame_path(out, 3, 1), PathBuf::from("renders/spin.png"));
        assert_eq!(headless::frame_path(out, 3, 10), PathBuf::from("renders/spin_0003.png"));
    }
}
