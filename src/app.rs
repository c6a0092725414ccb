use std::{sync::Arc, time::Instant};

use log::{debug, error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use rand::{SeedableRng, rngs::SmallRng};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    config::{FloatingLogosConfig, HostHints},
    flip_words::FlipWords,
    loader::{FileFetcher, LoadReport, load_all},
    renderer::SurfaceMetrics,
    simulation::FrameClock,
    text::TextPainter,
    trail::BinaryTrail,
    vectors::Vector2D,
    widget::{FloatingLogos, HandleKind, Host},
};

const TITLE: &str = "floating logos";
const WORDS_COLOR: [u8; 4] = [235, 235, 245, 255];
const WORDS_PX: f32 = 28.0;

/// A winit window standing in for the host page.
pub struct NativeHost {
    window: Arc<Window>,
    hints: HostHints,
}

impl Host for NativeHost {
    fn metrics(&self) -> Option<SurfaceMetrics> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return None;
        }
        let scale = self.window.scale_factor() as f32;
        Some(SurfaceMetrics::new(
            size.width as f32 / scale,
            size.height as f32 / scale,
            scale,
        ))
    }

    fn hints(&self) -> HostHints {
        self.hints
    }

    // Resize and click events always reach the window; only frames need asking for.
    fn attach(&mut self, kind: HandleKind) -> bool {
        if kind == HandleKind::Frame {
            self.window.request_redraw();
        }
        true
    }

    fn detach(&mut self, kind: HandleKind) {
        debug!("released {kind:?}");
    }
}

/// Extras drawn on top of the logos.
#[derive(Default)]
pub struct Overlay {
    pub font: Option<Vec<u8>>,
    pub words: Vec<String>,
}

pub struct App {
    config: FloatingLogosConfig,
    hints: HostHints,
    proxy: EventLoopProxy<LoadReport>,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    widget: Option<FloatingLogos<NativeHost>>,
    trail: Option<BinaryTrail>,
    words: Option<FlipWords>,
    painter: Option<TextPainter>,
    rng: SmallRng,
    started: Instant,
    overlay_clock: FrameClock,
    cursor: Vector2D,
}

impl App {
    pub fn new(
        config: FloatingLogosConfig,
        hints: HostHints,
        overlay: Overlay,
        proxy: EventLoopProxy<LoadReport>,
        seed: u64,
    ) -> Self {
        let painter = overlay
            .font
            .as_deref()
            .and_then(|bytes| match TextPainter::from_bytes(bytes) {
                Ok(painter) => Some(painter),
                Err(e) => {
                    warn!("{e}; text overlays fall back to plain marks");
                    None
                }
            });
        let words = (!overlay.words.is_empty()).then(|| FlipWords::new(overlay.words, hints));

        Self {
            config,
            hints,
            proxy,
            window: None,
            pixels: None,
            widget: None,
            trail: BinaryTrail::new(hints),
            words,
            painter,
            rng: SmallRng::seed_from_u64(seed),
            started: Instant::now(),
            overlay_clock: FrameClock::default(),
            cursor: Vector2D::default(),
        }
    }

    fn start_loading(&self) {
        let proxy = self.proxy.clone();
        let logos = self.config.logos.clone();
        std::thread::spawn(move || {
            let report = futures::executor::block_on(load_all(&FileFetcher, &logos));
            info!(
                "{} of {} logos loaded",
                report.loaded().count(),
                report.len()
            );
            if proxy.send_event(report).is_err() {
                warn!("event loop closed before logos settled");
            }
        });
    }

    fn redraw(&mut self) {
        let now = self.started.elapsed().as_secs_f64() * 1000.0;
        let dt = self.overlay_clock.tick(now);

        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        let Some(surface) = widget.frame(now) else {
            return;
        };

        if let Some(trail) = self.trail.as_mut() {
            trail.update(dt);
            trail.draw(surface, self.painter.as_ref());
        }
        if let (Some(words), Some(painter)) = (self.words.as_mut(), self.painter.as_ref()) {
            words.tick(dt);
            words.draw(surface, painter, 24.0, 24.0, WORDS_PX, WORDS_COLOR);
        }

        let Some(pixels) = self.pixels.as_mut() else {
            return;
        };
        let frame = pixels.frame_mut();
        if frame.len() != surface.frame().len() {
            debug!("buffer size changing; skipping frame");
            return;
        }
        frame.copy_from_slice(surface.frame());
        if let Err(e) = pixels.render() {
            error!("render failed: {e}");
        }
    }

    fn resize(&mut self) {
        let (Some(widget), Some(pixels), Some(window)) =
            (self.widget.as_mut(), self.pixels.as_mut(), self.window.as_ref())
        else {
            return;
        };
        let Some(metrics) = widget.host().metrics() else {
            return;
        };
        widget.resize(metrics);

        let size = window.inner_size();
        if let Err(e) = pixels.resize_surface(size.width, size.height) {
            error!("could not resize surface: {e}");
        }
        if let Some((w, h)) = widget.surface().map(|s| s.physical_size()) {
            if let Err(e) = pixels.resize_buffer(w, h) {
                error!("could not resize buffer: {e}");
            }
        }
    }
}

impl ApplicationHandler<LoadReport> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(960.0, 600.0));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("could not create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let host = NativeHost {
            window: Arc::clone(&window),
            hints: self.hints,
        };
        let mut widget = FloatingLogos::new(self.config.clone(), host);

        let window_size = window.inner_size();
        let (buffer_w, buffer_h) = widget
            .surface()
            .map(|s| s.physical_size())
            .unwrap_or((window_size.width.max(1), window_size.height.max(1)));
        let surface_texture = SurfaceTexture::new(
            window_size.width.max(1),
            window_size.height.max(1),
            Arc::clone(&window),
        );
        match Pixels::new(buffer_w, buffer_h, surface_texture) {
            Ok(pixels) => self.pixels = Some(pixels),
            Err(e) => {
                error!("could not create pixel buffer: {e}");
                event_loop.exit();
                return;
            }
        }

        if widget.mount() {
            self.start_loading();
        }
        self.widget = Some(widget);
        self.window = Some(window);
        self.started = Instant::now();
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, report: LoadReport) {
        if let Some(widget) = self.widget.as_mut() {
            widget.on_resources_settled(report, &mut self.rng);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    self.resize();
                }
            }
            WindowEvent::CloseRequested => {
                info!("close requested; stopping");
                if let Some(widget) = self.widget.as_mut() {
                    widget.teardown();
                }
                event_loop.exit();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale = self
                    .window
                    .as_ref()
                    .map(|w| w.scale_factor())
                    .unwrap_or(1.0);
                self.cursor =
                    Vector2D::new((position.x / scale) as f32, (position.y / scale) as f32);
                if let Some(trail) = self.trail.as_mut() {
                    trail.pointer_moved(self.cursor, &mut self.rng);
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if let Some(widget) = self.widget.as_mut() {
                    widget.click(self.cursor);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(window) = self.window.as_ref() {
                    window.pre_present_notify();
                }
                self.redraw();
            }
            _ => (),
        }
    }
}
