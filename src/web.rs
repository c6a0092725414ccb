use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use js_sys::Uint8Array;
use log::{debug, error, info};
use rand::{SeedableRng, rngs::SmallRng};
use wasm_bindgen::{Clamped, JsCast, prelude::*};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, ImageData, MouseEvent,
    ResizeObserver,
};

use crate::config::{FloatingLogosConfig, HostHints, LogoSpec, PointerKind};
use crate::error::LoadError;
use crate::loader::{ResourceFetcher, load_all};
use crate::renderer::{Surface, SurfaceMetrics};
use crate::vectors::Vector2D;
use crate::widget::{FloatingLogos, HandleKind, Host};

type Widget = FloatingLogos<WebHost>;

#[wasm_bindgen(start)]
pub fn start() {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    // a second module instance keeps the first logger
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Fetches logos over HTTP with `window.fetch`.
pub struct HttpFetcher;

impl ResourceFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, LoadError>> {
        Box::pin(async move {
            let fail = |reason: String| LoadError::Fetch {
                url: url.to_string(),
                reason,
            };
            let window = web_sys::window().ok_or_else(|| fail("no window".into()))?;
            let response = JsFuture::from(window.fetch_with_str(url))
                .await
                .map_err(|e| fail(format!("{e:?}")))?;
            let response: web_sys::Response = response
                .dyn_into()
                .map_err(|_| fail("not a response".into()))?;
            if !response.ok() {
                return Err(fail(format!("HTTP {}", response.status())));
            }
            let promise = response
                .array_buffer()
                .map_err(|e| fail(format!("{e:?}")))?;
            let buffer = JsFuture::from(promise)
                .await
                .map_err(|e| fail(format!("{e:?}")))?;
            Ok(Uint8Array::new(&buffer).to_vec())
        })
    }
}

struct Callbacks {
    frame: Closure<dyn FnMut(f64)>,
    resize: Closure<dyn FnMut(js_sys::Array)>,
    click: Closure<dyn FnMut(MouseEvent)>,
}

impl Callbacks {
    fn new(widget: Weak<RefCell<Widget>>) -> Self {
        let frame = {
            let widget = widget.clone();
            Closure::<dyn FnMut(f64)>::new(move |now: f64| {
                let Some(rc) = widget.upgrade() else {
                    return;
                };
                let mut widget = rc.borrow_mut();
                widget.host_mut().frame_id = None;
                let canvas = widget.host().canvas.clone();
                let context = widget.host().context.clone();
                if let Some(surface) = widget.frame(now) {
                    present(&canvas, &context, surface);
                }
            })
        };
        let resize = {
            let widget = widget.clone();
            Closure::<dyn FnMut(js_sys::Array)>::new(move |_entries: js_sys::Array| {
                let Some(rc) = widget.upgrade() else {
                    return;
                };
                let mut widget = rc.borrow_mut();
                if let Some(metrics) = widget.host().metrics() {
                    widget.resize(metrics);
                }
            })
        };
        let click = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            let Some(rc) = widget.upgrade() else {
                return;
            };
            let client = Vector2D::new(event.client_x() as f32, event.client_y() as f32);
            rc.borrow_mut().click(client);
        });
        Self {
            frame,
            resize,
            click,
        }
    }
}

/// The page container plus the canvas we own inside it.
pub struct WebHost {
    window: web_sys::Window,
    container: HtmlElement,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    callbacks: Option<Callbacks>,
    frame_id: Option<i32>,
    observer: Option<ResizeObserver>,
}

impl WebHost {
    fn new(container: HtmlElement) -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;
        let canvas: HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
        let context: CanvasRenderingContext2d =
            canvas.get_context("2d").ok()??.dyn_into().ok()?;

        let style = canvas.style();
        for (name, value) in [
            ("position", "absolute"),
            ("inset", "0"),
            ("pointer-events", "none"),
        ] {
            style.set_property(name, value).ok()?;
        }
        // the canvas fills the container, so the container must be its containing block
        let position = window
            .get_computed_style(&container)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("position").ok());
        if position.as_deref().is_none_or(|p| p == "static") {
            container.style().set_property("position", "relative").ok()?;
        }
        container.append_child(&canvas).ok()?;

        Some(Self {
            window,
            container,
            canvas,
            context,
            callbacks: None,
            frame_id: None,
            observer: None,
        })
    }

    fn matches_media(&self, query: &str) -> bool {
        self.window
            .match_media(query)
            .ok()
            .flatten()
            .is_some_and(|list| list.matches())
    }
}

impl Host for WebHost {
    fn metrics(&self) -> Option<SurfaceMetrics> {
        let rect = self.container.get_bounding_client_rect();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return None;
        }
        Some(SurfaceMetrics {
            size: Vector2D::new(rect.width() as f32, rect.height() as f32),
            origin: Vector2D::new(rect.left() as f32, rect.top() as f32),
            device_pixel_ratio: self.window.device_pixel_ratio() as f32,
        })
    }

    fn hints(&self) -> HostHints {
        let pointer = if self.matches_media("(pointer: coarse)") {
            PointerKind::Coarse
        } else {
            PointerKind::Fine
        };
        HostHints {
            pointer,
            prefers_reduced_motion: self.matches_media("(prefers-reduced-motion: reduce)"),
        }
    }

    fn attach(&mut self, kind: HandleKind) -> bool {
        let Some(callbacks) = self.callbacks.as_ref() else {
            return false;
        };
        match kind {
            HandleKind::Frame => match self
                .window
                .request_animation_frame(callbacks.frame.as_ref().unchecked_ref())
            {
                Ok(id) => {
                    self.frame_id = Some(id);
                    true
                }
                Err(e) => {
                    error!("requestAnimationFrame failed: {e:?}");
                    false
                }
            },
            HandleKind::ResizeObserver => {
                match ResizeObserver::new(callbacks.resize.as_ref().unchecked_ref()) {
                    Ok(observer) => {
                        observer.observe(&self.container);
                        self.observer = Some(observer);
                        true
                    }
                    Err(e) => {
                        error!("ResizeObserver unavailable: {e:?}");
                        false
                    }
                }
            }
            HandleKind::ClickListener => self
                .container
                .add_event_listener_with_callback("click", callbacks.click.as_ref().unchecked_ref())
                .is_ok(),
        }
    }

    fn detach(&mut self, kind: HandleKind) {
        match kind {
            HandleKind::Frame => {
                if let Some(id) = self.frame_id.take() {
                    let _ = self.window.cancel_animation_frame(id);
                }
            }
            HandleKind::ResizeObserver => {
                if let Some(observer) = self.observer.take() {
                    observer.disconnect();
                }
            }
            HandleKind::ClickListener => {
                if let Some(callbacks) = self.callbacks.as_ref() {
                    let _ = self.container.remove_event_listener_with_callback(
                        "click",
                        callbacks.click.as_ref().unchecked_ref(),
                    );
                }
            }
        }
        debug!("released {kind:?}");
    }

    fn release_surface(&mut self) {
        self.canvas.remove();
    }
}

fn present(canvas: &HtmlCanvasElement, context: &CanvasRenderingContext2d, surface: &Surface) {
    let (width, height) = surface.physical_size();
    if canvas.width() != width || canvas.height() != height {
        canvas.set_width(width);
        canvas.set_height(height);
        let size = surface.logical_size();
        let style = canvas.style();
        let _ = style.set_property("width", &format!("{}px", size.x));
        let _ = style.set_property("height", &format!("{}px", size.y));
    }
    match ImageData::new_with_u8_clamped_array_and_sh(Clamped(surface.frame()), width, height) {
        Ok(data) => {
            if let Err(e) = context.put_image_data(&data, 0.0, 0.0) {
                error!("putImageData failed: {e:?}");
            }
        }
        Err(e) => error!("could not wrap frame: {e:?}"),
    }
}

async fn load_logos(widget: Weak<RefCell<Widget>>, logos: Vec<LogoSpec>, seed: u64) {
    let report = load_all(&HttpFetcher, &logos).await;
    let Some(rc) = widget.upgrade() else {
        debug!("unmounted before logos settled");
        return;
    };
    rc.borrow_mut()
        .on_resources_settled(report, &mut SmallRng::seed_from_u64(seed));
}

/// A mounted floating-logos effect; dropping or unmounting it tears it down.
#[wasm_bindgen]
pub struct MountHandle {
    widget: Rc<RefCell<Widget>>,
}

#[wasm_bindgen]
impl MountHandle {
    pub fn unmount(&self) {
        self.widget.borrow_mut().teardown();
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.widget.borrow().is_running()
    }
}

/// Mounts the effect inside `container`. Returns `None` (and does nothing)
/// when no drawing surface can be set up there.
#[wasm_bindgen]
pub fn mount(container: HtmlElement, config_json: &str) -> Result<Option<MountHandle>, JsValue> {
    let config = FloatingLogosConfig::from_json(config_json)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let Some(host) = WebHost::new(container) else {
        info!("no canvas context; floating logos not started");
        return Ok(None);
    };

    let logos = config.logos.clone();
    let seed = config
        .seed
        .unwrap_or_else(|| (js_sys::Math::random() * u64::MAX as f64) as u64);
    let widget = Rc::new(RefCell::new(FloatingLogos::new(config, host)));

    let active = {
        let mut w = widget.borrow_mut();
        w.host_mut().callbacks = Some(Callbacks::new(Rc::downgrade(&widget)));
        w.mount()
    };
    if active {
        spawn_local(load_logos(Rc::downgrade(&widget), logos, seed));
    }
    Ok(Some(MountHandle { widget }))
}
