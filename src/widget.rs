//! Lifecycle of one floating-logos instance: setup gating, resource barrier,
//! the per-frame loop, pointer and resize events, and teardown.

use log::{debug, info, warn};
use rand::Rng;

use crate::body::{CLICK_INFLUENCE_RADIUS, CLICK_STRENGTH};
use crate::config::{FloatingLogosConfig, HostHints, PointerKind};
use crate::loader::LoadReport;
use crate::renderer::{Surface, SurfaceMetrics};
use crate::simulation::{FrameClock, Simulation};
use crate::vectors::Vector2D;

/// Host registrations owned by the widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// The pending animation-frame callback.
    Frame,
    ResizeObserver,
    ClickListener,
}

/// The page or window the widget lives in.
pub trait Host {
    /// Container geometry, or `None` when there is nothing to draw into yet.
    fn metrics(&self) -> Option<SurfaceMetrics>;
    fn hints(&self) -> HostHints;
    /// Registers a handle. Returns `false` if the host could not attach it.
    fn attach(&mut self, kind: HandleKind) -> bool;
    /// Releases a handle previously attached.
    fn detach(&mut self, kind: HandleKind);
    /// Removes whatever the host put on screen for the widget. Called once, on teardown.
    fn release_surface(&mut self) {}
}

/// Tracks which host handles are live so each is released exactly once.
#[derive(Debug, Default)]
pub struct HostHandles {
    frame: bool,
    resize: bool,
    click: bool,
}

impl HostHandles {
    fn slot(&mut self, kind: HandleKind) -> &mut bool {
        match kind {
            HandleKind::Frame => &mut self.frame,
            HandleKind::ResizeObserver => &mut self.resize,
            HandleKind::ClickListener => &mut self.click,
        }
    }

    pub fn is_attached(&self, kind: HandleKind) -> bool {
        match kind {
            HandleKind::Frame => self.frame,
            HandleKind::ResizeObserver => self.resize,
            HandleKind::ClickListener => self.click,
        }
    }

    pub fn attach<H: Host + ?Sized>(&mut self, host: &mut H, kind: HandleKind) -> bool {
        if self.is_attached(kind) {
            return true;
        }
        let attached = host.attach(kind);
        *self.slot(kind) = attached;
        attached
    }

    /// The host fired the pending frame callback; it no longer needs cancelling.
    pub fn frame_consumed(&mut self) {
        self.frame = false;
    }

    pub fn release_all<H: Host + ?Sized>(&mut self, host: &mut H) {
        for kind in [
            HandleKind::Frame,
            HandleKind::ResizeObserver,
            HandleKind::ClickListener,
        ] {
            let slot = self.slot(kind);
            if *slot {
                *slot = false;
                host.detach(kind);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisabledReason {
    NoSurface,
    CoarsePointer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Created, host handles not yet registered.
    Idle,
    /// Waiting for every logo resource to settle.
    Loading,
    Running,
    /// Every resource settled but none produced a body.
    Empty,
    /// The host refused to schedule another frame.
    Stalled,
    Disabled(DisabledReason),
    TornDown,
}

pub struct FloatingLogos<H: Host> {
    config: FloatingLogosConfig,
    host: H,
    handles: HostHandles,
    state: LoopState,
    surface: Option<Surface>,
    simulation: Simulation,
    clock: FrameClock,
}

impl<H: Host> FloatingLogos<H> {
    pub fn new(config: FloatingLogosConfig, host: H) -> Self {
        let hints = host.hints();
        let metrics = host.metrics();
        let disabled = if metrics.is_none() {
            Some(DisabledReason::NoSurface)
        } else if hints.pointer == PointerKind::Coarse && !config.enable_on_touch {
            Some(DisabledReason::CoarsePointer)
        } else {
            None
        };

        let background = config.background();
        let surface = metrics.map(|m| Surface::new(m, background));
        let size = metrics.map(|m| m.size).unwrap_or_default();
        let simulation = Simulation::new(&config, size.x, size.y);

        let state = match disabled {
            Some(reason) => {
                info!("floating logos disabled: {reason:?}");
                LoopState::Disabled(reason)
            }
            None => LoopState::Idle,
        };

        Self {
            config,
            host,
            handles: HostHandles::default(),
            state,
            surface,
            simulation,
            clock: FrameClock::default(),
        }
    }

    /// Registers the resize observer and starts waiting for resources.
    /// Returns whether the widget is active.
    pub fn mount(&mut self) -> bool {
        if self.state != LoopState::Idle {
            return false;
        }
        self.handles.attach(&mut self.host, HandleKind::ResizeObserver);
        self.state = LoopState::Loading;
        true
    }

    /// The resource barrier: every requested logo has loaded or failed.
    /// Spawns a body per loaded logo and starts the loop if there is any.
    pub fn on_resources_settled<R: Rng + ?Sized>(&mut self, report: LoadReport, rng: &mut R) {
        if self.state != LoopState::Loading {
            debug!("resources settled in state {:?}; ignoring", self.state);
            return;
        }

        let bounds = self.simulation.bounds();
        let density = self.config.density;
        for outcome in report.outcomes {
            match outcome.result {
                Ok(image) => {
                    self.simulation
                        .store_mut()
                        .spawn(&outcome.logo, density, image, bounds, rng);
                }
                Err(e) => warn!("[floating-logos] could not load {}: {e}", outcome.logo.src),
            }
        }

        if self.simulation.store().is_empty() {
            info!("no logo loaded; loop not started");
            self.state = LoopState::Empty;
            return;
        }

        self.handles.attach(&mut self.host, HandleKind::ClickListener);
        if !self.handles.attach(&mut self.host, HandleKind::Frame) {
            warn!("host refused a frame callback; loop not started");
            self.state = LoopState::Empty;
            return;
        }
        info!(
            "floating {} logos in {:?}",
            self.simulation.store().len(),
            self.simulation.bounds()
        );
        self.state = LoopState::Running;
    }

    /// One animation frame at `now_ms`. Steps, repaints, requests the next
    /// frame and hands back the painted surface.
    pub fn frame(&mut self, now_ms: f64) -> Option<&mut Surface> {
        self.handles.frame_consumed();
        if self.state != LoopState::Running {
            return None;
        }
        let dt = self.clock.tick(now_ms);
        self.simulation.step(dt);

        if !self.handles.attach(&mut self.host, HandleKind::Frame) {
            warn!("host refused the next frame; loop stopped");
            self.state = LoopState::Stalled;
        }

        let surface = self.surface.as_mut()?;
        surface.draw(self.simulation.bodies());
        Some(surface)
    }

    /// Pointer click at client coordinates.
    pub fn click(&mut self, client: Vector2D) {
        if self.state != LoopState::Running || !self.handles.is_attached(HandleKind::ClickListener)
        {
            return;
        }
        // the container may have scrolled since the last resize
        let origin = self
            .host
            .metrics()
            .or_else(|| self.surface.as_ref().map(|s| s.metrics()))
            .map(|m| m.origin);
        let local = client - origin.unwrap_or_default();
        self.simulation.store_mut().apply_impulse(
            local,
            CLICK_INFLUENCE_RADIUS,
            CLICK_STRENGTH,
        );
    }

    /// Container resized: only resolution and wall positions change.
    pub fn resize(&mut self, metrics: SurfaceMetrics) {
        if !self.handles.is_attached(HandleKind::ResizeObserver) {
            return;
        }
        self.simulation.width = metrics.size.x;
        self.simulation.height = metrics.size.y;
        match self.surface.as_mut() {
            Some(surface) => surface.resize(metrics),
            None => self.surface = Some(Surface::new(metrics, self.config.background())),
        }
        debug!("surface resized to {:?}", self.surface.as_ref().map(|s| s.physical_size()));
    }

    /// Cancels the frame, disconnects observers and listeners, drops every
    /// body and image. Safe to call any number of times.
    pub fn teardown(&mut self) {
        self.handles.release_all(&mut self.host);
        self.simulation.clear();
        self.surface = None;
        if self.state != LoopState::TornDown {
            debug!("floating logos torn down from {:?}", self.state);
            self.host.release_surface();
            self.state = LoopState::TornDown;
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn handles(&self) -> &HostHandles {
        &self.handles
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: Host> Drop for FloatingLogos<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
