//! Browser host: canvas overlay, animation frames, timers, session storage
//! and the `SnowEffect` class handed to the hosting page component.

use std::cell::RefCell;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::rc::{Rc, Weak};

use gloo::events::EventListener;
use gloo::render::{request_animation_frame, AnimationFrame};
use gloo::timers::callback::Timeout;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, Storage, Window};

use crate::config::SnowConfig;
use crate::constants::*;
use crate::coordination::{CoordinationFlag, FlagStore};
use crate::display::{placeholder_html, DisplayMode};
use crate::error::{SnowError, SnowResult};
use crate::host::{FrameHandle, Host, TimerHandle, TimerKind};
use crate::lifecycle::{Snowfall, StopMode};
use crate::particle::ParticleStore;
use crate::scene::{Scene, SharedScene};
use crate::surface::Surface;

const OVERLAY_STYLE: &str = "position: fixed !important; top: 0 !important; \
    left: 0 !important; width: 100vw !important; height: 100vh !important; \
    pointer-events: none !important; z-index: 999999 !important;";

type SharedSnowfall = Rc<RefCell<Snowfall<BrowserHost>>>;

thread_local! {
    // One overlay per page, whichever instance created it.
    static OVERLAY: RefCell<Option<SharedScene<CanvasSurface>>> = RefCell::new(None);
    // Disposed effects still fading the overlay out.
    static RETIRING: RefCell<Vec<SharedSnowfall>> = RefCell::new(Vec::new());
}

/// Lets go of a retiring effect once it has nothing left to do.
fn settle(effect: &SharedSnowfall) {
    if effect.borrow().is_active() {
        return;
    }
    RETIRING.with(|retiring| retiring.borrow_mut().retain(|e| !Rc::ptr_eq(e, effect)));
}

fn viewport(window: &Window) -> (f32, f32) {
    let dim = |value: Result<JsValue, JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32
    };
    (dim(window.inner_width()), dim(window.inner_height()))
}

/// 2D canvas overlay scaled for the device pixel ratio.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    dpr: f64,
    width: f32,
    height: f32,
}

impl CanvasSurface {
    fn new(canvas: HtmlCanvasElement, window: &Window) -> SnowResult<Self> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| SnowError::SurfaceUnavailable("2d context not supported".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SnowError::SurfaceUnavailable("unexpected context type".into()))?;
        ctx.set_image_smoothing_enabled(false);

        let dpr = window.device_pixel_ratio();
        let mut surface = Self {
            canvas,
            ctx,
            dpr: if dpr > 0.0 { dpr } else { 1.0 },
            width: 0.0,
            height: 0.0,
        };
        let (width, height) = viewport(window);
        surface.resize(width, height);
        Ok(surface)
    }

    fn is_connected(&self) -> bool {
        self.canvas.is_connected()
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.canvas.set_width((f64::from(width) * self.dpr) as u32);
        self.canvas.set_height((f64::from(height) * self.dpr) as u32);

        let style = self.canvas.style();
        let sized = style
            .set_property("width", &format!("{width}px"))
            .and_then(|_| style.set_property("height", &format!("{height}px")))
            .and_then(|_| self.ctx.set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0));
        if let Err(err) = sized {
            warn!(error = ?err, "failed to size overlay");
        }
    }

    fn clear(&mut self) {
        self.ctx
            .clear_rect(0.0, 0.0, f64::from(self.width), f64::from(self.height));
    }

    fn fill_disc(&mut self, x: f32, y: f32, radius: f32, alpha: f32) {
        self.ctx
            .set_fill_style_str(&format!("rgba(255, 255, 255, {alpha})"));
        self.ctx.begin_path();
        if self
            .ctx
            .arc(f64::from(x), f64::from(y), f64::from(radius), 0.0, TAU)
            .is_ok()
        {
            self.ctx.fill();
        }
    }
}

/// `sessionStorage`, when the page allows it.
pub struct SessionFlagStore {
    storage: Option<Storage>,
}

impl SessionFlagStore {
    fn new(window: &Window) -> Self {
        Self {
            storage: window.session_storage().ok().flatten(),
        }
    }

    fn storage(&self) -> SnowResult<&Storage> {
        self.storage
            .as_ref()
            .ok_or_else(|| SnowError::Storage("sessionStorage unavailable".into()))
    }
}

impl FlagStore for SessionFlagStore {
    fn get(&self, key: &str) -> SnowResult<Option<String>> {
        Ok(self.storage()?.get_item(key)?)
    }

    fn set(&self, key: &str, value: &str) -> SnowResult<()> {
        Ok(self.storage()?.set_item(key, value)?)
    }

    fn remove(&self, key: &str) -> SnowResult<()> {
        Ok(self.storage()?.remove_item(key)?)
    }
}

/// Routes animation frames and timers back into the owning controller.
/// Dropping a pending `AnimationFrame` or `Timeout` cancels it.
pub struct BrowserHost {
    window: Window,
    effect: Weak<RefCell<Snowfall<BrowserHost>>>,
    frame: Option<(FrameHandle, AnimationFrame)>,
    timers: HashMap<TimerHandle, Timeout>,
    next_handle: u32,
    flag: CoordinationFlag<SessionFlagStore>,
}

impl BrowserHost {
    fn new(window: Window, effect: Weak<RefCell<Snowfall<BrowserHost>>>) -> Self {
        let flag = CoordinationFlag::new(SessionFlagStore::new(&window));
        Self {
            window,
            effect,
            frame: None,
            timers: HashMap::new(),
            next_handle: 0,
            flag,
        }
    }

    fn next_handle(&mut self) -> u32 {
        self.next_handle = self.next_handle.wrapping_add(1);
        self.next_handle
    }

    fn build_scene(&self) -> SnowResult<SharedScene<CanvasSurface>> {
        let document = self
            .window
            .document()
            .ok_or_else(|| SnowError::SurfaceUnavailable("no document".into()))?;

        let canvas = match document.get_element_by_id(CANVAS_ID) {
            Some(existing) => {
                debug!("reusing overlay canvas left on the page");
                existing.dyn_into::<HtmlCanvasElement>().map_err(|_| {
                    SnowError::SurfaceUnavailable(format!("#{CANVAS_ID} is not a canvas"))
                })?
            }
            None => {
                let canvas = document
                    .create_element("canvas")?
                    .dyn_into::<HtmlCanvasElement>()
                    .map_err(|_| SnowError::SurfaceUnavailable("canvas unsupported".into()))?;
                canvas.set_id(CANVAS_ID);
                canvas.style().set_css_text(OVERLAY_STYLE);

                let body = document
                    .body()
                    .ok_or_else(|| SnowError::SurfaceUnavailable("no body".into()))?;
                body.insert_before(&canvas, body.first_child().as_ref())?;
                canvas
            }
        };

        let surface = CanvasSurface::new(canvas, &self.window)?;
        Ok(Scene::new(surface, ParticleStore::new()).shared())
    }
}

impl Host for BrowserHost {
    type Surface = CanvasSurface;
    type Flags = SessionFlagStore;

    fn now(&self) -> f64 {
        self.window
            .performance()
            .map_or_else(js_sys::Date::now, |performance| performance.now())
    }

    fn wall_clock(&self) -> f64 {
        js_sys::Date::now()
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_handle());
        let effect = self.effect.clone();
        let frame = request_animation_frame(move |_| {
            if let Some(effect) = effect.upgrade() {
                effect.borrow_mut().on_frame(handle);
                settle(&effect);
            }
        });
        self.frame = Some((handle, frame));
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if matches!(self.frame, Some((pending, _)) if pending == handle) {
            self.frame = None;
        }
    }

    fn set_timer(&mut self, kind: TimerKind, delay_ms: u32) -> TimerHandle {
        let handle = TimerHandle(self.next_handle());
        let effect = self.effect.clone();
        let timeout = Timeout::new(delay_ms, move || {
            if let Some(effect) = effect.upgrade() {
                {
                    let mut effect = effect.borrow_mut();
                    effect.host_mut().timers.remove(&handle);
                    effect.on_timer(handle);
                }
                settle(&effect);
            }
        });
        debug!(?kind, delay_ms, ?handle, "timer armed");
        self.timers.insert(handle, timeout);
        handle
    }

    fn clear_timer(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle);
    }

    fn find_scene(&self) -> Option<SharedScene<CanvasSurface>> {
        OVERLAY.with(|overlay| {
            overlay
                .borrow()
                .as_ref()
                .filter(|scene| scene.borrow().surface.is_connected())
                .cloned()
        })
    }

    fn create_scene(&mut self) -> Option<SharedScene<CanvasSurface>> {
        match self.build_scene() {
            Ok(scene) => {
                OVERLAY.with(|overlay| *overlay.borrow_mut() = Some(Rc::clone(&scene)));
                Some(scene)
            }
            Err(err) => {
                debug!(%err, "overlay unavailable");
                None
            }
        }
    }

    fn release_scene(&mut self) {
        if let Some(scene) = OVERLAY.with(|overlay| overlay.borrow_mut().take()) {
            scene.borrow().surface.canvas.remove();
        }
    }

    fn flag(&self) -> &CoordinationFlag<SessionFlagStore> {
        &self.flag
    }
}

/// One snowfall component instance, driven by the hosting page's lifecycle
/// notifications.
#[wasm_bindgen]
pub struct SnowEffect {
    element: Option<HtmlElement>,
    inner: SharedSnowfall,
    resize: Option<EventListener>,
}

#[wasm_bindgen]
impl SnowEffect {
    /// `element` is the component's own DOM node (for the edit-mode
    /// placeholder); `properties` the saved `{ snowAmount, fallSpeed,
    /// windStrength, timer }` bag.
    #[wasm_bindgen(constructor)]
    pub fn new(element: Option<HtmlElement>, properties: JsValue) -> Result<SnowEffect, JsValue> {
        let window = web_sys::window().ok_or_else(|| SnowError::JavaScript("no window".into()))?;
        let config = SnowConfig::from_js(properties);
        info!(?config, "snow effect created");

        let inner = Rc::new_cyclic(|weak| {
            RefCell::new(Snowfall::new(BrowserHost::new(window, weak.clone()), config))
        });
        Ok(Self {
            element,
            inner,
            resize: None,
        })
    }

    #[wasm_bindgen(js_name = onInit)]
    pub fn on_init(&mut self) {
        if self.resize.is_some() {
            return;
        }
        let window = self.inner.borrow().host().window.clone();
        let effect = Rc::downgrade(&self.inner);
        let listener = EventListener::new(&window.clone(), "resize", move |_| {
            if let Some(effect) = effect.upgrade() {
                let (width, height) = viewport(&window);
                effect.borrow_mut().on_resize(width, height);
            }
        });
        self.resize = Some(listener);
    }

    pub fn render(&mut self, mode: DisplayMode) {
        debug!(?mode, "render");
        if let Some(element) = &self.element {
            element.set_inner_html(&placeholder_html(mode));
        }
        self.on_init();
        self.inner.borrow_mut().render();
        RETIRING.with(|retiring| {
            retiring
                .borrow_mut()
                .retain(|e| !Rc::ptr_eq(e, &self.inner))
        });
    }

    #[wasm_bindgen(js_name = onPropertyChanged)]
    pub fn on_property_changed(&self, path: &str, value: f64) -> Result<(), JsValue> {
        self.inner.borrow_mut().on_property_changed(path, value)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = setProperties)]
    pub fn set_properties(&self, properties: JsValue) {
        self.inner
            .borrow_mut()
            .reconfigure(SnowConfig::from_js(properties));
    }

    pub fn stop(&self, graceful: bool) {
        let mode = if graceful {
            StopMode::Graceful
        } else {
            StopMode::Immediate
        };
        self.inner.borrow_mut().stop(mode);
        settle(&self.inner);
    }

    /// Teardown. When this was the last instance the overlay fades out
    /// first, outliving this object if the page frees it meanwhile.
    pub fn dispose(&mut self) {
        self.resize = None;
        self.inner.borrow_mut().dispose();
        if self.inner.borrow().is_active() {
            RETIRING.with(|retiring| {
                let mut retiring = retiring.borrow_mut();
                if !retiring.iter().any(|e| Rc::ptr_eq(e, &self.inner)) {
                    retiring.push(Rc::clone(&self.inner));
                }
            });
        }
        if let Some(element) = &self.element {
            element.set_inner_html("");
        }
    }

    pub fn phase(&self) -> String {
        format!("{:?}", self.inner.borrow().phase())
    }

    #[wasm_bindgen(js_name = particleCount)]
    pub fn particle_count(&self) -> u32 {
        self.inner.borrow().particle_count() as u32
    }

    pub fn config(&self) -> SnowConfig {
        self.inner.borrow().config()
    }

    /// The shared coordination record, or `null`.
    #[wasm_bindgen(js_name = coordinationState)]
    pub fn coordination_state(&self) -> Result<JsValue, JsValue> {
        match self.inner.borrow().host().flag().read() {
            Some(record) => Ok(serde_wasm_bindgen::to_value(&record)?),
            None => Ok(JsValue::NULL),
        }
    }
}
