//! WebAssembly entry point and JavaScript bindings.
//!
//! The host chart library stays in JavaScript. It hands the engine three
//! conversion callbacks, forwards DOM pointer and key events, and receives
//! engine events as JSON strings through a listener callback. Drawings are
//! saved through a host key-value store once edits settle.

use crate::shortcuts::{is_engine_key, ShortcutRegistry};
use chartmark_core::storage::{AutoSaveManager, BoxFuture, DrawingSet, SaveJob, StorageResult};
use chartmark_core::{
    Bar, ChartEngine, ChartKey, ChartRenderer, DataCoord, DataSeries, EngineConfig, GridBounds,
    KeyEvent, MenuAction, Modifiers, MouseButton, PointerEvent, Shape, ShapeId, ShapeKind, Storage,
    StorageError, StylePatch,
};
use js_sys::{Array, Function, Promise, Reflect};
use kurbo::Point;
use std::sync::Arc;
use std::time::Duration;
use wasm_bindgen::prelude::*;

fn number(value: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(value, &JsValue::from_str(key)).ok()?.as_f64()
}

fn present(value: JsValue) -> Option<JsValue> {
    if value.is_null() || value.is_undefined() {
        None
    } else {
        Some(value)
    }
}

/// Renderer backed by the host's conversion callbacks.
struct JsRenderer {
    /// `(x, y) => ({ timestamp, price }) | null`
    pixel_to_data: Function,
    /// `(index, price) => ({ x, y }) | null`
    data_to_pixel: Function,
    /// `() => ({ left, top, right, bottom }) | null`
    grid_bounds: Function,
    painted: bool,
}

impl JsRenderer {
    fn call(&self, f: &Function, args: &[f64]) -> Option<JsValue> {
        let result = match args {
            [] => f.call0(&JsValue::NULL),
            [a, b] => f.call2(&JsValue::NULL, &JsValue::from_f64(*a), &JsValue::from_f64(*b)),
            _ => return None,
        };
        match result {
            Ok(value) => present(value),
            Err(e) => {
                log::warn!("renderer callback threw: {:?}", e);
                None
            }
        }
    }
}

impl ChartRenderer for JsRenderer {
    fn is_ready(&self) -> bool {
        self.painted
    }

    fn pixel_to_data(&self, pixel: Point) -> Option<DataCoord> {
        let value = self.call(&self.pixel_to_data, &[pixel.x, pixel.y])?;
        Some(DataCoord {
            timestamp: number(&value, "timestamp")? as i64,
            price: number(&value, "price")?,
        })
    }

    fn data_to_pixel(&self, index: usize, price: f64) -> Option<Point> {
        let value = self.call(&self.data_to_pixel, &[index as f64, price])?;
        Some(Point::new(number(&value, "x")?, number(&value, "y")?))
    }

    fn grid_bounds(&self) -> Option<GridBounds> {
        let value = self.call(&self.grid_bounds, &[])?;
        Some(GridBounds::new(
            number(&value, "left")?,
            number(&value, "top")?,
            number(&value, "right")?,
            number(&value, "bottom")?,
        ))
    }
}

/// Prefix of every entry the engine writes into the host's key-value store.
const ENTRY_PREFIX: &str = "chartmark:";

/// Storage backed by a synchronous host key-value store such as
/// `localStorage`. Each chart is one JSON [`DrawingSet`] entry.
struct JsStorage {
    /// `(id, json) => void`
    write: Function,
    /// `(id) => string | null`
    read: Function,
    /// `(id) => void`
    remove: Function,
    /// `() => string[]`
    keys: Function,
}

fn host_error(e: JsValue) -> StorageError {
    StorageError::Io(format!("storage callback threw: {:?}", e))
}

impl JsStorage {
    fn entry(key: &ChartKey) -> JsValue {
        JsValue::from_str(&format!("{ENTRY_PREFIX}{}", key.file_stem()))
    }

    fn read_entry(&self, entry: &JsValue) -> StorageResult<Option<DrawingSet>> {
        let value = self.read.call1(&JsValue::NULL, entry).map_err(host_error)?;
        match value.as_string() {
            Some(json) => DrawingSet::from_json(&json).map(Some),
            None => Ok(None),
        }
    }

    fn read_own(&self, key: &ChartKey) -> StorageResult<Option<DrawingSet>> {
        Ok(self.read_entry(&Self::entry(key))?.filter(|set| set.key == *key))
    }

    fn write_set(&self, key: &ChartKey, shapes: &[Shape]) -> StorageResult<()> {
        let json = DrawingSet::new(key.clone(), shapes.to_vec()).to_json()?;
        self.write
            .call2(&JsValue::NULL, &Self::entry(key), &JsValue::from_str(&json))
            .map_err(host_error)?;
        Ok(())
    }

    fn list_keys(&self) -> StorageResult<Vec<ChartKey>> {
        let entries = Array::from(&self.keys.call0(&JsValue::NULL).map_err(host_error)?);
        let mut keys = Vec::new();
        for entry in entries.iter() {
            if !entry.as_string().is_some_and(|e| e.starts_with(ENTRY_PREFIX)) {
                continue;
            }
            match self.read_entry(&entry) {
                Ok(Some(set)) => keys.push(set.key),
                Ok(None) => {}
                Err(e) => log::warn!("ignoring {:?}: {}", entry, e),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl Storage for JsStorage {
    fn save(&self, key: &ChartKey, shapes: &[Shape]) -> BoxFuture<'_, StorageResult<()>> {
        let result = self.write_set(key, shapes);
        Box::pin(async move { result })
    }

    fn load(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<Vec<Shape>>> {
        let result = self.read_own(key).and_then(|set| {
            set.map(|s| s.shapes)
                .ok_or_else(|| StorageError::NotFound(key.storage_id()))
        });
        Box::pin(async move { result })
    }

    fn delete(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<()>> {
        let result = self
            .remove
            .call1(&JsValue::NULL, &Self::entry(key))
            .map(|_| ())
            .map_err(host_error);
        Box::pin(async move { result })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<ChartKey>>> {
        let result = self.list_keys();
        Box::pin(async move { result })
    }

    fn exists(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<bool>> {
        let result = self.read_own(key).map(|set| set.is_some());
        Box::pin(async move { result })
    }
}

fn rejection(e: impl std::fmt::Display) -> JsValue {
    JsError::new(&e.to_string()).into()
}

fn spawn_save(job: SaveJob<JsStorage>) {
    wasm_bindgen_futures::spawn_local(async move {
        let key = job.key().clone();
        if let Err(e) = job.run().await {
            log::error!("saving drawings of {} failed: {}", key, e);
        }
    });
}

fn parse_shape_id(id: &str) -> Result<ShapeId, JsError> {
    ShapeId::parse_str(id).map_err(|e| JsError::new(&format!("invalid shape id {id}: {e}")))
}

/// Chart annotation engine exposed to JavaScript.
#[wasm_bindgen]
pub struct WebChartEngine {
    engine: ChartEngine<JsRenderer>,
    listener: Option<Function>,
    autosave: Option<AutoSaveManager<JsStorage>>,
}

impl WebChartEngine {
    /// Deliver queued events to the listener and save settled changes.
    fn flush(&mut self) {
        let events = self.engine.drain_events();
        if let Some(autosave) = &mut self.autosave {
            autosave.observe(&events);
        }
        if let Some(listener) = &self.listener {
            for event in events {
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if let Err(e) = listener.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                            log::warn!("event listener threw: {:?}", e);
                        }
                    }
                    Err(e) => log::warn!("could not serialize {:?}: {}", event.kind(), e),
                }
            }
        }
        self.autosave_tick();
    }

    fn autosave_mut(&mut self) -> Result<&mut AutoSaveManager<JsStorage>, JsError> {
        self.autosave
            .as_mut()
            .ok_or_else(|| JsError::new("no storage attached"))
    }

    fn pointer(&mut self, event: PointerEvent) {
        self.engine.handle_pointer(event);
        self.flush();
    }
}

#[wasm_bindgen]
impl WebChartEngine {
    /// Create an engine. `config_json` is an optional partial engine config.
    #[wasm_bindgen(constructor)]
    pub fn new(
        pixel_to_data: Function,
        data_to_pixel: Function,
        grid_bounds: Function,
        config_json: Option<String>,
    ) -> Result<WebChartEngine, JsError> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json(&json)?,
            None => EngineConfig::default(),
        };
        let renderer = JsRenderer {
            pixel_to_data,
            data_to_pixel,
            grid_bounds,
            painted: false,
        };
        Ok(Self {
            engine: ChartEngine::new(renderer, config)?,
            listener: None,
            autosave: None,
        })
    }

    /// Persist drawings through a synchronous key-value store
    /// (`localStorage.setItem`, `getItem`, `removeItem` and a key lister).
    #[wasm_bindgen(js_name = attachStorage)]
    pub fn attach_storage(
        &mut self,
        write: Function,
        read: Function,
        remove: Function,
        keys: Function,
    ) {
        let storage = JsStorage {
            write,
            read,
            remove,
            keys,
        };
        let mut autosave = AutoSaveManager::new(Arc::new(storage));
        autosave.set_interval(Duration::from_millis(self.engine.config().autosave_interval_ms));
        self.autosave = Some(autosave);
    }

    /// Make a chart current and load its drawings. Resolves to the shapes
    /// as JSON for `importShapes`; edits from then on are saved to it.
    #[wasm_bindgen(js_name = openChart)]
    pub fn open_chart(&mut self, symbol: &str, timeframe: &str) -> Result<Promise, JsError> {
        let shapes = self.engine.snapshot();
        let autosave = self.autosave_mut()?;
        if autosave.is_dirty() && autosave.chart().is_some() {
            spawn_save(autosave.begin_save(&shapes)?);
        }
        let job = autosave.open(ChartKey::new(symbol, timeframe));
        Ok(wasm_bindgen_futures::future_to_promise(async move {
            let shapes = job.run().await.map_err(rejection)?;
            let json = serde_json::to_string(&shapes).map_err(rejection)?;
            Ok(JsValue::from_str(&json))
        }))
    }

    /// Save the current chart if its changes have settled. Hosts call this
    /// from a timer; engine calls that change shapes poll it too.
    #[wasm_bindgen(js_name = autosaveTick)]
    pub fn autosave_tick(&mut self) {
        let Some(autosave) = &mut self.autosave else {
            return;
        };
        if !autosave.should_save() {
            return;
        }
        if let Some(job) = autosave.due(&self.engine.snapshot()) {
            spawn_save(job);
        }
    }

    /// Save the current chart now.
    #[wasm_bindgen(js_name = saveNow)]
    pub fn save_now(&mut self) -> Result<(), JsError> {
        let shapes = self.engine.snapshot();
        spawn_save(self.autosave_mut()?.begin_save(&shapes)?);
        Ok(())
    }

    /// Charts with saved drawings, as JSON `[{symbol, timeframe}]`.
    #[wasm_bindgen(js_name = savedCharts)]
    pub fn saved_charts(&mut self) -> Result<Promise, JsError> {
        let storage = self.autosave_mut()?.storage().clone();
        Ok(wasm_bindgen_futures::future_to_promise(async move {
            let keys = storage.list().await.map_err(rejection)?;
            let json = serde_json::to_string(&keys).map_err(rejection)?;
            Ok(JsValue::from_str(&json))
        }))
    }

    /// Receive engine events as JSON strings.
    #[wasm_bindgen(js_name = setEventListener)]
    pub fn set_event_listener(&mut self, listener: Option<Function>) {
        self.listener = listener;
    }

    /// The chart has painted; pointer input is accepted from now on.
    #[wasm_bindgen(js_name = onReady)]
    pub fn on_ready(&mut self) {
        self.engine.bridge_mut().renderer_mut().painted = true;
        self.engine.on_ready();
        self.flush();
    }

    /// The chart is resizing or being torn down.
    pub fn suspend(&mut self) {
        self.engine.bridge_mut().renderer_mut().painted = false;
        self.engine.suspend();
    }

    /// Replace the plotted bars (`[{timestamp, open, high, low, close}]`).
    #[wasm_bindgen(js_name = setBars)]
    pub fn set_bars(&mut self, bars_json: &str) -> Result<(), JsError> {
        let bars: Vec<Bar> = serde_json::from_str(bars_json)?;
        self.engine.set_series(DataSeries::new(bars));
        self.flush();
        Ok(())
    }

    /// Append or update the latest bar.
    #[wasm_bindgen(js_name = pushBar)]
    pub fn push_bar(&mut self, bar_json: &str) -> Result<(), JsError> {
        let bar: Bar = serde_json::from_str(bar_json)?;
        self.engine.push_bar(bar);
        self.flush();
        Ok(())
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64, button: i16, time_ms: f64) {
        self.pointer(PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::from_dom(button),
            time_ms,
        });
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64, time_ms: f64) {
        self.pointer(PointerEvent::Move {
            position: Point::new(x, y),
            time_ms,
        });
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, x: f64, y: f64, button: i16, time_ms: f64) {
        self.pointer(PointerEvent::Up {
            position: Point::new(x, y),
            button: MouseButton::from_dom(button),
            time_ms,
        });
    }

    pub fn click(&mut self, x: f64, y: f64, time_ms: f64) {
        self.pointer(PointerEvent::Click {
            position: Point::new(x, y),
            time_ms,
        });
    }

    #[wasm_bindgen(js_name = contextMenu)]
    pub fn context_menu(&mut self, x: f64, y: f64, time_ms: f64) {
        self.pointer(PointerEvent::ContextMenu {
            position: Point::new(x, y),
            time_ms,
        });
    }

    /// Handle a DOM `keydown`. Returns true when the host should
    /// `preventDefault()`.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> bool {
        let event = KeyEvent::from_dom(key, Modifiers { shift, ctrl, alt, meta });
        if let Some(tool) = ShortcutRegistry::tool_for(&event) {
            self.engine.select_tool(Some(tool));
            self.flush();
            return true;
        }
        if !is_engine_key(&event) {
            return false;
        }
        self.engine.handle_key(&event);
        self.flush();
        true
    }

    pub fn undo(&mut self) -> bool {
        let done = self.engine.undo().is_ok();
        self.flush();
        done
    }

    pub fn redo(&mut self) -> bool {
        let done = self.engine.redo().is_ok();
        self.flush();
        done
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.engine.can_redo()
    }

    /// Arm a drawing tool by name, or pass nothing for selection mode.
    #[wasm_bindgen(js_name = selectTool)]
    pub fn select_tool(&mut self, tool: Option<String>) -> Result<(), JsError> {
        let kind = match tool.as_deref() {
            Some(name) => Some(
                ShapeKind::from_name(name)
                    .ok_or_else(|| JsError::new(&format!("unknown tool {name}")))?,
            ),
            None => None,
        };
        self.engine.select_tool(kind);
        self.flush();
        Ok(())
    }

    /// Currently selected shape id.
    pub fn selection(&self) -> Option<String> {
        self.engine.selection().map(|id| id.to_string())
    }

    /// Apply a style patch (`{color?, thickness?, opacity?}`).
    #[wasm_bindgen(js_name = updateStyle)]
    pub fn update_style(&mut self, shape_id: &str, style_json: &str) -> Result<(), JsError> {
        let id = parse_shape_id(shape_id)?;
        let style: StylePatch = serde_json::from_str(style_json)?;
        let result = self.engine.update_style(id, style);
        self.flush();
        result?;
        Ok(())
    }

    /// Run a context-menu action (`{"action": "delete"}`,
    /// `{"action": "setStyle", "style": {...}}`, ...).
    #[wasm_bindgen(js_name = menuAction)]
    pub fn menu_action(&mut self, shape_id: &str, action_json: &str) -> Result<(), JsError> {
        let id = parse_shape_id(shape_id)?;
        let action: MenuAction = serde_json::from_str(action_json)?;
        let result = self.engine.apply_menu_action(id, action);
        self.flush();
        result?;
        Ok(())
    }

    /// All shapes back to front, as JSON.
    #[wasm_bindgen(js_name = shapesJson)]
    pub fn shapes_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.engine.shapes())?)
    }

    /// In-progress drawing or drag, as JSON (`null` when idle).
    #[wasm_bindgen(js_name = previewJson)]
    pub fn preview_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.engine.preview())?)
    }

    /// Shapes for saving, as JSON.
    #[wasm_bindgen(js_name = exportShapes)]
    pub fn export_shapes(&self) -> Result<String, JsError> {
        Ok(self.engine.export_json()?)
    }

    /// Replace all shapes with saved ones. Returns how many were kept.
    #[wasm_bindgen(js_name = importShapes)]
    pub fn import_shapes(&mut self, json: &str) -> Result<usize, JsError> {
        let count = self.engine.import_json(json)?;
        self.flush();
        Ok(count)
    }
}

/// Initialize logging for the WASM module.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // Fails only when the host already installed a logger.
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Starting ChartMark (WASM)");
}
