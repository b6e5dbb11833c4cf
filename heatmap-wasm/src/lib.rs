use heatmap_core::{
    Backend, Dimensions, DiffusionParams, Hotspot, HotspotField, RunConfig, Simulation,
    encode_dense,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct Heatmap {
    dims: Dimensions,
    params: DiffusionParams,
    field: HotspotField,
    sim: Simulation,
}

#[wasm_bindgen]
impl Heatmap {
    #[wasm_bindgen(constructor)]
    pub fn new(width: usize, height: usize) -> Result<Heatmap, JsValue> {
        let dims = Dimensions::new(width, height).map_err(to_js)?;
        let params = DiffusionParams::default();
        let field = HotspotField::empty(dims).map_err(to_js)?;
        let sim = build(dims, params, &field)?;
        Ok(Heatmap {
            dims,
            params,
            field,
            sim,
        })
    }

    // Setup; each call restarts from round 0
    pub fn add_hotspot(&mut self, x: u32, y: u32, start: u32, end: u32) -> Result<(), JsValue> {
        self.field
            .insert(Hotspot::new(x, y, start, end))
            .map_err(to_js)?;
        self.reset()
    }

    pub fn set_coefficient(&mut self, coefficient: f32) -> Result<(), JsValue> {
        self.params = DiffusionParams::with_coefficient(coefficient).map_err(to_js)?;
        self.reset()
    }

    pub fn clear(&mut self) -> Result<(), JsValue> {
        self.field = HotspotField::empty(self.dims).map_err(to_js)?;
        self.reset()
    }

    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.sim = build(self.dims, self.params, &self.field)?;
        Ok(())
    }

    pub fn width(&self) -> usize { self.dims.width() }
    pub fn height(&self) -> usize { self.dims.height() }
    pub fn round(&self) -> u32 { self.sim.round() }

    // Copy-based JS access
    pub fn get_field(&self) -> Vec<f32> {
        self.sim.current().as_slice().to_vec()
    }

    pub fn dense_text(&self) -> String {
        encode_dense(self.sim.current())
    }

    // Advance + timing (WASM-only)
    pub fn run(&mut self, rounds: u32) -> Result<RunInfo, JsValue> {
        let t0 = now_ms();
        self.sim.extend(rounds);
        self.sim.run_to_completion().map_err(to_js)?;
        let t1 = now_ms();
        Ok(RunInfo { rounds, compute_ms: t1 - t0 })
    }
}

#[wasm_bindgen]
pub struct RunInfo {
    rounds: u32,
    compute_ms: f64,
}

#[wasm_bindgen]
impl RunInfo {
    pub fn rounds(&self) -> u32 { self.rounds }
    pub fn compute_ms(&self) -> f64 { self.compute_ms }
}

fn build(dims: Dimensions, params: DiffusionParams, field: &HotspotField) -> Result<Simulation, JsValue> {
    // No threads in the browser
    let config = RunConfig {
        dims,
        rounds: 0,
        backend: Backend::Serial,
        threads: None,
        params,
    };
    Simulation::new(&config, field.clone()).map_err(to_js)
}

fn to_js<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
