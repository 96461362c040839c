//! Draws the same checkerboard sprites through every batch variant, one per
//! quadrant, and logs draw-call counts.
//!
//! Press Escape to quit. `RUST_LOG=lamassu_engine=debug` shows batch setup.

use anyhow::Result;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use lamassu_engine::batch::{
    ArrayTextureBatch, ArrayTextureBatchConfig, Batch, MultiTextureBatch, MultiTextureBatchConfig,
    Placement, PolygonBatch, PolygonBatchConfig, SpriteBatch, SpriteBatchConfig,
};
use lamassu_engine::core::{App, AppControl, FrameCtx};
use lamassu_engine::device::GpuInit;
use lamassu_engine::gfx::{PolygonRegion, TextureFilter, TextureRegion};
use lamassu_engine::logging::{init_logging, LoggingConfig};
use lamassu_engine::paint::Color;
use lamassu_engine::render::{GpuTexture, RenderCtx, RenderTarget, WgpuGraphics};
use lamassu_engine::time::FrameTime;
use lamassu_engine::window::{Runtime, RuntimeConfig};

const TILE: u32 = 32;
const SPRITES_PER_SCENE: usize = 400;
const STATS_EVERY: u64 = 240;

const PALETTE: [[u8; 4]; 6] = [
    [230, 80, 70, 255],
    [240, 180, 60, 255],
    [90, 200, 110, 255],
    [70, 150, 230, 255],
    [170, 100, 220, 255],
    [230, 230, 230, 255],
];

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "lamassu batches".to_string(),
        ..Default::default()
    };
    Runtime::run(config, GpuInit::default(), Demo::default())
}

#[derive(Default)]
struct Demo {
    scenes: Option<Scenes>,
    failed: bool,
}

struct Scenes {
    textures: Vec<GpuTexture>,
    hexagon: PolygonRegion<GpuTexture>,

    sprite: SpriteBatch<WgpuGraphics>,
    polygon: PolygonBatch<WgpuGraphics>,
    multi: MultiTextureBatch<WgpuGraphics>,
    array: ArrayTextureBatch<WgpuGraphics>,
}

impl Scenes {
    fn new(ctx: &RenderCtx<'_>) -> Result<Self> {
        let graphics = WgpuGraphics::from_ctx(ctx);

        let textures = PALETTE
            .iter()
            .enumerate()
            .map(|(i, &color)| checkerboard(&graphics, &format!("checker {i}"), color))
            .collect::<Result<Vec<_>>>()?;

        let hexagon = PolygonRegion::new(
            TextureRegion::new(textures[3].clone()),
            hexagon_points(TILE as f32),
            vec![0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 5],
        )?;

        let sprite = SpriteBatch::new(graphics, SpriteBatchConfig::default())?;
        let polygon = PolygonBatch::new(WgpuGraphics::from_ctx(ctx), PolygonBatchConfig::default())?;
        let multi = MultiTextureBatch::new(
            WgpuGraphics::from_ctx(ctx),
            MultiTextureBatchConfig::default(),
        )?;
        // fewer layers than textures keeps the layer cache evicting
        let array = ArrayTextureBatch::new(
            WgpuGraphics::from_ctx(ctx),
            ArrayTextureBatchConfig {
                layer_width: TILE,
                layer_height: TILE,
                layers: 4,
                ..Default::default()
            },
        )?;

        log::info!(
            "scenes ready: {} texture units, {} textures",
            multi.max_texture_units(),
            textures.len()
        );

        Ok(Self {
            textures,
            hexagon,
            sprite,
            polygon,
            multi,
            array,
        })
    }

    fn draw(&mut self, target: &RenderTarget, time: &FrameTime) -> Result<()> {
        let viewport = target.viewport();
        let (half_w, half_h) = (viewport.width * 0.5, viewport.height * 0.5);
        let projection = viewport.projection();
        let spin = time.frame_index as f32 * 0.5;

        self.sprite.graphics_mut().set_target(target.clone());
        self.sprite.set_projection_matrix(projection);
        self.sprite.begin()?;
        for i in 0..SPRITES_PER_SCENE {
            let (x, y) = grid(i, 0.0, half_h, half_w, half_h);
            let texture = &self.textures[i % self.textures.len()];
            self.sprite.draw(texture, x, y)?;
        }
        self.sprite.end()?;
        self.sprite.graphics_mut().clear_target();

        self.polygon.graphics_mut().set_target(target.clone());
        self.polygon.set_projection_matrix(projection);
        self.polygon.begin()?;
        for i in 0..SPRITES_PER_SCENE / 4 {
            let (x, y) = grid(i, half_w, half_h, half_w, half_h);
            let placement = Placement::rect(x, y, TILE as f32, TILE as f32)
                .centered()
                .rotation(spin + i as f32 * 7.0);
            self.polygon.draw_polygon_region_transformed(&self.hexagon, &placement)?;
        }
        self.polygon.end()?;
        self.polygon.graphics_mut().clear_target();

        self.multi.graphics_mut().set_target(target.clone());
        self.multi.set_projection_matrix(projection);
        self.multi.begin()?;
        for i in 0..SPRITES_PER_SCENE {
            let (x, y) = grid(i, 0.0, 0.0, half_w, half_h);
            let texture = &self.textures[i % self.textures.len()];
            self.multi.draw(texture, x, y)?;
        }
        self.multi.end()?;
        self.multi.graphics_mut().clear_target();

        self.array.graphics_mut().set_target(target.clone());
        self.array.set_projection_matrix(projection);
        self.array.begin()?;
        self.array.set_color(Color::new(1.0, 1.0, 1.0, 0.8))?;
        for i in 0..SPRITES_PER_SCENE {
            let (x, y) = grid(i, half_w, 0.0, half_w, half_h);
            // skewed usage: the first two textures dominate
            let pick = if i % 3 == 0 { i % self.textures.len() } else { i % 2 };
            self.array.draw(&self.textures[pick], x, y)?;
        }
        self.array.end()?;
        self.array.graphics_mut().clear_target();

        if time.frame_index % STATS_EVERY == 0 {
            self.log_stats(time);
        }
        Ok(())
    }

    fn log_stats(&self, time: &FrameTime) {
        log::info!(
            "{:.0} fps | draw calls: sprite {} polygon {} multi {} array {} | array layers {:?}, installs {}",
            time.fps,
            self.sprite.render_calls(),
            self.polygon.render_calls(),
            self.multi.render_calls(),
            self.array.render_calls(),
            self.array.slot_stats(),
            self.array.install_count(),
        );
    }
}

impl App for Demo {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if event.state == ElementState::Pressed
                && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
            {
                return AppControl::Exit;
            }
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.failed {
            return AppControl::Exit;
        }

        let time = ctx.time;
        let (scenes, failed) = (&mut self.scenes, &mut self.failed);
        let control = ctx.render(Color::new(0.08, 0.08, 0.1, 1.0), |rctx, target| {
            if scenes.is_none() {
                match Scenes::new(rctx) {
                    Ok(s) => *scenes = Some(s),
                    Err(e) => {
                        log::error!("failed to build scenes: {e:#}");
                        *failed = true;
                        return;
                    }
                }
            }
            if let Some(s) = scenes.as_mut() {
                if let Err(e) = s.draw(target, &time) {
                    log::error!("frame failed: {e:#}");
                    *failed = true;
                }
            }
        });

        if self.failed { AppControl::Exit } else { control }
    }
}

/// Cell `i` of a tile grid filling the `w × h` area at `(x0, y0)`.
fn grid(i: usize, x0: f32, y0: f32, w: f32, h: f32) -> (f32, f32) {
    let step = TILE as f32 + 4.0;
    let columns = ((w / step) as usize).max(1);
    let rows = ((h / step) as usize).max(1);
    let cell = i % (columns * rows);
    (
        x0 + (cell % columns) as f32 * step,
        y0 + (cell / columns) as f32 * step,
    )
}

fn hexagon_points(size: f32) -> Vec<f32> {
    let r = size * 0.5;
    (0..6)
        .flat_map(|k| {
            let a = std::f32::consts::FRAC_PI_3 * k as f32;
            [r + r * a.cos(), r + r * a.sin()]
        })
        .collect()
}

fn checkerboard(graphics: &WgpuGraphics, label: &str, color: [u8; 4]) -> Result<GpuTexture> {
    let dark = color.map(|c| c / 3);
    let mut pixels = Vec::with_capacity((TILE * TILE * 4) as usize);
    for y in 0..TILE {
        for x in 0..TILE {
            let on = ((x / 8) + (y / 8)) % 2 == 0;
            let mut px = if on { color } else { dark };
            px[3] = 255;
            pixels.extend_from_slice(&px);
        }
    }
    Ok(graphics.create_texture(label, TILE, TILE, &pixels, TextureFilter::Linear)?)
}
