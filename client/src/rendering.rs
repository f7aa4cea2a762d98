use crate::game::{ClientWorld, RenderEntity};
use macroquad::prelude::*;
use shared::math::Vector3;
use shared::physics::Aabb;
use shared::MatchPhase;

/// Screen pixels per world unit
const PIXELS_PER_UNIT: f32 = 5.0;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub client_id: Option<u32>,
    pub ping_ms: u64,
    pub fake_ping_ms: u64,
    pub corrections: u32,
    pub player_count: usize,
}

/// Maps world coordinates (y up, origin on the floor's centre) to the screen.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    width: f32,
    height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn to_screen(&self, point: Vector3) -> (f32, f32) {
        (
            self.width / 2.0 + point.x * PIXELS_PER_UNIT,
            self.height * 0.85 - point.y * PIXELS_PER_UNIT,
        )
    }

    /// Top-left corner and size of a box on screen.
    pub fn rect(&self, bounds: &Aabb) -> (f32, f32, f32, f32) {
        let (left, top) = self.to_screen(Vector3::new(bounds.min.x, bounds.max.y, 0.0));
        let width = (bounds.max.x - bounds.min.x) * PIXELS_PER_UNIT;
        let height = (bounds.max.y - bounds.min.y) * PIXELS_PER_UNIT;
        (left, top, width, height)
    }
}

pub struct Renderer {
    viewport: Viewport,
    show_scoreboard: bool,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            viewport: Viewport::new(width as f32, height as f32),
            show_scoreboard: false,
        }
    }

    pub fn toggle_scoreboard(&mut self) {
        self.show_scoreboard = !self.show_scoreboard;
    }

    pub fn render(&mut self, world: &ClientWorld, ui: UiConfig) {
        self.viewport = Viewport::new(screen_width(), screen_height());
        clear_background(Color::from_rgba(26, 26, 26, 255));

        self.draw_arena(world);

        let entities = world.render_entities();
        for entity in &entities {
            self.draw_entity(world, entity);
        }

        self.draw_ui(&ui);
        self.draw_match_clock(world);
        if self.show_scoreboard {
            self.draw_scoreboard(world);
        }
    }

    fn draw_arena(&self, world: &ClientWorld) {
        for platform in &world.arena().platforms {
            let (x, y, w, h) = self.viewport.rect(&platform.bounds);
            let color = if platform.one_way {
                Color::from_rgba(90, 90, 110, 255)
            } else {
                Color::from_rgba(68, 68, 68, 255)
            };
            draw_rectangle(x, y, w, h, color);
        }
    }

    fn draw_entity(&self, world: &ClientWorld, entity: &RenderEntity) {
        if !entity.alive {
            return;
        }

        let bounds = Aabb::from_center(entity.position, world.config().body_size);
        let (x, y, w, h) = self.viewport.rect(&bounds);

        let color = if entity.is_local {
            GREEN
        } else {
            Color::from_rgba(255, 68, 68, 255)
        };
        // Blink while invincible.
        let visible = !entity.invincible || (get_time() * 8.0) as i64 % 2 == 0;
        if visible {
            draw_rectangle(x, y, w, h, color);
        }
        draw_rectangle_lines(x, y, w, h, 2.0, WHITE);

        if entity.is_local {
            self.draw_velocity_vector(entity);
        }

        let label = format!("{} ({})", entity.name, entity.score);
        draw_text(&label, x, y - 4.0, 14.0, WHITE);
    }

    fn draw_velocity_vector(&self, entity: &RenderEntity) {
        let (x0, y0) = self.viewport.to_screen(entity.position);
        let (x1, y1) = self
            .viewport
            .to_screen(entity.position + entity.velocity.scale(0.1));

        if entity.velocity.magnitude() > 1.0 {
            draw_line(x0, y0, x1, y1, 2.0, YELLOW);
        }
    }

    fn draw_ui(&self, config: &UiConfig) {
        let y_start = 10.0;

        let connection_color = if config.client_id.is_some() {
            GREEN
        } else {
            RED
        };
        draw_rectangle(10.0, y_start, 8.0, 8.0, connection_color);
        draw_text("CON", 20.0, y_start + 8.0, 12.0, WHITE);

        let ping_y = y_start + 15.0;
        let total_ping = config.ping_ms + config.fake_ping_ms;
        let ping_bars = ((total_ping / 20).min(10)) as i32;

        for i in 0..10i32 {
            let bar_color = if i < ping_bars {
                if total_ping < 50 {
                    GREEN
                } else if total_ping < 100 {
                    YELLOW
                } else {
                    RED
                }
            } else {
                Color::from_rgba(51, 51, 51, 255)
            };

            draw_rectangle(10.0 + (i as f32) * 3.0, ping_y, 2.0, 8.0, bar_color);
        }

        let ping_text = format!("{}ms", total_ping);
        draw_text(&ping_text, 45.0, ping_y + 8.0, 12.0, WHITE);

        let info_y = ping_y + 20.0;
        let info = format!(
            "{} players, {} corrections",
            config.player_count, config.corrections
        );
        draw_text(&info, 10.0, info_y, 12.0, WHITE);
    }

    fn draw_match_clock(&self, world: &ClientWorld) {
        let (phase, remaining) = world.match_state();
        let text = match phase {
            MatchPhase::Waiting => "Waiting for players".to_string(),
            MatchPhase::Playing => format_clock(remaining),
            MatchPhase::Finished => format!("Next match in {}", format_clock(remaining)),
        };

        let size = measure_text(&text, None, 24, 1.0);
        draw_text(&text, (screen_width() - size.width) / 2.0, 28.0, 24.0, WHITE);
    }

    fn draw_scoreboard(&self, world: &ClientWorld) {
        let x = screen_width() - 200.0;
        draw_rectangle(x - 10.0, 10.0, 200.0, 24.0 + 18.0 * world.leaderboard().len() as f32, Color::from_rgba(0, 0, 0, 160));
        draw_text("Scores", x, 28.0, 18.0, YELLOW);

        for (i, (name, score)) in world.leaderboard().iter().enumerate() {
            let line = format!("{:<16} {:>3}", name, score);
            draw_text(&line, x, 46.0 + 18.0 * i as f32, 16.0, WHITE);
        }
    }
}

/// `m:ss` for a number of seconds.
pub fn format_clock(seconds: f32) -> String {
    let total = seconds.max(0.0).ceil() as u32;
    format!("{}:{:02}", total / 60, total % 60)
}
