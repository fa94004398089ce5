use crate::assets::SpriteSheet;
use crate::cache;
use crate::config::{load_settings, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, map_event_to_action};
use crate::model::{GameState, Scene, SleepPhase, SpriteState, Vec2};
use crate::motion::TickOutcome;
use crate::render::{
    canvas_to_cells, draw_center_box, draw_scene, ui_overlay, Pixel, Terminal,
    ViewportSurface, HELP_TEXT,
};
use crate::sim::PlayerAction;
use crate::sleep::SleepStep;
use anyhow::Context;
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

pub(crate) struct App {
    settings: Settings,
    state: GameState,
    sprites: SpriteSheet,
    paths: Paths,
    term: Terminal,
    should_quit: bool,
    started: Instant,
}

impl App {
    fn init(settings: Settings, paths: Paths) -> anyhow::Result<Self> {
        // Sprites are fully loaded before the first tick can run.
        let sprites = match cache::prepare(&paths.cache_root, &settings.sprite_dir) {
            Ok(c) => SpriteSheet::load(&c),
            Err(e) => {
                warn!(error = %e, "asset cache unavailable, drawing placeholders");
                SpriteSheet::placeholder()
            }
        };

        let term = Terminal::begin().context("entering the terminal")?;

        let vp = term.viewport();
        let edge = settings.sprite_edge();
        let sprite = SpriteState::new(vp.bounds(), Vec2::new(edge, edge), settings.motion);
        let state = GameState::new(sprite, settings.lock_controls_while_sleeping);
        info!(cols = term.cols, rows = term.rows, "pet spawned");

        Ok(Self {
            settings,
            state,
            sprites,
            paths,
            term,
            should_quit: false,
            started: Instant::now(),
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let frame_dt = Duration::from_secs_f32(1.0 / self.settings.frame_fps() as f32);

        while !self.should_quit {
            let frame_start = Instant::now();

            if self.term.resize_if_needed()? {
                let vp = self.term.viewport();
                self.state.sprite.reclamp(vp.bounds());
            }

            for ev in collect_input_nonblocking(frame_dt)? {
                match map_event_to_action(self.state.scene, &ev) {
                    Some(PlayerAction::Quit) => {
                        self.should_quit = true;
                        break;
                    }
                    Some(action) => self.state.apply(action),
                    None => {}
                }
            }

            log_outcome(self.state.tick(self.started.elapsed()));

            self.render_frame()?;

            spin_sleep(frame_dt, frame_start);
        }
        Ok(())
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let bg = crossterm::style::Color::Black;
        self.term.cur.clear(bg);
        self.term.canvas.clear(Pixel::default());

        let vp = self.term.viewport();
        draw_scene(
            &mut ViewportSurface::new(&mut self.term.canvas, vp),
            &self.state,
            &self.sprites,
        );
        canvas_to_cells(
            &self.term.canvas,
            &mut self.term.cur,
            self.settings.enable_color,
            bg,
        );

        ui_overlay(&mut self.term.cur, &self.state);

        if self.state.scene == Scene::Help {
            draw_center_box(&mut self.term.cur, "How to care for your pig", HELP_TEXT);
        }

        self.term.present()?;
        Ok(())
    }
}

pub(crate) fn run(
    settings_override: impl FnOnce(Settings) -> Settings,
    paths: Paths,
) -> anyhow::Result<()> {
    let stored = load_settings(&paths.settings_path);
    let settings = settings_override(stored.clone());
    let mut app = App::init(settings, paths)?;
    let looped = app.run();
    // leave the alternate screen even when the loop failed
    let ended = app.term.end();
    looped?;
    ended?;
    // overrides from the command line are not written back
    save_settings_atomic(&app.paths.settings_path, &stored)?;
    info!("bye");
    Ok(())
}

fn log_outcome(outcome: TickOutcome) {
    match outcome {
        TickOutcome::WallBounce(facing) => trace!(?facing, "wall bounce"),
        TickOutcome::Sleep(SleepStep::Entered(SleepPhase::Sleeping)) => info!("pet is asleep"),
        TickOutcome::Sleep(SleepStep::Entered(phase)) => trace!(status = phase.label(), "nap"),
        _ => {}
    }
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
