//! Brick Reveal entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{Element, HtmlCanvasElement, KeyboardEvent, PointerEvent};

    use brick_reveal::audio::AudioManager;
    use brick_reveal::consts::*;
    use brick_reveal::physics::World;
    use brick_reveal::scene::{CanvasSurface, VisualSurface};
    use brick_reveal::sim::{
        FrameLoop, GameEvent, GuessOutcome, NextRoundTimer, RevealCoordinator,
    };
    use brick_reveal::{GameTuning, Scoreboard, Settings, pointer_to_lane};

    /// Pointer travel (CSS px) below which a press counts as a click
    const CLICK_SLOP: f32 = 4.0;

    /// Game instance holding all state
    struct Game {
        world: World,
        surface: CanvasSurface,
        coordinator: RevealCoordinator,
        frames: FrameLoop,
        scoreboard: Scoreboard,
        settings: Settings,
        audio: AudioManager,
        canvas_width: f32,
        /// Timestamp of the latest frame (seconds)
        now: f64,
        next_round_timer: NextRoundTimer,
        // Pointer drag tracking
        drag_from: Option<Vec2>,
        drag_travel: f32,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, mut surface: CanvasSurface, canvas_width: f32) -> Self {
            let tuning = GameTuning::default();
            let mut world = World::new(tuning.world_config());
            let coordinator = RevealCoordinator::new(tuning, seed, &mut world, &mut surface);

            let settings = Settings::load();
            let mut audio = AudioManager::new();
            audio.set_master_volume(settings.effective_volume());

            let mut frames = FrameLoop::new();
            frames.debug_overlay = settings.debug_overlay;

            Self {
                world,
                surface,
                coordinator,
                frames,
                scoreboard: Scoreboard::load(),
                settings,
                audio,
                canvas_width,
                now: 0.0,
                next_round_timer: NextRoundTimer::new(),
                drag_from: None,
                drag_travel: 0.0,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        fn launch_at(&mut self, pointer_x: f32) {
            let lane = pointer_to_lane(pointer_x, self.canvas_width, FLOOR_WIDTH);
            self.coordinator
                .launch(&mut self.world, &mut self.surface, lane);
        }

        fn guess(&mut self, color_index: usize) {
            let Some(outcome) = self.coordinator.guess(color_index) else {
                return;
            };
            if self.scoreboard.record(outcome) {
                log::info!("New best streak: {}", self.scoreboard.best);
            }
            self.scoreboard.save();
            // The revealed spheres and the result stay up for a moment
            self.next_round_timer.schedule(self.now);
        }

        fn next_round(&mut self) {
            self.next_round_timer.cancel();
            self.coordinator
                .next_round(&mut self.world, &mut self.surface);
        }

        fn toggle_debug(&mut self) {
            self.frames.debug_overlay = self.settings.toggle_debug_overlay();
            self.settings.save();
        }

        fn toggle_mute(&mut self) {
            self.settings.muted = !self.settings.muted;
            self.audio.set_master_volume(self.settings.effective_volume());
            self.settings.save();
        }

        fn frame(&mut self, time_ms: f64) {
            self.now = time_ms / 1000.0;
            self.frames.tick(
                self.now,
                &mut self.coordinator,
                &mut self.world,
                &mut self.surface,
            );
            self.handle_events();
            if self.next_round_timer.fire(self.now) {
                self.next_round();
            }

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time_ms;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest = self.frame_times[self.frame_index];
            if oldest > 0.0 && time_ms > oldest {
                self.fps = (60000.0 / (time_ms - oldest)).round() as u32;
            }

            self.update_hud();
        }

        /// Forward coordinator notifications to audio and the DOM
        fn handle_events(&mut self) {
            for event in self.coordinator.drain_events() {
                match event {
                    GameEvent::HitSound(cue) => self.audio.play(cue),
                    GameEvent::RoundStarted { round } => {
                        set_hidden("guess-panel", true);
                        set_text("round", &round.to_string());
                        set_text("prompt", "Click the floor to launch");
                    }
                    GameEvent::Launched { .. } => set_text("prompt", ""),
                    GameEvent::RoundRevealed { .. } => {
                        set_hidden("guess-panel", false);
                        set_text("prompt", "What color was hiding?");
                    }
                    GameEvent::Guessed { outcome, .. } => {
                        set_hidden("guess-panel", true);
                        set_text("prompt", match outcome {
                            GuessOutcome::Correct => "Correct!",
                            GuessOutcome::Incorrect => "Wrong color",
                        });
                    }
                }
            }
        }

        fn update_hud(&self) {
            set_text("score", &self.scoreboard.score.to_string());
            set_text("best", &self.scoreboard.best.to_string());
            if self.scoreboard.guesses > 0 {
                let accuracy = (self.scoreboard.accuracy() * 100.0).round();
                set_text("accuracy", &format!("{accuracy}%"));
            }
            if self.settings.show_fps {
                set_text("fps", &format!("{} fps", self.fps));
            }
        }
    }

    fn element(id: &str) -> Option<Element> {
        web_sys::window()?.document()?.get_element_by_id(id)
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = element(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_hidden(id: &str, hidden: bool) {
        if let Some(el) = element(id) {
            let classes = el.class_list();
            let _ = if hidden {
                classes.add_1("hidden")
            } else {
                classes.remove_1("hidden")
            };
        }
    }

    /// Size the canvas backing store to its CSS box at device pixel ratio
    fn fit_canvas(canvas: &HtmlCanvasElement) -> (u32, u32) {
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0);
        let width = (canvas.client_width() as f64 * dpr) as u32;
        let height = (canvas.client_height() as f64 * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);
        (width, height)
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Brick Reveal starting...");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document");
            return;
        };

        // Hide loading indicator
        set_hidden("loading", true);

        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #canvas element");
            return;
        };
        fit_canvas(&canvas);

        let Some(surface) = CanvasSurface::new(&canvas) else {
            log::error!("2D canvas context unavailable");
            return;
        };

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(
            seed,
            surface,
            canvas.client_width() as f32,
        )));
        log::info!("Game initialized with seed: {}", seed);

        // Color swatches on the guess buttons
        {
            let g = game.borrow();
            for (i, color) in g.coordinator.tuning().palette.iter().enumerate() {
                if let Some(btn) = element(&format!("color-btn-{i}")) {
                    let _ = btn.set_attribute("style", &format!("background:{}", color.hex));
                    let _ = btn.set_attribute("title", &color.name);
                }
            }
            if !g.settings.show_fps {
                set_hidden("fps", true);
            }
        }

        setup_input_handlers(&canvas, game.clone());
        setup_buttons(game.clone());
        setup_resize(canvas, game.clone());

        game.borrow_mut().handle_events();
        request_animation_frame(game);

        log::info!("Brick Reveal running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Press: start a potential click or orbit drag
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                g.drag_from = Some(Vec2::new(event.offset_x() as f32, event.offset_y() as f32));
                g.drag_travel = 0.0;
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Move with button held: orbit the camera
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                let Some(from) = g.drag_from else { return };
                let at = Vec2::new(event.offset_x() as f32, event.offset_y() as f32);
                let delta = at - from;
                g.drag_travel += delta.length();
                g.drag_from = Some(at);
                let speed = g.settings.orbit_speed;
                g.surface.camera.drag(delta * speed);
            });
            let _ = canvas
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Release: a press that barely moved is a launch click
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                if g.drag_from.take().is_some() && g.drag_travel < CLICK_SLOP {
                    g.launch_at(event.offset_x() as f32);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        {
            let Some(window) = web_sys::window() else { return };
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    " " | "Enter" => {
                        let centre = g.canvas_width / 2.0;
                        g.launch_at(centre);
                    }
                    "n" | "N" => g.next_round(),
                    "d" | "D" => g.toggle_debug(),
                    "m" | "M" => g.toggle_mute(),
                    "1" => g.guess(0),
                    "2" => g.guess(1),
                    "3" => g.guess(2),
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        let palette_len = game.borrow().coordinator.tuning().palette.len();
        for i in 0..palette_len {
            let Some(btn) = element(&format!("color-btn-{i}")) else {
                continue;
            };
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                game.borrow_mut().guess(i);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = element("next-round-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                game.borrow_mut().next_round();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(canvas: HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (width, height) = fit_canvas(&canvas);
            let mut g = game.borrow_mut();
            g.canvas_width = canvas.client_width() as f32;
            g.surface.resize(width, height);
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use brick_reveal::GameTuning;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Brick Reveal (native) starting...");
    log::info!("Native mode runs one headless round - use `trunk serve` for the web version");

    // Optional tuning JSON path and seed
    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| GameTuning::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(tuning) => tuning,
            Err(e) => {
                log::error!("Could not load tuning from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => GameTuning::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);

    headless_round(tuning, seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Launch straight down the middle and guess once the wall breaks
#[cfg(not(target_arch = "wasm32"))]
fn headless_round(tuning: brick_reveal::GameTuning, seed: u64) {
    use brick_reveal::Scoreboard;
    use brick_reveal::physics::{Simulation, World};
    use brick_reveal::scene::HeadlessSurface;
    use brick_reveal::sim::{FrameLoop, RevealCoordinator, play_round};

    let mut world = World::new(tuning.world_config());
    let mut surface = HeadlessSurface::new();
    let mut coordinator = RevealCoordinator::new(tuning, seed, &mut world, &mut surface);
    let mut frames = FrameLoop::new();
    let mut scoreboard = Scoreboard::load();

    // Always guess the first palette color
    let summary = play_round(
        &mut frames,
        &mut coordinator,
        &mut world,
        &mut surface,
        0.0,
        600,
        0,
    );

    if !summary.revealed {
        log::warn!("Wall still standing after {:.1}s of simulation", world.time());
        return;
    }
    log::info!(
        "Wall collapsed at t={:.2}s: {} bodies simulated, {} hit sounds",
        world.time(),
        world.body_count(),
        summary.hit_sounds
    );

    if let Some(outcome) = summary.outcome {
        scoreboard.record(outcome);
        let color = coordinator.state().color_index;
        log::info!(
            "Hidden color was {} ({}); guess was {:?}, streak {}",
            color,
            coordinator.tuning().palette[color].name,
            outcome,
            scoreboard.score
        );
    }
    scoreboard.save();
}
