//! End-to-end runs of the fishing loop against scripted screen, input and window fakes

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use image::{DynamicImage, GrayImage, Luma};
use parking_lot::Mutex;

use auto_angler::fishing::FishingLoop;
use auto_angler::input::{ActionDriver, MouseButton};
use auto_angler::log_main::EventLog;
use auto_angler::screen_reader::{Template, TemplateSet};
use auto_angler::utils::SessionState;
use auto_angler::window::WindowActivator;
use auto_angler::{
    Capturer, Collaborators, ControlError, EventLevel, FishingController, FishingState,
    LoopTimings, Region, SessionConfig, Settings, StopOutcome,
};

const BOBBER_AT: (u32, u32) = (120, 80);

fn bobber() -> GrayImage {
    GrayImage::from_fn(20, 16, |x, y| {
        Luma([((x * x * 7 + y * 13 + x * y * 3) % 251) as u8])
    })
}

fn screen_with_bobber() -> DynamicImage {
    let mut frame = GrayImage::new(200, 150);
    image::imageops::replace(&mut frame, &bobber(), BOBBER_AT.0 as i64, BOBBER_AT.1 as i64);
    DynamicImage::ImageLuma8(frame)
}

/// Full-screen captures return a fixed frame; region captures follow a script
/// of luma levels and repeat the last entry once it runs out. `None` entries
/// are capture failures.
struct Screen {
    frame: Option<DynamicImage>,
    region_levels: Mutex<VecDeque<Option<u8>>>,
    last_level: Mutex<Option<u8>>,
}

struct FakeCapturer(Arc<Screen>);

impl Capturer for FakeCapturer {
    fn capture(&self, region: Option<Region>) -> Result<DynamicImage> {
        let Some(region) = region else {
            return self.0.frame.clone().ok_or_else(|| anyhow!("no screen"));
        };

        let mut last = self.0.last_level.lock();
        if let Some(level) = self.0.region_levels.lock().pop_front() {
            *last = level;
        }
        let level = last.ok_or_else(|| anyhow!("region capture failed"))?;
        Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            region.width,
            region.height,
            Luma([level]),
        )))
    }
}

fn capturer(frame: Option<DynamicImage>, levels: &[Option<u8>]) -> FakeCapturer {
    FakeCapturer(Arc::new(Screen {
        frame,
        region_levels: Mutex::new(levels.iter().copied().collect()),
        last_level: Mutex::new(None),
    }))
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Key(String),
    Move(i32, i32),
    Click(MouseButton),
}

#[derive(Clone, Default)]
struct Recorder {
    actions: Arc<Mutex<Vec<Action>>>,
    key_times: Arc<Mutex<Vec<(String, Instant)>>>,
    failing_key: Option<String>,
    move_delay: Duration,
}

impl Recorder {
    fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    fn presses_of(&self, key: &str) -> Vec<Instant> {
        self.key_times
            .lock()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, at)| *at)
            .collect()
    }

    fn clicks(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, Action::Click(_)))
            .count()
    }
}

impl ActionDriver for Recorder {
    fn press_key(&self, key: &str) -> Result<()> {
        if self.failing_key.as_deref() == Some(key) {
            return Err(anyhow!("key {} is stuck", key));
        }
        self.actions.lock().push(Action::Key(key.to_string()));
        self.key_times.lock().push((key.to_string(), Instant::now()));
        Ok(())
    }

    fn move_cursor(&self, x: i32, y: i32, _duration: Duration) -> Result<()> {
        thread::sleep(self.move_delay);
        self.actions.lock().push(Action::Move(x, y));
        Ok(())
    }

    fn click(&self, button: MouseButton) -> Result<()> {
        self.actions.lock().push(Action::Click(button));
        Ok(())
    }
}

/// Fails the first `failures` activations, then succeeds
#[derive(Clone)]
struct FakeWindow {
    failures: usize,
    attempts: Arc<AtomicUsize>,
}

impl FakeWindow {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl WindowActivator for FakeWindow {
    fn activate(&self, _title: &str) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst) >= self.failures
    }
}

fn fast_timings() -> LoopTimings {
    LoopTimings {
        window_retry: Duration::from_millis(20),
        bait_interval: Duration::from_secs(60),
        after_bait: Duration::from_millis(5),
        after_cast: Duration::from_millis(5),
        cue_budget: Duration::from_secs(2),
        search_retry: Duration::from_millis(10),
        cursor_move: Duration::ZERO,
        watch_poll: Duration::from_millis(10),
        after_react: Duration::from_millis(5),
        cooldown: Duration::from_millis(5),
        error_backoff: Duration::from_millis(10),
        pointer_inset: 10,
    }
}

fn config(settings: Settings) -> SessionConfig {
    let templates = TemplateSet::from_templates(vec![Template {
        id: "bobber.png".to_string(),
        image: bobber(),
    }]);
    SessionConfig::with_templates(&settings, templates)
        .unwrap()
        .with_timings(fast_timings())
}

fn settings() -> Settings {
    Settings {
        cast_key: "f".to_string(),
        duration_hours: 1,
        ..Settings::default()
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_bite_is_clicked_at_bobber_corner() {
    let driver = Recorder::default();
    let mut controller = FishingController::new();
    let _events = controller
        .start(
            config(settings()),
            Collaborators {
                capturer: capturer(
                    Some(screen_with_bobber()),
                    &[Some(100), Some(100), Some(100), Some(150)],
                ),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || driver.clicks() >= 1));
    assert!(matches!(controller.stop(), StopOutcome::Stopped(_)));

    let actions = driver.actions();
    assert_eq!(
        &actions[..4],
        &[
            Action::Key("F".to_string()),
            Action::Key("SPACE".to_string()),
            Action::Move(130, 86),
            Action::Click(MouseButton::Right),
        ]
    );
    assert!(controller.status().stats.catches >= 1);
    assert_eq!(controller.status().state, FishingState::Stopped);
}

#[test]
fn test_small_change_is_ignored() {
    let driver = Recorder::default();
    let mut controller = FishingController::new();
    controller
        .start(
            config(settings()),
            Collaborators {
                capturer: capturer(Some(screen_with_bobber()), &[Some(100), Some(110)]),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        controller.status().state == FishingState::WatchingCue
    }));
    thread::sleep(Duration::from_millis(300));
    assert!(matches!(controller.stop(), StopOutcome::Stopped(_)));

    assert_eq!(driver.clicks(), 0);
    assert!(driver.actions().contains(&Action::Move(130, 86)));
}

#[test]
fn test_zero_duration_stops_without_input() {
    let mut s = settings();
    s.duration_hours = 0;
    let driver = Recorder::default();
    let window = FakeWindow::new(0);
    let shared = Arc::new(SessionState::new());

    let stats = FishingLoop::new(
        config(s),
        Collaborators {
            capturer: capturer(Some(screen_with_bobber()), &[]),
            driver: driver.clone(),
            window: window.clone(),
        },
        Arc::clone(&shared),
        EventLog::detached(),
    )
    .run();

    assert_eq!(stats.cycles, 0);
    assert!(driver.actions().is_empty());
    assert_eq!(window.attempts.load(Ordering::SeqCst), 0);
    assert_eq!(shared.state(), FishingState::Stopped);
}

#[test]
fn test_stop_while_watching_never_clicks() {
    let driver = Recorder::default();
    let mut controller = FishingController::new();
    controller
        .start(
            config(settings()),
            Collaborators {
                capturer: capturer(Some(screen_with_bobber()), &[Some(90)]),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        controller.status().state == FishingState::WatchingCue
    }));

    let started = Instant::now();
    assert!(matches!(controller.stop(), StopOutcome::Stopped(_)));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!controller.is_active());
    assert_eq!(driver.clicks(), 0);
}

#[test]
fn test_window_activation_is_retried() {
    let driver = Recorder::default();
    let window = FakeWindow::new(2);
    let mut controller = FishingController::new();
    controller
        .start(
            config(settings()),
            Collaborators {
                capturer: capturer(Some(screen_with_bobber()), &[Some(100)]),
                driver: driver.clone(),
                window: window.clone(),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        driver.actions().contains(&Action::Key("F".to_string()))
    }));
    controller.stop();

    assert_eq!(window.attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn test_missing_bobber_counts_a_miss_and_recasts() {
    let mut timings = fast_timings();
    timings.cue_budget = Duration::from_millis(100);
    let driver = Recorder::default();
    let mut controller = FishingController::new();
    controller
        .start(
            config(settings()).with_timings(timings),
            Collaborators {
                capturer: capturer(Some(DynamicImage::ImageLuma8(GrayImage::new(200, 150))), &[]),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        controller.status().stats.misses >= 1
    }));
    assert!(wait_until(Duration::from_secs(5), || {
        driver
            .actions()
            .iter()
            .filter(|a| **a == Action::Key("F".to_string()))
            .count()
            >= 2
    }));
    controller.stop();

    assert_eq!(driver.clicks(), 0);
    assert!(!driver.actions().iter().any(|a| matches!(a, Action::Move(..))));
}

#[test]
fn test_region_capture_failure_abandons_watch() {
    let driver = Recorder::default();
    let mut controller = FishingController::new();
    controller
        .start(
            config(settings()),
            Collaborators {
                capturer: capturer(Some(screen_with_bobber()), &[Some(100), None]),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        controller.status().stats.misses >= 1
    }));
    controller.stop();
    assert_eq!(driver.clicks(), 0);
}

#[test]
fn test_bait_is_used_before_first_cast() {
    let mut s = settings();
    s.bait_key = "1".to_string();
    let driver = Recorder::default();
    let mut controller = FishingController::new();
    controller
        .start(
            config(s),
            Collaborators {
                capturer: capturer(Some(screen_with_bobber()), &[Some(100)]),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || driver.actions().len() >= 2));
    controller.stop();

    let actions = driver.actions();
    assert_eq!(actions[0], Action::Key("1".to_string()));
    assert_eq!(actions[1], Action::Key("F".to_string()));
}

#[test]
fn test_cast_failure_is_reported_and_retried() {
    let driver = Recorder {
        failing_key: Some("F".to_string()),
        ..Recorder::default()
    };
    let mut controller = FishingController::new();
    let events = controller
        .start(
            config(settings()),
            Collaborators {
                capturer: capturer(Some(screen_with_bobber()), &[]),
                driver,
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        controller.status().stats.misses >= 2
    }));
    assert!(controller.is_active());
    controller.stop();

    let errors: Vec<String> = events
        .try_iter()
        .filter(|e| e.level == EventLevel::Error)
        .map(|e| e.message)
        .collect();
    assert!(errors.iter().any(|m| m.contains("cast key")));
}

#[test]
fn test_second_start_is_refused() {
    let mut controller = FishingController::new();
    let collaborators = || Collaborators {
        capturer: capturer(Some(screen_with_bobber()), &[Some(100)]),
        driver: Recorder::default(),
        window: FakeWindow::new(0),
    };

    controller.start(config(settings()), collaborators()).unwrap();
    assert!(controller.is_active());
    assert!(matches!(
        controller.start(config(settings()), collaborators()),
        Err(ControlError::AlreadyRunning)
    ));

    assert!(matches!(controller.stop(), StopOutcome::Stopped(_)));
    assert!(!controller.is_active());
    assert_eq!(controller.stop(), StopOutcome::NotRunning);

    controller.start(config(settings()), collaborators()).unwrap();
    assert!(controller.is_active());
    controller.stop();
}

#[test]
fn test_missing_baseline_still_catches_the_bite() {
    let driver = Recorder::default();
    let mut controller = FishingController::new();
    controller
        .start(
            config(settings()),
            Collaborators {
                capturer: capturer(Some(screen_with_bobber()), &[None, Some(100), Some(150)]),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        controller.status().stats.catches >= 1
    }));
    controller.stop();

    assert_eq!(controller.status().stats.misses, 0);
    assert_eq!(driver.clicks(), 1);
}

#[test]
fn test_stuck_worker_is_abandoned_and_blocks_restart() {
    let driver = Recorder {
        move_delay: Duration::from_millis(600),
        ..Recorder::default()
    };
    let mut controller = FishingController::with_grace_period(Duration::from_millis(50));
    let collaborators = |driver: Recorder| Collaborators {
        capturer: capturer(Some(screen_with_bobber()), &[Some(100)]),
        driver,
        window: FakeWindow::new(0),
    };

    controller
        .start(config(settings()), collaborators(driver.clone()))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        controller.status().state == FishingState::WatchingCue
    }));

    assert_eq!(controller.stop(), StopOutcome::Abandoned);
    assert!(controller.is_active());
    assert!(matches!(
        controller.start(config(settings()), collaborators(Recorder::default())),
        Err(ControlError::AlreadyRunning)
    ));

    // The stuck move returns, the worker sees the stop and exits on its own
    assert!(wait_until(Duration::from_secs(5), || !controller.is_active()));
    assert_eq!(driver.clicks(), 0);

    controller
        .start(config(settings()), collaborators(Recorder::default()))
        .unwrap();
    controller.stop();
}

#[test]
fn test_bait_is_reused_only_after_interval() {
    let mut s = settings();
    s.bait_key = "1".to_string();
    let mut timings = fast_timings();
    timings.bait_interval = Duration::from_millis(250);
    timings.cue_budget = Duration::from_millis(60);

    let driver = Recorder::default();
    let mut controller = FishingController::new();
    controller
        .start(
            config(s).with_timings(timings),
            Collaborators {
                capturer: capturer(Some(DynamicImage::ImageLuma8(GrayImage::new(200, 150))), &[]),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || driver.presses_of("1").len() >= 2));
    controller.stop();

    let baits = driver.presses_of("1");
    assert!(baits[1] - baits[0] >= timings.bait_interval);

    // Casts made inside the interval go out without bait
    let casts_between = driver
        .presses_of("F")
        .into_iter()
        .filter(|at| *at > baits[0] && *at < baits[1])
        .count();
    assert!(casts_between >= 2, "only {} casts between baits", casts_between);
}

#[test]
fn test_anti_idle_repeats_during_long_searches() {
    let mut session = config(settings());
    session.anti_idle_interval = (1, 1);

    let driver = Recorder::default();
    let mut controller = FishingController::new();
    controller
        .start(
            session,
            Collaborators {
                capturer: capturer(Some(DynamicImage::ImageLuma8(GrayImage::new(200, 150))), &[]),
                driver: driver.clone(),
                window: FakeWindow::new(0),
            },
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || driver.presses_of("SPACE").len() >= 2));
    controller.stop();

    let presses = driver.presses_of("SPACE");
    for pair in presses.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
}
