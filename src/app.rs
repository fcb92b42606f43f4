use std::path::PathBuf;
use std::time::{Duration, Instant};

use iced::keyboard;
use iced::widget::{canvas, column, container, text};
use iced::{Element, Length, Subscription, Task, Theme};

use crate::audio::engine::CpalEngine;
use crate::audio::error::EngineError;
use crate::audio::types::EngineEvent;
use crate::config::{self, PlayerConfig};
use crate::player::{AudioPlayer, LoadCompletion, LoggingObserver, ResourceStatus};
use crate::ui::controls::{self, ControlMessage};
use crate::ui::waveform::CanvasMessage;

pub struct App {
    config: PlayerConfig,
    player: Option<AudioPlayer<CpalEngine>>,
    /// URI requested before the engine came up.
    pending_uri: Option<String>,
    filename: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Message {
    EngineReady(Result<CpalEngine, EngineError>),
    FileDialogResult(Option<PathBuf>),
    Loaded(LoadCompletion),
    Control(ControlMessage),
    Canvas(CanvasMessage),
    Frame(Instant),
    KeyEvent(keyboard::Event),
}

fn boot(initial_uri: Option<String>) -> (App, Task<Message>) {
    let config: PlayerConfig = config::load_config(&config::default_config_path());

    let app = App {
        config,
        player: None,
        pending_uri: initial_uri,
        filename: None,
        error: None,
    };

    let task = Task::perform(
        async {
            match tokio::task::spawn_blocking(CpalEngine::spawn).await {
                Ok(result) => result,
                Err(e) => Err(EngineError::Thread(e.to_string())),
            }
        },
        Message::EngineReady,
    );

    (app, task)
}

fn title(app: &App) -> String {
    match &app.filename {
        Some(name) => format!("Sample Player - {name}"),
        None => "Sample Player".to_string(),
    }
}

fn start_load(app: &mut App, uri: String) -> Task<Message> {
    app.filename = Some(
        PathBuf::from(&uri)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| uri.clone()),
    );
    app.error = None;

    match &mut app.player {
        Some(player) => Task::perform(player.load(&uri), Message::Loaded),
        None => {
            app.pending_uri = Some(uri);
            Task::none()
        }
    }
}

fn drain_engine_events(app: &mut App) {
    let Some(player) = &app.player else {
        return;
    };
    for event in player.controller().engine().drain_events() {
        match event {
            EngineEvent::PlaybackFinished => log::debug!("Engine reached end of buffer"),
            EngineEvent::StreamError(e) => {
                log::warn!("Audio stream error: {}", e);
                app.error = Some(format!("Audio stream error: {e}"));
            }
        }
    }
}

fn update(app: &mut App, message: Message) -> Task<Message> {
    match message {
        Message::EngineReady(result) => match result {
            Ok(engine) => {
                let mut player = AudioPlayer::create(engine, &app.config);
                player.add_observer(Box::new(LoggingObserver::new("player")));
                app.player = Some(player);
                match app.pending_uri.take() {
                    Some(uri) => start_load(app, uri),
                    None => Task::none(),
                }
            }
            Err(e) => {
                log::warn!("Audio engine unavailable: {}", e);
                app.error = Some(format!("Audio engine error: {e}"));
                Task::none()
            }
        },
        Message::Control(ctrl) => match ctrl {
            ControlMessage::OpenFile => Task::perform(
                async {
                    let handle = rfd::AsyncFileDialog::new()
                        .add_filter("Audio", &["mp3", "wav", "flac", "aac", "m4a"])
                        .pick_file()
                        .await;
                    handle.map(|h| h.path().to_path_buf())
                },
                Message::FileDialogResult,
            ),
            ControlMessage::PlayStop => {
                if let Some(player) = &mut app.player {
                    player.toggle();
                }
                Task::none()
            }
        },
        Message::FileDialogResult(path) => match path {
            Some(path) => start_load(app, path.to_string_lossy().to_string()),
            None => Task::none(),
        },
        Message::Loaded(completion) => {
            if let Some(player) = &mut app.player {
                if player.finish_load(completion) {
                    if let Some(ResourceStatus::Failed(e)) =
                        player.controller().resource().map(|r| &r.status)
                    {
                        app.error = Some(e.to_string());
                    }
                }
            }
            Task::none()
        }
        Message::Canvas(msg) => {
            if let Some(player) = &mut app.player {
                match msg {
                    CanvasMessage::Click(point) => player.click(point),
                    CanvasMessage::Hover(over) => player.hover(over),
                }
            }
            Task::none()
        }
        Message::Frame(now) => {
            if let Some(player) = &mut app.player {
                player.frame(now);
            }
            drain_engine_events(app);
            Task::none()
        }
        Message::KeyEvent(key_event) => {
            if let keyboard::Event::KeyPressed { key, .. } = key_event {
                if let Some(player) = &mut app.player {
                    match key.as_ref() {
                        keyboard::Key::Named(keyboard::key::Named::Space) => player.toggle(),
                        keyboard::Key::Named(keyboard::key::Named::Escape) => player.stop(),
                        _ => {}
                    }
                }
            }
            Task::none()
        }
    }
}

fn view(app: &App) -> Element<'_, Message> {
    let layout = app.config.layout;

    let (is_playing, is_ready, position, duration, status) = match &app.player {
        Some(player) => {
            let controller = player.controller();
            let duration = controller.duration();
            let status = match controller.resource().map(|r| &r.status) {
                Some(ResourceStatus::Loading) => "Loading...",
                Some(ResourceStatus::Failed(_)) => "Unavailable",
                Some(ResourceStatus::Ready(_)) => "",
                None => "Open an audio file to begin",
            };
            (
                controller.is_playing(),
                controller.is_ready(),
                controller.peek_position().unwrap_or(0.0) * duration,
                duration,
                status,
            )
        }
        None => (false, false, 0.0, 0.0, "Starting audio engine..."),
    };

    let controls = controls::view_controls(is_playing, is_ready, position, duration, status)
        .map(Message::Control);

    let mut content = column![controls].spacing(5);

    if let Some(player) = &app.player {
        let canvas_el: Element<CanvasMessage> = canvas::Canvas::new(player.view())
            .width(Length::Fixed(layout.width))
            .height(Length::Fixed(layout.height))
            .into();
        content = content.push(container(canvas_el.map(Message::Canvas)).padding(8));
    }

    if let Some(err) = &app.error {
        content = content.push(
            container(text(format!("Error: {err}")).color(iced::Color::from_rgb(1.0, 0.3, 0.3)))
                .padding(10),
        );
    }

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn subscription(app: &App) -> Subscription<Message> {
    let keys = keyboard::listen().map(Message::KeyEvent);

    let wants_frames = app.player.as_ref().is_some_and(|p| p.wants_frames());
    if !wants_frames {
        return keys;
    }

    let interval = Duration::from_millis(app.config.frame_interval_ms.max(1));
    let frames = iced::time::every(interval).map(Message::Frame);

    Subscription::batch([frames, keys])
}

fn theme(_app: &App) -> Theme {
    Theme::Dark
}

pub fn run(initial_uri: Option<String>) -> iced::Result {
    iced::application(move || boot(initial_uri.clone()), update, view)
        .title(title)
        .subscription(subscription)
        .theme(theme)
        .window_size((480.0, 200.0))
        .run()
}
