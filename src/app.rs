use std::sync::Arc;
use std::time::Instant;

use iced::{Color, Element, Subscription, Task};
use iced_layershell::build_pattern::daemon;
use iced_layershell::reexport::NewLayerShellSettings;
use iced_layershell::settings::{LayerShellSettings, StartMode};
use iced_layershell::to_layer_message;

use crate::backend::{self, BackendClient, StatusReport};
use crate::bridge::BridgeRequest;
use crate::config::CompanionConfig;
use crate::geometry::WorkArea;
use crate::idle;
use crate::ipc;
use crate::lifecycle::ProcessLifecycleController;
use crate::renderer::{Renderer, RendererMessage};
use crate::theme::{self, ThemeColors, ThemeMode};
use crate::window::{HostWindowManager, IcedId};

const TICK_MS: u64 = 80;

/// Host state: owns the surface, the backend process and the renderer.
pub(crate) struct Companion {
    window: HostWindowManager,
    lifecycle: ProcessLifecycleController,
    renderer: Renderer,
    client: Arc<BackendClient>,
    theme_mode: ThemeMode,
    colors: ThemeColors,
    health_interval_secs: u64,
    idle_poll_secs: u64,
    last_activity: Instant,
}

#[to_layer_message(multi)]
#[derive(Debug, Clone)]
pub(crate) enum Message {
    ToggleVisibility,
    Quit,
    Capture,
    LogStatus,
    HealthPoll,
    HealthChecked(StatusReport),
    ThemeRefresh,
    Renderer(RendererMessage),
}

/// Ask the daemon for a new layer surface.
pub(crate) fn open_surface(settings: NewLayerShellSettings) -> (IcedId, Task<Message>) {
    Message::layershell_open(settings)
}

/// Start the daemon. `startup_health` is the first `/health` result, taken before
/// the event loop exists.
pub(crate) fn run(
    config: CompanionConfig,
    area: WorkArea,
    client: Arc<BackendClient>,
    startup_health: StatusReport,
) -> Result<(), iced_layershell::Error> {
    tracing::info!(
        version = env!("RIN_HUD_VERSION"),
        commit = env!("RIN_HUD_COMMIT"),
        "starting in background mode"
    );

    let settings = LayerShellSettings {
        start_mode: StartMode::Background,
        ..Default::default()
    };

    daemon(
        move || Companion::new(&config, area, Arc::clone(&client), startup_health.clone()),
        Companion::namespace,
        Companion::update,
        Companion::view,
    )
    .style(Companion::style)
    .subscription(Companion::subscription)
    .layer_settings(settings)
    .run()
}

impl Companion {
    fn new(
        config: &CompanionConfig,
        area: WorkArea,
        client: Arc<BackendClient>,
        startup_health: StatusReport,
    ) -> (Self, Task<Message>) {
        let lifecycle = ProcessLifecycleController::start(&config.backend, || startup_health);
        tracing::info!(backend = %lifecycle.status(), url = client.base_url(), "backend");

        let mut window = HostWindowManager::new(area, &config.window, config.screen.clone());
        let open = window.create_window();

        let geometry = window.geometry();
        let renderer = Renderer::new(
            Arc::clone(&client),
            config.reaction_duration(),
            config.idle_away_secs,
            geometry.width,
            config.window.height,
        );

        (
            Self {
                window,
                lifecycle,
                renderer,
                client,
                theme_mode: config.theme,
                colors: theme::resolve(config.theme),
                health_interval_secs: config.backend.health_interval_secs,
                idle_poll_secs: config.idle_poll_secs,
                last_activity: Instant::now(),
            },
            Task::batch([
                open,
                Task::done(Message::Renderer(RendererMessage::PollIdle)),
            ]),
        )
    }

    fn namespace() -> String {
        String::from("rin-hud")
    }

    /// Carry out whatever the renderer asked for since the last drain.
    fn serve_bridge(&mut self) -> Task<Message> {
        let mut tasks = Vec::new();
        for request in self.renderer.bridge().drain() {
            match request {
                BridgeRequest::SendMessage(text) => {
                    self.last_activity = Instant::now();
                    tracing::info!(chars = text.chars().count(), "renderer sent message");
                }
                BridgeRequest::ResizeWindow { width, height } => {
                    tasks.push(self.window.resize_task(width, height));
                }
                BridgeRequest::QuitApp => {
                    tasks.push(self.window.quit_task(&mut self.lifecycle));
                }
                BridgeRequest::GetSystemIdleTime => {
                    let fallback = self.last_activity.elapsed().as_secs();
                    tasks.push(Task::perform(
                        backend::off_thread(move || idle::system_idle_seconds(fallback)),
                        move |secs| {
                            Message::Renderer(RendererMessage::IdleTime(secs.unwrap_or(fallback)))
                        },
                    ));
                }
            }
        }
        Task::batch(tasks)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Renderer(msg) => {
                let task = self.renderer.update(msg).map(Message::Renderer);
                let host = self.serve_bridge();
                Task::batch([task, host])
            }
            Message::ToggleVisibility => {
                if self.window.is_open() {
                    self.window.hide()
                } else {
                    self.window.create_window()
                }
            }
            Message::Quit => self.window.quit_task(&mut self.lifecycle),
            Message::Capture => Task::perform(backend::capture(Arc::clone(&self.client)), |report| {
                Message::Renderer(RendererMessage::Captured(report))
            }),
            Message::LogStatus => {
                let now = Instant::now();
                let g = self.window.geometry();
                let reaction = self
                    .renderer
                    .reactions
                    .active(now)
                    .map(|r| (r.description.clone(), r.created_at.elapsed().as_secs()));
                tracing::info!(
                    backend = %self.lifecycle.status(),
                    owned_pids = ?self.lifecycle.owned_pids(),
                    visible = self.window.is_open(),
                    surface = ?self.window.surface_id(),
                    geometry = ?(g.x, g.y, g.width, g.height),
                    messages = self.renderer.chat.messages().len(),
                    pending = self.renderer.chat.is_pending(),
                    away = self.renderer.is_away(),
                    reaction = ?reaction,
                    reaction_left = ?self.renderer.reactions.remaining(now),
                    "status"
                );
                Task::none()
            }
            Message::HealthPoll => {
                Task::perform(backend::health(Arc::clone(&self.client)), Message::HealthChecked)
            }
            Message::HealthChecked(report) => {
                self.lifecycle.observe_health(&report);
                Task::none()
            }
            Message::ThemeRefresh => {
                if self.theme_mode == ThemeMode::Auto {
                    let was_dark = self.colors.is_dark;
                    self.colors = theme::resolve(ThemeMode::Auto);
                    if was_dark != self.colors.is_dark {
                        tracing::info!(
                            "auto theme: switched to {}",
                            if self.colors.is_dark { "dark" } else { "light" }
                        );
                    }
                }
                Task::none()
            }
            _ => Task::none(),
        }
    }

    fn view(&self, _window_id: IcedId) -> Element<'_, Message> {
        self.renderer
            .view(
                self.colors,
                self.lifecycle.status(),
                self.window.geometry().width,
                Instant::now(),
            )
            .map(Message::Renderer)
    }

    fn subscription(state: &Self) -> Subscription<Message> {
        let mut subs = vec![
            Subscription::run(ipc::socket_listener),
            Subscription::run(ipc::shutdown_signal_stream),
            Subscription::run_with(state.health_interval_secs, ipc::health_poll_stream),
            Subscription::run_with(state.idle_poll_secs, ipc::idle_poll_stream),
        ];

        if state.window.is_open() && state.renderer.is_animating(Instant::now()) {
            subs.push(Subscription::run_with(TICK_MS, ipc::tick_stream));
        }

        if state.theme_mode == ThemeMode::Auto {
            subs.push(Subscription::run(ipc::theme_refresh_stream));
        }

        Subscription::batch(subs)
    }

    fn style(&self, _theme: &iced::Theme) -> iced::theme::Style {
        iced::theme::Style {
            background_color: Color::TRANSPARENT,
            text_color: self.colors.text,
        }
    }
}
