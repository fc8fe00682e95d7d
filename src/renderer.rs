//! Renderer half of the companion: chat log, reaction slot and input box.
//!
//! The renderer holds no window or process handles. Everything it needs from
//! the host goes through its [`Bridge`]; the host answers with
//! [`RendererMessage`]s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use iced::Task;

use crate::backend::{self, BackendClient, CaptureReport};
use crate::bridge::Bridge;
use crate::chat::{ChatEngine, SubmitError};
use crate::error::BackendError;
use crate::reaction::ReactionController;
use crate::spinner::Spinner;
use crate::util;

// Layout metrics (logical px) used to size the window to its content.
pub(crate) const PANEL_PADDING: u32 = 12;
pub(crate) const HEADER_HEIGHT: u32 = 36;
pub(crate) const INPUT_HEIGHT: u32 = 40;
pub(crate) const FOOTER_HEIGHT: u32 = 16;
pub(crate) const LINE_HEIGHT: u32 = 20;
pub(crate) const BUBBLE_PADDING: u32 = 8;
pub(crate) const ITEM_SPACING: u32 = 8;
pub(crate) const CHAR_WIDTH: f32 = 7.5;
/// Bubbles take at most this share of the inner width.
pub(crate) const BUBBLE_WIDTH_RATIO: f32 = 0.8;
/// Floor for the content height so an empty session is still usable.
pub(crate) const COMPACT_HEIGHT: u32 = 200;

#[derive(Debug, Clone)]
pub(crate) enum RendererMessage {
    InputChanged(String),
    Submit,
    /// Text arriving from outside the input box (control socket `say`).
    Inject(String),
    Replied {
        id: u64,
        result: Result<String, BackendError>,
    },
    ReactionExpired(u64),
    PollIdle,
    IdleTime(u64),
    Captured(CaptureReport),
    Tick,
    QuitPressed,
}

pub(crate) struct Renderer {
    pub(crate) chat: ChatEngine,
    pub(crate) reactions: ReactionController,
    pub(crate) spinner: Spinner,
    pub(crate) input: String,
    pub(crate) idle_secs: u64,
    away_after_secs: u64,
    width: u32,
    max_height: u32,
    requested: Option<(i64, i64)>,
    bridge: Bridge,
    client: Arc<BackendClient>,
}

impl Renderer {
    pub(crate) fn new(
        client: Arc<BackendClient>,
        reaction_display: Duration,
        away_after_secs: u64,
        width: u32,
        max_height: u32,
    ) -> Self {
        Self {
            chat: ChatEngine::default(),
            reactions: ReactionController::new(reaction_display),
            spinner: Spinner::default(),
            input: String::new(),
            idle_secs: 0,
            away_after_secs,
            width,
            max_height,
            requested: None,
            bridge: Bridge::default(),
            client,
        }
    }

    pub(crate) fn bridge(&mut self) -> &mut Bridge {
        &mut self.bridge
    }

    pub(crate) fn is_away(&self) -> bool {
        self.idle_secs >= self.away_after_secs
    }

    /// Something on screen is animating or counting down.
    pub(crate) fn is_animating(&self, now: Instant) -> bool {
        self.chat.is_pending() || self.reactions.active(now).is_some()
    }

    fn text_columns(&self) -> usize {
        let inner = self.width.saturating_sub(2 * PANEL_PADDING) as f32;
        let bubble = inner * BUBBLE_WIDTH_RATIO - (2 * BUBBLE_PADDING) as f32;
        ((bubble / CHAR_WIDTH).floor() as usize).max(1)
    }

    fn block_height(&self, text: &str, columns: usize) -> u32 {
        util::wrapped_line_count(text, columns) as u32 * LINE_HEIGHT + 2 * BUBBLE_PADDING
    }

    /// Size the content wants at `now`, before the host clamps it.
    pub(crate) fn content_size(&self, now: Instant) -> (i64, i64) {
        let columns = self.text_columns();
        let mut height = 2 * PANEL_PADDING + HEADER_HEIGHT + INPUT_HEIGHT + FOOTER_HEIGHT;
        if let Some(reaction) = self.reactions.active(now) {
            height += self.block_height(&reaction.description, columns) + ITEM_SPACING;
        }
        for message in self.chat.messages() {
            height += self.block_height(&message.content, columns) + ITEM_SPACING;
        }
        if self.chat.is_pending() {
            height += LINE_HEIGHT + ITEM_SPACING;
        }
        let height = height.clamp(COMPACT_HEIGHT, self.max_height.max(COMPACT_HEIGHT));
        (self.width as i64, height as i64)
    }

    /// Ask the host for a new size if the content size moved.
    fn sync_size(&mut self, now: Instant) {
        let size = self.content_size(now);
        if self.requested != Some(size) {
            self.requested = Some(size);
            self.bridge.resize_window(size.0, size.1);
        }
    }

    fn send(&mut self, text: String) -> Task<RendererMessage> {
        match self.chat.submit(&text) {
            Ok(ticket) => {
                self.bridge.send_message(ticket.text.clone());
                self.spinner.reset();
                let id = ticket.id;
                Task::perform(
                    backend::chat(Arc::clone(&self.client), ticket.text),
                    move |result| RendererMessage::Replied { id, result },
                )
            }
            Err(SubmitError::Empty) => Task::none(),
            Err(SubmitError::Busy) => {
                tracing::debug!("send ignored, reply pending");
                if self.input.is_empty() {
                    self.input = text;
                }
                Task::none()
            }
        }
    }

    fn show_reaction(&mut self, description: String, now: Instant) -> Task<RendererMessage> {
        let generation = self.reactions.show(description, now);
        let display = self.reactions.display_duration();
        Task::perform(
            backend::off_thread(move || std::thread::sleep(display)),
            move |_| RendererMessage::ReactionExpired(generation),
        )
    }

    pub(crate) fn update(&mut self, message: RendererMessage) -> Task<RendererMessage> {
        let now = Instant::now();
        let task = match message {
            RendererMessage::InputChanged(value) => {
                self.input = value;
                Task::none()
            }
            RendererMessage::Submit => {
                let text = std::mem::take(&mut self.input);
                self.send(text)
            }
            RendererMessage::Inject(text) => self.send(text),
            RendererMessage::Replied { id, result } => match self.chat.resolve(id, result) {
                Some(reply) => self.show_reaction(reply, now),
                None => Task::none(),
            },
            RendererMessage::ReactionExpired(generation) => {
                if self.reactions.expire(generation, now) {
                    tracing::debug!(generation, "reaction expired");
                }
                Task::none()
            }
            RendererMessage::PollIdle => {
                self.bridge.get_system_idle_time();
                Task::none()
            }
            RendererMessage::IdleTime(secs) => {
                let was_away = self.is_away();
                self.idle_secs = secs;
                if was_away != self.is_away() {
                    tracing::info!(idle_secs = secs, away = self.is_away(), "idle state changed");
                }
                Task::none()
            }
            RendererMessage::Captured(report) => match (report.status.as_str(), report.window) {
                ("ok", Some(title)) => {
                    self.show_reaction(format!("Looking at: {}", util::truncate_str(&title, 80)), now)
                }
                _ => {
                    tracing::warn!(error = ?report.error, "capture gave no window");
                    Task::none()
                }
            },
            RendererMessage::Tick => {
                if self.chat.is_pending() {
                    self.spinner.tick();
                }
                self.reactions.tick(now);
                Task::none()
            }
            RendererMessage::QuitPressed => {
                self.bridge.quit_app();
                Task::none()
            }
        };
        self.sync_size(now);
        task
    }
}
