//! Host-side ownership of the companion surface.
//!
//! Geometry lives here and nowhere else. The surface is anchored
//! bottom + left, so a plain size change already keeps the bottom edge and
//! `x` fixed; the manager only has to clamp and forward.

use iced::Task;

use crate::app::{self, Message};
use crate::config::WindowConfig;
use crate::geometry::{WindowGeometry, WorkArea};
use crate::lifecycle::ProcessLifecycleController;
use crate::surface::companion_settings;

pub(crate) type IcedId = iced_layershell::reexport::IcedId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuitOutcome {
    Exited,
    AlreadyQuit,
}

pub(crate) struct HostWindowManager {
    area: WorkArea,
    geometry: WindowGeometry,
    output: Option<String>,
    surface_id: Option<IcedId>,
    quit: bool,
}

impl HostWindowManager {
    pub(crate) fn new(area: WorkArea, window: &WindowConfig, output: Option<String>) -> Self {
        Self {
            area,
            geometry: WindowGeometry::initial(area, window),
            output,
            surface_id: None,
            quit: false,
        }
    }

    pub(crate) fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    pub(crate) fn surface_id(&self) -> Option<IcedId> {
        self.surface_id
    }

    pub(crate) fn is_open(&self) -> bool {
        self.surface_id.is_some()
    }

    /// Open the surface at the current geometry. No-op when already open or
    /// after quit.
    pub(crate) fn create_window(&mut self) -> Task<Message> {
        if self.quit || self.surface_id.is_some() {
            return Task::none();
        }
        let settings = companion_settings(self.geometry, self.area, self.output.as_deref());
        let (id, task) = app::open_surface(settings);
        self.surface_id = Some(id);
        let g = self.geometry;
        tracing::info!(
            surface = %id,
            x = g.x,
            y = g.y,
            width = g.width,
            height = g.height,
            "Hidden -> Visible"
        );
        task
    }

    /// Release the surface but keep running.
    pub(crate) fn hide(&mut self) -> Task<Message> {
        match self.surface_id.take() {
            Some(id) => {
                tracing::info!("Visible -> Hidden");
                Task::done(Message::RemoveWindow(id))
            }
            None => Task::none(),
        }
    }

    /// Clamp a requested size and record the new bounds. Returns `None`
    /// when nothing changes.
    pub(crate) fn request_resize(&mut self, width: i64, height: i64) -> Option<WindowGeometry> {
        if self.quit {
            return None;
        }
        let next = self.geometry.resized(self.area, width, height);
        if next == self.geometry {
            return None;
        }
        tracing::debug!(
            from = ?(self.geometry.width, self.geometry.height),
            to = ?(next.width, next.height),
            requested = ?(width, height),
            "resize"
        );
        self.geometry = next;
        Some(next)
    }

    /// [`request_resize`](Self::request_resize) paired with the open
    /// surface. `None` while hidden: the new bounds are kept and used by the
    /// next [`create_window`](Self::create_window).
    pub(crate) fn size_change(&mut self, width: i64, height: i64) -> Option<(IcedId, (u32, u32))> {
        let next = self.request_resize(width, height)?;
        self.surface_id.map(|id| (id, (next.width, next.height)))
    }

    /// A single compositor size update, or nothing.
    pub(crate) fn resize_task(&mut self, width: i64, height: i64) -> Task<Message> {
        match self.size_change(width, height) {
            Some((id, size)) => Task::done(Message::SizeChange { id, size }),
            None => Task::none(),
        }
    }

    /// Stop owned backend processes and mark the manager finished. Only the
    /// first call does anything.
    pub(crate) fn quit(&mut self, lifecycle: &mut ProcessLifecycleController) -> QuitOutcome {
        if self.quit {
            tracing::debug!("quit requested again, ignoring");
            return QuitOutcome::AlreadyQuit;
        }
        self.quit = true;
        let killed = lifecycle.shutdown();
        tracing::info!(killed, "quitting");
        QuitOutcome::Exited
    }

    pub(crate) fn quit_task(&mut self, lifecycle: &mut ProcessLifecycleController) -> Task<Message> {
        match self.quit(lifecycle) {
            QuitOutcome::Exited => {
                let remove = match self.surface_id.take() {
                    Some(id) => Task::done(Message::RemoveWindow(id)),
                    None => Task::none(),
                };
                Task::batch([remove, iced::exit()])
            }
            QuitOutcome::AlreadyQuit => Task::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StatusReport;
    use crate::config::BackendConfig;
    use crate::geometry::{MIN_HEIGHT, MIN_WIDTH};

    fn manager() -> HostWindowManager {
        HostWindowManager::new(WorkArea::FALLBACK, &WindowConfig::default(), None)
    }

    fn external_backend() -> ProcessLifecycleController {
        ProcessLifecycleController::start(&BackendConfig::default(), || StatusReport {
            status: "ok".into(),
            error: None,
        })
    }

    #[test]
    fn starts_bottom_right() {
        let wm = manager();
        assert_eq!(
            wm.geometry(),
            WindowGeometry {
                x: 1450,
                y: 310,
                width: 450,
                height: 750
            }
        );
        assert!(!wm.is_open());
    }

    #[test]
    fn resize_keeps_bottom_and_x() {
        let mut wm = manager();
        let before = wm.geometry();
        let g = wm.request_resize(300, 200).unwrap();
        assert_eq!(g.x, before.x);
        assert_eq!(g.bottom(), before.bottom());
        assert_eq!((g.width, g.height), (300, 200));
        assert_eq!(g.y, 1060 - 200);
    }

    #[test]
    fn same_size_is_a_no_op() {
        let mut wm = manager();
        assert_eq!(wm.request_resize(450, 750), None);
        wm.request_resize(300, 300).unwrap();
        assert_eq!(wm.request_resize(300, 300), None);
    }

    #[test]
    fn degenerate_sizes_are_clamped() {
        let mut wm = manager();
        let g = wm.request_resize(0, -50).unwrap();
        assert_eq!((g.width, g.height), (MIN_WIDTH, MIN_HEIGHT));
        assert_eq!(g.bottom(), 1060);
    }

    #[test]
    fn quit_is_idempotent() {
        let mut wm = manager();
        let mut lifecycle = external_backend();
        assert_eq!(wm.quit(&mut lifecycle), QuitOutcome::Exited);
        assert_eq!(wm.quit(&mut lifecycle), QuitOutcome::AlreadyQuit);
        // nothing moves after quit
        assert_eq!(wm.request_resize(200, 200), None);
    }

    #[test]
    fn quit_kills_spawned_backend() {
        let config = BackendConfig {
            command: Some("sleep 30".into()),
            ..BackendConfig::default()
        };
        let mut lifecycle = ProcessLifecycleController::start(&config, || StatusReport {
            status: "error".into(),
            error: Some("down".into()),
        });
        let pid = lifecycle.owned_pids()[0];
        let mut wm = manager();
        wm.quit(&mut lifecycle);
        assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
        assert!(lifecycle.owned_pids().is_empty());
    }

    #[test]
    fn open_surface_gets_one_clamped_size_change() {
        let mut wm = manager();
        let _ = wm.create_window();
        let id = wm.surface_id().unwrap();
        assert_eq!(wm.size_change(5000, 10), Some((id, (470, MIN_HEIGHT))));
        assert_eq!(wm.geometry().bottom(), 1060);
        // unchanged size sends nothing
        assert_eq!(wm.size_change(5000, 10), None);
    }

    #[test]
    fn hidden_resize_is_applied_on_reopen() {
        let mut wm = manager();
        let _ = wm.create_window();
        let _ = wm.hide();
        assert_eq!(wm.size_change(300, 400), None);
        assert_eq!((wm.geometry().width, wm.geometry().height), (300, 400));

        let _ = wm.create_window();
        assert!(wm.is_open());
        let g = wm.geometry();
        assert_eq!((g.x, g.y, g.width, g.height), (1450, 660, 300, 400));
        assert_eq!(wm.size_change(300, 400), None);
    }

    #[test]
    fn no_size_change_after_quit() {
        let mut wm = manager();
        let _ = wm.create_window();
        let mut lifecycle = external_backend();
        let _ = wm.quit_task(&mut lifecycle);
        assert_eq!(wm.size_change(300, 300), None);
        assert!(!wm.is_open());
        // the surface stays closed too
        let _ = wm.create_window();
        assert!(!wm.is_open());
    }
}
