//! The renderer's only way to reach the host.
//!
//! Calls queue [`BridgeRequest`]s in an outbox that the host drains after
//! every renderer update. The enum is closed: anything not listed here
//! cannot be asked for.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    SendMessage(String),
    ResizeWindow { width: i64, height: i64 },
    QuitApp,
    GetSystemIdleTime,
}

#[derive(Debug, Default)]
pub struct Bridge {
    outbox: Vec<BridgeRequest>,
}

impl Bridge {
    /// Fire-and-forget notification of a user turn.
    pub fn send_message(&mut self, text: impl Into<String>) {
        self.outbox.push(BridgeRequest::SendMessage(text.into()));
    }

    pub fn resize_window(&mut self, width: i64, height: i64) {
        self.outbox.push(BridgeRequest::ResizeWindow { width, height });
    }

    pub fn quit_app(&mut self) {
        self.outbox.push(BridgeRequest::QuitApp);
    }

    /// The answer comes back later as a renderer message.
    pub fn get_system_idle_time(&mut self) {
        self.outbox.push(BridgeRequest::GetSystemIdleTime);
    }

    pub(crate) fn drain(&mut self) -> Vec<BridgeRequest> {
        std::mem::take(&mut self.outbox)
    }
}
