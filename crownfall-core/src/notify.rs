//! Notification sink. Fire-and-forget; no delivery guarantees.

use crate::state::PlayerId;

pub trait Notifier {
    fn notify(&mut self, player: &PlayerId, message: &str);
    fn broadcast(&mut self, message: &str);
}

/// Discards everything. Default for tests and headless operation.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _player: &PlayerId, _message: &str) {}
    fn broadcast(&mut self, _message: &str) {}
}

/// Records messages for assertion in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub notifications: Vec<(PlayerId, String)>,
    pub broadcasts: Vec<String>,
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, player: &PlayerId, message: &str) {
        self.notifications.push((player.clone(), message.to_string()));
    }

    fn broadcast(&mut self, message: &str) {
        self.broadcasts.push(message.to_string());
    }
}
