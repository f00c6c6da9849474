//! Proctor view
//!
//! The competition never renders anything itself. Every change is pushed
//! through a [`ProctorView`], which may be a browser tab behind a
//! WebSocket, a terminal, or a test recorder.

use super::{SyncMessage, UpdateMessage};

/// Receiver of everything the proctor should see
pub trait ProctorView {
    /// Sends an incremental update
    ///
    /// # Arguments
    ///
    /// * `message` - what changed
    fn send_message(&self, message: &UpdateMessage);

    /// Sends the full state of the current screen
    ///
    /// Used when a view connects or reconnects, and after every screen
    /// transition.
    ///
    /// # Arguments
    ///
    /// * `state` - the screen to show
    fn send_state(&self, state: &SyncMessage);
}
