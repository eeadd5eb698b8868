// src/dialog.rs
// Emergency dialog: a mood animation shown for a fixed time, then torn down

use log::{debug, info};
use std::time::Duration;

use crate::assets::cache::CacheKind;
use crate::exceptions::Result;
use crate::scene::engine::{Engine, Repeat, TimerId};
use crate::scene::objects::Element;
use crate::session::Session;

/// Idle, or armed with the one-shot timer that will stop the dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogTimer {
    #[default]
    Idle,
    Armed { timer: TimerId, emoji: String },
}

impl DialogTimer {
    pub fn is_armed(&self) -> bool {
        matches!(self, DialogTimer::Armed { .. })
    }

    pub fn timer(&self) -> Option<TimerId> {
        match self {
            DialogTimer::Armed { timer, .. } => Some(*timer),
            DialogTimer::Idle => None,
        }
    }
}

impl<E: Engine> Session<E> {
    /// Show `emoji` in the dialog slot and stop it after `duration`.
    /// A dialog that is already armed is stopped first.
    pub(crate) fn insert_dialog(&mut self, emoji: &str, duration: Duration) -> Result<()> {
        if self.dialog.is_armed() {
            debug!("🔁 Re-arming dialog, dropping the pending timer");
            self.stop_dialog();
        }

        if let Err(e) =
            self.set_emoji_animation(Element::EmergencyDialog, CacheKind::DialogAnim, emoji, true)
        {
            self.stop_dialog();
            return Err(e);
        }

        let period = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX).max(1);
        let timer = match self.engine.timer_create(period) {
            Ok(timer) => timer,
            Err(e) => {
                self.stop_dialog();
                return Err(e);
            }
        };
        self.engine.timer_set_repeat(timer, Repeat::Times(1));

        self.dialog = DialogTimer::Armed {
            timer,
            emoji: emoji.to_string(),
        };
        self.dialog_done.arm();
        info!("💬 Dialog '{emoji}' armed for {period} ms");
        Ok(())
    }

    /// Tear the dialog down and show the eye again. Safe when idle.
    pub(crate) fn stop_dialog(&mut self) {
        if let DialogTimer::Armed { timer, emoji } = std::mem::take(&mut self.dialog) {
            self.engine.timer_delete(timer);
            debug!("🛑 Dialog '{emoji}' stopped");
        }
        self.set_visible(Element::EmergencyDialog, false);
        self.set_visible(Element::EyeAnim, true);
        self.caches.release(CacheKind::DialogAnim);
        self.dialog_done.cancel_pending();
    }

    /// Handle a timer expiry; returns true when it was the dialog timer
    pub(crate) fn on_dialog_timer(&mut self, timer: TimerId) -> bool {
        if self.dialog.timer() != Some(timer) {
            return false;
        }
        debug!("⏰ Dialog timer expired");
        self.stop_dialog();
        true
    }
}
