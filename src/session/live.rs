// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Debounced sync of hand-edited source.
//!
//! Keystrokes only record the latest text; it is handed out once the editor has been quiet for
//! the debounce period. Timing uses `tokio::time` so paused-clock tests can drive it.

use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct LiveSync {
    debounce: Duration,
    enabled: bool,
    pending: Option<(String, Instant)>,
}

impl Default for LiveSync {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, true)
    }
}

impl LiveSync {
    pub fn new(debounce: Duration, enabled: bool) -> Self {
        Self { debounce, enabled, pending: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record an edit. Restarts the quiet period.
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some((text.into(), now));
    }

    /// When the pending text becomes due, if auto sync is on.
    pub fn deadline(&self) -> Option<Instant> {
        if !self.enabled {
            return None;
        }
        self.pending.as_ref().map(|(_, at)| *at + self.debounce)
    }

    /// Hand out the pending text if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.pending.take().map(|(text, _)| text)
    }

    /// Hand out the pending text immediately (manual sync).
    pub fn flush(&mut self) -> Option<String> {
        self.pending.take().map(|(text, _)| text)
    }

    /// Sleep until the pending text is due and return it.
    ///
    /// Returns `None` right away when nothing is pending or auto sync is off.
    pub async fn ready(&mut self) -> Option<String> {
        loop {
            let deadline = self.deadline()?;
            tokio::time::sleep_until(deadline).await;
            if let Some(text) = self.poll(Instant::now()) {
                return Some(text);
            }
        }
    }

    pub fn discard(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::LiveSync;

    #[tokio::test(start_paused = true)]
    async fn quiet_period_restarts_on_every_edit() {
        let mut live = LiveSync::new(Duration::from_millis(500), true);
        let start = Instant::now();
        live.edit("flowchart TD\n  A", start);
        tokio::time::advance(Duration::from_millis(300)).await;
        live.edit("flowchart TD\n  A --> B", Instant::now());
        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(live.poll(Instant::now()), None);

        let text = live.ready().await.expect("due");
        assert_eq!(text, "flowchart TD\n  A --> B");
        assert!(Instant::now() >= start + Duration::from_millis(800));
        assert!(!live.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_auto_sync_waits_for_manual_flush() {
        let mut live = LiveSync::new(Duration::from_millis(500), false);
        live.edit("flowchart LR\n  X", Instant::now());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(live.poll(Instant::now()), None);
        assert_eq!(live.ready().await, None);
        assert_eq!(live.flush().as_deref(), Some("flowchart LR\n  X"));
    }
}
