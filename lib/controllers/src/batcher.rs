// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Collects items into batches bounded by an idle window and a max window.
//!
//! A batch starts with the first item and closes when no new item arrives
//! for `idle`, or `max` after the batch started, whichever comes first.
//! This keeps a planning cycle from firing once per pending pod during a
//! burst of submissions.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};

pub struct Batcher<T> {
    rx: mpsc::UnboundedReceiver<T>,
    idle: Duration,
    max: Duration,
}

impl<T> Batcher<T> {
    pub fn channel(idle: Duration, max: Duration) -> (mpsc::UnboundedSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx, idle, max })
    }

    /// Wait for the next batch. Returns an empty batch only when every
    /// sender is gone.
    pub async fn next_batch(&mut self) -> Vec<T> {
        let Some(first) = self.rx.recv().await else {
            return Vec::new();
        };
        let mut batch = vec![first];
        let deadline = Instant::now() + self.max;

        loop {
            tokio::select! {
                item = self.rx.recv() => match item {
                    Some(item) => batch.push(item),
                    None => break,
                },
                _ = sleep(self.idle) => break,
                _ = sleep_until(deadline) => break,
            }
        }
        batch
    }
}
