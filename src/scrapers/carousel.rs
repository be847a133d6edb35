//! Image-carousel traversal.
//!
//! The dealer's detail pages attach carousel images lazily: each press of
//! the "next" control can reveal photos that were not in the DOM before.
//! The walker keeps advancing until an advance reveals nothing new or the
//! step cap is reached, and returns the URLs in discovery order.

use std::collections::HashSet;
use std::thread;

use anyhow::Result;
use tracing::{debug, warn};

use crate::scrapers::types::WalkerConfig;

/// What the walker needs from a live page. The browser extractor
/// implements this on a Chrome tab; tests drive the machine with a fake.
pub trait CarouselPage {
    /// Trigger the "next" control once. `Ok(false)` means the control
    /// could not be located, which ends the walk early.
    fn advance(&mut self) -> Result<bool>;

    /// Vehicle-image URLs currently attached to the DOM, document order.
    fn visible_images(&mut self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkerState {
    Idle,
    Advancing,
    Settled,
    Done,
}

pub struct CarouselWalker {
    cfg: WalkerConfig,
}

impl CarouselWalker {
    pub fn new(cfg: WalkerConfig) -> Self {
        Self { cfg }
    }

    /// Walk the carousel and collect every image URL it reveals.
    ///
    /// Never fails: an unclickable control or a failed DOM read terminates
    /// the walk with whatever was already collected.
    pub fn collect(&self, page: &mut dyn CarouselPage) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut images = Vec::new();

        // Photos already attached before the first trigger count too.
        match page.visible_images() {
            Ok(urls) => {
                absorb(urls, &mut seen, &mut images);
            }
            Err(e) => warn!(error = %e, "could not read initial carousel images"),
        }

        let mut steps = 0usize;
        let mut state = WalkerState::Idle;

        loop {
            state = match state {
                WalkerState::Idle => WalkerState::Advancing,
                WalkerState::Advancing => match page.advance() {
                    Ok(true) => {
                        steps += 1;
                        thread::sleep(self.cfg.settle);
                        WalkerState::Settled
                    }
                    Ok(false) => {
                        debug!(steps, "carousel control not found, stopping");
                        WalkerState::Done
                    }
                    Err(e) => {
                        warn!(steps, error = %e, "carousel advance failed, stopping");
                        WalkerState::Done
                    }
                },
                WalkerState::Settled => {
                    let fresh = match page.visible_images() {
                        Ok(urls) => absorb(urls, &mut seen, &mut images),
                        Err(e) => {
                            warn!(steps, error = %e, "could not read carousel images");
                            0
                        }
                    };
                    if fresh == 0 {
                        debug!(steps, total = images.len(), "no new images, carousel exhausted");
                        WalkerState::Done
                    } else if steps >= self.cfg.max_steps {
                        debug!(steps, total = images.len(), "carousel step cap reached");
                        WalkerState::Done
                    } else {
                        WalkerState::Advancing
                    }
                }
                WalkerState::Done => break,
            };
        }

        images
    }
}

/// Fold freshly read URLs into the collection, returning how many were new.
fn absorb(urls: Vec<String>, seen: &mut HashSet<String>, images: &mut Vec<String>) -> usize {
    let mut fresh = 0;
    for url in urls {
        if seen.insert(url.clone()) {
            images.push(url);
            fresh += 1;
        }
    }
    fresh
}
