#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Animation clips keyed by `(action, direction)` pairs and per-entity state time.
//!
//! Each entity owns an [`AnimationState`] that records the action it is
//! playing and how long it has been playing it. Clips live in a shared
//! [`AnimationSet`] built once per sprite sheet. Looking up a clip never
//! mutates the state; only [`AnimationState::update`] advances time.

use std::{collections::BTreeMap, fmt, marker::PhantomData, sync::Arc};

use overworld_core::{Action, Direction, ProjectileAction};
use serde::Deserialize;
use thiserror::Error;

/// Action vocabularies that can drive an animation set.
pub trait ClipAction: Copy + Eq + fmt::Debug + 'static {
    /// Every action of the vocabulary in slot order.
    const ALL: &'static [Self];

    /// Dense slot of the action within [`ClipAction::ALL`].
    fn slot(self) -> usize;

    /// Prefix used to name frames of the action.
    fn prefix(self) -> &'static str;

    /// Reports whether the clip for the action repeats.
    fn is_looping(self) -> bool;
}

impl ClipAction for Action {
    const ALL: &'static [Self] = &Action::ALL;

    fn slot(self) -> usize {
        self as usize
    }

    fn prefix(self) -> &'static str {
        Action::prefix(self)
    }

    fn is_looping(self) -> bool {
        Action::is_looping(self)
    }
}

impl ClipAction for ProjectileAction {
    const ALL: &'static [Self] = &ProjectileAction::ALL;

    fn slot(self) -> usize {
        self as usize
    }

    fn prefix(self) -> &'static str {
        ProjectileAction::prefix(self)
    }

    fn is_looping(self) -> bool {
        ProjectileAction::is_looping(self)
    }
}

/// Failures raised while assembling animation sets.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum AnimationError {
    /// A required `(action, direction)` clip has no frames.
    #[error("sheet `{sheet}` is missing frames for `{prefix}` facing `{direction:?}`")]
    MissingClip {
        /// Sprite sheet being assembled.
        sheet: String,
        /// Prefix of the missing action.
        prefix: &'static str,
        /// Direction lacking frames.
        direction: Direction,
    },
    /// A manifest names a prefix the vocabulary does not know.
    #[error("sheet `{sheet}` declares unknown clip `{prefix}`")]
    UnknownClip {
        /// Sprite sheet being assembled.
        sheet: String,
        /// Unrecognised prefix.
        prefix: String,
    },
    /// Frame durations must be positive.
    #[error("sheet `{sheet}` has non-positive frame duration {duration}")]
    InvalidFrameDuration {
        /// Sprite sheet being assembled.
        sheet: String,
        /// Rejected duration in seconds.
        duration: f32,
    },
    /// The manifest has no entry for the sheet.
    #[error("animation manifest has no sheet named `{sheet}`")]
    MissingSheet {
        /// Requested sheet.
        sheet: String,
    },
}

/// Handle to a single sprite frame, resolved to a texture by render adapters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameKey {
    sheet: Arc<str>,
    prefix: &'static str,
    direction: Direction,
    index: u16,
}

impl FrameKey {
    /// Sprite sheet containing the frame.
    #[must_use]
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Position of the frame inside its clip.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Direction the frame depicts.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}_{}{}",
            self.sheet,
            self.prefix,
            self.direction.as_char(),
            self.index
        )
    }
}

/// Ordered frame sequence with a fixed per-frame duration.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    frames: Vec<FrameKey>,
    frame_duration: f32,
    looping: bool,
}

impl Clip {
    /// Length of a single cycle in seconds.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.frames.len() as f32 * self.frame_duration
    }

    /// Reports whether the clip repeats.
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Frames in playback order.
    #[must_use]
    pub fn frames(&self) -> &[FrameKey] {
        &self.frames
    }

    /// Frame shown after `elapsed` seconds of playback.
    #[must_use]
    pub fn frame_at(&self, elapsed: f32) -> &FrameKey {
        let step = (elapsed.max(0.0) / self.frame_duration) as usize;
        let index = if self.looping {
            step % self.frames.len()
        } else {
            step.min(self.frames.len() - 1)
        };
        &self.frames[index]
    }
}

/// Clips for one sprite sheet, indexed by `(action, direction)`.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationSet<A: ClipAction> {
    sheet: Arc<str>,
    clips: Vec<Option<Clip>>,
    _actions: PhantomData<A>,
}

impl<A: ClipAction> AnimationSet<A> {
    /// Starts assembling clips for a sheet with a shared frame duration.
    #[must_use]
    pub fn builder(sheet: &str, frame_duration: f32) -> AnimationSetBuilder<A> {
        AnimationSetBuilder {
            sheet: Arc::from(sheet),
            frame_duration,
            counts: vec![0; A::ALL.len() * Direction::ALL.len()],
            _actions: PhantomData,
        }
    }

    /// Builds a set from a manifest sheet, validating the required actions.
    pub fn from_manifest(
        manifest: &AnimationManifest,
        sheet: &str,
        required: &[A],
    ) -> Result<Self, AnimationError> {
        let entry = manifest
            .sheets
            .get(sheet)
            .ok_or_else(|| AnimationError::MissingSheet {
                sheet: sheet.to_owned(),
            })?;

        let mut builder = Self::builder(sheet, entry.frame_duration);
        for (prefix, frames) in &entry.clips {
            let action = A::ALL
                .iter()
                .copied()
                .find(|action| action.prefix() == prefix)
                .ok_or_else(|| AnimationError::UnknownClip {
                    sheet: sheet.to_owned(),
                    prefix: prefix.clone(),
                })?;
            builder = builder.clip(action, *frames);
        }
        builder.build(required)
    }

    /// Name of the sprite sheet.
    #[must_use]
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Clip for the pair, if one was provided.
    #[must_use]
    pub fn clip(&self, action: A, direction: Direction) -> Option<&Clip> {
        self.clips
            .get(slot_index::<A>(action, direction))
            .and_then(Option::as_ref)
    }
}

/// Incremental builder for [`AnimationSet`].
#[derive(Clone, Debug)]
pub struct AnimationSetBuilder<A: ClipAction> {
    sheet: Arc<str>,
    frame_duration: f32,
    counts: Vec<u16>,
    _actions: PhantomData<A>,
}

impl<A: ClipAction> AnimationSetBuilder<A> {
    /// Declares `frames` frames for the action in every direction.
    #[must_use]
    pub fn clip(mut self, action: A, frames: u16) -> Self {
        for direction in Direction::ALL {
            self.counts[slot_index::<A>(action, direction)] = frames;
        }
        self
    }

    /// Declares `frames` frames for a single `(action, direction)` pair.
    #[must_use]
    pub fn clip_for(mut self, action: A, direction: Direction, frames: u16) -> Self {
        self.counts[slot_index::<A>(action, direction)] = frames;
        self
    }

    /// Finalises the set, failing when a required clip has no frames.
    pub fn build(self, required: &[A]) -> Result<AnimationSet<A>, AnimationError> {
        if !(self.frame_duration > 0.0) {
            return Err(AnimationError::InvalidFrameDuration {
                sheet: self.sheet.to_string(),
                duration: self.frame_duration,
            });
        }

        for &action in required {
            for direction in Direction::ALL {
                if self.counts[slot_index::<A>(action, direction)] == 0 {
                    return Err(AnimationError::MissingClip {
                        sheet: self.sheet.to_string(),
                        prefix: action.prefix(),
                        direction,
                    });
                }
            }
        }

        let mut clips = Vec::with_capacity(self.counts.len());
        for &action in A::ALL {
            for direction in Direction::ALL {
                let count = self.counts[slot_index::<A>(action, direction)];
                if count == 0 {
                    clips.push(None);
                    continue;
                }
                let frames = (0..count)
                    .map(|index| FrameKey {
                        sheet: Arc::clone(&self.sheet),
                        prefix: action.prefix(),
                        direction,
                        index,
                    })
                    .collect();
                clips.push(Some(Clip {
                    frames,
                    frame_duration: self.frame_duration,
                    looping: action.is_looping(),
                }));
            }
        }

        Ok(AnimationSet {
            sheet: self.sheet,
            clips,
            _actions: PhantomData,
        })
    }
}

fn slot_index<A: ClipAction>(action: A, direction: Direction) -> usize {
    action.slot() * Direction::ALL.len() + direction.index()
}

/// Per-entity animation clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState<A: ClipAction> {
    action: A,
    elapsed: f32,
}

impl<A: ClipAction> AnimationState<A> {
    /// Starts playing `action` from the beginning.
    #[must_use]
    pub const fn new(action: A) -> Self {
        Self {
            action,
            elapsed: 0.0,
        }
    }

    /// Action currently playing.
    #[must_use]
    pub const fn action(&self) -> A {
        self.action
    }

    /// Seconds since the current action started.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Switches to `action`, restarting the clock when it differs.
    ///
    /// Returns whether the action changed.
    pub fn update_action(&mut self, action: A) -> bool {
        if action == self.action {
            return false;
        }
        self.action = action;
        self.elapsed = 0.0;
        true
    }

    /// Advances the clock.
    pub fn update(&mut self, delta: f32) {
        self.elapsed += delta;
    }

    /// Reports whether a non-looping clip has played through once.
    ///
    /// Looping clips never complete. A pair without frames counts as complete
    /// so optional actions cannot stall an entity.
    #[must_use]
    pub fn is_complete(&self, set: &AnimationSet<A>, direction: Direction) -> bool {
        match set.clip(self.action, direction) {
            Some(clip) => !clip.is_looping() && self.elapsed >= clip.duration(),
            None => !self.action.is_looping(),
        }
    }

    /// Frame to display for the current action.
    #[must_use]
    pub fn current_frame<'set>(
        &self,
        set: &'set AnimationSet<A>,
        direction: Direction,
    ) -> Option<&'set FrameKey> {
        set.clip(self.action, direction)
            .map(|clip| clip.frame_at(self.elapsed))
    }
}

/// Frame counts per sprite sheet, usually read from configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationManifest {
    /// Sheets keyed by name.
    pub sheets: BTreeMap<String, SheetManifest>,
}

/// Frame layout of a single sprite sheet.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetManifest {
    /// Seconds each frame stays on screen.
    pub frame_duration: f32,
    /// Frames per direction keyed by action prefix.
    pub clips: BTreeMap<String, u16>,
}

impl SheetManifest {
    /// Creates a sheet manifest from `(prefix, frames)` pairs.
    #[must_use]
    pub fn new(frame_duration: f32, clips: &[(&str, u16)]) -> Self {
        Self {
            frame_duration,
            clips: clips
                .iter()
                .map(|(prefix, frames)| ((*prefix).to_owned(), *frames))
                .collect(),
        }
    }
}
