//! Audio bridge
//!
//! The simulation never mixes audio. It emits fire-and-forget sound requests
//! which the host forwards to a mixer running on its own thread through a
//! [`SoundQueue`]. The queue is the only lock shared with the simulation thread.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::Vec2;

use crate::sim::{GameEvent, ObjectId};

/// Sounds sharing a group can be stopped together
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SoundGroup {
    /// Sounds owned by one world object (ambient loops, status effects)
    Object(ObjectId),
    /// Global channels such as "playerHurt" or "pickup"
    Named(String),
}

impl SoundGroup {
    pub fn named(name: &str) -> Self {
        SoundGroup::Named(name.to_string())
    }
}

/// A single playback request
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRequest {
    /// Preset or file name understood by the mixer
    pub name: String,
    /// World position for positional sounds, `None` = plays at the listener
    pub pos: Option<Vec2>,
    pub volume: f32,
    pub pitch: f32,
    /// -1 = left, 1 = right
    pub pan: f32,
    pub group: Option<SoundGroup>,
    pub looping: bool,
    /// The mixer drops low priority sounds first when saturated
    pub priority: u8,
}

impl SoundRequest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pos: None,
            volume: 1.0,
            pitch: 1.0,
            pan: 0.0,
            group: None,
            looping: false,
            priority: 1,
        }
    }

    pub fn at(mut self, pos: Vec2) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume.max(0.0);
        self
    }

    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn pan(mut self, pan: f32) -> Self {
        self.pan = pan.clamp(-1.0, 1.0);
        self
    }

    pub fn group(mut self, group: SoundGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// What the mixer thread consumes
#[derive(Debug, Clone, PartialEq)]
pub enum SoundCommand {
    Play(SoundRequest),
    StopGroup(SoundGroup),
}

/// Lock-protected command queue shared between simulation and mixer
#[derive(Debug, Clone, Default)]
pub struct SoundQueue {
    inner: Arc<Mutex<VecDeque<SoundCommand>>>,
}

impl SoundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SoundCommand>> {
        // A panicking mixer must not take the simulation down with it
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, command: SoundCommand) {
        self.lock().push_back(command);
    }

    /// Copy every sound-related event into the queue
    pub fn forward_events<'a, I>(&self, events: I) -> usize
    where
        I: IntoIterator<Item = &'a GameEvent>,
    {
        let mut queue = self.lock();
        let before = queue.len();
        for event in events {
            match event {
                GameEvent::Sound(request) => queue.push_back(SoundCommand::Play(request.clone())),
                GameEvent::StopSoundGroup(group) => {
                    queue.push_back(SoundCommand::StopGroup(group.clone()))
                }
                _ => {}
            }
        }
        queue.len() - before
    }

    /// Take every pending command (mixer side)
    pub fn drain(&self) -> Vec<SoundCommand> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_builder_clamps() {
        let request = SoundRequest::new("hit").volume(-0.3).pan(4.0).at(Vec2::new(1.0, 2.0));
        assert_eq!(request.volume, 0.0);
        assert_eq!(request.pan, 1.0);
        assert_eq!(request.pos, Some(Vec2::new(1.0, 2.0)));
        assert!(!request.looping);
    }

    #[test]
    fn test_forward_only_sound_events() {
        let queue = SoundQueue::new();
        let events = vec![
            GameEvent::Sound(SoundRequest::new("gulp")),
            GameEvent::CameraShake(3.0),
            GameEvent::StopSoundGroup(SoundGroup::named("playerHurt")),
        ];
        assert_eq!(queue.forward_events(&events), 2);
        let drained = queue.drain();
        assert_eq!(
            drained,
            vec![
                SoundCommand::Play(SoundRequest::new("gulp")),
                SoundCommand::StopGroup(SoundGroup::named("playerHurt")),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_mixer_thread_drains_concurrently() {
        let queue = SoundQueue::new();
        let mixer_side = queue.clone();

        let mixer = thread::spawn(move || {
            let mut received = 0;
            while received < 100 {
                received += mixer_side.drain().len();
                thread::yield_now();
            }
            received
        });

        for i in 0..100 {
            queue.push(SoundCommand::Play(SoundRequest::new("step").priority((i % 3) as u8)));
        }

        assert_eq!(mixer.join().unwrap(), 100);
    }
}
