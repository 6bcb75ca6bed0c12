//! Causal delivery of broadcasts.
//!
//! Inbound broadcasts and rebroadcasts wait here until everything they depend
//! on has been delivered. A message `m` stamped with `V` is deliverable when
//! `V[m.origin]` is exactly one past what we have delivered from that origin and
//! no other entry of `V` is ahead of our own clock.
//!
//! Under [`DeliveryDiscipline::HeadOfLine`] only the oldest queued message is
//! ever examined, so one stalled message holds back everything behind it.
//! [`DeliveryDiscipline::PerOrigin`] scans the whole queue instead, so a ready
//! message is never held back by a stalled one. Causal order is unaffected:
//! at most one queued message per origin can be ready at any time.
use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::error::Result;
use crate::gossip::dissemination::DeliveryHistory;
use crate::gossip::messages::{BroadcastId, Message};
use crate::gossip::ClockState;
use crate::message_error;
use crate::settings::DeliveryDiscipline;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Every dependency is satisfied
    Deliverable,
    /// Already delivered; drop it
    Duplicate,
    /// Waiting on an earlier message
    Blocked,
}

/// Outcome of draining the queue
#[derive(Debug, Default)]
pub struct PumpOutcome {
    pub delivered: Vec<Message>,
    pub discarded: usize,
}

/// Check whether `message` can be delivered against the local clock
pub fn readiness(message: &Message, clock: &ClockState, history: &DeliveryHistory) -> Readiness {
    let Some(stamp) = message.clock() else {
        return Readiness::Duplicate;
    };
    if history.already_delivered(message, clock) {
        return Readiness::Duplicate;
    }

    let origin = &message.origin;
    if stamp.get_timestamp(origin) != clock.get(origin) + 1 {
        return Readiness::Blocked;
    }
    let missing_dependency = stamp
        .entries()
        .any(|(node_id, count)| node_id != origin && count > clock.get(node_id));
    if missing_dependency {
        Readiness::Blocked
    } else {
        Readiness::Deliverable
    }
}

#[derive(Debug)]
pub struct CausalQueue {
    queue: VecDeque<Message>,
    discipline: DeliveryDiscipline,
}

impl CausalQueue {
    pub fn new(discipline: DeliveryDiscipline) -> Self {
        Self {
            queue: VecDeque::new(),
            discipline,
        }
    }

    /// Append a broadcast or rebroadcast to the back of the queue
    pub fn enqueue(&mut self, message: Message) -> Result<()> {
        if message.clock().is_none() {
            return Err(message_error!(
                "{} from {} has no vector clock",
                message.kind,
                message.origin
            ));
        }
        self.queue.push_back(message);
        Ok(())
    }

    /// True if a copy of this broadcast is already waiting
    pub fn contains(&self, id: &BroadcastId) -> bool {
        self.queue
            .iter()
            .any(|queued| queued.broadcast_id().as_ref() == Some(id))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Deliver everything that has become deliverable, in queue order.
    ///
    /// Each delivery advances `clock` for the message origin and is recorded in
    /// `history`.
    pub fn pump(&mut self, clock: &mut ClockState, history: &mut DeliveryHistory) -> PumpOutcome {
        let mut outcome = PumpOutcome::default();
        while let Some((idx, ready)) = self.next_candidate(clock, history) {
            let Some(message) = self.queue.remove(idx) else {
                break;
            };
            match ready {
                Readiness::Deliverable => {
                    if let Some(id) = message.broadcast_id() {
                        clock.observe(&id.0, id.1);
                        history.record(id);
                    }
                    trace!(
                        "[{}] Delivering {} from {}",
                        clock.node_id(),
                        message.kind,
                        message.origin
                    );
                    outcome.delivered.push(message);
                }
                Readiness::Duplicate => {
                    debug!(
                        "[{}] Discarding duplicate {} from {}",
                        clock.node_id(),
                        message.kind,
                        message.origin
                    );
                    outcome.discarded += 1;
                }
                Readiness::Blocked => {
                    self.queue.insert(idx, message);
                    break;
                }
            }
        }
        outcome
    }

    fn next_candidate(
        &self,
        clock: &ClockState,
        history: &DeliveryHistory,
    ) -> Option<(usize, Readiness)> {
        match self.discipline {
            DeliveryDiscipline::HeadOfLine => {
                let head = self.queue.front()?;
                match readiness(head, clock, history) {
                    Readiness::Blocked => None,
                    ready => Some((0, ready)),
                }
            }
            DeliveryDiscipline::PerOrigin => self
                .queue
                .iter()
                .enumerate()
                .map(|(idx, message)| (idx, readiness(message, clock, history)))
                .find(|(_, ready)| *ready != Readiness::Blocked),
        }
    }
}
