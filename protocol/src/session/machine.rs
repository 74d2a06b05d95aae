//! # The Session State Machine
//!
//! A [`SparticSession`] is the local participant's membership in one group:
//! it runs the pairwise key exchange, orders inbound and outbound blocks
//! into rounds, folds finished rounds into results, and queues everything
//! that needs to go out. It is a pure, synchronous state machine — no I/O,
//! no clocks, no suspension points. The router feeds it inbound messages by
//! method call and drains its per-peer queues onto the transport; that
//! split is what makes the protocol logic testable without a network in
//! sight.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ──► SETUP ──(last peer key arrives)──► RUNNING
//!             │                                  │
//!             │ buffers early round-0 blocks     │ rounds advance forever
//! ```
//!
//! A session has no terminal state; teardown is by drop. A session whose
//! peers go quiet simply stalls — deciding when to give up on a group is
//! the embedding application's call.
//!
//! ## Two error surfaces, never mixed
//!
//! A *peer* sending something inconsistent with our view (a second key, a
//! block for a stale round) gets an [`OutboundMessage::Error`] queued on
//! its own outbound queue and the session keeps running. The *local caller*
//! misusing the API (wrong payload size, participating twice) gets a
//! [`SessionError`] back and the session state is left untouched. Peer
//! misbehavior is data; caller misbehavior is a bug.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::BLOCK_SIZE;
use crate::crypto::{ParticipantId, SharedSecret};
use crate::keystream::{KeystreamBlock, SynchronizedKeystream};
use crate::session::round::SessionRound;
use crate::session::GroupId;

// Peer-protocol error texts. These go over the wire, so changing them is a
// compatibility decision, not a wording tweak.
pub(crate) const ERR_DUPLICATE_KEY: &str = "public key already received";
pub(crate) const ERR_UNACCEPTABLE_ROUND: &str = "block is for an unacceptable round";
pub(crate) const ERR_WRONG_SIZE: &str = "block is the wrong size";
pub(crate) const ERR_DUPLICATE_BLOCK: &str = "block is already here";

/// Errors returned to the local caller for API misuse.
///
/// None of these mutate session state, and none of them correspond to
/// anything a *peer* did — peer misbehavior is reported through the
/// outbound queues instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A group needs at least one other participant.
    #[error("cannot create a session with no other participants")]
    EmptyGroup,

    /// The given peer is not a member of this session. Inbound dispatch is
    /// the router's job; seeing this error means the router (or an
    /// embedding test) routed a message to the wrong session.
    #[error("participant is not a member of this group")]
    NotAMember,

    /// Payload handed to `participate_in_round` was not `BLOCK_SIZE` bytes.
    #[error("message is the wrong size: expected {expected} bytes, got {got}")]
    WrongMessageSize { expected: usize, got: usize },

    /// There is no current round to participate in — the key exchange has
    /// not completed yet.
    #[error("no current round: key exchange has not completed")]
    NoCurrentRound,

    /// The local participant already produced its block for this round.
    #[error("already participated in round {sequence_number}")]
    AlreadyParticipated { sequence_number: u64 },
}

/// A message waiting on a peer's outbound queue. The router stamps the
/// group id on when it serializes to the wire; inside the session, the
/// group is implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Our half of the pairwise secret for this peer. Sent once, at
    /// session creation.
    Key(SharedSecret),
    /// Our block for one round.
    Block {
        /// The round this block belongs to.
        sequence_number: u64,
        /// Keystream XOR payload, exactly `BLOCK_SIZE` bytes.
        block: KeystreamBlock,
    },
    /// A protocol complaint about something this peer sent us.
    Error(String),
}

/// Coarse lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for at least one peer's shared key. Early blocks for round 0
    /// are buffered, not rejected.
    Setup,
    /// Key exchange complete; rounds are live.
    Running,
}

/// Per-group, per-participant protocol coordinator. See the module docs.
pub struct SparticSession {
    /// Which group this session belongs to. The session itself only uses
    /// it for logging; membership and dispatch are the router's problem.
    group_id: GroupId,
    /// The other N−1 participants. `BTreeSet` gives us the stable
    /// byte-lexicographic peer order the keystream construction relies on.
    other_pubkeys: BTreeSet<ParticipantId>,
    /// The secret half we generated for each peer. Already queued for
    /// sending at construction time.
    our_shared_keys: BTreeMap<ParticipantId, SharedSecret>,
    /// The secret half each peer sends us. `None` until it arrives.
    their_shared_keys: BTreeMap<ParticipantId, Option<SharedSecret>>,
    /// Built once, when the last peer key arrives.
    keystream: Option<SynchronizedKeystream>,
    /// The round we are currently assembling. `None` during setup.
    current_round: Option<SessionRound>,
    /// Buffer for blocks that arrive one round ahead. Pipeline depth is
    /// exactly two: current and next, nothing else.
    next_round: SessionRound,
    /// Per-peer outbound FIFO. The router drains these onto the transport.
    queues: BTreeMap<ParticipantId, VecDeque<OutboundMessage>>,
    /// Completed rounds' XOR-combined output, in sequence order.
    results: VecDeque<KeystreamBlock>,
}

impl SparticSession {
    /// Create a session for a group whose *other* members are
    /// `other_pubkeys`. The local participant's own key must not be in the
    /// set; the session never needs to know it.
    ///
    /// Immediately generates one fresh secret half per peer and queues a
    /// `Key` message to each, so a freshly constructed session already has
    /// outbound traffic waiting to be drained.
    pub fn new(
        group_id: GroupId,
        other_pubkeys: BTreeSet<ParticipantId>,
    ) -> Result<Self, SessionError> {
        if other_pubkeys.is_empty() {
            return Err(SessionError::EmptyGroup);
        }

        let mut our_shared_keys = BTreeMap::new();
        let mut their_shared_keys = BTreeMap::new();
        let mut queues = BTreeMap::new();

        for peer in &other_pubkeys {
            let half = SharedSecret::generate();
            let mut queue = VecDeque::new();
            queue.push_back(OutboundMessage::Key(half.clone()));
            our_shared_keys.insert(*peer, half);
            their_shared_keys.insert(*peer, None);
            queues.insert(*peer, queue);
        }

        info!(
            group = group_id,
            peers = other_pubkeys.len(),
            "session created, key exchange started"
        );

        Ok(Self {
            group_id,
            other_pubkeys,
            our_shared_keys,
            their_shared_keys,
            keystream: None,
            current_round: None,
            next_round: SessionRound::new(0),
            queues,
            results: VecDeque::new(),
        })
    }

    /// The group this session belongs to.
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// The other members of the group, in stable order.
    pub fn other_pubkeys(&self) -> impl Iterator<Item = &ParticipantId> {
        self.other_pubkeys.iter()
    }

    /// Whether the given participant is a member of this session.
    pub fn is_member(&self, id: &ParticipantId) -> bool {
        self.other_pubkeys.contains(id)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.keystream.is_some() {
            SessionState::Running
        } else {
            SessionState::Setup
        }
    }

    /// The sequence number of the round currently accepting participation,
    /// if the key exchange has completed.
    pub fn current_sequence(&self) -> Option<u64> {
        self.current_round.as_ref().map(|r| r.sequence_number)
    }

    /// True iff there is a current round and we have not yet produced our
    /// block for it.
    pub fn ready_to_participate(&self) -> bool {
        self.current_round
            .as_ref()
            .is_some_and(|round| round.our_block.is_none())
    }

    /// Accept a peer's half of our pairwise secret.
    ///
    /// A duplicate key is a peer-protocol violation: the stored half is
    /// kept, an error is queued to that peer, and the session carries on.
    /// When the final missing half arrives, the keystream is built and
    /// round 0 opens.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAMember`] if `from` is not in this group — the
    /// router is expected to make that impossible.
    pub fn receive_key(
        &mut self,
        from: &ParticipantId,
        shared_key: SharedSecret,
    ) -> Result<(), SessionError> {
        match self.their_shared_keys.get(from) {
            None => return Err(SessionError::NotAMember),
            Some(Some(_)) => {
                warn!(
                    group = self.group_id,
                    peer = %from.log_id(),
                    "duplicate shared key from peer"
                );
                self.queue_error(from, ERR_DUPLICATE_KEY);
                return Ok(());
            }
            Some(None) => {}
        }

        self.their_shared_keys.insert(*from, Some(shared_key));
        debug!(group = self.group_id, peer = %from.log_id(), "shared key received");

        if self.their_shared_keys.values().any(|half| half.is_none()) {
            return Ok(());
        }

        // All halves are in: build the keystream. Iterate peers in stable
        // order and push both halves of each pair — ours then theirs — so
        // every pair's contribution shows up identically on both sides.
        let mut secrets = Vec::with_capacity(self.other_pubkeys.len() * 2);
        for peer in &self.other_pubkeys {
            if let (Some(ours), Some(Some(theirs))) = (
                self.our_shared_keys.get(peer),
                self.their_shared_keys.get(peer),
            ) {
                secrets.push(ours.clone());
                secrets.push(theirs.clone());
            }
        }
        self.keystream = Some(SynchronizedKeystream::new(secrets));

        info!(
            group = self.group_id,
            "key exchange complete, session running"
        );
        self.advance_round();
        Ok(())
    }

    /// Accept a block a peer produced for some round.
    ///
    /// The block lands in the current round or the next one; anything else
    /// is out-of-window and earns the peer a queued error, as do wrong-size
    /// and duplicate blocks. Valid blocks may complete the current round,
    /// which emits a result and advances the window.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAMember`] if `from` is not in this group.
    pub fn receive_block(
        &mut self,
        from: &ParticipantId,
        sequence_number: u64,
        block: Vec<u8>,
    ) -> Result<(), SessionError> {
        if !self.other_pubkeys.contains(from) {
            return Err(SessionError::NotAMember);
        }

        let in_current = self
            .current_round
            .as_ref()
            .is_some_and(|round| round.sequence_number == sequence_number);
        let in_next = self.next_round.sequence_number == sequence_number;

        if !in_current && !in_next {
            warn!(
                group = self.group_id,
                peer = %from.log_id(),
                sequence = sequence_number,
                "block outside the round window"
            );
            self.queue_error(from, ERR_UNACCEPTABLE_ROUND);
            return Ok(());
        }

        let Some(block) = KeystreamBlock::from_vec(block) else {
            warn!(
                group = self.group_id,
                peer = %from.log_id(),
                sequence = sequence_number,
                "block has the wrong size"
            );
            self.queue_error(from, ERR_WRONG_SIZE);
            return Ok(());
        };

        let round = if in_current {
            self.current_round
                .as_mut()
                .expect("in_current implies a current round")
        } else {
            &mut self.next_round
        };

        let duplicate = round.their_blocks.contains_key(from);
        if duplicate {
            warn!(
                group = self.group_id,
                peer = %from.log_id(),
                sequence = sequence_number,
                "duplicate block within a round"
            );
            self.queue_error(from, ERR_DUPLICATE_BLOCK);
            return Ok(());
        }

        round.their_blocks.insert(*from, block);
        debug!(
            group = self.group_id,
            peer = %from.log_id(),
            sequence = sequence_number,
            "block stored"
        );

        self.try_complete_round();
        Ok(())
    }

    /// Contribute the local participant's payload to the current round.
    ///
    /// `message` must be exactly `BLOCK_SIZE` bytes — pad with zeros, or
    /// pass all zeros to say nothing (an all-zero contribution is how a
    /// participant stays silent without going quiet; the block it
    /// broadcasts is still indistinguishable keystream). The payload is
    /// XORed with the round's keystream block, stored, and queued to every
    /// peer.
    ///
    /// # Errors
    ///
    /// All of these leave the session untouched:
    /// [`SessionError::WrongMessageSize`] for a bad payload length,
    /// [`SessionError::NoCurrentRound`] before the key exchange completes,
    /// [`SessionError::AlreadyParticipated`] on a second call in one round.
    pub fn participate_in_round(&mut self, message: &[u8]) -> Result<(), SessionError> {
        if message.len() != BLOCK_SIZE {
            return Err(SessionError::WrongMessageSize {
                expected: BLOCK_SIZE,
                got: message.len(),
            });
        }

        let keystream = self.keystream.as_ref().ok_or(SessionError::NoCurrentRound)?;
        let round = self
            .current_round
            .as_mut()
            .ok_or(SessionError::NoCurrentRound)?;
        if round.our_block.is_some() {
            return Err(SessionError::AlreadyParticipated {
                sequence_number: round.sequence_number,
            });
        }

        let sequence_number = round.sequence_number;
        let mut block = keystream.read_block(sequence_number);
        block.xor_bytes(message);
        round.our_block = Some(block.clone());

        debug!(
            group = self.group_id,
            sequence = sequence_number,
            "participated in round"
        );

        for queue in self.queues.values_mut() {
            queue.push_back(OutboundMessage::Block {
                sequence_number,
                block: block.clone(),
            });
        }

        self.try_complete_round();
        Ok(())
    }

    /// Pop the oldest undelivered message for one peer, FIFO.
    pub fn pop_message(&mut self, peer: &ParticipantId) -> Option<OutboundMessage> {
        self.queues.get_mut(peer)?.pop_front()
    }

    /// Pop the oldest unread round result, in sequence order.
    pub fn pop_result(&mut self) -> Option<KeystreamBlock> {
        self.results.pop_front()
    }

    /// Put a popped message back at the head of a peer's queue. The router
    /// uses this when a send fails after the pop, so per-peer FIFO order
    /// survives a dying connection.
    pub(crate) fn requeue_message(&mut self, peer: &ParticipantId, message: OutboundMessage) {
        if let Some(queue) = self.queues.get_mut(peer) {
            queue.push_front(message);
        }
    }

    /// Queue a protocol error to one peer. Infallible by design: errors
    /// about a peer's traffic go to that peer, never to the local caller.
    fn queue_error(&mut self, peer: &ParticipantId, text: &str) {
        if let Some(queue) = self.queues.get_mut(peer) {
            queue.push_back(OutboundMessage::Error(text.to_string()));
        }
    }

    /// If the current round has our block and one block from every peer,
    /// fold it into a result and advance the window.
    fn try_complete_round(&mut self) {
        let complete = self.current_round.as_ref().is_some_and(|round| {
            round.our_block.is_some() && round.their_blocks.len() == self.other_pubkeys.len()
        });
        if complete {
            self.advance_round();
        }
    }

    /// Emit the current round's result (when there is a current round) and
    /// promote `next_round` into its place.
    ///
    /// The result is the XOR of our block and every peer's block. All the
    /// keystreams cancel by construction, leaving exactly the XOR of what
    /// everyone chose to say.
    fn advance_round(&mut self) {
        if let Some(round) = self.current_round.take() {
            let mut result = round
                .our_block
                .expect("advance_round is only called on complete rounds");
            for block in round.their_blocks.values() {
                result.xor_in_place(block);
            }
            info!(
                group = self.group_id,
                sequence = round.sequence_number,
                silent = result.is_zero(),
                "round complete"
            );
            self.results.push_back(result);
        }

        let successor = self.next_round.sequence_number + 1;
        self.current_round = Some(std::mem::replace(
            &mut self.next_round,
            SessionRound::new(successor),
        ));
    }
}
