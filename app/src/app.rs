//! The shuttermint application: replicated state plus transaction dispatch.

use crate::aggregation::{CommitmentAccumulator, ShareAccumulator};
use crate::config::{AppConfig, ConsensusParams};
use crate::dkg::{DkgInstance, DkgOutcome, DkgPhase, PolyEval};
use crate::error::AppError;
use crate::events::{self, Event};
use crate::nonce::{CheckTxState, NonceTracker};
use crate::registry::ConfigRegistry;
use crate::validators::{ValidatorSync, ValidatorUpdate};
use crate::voting::{ConfigVoting, EonStartVoting};
use serde::{Deserialize, Serialize};
use shutter_messages::{
    AccusationMsg, ApologyMsg, BatchConfigMsg, BatchConfigStartedMsg, CheckInMsg,
    DecryptionSignatureMsg, EonStartVoteMsg, EpochSecretKeyShareMsg, Message, PolyCommitmentMsg,
    PolyEvalMsg, PublicKeyCommitmentMsg, SignedMessage,
};
use shutter_types::{
    Address, BatchConfig, BatchState, DecryptionSignature, GenesisAppState, ValidatorPubkey,
};
use shutter_utils::StatsCounter;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub const STAT_CHECK_TX_ACCEPTED: &str = "check_tx_accepted";
pub const STAT_CHECK_TX_REJECTED: &str = "check_tx_rejected";
pub const STAT_DELIVER_TX_ACCEPTED: &str = "deliver_tx_accepted";
pub const STAT_DELIVER_TX_REJECTED: &str = "deliver_tx_rejected";
pub const STAT_COMMITS: &str = "commits";

fn new_stats() -> StatsCounter {
    StatsCounter::new(&[
        STAT_CHECK_TX_ACCEPTED,
        STAT_CHECK_TX_REJECTED,
        STAT_DELIVER_TX_ACCEPTED,
        STAT_DELIVER_TX_REJECTED,
        STAT_COMMITS,
    ])
}

/// Everything every node must agree on. Hashed at commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub chain_id: String,
    pub params: ConsensusParams,
    pub initialized: bool,
    pub last_block_height: u64,

    pub registry: ConfigRegistry,
    /// Keyed by the config index of the candidates.
    pub config_voting: BTreeMap<u64, ConfigVoting>,
    /// Keypers that confirmed a config has started, keyed by config index.
    pub started_votes: BTreeMap<u64, BTreeSet<Address>>,
    /// Keyed by the config index of the voting config.
    pub eon_start_voting: BTreeMap<u64, EonStartVoting>,

    pub eon_counter: u64,
    pub dkg: BTreeMap<u64, DkgInstance>,
    /// Highest batch index with a threshold-agreed public key.
    pub current_batch_index: u64,

    pub pubkey_commitments: BTreeMap<u64, CommitmentAccumulator>,
    pub epoch_shares: BTreeMap<(u64, u64), ShareAccumulator>,
    pub decryption_signatures: BTreeMap<u64, Vec<DecryptionSignature>>,

    pub nonces: NonceTracker,
    pub validators: ValidatorSync,
}

impl AppState {
    pub fn new(chain_id: String, params: ConsensusParams) -> Self {
        Self {
            chain_id,
            params,
            initialized: false,
            last_block_height: 0,
            registry: ConfigRegistry::new(),
            config_voting: BTreeMap::new(),
            started_votes: BTreeMap::new(),
            eon_start_voting: BTreeMap::new(),
            eon_counter: 0,
            dkg: BTreeMap::new(),
            current_batch_index: 0,
            pubkey_commitments: BTreeMap::new(),
            epoch_shares: BTreeMap::new(),
            decryption_signatures: BTreeMap::new(),
            nonces: NonceTracker::new(),
            validators: ValidatorSync::new(),
        }
    }
}

/// The state machine driven by the consensus engine.
///
/// Only [`AppState`] is replicated. The admission state and the counters are
/// node-local and rebuilt on restart.
#[derive(Debug)]
pub struct ShutterApp {
    pub(crate) state: AppState,
    pub(crate) config: AppConfig,
    pub(crate) check_tx_state: CheckTxState,
    pub(crate) stats: StatsCounter,
}

impl ShutterApp {
    pub fn new(config: AppConfig) -> Self {
        let state = AppState::new(config.chain_id.clone(), config.consensus_params());
        Self::with_state(state, config)
    }

    pub(crate) fn with_state(state: AppState, config: AppConfig) -> Self {
        let check_tx_state =
            CheckTxState::new(state.registry.all_keypers(), config.max_txs_per_block);
        Self {
            state,
            config,
            check_tx_state,
            stats: new_stats(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    pub fn chain_id(&self) -> &str {
        &self.state.chain_id
    }

    pub fn last_block_height(&self) -> u64 {
        self.state.last_block_height
    }

    pub fn current_batch_index(&self) -> u64 {
        self.state.current_batch_index
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.state.registry
    }

    pub fn dkg(&self, eon: u64) -> Option<&DkgInstance> {
        self.state.dkg.get(&eon)
    }

    pub fn eon_counter(&self) -> u64 {
        self.state.eon_counter
    }

    pub fn validators(&self) -> &ValidatorSync {
        &self.state.validators
    }

    /// The batch together with its governing config and collected signatures.
    pub fn get_batch(&self, batch_index: u64) -> BatchState {
        let mut batch = BatchState::new(
            batch_index,
            self.state.registry.config_for_batch(batch_index).clone(),
        );
        if let Some(signatures) = self.state.decryption_signatures.get(&batch_index) {
            batch.decryption_signatures = signatures.clone();
        }
        batch
    }

    // ── Genesis ────────────────────────────────────────────────────────

    /// Seed the first real config from the genesis app state.
    pub(crate) fn apply_genesis(
        &mut self,
        chain_id: String,
        genesis: &GenesisAppState,
        validators: &[ValidatorUpdate],
    ) -> Result<(), AppError> {
        if self.state.initialized {
            return Err(AppError::InvalidGenesis("chain already initialized".into()));
        }
        let keypers = genesis.keyper_addresses()?;
        let config = BatchConfig {
            keypers,
            start_batch_index: genesis.start_batch_index,
            threshold: genesis.threshold,
            config_index: 1,
            ..Default::default()
        };
        self.validate_candidate(&config)
            .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;

        let mut registry = ConfigRegistry::new();
        registry
            .add_config(config)
            .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;

        info!(
            %chain_id,
            keypers = genesis.keypers.len(),
            threshold = genesis.threshold,
            validators = validators.len(),
            "chain initialized"
        );
        self.state.registry = registry;
        self.state.chain_id = chain_id;
        self.state.validators.set_initial(validators);
        self.state.initialized = true;
        self.check_tx_state.reset(self.state.registry.all_keypers());
        Ok(())
    }

    // ── Admission and delivery ─────────────────────────────────────────

    fn authenticate(&self, tx: &SignedMessage) -> Result<Address, AppError> {
        if tx.chain_id != self.state.chain_id {
            return Err(AppError::WrongChainId {
                expected: self.state.chain_id.clone(),
                got: tx.chain_id.clone(),
            });
        }
        if self.state.params.dev_mode {
            return Ok(tx.sender());
        }
        Ok(tx.verify()?)
    }

    /// Admission check. Touches only the per-block state.
    pub(crate) fn admit(&mut self, raw: &[u8]) -> Result<(), AppError> {
        let tx = shutter_messages::decode_tx(raw)?;
        let sender = self.authenticate(&tx)?;
        self.state.nonces.check(&sender, tx.nonce)?;
        self.check_tx_state.seen().check(&sender, tx.nonce)?;
        self.check_tx_state
            .admit_for_block(sender, tx.message.kind())?;
        self.check_tx_state.mark_seen(sender, tx.nonce);
        Ok(())
    }

    /// Apply one transaction. On error the state is unchanged.
    pub(crate) fn deliver(&mut self, raw: &[u8]) -> Result<Vec<Event>, AppError> {
        let tx = shutter_messages::decode_tx(raw)?;
        let sender = self.authenticate(&tx)?;
        self.state.nonces.check(&sender, tx.nonce)?;

        let kind = tx.message.kind();
        let events = self.dispatch(sender, tx.message)?;
        self.state.nonces.mark_used(sender, tx.nonce);
        debug!(%sender, %kind, events = events.len(), "transaction applied");
        Ok(events)
    }

    fn dispatch(&mut self, sender: Address, message: Message) -> Result<Vec<Event>, AppError> {
        match message {
            Message::BatchConfig(msg) => self.handle_batch_config(sender, msg),
            Message::BatchConfigStarted(msg) => self.handle_batch_config_started(sender, msg),
            Message::CheckIn(msg) => self.handle_check_in(sender, msg),
            Message::EonStartVote(msg) => self.handle_eon_start_vote(sender, msg),
            Message::PolyEval(msg) => self.handle_poly_eval(sender, msg),
            Message::PolyCommitment(msg) => self.handle_poly_commitment(sender, msg),
            Message::Accusation(msg) => self.handle_accusation(sender, msg),
            Message::Apology(msg) => self.handle_apology(sender, msg),
            Message::PublicKeyCommitment(msg) => self.handle_public_key_commitment(sender, msg),
            Message::EpochSecretKeyShare(msg) => self.handle_epoch_secret_key_share(sender, msg),
            Message::DecryptionSignature(msg) => self.handle_decryption_signature(sender, msg),
        }
    }

    /// End the block: reset admission, hand over validator updates.
    pub(crate) fn finish_block(&mut self) -> Vec<ValidatorUpdate> {
        let updates = self.state.validators.drain_pending();
        self.state.last_block_height += 1;
        self.check_tx_state.reset(self.state.registry.all_keypers());
        if !updates.is_empty() {
            info!(
                height = self.state.last_block_height,
                updates = updates.len(),
                "handing validator updates to consensus"
            );
        }
        updates
    }

    // ── Configs ────────────────────────────────────────────────────────

    fn validate_candidate(&self, config: &BatchConfig) -> Result<(), AppError> {
        if config.keypers.is_empty() {
            return Err(AppError::InvalidConfig("no keypers".into()));
        }
        let distinct: BTreeSet<&Address> = config.keypers.iter().collect();
        if distinct.len() != config.keypers.len() {
            return Err(AppError::InvalidConfig("duplicate keyper".into()));
        }
        if config.threshold == 0 {
            return Err(AppError::InvalidConfig("threshold must be positive".into()));
        }
        if !self.state.params.dev_mode && config.threshold > config.keypers.len() as u64 {
            return Err(AppError::InvalidConfig(format!(
                "threshold {} exceeds {} keypers",
                config.threshold,
                config.keypers.len()
            )));
        }
        Ok(())
    }

    fn handle_batch_config(
        &mut self,
        sender: Address,
        msg: BatchConfigMsg,
    ) -> Result<Vec<Event>, AppError> {
        let candidate = msg.to_batch_config();
        let round = candidate.config_index;
        let decided = self
            .state
            .config_voting
            .get(&round)
            .is_some_and(|voting| voting.is_decided());

        if !decided {
            let last = self.state.registry.last();
            let expected = last.config_index + 1;
            if round != expected {
                return Err(AppError::InvalidConfigIndex { expected, got: round });
            }
            self.validate_candidate(&candidate)?;
            if candidate.start_batch_index <= last.start_batch_index {
                return Err(AppError::InvalidConfigOrder {
                    last: last.start_batch_index,
                    got: candidate.start_batch_index,
                });
            }
        }

        let electorate = round
            .checked_sub(1)
            .and_then(|index| self.state.registry.by_index(index))
            .ok_or(AppError::UnknownConfig(round.saturating_sub(1)))?;
        let mut voting = self
            .state
            .config_voting
            .get(&round)
            .cloned()
            .unwrap_or_default();
        let adopted = voting.vote(sender, candidate, electorate)?;

        let mut events = Vec::new();
        if let Some(config) = adopted {
            self.state.registry.add_config(config.clone())?;
            info!(
                config_index = config.config_index,
                start_batch_index = config.start_batch_index,
                keypers = config.keypers.len(),
                threshold = config.threshold,
                "batch config adopted"
            );
            events.push(events::batch_config(&config));
        }
        self.state.config_voting.insert(round, voting);
        Ok(events)
    }

    fn handle_batch_config_started(
        &mut self,
        sender: Address,
        msg: BatchConfigStartedMsg,
    ) -> Result<Vec<Event>, AppError> {
        let config = self
            .state
            .registry
            .by_index(msg.config_index)
            .ok_or(AppError::UnknownConfig(msg.config_index))?;
        if !config.is_keyper(&sender) {
            return Err(AppError::UnknownVoter(sender));
        }
        let already_started = config.started;
        let settled = already_started && config.validators_updated;
        let quorum = config.threshold.max(1);

        let votes = self.state.started_votes.entry(msg.config_index).or_default();
        votes.insert(sender);
        if settled || (votes.len() as u64) < quorum {
            return Ok(Vec::new());
        }

        let power = self.state.params.validator_power;
        let Some(config) = self.state.registry.by_index_mut(msg.config_index) else {
            return Err(AppError::UnknownConfig(msg.config_index));
        };
        config.started = true;
        // A started config without check-ins retries on every later vote.
        let updates = if config.validators_updated {
            Vec::new()
        } else {
            match self.state.validators.activate(config, power) {
                Some(updates) => {
                    config.validators_updated = true;
                    updates
                }
                None => Vec::new(),
            }
        };

        let mut events = Vec::new();
        if !already_started {
            info!(config_index = msg.config_index, "batch config started");
            events.push(events::batch_config_started(msg.config_index));
        }
        events.extend(updates.iter().map(events::validator_updated));
        Ok(events)
    }

    fn handle_check_in(&mut self, sender: Address, msg: CheckInMsg) -> Result<Vec<Event>, AppError> {
        let pubkey = ValidatorPubkey::new(&msg.validator_pubkey)?;
        if !self.state.registry.all_keypers().contains(&sender) {
            return Err(AppError::NotAMember(sender));
        }
        self.state.validators.check_in(sender, pubkey)?;
        debug!(%sender, %pubkey, "keyper checked in");
        Ok(vec![events::check_in(&sender, &pubkey)])
    }

    // ── Eons and DKG ───────────────────────────────────────────────────

    fn handle_eon_start_vote(
        &mut self,
        sender: Address,
        msg: EonStartVoteMsg,
    ) -> Result<Vec<Event>, AppError> {
        let active = self.state.registry.last();
        let round = active.config_index;
        let mut voting = self
            .state
            .eon_start_voting
            .get(&round)
            .cloned()
            .unwrap_or_default();

        if !voting.is_decided() {
            let min = active
                .start_batch_index
                .max(self.state.current_batch_index.saturating_add(1));
            if msg.start_batch_index < min {
                return Err(AppError::InvalidEonStart {
                    start: msg.start_batch_index,
                    min,
                });
            }
        }

        let adopted = voting.vote(sender, msg.start_batch_index, active)?;
        self.state.eon_start_voting.insert(round, voting);

        let Some(start) = adopted else {
            return Ok(Vec::new());
        };
        self.state.eon_counter += 1;
        let eon = self.state.eon_counter;
        let config = self.state.registry.config_for_batch(start).clone();
        let config_index = config.config_index;
        let instance = DkgInstance::new(eon, config, start, self.state.params.dkg_phase_length);
        self.state.dkg.insert(eon, instance);
        info!(eon, start_batch_index = start, config_index, "eon started");
        Ok(vec![events::eon_started(eon, start, config_index)])
    }

    fn dkg_mut(&mut self, eon: u64) -> Result<&mut DkgInstance, AppError> {
        self.state.dkg.get_mut(&eon).ok_or(AppError::UnknownEon(eon))
    }

    fn handle_poly_eval(&mut self, sender: Address, msg: PolyEvalMsg) -> Result<Vec<Event>, AppError> {
        let event = events::poly_eval(&sender, msg.eon, &msg.receivers, &msg.encrypted_evals);
        self.dkg_mut(msg.eon)?.submit_poly_eval(
            sender,
            PolyEval {
                receivers: msg.receivers,
                encrypted_evals: msg.encrypted_evals,
            },
        )?;
        Ok(vec![event])
    }

    fn handle_poly_commitment(
        &mut self,
        sender: Address,
        msg: PolyCommitmentMsg,
    ) -> Result<Vec<Event>, AppError> {
        let event = events::poly_commitment(&sender, msg.eon, &msg.gammas);
        self.dkg_mut(msg.eon)?
            .submit_poly_commitment(sender, msg.gammas)?;
        Ok(vec![event])
    }

    fn handle_accusation(
        &mut self,
        sender: Address,
        msg: AccusationMsg,
    ) -> Result<Vec<Event>, AppError> {
        self.dkg_mut(msg.eon)?
            .submit_accusation(sender, msg.accused, msg.evaluation)?;
        Ok(vec![events::accusation(&sender, msg.eon, &msg.accused)])
    }

    fn handle_apology(&mut self, sender: Address, msg: ApologyMsg) -> Result<Vec<Event>, AppError> {
        let mut events = vec![events::apology(&sender, msg.eon, &msg.accuser, &msg.evaluation)];
        let outcome = self
            .dkg_mut(msg.eon)?
            .submit_apology(sender, msg.accuser, msg.evaluation)?;
        if let Some(outcome) = outcome {
            events.push(outcome_event(msg.eon, outcome));
        }
        Ok(events)
    }

    /// Move the agreed batch index forward and apply DKG deadlines.
    fn advance_batch_index(&mut self, batch_index: u64) -> Result<Vec<Event>, AppError> {
        if batch_index <= self.state.current_batch_index {
            return Ok(Vec::new());
        }
        self.state.current_batch_index = batch_index;

        let mut events = Vec::new();
        for (eon, instance) in self.state.dkg.iter_mut() {
            if instance.phase().is_terminal() {
                continue;
            }
            if let Some(outcome) = instance.advance_to(batch_index)? {
                events.push(outcome_event(*eon, outcome));
            }
        }
        Ok(events)
    }

    // ── Threshold aggregation ──────────────────────────────────────────

    fn handle_public_key_commitment(
        &mut self,
        sender: Address,
        msg: PublicKeyCommitmentMsg,
    ) -> Result<Vec<Event>, AppError> {
        let config = self.state.registry.config_for_batch(msg.batch_index);
        if !config.is_keyper(&sender) {
            return Err(AppError::UnknownSender(sender));
        }
        let threshold = config.threshold;

        let agreed = self
            .state
            .pubkey_commitments
            .entry(msg.batch_index)
            .or_default()
            .submit(sender, msg.commitment, threshold);
        let Some(pubkey) = agreed else {
            return Ok(Vec::new());
        };

        info!(batch_index = msg.batch_index, "eon public key generated");
        let mut events = vec![events::pubkey_generated(msg.batch_index, &pubkey)];
        events.extend(self.advance_batch_index(msg.batch_index)?);
        Ok(events)
    }

    fn handle_epoch_secret_key_share(
        &mut self,
        sender: Address,
        msg: EpochSecretKeyShareMsg,
    ) -> Result<Vec<Event>, AppError> {
        let instance = self
            .state
            .dkg
            .get(&msg.eon)
            .ok_or(AppError::UnknownEon(msg.eon))?;
        if instance.phase() != DkgPhase::Finalized {
            return Err(AppError::EonNotFinalized(msg.eon));
        }
        if !instance.is_qualified(&sender) {
            return Err(AppError::UnknownSender(sender));
        }
        let threshold = instance.config().threshold;

        let shares = self
            .state
            .epoch_shares
            .entry((msg.eon, msg.epoch))
            .or_default()
            .submit(sender, msg.share, threshold);
        Ok(match shares {
            Some(shares) => {
                info!(eon = msg.eon, epoch = msg.epoch, shares = shares.len(), "epoch key shares complete");
                vec![events::epoch_secret_key_shares(msg.eon, msg.epoch, &shares)]
            }
            None => Vec::new(),
        })
    }

    fn handle_decryption_signature(
        &mut self,
        sender: Address,
        msg: DecryptionSignatureMsg,
    ) -> Result<Vec<Event>, AppError> {
        if !self
            .state
            .registry
            .config_for_batch(msg.batch_index)
            .is_keyper(&sender)
        {
            return Err(AppError::UnknownSender(sender));
        }
        let signatures = self
            .state
            .decryption_signatures
            .entry(msg.batch_index)
            .or_default();
        if signatures.iter().any(|s| s.sender == sender) {
            return Err(AppError::DuplicateSubmission(sender));
        }

        let event = events::decryption_signature(msg.batch_index, &sender, &msg.signature);
        signatures.push(DecryptionSignature {
            sender,
            signature: msg.signature,
        });
        Ok(vec![event])
    }
}

fn outcome_event(eon: u64, outcome: DkgOutcome) -> Event {
    match outcome {
        DkgOutcome::Finalized { qualified } => {
            info!(eon, qualified = qualified.len(), "dkg finalized");
            events::dkg_finalized(eon, &qualified)
        }
        DkgOutcome::Aborted { qualified, threshold } => {
            info!(eon, qualified = qualified.len(), threshold, "dkg aborted");
            events::dkg_aborted(eon, &qualified, threshold)
        }
    }
}
