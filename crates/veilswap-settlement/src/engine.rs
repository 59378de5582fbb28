//! The assembled VeilSwap engine.
//!
//! One façade over the auction plane (commitments, reveals, sequencing)
//! and the settlement plane (pools, batch execution, payouts, treasury).
//! Every state-mutating call follows the same shape:
//!
//! 1. Sample the clock once; the whole call reasons from that sample.
//! 2. Check authorization where the operation demands it.
//! 3. Act, leaving no partial state behind on error.
//! 4. Append the operation to the journal, after success only.
//!
//! Payouts are pull-based: fills, refunds, and slash shares accumulate in
//! a [`PayoutLedger`] until the owner claims them. Slash cuts and
//! priority bids accumulate as auction proceeds until an admin forwards
//! them to the fee sink.

use std::collections::BTreeMap;

use tracing::info;
use veilswap_types::constants::{NATIVE_ASSET, PRECISION};
use veilswap_types::{
    AccountId, Batch, BatchId, BatchSwapResult, Clock, ClockSample, Commitment, CommitmentId,
    CommitmentStatus, EngineConfig, OrderOutcome, OrderReveal, Phase, PoolId, Result,
    RevealedOrder, SettlementReport, SkipReason, Token, VeilswapError,
};

use veilswap_amm::{Pool, PoolInfo, PoolManager, SwapReceipt, math};
use veilswap_auction::{
    BatchManager, CommitmentStore, OrderSequencer, PhaseOracle, RevealOutcome, RevealValidator,
    SlashReceipt,
};

use crate::authorization::{AuthTable, Role};
use crate::executor::{self, ExecutionPass};
use crate::journal::{EngineOp, Journal};
use crate::payouts::PayoutLedger;
use crate::treasury::{FeeSink, InMemoryTreasury};

/// Results of standalone per-pool execution passes, held until
/// `settle_batch` folds them into the batch's final report.
#[derive(Debug, Default)]
struct ParkedExecution {
    pool_results: BTreeMap<PoolId, BatchSwapResult>,
    outcomes: BTreeMap<usize, OrderOutcome>,
}

/// The complete engine: auction state machine plus AMM settlement.
pub struct AuctionEngine {
    config: EngineConfig,
    clock: Clock,
    auth: AuthTable,
    batches: BatchManager,
    commitments: CommitmentStore,
    phase_oracle: PhaseOracle,
    validator: RevealValidator,
    sequencer: OrderSequencer,
    pools: PoolManager,
    payouts: PayoutLedger,
    sink: Box<dyn FeeSink>,
    /// Slash cuts and consumed priority bids awaiting forwarding.
    auction_proceeds: u128,
    parked: BTreeMap<BatchId, ParkedExecution>,
    reports: BTreeMap<BatchId, SettlementReport>,
    journal: Option<Journal>,
}

impl AuctionEngine {
    // =================================================================
    // Construction and recovery
    // =================================================================

    /// Build a fresh engine with an in-memory treasury.
    ///
    /// `admin` seeds the authorization table and holds both roles.
    ///
    /// # Errors
    /// Invalid configuration, or a journal path that already holds
    /// records (use [`AuctionEngine::recover`] for those).
    pub fn new(config: EngineConfig, clock: Clock, admin: AccountId) -> Result<Self> {
        Self::with_sink(config, clock, admin, Box::new(InMemoryTreasury::default()))
    }

    /// Build a fresh engine forwarding fees and proceeds into `sink`.
    ///
    /// # Errors
    /// Same conditions as [`AuctionEngine::new`].
    pub fn with_sink(
        config: EngineConfig,
        clock: Clock,
        admin: AccountId,
        sink: Box<dyn FeeSink>,
    ) -> Result<Self> {
        config.validate()?;
        let journal = match &config.journal_path {
            Some(path) => {
                let journal = Journal::open(path)?;
                if journal.next_seq() > 1 {
                    return Err(VeilswapError::Internal(format!(
                        "journal {path} already holds records; use AuctionEngine::recover"
                    )));
                }
                Some(journal)
            }
            None => None,
        };

        let genesis = clock.sample();
        let mut engine = Self::assemble(config, clock, admin, sink, genesis);
        engine.journal = journal;
        engine.record(genesis, EngineOp::EngineInit { admin })?;
        info!(admin = %admin, batch_id = %engine.batches.current_id(), "Engine started");
        Ok(engine)
    }

    /// Rebuild an engine from its journal.
    ///
    /// Replays every record against a fresh engine, overriding the clock
    /// with each record's stored sample so phase boundaries and guard
    /// windows resolve exactly as they did originally. Deterministic ids
    /// make the rebuilt state identical to the pre-crash state. The
    /// treasury is rebuilt in memory; journaling resumes at the next
    /// sequence number under the caller's `clock`.
    ///
    /// # Errors
    /// A missing journal path, a journal that does not start with the
    /// initialization record, corruption, or any replayed operation
    /// failing (which means the journal and the code disagree).
    pub fn recover(config: EngineConfig, clock: Clock) -> Result<Self> {
        config.validate()?;
        let Some(path) = config.journal_path.clone() else {
            return Err(VeilswapError::Internal(
                "recovery requires a journal path".into(),
            ));
        };

        let mut records = Journal::replay(&path)?.into_iter();
        let Some(first) = records.next() else {
            return Err(VeilswapError::Internal(format!(
                "journal {path} is empty; use AuctionEngine::new"
            )));
        };
        let EngineOp::EngineInit { admin } = first.op else {
            return Err(VeilswapError::Internal(format!(
                "journal {path} does not begin with an initialization record"
            )));
        };

        let genesis = ClockSample {
            now: first.at,
            block: first.block,
        };
        let mut engine = Self::assemble(
            config,
            Clock::Manual {
                now: first.at,
                block: first.block,
            },
            admin,
            Box::new(InMemoryTreasury::default()),
            genesis,
        );

        let mut replayed = 0u64;
        for record in records {
            engine.clock = Clock::Manual {
                now: record.at,
                block: record.block,
            };
            engine.apply(record.op).map_err(|err| {
                VeilswapError::Internal(format!("journal replay diverged at seq {}: {err}", record.seq))
            })?;
            replayed = record.seq;
        }

        engine.clock = clock;
        engine.journal = Some(Journal::open(&path)?);
        info!(records = replayed, batch_id = %engine.batches.current_id(), "Engine recovered");
        Ok(engine)
    }

    fn assemble(
        config: EngineConfig,
        clock: Clock,
        admin: AccountId,
        sink: Box<dyn FeeSink>,
        genesis: ClockSample,
    ) -> Self {
        Self {
            batches: BatchManager::new(genesis.now),
            commitments: CommitmentStore::new(config.auction.clone()),
            phase_oracle: PhaseOracle::new(config.schedule.clone()),
            validator: RevealValidator::new(&config.auction),
            sequencer: OrderSequencer::new(),
            pools: PoolManager::new(config.fees.clone(), config.guards.clone()),
            auth: AuthTable::new(admin),
            payouts: PayoutLedger::default(),
            sink,
            auction_proceeds: 0,
            parked: BTreeMap::new(),
            reports: BTreeMap::new(),
            journal: None,
            config,
            clock,
        }
    }

    fn record(&mut self, sample: ClockSample, op: EngineOp) -> Result<()> {
        if let Some(journal) = self.journal.as_mut() {
            journal.append(sample.now, sample.block, op)?;
        }
        Ok(())
    }

    /// Re-run one journaled operation during recovery.
    fn apply(&mut self, op: EngineOp) -> Result<()> {
        match op {
            EngineOp::EngineInit { .. } => Err(VeilswapError::Internal(
                "unexpected mid-journal initialization record".into(),
            )),
            EngineOp::Commit {
                caller,
                commit_hash,
                deposit,
            } => self.commit(caller, commit_hash, deposit).map(drop),
            EngineOp::Reveal {
                caller,
                commitment_id,
                order,
                priority_bid,
                paid_value,
            } => self
                .reveal(caller, commitment_id, order, priority_bid, paid_value)
                .map(drop),
            EngineOp::AdvancePhase { caller } => self.advance_phase(caller).map(drop),
            EngineOp::SlashUnrevealed {
                caller,
                commitment_id,
            } => self.slash_unrevealed(caller, commitment_id).map(drop),
            EngineOp::ExecuteBatchSwap {
                caller,
                pool_id,
                batch_id,
            } => self.execute_batch_swap(caller, pool_id, batch_id).map(drop),
            EngineOp::SettleBatch { caller, batch_id } => {
                self.settle_batch(caller, batch_id).map(drop)
            }
            EngineOp::CreatePool {
                caller,
                token_a,
                token_b,
                amount_a,
                amount_b,
                fee_rate_bps,
            } => self
                .create_pool(caller, &token_a, &token_b, amount_a, amount_b, fee_rate_bps)
                .map(drop),
            EngineOp::AddLiquidity {
                caller,
                pool_id,
                amount0,
                amount1,
            } => self.add_liquidity(caller, pool_id, amount0, amount1).map(drop),
            EngineOp::RemoveLiquidity {
                caller,
                pool_id,
                shares,
            } => self.remove_liquidity(caller, pool_id, shares).map(drop),
            EngineOp::Swap {
                caller,
                token_in,
                token_out,
                amount_in,
                min_amount_out,
            } => self
                .swap(caller, &token_in, &token_out, amount_in, min_amount_out)
                .map(drop),
            EngineOp::RecordExternalDeposit {
                pool_id,
                token,
                amount,
            } => self.record_external_deposit(pool_id, &token, amount),
            EngineOp::SyncReserves { caller, pool_id } => {
                self.sync_reserves(caller, pool_id).map(drop)
            }
            EngineOp::CollectFees { caller, token } => self.collect_fees(caller, &token).map(drop),
            EngineOp::ForwardProceeds { caller } => {
                self.forward_auction_proceeds(caller).map(drop)
            }
            EngineOp::ClaimNative { caller } => self.claim_native(caller).map(drop),
            EngineOp::ClaimToken { caller, token } => self.claim_token(caller, token).map(drop),
            EngineOp::SetFlashLoanProtection { caller, enabled } => {
                self.set_flash_loan_protection(caller, enabled)
            }
            EngineOp::SetTwapValidation { caller, enabled } => {
                self.set_twap_validation(caller, enabled)
            }
            EngineOp::SetPoolMaxTradeSize {
                caller,
                pool_id,
                max_bps,
            } => self.set_pool_max_trade_size(caller, pool_id, max_bps),
            EngineOp::SetProtocolFeeShare { caller, share_bps } => {
                self.set_protocol_fee_share(caller, share_bps)
            }
            EngineOp::GrantRole {
                caller,
                account,
                role,
            } => self.grant_role(caller, account, role),
            EngineOp::RevokeRole {
                caller,
                account,
                role,
            } => self.revoke_role(caller, account, role),
        }
    }

    // =================================================================
    // Auction plane
    // =================================================================

    /// Accept a sealed order into the open batch.
    ///
    /// The hash binds trader, tokens, amounts, and a blinding secret; the
    /// deposit is held until reveal or slash. Priority bids are declared
    /// at reveal, never here, so the hash leaks nothing about ordering
    /// intent either.
    ///
    /// # Errors
    /// `WrongPhase` outside COMMIT, `InsufficientDeposit`, or `BatchFull`.
    pub fn commit(
        &mut self,
        caller: AccountId,
        commit_hash: [u8; 32],
        deposit: u128,
    ) -> Result<CommitmentId> {
        let sample = self.clock.sample();
        let phase = self.phase_oracle.phase(self.batches.current(), sample.now);
        let id = self.commitments.commit(
            self.batches.current_mut(),
            phase,
            caller,
            commit_hash,
            deposit,
            sample.now,
        )?;
        self.record(
            sample,
            EngineOp::Commit {
                caller,
                commit_hash,
                deposit,
            },
        )?;
        Ok(id)
    }

    /// Reveal a commitment's order, declare its priority bid, and pay it.
    ///
    /// `paid_value` must cover `priority_bid`; the excess comes back as a
    /// payout. On a verified reveal the deposit is refunded in full and
    /// the bid joins the auction proceeds. On a hash mismatch the deposit
    /// is slashed, the attached value returned untouched, and the call
    /// still succeeds — a mismatch is the trader's fault resolved locally,
    /// not a failure of the engine.
    ///
    /// # Errors
    /// `WrongPhase`/`RevealTooLate`, `CommitmentNotFound`,
    /// `CommitmentNotPending`, `NotCommitter`, or
    /// `InsufficientPriorityBid`.
    pub fn reveal(
        &mut self,
        caller: AccountId,
        commitment_id: CommitmentId,
        order: OrderReveal,
        priority_bid: u128,
        paid_value: u128,
    ) -> Result<RevealOutcome> {
        let sample = self.clock.sample();
        let phase = self.phase_oracle.phase(self.batches.current(), sample.now);
        let outcome = self.validator.reveal(
            &mut self.commitments,
            self.batches.current_mut(),
            phase,
            commitment_id,
            caller,
            order.clone(),
            priority_bid,
            paid_value,
        )?;

        match outcome {
            RevealOutcome::Verified {
                deposit_refund,
                excess_returned,
            } => {
                let refund = deposit_refund.checked_add(excess_returned).ok_or(
                    VeilswapError::MathOverflow {
                        context: "reveal refund",
                    },
                )?;
                self.accrue_proceeds(priority_bid)?;
                self.payouts.credit_native(caller, refund)?;
            }
            RevealOutcome::Mismatched {
                treasury_cut,
                trader_refund,
                value_returned,
            } => {
                let refund =
                    trader_refund
                        .checked_add(value_returned)
                        .ok_or(VeilswapError::MathOverflow {
                            context: "slash refund",
                        })?;
                self.accrue_proceeds(treasury_cut)?;
                self.payouts.credit_native(caller, refund)?;
            }
        }

        self.record(
            sample,
            EngineOp::Reveal {
                caller,
                commitment_id,
                order,
                priority_bid,
                paid_value,
            },
        )?;
        Ok(outcome)
    }

    /// Reconcile the open batch's stored phase with the clock.
    ///
    /// Permissionless: the authoritative phase is always derived from
    /// elapsed time, so this only refreshes the mirror that observers
    /// read. Returns the derived phase either way.
    pub fn advance_phase(&mut self, caller: AccountId) -> Result<Phase> {
        let sample = self.clock.sample();
        let phase = self.phase_oracle.phase(self.batches.current(), sample.now);
        let batch = self.batches.current_mut();
        if batch.phase != phase {
            info!(batch_id = %batch.id, from = %batch.phase, to = %phase, "Phase advanced");
            batch.phase = phase;
            self.record(sample, EngineOp::AdvancePhase { caller })?;
        }
        Ok(phase)
    }

    /// Slash a commitment that never revealed.
    ///
    /// Permissionless and time-gated: callable by anyone once the
    /// commitment's batch has left its REVEAL window, including long
    /// after the batch settled. Half the deposit joins the auction
    /// proceeds; the rest is credited back to the committer.
    ///
    /// # Errors
    /// `SlashTooEarly` while the reveal window is open,
    /// `CommitmentNotFound`, or `CommitmentNotPending` once resolved.
    pub fn slash_unrevealed(
        &mut self,
        caller: AccountId,
        commitment_id: CommitmentId,
    ) -> Result<SlashReceipt> {
        let sample = self.clock.sample();
        let (batch_id, trader) = {
            let commitment = self.commitments.get(commitment_id)?;
            (commitment.batch_id, commitment.trader)
        };
        let batch = self.batches.get(batch_id)?;
        let phase = self.phase_oracle.phase(batch, sample.now);
        let receipt =
            self.validator
                .slash_unrevealed(&mut self.commitments, batch, phase, commitment_id)?;

        self.accrue_proceeds(receipt.treasury_cut)?;
        self.payouts.credit_native(trader, receipt.trader_refund)?;
        self.record(
            sample,
            EngineOp::SlashUnrevealed {
                caller,
                commitment_id,
            },
        )?;
        Ok(receipt)
    }

    // =================================================================
    // Settlement
    // =================================================================

    /// The batch's fixed execution order, deriving it first if needed.
    ///
    /// For the open batch this fixes the order on first call once the
    /// batch reaches SETTLING. Historical batches return the order they
    /// settled under. Derivation is deterministic from batch contents, so
    /// it needs no journal record.
    ///
    /// # Errors
    /// `BatchNotFound`, or `WrongPhase` for an open batch still taking
    /// commitments or reveals.
    pub fn execution_order(&mut self, batch_id: BatchId) -> Result<Vec<usize>> {
        if batch_id == self.batches.current_id() {
            let sample = self.clock.sample();
            let phase = self.phase_oracle.phase(self.batches.current(), sample.now);
            self.sequencer.sequence(self.batches.current_mut(), phase)
        } else {
            let batch = self.batches.get(batch_id)?;
            batch.execution_order.clone().ok_or_else(|| {
                VeilswapError::Internal(format!(
                    "batch {batch_id} was archived without a fixed execution order"
                ))
            })
        }
    }

    /// Execute the open batch's remaining orders against one pool.
    ///
    /// A standalone slice of settlement: consumes every still-revealed
    /// order routed to `pool_id`, in the batch's fixed execution order,
    /// and parks the results until [`AuctionEngine::settle_batch`] folds
    /// them into the final report. The pass is all-or-nothing — it runs
    /// against a staged copy of the pool and commits only on success.
    ///
    /// # Errors
    /// `NotAuthorized` for non-settlers, `WrongPhase` before SETTLING,
    /// `BatchAlreadySettled`/`BatchNotFound` for past or unknown batches,
    /// `PoolNotFound`, or any guard rejection from the pass.
    pub fn execute_batch_swap(
        &mut self,
        caller: AccountId,
        pool_id: PoolId,
        batch_id: BatchId,
    ) -> Result<BatchSwapResult> {
        let sample = self.clock.sample();
        self.auth.require_settler(caller, "execute a batch swap")?;
        if batch_id != self.batches.current_id() {
            let batch = self.batches.get(batch_id)?;
            return Err(VeilswapError::BatchAlreadySettled(batch.id));
        }

        let phase = self.phase_oracle.phase(self.batches.current(), sample.now);
        let exec = self.sequencer.sequence(self.batches.current_mut(), phase)?;
        let orders = self.batches.current().revealed_orders.clone();

        let mut slice: Vec<(usize, &RevealedOrder)> = Vec::new();
        for (position, &idx) in exec.iter().enumerate() {
            let order = &orders[idx];
            if PoolManager::pool_id_for(&order.token_in, &order.token_out) != pool_id {
                continue;
            }
            if self.commitments.get(order.commitment_id)?.status != CommitmentStatus::Revealed {
                continue;
            }
            slice.push((position, order));
        }

        let mut staged = self.pools.pool(pool_id)?.clone();
        let pass = executor::execute_pool_orders(
            &mut staged,
            &slice,
            self.pools.fee_config(),
            self.pools.guard_config(),
            sample.block,
        )?;

        self.pools.replace(staged);
        self.consume_outcomes(&pass.outcomes)?;
        if !pass.outcomes.is_empty() {
            let parked = self.parked.entry(batch_id).or_default();
            parked.pool_results.insert(pool_id, pass.result);
            for (position, outcome) in &pass.outcomes {
                parked.outcomes.insert(*position, outcome.clone());
            }
        }

        self.record(
            sample,
            EngineOp::ExecuteBatchSwap {
                caller,
                pool_id,
                batch_id,
            },
        )?;
        info!(
            batch_id = %batch_id,
            pool_id = %pool_id,
            orders = pass.outcomes.len(),
            clearing_price = pass.result.clearing_price,
            "Batch swap executed"
        );
        Ok(pass.result)
    }

    /// Settle the open batch: execute every remaining order, produce the
    /// clearing report, and open the next batch.
    ///
    /// ## Order of operations
    ///
    /// 1. Fix the execution order (idempotent if already fixed).
    /// 2. Group still-revealed orders by pool; orders with no pool become
    ///    skips with a full refund.
    /// 3. Run every pool's pass against staged copies. Any guard
    ///    rejection aborts the whole call with nothing committed;
    ///    results parked by earlier standalone passes keep their
    ///    already-committed effects.
    /// 4. Commit the staged pools, credit fills and refunds, and merge
    ///    parked results into the report.
    /// 5. Mark the batch settled, store the report, open the next batch.
    ///
    /// Unrevealed commitments do not block settlement; they stay
    /// slashable indefinitely via [`AuctionEngine::slash_unrevealed`].
    ///
    /// # Errors
    /// `NotAuthorized` for non-settlers, `WrongPhase` before SETTLING,
    /// `BatchAlreadySettled`/`BatchNotFound`, or a guard rejection.
    pub fn settle_batch(&mut self, caller: AccountId, batch_id: BatchId) -> Result<SettlementReport> {
        let sample = self.clock.sample();
        self.auth.require_settler(caller, "settle a batch")?;
        if batch_id != self.batches.current_id() {
            let batch = self.batches.get(batch_id)?;
            return Err(VeilswapError::BatchAlreadySettled(batch.id));
        }

        let phase = self.phase_oracle.phase(self.batches.current(), sample.now);
        let exec = self.sequencer.sequence(self.batches.current_mut(), phase)?;
        let orders = self.batches.current().revealed_orders.clone();
        let priority_proceeds = self.batches.current().total_priority_bids;

        // ----- Route remaining orders ---------------------------------
        let mut missing: Vec<(usize, OrderOutcome)> = Vec::new();
        let mut per_pool: BTreeMap<PoolId, Vec<(usize, &RevealedOrder)>> = BTreeMap::new();
        for (position, &idx) in exec.iter().enumerate() {
            let order = &orders[idx];
            if self.commitments.get(order.commitment_id)?.status != CommitmentStatus::Revealed {
                continue;
            }
            let pool_id = PoolManager::pool_id_for(&order.token_in, &order.token_out);
            if self.pools.pool(pool_id).is_ok() {
                per_pool.entry(pool_id).or_default().push((position, order));
            } else {
                missing.push((
                    position,
                    OrderOutcome::Skipped {
                        commitment_id: order.commitment_id,
                        trader: order.trader,
                        token: order.token_in.clone(),
                        refunded: order.amount_in,
                        reason: SkipReason::PoolMissing {
                            token_in: order.token_in.clone(),
                            token_out: order.token_out.clone(),
                        },
                    },
                ));
            }
        }

        // ----- Stage every pass before committing any -----------------
        let mut staged_pools: Vec<Pool> = Vec::with_capacity(per_pool.len());
        let mut passes: Vec<(PoolId, ExecutionPass)> = Vec::with_capacity(per_pool.len());
        for (pool_id, slice) in &per_pool {
            let mut staged = self.pools.pool(*pool_id)?.clone();
            let pass = executor::execute_pool_orders(
                &mut staged,
                slice,
                self.pools.fee_config(),
                self.pools.guard_config(),
                sample.block,
            )?;
            staged_pools.push(staged);
            passes.push((*pool_id, pass));
        }

        // ----- Commit -------------------------------------------------
        for staged in staged_pools {
            self.pools.replace(staged);
        }

        let parked = self.parked.remove(&batch_id).unwrap_or_default();
        let mut pool_results = parked.pool_results;
        let mut by_position = parked.outcomes;

        for (pool_id, pass) in passes {
            self.consume_outcomes(&pass.outcomes)?;
            for (position, outcome) in pass.outcomes {
                by_position.insert(position, outcome);
            }
            let merged = match pool_results.remove(&pool_id) {
                Some(earlier) => merge_pool_results(earlier, pass.result)?,
                None => pass.result,
            };
            pool_results.insert(pool_id, merged);
        }

        self.consume_outcomes(&missing)?;
        for (position, outcome) in missing {
            by_position.insert(position, outcome);
        }

        // ----- Report and rollover ------------------------------------
        let mut fees_accrued: BTreeMap<Token, u128> = BTreeMap::new();
        for outcome in by_position.values() {
            if let OrderOutcome::Filled(fill) = outcome {
                if fill.protocol_fee > 0 {
                    let entry = fees_accrued.entry(fill.token_out.clone()).or_insert(0);
                    *entry =
                        entry
                            .checked_add(fill.protocol_fee)
                            .ok_or(VeilswapError::MathOverflow {
                                context: "settlement fee totals",
                            })?;
                }
            }
        }

        let report = SettlementReport {
            batch_id,
            settled_at: sample.now,
            outcomes: by_position.into_values().collect(),
            pool_results,
            fees_accrued,
            slashed_count: self.commitments.slashed_count(batch_id),
            priority_proceeds,
        };

        self.batches.mark_settled(sample.now)?;
        let next = self.batches.open_next(sample.now)?;
        self.reports.insert(batch_id, report.clone());
        self.record(sample, EngineOp::SettleBatch { caller, batch_id })?;

        info!(
            batch_id = %batch_id,
            filled = report.filled_count(),
            skipped = report.skipped_count(),
            slashed = report.slashed_count,
            priority_proceeds,
            next_batch = %next,
            "Batch settled"
        );
        Ok(report)
    }

    /// Mark each outcome's commitment executed and credit its payout.
    fn consume_outcomes(&mut self, outcomes: &[(usize, OrderOutcome)]) -> Result<()> {
        for (_, outcome) in outcomes {
            self.commitments.mark_executed(outcome.commitment_id())?;
            match outcome {
                OrderOutcome::Filled(fill) => {
                    self.payouts
                        .credit_token(fill.trader, &fill.token_out, fill.amount_out)?;
                }
                OrderOutcome::Skipped {
                    trader,
                    token,
                    refunded,
                    ..
                } => {
                    if *refunded > 0 {
                        self.payouts.credit_token(*trader, token, *refunded)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn accrue_proceeds(&mut self, amount: u128) -> Result<()> {
        self.auction_proceeds =
            self.auction_proceeds
                .checked_add(amount)
                .ok_or(VeilswapError::MathOverflow {
                    context: "auction proceeds",
                })?;
        Ok(())
    }

    // =================================================================
    // Pools and direct trading
    // =================================================================

    /// Create a pool and seed it with initial liquidity.
    ///
    /// # Errors
    /// See [`PoolManager::create_pool`].
    pub fn create_pool(
        &mut self,
        caller: AccountId,
        token_a: &str,
        token_b: &str,
        amount_a: u128,
        amount_b: u128,
        fee_rate_bps: Option<u32>,
    ) -> Result<(PoolId, u128)> {
        let sample = self.clock.sample();
        let created = self.pools.create_pool(
            caller,
            token_a,
            token_b,
            amount_a,
            amount_b,
            fee_rate_bps,
            sample.block,
            sample.now,
        )?;
        self.record(
            sample,
            EngineOp::CreatePool {
                caller,
                token_a: token_a.to_string(),
                token_b: token_b.to_string(),
                amount_a,
                amount_b,
                fee_rate_bps,
            },
        )?;
        Ok(created)
    }

    /// Direct swap against a pool, outside the batch auction.
    ///
    /// Runs the full guard pipeline, including the same-block check the
    /// batch path deliberately omits.
    ///
    /// # Errors
    /// See [`PoolManager::swap`].
    pub fn swap(
        &mut self,
        caller: AccountId,
        token_in: &str,
        token_out: &str,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<SwapReceipt> {
        let sample = self.clock.sample();
        let receipt = self.pools.swap(
            caller,
            token_in,
            token_out,
            amount_in,
            min_amount_out,
            sample.block,
        )?;
        self.record(
            sample,
            EngineOp::Swap {
                caller,
                token_in: token_in.to_string(),
                token_out: token_out.to_string(),
                amount_in,
                min_amount_out,
            },
        )?;
        Ok(receipt)
    }

    /// Quote a swap against current reserves without touching state.
    ///
    /// # Errors
    /// `PoolNotFound` or pricing failures.
    pub fn quote(&self, token_in: &str, token_out: &str, amount_in: u128) -> Result<u128> {
        self.pools.quote(token_in, token_out, amount_in)
    }

    /// Add liquidity at the current reserve ratio.
    ///
    /// # Errors
    /// See [`PoolManager::add_liquidity`].
    pub fn add_liquidity(
        &mut self,
        caller: AccountId,
        pool_id: PoolId,
        amount0: u128,
        amount1: u128,
    ) -> Result<u128> {
        let sample = self.clock.sample();
        let minted = self
            .pools
            .add_liquidity(caller, pool_id, amount0, amount1, sample.block)?;
        self.record(
            sample,
            EngineOp::AddLiquidity {
                caller,
                pool_id,
                amount0,
                amount1,
            },
        )?;
        Ok(minted)
    }

    /// Burn liquidity shares for the underlying reserves.
    ///
    /// # Errors
    /// See [`PoolManager::remove_liquidity`].
    pub fn remove_liquidity(
        &mut self,
        caller: AccountId,
        pool_id: PoolId,
        shares: u128,
    ) -> Result<(u128, u128)> {
        let sample = self.clock.sample();
        let returned = self
            .pools
            .remove_liquidity(caller, pool_id, shares, sample.block)?;
        self.record(
            sample,
            EngineOp::RemoveLiquidity {
                caller,
                pool_id,
                shares,
            },
        )?;
        Ok(returned)
    }

    /// Record a transfer that landed in a pool's custody outside any
    /// engine operation. Feeds the donation guard.
    ///
    /// # Errors
    /// `PoolNotFound` or balance overflow.
    pub fn record_external_deposit(
        &mut self,
        pool_id: PoolId,
        token: &str,
        amount: u128,
    ) -> Result<()> {
        let sample = self.clock.sample();
        self.pools.record_external_deposit(pool_id, token, amount)?;
        self.record(
            sample,
            EngineOp::RecordExternalDeposit {
                pool_id,
                token: token.to_string(),
                amount,
            },
        )?;
        Ok(())
    }

    /// Absorb any custody surplus into reserves, clearing the donation
    /// guard. Permissionless. Returns the absorbed surplus per token.
    ///
    /// # Errors
    /// `PoolNotFound` or reserve overflow.
    pub fn sync_reserves(&mut self, caller: AccountId, pool_id: PoolId) -> Result<(u128, u128)> {
        let sample = self.clock.sample();
        let absorbed = self.pools.sync_reserves(pool_id, sample.block)?;
        self.record(sample, EngineOp::SyncReserves { caller, pool_id })?;
        Ok(absorbed)
    }

    // =================================================================
    // Treasury and payouts
    // =================================================================

    /// Sweep every pool's accumulated protocol fees for `token` into the
    /// fee sink. Admin only. Returns the amount swept.
    ///
    /// # Errors
    /// `NotAuthorized`, or custody accounting failures.
    pub fn collect_fees(&mut self, caller: AccountId, token: &str) -> Result<u128> {
        let sample = self.clock.sample();
        self.auth.require_admin(caller, "collect protocol fees")?;
        let collected = self.pools.collect_fees(token)?;
        if collected > 0 {
            self.sink.receive(token, collected);
        }
        self.record(
            sample,
            EngineOp::CollectFees {
                caller,
                token: token.to_string(),
            },
        )?;
        Ok(collected)
    }

    /// Forward accumulated auction proceeds (slash cuts and priority
    /// bids) to the fee sink. Admin only. Returns the amount forwarded.
    ///
    /// # Errors
    /// `NotAuthorized`.
    pub fn forward_auction_proceeds(&mut self, caller: AccountId) -> Result<u128> {
        let sample = self.clock.sample();
        self.auth.require_admin(caller, "forward auction proceeds")?;
        let amount = std::mem::take(&mut self.auction_proceeds);
        if amount > 0 {
            self.sink.receive(NATIVE_ASSET, amount);
            info!(amount, "Auction proceeds forwarded");
        }
        self.record(sample, EngineOp::ForwardProceeds { caller })?;
        Ok(amount)
    }

    /// Withdraw the caller's accumulated native-denominated payouts.
    pub fn claim_native(&mut self, caller: AccountId) -> Result<u128> {
        let sample = self.clock.sample();
        let amount = self.payouts.drain_native(&caller);
        if amount > 0 {
            self.record(sample, EngineOp::ClaimNative { caller })?;
            info!(account = %caller, amount, "Native payout claimed");
        }
        Ok(amount)
    }

    /// Withdraw the caller's accumulated payouts in `token`.
    pub fn claim_token(&mut self, caller: AccountId, token: Token) -> Result<u128> {
        let sample = self.clock.sample();
        let amount = self.payouts.drain_token(&caller, &token);
        if amount > 0 {
            self.record(sample, EngineOp::ClaimToken { caller, token })?;
            info!(account = %caller, amount, "Token payout claimed");
        }
        Ok(amount)
    }

    // =================================================================
    // Administration
    // =================================================================

    /// Toggle the same-block interaction guard. Admin only.
    ///
    /// # Errors
    /// `NotAuthorized`.
    pub fn set_flash_loan_protection(&mut self, caller: AccountId, enabled: bool) -> Result<()> {
        let sample = self.clock.sample();
        self.auth
            .require_admin(caller, "toggle flash-loan protection")?;
        self.pools.set_flash_loan_protection(enabled);
        self.record(sample, EngineOp::SetFlashLoanProtection { caller, enabled })
    }

    /// Toggle TWAP deviation validation. Admin only.
    ///
    /// # Errors
    /// `NotAuthorized`.
    pub fn set_twap_validation(&mut self, caller: AccountId, enabled: bool) -> Result<()> {
        let sample = self.clock.sample();
        self.auth.require_admin(caller, "toggle TWAP validation")?;
        self.pools.set_twap_validation(enabled);
        self.record(sample, EngineOp::SetTwapValidation { caller, enabled })
    }

    /// Override one pool's per-trade size cap. Admin only.
    ///
    /// # Errors
    /// `NotAuthorized`, `InvalidBps`, or `PoolNotFound`.
    pub fn set_pool_max_trade_size(
        &mut self,
        caller: AccountId,
        pool_id: PoolId,
        max_bps: u32,
    ) -> Result<()> {
        let sample = self.clock.sample();
        self.auth
            .require_admin(caller, "set a pool's trade size cap")?;
        self.pools.set_pool_max_trade_size(pool_id, max_bps)?;
        self.record(
            sample,
            EngineOp::SetPoolMaxTradeSize {
                caller,
                pool_id,
                max_bps,
            },
        )
    }

    /// Set the protocol's share of swap fees. Admin only.
    ///
    /// # Errors
    /// `NotAuthorized` or `InvalidBps`.
    pub fn set_protocol_fee_share(&mut self, caller: AccountId, share_bps: u32) -> Result<()> {
        let sample = self.clock.sample();
        self.auth
            .require_admin(caller, "set the protocol fee share")?;
        self.pools.set_protocol_fee_share(share_bps)?;
        self.record(sample, EngineOp::SetProtocolFeeShare { caller, share_bps })
    }

    /// Grant `role` to `account`. Admin only.
    ///
    /// # Errors
    /// `NotAuthorized`.
    pub fn grant_role(&mut self, caller: AccountId, account: AccountId, role: Role) -> Result<()> {
        let sample = self.clock.sample();
        self.auth.require_admin(caller, "grant a role")?;
        self.auth.grant(account, role);
        self.record(
            sample,
            EngineOp::GrantRole {
                caller,
                account,
                role,
            },
        )
    }

    /// Revoke `role` from `account`. Admin only; the last admin cannot be
    /// revoked.
    ///
    /// # Errors
    /// `NotAuthorized`.
    pub fn revoke_role(&mut self, caller: AccountId, account: AccountId, role: Role) -> Result<()> {
        let sample = self.clock.sample();
        self.auth.require_admin(caller, "revoke a role")?;
        self.auth.revoke(account, role)?;
        self.record(
            sample,
            EngineOp::RevokeRole {
                caller,
                account,
                role,
            },
        )
    }

    // =================================================================
    // Queries
    // =================================================================

    /// The open batch's phase at the current clock.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.phase_oracle
            .phase(self.batches.current(), self.clock.sample().now)
    }

    #[must_use]
    pub fn current_batch_id(&self) -> BatchId {
        self.batches.current_id()
    }

    /// Look up any batch, open or settled.
    ///
    /// # Errors
    /// `BatchNotFound`.
    pub fn batch(&self, batch_id: BatchId) -> Result<&Batch> {
        self.batches.get(batch_id)
    }

    /// Look up a commitment.
    ///
    /// # Errors
    /// `CommitmentNotFound`.
    pub fn commitment(&self, commitment_id: CommitmentId) -> Result<&Commitment> {
        self.commitments.get(commitment_id)
    }

    /// A batch's revealed orders, in reveal order.
    ///
    /// # Errors
    /// `BatchNotFound`.
    pub fn revealed_orders(&self, batch_id: BatchId) -> Result<&[RevealedOrder]> {
        Ok(&self.batches.get(batch_id)?.revealed_orders)
    }

    /// Commitments in a batch still awaiting reveal — the slashable set
    /// once the batch's reveal window closes.
    #[must_use]
    pub fn pending_commitments(&self, batch_id: BatchId) -> Vec<CommitmentId> {
        self.commitments.pending_ids(batch_id)
    }

    /// The settlement report for a settled batch.
    #[must_use]
    pub fn report(&self, batch_id: BatchId) -> Option<&SettlementReport> {
        self.reports.get(&batch_id)
    }

    /// Read access to the pool layer.
    #[must_use]
    pub fn pools(&self) -> &PoolManager {
        &self.pools
    }

    /// Snapshot of the pool serving a pair.
    ///
    /// # Errors
    /// `PoolNotFound`.
    pub fn pool_info(&self, token_a: &str, token_b: &str) -> Result<PoolInfo> {
        Ok(self.pools.pool_for(token_a, token_b)?.info())
    }

    /// Unclaimed native-denominated payouts owed to `account`.
    #[must_use]
    pub fn payout_native(&self, account: &AccountId) -> u128 {
        self.payouts.native_owed(account)
    }

    /// Unclaimed payouts in `token` owed to `account`.
    #[must_use]
    pub fn payout_token(&self, account: &AccountId, token: &str) -> u128 {
        self.payouts.token_owed(account, token)
    }

    /// Auction proceeds not yet forwarded to the sink.
    #[must_use]
    pub fn auction_proceeds(&self) -> u128 {
        self.auction_proceeds
    }

    /// The fee sink receiving protocol fees and auction proceeds.
    #[must_use]
    pub fn treasury(&self) -> &dyn FeeSink {
        self.sink.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthTable {
        &self.auth
    }

    /// Configuration the engine was constructed with. Live guard and fee
    /// values may differ after admin updates; read those via
    /// [`AuctionEngine::pools`].
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Mutable clock access, for driving a manual clock in tests and
    /// embedding harnesses.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}

/// Combine an earlier pass's totals with a later one over the same pool,
/// recomputing the volume-weighted clearing price across both.
fn merge_pool_results(earlier: BatchSwapResult, later: BatchSwapResult) -> Result<BatchSwapResult> {
    let overflow = VeilswapError::MathOverflow {
        context: "merged batch volume",
    };
    let token0_in = earlier.token0_in.checked_add(later.token0_in).ok_or(overflow.clone())?;
    let token1_in = earlier.token1_in.checked_add(later.token1_in).ok_or(overflow.clone())?;
    let token0_out = earlier.token0_out.checked_add(later.token0_out).ok_or(overflow.clone())?;
    let token1_out = earlier.token1_out.checked_add(later.token1_out).ok_or(overflow.clone())?;

    let token0_moved = token0_in.checked_add(token0_out).ok_or(overflow.clone())?;
    let token1_moved = token1_in.checked_add(token1_out).ok_or(overflow)?;
    let clearing_price = if token0_moved > 0 {
        math::mul_div(token1_moved, PRECISION, token0_moved)?
    } else {
        later.clearing_price
    };

    Ok(BatchSwapResult {
        clearing_price,
        token0_in,
        token1_in,
        token0_out,
        token1_out,
    })
}
