//! Ledger client: contract calls as single reliable operations.
//!
//! Writes go through [`LedgerClient::submit_call`]: read the admin account's
//! sequence, build, prepare, sign and send, then poll for confirmation. A
//! stale sequence is retried with a freshly read account; any other
//! rejection is returned with its raw payload. Reads go through
//! [`LedgerClient::simulate_call`], which never signs and never consumes a
//! sequence number.
//!
//! When no usable contract id (or no usable admin secret, for writes) is
//! configured the client runs degraded: writes log a warning and return
//! [`SubmitStatus::Skipped`], reads return `None`. Neither touches the
//! network.
//!
//! Every write system-wide is signed by the one admin account, so its
//! sequence number serializes all writes. Concurrent writers race for it and
//! rely on the bad-sequence retry.

use std::{sync::Arc, time::Instant};

use tokio_util::sync::CancellationToken;

use crate::{
    config::{ContractStatus, VaultConfig},
    error::{self, Result, SimulationSnafu, VaultError},
    http::HttpRpc,
    metrics::{ConfirmationOutcome, VaultMetrics},
    retry::{PollOutcome, poll_confirmation, with_retry_cancellable},
    rpc::{ContractCall, LedgerRpc, SendStatus, Transaction, TransactionStatus},
    scval::{FromScVal, ScVal},
    signer::Keypair,
};

/// How a submitted write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Polling observed `SUCCESS`.
    Confirmed,
    /// Polling ended without success; the write may still land.
    Unconfirmed(TransactionStatus),
    /// The node answered with a final non-error status; no polling done.
    Accepted(SendStatus),
    /// Degraded mode: nothing was sent.
    Skipped,
}

/// Result of [`LedgerClient::submit_call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Transaction hash, absent when skipped.
    pub hash: Option<String>,
    /// Final status.
    pub status: SubmitStatus,
}

impl SubmitOutcome {
    pub(crate) fn skipped() -> Self {
        Self { hash: None, status: SubmitStatus::Skipped }
    }

    /// Returns true if nothing was sent.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == SubmitStatus::Skipped
    }

    /// Returns true if the write was observed as applied.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == SubmitStatus::Confirmed
    }
}

#[derive(Debug)]
struct ClientInner {
    rpc: Arc<dyn LedgerRpc>,
    config: VaultConfig,
    contract: ContractStatus,
    signer: Option<Keypair>,
    cancellation: CancellationToken,
}

/// Cheaply cloneable handle for contract calls.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    inner: Arc<ClientInner>,
}

impl LedgerClient {
    /// Creates a client over an RPC implementation.
    ///
    /// An unusable contract id or admin secret is logged and leaves the
    /// client degraded; construction itself never fails.
    #[must_use]
    pub fn new(config: VaultConfig, rpc: Arc<dyn LedgerRpc>) -> Self {
        let contract = config.contract_status();
        if let ContractStatus::Unconfigured(reason) = &contract {
            tracing::warn!(reason = reason.as_str(), "vault contract not configured, running degraded");
        }

        let signer = match config.admin_secret.as_deref() {
            Some(secret) => match Keypair::from_secret(secret) {
                Ok(keypair) => Some(keypair),
                Err(e) => {
                    tracing::warn!(error = %e, "admin secret unusable, writes disabled");
                    None
                },
            },
            None => {
                if contract.is_configured() {
                    tracing::warn!("admin secret not configured, writes disabled");
                }
                None
            },
        };

        Self {
            inner: Arc::new(ClientInner {
                rpc,
                config,
                contract,
                signer,
                cancellation: CancellationToken::new(),
            }),
        }
    }

    /// Creates a client talking JSON-RPC to `config.rpc_url()`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Transport` if the HTTP client cannot be built.
    pub fn connect(config: VaultConfig) -> Result<Self> {
        let rpc = HttpRpc::new(config.rpc_url(), config.request_timeout())?;
        Ok(Self::new(config, Arc::new(rpc)))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.inner.config
    }

    /// Returns whether a contract is configured.
    #[must_use]
    pub fn contract_status(&self) -> &ContractStatus {
        &self.inner.contract
    }

    /// Returns true if writes will be submitted.
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.inner.contract.is_configured() && self.inner.signer.is_some()
    }

    /// Returns the admin public key, if a valid secret is configured.
    #[must_use]
    pub fn signer_public_key(&self) -> Option<&str> {
        self.inner.signer.as_ref().map(Keypair::public_key)
    }

    /// Cancels in-flight retry and poll loops and rejects further calls.
    pub fn shutdown(&self) {
        self.inner.cancellation.cancel();
    }

    /// Returns true once [`LedgerClient::shutdown`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.cancellation.is_cancelled()
    }

    fn metrics(&self) -> &dyn VaultMetrics {
        self.inner.config.metrics().as_ref()
    }

    /// Submits a state-changing contract call.
    ///
    /// # Errors
    ///
    /// - `RetryExhausted` when every attempt hit a sequence conflict
    /// - `TransactionFailed` for any other rejection, with the raw payload
    /// - `Transport` / `Rpc` for network failures
    /// - `Shutdown` / `Cancelled` once the client is shut down
    pub async fn submit_call(&self, method: &str, args: Vec<ScVal>) -> Result<SubmitOutcome> {
        let (contract_id, signer) = match (self.inner.contract.contract_id(), &self.inner.signer) {
            (Some(contract_id), Some(signer)) => (contract_id, signer),
            _ => {
                tracing::warn!(method, "vault contract or admin signer not configured, skipping write");
                return Ok(SubmitOutcome::skipped());
            },
        };
        if self.is_shutdown() {
            return Err(VaultError::Shutdown);
        }

        let start = Instant::now();
        let result = with_retry_cancellable(
            &self.inner.config.retry_policy,
            &self.inner.cancellation,
            self.metrics(),
            method,
            || self.submit_once(contract_id, signer, method, &args),
        )
        .await;

        self.metrics().record_request(method, start.elapsed(), result.is_ok());
        match &result {
            Ok(outcome) => {
                tracing::debug!(method, hash = ?outcome.hash, status = ?outcome.status, "write finished");
            },
            Err(VaultError::Cancelled) => {
                tracing::debug!(method, "write cancelled");
            },
            Err(e) => {
                tracing::error!(method, error = %e, "transaction submission failed");
            },
        }
        result
    }

    /// One attempt: fresh sequence, build, prepare, sign, send, confirm.
    async fn submit_once(
        &self,
        contract_id: &str,
        signer: &Keypair,
        method: &str,
        args: &[ScVal],
    ) -> Result<SubmitOutcome> {
        let config = &self.inner.config;
        let rpc = &self.inner.rpc;

        let account =
            rpc.get_account(signer.public_key()).await.map_err(|e| classify(method, e))?;

        let tx = Transaction {
            source: signer.public_key().to_owned(),
            sequence: account.sequence.saturating_add(1),
            fee: config.base_fee,
            timeout_secs: config.tx_timeout.as_secs(),
            operation: ContractCall {
                contract_id: contract_id.to_owned(),
                method: method.to_owned(),
                args: args.to_vec(),
            },
            resource_fee: None,
        };
        let tx = rpc.prepare_transaction(tx).await.map_err(|e| classify(method, e))?;
        let signed = signer.sign_transaction(tx, &config.network_passphrase)?;
        let response = rpc.send_transaction(&signed).await.map_err(|e| classify(method, e))?;
        let hash = response.hash.clone();

        match response.status {
            SendStatus::Error => {
                let payload = response.error_text();
                if error::is_bad_sequence(&payload) {
                    return Err(VaultError::BadSequence { method: method.to_owned(), payload });
                }
                Err(VaultError::TransactionFailed { method: method.to_owned(), payload })
            },
            SendStatus::Pending => {
                tracing::info!(method, hash = %hash, sequence = signed.transaction.sequence, "transaction submitted");
                let status = self.await_confirmation(method, &hash).await?;
                Ok(SubmitOutcome { hash: Some(hash), status })
            },
            status @ (SendStatus::Duplicate | SendStatus::TryAgainLater) => {
                tracing::warn!(method, hash = %hash, %status, "transaction not queued for confirmation");
                self.metrics().record_confirmation(method, ConfirmationOutcome::Immediate);
                Ok(SubmitOutcome { hash: Some(hash), status: SubmitStatus::Accepted(status) })
            },
        }
    }

    /// Polls a pending transaction. Only success counts as confirmed; every
    /// other ending is reported but not raised.
    async fn await_confirmation(&self, method: &str, hash: &str) -> Result<SubmitStatus> {
        let rpc = &self.inner.rpc;
        let polled = poll_confirmation(&self.inner.config.poll_policy, &self.inner.cancellation, || {
            rpc.get_transaction(hash)
        })
        .await;

        let outcome = match polled {
            Ok(outcome) => outcome,
            Err(VaultError::Cancelled) => return Err(VaultError::Cancelled),
            Err(e) => {
                tracing::warn!(method, hash, error = %e, "confirmation lookup failed, write may still land");
                PollOutcome { status: TransactionStatus::NotFound, polls: 0 }
            },
        };

        match outcome.status {
            TransactionStatus::Success => {
                tracing::info!(method, hash, polls = outcome.polls, "transaction confirmed");
                self.metrics().record_confirmation(method, ConfirmationOutcome::Confirmed);
                Ok(SubmitStatus::Confirmed)
            },
            TransactionStatus::NotFound => {
                tracing::warn!(method, hash, polls = outcome.polls, "transaction unconfirmed after polling, write may still land");
                self.metrics().record_confirmation(method, ConfirmationOutcome::Unconfirmed);
                Ok(SubmitStatus::Unconfirmed(TransactionStatus::NotFound))
            },
            TransactionStatus::Failed => {
                tracing::warn!(method, hash, polls = outcome.polls, "transaction status after polling: FAILED");
                self.metrics().record_confirmation(method, ConfirmationOutcome::Failed);
                Ok(SubmitStatus::Unconfirmed(TransactionStatus::Failed))
            },
        }
    }

    /// Dry-runs a read-only contract call.
    ///
    /// Returns `Ok(None)` when degraded or when the call produced no value.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Simulation` if the simulation reported an error,
    /// `Transport` / `Rpc` for network failures and `Shutdown` once the client
    /// is shut down.
    pub async fn simulate_call(&self, method: &str, args: Vec<ScVal>) -> Result<Option<ScVal>> {
        let Some(contract_id) = self.inner.contract.contract_id() else {
            tracing::debug!(method, "vault contract not configured, read returns nothing");
            return Ok(None);
        };
        let Some(source) = self.inner.config.reader_address().or(self.signer_public_key()) else {
            tracing::warn!(method, "no reader account configured, read returns nothing");
            return Ok(None);
        };
        if self.is_shutdown() {
            return Err(VaultError::Shutdown);
        }

        let tx = Transaction {
            source: source.to_owned(),
            sequence: 0,
            fee: self.inner.config.base_fee,
            timeout_secs: self.inner.config.tx_timeout.as_secs(),
            operation: ContractCall {
                contract_id: contract_id.to_owned(),
                method: method.to_owned(),
                args,
            },
            resource_fee: None,
        };

        let start = Instant::now();
        let result = self.inner.rpc.simulate_transaction(&tx).await;
        self.metrics().record_request(
            method,
            start.elapsed(),
            result.as_ref().is_ok_and(|r| r.error.is_none()),
        );

        let response = result?;
        if let Some(message) = response.error {
            return SimulationSnafu { method, message }.fail();
        }
        Ok(response.result.filter(|val| *val != ScVal::Void))
    }

    /// Simulates a call and decodes its result.
    ///
    /// # Errors
    ///
    /// Same as [`LedgerClient::simulate_call`], plus `ScValDecode` if the
    /// result has an unexpected shape.
    pub async fn simulate_as<T: FromScVal>(&self, method: &str, args: Vec<ScVal>) -> Result<Option<T>> {
        match self.simulate_call(method, args).await? {
            Some(val) => T::from_scval(&val).map(Some),
            None => Ok(None),
        }
    }
}

/// Maps network errors that carry a sequence-conflict marker to `BadSequence`.
fn classify(method: &str, err: VaultError) -> VaultError {
    match &err {
        VaultError::Rpc { .. } | VaultError::Transport { .. } => {
            let payload = err.to_string();
            if error::is_bad_sequence(&payload) {
                VaultError::BadSequence { method: method.to_owned(), payload }
            } else {
                err
            }
        },
        _ => err,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::{PollPolicy, RetryPolicy},
        mock::MockLedger,
        signer::Keypair,
    };

    const CONTRACT: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";

    fn admin() -> Keypair {
        Keypair::from_seed([9; 32])
    }

    fn config() -> VaultConfig {
        VaultConfig::builder()
            .with_contract_id(CONTRACT)
            .with_admin_secret(admin().secret())
            .with_retry_policy(RetryPolicy { max_attempts: 3, delay: Duration::from_millis(10) })
            .with_poll_policy(PollPolicy { max_polls: 3, interval: Duration::from_millis(10) })
            .build()
            .unwrap()
    }

    fn client(mock: &Arc<MockLedger>) -> LedgerClient {
        LedgerClient::new(config(), mock.clone())
    }

    fn put_args(id: &str) -> Vec<ScVal> {
        vec![
            ScVal::String("Posts".to_owned()),
            ScVal::String(id.to_owned()),
            ScVal::Bytes(vec![1, 2, 3]),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_confirms() {
        let mock = Arc::new(MockLedger::new());
        let outcome = client(&mock).submit_call("put", put_args("p1")).await.unwrap();
        assert!(outcome.is_confirmed());
        assert!(outcome.hash.is_some());
        assert_eq!(mock.send_count(), 1);
        assert_eq!(mock.account_fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_fetched_fresh_each_call() {
        let mock = Arc::new(MockLedger::new());
        let client = client(&mock);
        client.submit_call("put", put_args("p1")).await.unwrap();
        client.submit_call("put", put_args("p2")).await.unwrap();
        assert_eq!(mock.account_fetch_count(), 2);
        assert_eq!(mock.sequence_of(admin().public_key()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_sequence_retried_then_succeeds() {
        let mock = Arc::new(MockLedger::new());
        mock.inject_bad_sequence(2);
        let outcome = client(&mock).submit_call("put", put_args("p1")).await.unwrap();
        assert!(outcome.is_confirmed());
        assert_eq!(mock.send_count(), 3);
        assert_eq!(mock.account_fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_sequence_exhausts() {
        let mock = Arc::new(MockLedger::new());
        mock.inject_bad_sequence(3);
        let err = client(&mock).submit_call("put", put_args("p1")).await.unwrap_err();
        assert!(matches!(err, VaultError::RetryExhausted { attempts: 3, .. }), "{err:?}");
        assert_eq!(mock.send_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_error_not_retried() {
        let mock = Arc::new(MockLedger::new());
        mock.inject_send_error("txInsufficientBalance");
        let err = client(&mock).submit_call("put", put_args("p1")).await.unwrap_err();
        match err {
            VaultError::TransactionFailed { payload, .. } => {
                assert!(payload.contains("txInsufficientBalance"));
            },
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(mock.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_confirmed() {
        let mock = Arc::new(MockLedger::new());
        mock.set_pending_polls(2);
        let outcome = client(&mock).submit_call("put", put_args("p1")).await.unwrap();
        assert!(outcome.is_confirmed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout_is_best_effort() {
        let mock = Arc::new(MockLedger::new());
        mock.set_never_confirm(true);
        let outcome = client(&mock).submit_call("put", put_args("p1")).await.unwrap();
        assert_eq!(outcome.status, SubmitStatus::Unconfirmed(TransactionStatus::NotFound));
    }

    #[tokio::test]
    async fn test_degraded_write_skips_network() {
        let mock = Arc::new(MockLedger::new());
        let config = VaultConfig::builder().with_admin_secret(admin().secret()).build().unwrap();
        let client = LedgerClient::new(config, mock.clone());
        let outcome = client.submit_call("put", put_args("p1")).await.unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(client.simulate_call("get", put_args("p1")).await.unwrap(), None);
        assert_eq!(mock.account_fetch_count(), 0);
        assert_eq!(mock.send_count(), 0);
        assert_eq!(mock.simulate_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_secret_degrades_writes_only() {
        let mock = Arc::new(MockLedger::new());
        let config = VaultConfig::builder()
            .with_contract_id(CONTRACT)
            .with_admin_secret("SNOTAREALSEED")
            .with_reader_address(admin().public_key())
            .build()
            .unwrap();
        let client = LedgerClient::new(config, mock.clone());
        assert!(!client.can_write());
        assert!(client.submit_call("put", put_args("p1")).await.unwrap().is_skipped());
        assert_eq!(mock.send_count(), 0);

        let has = client
            .simulate_call("has", vec![ScVal::String("Posts".to_owned()), ScVal::String("p1".to_owned())])
            .await
            .unwrap();
        assert_eq!(has, Some(ScVal::Bool(false)));
        assert_eq!(mock.simulate_count(), 1);
    }

    #[tokio::test]
    async fn test_simulation_error_raised() {
        let mock = Arc::new(MockLedger::new());
        mock.inject_simulation_error(1);
        let err = client(&mock).simulate_call("get_stats", vec![]).await.unwrap_err();
        assert!(matches!(err, VaultError::Simulation { .. }));
    }

    #[tokio::test]
    async fn test_missing_entry_reads_as_empty_bytes() {
        let mock = Arc::new(MockLedger::new());
        let result = client(&mock)
            .simulate_call("get", vec![ScVal::String("Posts".to_owned()), ScVal::String("nope".to_owned())])
            .await
            .unwrap();
        assert_eq!(result, Some(ScVal::Bytes(Vec::new())));
        assert_eq!(mock.account_fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_calls() {
        let mock = Arc::new(MockLedger::new());
        let client = client(&mock);
        client.shutdown();
        assert!(matches!(client.submit_call("put", put_args("p1")).await, Err(VaultError::Shutdown)));
        assert!(matches!(client.simulate_call("get_stats", vec![]).await, Err(VaultError::Shutdown)));
        assert_eq!(mock.send_count(), 0);
    }

    #[test]
    fn test_classify_transport_bad_sequence() {
        let err = VaultError::Rpc { method: "sendTransaction".to_owned(), message: "txBadSeq".to_owned() };
        assert!(matches!(classify("put", err), VaultError::BadSequence { .. }));
        let err = VaultError::Rpc { method: "sendTransaction".to_owned(), message: "boom".to_owned() };
        assert!(matches!(classify("put", err), VaultError::Rpc { .. }));
    }
}
