use crate::core::emitter::{event_channel, EventEmitter, EventStream};
use crate::core::error::MatchError;
use crate::core::scoring::ScoringEngine;
use crate::core::session::{MatchSession, SessionState};
use crate::core::sources::{CachedSource, LiveSource};
use crate::models::{JobProfile, MatchEvent, MatchResult, Provenance, SessionEvent};
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Knobs shared by every session run through one orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Upper bound on stored postings pulled per session
    pub cached_limit: usize,
    /// Send a `cancelled` event when the caller aborts
    pub acknowledge_cancel: bool,
    /// Events buffered before the session waits on the consumer
    pub event_buffer: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            cached_limit: 200,
            acknowledge_cancel: true,
            event_buffer: 32,
        }
    }
}

/// Final state of a session once its task has finished
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub resume_id: String,
    pub resume_name: String,
    pub target_city: String,
    pub search_keywords: Vec<String>,
    pub state: SessionState,
    pub results: Vec<MatchResult>,
    pub qualified_count: usize,
    pub from_cached: usize,
    pub from_live: usize,
    pub warnings: Vec<String>,
    pub error: Option<MatchError>,
}

impl SessionOutcome {
    fn from_session(session: MatchSession, error: Option<MatchError>) -> Self {
        let qualified_count = session.qualified_count();
        Self {
            session_id: session.id,
            resume_id: session.resume.resume_id.clone(),
            resume_name: session.resume.name.clone(),
            target_city: session.target_city,
            search_keywords: session.keywords,
            state: session.state,
            results: session.results.into_vec(),
            qualified_count,
            from_cached: session.from_cached,
            from_live: session.from_live,
            warnings: session.warnings,
            error,
        }
    }
}

/// Drives a session through cached lookup, live acquisition and completion
#[derive(Clone)]
pub struct Orchestrator {
    engine: Arc<ScoringEngine>,
    cached: CachedSource,
    live: Option<LiveSource>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<ScoringEngine>,
        cached: CachedSource,
        live: Option<LiveSource>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            engine,
            cached,
            live,
            settings,
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn has_live_source(&self) -> bool {
        self.live.is_some()
    }

    /// Event channel bound to the session's cancellation handle
    pub fn channel(&self, session: &MatchSession) -> (EventEmitter, EventStream) {
        event_channel(self.settings.event_buffer, session.cancellation())
    }

    /// Run the session on its own task and hand back the event stream
    pub fn spawn(&self, session: MatchSession) -> (EventStream, JoinHandle<SessionOutcome>) {
        let (emitter, stream) = self.channel(&session);
        let orchestrator = self.clone();
        let handle = tokio::spawn(async move { orchestrator.run(session, emitter).await });
        (stream, handle)
    }

    /// Run the session to completion while collecting every event
    pub async fn run_to_end(&self, session: MatchSession) -> (SessionOutcome, Vec<SessionEvent>) {
        let (emitter, stream) = self.channel(&session);
        tokio::join!(self.run(session, emitter), stream.collect::<Vec<_>>())
    }

    #[tracing::instrument(
        name = "match_session",
        skip_all,
        fields(session_id = %session.id, resume_id = %session.resume.resume_id)
    )]
    pub async fn run(&self, mut session: MatchSession, mut emitter: EventEmitter) -> SessionOutcome {
        info!(
            "Starting session: city={}, keywords={:?}, profile={}",
            session.target_city, session.keywords, session.params.profile
        );

        let error = match self.drive(&mut session, &mut emitter).await {
            Ok(()) => None,
            Err(MatchError::SessionCancelled) => {
                self.finish_cancelled(&mut session, &mut emitter);
                None
            }
            Err(err) => {
                self.finish_error(&mut session, &mut emitter, err.to_string())
                    .await;
                Some(err)
            }
        };

        info!(
            "Session finished: state={}, qualified={}, total={}, cached={}, live={}",
            session.state,
            session.qualified_count(),
            session.results.len(),
            session.from_cached,
            session.from_live
        );

        SessionOutcome::from_session(session, error)
    }

    async fn drive(
        &self,
        session: &mut MatchSession,
        emitter: &mut EventEmitter,
    ) -> Result<(), MatchError> {
        session.validate()?;
        let deadline = session.start_clock();

        session.transition(SessionState::CachedLookup)?;
        let cached_failed = self.cached_lookup(session, deadline).await?;
        if session.is_cancelled() {
            return Err(MatchError::SessionCancelled);
        }

        let needs_live = self.needs_live_acquire(session);
        emitter
            .emit(MatchEvent::CachedBatch {
                resume_id: session.resume.resume_id.clone(),
                resume_name: session.resume.name.clone(),
                target_city: session.target_city.clone(),
                search_keywords: session.keywords.clone(),
                matches: session.results.as_slice().to_vec(),
                qualified_count: session.qualified_count(),
                from_database: true,
                needs_live_acquire: needs_live,
            })
            .await?;

        let mut live_failed = false;
        if needs_live {
            session.transition(SessionState::LiveAcquire)?;
            live_failed = self.live_acquire(session, emitter, deadline).await?;
        }

        if (cached_failed || live_failed) && session.examined == 0 {
            return Err(MatchError::SourceUnavailable(session.warnings.join("; ")));
        }

        let qualified = session.qualified_count();
        let message = if qualified >= session.params.min_qualified {
            format!("Found {} qualified matches", qualified)
        } else {
            format!(
                "Found {} qualified matches, fewer than the {} requested",
                qualified, session.params.min_qualified
            )
        };
        emitter
            .emit(MatchEvent::Complete {
                message,
                total_qualified: qualified,
                total_matches: session.results.len(),
                from_cached: session.from_cached,
                from_live: session.from_live,
                warnings: session.warnings.clone(),
            })
            .await?;
        session.transition(SessionState::Complete)
    }

    /// Pull stored candidates and merge them; returns whether the source failed
    async fn cached_lookup(
        &self,
        session: &mut MatchSession,
        deadline: Instant,
    ) -> Result<bool, MatchError> {
        let cancel = session.cancellation();
        let limit = self.settings.cached_limit.min(session.params.max_candidates);
        let city = session.target_city.clone();
        let keywords = session.keywords.clone();

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MatchError::SessionCancelled),
            fetched = timeout_at(deadline, self.cached.fetch(&city, &keywords, limit)) => fetched,
        };

        let jobs = match fetched {
            Ok(Ok(jobs)) => jobs,
            Ok(Err(err)) => {
                session.warn(format!("Cached lookup failed: {}", err));
                return Ok(true);
            }
            Err(_) => {
                session.warn("Cached lookup exceeded the time budget");
                return Ok(true);
            }
        };

        info!("Cached lookup returned {} candidates", jobs.len());
        for job in jobs {
            if session.remaining_capacity() == 0 {
                debug!("Candidate cap reached during cached lookup");
                break;
            }
            self.merge(session, Arc::new(job), Provenance::Cached);
        }
        Ok(false)
    }

    fn needs_live_acquire(&self, session: &mut MatchSession) -> bool {
        if session.qualified_count() >= session.params.min_qualified
            || !session.params.acquisition_enabled
        {
            return false;
        }
        if self.live.is_none() {
            session.warn("Live acquisition is not configured");
            return false;
        }
        if session.remaining_capacity() == 0 {
            session.warn("Candidate cap reached before live acquisition");
            return false;
        }
        true
    }

    /// Stream live candidates until enough qualify; returns whether the source failed
    async fn live_acquire(
        &self,
        session: &mut MatchSession,
        emitter: &mut EventEmitter,
        deadline: Instant,
    ) -> Result<bool, MatchError> {
        let live = match &self.live {
            Some(live) => live,
            None => return Ok(false),
        };
        let cancel = session.cancellation();
        let needed = session.needed();

        emitter
            .emit(MatchEvent::Status {
                message: format!(
                    "{} qualified matches cached, acquiring live postings for {} more",
                    session.qualified_count(),
                    needed
                ),
                needed,
            })
            .await?;

        let city = session.target_city.clone();
        let keywords = session.keywords.clone();

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MatchError::SessionCancelled),
            _ = sleep_until(deadline) => {
                session.warn("Time budget expired before live acquisition started");
                return Ok(false);
            }
            opened = live.acquire(&city, &keywords, needed) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                session.warn(format!("Live acquisition failed: {}", err));
                return Ok(true);
            }
        };

        let mut arrived = 0;
        let mut failed = false;
        loop {
            if cancel.is_cancelled() {
                return Err(MatchError::SessionCancelled);
            }
            if arrived >= needed {
                debug!("Needed qualified count reached");
                break;
            }
            if session.remaining_capacity() == 0 {
                debug!("Candidate cap reached during live acquisition");
                break;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MatchError::SessionCancelled),
                _ = sleep_until(deadline) => {
                    session.warn("Time budget expired, returning partial results");
                    break;
                }
                next = stream.next() => next,
            };

            let job = match next {
                None => break,
                Some(Ok(job)) => job,
                Some(Err(err)) if err.is_unavailable() => {
                    session.warn(format!("Live acquisition exhausted early: {}", err));
                    failed = true;
                    break;
                }
                Some(Err(err)) => {
                    warn!("Skipping live posting: {}", err);
                    continue;
                }
            };

            let Some(rank) = self.merge(session, Arc::new(job), Provenance::Live) else {
                continue;
            };
            if let Some(result) = session.results.as_slice().get(rank - 1).cloned() {
                if result.qualified {
                    arrived += 1;
                }
                emitter.emit(MatchEvent::LiveMatch { result, rank }).await?;
            }
        }

        Ok(failed)
    }

    /// Dedup, score and insert one candidate; returns its rank when displayed
    fn merge(
        &self,
        session: &mut MatchSession,
        job: Arc<JobProfile>,
        provenance: Provenance,
    ) -> Option<usize> {
        if !session.mark_seen(&job.external_id) {
            debug!("Skipping duplicate job {}", job.external_id);
            return None;
        }
        session.examined += 1;

        let result = match self.engine.score(
            &session.resume,
            job,
            session.params.profile,
            session.params.qualified_threshold,
            provenance,
        ) {
            Ok(result) => result,
            Err(err) => {
                warn!("Skipping candidate: {}", err);
                return None;
            }
        };

        if result.score < session.params.min_display_score {
            debug!(
                "Job {} scored {} below display threshold",
                result.external_id(),
                result.score
            );
            return None;
        }

        match provenance {
            Provenance::Cached => session.from_cached += 1,
            Provenance::Live => session.from_live += 1,
        }
        debug!(
            "Merged job {} with score {} (qualified={})",
            result.external_id(),
            result.score,
            result.qualified
        );
        Some(session.results.insert(result))
    }

    fn finish_cancelled(&self, session: &mut MatchSession, emitter: &mut EventEmitter) {
        if session.state.is_terminal() {
            return;
        }
        if let Err(err) = session.transition(SessionState::Cancelled) {
            warn!("{}", err);
            return;
        }
        info!("Session cancelled by caller");
        if self.settings.acknowledge_cancel {
            emitter.acknowledge_cancel("Matching cancelled");
        }
    }

    async fn finish_error(
        &self,
        session: &mut MatchSession,
        emitter: &mut EventEmitter,
        message: String,
    ) {
        warn!("Session failed: {}", message);
        if let Err(err) = session.transition(SessionState::Error) {
            warn!("{}", err);
        }
        if emitter
            .emit(MatchEvent::Error { message })
            .await
            .is_err()
        {
            debug!("Error event not delivered, consumer is gone");
        }
    }
}
