//! # View-State Orchestrator
//!
//! Maps user actions onto the reconciler, the session gate and the generator,
//! and turns every failure into a dismissible notice. Generation jobs bound to
//! a modal run under a cancellation token; closing the modal cancels the job
//! and a cancelled job never writes into the view state.
//!
//! The realtime channel of a public collection is open only while its view is
//! shown; the subscription handle lives in the view state and leaving the view
//! drops it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use ik_core::{
    new_id, AppError, BuilderOption, Credentials, EntityId, ForumPost, Idea, Result, ShowcaseApp,
    SortOption, Table, Thread,
};
use ik_genai::{DeckProgress, IdeaGenerator};
use ik_sync::{LoadReport, RealtimeBridge, Reconciler, SessionGate, SignedIn, Subscription};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::{user_message, Modal, Notice, NoticeLevel, View, ViewState};
use crate::upload::ShowcaseUpload;

struct Job {
    id: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct Inner {
    state: ViewState,
    job: Option<Job>,
    live: Option<Subscription>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn cancel_job(&mut self) {
        if let Some(job) = self.job.take() {
            job.token.cancel();
            debug!(job = job.id, "Generation job cancelled");
        }
        self.state.job = Default::default();
    }

    fn push_notice(&mut self, level: NoticeLevel, message: String) {
        let id = self.next_id();
        self.state.notices.push(Notice { id, level, message });
    }
}

/// Handle given to a running job; its writes land only while it is current.
#[derive(Clone)]
struct JobTicket {
    id: u64,
    token: CancellationToken,
}

/// Clears the generating flag however the generation future ends.
struct GeneratingGuard<'a>(&'a Orchestrator);

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().state.generating = false;
    }
}

/// Collection pushed live while `view` is shown.
fn live_table(view: View) -> Option<Table> {
    match view {
        View::Forum => Some(Table::ForumPosts),
        View::Apps => Some(Table::ShowcaseApps),
        View::Home | View::History => None,
    }
}

pub struct Orchestrator {
    reconciler: Arc<Reconciler>,
    session: Arc<SessionGate>,
    generator: IdeaGenerator,
    realtime: Option<RealtimeBridge>,
    inner: Mutex<Inner>,
}

impl Orchestrator {
    pub fn new(reconciler: Arc<Reconciler>, session: Arc<SessionGate>, generator: IdeaGenerator) -> Self {
        Self {
            reconciler,
            session,
            generator,
            realtime: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Pushes remote inserts into the collection of the shown view.
    pub fn with_realtime(mut self, bridge: RealtimeBridge) -> Self {
        self.realtime = Some(bridge);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ViewState {
        self.lock().state.clone()
    }

    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    // ── Startup ──────────────────────────────────────────────────────────────

    /// Restores a persisted session and loads every visible collection.
    pub async fn start(&self) -> LoadReport {
        match self.session.restore().await {
            Ok(report) => {
                self.report_load(&report);
                report
            }
            Err(e) => {
                // Anonymous start; public collections still load.
                warn!(error = %e, "Session restore failed");
                self.notify_error(&e);
                let report = self.reconciler.load_all(None).await;
                self.report_load(&report);
                report
            }
        }
    }

    /// Reloads the visible collections for the current session.
    pub async fn refresh(&self) -> LoadReport {
        let owner = self.session.current_user().map(|u| u.id);
        let report = self.reconciler.load_all(owner.as_deref()).await;
        self.report_load(&report);
        report
    }

    fn report_load(&self, report: &LoadReport) {
        let mut inner = self.lock();
        for (table, error) in &report.failures {
            let what = match table {
                Table::Ideas => "your ideas",
                Table::ShowcaseApps => "the app showcase",
                Table::ForumPosts => "the forum",
            };
            inner.push_notice(NoticeLevel::Error, format!("Could not load {what}. {}", user_message(error)));
        }
    }

    // ── Navigation ───────────────────────────────────────────────────────────

    /// Switches views, moving the realtime channel with them. Must be called
    /// inside a tokio runtime when a bridge is attached.
    pub fn set_view(&self, view: View) {
        let mut inner = self.lock();
        inner.state.view = view;
        let wanted = live_table(view);
        if inner.live.as_ref().map(Subscription::table) == wanted {
            return;
        }
        // Replacing the handle tears the previous listener down.
        inner.live = match (wanted, &self.realtime) {
            (Some(table), Some(bridge)) => Some(bridge.subscribe(table)),
            _ => None,
        };
    }

    /// Table of the open realtime channel, if any.
    pub fn live_channel(&self) -> Option<Table> {
        self.lock().live.as_ref().map(Subscription::table)
    }

    /// Opens a modal, replacing (and cancelling the job of) any open one.
    pub fn open_modal(&self, modal: Modal) {
        let mut inner = self.lock();
        inner.cancel_job();
        if modal != Modal::Auth {
            inner.state.auth_error = None;
        }
        inner.state.modal = Some(modal);
    }

    pub fn close_modal(&self) {
        let mut inner = self.lock();
        inner.cancel_job();
        inner.state.modal = None;
        inner.state.auth_error = None;
    }

    pub fn set_sort(&self, sort: SortOption) {
        self.lock().state.sort = sort;
    }

    /// Connectivity signal from the platform.
    pub fn set_online(&self, online: bool) {
        let mut inner = self.lock();
        if inner.state.online != online {
            info!(online, "Connectivity changed");
        }
        inner.state.online = online;
    }

    pub fn dismiss_notice(&self, id: u64) {
        self.lock().state.notices.retain(|n| n.id != id);
    }

    fn notify_error(&self, error: &AppError) {
        self.lock().push_notice(NoticeLevel::Error, user_message(error));
    }

    fn notify_info(&self, message: impl Into<String>) {
        self.lock().push_notice(NoticeLevel::Info, message.into());
    }

    /// Records `result`'s failure as a notice and passes it through.
    fn surface<T>(&self, result: Result<T>) -> Result<T> {
        result.inspect_err(|e| self.notify_error(e))
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Ideas in the selected order; the collection itself is never reordered.
    pub fn sorted_ideas(&self) -> Vec<Idea> {
        let sort = self.lock().state.sort;
        ik_core::sort_ideas(&self.reconciler.ideas(), sort)
    }

    pub fn showcase_apps(&self) -> Vec<ShowcaseApp> {
        self.reconciler.showcase_apps()
    }

    pub fn forum_threads(&self) -> Vec<Thread> {
        self.reconciler.forum_threads()
    }

    pub fn export_ideas_json(&self) -> Result<String> {
        let ideas = self.reconciler.ideas();
        Ok(serde_json::to_string_pretty(&ideas)?)
    }

    fn idea(&self, id: &str) -> Result<Idea> {
        self.reconciler
            .find_idea(id)
            .ok_or_else(|| AppError::NotFound("idea".to_string(), id.to_string()))
    }

    fn ensure_online(&self, action: &str) -> Result<()> {
        if self.lock().state.online {
            return Ok(());
        }
        let error = AppError::Offline(format!("{action} needs a connection"));
        self.notify_error(&error);
        Err(error)
    }

    /// The signed-in user, or the sign-in modal.
    fn require_user(&self) -> Result<ik_core::User> {
        self.session.require_user().inspect_err(|_| self.open_modal(Modal::Auth))
    }

    // ── Ideas ────────────────────────────────────────────────────────────────

    /// Generates a round of ideas and appends the new ones to the user's list.
    /// Returns the idea list after the round.
    pub async fn fetch_new_ideas(&self) -> Result<Vec<Idea>> {
        // 1. Connectivity and identity
        self.ensure_online("Generating ideas")?;
        let user = self.require_user()?;

        {
            let mut inner = self.lock();
            if inner.state.generating {
                debug!("Idea generation already running");
                return Ok(self.reconciler.ideas());
            }
            inner.state.generating = true;
        }
        let guard = GeneratingGuard(self);

        // 2. Generation, then the two-phase commit
        let result = async {
            let candidates = self.generator.fetch_new_ideas().await?;
            self.reconciler.submit_new_ideas(candidates, &user.id).await
        }
        .await;

        drop(guard);
        self.surface(result)
    }

    pub async fn clear_ideas(&self) -> Result<()> {
        let user = self.require_user()?;
        let result = self.reconciler.clear_ideas(&user.id).await;
        self.surface(result)?;
        self.notify_info("Your idea history was cleared.");
        Ok(())
    }

    // ── Generation jobs ──────────────────────────────────────────────────────

    fn start_job(&self, modal: Modal) -> JobTicket {
        let mut inner = self.lock();
        inner.cancel_job();
        let id = inner.next_id();
        let token = CancellationToken::new();
        inner.job = Some(Job { id, token: token.clone() });
        inner.state.modal = Some(modal);
        inner.state.job.running = true;
        JobTicket { id, token }
    }

    /// Applies `edit` if `ticket` is still the current job. With `finish`,
    /// the job is retired afterwards.
    fn write_job(&self, ticket: &JobTicket, finish: bool, edit: impl FnOnce(&mut ViewState)) -> bool {
        let mut inner = self.lock();
        let current = !ticket.token.is_cancelled() && inner.job.as_ref().is_some_and(|j| j.id == ticket.id);
        if !current {
            return false;
        }
        edit(&mut inner.state);
        if finish {
            inner.job = None;
            inner.state.job.running = false;
        }
        true
    }

    /// Runs `work` for the job. `Ok(None)` means the job was cancelled and
    /// nothing was written.
    async fn run_job<T>(
        &self,
        ticket: &JobTicket,
        work: impl std::future::Future<Output = Result<T>>,
        write: impl FnOnce(&mut ViewState, &T),
    ) -> Result<Option<T>> {
        let outcome = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => return Ok(None),
            outcome = work => outcome,
        };
        match outcome {
            Ok(value) => {
                let written = self.write_job(ticket, true, |state| write(state, &value));
                Ok(written.then_some(value))
            }
            Err(e) => {
                if !self.write_job(ticket, true, |_| {}) {
                    debug!(error = %e, "Cancelled job failed; dropping the error");
                    return Ok(None);
                }
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    /// SWOT / MVP / verdict analysis in the brainstorm modal.
    pub async fn brainstorm(&self, idea_id: &str) -> Result<Option<String>> {
        self.ensure_online("Brainstorming")?;
        let idea = self.surface(self.idea(idea_id))?;
        let ticket = self.start_job(Modal::Brainstorm(idea.id.clone()));
        self.run_job(&ticket, self.generator.brainstorm(&idea), |state, text| {
            state.job.brainstorm = Some(text.clone())
        })
        .await
    }

    pub async fn mockup(&self, idea_id: &str) -> Result<Option<String>> {
        self.ensure_online("Generating a mockup")?;
        let idea = self.surface(self.idea(idea_id))?;
        let ticket = self.start_job(Modal::Mockup(idea.id.clone()));
        self.run_job(&ticket, self.generator.mockup(&idea), |state, url| {
            state.job.mockup_url = Some(url.clone())
        })
        .await
    }

    pub async fn pitch_deck(&self, idea_id: &str) -> Result<Option<Vec<ik_core::PitchDeckSlide>>> {
        self.ensure_online("Generating a pitch deck")?;
        let idea = self.surface(self.idea(idea_id))?;
        let ticket = self.start_job(Modal::PitchDeck(idea.id.clone()));

        let progress = |step: DeckProgress| {
            self.write_job(&ticket, false, |state| state.job.deck_progress = Some(step.message()));
        };
        self.run_job(&ticket, self.generator.pitch_deck(&idea, progress), |state, slides| {
            state.job.deck_progress = None;
            state.job.deck = Some(slides.clone());
        })
        .await
    }

    pub async fn builder_prompt(&self, idea_id: &str, option: BuilderOption) -> Result<Option<String>> {
        self.ensure_online("Generating a builder prompt")?;
        let idea = self.surface(self.idea(idea_id))?;
        let ticket = self.start_job(Modal::AppBuilder(idea.id.clone()));
        self.run_job(&ticket, self.generator.builder_prompt(&idea, option), |state, text| {
            state.job.builder_text = Some(text.clone())
        })
        .await
    }

    // ── Showcase & forum ─────────────────────────────────────────────────────

    pub async fn submit_showcase_app(&self, upload: ShowcaseUpload) -> Result<Vec<ShowcaseApp>> {
        let app = self.surface(upload.into_app())?;
        let name = app.name.clone();
        let apps = self.surface(self.reconciler.submit_showcase_app(app).await)?;
        if self.lock().state.modal == Some(Modal::Upload) {
            self.close_modal();
        }
        self.notify_info(format!("{name} was added to the showcase."));
        Ok(apps)
    }

    /// Posts to the forum as the signed-in user, optionally attaching one of
    /// their ideas or replying to an existing post.
    pub async fn submit_forum_post(
        &self,
        content: &str,
        attach_idea: Option<&str>,
        reply_to: Option<EntityId>,
    ) -> Result<Vec<ForumPost>> {
        let user = self.require_user()?;
        let content = content.trim();
        if content.is_empty() {
            return self.surface(Err(AppError::Validation("Write something before posting.".to_string())));
        }
        let idea = attach_idea.map(|id| self.idea(id)).transpose();
        let idea = self.surface(idea)?;

        let post = ForumPost {
            id: new_id(),
            created_at: Utc::now(),
            author: user.email.clone(),
            content: content.to_string(),
            idea,
            parent_id: reply_to,
        };
        let posts = self.surface(self.reconciler.submit_forum_post(post).await)?;
        if matches!(self.lock().state.modal, Some(Modal::Post { .. })) {
            self.close_modal();
        }
        Ok(posts)
    }

    // ── Session ──────────────────────────────────────────────────────────────

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<SignedIn> {
        let result = self.session.sign_in(credentials).await;
        self.after_auth(result)
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> Result<SignedIn> {
        let result = self.session.sign_up(credentials).await;
        self.after_auth(result)
    }

    pub async fn sign_in_with_provider(&self, provider: &str) -> Result<SignedIn> {
        let result = self.session.sign_in_with_provider(provider).await;
        self.after_auth(result)
    }

    /// Auth failures stay in the form; other failures become notices.
    fn after_auth(&self, result: Result<SignedIn>) -> Result<SignedIn> {
        match result {
            Ok(signed_in) => {
                self.close_modal();
                self.report_load(&signed_in.report);
                Ok(signed_in)
            }
            Err(e @ (AppError::Auth(_) | AppError::Validation(_))) => {
                let mut inner = self.lock();
                inner.state.modal = Some(Modal::Auth);
                inner.state.auth_error = Some(user_message(&e));
                Err(e)
            }
            Err(e) => self.surface(Err(e)),
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.close_modal();
        self.set_view(View::Home);
        // Local state is already cleared when the provider call fails.
        self.surface(self.session.sign_out().await)
    }
}
