//! Shared wiring for building per-task pipeline components.

use std::sync::Arc;

use crate::audit::AuditLog;
use crate::checkout::{CheckoutOrchestrator, Payer};
use crate::finder::EventFinder;
use crate::probe::{PageRenderer, Prober};
use crate::retry::RetryPolicy;
use crate::session::{Credentials, SessionClient, Transport};
use crate::site::Site;

/// Everything a monitor task needs, shared across tasks.
///
/// Each call to [`Pipeline::session`] yields a fresh [`SessionClient`], so
/// tasks never share cookies.
#[derive(Clone)]
pub struct Pipeline {
	transport: Arc<dyn Transport>,
	site: Arc<Site>,
	credentials: Credentials,
	payer: Payer,
	retry: RetryPolicy,
	audit: Arc<AuditLog>,
	renderer: Option<Arc<dyn PageRenderer>>,
}

impl Pipeline {
	pub fn new(transport: Arc<dyn Transport>, site: Arc<Site>) -> Self {
		Self {
			transport,
			site,
			credentials: Credentials::default(),
			payer: Payer::default(),
			retry: RetryPolicy::default(),
			audit: Arc::new(AuditLog::disabled()),
			renderer: None,
		}
	}

	pub fn with_credentials(mut self, credentials: Credentials) -> Self {
		self.credentials = credentials;
		self
	}

	pub fn with_payer(mut self, payer: Payer) -> Self {
		self.payer = payer;
		self
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
		self.audit = audit;
		self
	}

	/// Enables the rendered-browser probe strategy.
	pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
		self.renderer = Some(renderer);
		self
	}

	pub fn site(&self) -> &Arc<Site> {
		&self.site
	}

	pub fn session(&self) -> Arc<SessionClient> {
		Arc::new(SessionClient::new(Arc::clone(&self.transport), Arc::clone(&self.site), self.credentials.clone()))
	}

	pub fn prober(&self, client: Arc<SessionClient>) -> Prober {
		Prober::standard(client, self.renderer.clone())
	}

	pub fn orchestrator(&self, client: Arc<SessionClient>) -> CheckoutOrchestrator {
		CheckoutOrchestrator::new(client, self.payer.clone(), self.retry, Arc::clone(&self.audit))
	}

	pub fn finder(&self, client: Arc<SessionClient>) -> EventFinder {
		EventFinder::new(client)
	}
}
