// self
use crate::{_prelude::*, auth::ProviderKind, obs::LoginStage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by login stages.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provider and stage.
	pub fn new(provider: ProviderKind, stage: LoginStage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"login_broker.flow",
				provider = provider.as_str(),
				stage = stage.as_str()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (provider, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Emits a warning for a login that ended with a user-facing failure.
pub fn log_soft_failure(provider: ProviderKind, reason: &'static str, detail: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(provider = provider.as_str(), reason, %detail, "login failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (provider, reason, detail);
	}
}

/// Emits the warning for a tenant whose provider credentials are missing.
pub fn log_provider_disabled(tenant: &str, provider: ProviderKind) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			tenant,
			provider = provider.as_str(),
			"provider credentials are incomplete; login disabled"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (tenant, provider);
	}
}
