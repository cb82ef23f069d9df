// self
use crate::{
	auth::ProviderKind,
	obs::{FlowOutcome, LoginStage},
};

/// Records a login outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(provider: ProviderKind, stage: LoginStage, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"login_broker_flow_total",
			"provider" => provider.as_str(),
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (provider, stage, outcome);
	}
}
