use std::sync::Arc;

use mnemo_service::MnemoService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MnemoService>,
}
impl AppState {
	/// Opens the store, bootstraps its schema, and attaches the configured embedder.
	pub async fn new(config: mnemo_config::Config) -> color_eyre::Result<Self> {
		let service = MnemoService::connect(config).await?;

		tracing::info!(
			db_path = %service.db.path().display(),
			vector_dim = service.vector_dim(),
			"Memory store opened."
		);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: MnemoService) -> Self {
		Self { service: Arc::new(service) }
	}
}
