use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = mnemo_admin::Args::parse();

	mnemo_admin::run(args).await
}
