use pnbundle_diagnostics::Result;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() -> Result<()> {
    pnbundle_cli::run_cli().await
}
