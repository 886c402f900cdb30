use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = catalog_audit_cli::Cli::parse();
    catalog_audit_cli::run_cli(cli)
}
